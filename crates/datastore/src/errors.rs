use std::time::Duration;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DbError {
    #[error("No pooled connection became available within {waited:?}")]
    PoolExhausted {
        waited: Duration,
        #[source]
        source: r2d2::Error,
    },

    #[error("Unable to set up the connection pool: {}", _0)]
    PoolSetup(#[source] r2d2::Error),

    #[error("The database lock was not granted within the lock wait timeout")]
    LockTimeout(#[source] rusqlite::Error),

    #[error("Database failure: {}", _0)]
    ConnectionFailure(#[source] rusqlite::Error),
}

pub type Result<T, E = DbError> = std::result::Result<T, E>;

/// Is this sqlite error the result of another connection holding a lock we wanted?
///
/// Sqlite reports this once the busy timeout runs out, so it is our lock wait timeout.
pub fn is_lock_contention(error: &rusqlite::Error) -> bool {
    match error {
        rusqlite::Error::SqliteFailure(e, _) => matches!(
            e.code,
            rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
        ),
        _ => false,
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(error: rusqlite::Error) -> DbError {
        if is_lock_contention(&error) {
            DbError::LockTimeout(error)
        } else {
            DbError::ConnectionFailure(error)
        }
    }
}

impl DbError {
    pub fn is_lock_timeout(&self) -> bool {
        matches!(self, DbError::LockTimeout(_))
    }

    pub fn is_pool_exhausted(&self) -> bool {
        matches!(self, DbError::PoolExhausted { .. })
    }
}
