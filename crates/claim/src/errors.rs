use pcload_datastore::DbError;

#[derive(Debug, thiserror::Error)]
pub enum ClaimError {
    #[error("No unclaimed row is available")]
    NoRowsAvailable,

    #[error("Row {row_id} was claimed by someone else before we could update it")]
    AlreadyClaimed { row_id: i64 },

    #[error("Timed out waiting for the lock{}", describe_row(.row_id))]
    LockTimeout {
        /// The row we were working on, if we had gotten as far as picking one.
        row_id: Option<i64>,
        #[source]
        source: DbError,
    },

    #[error("Store error{}: {}", describe_row(.row_id), .source)]
    Store {
        row_id: Option<i64>,
        #[source]
        source: DbError,
    },
}

pub type Result<T, E = ClaimError> = std::result::Result<T, E>;

fn describe_row(row_id: &Option<i64>) -> String {
    match row_id {
        Some(id) => format!(" on row {}", id),
        None => String::new(),
    }
}

impl From<DbError> for ClaimError {
    fn from(source: DbError) -> ClaimError {
        if source.is_lock_timeout() {
            ClaimError::LockTimeout {
                row_id: None,
                source,
            }
        } else {
            ClaimError::Store {
                row_id: None,
                source,
            }
        }
    }
}

impl From<rusqlite::Error> for ClaimError {
    fn from(source: rusqlite::Error) -> ClaimError {
        DbError::from(source).into()
    }
}

impl ClaimError {
    /// Attach the row being worked on to errors which can carry one.
    pub(crate) fn at_row(self, id: i64) -> ClaimError {
        match self {
            ClaimError::LockTimeout { source, .. } => ClaimError::LockTimeout {
                row_id: Some(id),
                source,
            },
            ClaimError::Store { source, .. } => ClaimError::Store {
                row_id: Some(id),
                source,
            },
            e => e,
        }
    }

    /// The row this error concerns, if known.
    pub fn row_id(&self) -> Option<i64> {
        match self {
            ClaimError::NoRowsAvailable => None,
            ClaimError::AlreadyClaimed { row_id } => Some(*row_id),
            ClaimError::LockTimeout { row_id, .. } | ClaimError::Store { row_id, .. } => *row_id,
        }
    }
}
