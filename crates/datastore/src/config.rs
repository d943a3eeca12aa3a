use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for opening a [crate::Database].
///
/// Build one with [DatabaseConfigBuilder]; only the path is required.
#[derive(Clone, Debug, derive_builder::Builder)]
pub struct DatabaseConfig {
    /// Path to the sqlite file.  Created if it doesn't exist.
    #[builder(setter(into))]
    path: PathBuf,

    /// Maximum number of connections the pool will hold open at once.
    #[builder(default = "10")]
    max_connections: u32,

    /// How long [crate::Database::acquire] waits for a free connection before reporting the pool as exhausted.
    #[builder(default = "Duration::from_secs(5)")]
    acquire_timeout: Duration,

    /// How long a connection blocks behind another connection's write lock before giving up.
    ///
    /// The claim demos hold their locks for 15 seconds by default, so this needs to comfortably exceed that.
    #[builder(default = "Duration::from_secs(30)")]
    lock_wait_timeout: Duration,
}

impl DatabaseConfig {
    /// A config with all defaults for the database at `path`.
    pub fn at_path(path: impl Into<PathBuf>) -> DatabaseConfig {
        DatabaseConfig {
            path: path.into(),
            max_connections: 10,
            acquire_timeout: Duration::from_secs(5),
            lock_wait_timeout: Duration::from_secs(30),
        }
    }

    pub fn get_path(&self) -> &Path {
        &self.path
    }

    pub fn get_max_connections(&self) -> u32 {
        self.max_connections
    }

    pub fn get_acquire_timeout(&self) -> Duration {
        self.acquire_timeout
    }

    pub fn get_lock_wait_timeout(&self) -> Duration {
        self.lock_wait_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_match_at_path() {
        let built = DatabaseConfigBuilder::default()
            .path("x.sqlite")
            .build()
            .unwrap();
        let direct = DatabaseConfig::at_path("x.sqlite");

        assert_eq!(built.get_path(), direct.get_path());
        assert_eq!(built.get_max_connections(), direct.get_max_connections());
        assert_eq!(built.get_acquire_timeout(), direct.get_acquire_timeout());
        assert_eq!(
            built.get_lock_wait_timeout(),
            direct.get_lock_wait_timeout()
        );
    }

    #[test]
    fn builder_requires_path() {
        assert!(DatabaseConfigBuilder::default().build().is_err());
    }
}
