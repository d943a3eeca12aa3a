//! The datastore crate.
//!
//! This crate owns everything the demos need from the database itself:
//!
//! - The [Database], which takes a path, bootstraps the two demo tables, and hands out pooled connections.
//! - The row types: [ClaimableRow] lives in the `locking` table, [SourceRow] in the `source` table.
//! - Seeding helpers and a fixture generator for random text, so that demos and tests have something to chew on.
//!
//! The store is sqlite.  Connections are pooled with r2d2; acquiring one waits at most the configured acquire timeout
//! before failing with [DbError::PoolExhausted].  Every connection gets a busy timeout equal to the configured lock
//! wait timeout, which is how long a writer will block behind another writer's transaction before giving up with
//! [DbError::LockTimeout].
mod config;
mod database;
mod errors;
pub mod fixtures;
mod rows;

pub use config::*;
pub use database::*;
pub use errors::*;
pub use rows::*;
