//! Claiming rows of the `locking` table.
//!
//! Two ways of doing the same thing, one right and one wrong:
//!
//! - [claim_next_row] picks the lowest unclaimed row inside a transaction which holds the write lock from the start.
//!   A second claimer blocks until the first commits, then picks a different row.
//! - [claim_next_row_unlocked] reads the row and writes it with two independent statements.  Two claimers can both
//!   read the same row as unclaimed and then both write it, and the second write silently wins.  That is the point of
//!   it; don't fix it.
//!
//! Each claim holds its row across a [WorkDelay], which stands in for whatever work a real service would do with the
//! row.  [ClaimWorker] wraps a claim in the retry loop, and [run_scenario] runs several workers on their own threads
//! with staggered starts.
mod delay;
mod errors;
mod locking;
mod non_locking;
mod scenario;
mod worker;

pub use delay::*;
pub use errors::*;
pub use locking::*;
pub use non_locking::*;
pub use scenario::*;
pub use worker::*;

use std::time::Duration;

/// Picks the row a claimer goes after: the lowest id still unclaimed.
///
/// Sqlite has no `FOR UPDATE`; the locking variant gets its exclusivity from the transaction instead.
pub(crate) const SELECT_NEXT_SQL: &str =
    "SELECT id FROM locking WHERE locked_val = 0 ORDER BY id LIMIT 1";

pub(crate) const UPDATE_SQL: &str = "UPDATE locking SET locked_val = 1, owner = ? WHERE id = ?";

/// A successful claim.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Claim {
    pub row_id: i64,
    pub owner: String,

    /// How many times the claim was attempted, including the successful one.
    pub attempts: u32,

    /// Wall time from the first attempt to the commit, including time spent blocked on the lock.
    pub elapsed: Duration,
}
