use std::num::NonZeroU32;
use std::time::Instant;

use log::*;
use pcload_datastore::Database;

use crate::delay::WorkDelay;
use crate::errors::{ClaimError, Result};
use crate::locking::claim_next_row;
use crate::non_locking::claim_next_row_unlocked;
use crate::Claim;

/// Which claim a worker runs.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Strategy {
    /// [claim_next_row].
    Locking,
    /// [claim_next_row_unlocked].
    NonLocking,
}

/// How many times a worker tries again after losing a row to someone else.
#[derive(Copy, Clone, Debug, Eq, PartialEq, derivative::Derivative)]
#[derivative(Default)]
pub enum RetryPolicy {
    /// Keep going until a row is claimed or none remain.
    #[derivative(Default)]
    Unbounded,

    /// Give up after this many attempts in total, returning the last [ClaimError::AlreadyClaimed].
    Limited(NonZeroU32),
}

impl RetryPolicy {
    fn allows_another_attempt(&self, attempts_so_far: u32) -> bool {
        match self {
            RetryPolicy::Unbounded => true,
            RetryPolicy::Limited(max) => attempts_so_far < max.get(),
        }
    }
}

/// A named claimer which runs one claim to completion.
#[derive(Clone, Debug)]
pub struct ClaimWorker {
    name: String,
    strategy: Strategy,
    retry: RetryPolicy,
}

impl ClaimWorker {
    pub fn new(name: impl Into<String>, strategy: Strategy) -> ClaimWorker {
        ClaimWorker {
            name: name.into(),
            strategy,
            retry: Default::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> ClaimWorker {
        self.retry = retry;
        self
    }

    /// Claim a row, retrying for as long as the retry policy allows when the row turns out to be taken.
    ///
    /// Every attempt checks its own connection out of `db` and gives it back before the next one.  Running out of rows,
    /// lock timeouts, and store failures end the run immediately.
    pub fn run(&self, db: &Database, delay: &dyn WorkDelay) -> Result<Claim> {
        self.retry_claims(|| {
            let mut conn = db.acquire()?;
            match self.strategy {
                Strategy::Locking => claim_next_row(&mut conn, &self.name, delay),
                Strategy::NonLocking => claim_next_row_unlocked(&conn, &self.name, delay),
            }
        })
    }

    fn retry_claims(&self, mut attempt: impl FnMut() -> Result<Claim>) -> Result<Claim> {
        let started = Instant::now();
        let mut attempts = 0;

        loop {
            attempts += 1;
            match attempt() {
                Ok(claim) => {
                    return Ok(Claim {
                        attempts,
                        elapsed: started.elapsed(),
                        ..claim
                    })
                }
                Err(ClaimError::AlreadyClaimed { row_id })
                    if self.retry.allows_another_attempt(attempts) =>
                {
                    warn!(
                        "{} was unable to update row {}, retrying",
                        self.name, row_id
                    );
                }
                Err(e) => {
                    error!("{} gave up after {} attempts: {}", self.name, attempts, e);
                    return Err(e);
                }
            }
        }
    }
}
