use std::time::Instant;

use log::*;
use rusqlite::OptionalExtension;

use crate::delay::WorkDelay;
use crate::errors::{ClaimError, Result};
use crate::{Claim, SELECT_NEXT_SQL, UPDATE_SQL};

/// Claim the lowest unclaimed row for `worker` the wrong way.
///
/// The read and the write are separate autocommit statements, so nothing stops another claimer from reading the same
/// row during `delay`.  Both will then "claim" it, and whichever writes last ends up as the owner.  There is no retry
/// and no conflict detection: this exists to show the lost update.
pub fn claim_next_row_unlocked(
    conn: &rusqlite::Connection,
    worker: &str,
    delay: &dyn WorkDelay,
) -> Result<Claim> {
    let started = Instant::now();

    let row_id: i64 = conn
        .query_row(SELECT_NEXT_SQL, [], |r| r.get(0))
        .optional()?
        .ok_or(ClaimError::NoRowsAvailable)?;
    info!("{} is updating row {}", worker, row_id);

    delay.hold(row_id);

    conn.execute(UPDATE_SQL, rusqlite::params![worker, row_id])
        .map_err(|e| ClaimError::from(e).at_row(row_id))?;
    info!("{} updated row {}", worker, row_id);

    Ok(Claim {
        row_id,
        owner: worker.to_string(),
        attempts: 1,
        elapsed: started.elapsed(),
    })
}
