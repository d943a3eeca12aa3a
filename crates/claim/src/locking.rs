use std::time::Instant;

use log::*;
use rusqlite::OptionalExtension;

use crate::delay::WorkDelay;
use crate::errors::{ClaimError, Result};
use crate::{Claim, SELECT_NEXT_SQL, UPDATE_SQL};

/// After the delay, make sure nobody got to the row while we weren't looking.
///
/// Under our own lock this can only trip if something writes the table without going through the lock, e.g. the
/// non-locking claimer.
fn ensure_still_unclaimed(row_id: i64, locked: bool) -> Result<()> {
    if locked {
        return Err(ClaimError::AlreadyClaimed { row_id });
    }
    Ok(())
}

/// Claim the lowest unclaimed row for `worker`, holding the lock across `delay`.
///
/// The transaction takes sqlite's write lock before it reads anything, which makes it the equivalent of
/// `SELECT ... FOR UPDATE`: a concurrent claimer blocks on its own `BEGIN` until this one commits or rolls back, then
/// reads the table as we left it.  If the lock isn't granted within the connection's busy timeout, this fails with
/// [ClaimError::LockTimeout].
///
/// On any failure the transaction is dropped, which rolls it back.
pub fn claim_next_row(
    conn: &mut rusqlite::Connection,
    worker: &str,
    delay: &dyn WorkDelay,
) -> Result<Claim> {
    let started = Instant::now();

    let transaction =
        conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
    let row_id: i64 = transaction
        .query_row(SELECT_NEXT_SQL, [], |r| r.get(0))
        .optional()?
        .ok_or(ClaimError::NoRowsAvailable)?;
    info!("{} is evaluating row {}", worker, row_id);

    delay.hold(row_id);

    let locked: bool = transaction
        .query_row(
            "SELECT locked_val FROM locking WHERE id = ?",
            rusqlite::params![row_id],
            |r| r.get(0),
        )
        .map_err(|e| ClaimError::from(e).at_row(row_id))?;
    ensure_still_unclaimed(row_id, locked)?;

    transaction
        .execute(UPDATE_SQL, rusqlite::params![worker, row_id])
        .map_err(|e| ClaimError::from(e).at_row(row_id))?;
    transaction
        .commit()
        .map_err(|e| ClaimError::from(e).at_row(row_id))?;
    info!("{} claimed row {}", worker, row_id);

    Ok(Claim {
        row_id,
        owner: worker.to_string(),
        attempts: 1,
        elapsed: started.elapsed(),
    })
}
