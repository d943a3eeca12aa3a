//! Rows of the two demo tables, and the statements which read and write them outside of the demos proper.
use std::borrow::Borrow;

use crate::errors::Result;

/// A row of the `locking` table.
///
/// Once `locked` is true, `owner` names whoever claimed the row.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClaimableRow {
    pub id: i64,
    pub locked: bool,
    pub owner: Option<String>,
}

/// A row of the `source` table.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SourceRow {
    pub id: i64,
    pub text: String,
}

impl ClaimableRow {
    pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ClaimableRow> {
        Ok(ClaimableRow {
            id: row.get("id")?,
            locked: row.get("locked_val")?,
            owner: row.get("owner")?,
        })
    }
}

impl SourceRow {
    pub fn new(id: i64, text: impl Into<String>) -> SourceRow {
        SourceRow {
            id,
            text: text.into(),
        }
    }

    /// Read a row from any query which selects `id` and `text_val`.
    pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SourceRow> {
        Ok(SourceRow {
            id: row.get("id")?,
            text: row.get("text_val")?,
        })
    }
}

/// Replace the contents of the `locking` table with `count` unclaimed rows, with ids `1..=count`.
pub fn reset_locking_rows(conn: &rusqlite::Connection, count: i64) -> Result<()> {
    let transaction = conn.unchecked_transaction()?;
    transaction.execute("DELETE FROM locking", [])?;
    {
        let mut statement =
            transaction.prepare_cached("INSERT INTO locking(id, locked_val, owner) VALUES (?, 0, NULL)")?;
        for id in 1..=count {
            statement.execute(rusqlite::params![id])?;
        }
    }
    transaction.commit()?;
    Ok(())
}

/// Load the whole `locking` table, ordered by id.
///
/// The table is a handful of rows, so unlike `source` it is fine to collect it.
pub fn load_claimable_rows(conn: &rusqlite::Connection) -> Result<Vec<ClaimableRow>> {
    let mut statement =
        conn.prepare_cached("SELECT id, locked_val, owner FROM locking ORDER BY id")?;
    let rows = statement
        .query_map([], ClaimableRow::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Insert rows into `source` in one transaction, reusing a single prepared statement.
///
/// Returns how many rows were inserted.
pub fn insert_source_rows<I, R>(conn: &rusqlite::Connection, rows: I) -> Result<usize>
where
    I: IntoIterator<Item = R>,
    R: Borrow<SourceRow>,
{
    let transaction = conn.unchecked_transaction()?;
    let mut inserted = 0;
    {
        let mut statement =
            transaction.prepare_cached("INSERT INTO source(id, text_val) VALUES (?, ?)")?;
        for row in rows {
            let row = row.borrow();
            inserted += statement.execute(rusqlite::params![row.id, row.text])?;
        }
    }
    transaction.commit()?;
    Ok(inserted)
}

/// Delete everything in `source`.
pub fn clear_source_rows(conn: &rusqlite::Connection) -> Result<()> {
    conn.execute("DELETE FROM source", [])?;
    Ok(())
}

pub fn count_source_rows(conn: &rusqlite::Connection) -> Result<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM source", [], |r| r.get(0))?)
}
