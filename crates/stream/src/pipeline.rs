use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::*;
use pcload_datastore::{DbError, SourceRow};

use crate::errors::{Result, StreamError};
use crate::format::Format;
use crate::record::{RecordMapper, StreamRecord, DEFAULT_DISPLAY_CAP};
use crate::sequence::{FnWriter, RecordWriter, SequenceWriter};

/// Every row of `source`, in ascending id order.
pub const SOURCE_QUERY: &str = "SELECT id, text_val FROM source ORDER BY id";

/// Lets another thread stop a stream between rows.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> CancelToken {
        Default::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Clone, Debug, derivative::Derivative)]
#[derivative(Default)]
pub struct StreamOptions {
    /// Text longer than this many characters is abbreviated.
    #[derivative(Default(value = "DEFAULT_DISPLAY_CAP"))]
    pub display_cap: usize,

    /// Log progress every this many records.  Zero turns progress logging off.
    #[derivative(Default(value = "1_000"))]
    pub progress_every: u64,

    pub cancel: Option<CancelToken>,
}

impl StreamOptions {
    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().map_or(false, CancelToken::is_cancelled)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StreamSummary {
    pub records: u64,
    pub elapsed: Duration,
}

/// Move rows from `rows` through `mapper` into `writer`, one at a time.
///
/// The next row is pulled only once the previous record has been handed to the writer, so at most one row is ever in
/// flight.  Cancellation is checked before each pull.
///
/// A record counts as written once `writer` has accepted it.  The writer is not finished here; callers which own it
/// finish it once this returns successfully.
pub fn pump<I, E, W>(
    rows: I,
    mapper: &RecordMapper,
    writer: &mut W,
    options: &StreamOptions,
) -> Result<StreamSummary>
where
    I: IntoIterator<Item = std::result::Result<SourceRow, E>>,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
    W: SequenceWriter + ?Sized,
{
    let started = Instant::now();
    let mut rows = rows.into_iter();
    let mut written: u64 = 0;

    loop {
        if options.is_cancelled() {
            warn!("Stream cancelled after {} records", written);
            return Err(StreamError::Cancelled {
                rows_written: written,
            });
        }

        let row = match rows.next() {
            None => break,
            Some(Ok(r)) => r,
            Some(Err(e)) => {
                let error = StreamError::Cursor {
                    rows_written: written,
                    source: e.into(),
                };
                error!("{}", error);
                return Err(error);
            }
        };

        let record = mapper.map_row(row);
        if let Err(source) = writer.write_record(&record) {
            let error = StreamError::Serialization {
                rows_written: written,
                source,
            };
            error!("{}", error);
            return Err(error);
        }
        written += 1;

        if options.progress_every != 0 && written % options.progress_every == 0 {
            info!("Streamed {} records", written);
        }
    }

    Ok(StreamSummary {
        records: written,
        elapsed: started.elapsed(),
    })
}

fn log_total(summary: &StreamSummary) {
    info!(
        "Streamed a total of {} records in {:?}",
        summary.records, summary.elapsed
    );
}

/// A query which has been checked and prepared, but hasn't produced any rows yet.
///
/// Splitting preparation off lets a caller find out whether the stream can start at all before committing to it, which
/// matters when the first byte of output can't be taken back.
pub struct PreparedStream<'conn> {
    statement: rusqlite::Statement<'conn>,
    mapper: RecordMapper,
}

impl<'conn> PreparedStream<'conn> {
    /// Prepare `query`, which must select `id` and `text_val`.
    pub fn prepare(
        conn: &'conn rusqlite::Connection,
        query: &str,
        options: &StreamOptions,
    ) -> Result<PreparedStream<'conn>> {
        let mapper = RecordMapper::new(options.display_cap)?;
        let statement = conn.prepare(query).map_err(DbError::from)?;
        debug!("Prepared {}", query);
        Ok(PreparedStream { statement, mapper })
    }

    /// Run the query and write every record to `sink` in `format`.
    ///
    /// Each record is handed to `sink` as soon as it is encoded, and only counts as written once `sink` accepts it.
    /// A buffered sink therefore makes the count on failure include records still sitting in its buffer.
    ///
    /// On failure the output written so far stays written.  JSON output is still closed, if the sink will take it.
    pub fn write_to<W: Write>(
        mut self,
        sink: W,
        format: Format,
        options: &StreamOptions,
    ) -> Result<StreamSummary> {
        let rows = self
            .statement
            .query_map([], SourceRow::from_row)
            .map_err(DbError::from)?;
        let mut writer =
            RecordWriter::new(format, sink).map_err(|source| StreamError::Serialization {
                rows_written: 0,
                source,
            })?;

        let summary = pump(rows, &self.mapper, &mut writer, options)?;
        writer
            .finish()
            .map_err(|source| StreamError::Serialization {
                rows_written: summary.records,
                source,
            })?;
        log_total(&summary);
        Ok(summary)
    }

    /// Run the query and hand every record to `callback`.
    pub fn for_each(
        mut self,
        options: &StreamOptions,
        callback: impl FnMut(&StreamRecord),
    ) -> Result<StreamSummary> {
        let rows = self
            .statement
            .query_map([], SourceRow::from_row)
            .map_err(DbError::from)?;
        let summary = pump(rows, &self.mapper, &mut FnWriter(callback), options)?;
        log_total(&summary);
        Ok(summary)
    }
}

/// Stream all of `source` to `sink` in `format`.
pub fn stream_rows<W: Write>(
    conn: &rusqlite::Connection,
    sink: W,
    format: Format,
    options: &StreamOptions,
) -> Result<StreamSummary> {
    stream_query(conn, SOURCE_QUERY, sink, format, options)
}

/// Stream the results of any query selecting `id` and `text_val` to `sink` in `format`.
pub fn stream_query<W: Write>(
    conn: &rusqlite::Connection,
    query: &str,
    sink: W,
    format: Format,
    options: &StreamOptions,
) -> Result<StreamSummary> {
    PreparedStream::prepare(conn, query, options)?.write_to(sink, format, options)
}

/// Run every row of `source` through the mapper and hand each record to `callback`, in id order.
pub fn for_each_record(
    conn: &rusqlite::Connection,
    options: &StreamOptions,
    callback: impl FnMut(&StreamRecord),
) -> Result<StreamSummary> {
    PreparedStream::prepare(conn, SOURCE_QUERY, options)?.for_each(options, callback)
}
