//! Streaming the `source` table to a writer without ever holding the whole table in memory.
//!
//! The pipeline has three stages, and exactly one row is in flight between them at any time:
//!
//! 1. A forward-only cursor over the query, which is just rusqlite's lazy row iterator.
//! 2. A [RecordMapper], which turns a [pcload_datastore::SourceRow] into a [StreamRecord], abbreviating the text.
//! 3. A [RecordSink], usually a [RecordWriter] which encodes records as a JSON array or as CSV and writes them out as
//!    they arrive.
//!
//! A slow writer therefore stalls the cursor rather than letting rows pile up.  Failures abort the stream; whatever was
//! already written stays written, and the error says how many records made it.  The JSON writer closes its array when
//! dropped, so output is well-formed on every exit path as long as the writer still accepts bytes.
mod errors;
mod format;
mod pipeline;
mod record;
mod sequence;

pub use errors::*;
pub use format::*;
pub use pipeline::*;
pub use record::*;
pub use sequence::*;
