//! Encoders which write one record at a time.
use std::io::Write;

use log::*;

use crate::errors::EncodeError;
use crate::format::Format;
use crate::record::StreamRecord;

/// Something the pipeline can hand records to, one at a time, in order.
pub trait SequenceWriter {
    fn write_record(&mut self, record: &StreamRecord) -> Result<(), EncodeError>;
}

impl<T: SequenceWriter + ?Sized> SequenceWriter for &mut T {
    fn write_record(&mut self, record: &StreamRecord) -> Result<(), EncodeError> {
        (**self).write_record(record)
    }
}

/// Adapts a closure into a [SequenceWriter].
pub struct FnWriter<F>(pub F);

impl<F: FnMut(&StreamRecord)> SequenceWriter for FnWriter<F> {
    fn write_record(&mut self, record: &StreamRecord) -> Result<(), EncodeError> {
        (self.0)(record);
        Ok(())
    }
}

/// Writes records as the elements of a single JSON array.
///
/// Each record, with its separator, is encoded in full and then handed to the sink in one `write_all`; once
/// [SequenceWriter::write_record] returns `Ok` the sink has accepted every byte of it.  The opening bracket goes out
/// with the first record, and the closing bracket on [JsonArrayWriter::finish].  If the writer is dropped without
/// being finished, it closes the array then, so that an interrupted stream is still a well-formed (if short) array.
pub struct JsonArrayWriter<W: Write> {
    sink: W,
    scratch: Vec<u8>,
    opened: bool,
    closed: bool,
}

impl<W: Write> JsonArrayWriter<W> {
    pub fn new(sink: W) -> JsonArrayWriter<W> {
        JsonArrayWriter {
            sink,
            scratch: vec![],
            opened: false,
            closed: false,
        }
    }

    fn close(&mut self) -> std::io::Result<()> {
        if self.closed {
            return Ok(());
        }

        // Only one attempt, even if it fails.
        self.closed = true;
        let tail: &[u8] = if self.opened { b"]" } else { b"[]" };
        self.opened = true;
        self.sink.write_all(tail)?;
        self.sink.flush()
    }

    pub fn finish(mut self) -> Result<(), EncodeError> {
        self.close()?;
        Ok(())
    }
}

impl<W: Write> SequenceWriter for JsonArrayWriter<W> {
    fn write_record(&mut self, record: &StreamRecord) -> Result<(), EncodeError> {
        self.scratch.clear();
        self.scratch.push(if self.opened { b',' } else { b'[' });
        serde_json::to_writer(&mut self.scratch, record)?;

        // Past this point some of the bytes may have gone out, so never open the array again.
        self.opened = true;
        self.sink.write_all(&self.scratch)?;
        Ok(())
    }
}

impl<W: Write> Drop for JsonArrayWriter<W> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }

        if let Err(e) = self.close() {
            debug!("Could not close the JSON array of an interrupted stream: {}", e);
        }
    }
}

/// Writes an `id,text` header and then one CSV line per record.
///
/// The header is written even if no records follow.  The csv encoder is flushed after the header and after every
/// record, so a record has reached the sink by the time [SequenceWriter::write_record] returns `Ok`.
pub struct CsvRecordWriter<W: Write> {
    inner: csv::Writer<W>,
}

impl<W: Write> CsvRecordWriter<W> {
    pub fn new(sink: W) -> Result<CsvRecordWriter<W>, EncodeError> {
        let mut inner = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(sink);
        inner.write_record(StreamRecord::FIELDS)?;
        inner.flush()?;
        Ok(CsvRecordWriter { inner })
    }

    pub fn finish(mut self) -> Result<(), EncodeError> {
        self.inner.flush()?;
        Ok(())
    }
}

impl<W: Write> SequenceWriter for CsvRecordWriter<W> {
    fn write_record(&mut self, record: &StreamRecord) -> Result<(), EncodeError> {
        self.inner.serialize(record)?;
        self.inner.flush()?;
        Ok(())
    }
}

/// A writer for whichever [Format] was asked for.
pub enum RecordWriter<W: Write> {
    Json(JsonArrayWriter<W>),
    Csv(CsvRecordWriter<W>),
}

impl<W: Write> RecordWriter<W> {
    pub fn new(format: Format, sink: W) -> Result<RecordWriter<W>, EncodeError> {
        Ok(match format {
            Format::Json => RecordWriter::Json(JsonArrayWriter::new(sink)),
            Format::Csv => RecordWriter::Csv(CsvRecordWriter::new(sink)?),
        })
    }

    pub fn finish(self) -> Result<(), EncodeError> {
        match self {
            RecordWriter::Json(w) => w.finish(),
            RecordWriter::Csv(w) => w.finish(),
        }
    }
}

impl<W: Write> SequenceWriter for RecordWriter<W> {
    fn write_record(&mut self, record: &StreamRecord) -> Result<(), EncodeError> {
        match self {
            RecordWriter::Json(w) => w.write_record(record),
            RecordWriter::Csv(w) => w.write_record(record),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    fn record(id: i64, text: &str) -> StreamRecord {
        StreamRecord {
            id,
            text: text.to_string(),
        }
    }

    /// Accepts `budget` bytes, then fails every write.
    struct FailingSink {
        written: Vec<u8>,
        budget: usize,
    }

    impl Write for FailingSink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.written.len() + buf.len() > self.budget {
                return Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone"));
            }
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn empty_json_is_an_empty_array() {
        let mut out = vec![];
        JsonArrayWriter::new(&mut out).finish().unwrap();
        assert_eq!(out, b"[]");
    }

    #[test]
    fn json_keeps_field_order() {
        let mut out = vec![];
        let mut writer = JsonArrayWriter::new(&mut out);
        writer.write_record(&record(1, "a")).unwrap();
        writer.write_record(&record(2, "b\"c")).unwrap();
        writer.finish().unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            r#"[{"id":1,"text":"a"},{"id":2,"text":"b\"c"}]"#
        );
    }

    #[test]
    fn dropping_json_closes_the_array() {
        let mut out = vec![];
        {
            let mut writer = JsonArrayWriter::new(&mut out);
            writer.write_record(&record(1, "a")).unwrap();
        }
        let parsed: Vec<StreamRecord> = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed, vec![record(1, "a")]);
    }

    #[test]
    fn failing_sink_surfaces_io_errors() {
        let mut sink = FailingSink {
            written: vec![],
            budget: 4,
        };
        let mut writer = JsonArrayWriter::new(&mut sink);
        let err = writer.write_record(&record(1, "abcdef")).unwrap_err();
        assert!(matches!(err, EncodeError::Json(_) | EncodeError::Io(_)));
    }

    #[test]
    fn empty_csv_is_just_the_header() {
        let mut out = vec![];
        CsvRecordWriter::new(&mut out).unwrap().finish().unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "id,text\n");
    }

    #[test]
    fn csv_quotes_when_needed() {
        let mut out = vec![];
        let mut writer = CsvRecordWriter::new(&mut out).unwrap();
        writer.write_record(&record(1, "plain")).unwrap();
        writer.write_record(&record(2, "a,b")).unwrap();
        writer.write_record(&record(3, "say \"hi\"")).unwrap();
        writer.finish().unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "id,text\n1,plain\n2,\"a,b\"\n3,\"say \"\"hi\"\"\"\n"
        );
    }

    #[test]
    fn dropping_csv_flushes() {
        let mut out = vec![];
        {
            let mut writer = CsvRecordWriter::new(&mut out).unwrap();
            writer.write_record(&record(1, "x")).unwrap();
        }
        assert_eq!(String::from_utf8(out).unwrap(), "id,text\n1,x\n");
    }

    #[test]
    fn record_writer_follows_the_format() {
        let mut out = vec![];
        RecordWriter::new(Format::Csv, &mut out).unwrap().finish().unwrap();
        assert_eq!(out, b"id,text\n");

        let mut out = vec![];
        RecordWriter::new(Format::Json, &mut out).unwrap().finish().unwrap();
        assert_eq!(out, b"[]");
    }

    /// Accepts `accepted` whole writes, then fails every write after that.
    struct WriteCountingSink {
        accepted: usize,
        writes: Vec<Vec<u8>>,
    }

    impl Write for WriteCountingSink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.writes.len() == self.accepted {
                return Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone"));
            }
            self.writes.push(buf.to_vec());
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn json_records_reach_the_sink_before_they_count() {
        let mut sink = WriteCountingSink {
            accepted: 2,
            writes: vec![],
        };
        let mut writer = JsonArrayWriter::new(&mut sink);
        writer.write_record(&record(1, "a")).unwrap();
        writer.write_record(&record(2, "b")).unwrap();
        assert!(writer.write_record(&record(3, "c")).is_err());
        drop(writer);

        assert_eq!(
            sink.writes,
            vec![br#"[{"id":1,"text":"a"}"#.to_vec(), br#",{"id":2,"text":"b"}"#.to_vec()]
        );
    }

    #[test]
    fn csv_records_reach_the_sink_before_they_count() {
        let mut sink = WriteCountingSink {
            accepted: 3,
            writes: vec![],
        };
        let mut writer = CsvRecordWriter::new(&mut sink).unwrap();
        writer.write_record(&record(1, "a")).unwrap();
        writer.write_record(&record(2, "b")).unwrap();
        assert!(writer.write_record(&record(3, "c")).is_err());
        drop(writer);

        assert_eq!(
            sink.writes,
            vec![b"id,text\n".to_vec(), b"1,a\n".to_vec(), b"2,b\n".to_vec()]
        );
    }

    #[test]
    fn csv_header_needs_a_working_sink() {
        let mut sink = WriteCountingSink {
            accepted: 0,
            writes: vec![],
        };
        assert!(CsvRecordWriter::new(&mut sink).is_err());
    }

    #[test]
    fn closures_are_writers() {
        let mut seen = vec![];
        let mut writer = FnWriter(|r: &StreamRecord| seen.push(r.id));
        writer.write_record(&record(4, "")).unwrap();
        writer.write_record(&record(5, "")).unwrap();
        drop(writer);
        assert_eq!(seen, vec![4, 5]);
    }
}
