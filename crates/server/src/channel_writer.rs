use std::io::{self, Write};

use bytes::Bytes;
use tokio::sync::mpsc;

/// A blocking [Write] which sends everything written to it down a bounded channel as [Bytes].
///
/// Writes block while the channel is full, and fail with [io::ErrorKind::BrokenPipe] once the receiver is gone.  This
/// must only be used off the async runtime, e.g. from `spawn_blocking`.
pub struct ChannelWriter {
    sender: mpsc::Sender<io::Result<Bytes>>,
}

impl ChannelWriter {
    pub fn new(sender: mpsc::Sender<io::Result<Bytes>>) -> ChannelWriter {
        ChannelWriter { sender }
    }
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        self.sender
            .blocking_send(Ok(Bytes::copy_from_slice(buf)))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "The client went away"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sends_chunks_in_order() {
        let (sender, mut receiver) = mpsc::channel(4);
        let mut writer = ChannelWriter::new(sender);
        writer.write_all(b"hello ").unwrap();
        writer.write_all(b"world").unwrap();
        drop(writer);

        let mut got = vec![];
        while let Some(chunk) = receiver.blocking_recv() {
            got.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(got, b"hello world");
    }

    #[test]
    fn fails_once_the_receiver_is_gone() {
        let (sender, receiver) = mpsc::channel(4);
        drop(receiver);
        let mut writer = ChannelWriter::new(sender);
        let err = writer.write_all(b"anyone?").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
