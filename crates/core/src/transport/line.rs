//! Line framing over a byte stream
//!
//! Lines are `\n` terminated UTF-8. A trailing `\r` is stripped on read so
//! servers that send `\r\n` work too. Invalid UTF-8 is replaced rather than
//! treated as a stream error.

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::{ChatError, Result};

const LINE_ENDINGS: &[char] = &['\n', '\r'];

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Result of a single line read
#[derive(Debug)]
pub enum ReadOutcome {
    /// One complete line, terminator removed
    Line(String),
    /// Peer closed the stream
    EndOfStream,
    /// Read failed; the stream is unusable
    Failed(std::io::Error),
}

/// Reading half of a line transport
pub struct LineReader {
    inner: BufReader<BoxedReader>,
    buf: Vec<u8>,
}

impl LineReader {
    pub fn new<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        Self {
            inner: BufReader::new(Box::new(reader)),
            buf: Vec::with_capacity(256),
        }
    }

    /// Wait for the next line
    ///
    /// Not cancel safe: a partially read line is lost if the future is
    /// dropped. The reader loop only drops it when the connection is closing.
    pub async fn read_line(&mut self) -> ReadOutcome {
        self.buf.clear();
        match self.inner.read_until(b'\n', &mut self.buf).await {
            Ok(0) => ReadOutcome::EndOfStream,
            Ok(n) => {
                tracing::trace!("Read {} bytes from server", n);
                let text = String::from_utf8_lossy(&self.buf);
                ReadOutcome::Line(text.trim_end_matches(LINE_ENDINGS).to_string())
            }
            Err(e) => ReadOutcome::Failed(e),
        }
    }
}

/// Writing half of a line transport
pub struct LineWriter {
    inner: Option<BoxedWriter>,
}

impl LineWriter {
    pub fn new<W>(writer: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            inner: Some(Box::new(writer)),
        }
    }

    /// Write one line, appending the terminator, and flush
    ///
    /// Fails with [`ChatError::NotConnected`] after [`close`](Self::close).
    pub async fn write_line(&mut self, line: &str) -> Result<()> {
        let writer = self.inner.as_mut().ok_or(ChatError::NotConnected)?;

        let mut encoded = Vec::with_capacity(line.len() + 1);
        encoded.extend_from_slice(line.as_bytes());
        encoded.push(b'\n');

        writer.write_all(&encoded).await?;
        writer.flush().await?;
        tracing::trace!("Sent {} bytes to server", encoded.len());
        Ok(())
    }

    /// Shut down and release the writer. Calling it again is a no-op.
    pub async fn close(&mut self) {
        if let Some(mut writer) = self.inner.take() {
            if let Err(e) = writer.shutdown().await {
                tracing::debug!("Writer shutdown failed: {}", e);
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }
}
