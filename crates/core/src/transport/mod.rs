//! TCP line transport
//!
//! This module opens the single connection to the chat server and splits it
//! into a [`LineReader`] (owned by the reader task) and a [`LineWriter`]
//! (shared by senders).
//! - Optional connect timeout, no read/write timeouts
//! - TCP_NODELAY for short interactive lines

pub mod line;

pub use line::{LineReader, LineWriter, ReadOutcome};

use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::config::ClientConfig;
use crate::{ChatError, Result};

/// Whole milliseconds, saturating at `u64::MAX`
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Connected line transport, not yet split
pub struct LineTransport {
    reader: LineReader,
    writer: LineWriter,
    peer: Option<SocketAddr>,
}

impl LineTransport {
    /// Connect to `host:port` over TCP
    ///
    /// # Errors
    /// - `InvalidAddress` for an empty host or port 0
    /// - `Connect` when the host is unreachable or refuses
    /// - `ConnectTimeout` when `config.connect_timeout` elapses
    pub async fn connect(host: &str, port: u16, config: &ClientConfig) -> Result<Self> {
        if host.is_empty() {
            return Err(ChatError::InvalidAddress("Host cannot be empty".to_string()));
        }
        if port == 0 {
            return Err(ChatError::InvalidAddress("Port cannot be 0".to_string()));
        }

        let addr = format!("{}:{}", host, port);
        tracing::debug!("Connecting to {}", addr);

        let connecting = TcpStream::connect((host, port));
        let connected = match config.connect_timeout {
            Some(timeout) => tokio::time::timeout(timeout, connecting)
                .await
                .map_err(|_| ChatError::ConnectTimeout {
                    addr: addr.clone(),
                    timeout_ms: millis(timeout),
                })?,
            None => connecting.await,
        };
        let stream = connected.map_err(|source| ChatError::Connect { addr, source })?;

        if let Err(e) = stream.set_nodelay(config.nodelay) {
            tracing::warn!("Failed to set TCP_NODELAY: {}", e);
        }
        let peer = stream.peer_addr().ok();

        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: LineReader::new(read_half),
            writer: LineWriter::new(write_half),
            peer,
        })
    }

    /// Wrap an already connected stream (TLS, in-memory, ...)
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        Self {
            reader: LineReader::new(read_half),
            writer: LineWriter::new(write_half),
            peer: None,
        }
    }

    /// Remote address, when known
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Split into reading and writing halves
    pub fn into_split(self) -> (LineReader, LineWriter) {
        (self.reader, self.writer)
    }
}
