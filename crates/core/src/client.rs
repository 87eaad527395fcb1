//! Chat client: connection lifecycle and background reader
//!
//! One [`ChatClient`] owns at most one connection. Entering `Connected` spawns
//! a single reader task that pulls lines, decodes them and dispatches events
//! to observers on its own context.
//!
//! Teardown runs exactly once per connection. Explicit [`ChatClient::disconnect`]
//! and end-of-stream detection in the reader both race for an atomic close
//! flag; the winner cancels the pending read, closes the writer, moves the
//! state to `Disconnected` and dispatches [`ChatEvent::Disconnected`]. The
//! loser returns immediately.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::{ClientConfig, LastErrorPolicy};
use crate::dispatch::{ChatObserver, EventDispatcher};
use crate::protocol::LineCodec;
use crate::streaming::EventStream;
use crate::transport::{LineReader, LineTransport, LineWriter, ReadOutcome};
use crate::types::{ChatEvent, ClientCommand};
use crate::{ChatError, Result};

/// Observable connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// One live connection. Replaced, never reused, on reconnect.
struct Connection {
    writer: tokio::sync::Mutex<LineWriter>,
    closed: AtomicBool,
    cancel: CancellationToken,
    peer: Option<SocketAddr>,
}

impl Connection {
    fn new(writer: LineWriter, peer: Option<SocketAddr>) -> Self {
        Self {
            writer: tokio::sync::Mutex::new(writer),
            closed: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            peer,
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Claim the right to tear down. True for exactly one caller.
    fn begin_close(&self) -> bool {
        self.closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

enum Slot {
    Disconnected,
    Connecting,
    Connected(Arc<Connection>),
}

struct Shared {
    slot: Mutex<Slot>,
    dispatcher: EventDispatcher,
    last_error: Mutex<Option<String>>,
    config: ClientConfig,
}

impl Shared {
    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn current(&self) -> Option<Arc<Connection>> {
        match &*self.slot() {
            Slot::Connected(conn) => Some(conn.clone()),
            _ => None,
        }
    }

    fn record_error(&self, err: &ChatError) {
        warn!("{}", err);
        *self.last_error.lock().unwrap_or_else(|e| e.into_inner()) = Some(err.to_string());
    }

    fn record_success(&self) {
        if self.config.last_error_policy == LastErrorPolicy::ResetOnSuccess {
            *self.last_error.lock().unwrap_or_else(|e| e.into_inner()) = None;
        }
    }

    /// Close `conn` if nobody has yet. Returns true if this call closed it.
    ///
    /// Cancelling first makes an in-flight write give up the writer lock, so
    /// this never waits on a peer that stopped reading.
    async fn teardown(&self, conn: &Arc<Connection>) -> bool {
        if !conn.begin_close() {
            trace!("Connection already closed");
            return false;
        }

        conn.cancel.cancel();
        conn.writer.lock().await.close().await;

        {
            let mut slot = self.slot();
            if matches!(&*slot, Slot::Connected(current) if Arc::ptr_eq(current, conn)) {
                *slot = Slot::Disconnected;
            }
        }

        info!("Disconnected");
        self.dispatcher.dispatch(&ChatEvent::Disconnected);
        true
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        // Last client handle gone: stop the reader so the socket is released
        if let Slot::Connected(conn) = &*self.slot() {
            conn.cancel.cancel();
        }
    }
}

/// Resets `Connecting` back to `Disconnected` unless the connect completed,
/// including when the connect future is dropped midway.
struct ConnectingGuard<'a> {
    shared: &'a Shared,
    armed: bool,
}

impl ConnectingGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for ConnectingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut slot = self.shared.slot();
            if matches!(*slot, Slot::Connecting) {
                *slot = Slot::Disconnected;
            }
        }
    }
}

/// TCP chat client
///
/// Cloning yields another handle to the same client and connection.
#[derive(Clone)]
pub struct ChatClient {
    shared: Arc<Shared>,
}

impl Default for ChatClient {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

impl ChatClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                slot: Mutex::new(Slot::Disconnected),
                dispatcher: EventDispatcher::new(),
                last_error: Mutex::new(None),
                config,
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.shared.config
    }

    /// Connect to a chat server and start the reader task
    ///
    /// On failure the client stays `Disconnected` and the error is recorded
    /// as the last error. Nothing is retried.
    pub async fn connect(&self, host: &str, port: u16) -> Result<()> {
        let guard = self.begin_connect()?;

        info!("Connecting to {}:{}", host, port);
        match LineTransport::connect(host, port, &self.shared.config).await {
            Ok(transport) => {
                self.attach(transport, guard);
                Ok(())
            }
            Err(e) => {
                self.shared.record_error(&e);
                Err(e)
            }
        }
    }

    /// Use an already established stream as the connection
    pub async fn connect_with_stream<S>(&self, stream: S) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let guard = self.begin_connect()?;
        self.attach(LineTransport::from_stream(stream), guard);
        Ok(())
    }

    fn begin_connect(&self) -> Result<ConnectingGuard<'_>> {
        let mut slot = self.shared.slot();
        if !matches!(*slot, Slot::Disconnected) {
            drop(slot);
            let err = ChatError::AlreadyConnected;
            self.shared.record_error(&err);
            return Err(err);
        }
        *slot = Slot::Connecting;
        Ok(ConnectingGuard {
            shared: &self.shared,
            armed: true,
        })
    }

    fn attach(&self, transport: LineTransport, guard: ConnectingGuard<'_>) {
        let peer = transport.peer_addr();
        let (reader, writer) = transport.into_split();
        let conn = Arc::new(Connection::new(writer, peer));

        *self.shared.slot() = Slot::Connected(conn.clone());
        guard.disarm();
        self.shared.record_success();

        match peer {
            Some(addr) => info!("Connected to {}", addr),
            None => info!("Connected"),
        }

        tokio::spawn(run_reader(Arc::downgrade(&self.shared), conn, reader));
    }

    /// Close the connection
    ///
    /// Safe to call repeatedly and concurrently with the reader noticing a
    /// dropped stream: exactly one `Disconnected` event is dispatched per
    /// connection. Returns true if this call performed the close.
    pub async fn disconnect(&self) -> bool {
        match self.shared.current() {
            Some(conn) => self.shared.teardown(&conn).await,
            None => false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        match &*self.shared.slot() {
            Slot::Disconnected => ConnectionState::Disconnected,
            Slot::Connecting => ConnectionState::Connecting,
            Slot::Connected(_) => ConnectionState::Connected,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Remote address of the current TCP connection
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.shared.current().and_then(|conn| conn.peer)
    }

    /// Send one command line
    ///
    /// Fails immediately with [`ChatError::NotConnected`] when there is no
    /// connection. Write errors are returned as-is; the reader task decides
    /// whether the connection is gone.
    pub async fn send_command(&self, cmd: ClientCommand) -> Result<()> {
        let result = match self.shared.current() {
            Some(conn) => write_command(&conn, &cmd).await,
            None => Err(ChatError::NotConnected),
        };

        match &result {
            Ok(()) => self.shared.record_success(),
            Err(e) => self.shared.record_error(e),
        }
        result
    }

    /// `login <username>`
    pub async fn try_login(&self, username: &str) -> Result<()> {
        self.send_command(ClientCommand::login(username)).await
    }

    /// `msg <text>`
    pub async fn send_public_message(&self, text: &str) -> Result<()> {
        self.send_command(ClientCommand::public_message(text)).await
    }

    /// `privmsg <recipient> <text>`
    pub async fn send_private_message(&self, recipient: &str, text: &str) -> Result<()> {
        self.send_command(ClientCommand::private_message(recipient, text))
            .await
    }

    /// `users`
    pub async fn refresh_user_list(&self) -> Result<()> {
        self.send_command(ClientCommand::UserList).await
    }

    /// `help`
    pub async fn ask_supported_commands(&self) -> Result<()> {
        self.send_command(ClientCommand::Help).await
    }

    /// Register observer; no-op if already registered
    pub fn add_observer(&self, observer: Arc<dyn ChatObserver>) -> bool {
        self.shared.dispatcher.register(observer)
    }

    /// Unregister observer; no-op if not registered
    pub fn remove_observer(&self, observer: &Arc<dyn ChatObserver>) -> bool {
        self.shared.dispatcher.unregister(observer)
    }

    /// Register a channel observer and return its receiving half
    ///
    /// Capacity comes from `ClientConfig::event_buffer`. The observer stays
    /// registered for the life of the client.
    pub fn event_stream(&self) -> mpsc::Receiver<ChatEvent> {
        let (stream, rx) = EventStream::new(self.shared.config.event_buffer);
        self.add_observer(Arc::new(stream));
        rx
    }

    /// Most recent failure, if any
    pub fn last_error(&self) -> Option<String> {
        self.shared
            .last_error
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

/// Write one command, abandoning it if the connection is closed meanwhile.
/// A peer that stops reading must not keep the writer lock from teardown.
async fn write_command(conn: &Connection, cmd: &ClientCommand) -> Result<()> {
    let line = LineCodec::encode(cmd);

    let write = async {
        let mut writer = conn.writer.lock().await;
        if conn.is_closed() {
            return Err(ChatError::NotConnected);
        }
        writer.write_line(&line).await
    };

    tokio::select! {
        biased;
        _ = conn.cancel.cancelled() => {
            debug!(keyword = cmd.keyword(), "Send abandoned, connection closed");
            Err(ChatError::NotConnected)
        }
        result = write => {
            result?;
            debug!(keyword = cmd.keyword(), "Sent command");
            Ok(())
        }
    }
}

/// Reader task body. Holds only a weak client reference so dropping the last
/// `ChatClient` ends it.
async fn run_reader(client: Weak<Shared>, conn: Arc<Connection>, mut reader: LineReader) {
    debug!("Reader task started");

    loop {
        if conn.is_closed() {
            break;
        }

        let outcome = tokio::select! {
            biased;
            _ = conn.cancel.cancelled() => break,
            outcome = reader.read_line() => outcome,
        };

        let Some(shared) = client.upgrade() else {
            break;
        };

        match outcome {
            ReadOutcome::Line(line) => {
                if conn.is_closed() {
                    break;
                }
                trace!("<< {}", line);
                match LineCodec::decode(&line) {
                    Ok(Some(event)) => shared.dispatcher.dispatch(&event),
                    Ok(None) => {}
                    Err(e) => warn!("Skipping malformed line {:?}: {}", line, e),
                }
            }
            ReadOutcome::EndOfStream => {
                info!("Server closed the connection");
                shared.teardown(&conn).await;
                break;
            }
            ReadOutcome::Failed(e) => {
                warn!("Read failed: {}", e);
                shared.teardown(&conn).await;
                break;
            }
        }
    }

    debug!("Reader task ended");
}
