//! End-to-end tests against a scripted TCP chat server

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tcpchat_core::{ChatClient, ChatError, ChatEvent, ChatObserver, ClientConfig, ConnectionState};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(3);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Server side of one accepted client connection
struct Peer {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl Peer {
    async fn expect_line(&mut self) -> String {
        timeout(WAIT, self.lines.next_line())
            .await
            .expect("timed out waiting for client line")
            .expect("read failed")
            .expect("client closed connection")
    }

    async fn send(&mut self, line: &str) {
        self.writer.write_all(line.as_bytes()).await.unwrap();
        self.writer.write_all(b"\n").await.unwrap();
    }
}

async fn listen() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

async fn accept(listener: &TcpListener) -> Peer {
    let (stream, _) = timeout(WAIT, listener.accept()).await.unwrap().unwrap();
    let (read, writer) = stream.into_split();
    Peer {
        lines: BufReader::new(read).lines(),
        writer,
    }
}

async fn next_event(events: &mut mpsc::Receiver<ChatEvent>) -> ChatEvent {
    timeout(WAIT, events.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event stream closed")
}

async fn connected() -> (ChatClient, Peer, mpsc::Receiver<ChatEvent>) {
    init_tracing();
    let (listener, addr) = listen().await;
    let client = ChatClient::default();
    let events = client.event_stream();

    let (connect, peer) = tokio::join!(client.connect("127.0.0.1", addr.port()), accept(&listener));
    connect.unwrap();
    assert_eq!(client.peer_addr(), Some(addr));
    (client, peer, events)
}

#[tokio::test]
async fn test_login_and_chat_session() {
    let (client, mut peer, mut events) = connected().await;
    assert_eq!(client.state(), ConnectionState::Connected);

    client.try_login("alice").await.unwrap();
    assert_eq!(peer.expect_line().await, "login alice");
    peer.send("loginok").await;
    assert_eq!(next_event(&mut events).await, ChatEvent::login_result(true));

    client.refresh_user_list().await.unwrap();
    assert_eq!(peer.expect_line().await, "users");
    peer.send("users alice bob carol").await;
    assert_eq!(
        next_event(&mut events).await,
        ChatEvent::UserList {
            users: vec!["alice".into(), "bob".into(), "carol".into()]
        }
    );

    client.send_public_message("hello there world").await.unwrap();
    assert_eq!(peer.expect_line().await, "msg hello there world");
    peer.send("msg bob hi alice, how are you").await;
    assert_eq!(
        next_event(&mut events).await,
        ChatEvent::message(false, "bob", "hi alice, how are you")
    );

    client.send_private_message("carol", "secret msg here").await.unwrap();
    assert_eq!(peer.expect_line().await, "privmsg carol secret msg here");
    peer.send("msgerr incorrect recipient").await;
    assert_eq!(
        next_event(&mut events).await,
        ChatEvent::MessageError {
            reason: "incorrect recipient".into()
        }
    );

    client.ask_supported_commands().await.unwrap();
    assert_eq!(peer.expect_line().await, "help");
    peer.send("supported login msg privmsg users help").await;
    assert_eq!(
        next_event(&mut events).await,
        ChatEvent::SupportedCommands {
            commands: vec![
                "login".into(),
                "msg".into(),
                "privmsg".into(),
                "users".into(),
                "help".into()
            ]
        }
    );
}

#[tokio::test]
async fn test_unknown_and_malformed_lines_are_skipped() {
    let (client, mut peer, mut events) = connected().await;

    peer.send("joke knock knock").await;
    peer.send("msg").await;
    peer.send("cmderr command not supported").await;

    assert_eq!(
        next_event(&mut events).await,
        ChatEvent::CommandError {
            reason: "command not supported".into()
        }
    );
    assert!(client.is_connected());
}

#[tokio::test]
async fn test_server_close_dispatches_disconnected_once() {
    let (client, peer, mut events) = connected().await;

    drop(peer);

    assert_eq!(next_event(&mut events).await, ChatEvent::Disconnected);
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert!(!client.disconnect().await);
    assert!(timeout(Duration::from_millis(200), events.recv()).await.is_err());

    let result = client.send_public_message("anyone?").await;
    assert!(matches!(result, Err(ChatError::NotConnected)));
}

#[tokio::test]
async fn test_client_disconnect_closes_socket() {
    let (client, mut peer, mut events) = connected().await;

    assert!(client.disconnect().await);
    assert!(!client.disconnect().await);
    assert_eq!(next_event(&mut events).await, ChatEvent::Disconnected);

    // Server sees EOF once both halves are released
    let line = timeout(WAIT, peer.lines.next_line()).await.unwrap().unwrap();
    assert_eq!(line, None);
    assert!(timeout(Duration::from_millis(200), events.recv()).await.is_err());
}

#[derive(Default)]
struct DisconnectCounter {
    count: Mutex<usize>,
}

impl ChatObserver for DisconnectCounter {
    fn on_disconnect(&self) -> anyhow::Result<()> {
        *self.count.lock().unwrap() += 1;
        Ok(())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_disconnect_races_server_close() {
    for _ in 0..20 {
        let (client, peer, _events) = connected().await;
        let counter = Arc::new(DisconnectCounter::default());
        client.add_observer(counter.clone());

        let a = client.clone();
        let b = client.clone();
        let first = tokio::spawn(async move { a.disconnect().await });
        let second = tokio::spawn(async move { b.disconnect().await });
        drop(peer);

        let closed_here = [first.await.unwrap(), second.await.unwrap()];
        assert!(closed_here.iter().filter(|c| **c).count() <= 1);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(*counter.count.lock().unwrap(), 1);
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }
}

#[tokio::test]
async fn test_connect_refused_leaves_disconnected() {
    init_tracing();
    let (listener, addr) = listen().await;
    drop(listener);

    let client = ChatClient::new(ClientConfig::default().with_connect_timeout(WAIT));
    let result = client.connect("127.0.0.1", addr.port()).await;

    assert!(result.is_err());
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert!(client.last_error().is_some());
}

#[tokio::test]
async fn test_reconnect_to_new_server() {
    let (client, peer, mut events) = connected().await;
    client.disconnect().await;
    assert_eq!(next_event(&mut events).await, ChatEvent::Disconnected);
    drop(peer);

    let (listener, addr) = listen().await;
    let (connect, mut peer) = tokio::join!(client.connect("127.0.0.1", addr.port()), accept(&listener));
    connect.unwrap();

    peer.send("loginerr").await;
    assert_eq!(next_event(&mut events).await, ChatEvent::login_result(false));
}
