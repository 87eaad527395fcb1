//! tcpchat core - client protocol engine for line-based TCP chat servers
//!
//! This crate provides:
//! - Domain types (client commands, chat events)
//! - Line protocol codec with a bounded tokenizer
//! - TCP line transport
//! - Observer registry and event dispatch
//! - Chat client with a background reader task
//! - Error types

pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod protocol;
pub mod streaming;
pub mod transport;
pub mod types;

// Re-export common types
pub use client::{ChatClient, ConnectionState};
pub use config::{ClientConfig, LastErrorPolicy};
pub use dispatch::{observer_fn, ChatObserver, EventDispatcher};
pub use error::{ChatError, Result};
pub use protocol::{DecodeError, LineCodec};
pub use streaming::EventStream;
pub use transport::{LineTransport, ReadOutcome};
pub use types::{ChatEvent, ClientCommand};
