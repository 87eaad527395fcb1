//! Domain types for the chat protocol

mod command;
mod event;

pub use command::ClientCommand;
pub use event::{ChatEvent, LOGIN_ERROR_MESSAGE, LOGIN_OK_MESSAGE};
