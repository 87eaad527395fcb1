//! Chat event types decoded from server lines

use serde::{Deserialize, Serialize};

/// Message reported to observers on `loginok`
pub const LOGIN_OK_MESSAGE: &str = "Log in OK!";

/// Message reported to observers on `loginerr`
pub const LOGIN_ERROR_MESSAGE: &str = "Log in error";

/// Event delivered from the connection to registered observers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// Server answered a login request
    LoginResult { success: bool, message: String },

    /// Connection closed, either by us or by the peer
    Disconnected,

    /// Currently connected users, in server order
    UserList { users: Vec<String> },

    /// Public or private message from another user.
    /// `text` is the verbatim rest of the line, internal spaces included.
    MessageReceived {
        private: bool,
        sender: String,
        text: String,
    },

    /// Server could not deliver one of our messages
    MessageError { reason: String },

    /// Server did not understand one of our commands
    CommandError { reason: String },

    /// Answer to a `help` request
    SupportedCommands { commands: Vec<String> },
}

impl ChatEvent {
    /// Create login result event with the fixed protocol message
    pub fn login_result(success: bool) -> Self {
        let message = if success {
            LOGIN_OK_MESSAGE
        } else {
            LOGIN_ERROR_MESSAGE
        };
        Self::LoginResult {
            success,
            message: message.to_string(),
        }
    }

    /// Create message event
    pub fn message(private: bool, sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self::MessageReceived {
            private,
            sender: sender.into(),
            text: text.into(),
        }
    }

    /// Short name of the variant, used in log fields
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LoginResult { .. } => "login_result",
            Self::Disconnected => "disconnected",
            Self::UserList { .. } => "user_list",
            Self::MessageReceived { .. } => "message_received",
            Self::MessageError { .. } => "message_error",
            Self::CommandError { .. } => "command_error",
            Self::SupportedCommands { .. } => "supported_commands",
        }
    }
}
