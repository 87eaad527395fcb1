//! Client command types encoded onto the wire

use serde::{Deserialize, Serialize};
use std::fmt;

/// Action sent from the client to the chat server
///
/// No escaping is applied when encoding. A username or recipient containing a
/// space will be split by the server; keeping names space-free is the
/// caller's responsibility.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    /// `login <username>`
    Login { username: String },

    /// `msg <text>`
    PublicMessage { text: String },

    /// `privmsg <recipient> <text>`
    PrivateMessage { recipient: String, text: String },

    /// `users`
    UserList,

    /// `help`
    Help,
}

impl ClientCommand {
    /// Create login command
    pub fn login(username: impl Into<String>) -> Self {
        Self::Login {
            username: username.into(),
        }
    }

    /// Create public message command
    pub fn public_message(text: impl Into<String>) -> Self {
        Self::PublicMessage { text: text.into() }
    }

    /// Create private message command
    pub fn private_message(recipient: impl Into<String>, text: impl Into<String>) -> Self {
        Self::PrivateMessage {
            recipient: recipient.into(),
            text: text.into(),
        }
    }

    /// Protocol keyword for this command
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Login { .. } => "login",
            Self::PublicMessage { .. } => "msg",
            Self::PrivateMessage { .. } => "privmsg",
            Self::UserList => "users",
            Self::Help => "help",
        }
    }

    /// Encode as a single protocol line, without line terminator
    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ClientCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Login { username } => write!(f, "login {}", username),
            Self::PublicMessage { text } => write!(f, "msg {}", text),
            Self::PrivateMessage { recipient, text } => {
                write!(f, "privmsg {} {}", recipient, text)
            }
            Self::UserList | Self::Help => f.write_str(self.keyword()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_login() {
        assert_eq!(ClientCommand::login("alice").encode(), "login alice");
    }

    #[test]
    fn test_encode_public_message_keeps_spaces() {
        let cmd = ClientCommand::public_message("hello there world");
        assert_eq!(cmd.encode(), "msg hello there world");
    }

    #[test]
    fn test_encode_private_message() {
        let cmd = ClientCommand::private_message("bob", "secret msg here");
        assert_eq!(cmd.encode(), "privmsg bob secret msg here");
    }

    #[test]
    fn test_encode_bare_commands() {
        assert_eq!(ClientCommand::UserList.encode(), "users");
        assert_eq!(ClientCommand::Help.encode(), "help");
    }

    #[test]
    fn test_encode_has_no_newline() {
        let cmd = ClientCommand::public_message("hi");
        assert!(!cmd.encode().ends_with('\n'));
    }
}
