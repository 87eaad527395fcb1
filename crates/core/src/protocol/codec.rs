//! Line codec for the chat protocol
//!
//! Outgoing commands become one text line each; incoming lines are classified
//! by their leading keyword (case-sensitive) and turned into [`ChatEvent`]s.

use thiserror::Error;

use super::tokenizer::{self, Tokens, MESSAGE_PIECES};
use crate::types::{ChatEvent, ClientCommand};

/// Failure to extract the payload of a recognized server line
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("`{keyword}` line is missing its {field}")]
    MissingField {
        keyword: &'static str,
        field: &'static str,
    },
}

/// Codec for line-delimited chat commands and responses
pub struct LineCodec;

impl LineCodec {
    /// Encode client command as one protocol line (no terminator)
    pub fn encode(cmd: &ClientCommand) -> String {
        cmd.encode()
    }

    /// Decode one server line (already stripped of its terminator)
    ///
    /// Returns `Ok(None)` for blank lines and unknown keywords.
    pub fn decode(line: &str) -> Result<Option<ChatEvent>, DecodeError> {
        if line.trim().is_empty() {
            return Ok(None);
        }

        let event = match tokenizer::keyword(line) {
            "loginok" => ChatEvent::login_result(true),
            "loginerr" => ChatEvent::login_result(false),
            "users" => ChatEvent::UserList {
                users: tokenizer::words(line),
            },
            "msg" => Self::decode_message(line, "msg", false)?,
            "privmsg" => Self::decode_message(line, "privmsg", true)?,
            "msgerr" => ChatEvent::MessageError {
                reason: tokenizer::remainder(line).to_string(),
            },
            "cmderr" => ChatEvent::CommandError {
                reason: tokenizer::remainder(line).to_string(),
            },
            "supported" => ChatEvent::SupportedCommands {
                commands: tokenizer::words(line),
            },
            other => {
                tracing::debug!(keyword = other, "Ignoring unknown server line");
                return Ok(None);
            }
        };

        Ok(Some(event))
    }

    fn decode_message(
        line: &str,
        keyword: &'static str,
        private: bool,
    ) -> Result<ChatEvent, DecodeError> {
        let tokens = Tokens::split(line, MESSAGE_PIECES);

        let sender = tokens
            .get(1)
            .filter(|s| !s.is_empty())
            .ok_or(DecodeError::MissingField {
                keyword,
                field: "sender",
            })?;
        let text = tokens.get(2).ok_or(DecodeError::MissingField {
            keyword,
            field: "text",
        })?;

        Ok(ChatEvent::message(private, sender, text))
    }
}
