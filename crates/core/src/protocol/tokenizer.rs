//! Bounded tokenizer for protocol lines
//!
//! Protocol fields are separated by a single space. Every keyword has a fixed
//! maximum number of pieces it splits into; the last piece keeps the remainder
//! of the line verbatim, so free text is never cut at its first space.

/// Field separator on the wire
pub const SEPARATOR: char = ' ';

/// Pieces for `keyword <rest...>` lines (`msgerr`, `cmderr`)
pub const REASON_PIECES: usize = 2;

/// Pieces for `keyword <sender> <text...>` lines (`msg`, `privmsg`)
pub const MESSAGE_PIECES: usize = 3;

/// A protocol line split into at most `max` pieces
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tokens<'a> {
    pieces: Vec<&'a str>,
}

impl<'a> Tokens<'a> {
    /// Split `line` into at most `max` pieces on the protocol separator
    pub fn split(line: &'a str, max: usize) -> Self {
        Self {
            pieces: line.splitn(max.max(1), SEPARATOR).collect(),
        }
    }

    /// Leading keyword of the line
    pub fn keyword(&self) -> &'a str {
        self.pieces.first().copied().unwrap_or("")
    }

    /// Piece at `index`, if present
    pub fn get(&self, index: usize) -> Option<&'a str> {
        self.pieces.get(index).copied()
    }

    /// Number of pieces
    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }
}

/// Leading keyword of a line
///
/// Fields are split on a single space only, so a line with a leading space
/// has an empty keyword. Trailing whitespace after the keyword (a stray tab or
/// `\r`) is dropped.
pub fn keyword(line: &str) -> &str {
    line.split(SEPARATOR).next().unwrap_or("").trim_end()
}

/// Everything after the keyword, verbatim. Empty when there is none.
pub fn remainder(line: &str) -> &str {
    Tokens::split(line, REASON_PIECES).get(1).unwrap_or("")
}

/// Whitespace-separated words after the keyword
pub fn words(line: &str) -> Vec<String> {
    remainder(line)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}
