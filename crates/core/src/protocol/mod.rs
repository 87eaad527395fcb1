//! Line protocol: tokenizer and codec

mod codec;
pub mod tokenizer;

pub use codec::{DecodeError, LineCodec};
