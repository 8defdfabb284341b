//! Errors raised while reading type strings.

use thiserror::Error;

/// Failure to parse the textual type syntax.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Input contains a character sequence that is not a token.
    #[error("invalid token at byte {offset}")]
    InvalidToken { offset: usize },

    #[error("unexpected {found} at byte {offset}, expected {expected}")]
    Unexpected {
        found: String,
        expected: &'static str,
        offset: usize,
    },

    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEnd { expected: &'static str },

    #[error("unknown type `{name}` at byte {offset}")]
    UnknownType { name: String, offset: usize },

    #[error("unknown string encoding '{name}'")]
    UnknownEncoding { name: String },

    /// A complete type was read but input remains.
    #[error("trailing input at byte {offset}")]
    TrailingInput { offset: usize },
}
