//! Primitive codec
//!
//! Byte-level reading and writing of individual PDF objects: a
//! [`Lexer`](lexer::Lexer) over byte slices, an [`ObjectParser`] that builds
//! [`Object`](crate::objects::Object) values from tokens, and the
//! [`serialize`] functions that write them back out.

pub mod lexer;
pub mod parser;
pub mod serialize;

pub use self::lexer::{Lexer, Token};
pub use self::parser::{parse_object, ObjectParser};
pub use self::serialize::{serialize_indirect, to_bytes, write_object, IndirectUnit};

/// Result type for codec operations
pub type ParseResult<T> = Result<T, ParseError>;

/// Codec errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("Syntax error at position {position}: {message}")]
    SyntaxError { position: usize, message: String },

    #[error("Unexpected token: expected {expected}, found {found}")]
    UnexpectedToken { expected: String, found: String },

    #[error("Unexpected end of input")]
    UnexpectedEof,

    #[error("Missing required key: {0}")]
    MissingKey(String),
}
