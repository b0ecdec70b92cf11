use std::{collections::TryReserveError, fmt, io};

use thiserror::Error;

/// Error returned by [`parse`](crate::parse) and [`parse_file`](crate::parse_file).
///
/// Carries the position of the token being processed when the session failed.
/// Positions are 1-based; IO errors have no position and report `0:0`.
#[derive(Debug)]
pub struct ConfError {
    kind: ErrorKind,
    pub line: usize,
    pub column: usize,
}

impl ConfError {
    pub(crate) fn new(kind: ErrorKind, line: usize, column: usize) -> Self {
        Self { kind, line, column }
    }

    pub(crate) fn io(err: io::Error) -> Self {
        Self::new(ErrorKind::Io(err), 0, 0)
    }

    /// The error code.
    #[must_use]
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Consumes the error, returning its code.
    #[must_use]
    pub fn into_kind(self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Display for ConfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::Io(err) => err.fmt(f),
            kind => write!(f, "{}:{}: {kind}", self.line, self.column),
        }
    }
}

impl std::error::Error for ConfError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

/// Error code of a failed session.
#[derive(Error, Debug)]
pub enum ErrorKind {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Value(#[from] ValueError),
    #[error(transparent)]
    User(HandlerError),
    #[error("out of memory")]
    System(#[from] TryReserveError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Malformed input text, reported by the [`Lexer`](crate::Lexer).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxError {
    #[error("unterminated string")]
    UnterminatedString,
    #[error("unterminated comment")]
    UnterminatedComment,
    #[error("invalid escape sequence '\\{0}'")]
    BadEscape(char),
    #[error("object must be preceded by a key")]
    ObjectWithoutKey,
    #[error("unmatched '}}'")]
    UnmatchedClose,
    #[error("unexpected end of input inside an object")]
    UnclosedObject,
}

/// The input does not match the schema, or a handler broke its contract.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaError {
    #[error("no such key in the current context")]
    UnknownKey,
    #[error("got object, expected something else")]
    UnexpectedObject,
    #[error("the key doesn't expect multiple values")]
    UnexpectedMultipleValues,
    #[error("only 1 object value is supported")]
    MultipleObjectValues,
    #[error("object handler must add a new context")]
    HandlerContractViolated,
    #[error("value type expected in scheme")]
    InvalidSchemaType,
    #[error("value without a key")]
    NoActiveKey,
    #[error("object close without a matching open")]
    UnexpectedClose,
    #[error("input ended inside an object")]
    UnclosedObject,
    #[error("maximum nesting depth exceeded")]
    DepthLimitExceeded,
    #[error("nested object does not match its parent's type")]
    ParentTypeMismatch,
    #[error("no active context")]
    NoContext,
}

/// A well-formed value that is invalid for its declared type.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueError {
    #[error("integer expected")]
    NotANumber,
    #[error("integer out of range")]
    OutOfRange,
    #[error("boolean expected")]
    NotABoolean,
    #[error("value must not be zero")]
    ZeroNotAllowed,
    #[error("value must not be empty")]
    ValueEmpty,
    #[error("value must not contain NULL character")]
    EmbeddedNull,
}

/// Error returned by a schema handler; aborts the session and is surfaced
/// verbatim as [`ErrorKind::User`].
#[derive(Error, Debug)]
#[error(transparent)]
pub struct HandlerError(Box<dyn std::error::Error + Send + Sync>);

impl HandlerError {
    /// Wraps any error (or message) produced by a handler.
    pub fn new(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self(err.into())
    }

    /// Returns the wrapped error if it is of type `E`.
    #[must_use]
    pub fn downcast_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.0.downcast_ref()
    }
}

impl From<&str> for HandlerError {
    fn from(msg: &str) -> Self {
        Self::new(msg)
    }
}

impl From<String> for HandlerError {
    fn from(msg: String) -> Self {
        Self::new(msg)
    }
}

/// Result type of schema handlers.
pub type HandlerResult = Result<(), HandlerError>;
