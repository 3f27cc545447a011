//! Failures that reach the terminal error handler.
//!
//! A stage or handler that cannot produce a response returns a [`Failure`].
//! There are exactly two shapes:
//!
//! - [`ApplicationError`]: an expected, classified failure raised with a
//!   registered [`ErrorKind`]. Status and severity come from the kind.
//! - [`Failure::Unexpected`]: anything else (a storage fault, a panic, a bug).
//!   Always answered with 500 and reported with severity `error`.

use std::borrow::Cow;
use std::fmt;
use std::panic::Location;

use crate::kind::ErrorKind;

/// Boxed error for failures that carry no classification.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// An expected failure bound to exactly one [`ErrorKind`].
///
/// Remembers the source location of the code that raised it, which ends up
/// on the telemetry event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApplicationError {
    kind: ErrorKind,
    message: Cow<'static, str>,
    location: &'static Location<'static>,
}

impl ApplicationError {
    /// Raises `kind` with its description as the message.
    #[track_caller]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: Cow::Borrowed(kind.description()),
            location: Location::caller(),
        }
    }

    /// Raises `kind` with a message for operators.
    #[track_caller]
    pub fn with_message(kind: ErrorKind, message: impl Into<Cow<'static, str>>) -> Self {
        Self { kind, message: message.into(), location: Location::caller() }
    }

    pub fn kind(&self) -> &ErrorKind { &self.kind }
    pub fn message(&self) -> &str { &self.message }

    /// Where the error was raised.
    pub fn location(&self) -> &'static Location<'static> { self.location }
}

impl fmt::Display for ApplicationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.kind.status(), self.message)
    }
}

impl std::error::Error for ApplicationError {}

/// Everything a stage can forward to the terminal handler.
#[derive(Debug, thiserror::Error)]
pub enum Failure {
    #[error(transparent)]
    Application(#[from] ApplicationError),

    #[error("unexpected: {0}")]
    Unexpected(#[source] BoxError),
}

impl Failure {
    pub fn unexpected(err: impl Into<BoxError>) -> Self {
        Self::Unexpected(err.into())
    }

    pub fn is_application_error(&self) -> bool {
        matches!(self, Self::Application(_))
    }

    pub fn kind(&self) -> Option<&ErrorKind> {
        match self {
            Self::Application(e) => Some(e.kind()),
            Self::Unexpected(_)  => None,
        }
    }

    /// Where an application error was raised. Unexpected failures carry none.
    pub fn location(&self) -> Option<&'static Location<'static>> {
        match self {
            Self::Application(e) => Some(e.location()),
            Self::Unexpected(_)  => None,
        }
    }
}

/// Shortcut so handlers can write `return Err(MUST_CONNECT.into())`.
impl From<ErrorKind> for Failure {
    #[track_caller]
    fn from(kind: ErrorKind) -> Self {
        Self::Application(ApplicationError::new(kind))
    }
}

impl From<crate::identity::LookupError> for Failure {
    fn from(e: crate::identity::LookupError) -> Self {
        Self::Unexpected(Box::new(e))
    }
}
