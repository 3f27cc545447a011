//! Unified infrastructure error type.

/// The error type returned by warden's fallible setup and serving operations.
///
/// Request-level failures (403, 420, 500, ...) are not `Error`s: they travel
/// as [`Failure`](crate::Failure) values to the terminal
/// [`ErrorHandler`](crate::ErrorHandler). This type surfaces failures that
/// happen outside a request: binding to a port, reading configuration,
/// defining an invalid error kind.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("config: {key}: {reason}")]
    Config { key: &'static str, reason: String },

    #[error("invalid error kind `{name}`: {reason}")]
    InvalidKind { name: &'static str, reason: String },
}
