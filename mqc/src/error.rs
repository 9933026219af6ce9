//! Error taxonomy of the messaging runtime.

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by connections, sessions, messages and their endpoints.
///
/// New kinds may be added over time; callers that map errors onto a closed
/// set of codes must keep a fallback arm.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Credentials were rejected by the broker.
    #[error("security: {0}")]
    Security(String),

    /// The operation is not valid in the object's current state.
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// A client identifier was empty or already in use.
    #[error("invalid client id: {0}")]
    InvalidClientId(String),

    /// A destination does not exist or may not be used here.
    #[error("invalid destination: {0}")]
    InvalidDestination(String),

    /// A message selector failed to parse.
    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    /// A read ran past the end of a bytes or stream body.
    #[error("unexpected end of message body")]
    MessageEof,

    /// A value could not be converted to the requested type.
    #[error("message format: {0}")]
    MessageFormat(String),

    /// The message body is in write-only mode.
    #[error("message body is write-only")]
    MessageNotReadable,

    /// The message body or properties are read-only.
    #[error("message is read-only")]
    MessageNotWriteable,

    /// The operation is not supported for this object.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// The broker could not be reached.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// A broker URI could not be parsed.
    #[error("invalid uri: {0}")]
    Uri(#[from] url::ParseError),

    /// Any other runtime failure.
    #[error("{0}")]
    Other(String),
}

impl Error {
    pub(crate) fn closed(what: &str) -> Self {
        Self::IllegalState(format!("{what} is closed"))
    }
}
