//! Status taxonomy and the translation of failures into it.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

use mqc::MessageKind;

use crate::ffi::{MqcConnection, lock, ref_from};

/// Outcome of an API call. Exactly one value is returned per call.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MqcStatus {
    /// The call succeeded.
    Success = 0,
    /// A failure with no more specific status.
    Error,
    /// The broker rejected the credentials.
    SecurityError,
    /// The call is not valid in the object's current state.
    IllegalState,
    /// The client id is empty or already in use.
    InvalidClientId,
    /// The destination does not exist or may not be used here.
    InvalidDestination,
    /// The message selector is malformed.
    InvalidSelector,
    /// A read ran past the end of the message body.
    MessageEof,
    /// A value could not be converted to the requested type.
    MessageFormatError,
    /// The message body is write-only.
    MessageNotReadable,
    /// The message body or properties are read-only.
    MessageNotWritable,
    /// The operation is not supported on this object.
    UnsupportedOperation,
    /// No message arrived before the timeout.
    ReceiveTimedOut,
    /// No bytes were left to read.
    IncompleteRead,
    /// The message handle holds a different kind of message.
    InvalidMessageType,
    /// The acknowledgement mode is not one of the `MQC_ACK_*` values.
    UnknownAckType,
}

/// Failures detected at the boundary or raised by the runtime.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// A required pointer was null.
    #[error("null pointer")]
    NullPointer,

    /// A property or map key was empty.
    #[error("key must not be empty")]
    EmptyKey,

    /// A typed accessor was called on another kind of message.
    #[error("expected a {expected:?} message, handle holds a {found:?} message")]
    InvalidMessageType {
        /// Kind the accessor works on.
        expected: MessageKind,
        /// Kind of the handle.
        found: MessageKind,
    },

    /// The acknowledgement mode value is unknown.
    #[error("unknown acknowledgement mode {0}")]
    UnknownAckMode(i32),

    /// The destination does not suit the operation.
    #[error("invalid destination: {0}")]
    InvalidDestination(String),

    /// An argument is out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A C string was not UTF-8.
    #[error("invalid utf-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// No message arrived in time.
    #[error("receive timed out")]
    ReceiveTimedOut,

    /// Nothing was left to read.
    #[error("no bytes left to read")]
    IncompleteRead,

    /// The consumer was closed during a blocking receive.
    #[error("consumer closed while receiving")]
    ConsumerClosed,

    /// The shared tokio runtime could not be built.
    #[error("failed to start runtime: {0}")]
    RuntimeStart(String),

    /// Raised by the messaging runtime.
    #[error(transparent)]
    Runtime(#[from] mqc::Error),

    /// A panic was caught.
    #[error("panic: {0}")]
    Panic(String),
}

impl Error {
    /// The status reported for this failure.
    #[must_use]
    pub fn status(&self) -> MqcStatus {
        match self {
            Self::InvalidMessageType { .. } => MqcStatus::InvalidMessageType,
            Self::UnknownAckMode(_) => MqcStatus::UnknownAckType,
            Self::InvalidDestination(_) => MqcStatus::InvalidDestination,
            Self::ReceiveTimedOut => MqcStatus::ReceiveTimedOut,
            Self::IncompleteRead => MqcStatus::IncompleteRead,
            Self::Runtime(e) => runtime_status(e),
            Self::NullPointer
            | Self::EmptyKey
            | Self::InvalidArgument(_)
            | Self::Utf8(_)
            | Self::ConsumerClosed
            | Self::RuntimeStart(_)
            | Self::Panic(_) => MqcStatus::Error,
        }
    }
}

/// Most specific kinds first; anything the table does not know is `Error`.
fn runtime_status(error: &mqc::Error) -> MqcStatus {
    use mqc::Error as E;
    match error {
        E::Security(_) => MqcStatus::SecurityError,
        E::IllegalState(_) => MqcStatus::IllegalState,
        E::InvalidClientId(_) => MqcStatus::InvalidClientId,
        E::InvalidDestination(_) => MqcStatus::InvalidDestination,
        E::InvalidSelector(_) => MqcStatus::InvalidSelector,
        E::MessageEof => MqcStatus::MessageEof,
        E::MessageFormat(_) => MqcStatus::MessageFormatError,
        E::MessageNotReadable => MqcStatus::MessageNotReadable,
        E::MessageNotWriteable => MqcStatus::MessageNotWritable,
        E::UnsupportedOperation(_) => MqcStatus::UnsupportedOperation,
        _ => MqcStatus::Error,
    }
}

// ---------------------------------------------------------------------------
// Translation
// ---------------------------------------------------------------------------

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_owned())
}

/// Run `f`, turning a panic into [`Error::Panic`].
fn contain<F>(f: F) -> Result<(), Error>
where
    F: FnOnce() -> Result<(), Error>,
{
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        let message = panic_message(payload.as_ref());
        tracing::error!(panic = %message, "caught panic at the C boundary");
        Err(Error::Panic(message))
    })
}

/// Execute a closure and translate its outcome into a status.
pub(crate) fn catch<F>(f: F) -> MqcStatus
where
    F: FnOnce() -> Result<(), Error>,
{
    match contain(f) {
        Ok(()) => MqcStatus::Success,
        Err(e) => {
            let status = e.status();
            tracing::debug!(?status, error = %e, "call failed");
            status
        }
    }
}

/// Like [`catch`], but also records the failure in the connection's
/// last-error slot for [`mqc_get_error_string`](crate::connection::mqc_get_error_string).
///
/// # Safety
///
/// `connection` must be null or a live handle.
pub(crate) unsafe fn catch_connection<F>(connection: *const MqcConnection, f: F) -> MqcStatus
where
    F: FnOnce(&MqcConnection) -> Result<(), Error>,
{
    let connection = match unsafe { ref_from(connection) } {
        Ok(connection) => connection,
        Err(e) => return e.status(),
    };
    match contain(|| f(connection)) {
        Ok(()) => MqcStatus::Success,
        Err(e) => {
            let status = e.status();
            tracing::debug!(?status, error = %e, "connection call failed");
            *lock(&connection.last_error) = Some(e);
            status
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Runtime kinds map onto their own status; unknown kinds fall back.
    #[test]
    fn test_runtime_mapping() {
        let cases = [
            (mqc::Error::Security(String::new()), MqcStatus::SecurityError),
            (mqc::Error::IllegalState(String::new()), MqcStatus::IllegalState),
            (mqc::Error::MessageEof, MqcStatus::MessageEof),
            (mqc::Error::MessageNotWriteable, MqcStatus::MessageNotWritable),
            (mqc::Error::ConnectionFailed(String::new()), MqcStatus::Error),
            (mqc::Error::Other(String::new()), MqcStatus::Error),
        ];
        for (error, status) in cases {
            assert_eq!(Error::from(error).status(), status);
        }
    }

    /// Panics never escape and always report a failure.
    #[test]
    fn test_panic_is_contained() {
        let status = catch(|| panic!("boom"));
        assert_eq!(status, MqcStatus::Error);
        assert_eq!(catch(|| Ok(())), MqcStatus::Success);
    }
}
