//! Core FFI infrastructure: handles, runtime, logger and memory helpers.

use std::ffi::{CStr, CString, c_char};
use std::future::Future;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use mqc::{Body, MessageKind};
use tokio::runtime::{Builder, Handle, Runtime};

use crate::error::{Error, MqcStatus, catch};

// ---------------------------------------------------------------------------
// Enumeration values exposed to C
// ---------------------------------------------------------------------------

/// Acknowledge on receipt.
pub const MQC_ACK_AUTO: i32 = 0;
/// Lazy acknowledgement; duplicates tolerated.
pub const MQC_ACK_DUPS_OK: i32 = 1;
/// Acknowledging one message acknowledges all delivered before it.
pub const MQC_ACK_CLIENT: i32 = 2;
/// Transacted session.
pub const MQC_ACK_TRANSACTED: i32 = 3;
/// Each message acknowledged on its own.
pub const MQC_ACK_INDIVIDUAL: i32 = 4;

/// Publish/subscribe destination.
pub const MQC_DESTINATION_TOPIC: i32 = 0;
/// Point-to-point destination.
pub const MQC_DESTINATION_QUEUE: i32 = 1;
/// Topic scoped to its connection.
pub const MQC_DESTINATION_TEMPORARY_TOPIC: i32 = 2;
/// Queue scoped to its connection.
pub const MQC_DESTINATION_TEMPORARY_QUEUE: i32 = 3;

/// Durable delivery.
pub const MQC_DELIVERY_PERSISTENT: i32 = 0;
/// Best-effort delivery.
pub const MQC_DELIVERY_NON_PERSISTENT: i32 = 1;

/// Message without a body.
pub const MQC_MESSAGE_KIND_MESSAGE: i32 = 0;
/// Text message.
pub const MQC_MESSAGE_KIND_TEXT: i32 = 1;
/// Bytes message.
pub const MQC_MESSAGE_KIND_BYTES: i32 = 2;
/// Map message.
pub const MQC_MESSAGE_KIND_MAP: i32 = 3;
/// Stream message.
pub const MQC_MESSAGE_KIND_STREAM: i32 = 4;

// ---------------------------------------------------------------------------
// Opaque handles exposed to C
// ---------------------------------------------------------------------------

/// Opaque connection factory handle.
#[derive(Debug)]
pub struct MqcConnectionFactory {
    pub(crate) inner: mqc::ConnectionFactory,
}

/// Opaque connection handle with its last-error slot.
#[derive(Debug)]
pub struct MqcConnection {
    pub(crate) inner: mqc::Connection,
    pub(crate) last_error: Mutex<Option<Error>>,
}

/// Opaque session handle.
#[derive(Debug)]
pub struct MqcSession {
    pub(crate) inner: mqc::Session,
}

/// Opaque destination handle.
#[derive(Debug)]
pub struct MqcDestination {
    pub(crate) inner: mqc::Destination,
}

/// Opaque message handle.
///
/// `kind` is fixed when the handle is made and decides which typed
/// accessors apply.
#[derive(Debug)]
pub struct MqcMessage {
    pub(crate) inner: mqc::Message,
    pub(crate) kind: MessageKind,
}

impl MqcMessage {
    pub(crate) fn new(inner: mqc::Message) -> Self {
        let kind = match inner.body() {
            Body::Empty => MessageKind::Message,
            Body::Text(_) => MessageKind::Text,
            Body::Bytes(_) => MessageKind::Bytes,
            Body::Map(_) => MessageKind::Map,
            Body::Stream(_) => MessageKind::Stream,
        };
        Self { inner, kind }
    }

    /// Fail unless the handle holds a message of `expected` kind.
    pub(crate) fn expect_kind(&self, expected: MessageKind) -> Result<(), Error> {
        if self.kind != expected {
            return Err(Error::InvalidMessageType {
                expected,
                found: self.kind,
            });
        }
        Ok(())
    }
}

/// Opaque producer handle.
#[derive(Debug)]
pub struct MqcMessageProducer {
    pub(crate) inner: mqc::Producer,
}

/// Opaque consumer handle.
#[derive(Debug)]
pub struct MqcMessageConsumer {
    pub(crate) inner: mqc::Consumer,
}

/// Opaque queue browser handle.
#[derive(Debug)]
pub struct MqcQueueBrowser {
    pub(crate) inner: mqc::QueueBrowser,
}

// ---------------------------------------------------------------------------
// Shared tokio runtime
// ---------------------------------------------------------------------------

static RUNTIME: Mutex<Option<Runtime>> = Mutex::new(None);

/// Lock a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle of the shared runtime, started on first use.
fn runtime() -> Result<Handle, Error> {
    let mut runtime = lock(&RUNTIME);
    if let Some(runtime) = runtime.as_ref() {
        return Ok(runtime.handle().clone());
    }
    let started = Builder::new_multi_thread()
        .enable_all()
        .thread_name("mqc-runtime")
        .build()
        .map_err(|e| Error::RuntimeStart(e.to_string()))?;
    let handle = started.handle().clone();
    *runtime = Some(started);
    Ok(handle)
}

/// Block the calling thread on `future` using the shared runtime.
pub(crate) fn block_on<F: Future>(future: F) -> Result<F::Output, Error> {
    Ok(runtime()?.block_on(future))
}

/// Prepare the library for use. Starts the shared runtime and, when the
/// `MQC_LOG` environment variable is set, installs the logger with it as the
/// filter.
#[unsafe(no_mangle)]
pub extern "C" fn mqc_initialize() -> MqcStatus {
    catch(|| {
        if let Ok(filter) = std::env::var("MQC_LOG") {
            install_logger(&filter);
        }
        runtime().map(drop)
    })
}

/// Release process-wide state: stops the shared runtime and forgets every
/// in-process broker. Handles still alive keep their broker.
#[unsafe(no_mangle)]
pub extern "C" fn mqc_terminate() -> MqcStatus {
    catch(|| {
        if let Some(runtime) = lock(&RUNTIME).take() {
            runtime.shutdown_background();
        }
        mqc::broker::shutdown();
        Ok(())
    })
}

// ---------------------------------------------------------------------------
// Logger initialization
// ---------------------------------------------------------------------------

static LOGGER_INIT: OnceLock<()> = OnceLock::new();

fn install_logger(filter: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};
    LOGGER_INIT.get_or_init(|| {
        let filter = EnvFilter::builder().parse_lossy(filter);
        let installed = tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .try_init();
        if let Err(e) = installed {
            tracing::debug!(error = %e, "a global logger is already installed");
        }
    });
}

/// Initialize the tracing logger. Only the first call has an effect.
/// `level` is a filter such as "debug", "info", "mqc=trace" or "off".
/// Pass null for the default ("info").
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_init_logger(level: *const c_char) -> MqcStatus {
    catch(|| {
        let level = unsafe { c_str_to_option(level)? };
        install_logger(level.as_deref().unwrap_or("info"));
        Ok(())
    })
}

// ---------------------------------------------------------------------------
// String helpers
// ---------------------------------------------------------------------------

/// Convert a C string to an owned Rust `String`. Fails on null or invalid UTF-8.
pub(crate) unsafe fn c_str_to_string(s: *const c_char) -> Result<String, Error> {
    if s.is_null() {
        return Err(Error::NullPointer);
    }
    Ok(unsafe { CStr::from_ptr(s) }.to_str()?.to_owned())
}

/// Convert a nullable C string to `Option<String>`.
pub(crate) unsafe fn c_str_to_option(s: *const c_char) -> Result<Option<String>, Error> {
    if s.is_null() {
        return Ok(None);
    }
    Ok(Some(unsafe { CStr::from_ptr(s) }.to_str()?.to_owned()))
}

/// Convert a nullable C string, treating null as empty.
pub(crate) unsafe fn c_str_or_empty(s: *const c_char) -> Result<String, Error> {
    Ok(unsafe { c_str_to_option(s)? }.unwrap_or_default())
}

/// A property or map key: non-null and non-empty.
pub(crate) unsafe fn c_key(key: *const c_char) -> Result<String, Error> {
    let key = unsafe { c_str_to_string(key)? };
    if key.is_empty() {
        return Err(Error::EmptyKey);
    }
    Ok(key)
}

/// Copy `s` into `buf`, truncating to `size - 1` bytes, and terminate it.
pub(crate) unsafe fn copy_to_buffer(s: &str, buf: *mut c_char, size: usize) -> Result<(), Error> {
    if buf.is_null() {
        return Err(Error::NullPointer);
    }
    if size == 0 {
        return Err(Error::InvalidArgument("buffer size is zero".into()));
    }
    let len = s.len().min(size - 1);
    unsafe {
        std::ptr::copy_nonoverlapping(s.as_ptr(), buf.cast::<u8>(), len);
        *buf.add(len) = 0;
    }
    Ok(())
}

/// Copy `s` into `buf` only if it fits with its terminator.
pub(crate) unsafe fn copy_exact_to_buffer(
    s: &str,
    buf: *mut c_char,
    size: usize,
) -> Result<(), Error> {
    if s.len() >= size {
        return Err(Error::InvalidArgument(format!(
            "buffer of {size} bytes cannot hold {} bytes and a terminator",
            s.len()
        )));
    }
    unsafe { copy_to_buffer(s, buf, size) }
}

/// Hand a list of strings to C as one boxed array of owned C strings.
/// An empty list yields null and a count of zero.
/// Caller must free with [`mqc_free_string_array`].
pub(crate) unsafe fn write_string_array(
    strings: Vec<String>,
    out: *mut *mut *mut c_char,
    out_count: *mut usize,
) -> Result<(), Error> {
    if out.is_null() || out_count.is_null() {
        return Err(Error::NullPointer);
    }
    let owned = strings
        .into_iter()
        .map(|s| CString::new(s).map_err(|e| Error::InvalidArgument(e.to_string())))
        .collect::<Result<Vec<_>, _>>()?;
    let count = owned.len();
    let array = if owned.is_empty() {
        std::ptr::null_mut()
    } else {
        let raw: Box<[*mut c_char]> = owned.into_iter().map(CString::into_raw).collect();
        Box::into_raw(raw).cast::<*mut c_char>()
    };
    unsafe {
        *out = array;
        *out_count = count;
    }
    Ok(())
}

/// Free a string array returned by this library together with its strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_free_string_array(array: *mut *mut c_char, count: usize) {
    if array.is_null() || count == 0 {
        return;
    }
    let raw = unsafe { Box::from_raw(std::ptr::slice_from_raw_parts_mut(array, count)) };
    for s in raw.iter().copied().filter(|s| !s.is_null()) {
        drop(unsafe { CString::from_raw(s) });
    }
}

// ---------------------------------------------------------------------------
// Handle helpers
// ---------------------------------------------------------------------------

/// Validate a pointer and create a shared reference.
pub(crate) unsafe fn ref_from<'a, T>(ptr: *const T) -> Result<&'a T, Error> {
    if ptr.is_null() {
        return Err(Error::NullPointer);
    }
    Ok(unsafe { &*ptr })
}

/// Validate a pointer and create an exclusive reference.
pub(crate) unsafe fn mut_from<'a, T>(ptr: *mut T) -> Result<&'a mut T, Error> {
    if ptr.is_null() {
        return Err(Error::NullPointer);
    }
    Ok(unsafe { &mut *ptr })
}

/// Box a value and write the raw pointer into an output parameter.
pub(crate) unsafe fn write_out<T>(out: *mut *mut T, val: T) -> Result<(), Error> {
    if out.is_null() {
        return Err(Error::NullPointer);
    }
    unsafe {
        *out = Box::into_raw(Box::new(val));
    }
    Ok(())
}

/// Write a plain value into an output parameter.
pub(crate) unsafe fn write_value<T>(out: *mut T, val: T) -> Result<(), Error> {
    if out.is_null() {
        return Err(Error::NullPointer);
    }
    unsafe {
        out.write(val);
    }
    Ok(())
}

/// Free a handle made by this library. Null is accepted.
pub(crate) unsafe fn destroy<T>(ptr: *mut T) -> MqcStatus {
    catch(|| {
        if !ptr.is_null() {
            drop(unsafe { Box::from_raw(ptr) });
        }
        Ok(())
    })
}

/// The message behind a handle of `kind`. Fails with `INVALID_MESSAGE_TYPE`
/// before touching the message when the handle holds another kind.
pub(crate) unsafe fn typed<'a>(
    message: *mut MqcMessage,
    kind: MessageKind,
) -> Result<&'a mut mqc::Message, Error> {
    let message = unsafe { mut_from(message)? };
    message.expect_kind(kind)?;
    Ok(&mut message.inner)
}

/// Copy a decoded string into `buf`. When decoding failed an empty string is
/// written instead and the failure is returned.
pub(crate) unsafe fn copy_decoded(
    decoded: mqc::Result<String>,
    buf: *mut c_char,
    size: usize,
) -> Result<(), Error> {
    match decoded {
        Ok(s) => unsafe { copy_to_buffer(&s, buf, size) },
        Err(e) => {
            if size > 0 && !buf.is_null() {
                unsafe { *buf = 0 };
            }
            Err(e.into())
        }
    }
}

/// Read `len` bytes from a caller buffer. Null is only accepted with `len == 0`.
pub(crate) unsafe fn byte_slice<'a>(ptr: *const u8, len: usize) -> Result<&'a [u8], Error> {
    if len == 0 {
        return Ok(&[]);
    }
    if ptr.is_null() {
        return Err(Error::NullPointer);
    }
    Ok(unsafe { std::slice::from_raw_parts(ptr, len) })
}

/// C boolean (`0` false, anything else true).
pub(crate) const fn from_c_bool(v: i32) -> bool {
    v != 0
}

/// Rust boolean to C (`1` or `0`).
pub(crate) fn to_c_bool(v: bool) -> i32 {
    i32::from(v)
}
