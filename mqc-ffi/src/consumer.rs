//! Message consumers and receiving.
//!
//! Blocking receives run on the shared runtime. Closing the consumer, its
//! session or its connection from another thread ends them.

use std::ffi::c_char;
use std::time::Duration;

use mqc::DestinationKind;

use crate::error::{Error, MqcStatus, catch};
use crate::ffi::*;

/// Create a consumer without a selector.
/// Caller must free with [`mqc_destroy_consumer`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_create_default_consumer(
    session: *const MqcSession,
    destination: *const MqcDestination,
    out: *mut *mut MqcMessageConsumer,
) -> MqcStatus {
    unsafe { mqc_create_consumer(session, destination, std::ptr::null(), 0, out) }
}

/// Create a consumer. `selector` may be null. With `no_local` set, a topic
/// consumer skips messages published through its own connection.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_create_consumer(
    session: *const MqcSession,
    destination: *const MqcDestination,
    selector: *const c_char,
    no_local: i32,
    out: *mut *mut MqcMessageConsumer,
) -> MqcStatus {
    catch(|| {
        let session = unsafe { ref_from(session)? };
        let destination = unsafe { ref_from(destination)? };
        let selector = unsafe { c_str_to_option(selector)? };
        if out.is_null() {
            return Err(Error::NullPointer);
        }
        let inner = session.inner.create_consumer(
            &destination.inner,
            selector.as_deref(),
            from_c_bool(no_local),
        )?;
        unsafe { write_out(out, MqcMessageConsumer { inner }) }
    })
}

/// Create a consumer on the durable subscription `name`. Only regular topics
/// are accepted; anything else, temporary topics included, fails with
/// `INVALID_DESTINATION`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_create_durable_consumer(
    session: *const MqcSession,
    destination: *const MqcDestination,
    name: *const c_char,
    selector: *const c_char,
    no_local: i32,
    out: *mut *mut MqcMessageConsumer,
) -> MqcStatus {
    catch(|| {
        let session = unsafe { ref_from(session)? };
        let destination = unsafe { ref_from(destination)? };
        if destination.inner.kind() != DestinationKind::Topic {
            return Err(Error::InvalidDestination(format!(
                "durable subscriptions need a topic, got {}",
                destination.inner
            )));
        }
        let name = unsafe { c_str_to_string(name)? };
        let selector = unsafe { c_str_to_option(selector)? };
        if out.is_null() {
            return Err(Error::NullPointer);
        }
        let inner = session.inner.create_durable_consumer(
            &destination.inner,
            &name,
            selector.as_deref(),
            from_c_bool(no_local),
        )?;
        unsafe { write_out(out, MqcMessageConsumer { inner }) }
    })
}

/// Close and free a consumer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_destroy_consumer(consumer: *mut MqcMessageConsumer) -> MqcStatus {
    unsafe { destroy(consumer) }
}

/// Close a consumer, ending any receive blocked on it.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_close_consumer(consumer: *const MqcMessageConsumer) -> MqcStatus {
    catch(|| {
        unsafe { ref_from(consumer)? }.inner.close();
        Ok(())
    })
}

/// Copy the selector into `buffer`, truncated to fit. No selector copies
/// the empty string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_get_consumer_message_selector(
    consumer: *const MqcMessageConsumer,
    buffer: *mut c_char,
    size: usize,
) -> MqcStatus {
    catch(|| {
        let consumer = unsafe { ref_from(consumer)? };
        let selector = consumer.inner.message_selector().unwrap_or_default();
        unsafe { copy_to_buffer(selector, buffer, size) }
    })
}

// ---------------------------------------------------------------------------
// Receiving
// ---------------------------------------------------------------------------

/// Block until a message arrives. Fails with a null message when the
/// consumer is closed while waiting.
/// Caller must free the message with [`mqc_destroy_message`](crate::message::mqc_destroy_message).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_consumer_receive(
    consumer: *const MqcMessageConsumer,
    out: *mut *mut MqcMessage,
) -> MqcStatus {
    catch(|| {
        let consumer = unsafe { ref_from(consumer)? };
        if out.is_null() {
            return Err(Error::NullPointer);
        }
        let received = block_on(consumer.inner.receive())??;
        unsafe { write_received(out, received, Error::ConsumerClosed) }
    })
}

/// Block for at most `timeout_ms` milliseconds; 0 waits forever. When nothing
/// arrives the call fails with `RECEIVE_TIMEDOUT` and a null message; a close
/// while waiting forever fails like [`mqc_consumer_receive`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_consumer_receive_with_timeout(
    consumer: *const MqcMessageConsumer,
    out: *mut *mut MqcMessage,
    timeout_ms: i64,
) -> MqcStatus {
    catch(|| {
        let consumer = unsafe { ref_from(consumer)? };
        if out.is_null() {
            return Err(Error::NullPointer);
        }
        if timeout_ms == 0 {
            let received = block_on(consumer.inner.receive())??;
            return unsafe { write_received(out, received, Error::ConsumerClosed) };
        }
        let ms = u64::try_from(timeout_ms)
            .map_err(|_| Error::InvalidArgument(format!("negative timeout {timeout_ms}")))?;
        let received = block_on(consumer.inner.receive_timeout(Duration::from_millis(ms)))??;
        unsafe { write_received(out, received, Error::ReceiveTimedOut) }
    })
}

/// Take a waiting message without blocking. Nothing waiting is a success
/// with a null message.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_consumer_receive_no_wait(
    consumer: *const MqcMessageConsumer,
    out: *mut *mut MqcMessage,
) -> MqcStatus {
    catch(|| {
        let consumer = unsafe { ref_from(consumer)? };
        if out.is_null() {
            return Err(Error::NullPointer);
        }
        match consumer.inner.receive_no_wait()? {
            Some(message) => unsafe { write_out(out, MqcMessage::new(message)) },
            None => unsafe { write_value(out, std::ptr::null_mut()) },
        }
    })
}

/// Hand a received message to C, or write null and report `missing`.
unsafe fn write_received(
    out: *mut *mut MqcMessage,
    received: Option<mqc::Message>,
    missing: Error,
) -> Result<(), Error> {
    match received {
        Some(message) => unsafe { write_out(out, MqcMessage::new(message)) },
        None => {
            unsafe { write_value(out, std::ptr::null_mut())? };
            Err(missing)
        }
    }
}
