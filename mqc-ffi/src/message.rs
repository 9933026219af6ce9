//! Message handles: creation, cloning, properties and standard headers.
//!
//! Operations here work on every kind of message. Body accessors live in
//! the per-kind modules.

use std::ffi::c_char;

use mqc::DeliveryMode;

use crate::error::{Error, MqcStatus, catch};
use crate::ffi::*;

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Create a message without a body. Caller must free with [`mqc_destroy_message`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_create_message(
    session: *const MqcSession,
    out: *mut *mut MqcMessage,
) -> MqcStatus {
    catch(|| {
        let session = unsafe { ref_from(session)? };
        let inner = session.inner.create_message()?;
        unsafe { write_out(out, MqcMessage::new(inner)) }
    })
}

/// Free a message handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_destroy_message(message: *mut MqcMessage) -> MqcStatus {
    unsafe { destroy(message) }
}

/// Create an independent copy of a message with the same kind.
/// Caller must free the copy with [`mqc_destroy_message`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_clone_message(
    message: *const MqcMessage,
    out: *mut *mut MqcMessage,
) -> MqcStatus {
    catch(|| {
        let message = unsafe { ref_from(message)? };
        let clone = MqcMessage {
            inner: message.inner.clone(),
            kind: message.kind,
        };
        unsafe { write_out(out, clone) }
    })
}

/// Write the handle's `MQC_MESSAGE_KIND_*` tag into `out`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_get_message_type(
    message: *const MqcMessage,
    out: *mut i32,
) -> MqcStatus {
    catch(|| {
        let message = unsafe { ref_from(message)? };
        unsafe { write_value(out, message.kind.to_ffi()) }
    })
}

/// Acknowledge a received message. Does nothing unless its session uses
/// client or individual acknowledgement.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_acknowledge_message(message: *const MqcMessage) -> MqcStatus {
    catch(|| Ok(unsafe { ref_from(message)? }.inner.acknowledge()?))
}

/// Empty the body and make it writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_clear_message_body(message: *mut MqcMessage) -> MqcStatus {
    catch(|| {
        unsafe { mut_from(message)? }.inner.clear_body();
        Ok(())
    })
}

/// Remove every property and make the properties writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_clear_message_properties(message: *mut MqcMessage) -> MqcStatus {
    catch(|| {
        unsafe { mut_from(message)? }.inner.clear_properties();
        Ok(())
    })
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

/// Write the number of properties into `out`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_get_num_message_properties(
    message: *const MqcMessage,
    out: *mut usize,
) -> MqcStatus {
    catch(|| {
        let message = unsafe { ref_from(message)? };
        unsafe { write_value(out, message.inner.properties().len()) }
    })
}

/// Write the property names into `out` and their number into `out_count`.
/// No properties yields null and zero. Caller must free a non-null array with
/// [`mqc_free_string_array`](crate::mqc_free_string_array).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_get_message_property_names(
    message: *const MqcMessage,
    out: *mut *mut *mut c_char,
    out_count: *mut usize,
) -> MqcStatus {
    catch(|| {
        let message = unsafe { ref_from(message)? };
        unsafe { write_string_array(message.inner.properties().names(), out, out_count) }
    })
}

/// Write 1 into `out` when a property named `key` exists.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_message_property_exists(
    message: *const MqcMessage,
    key: *const c_char,
    out: *mut i32,
) -> MqcStatus {
    catch(|| {
        let message = unsafe { ref_from(message)? };
        let key = unsafe { c_key(key)? };
        unsafe { write_value(out, to_c_bool(message.inner.properties().contains(&key))) }
    })
}

/// Read a boolean property. A missing property reads as 0.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_get_message_boolean_property(
    message: *const MqcMessage,
    key: *const c_char,
    out: *mut i32,
) -> MqcStatus {
    catch(|| {
        let message = unsafe { ref_from(message)? };
        let key = unsafe { c_key(key)? };
        let value = message.inner.properties().get_bool(&key)?;
        unsafe { write_value(out, to_c_bool(value)) }
    })
}

/// Read a byte property.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_get_message_byte_property(
    message: *const MqcMessage,
    key: *const c_char,
    out: *mut i8,
) -> MqcStatus {
    catch(|| {
        let message = unsafe { ref_from(message)? };
        let key = unsafe { c_key(key)? };
        let value = message.inner.properties().get_byte(&key)?;
        unsafe { write_value(out, value) }
    })
}

/// Read a double property.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_get_message_double_property(
    message: *const MqcMessage,
    key: *const c_char,
    out: *mut f64,
) -> MqcStatus {
    catch(|| {
        let message = unsafe { ref_from(message)? };
        let key = unsafe { c_key(key)? };
        let value = message.inner.properties().get_double(&key)?;
        unsafe { write_value(out, value) }
    })
}

/// Read a float property.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_get_message_float_property(
    message: *const MqcMessage,
    key: *const c_char,
    out: *mut f32,
) -> MqcStatus {
    catch(|| {
        let message = unsafe { ref_from(message)? };
        let key = unsafe { c_key(key)? };
        let value = message.inner.properties().get_float(&key)?;
        unsafe { write_value(out, value) }
    })
}

/// Read an int property.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_get_message_int_property(
    message: *const MqcMessage,
    key: *const c_char,
    out: *mut i32,
) -> MqcStatus {
    catch(|| {
        let message = unsafe { ref_from(message)? };
        let key = unsafe { c_key(key)? };
        let value = message.inner.properties().get_int(&key)?;
        unsafe { write_value(out, value) }
    })
}

/// Read a long property.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_get_message_long_property(
    message: *const MqcMessage,
    key: *const c_char,
    out: *mut i64,
) -> MqcStatus {
    catch(|| {
        let message = unsafe { ref_from(message)? };
        let key = unsafe { c_key(key)? };
        let value = message.inner.properties().get_long(&key)?;
        unsafe { write_value(out, value) }
    })
}

/// Read a short property.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_get_message_short_property(
    message: *const MqcMessage,
    key: *const c_char,
    out: *mut i16,
) -> MqcStatus {
    catch(|| {
        let message = unsafe { ref_from(message)? };
        let key = unsafe { c_key(key)? };
        let value = message.inner.properties().get_short(&key)?;
        unsafe { write_value(out, value) }
    })
}

/// Copy a string property into `buffer`, truncated to fit. A missing
/// property reads as the empty string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_get_message_string_property(
    message: *const MqcMessage,
    key: *const c_char,
    buffer: *mut c_char,
    size: usize,
) -> MqcStatus {
    catch(|| {
        let message = unsafe { ref_from(message)? };
        let key = unsafe { c_key(key)? };
        unsafe { copy_decoded(message.inner.properties().get_string(&key), buffer, size) }
    })
}

/// Set a boolean property.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_set_message_boolean_property(
    message: *mut MqcMessage,
    key: *const c_char,
    value: i32,
) -> MqcStatus {
    catch(|| {
        let message = unsafe { mut_from(message)? };
        let key = unsafe { c_key(key)? };
        Ok(message.inner.set_property(&key, from_c_bool(value))?)
    })
}

/// Set a byte property.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_set_message_byte_property(
    message: *mut MqcMessage,
    key: *const c_char,
    value: i8,
) -> MqcStatus {
    catch(|| {
        let message = unsafe { mut_from(message)? };
        let key = unsafe { c_key(key)? };
        Ok(message.inner.set_property(&key, value)?)
    })
}

/// Set a double property.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_set_message_double_property(
    message: *mut MqcMessage,
    key: *const c_char,
    value: f64,
) -> MqcStatus {
    catch(|| {
        let message = unsafe { mut_from(message)? };
        let key = unsafe { c_key(key)? };
        Ok(message.inner.set_property(&key, value)?)
    })
}

/// Set a float property.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_set_message_float_property(
    message: *mut MqcMessage,
    key: *const c_char,
    value: f32,
) -> MqcStatus {
    catch(|| {
        let message = unsafe { mut_from(message)? };
        let key = unsafe { c_key(key)? };
        Ok(message.inner.set_property(&key, value)?)
    })
}

/// Set an int property.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_set_message_int_property(
    message: *mut MqcMessage,
    key: *const c_char,
    value: i32,
) -> MqcStatus {
    catch(|| {
        let message = unsafe { mut_from(message)? };
        let key = unsafe { c_key(key)? };
        Ok(message.inner.set_property(&key, value)?)
    })
}

/// Set a long property.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_set_message_long_property(
    message: *mut MqcMessage,
    key: *const c_char,
    value: i64,
) -> MqcStatus {
    catch(|| {
        let message = unsafe { mut_from(message)? };
        let key = unsafe { c_key(key)? };
        Ok(message.inner.set_property(&key, value)?)
    })
}

/// Set a short property.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_set_message_short_property(
    message: *mut MqcMessage,
    key: *const c_char,
    value: i16,
) -> MqcStatus {
    catch(|| {
        let message = unsafe { mut_from(message)? };
        let key = unsafe { c_key(key)? };
        Ok(message.inner.set_property(&key, value)?)
    })
}

/// Set a string property.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_set_message_string_property(
    message: *mut MqcMessage,
    key: *const c_char,
    value: *const c_char,
) -> MqcStatus {
    catch(|| {
        let message = unsafe { mut_from(message)? };
        let key = unsafe { c_key(key)? };
        let value = unsafe { c_str_to_string(value)? };
        Ok(message.inner.set_property(&key, value)?)
    })
}

// ---------------------------------------------------------------------------
// Headers
// ---------------------------------------------------------------------------

/// Copy the correlation id into `buffer`, truncated to fit.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_get_message_correlation_id(
    message: *const MqcMessage,
    buffer: *mut c_char,
    size: usize,
) -> MqcStatus {
    catch(|| {
        let message = unsafe { ref_from(message)? };
        unsafe { copy_to_buffer(message.inner.correlation_id(), buffer, size) }
    })
}

/// Set the correlation id. Null clears it.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_set_message_correlation_id(
    message: *mut MqcMessage,
    correlation_id: *const c_char,
) -> MqcStatus {
    catch(|| {
        let message = unsafe { mut_from(message)? };
        let correlation_id = unsafe { c_str_or_empty(correlation_id)? };
        message.inner.set_correlation_id(correlation_id);
        Ok(())
    })
}

/// Write the `MQC_DELIVERY_*` mode into `out`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_get_message_delivery_mode(
    message: *const MqcMessage,
    out: *mut i32,
) -> MqcStatus {
    catch(|| {
        let message = unsafe { ref_from(message)? };
        unsafe { write_value(out, message.inner.delivery_mode().to_ffi()) }
    })
}

/// Set the delivery mode to one of the `MQC_DELIVERY_*` values.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_set_message_delivery_mode(
    message: *mut MqcMessage,
    mode: i32,
) -> MqcStatus {
    catch(|| {
        let message = unsafe { mut_from(message)? };
        message.inner.set_delivery_mode(delivery_mode(mode)?);
        Ok(())
    })
}

/// Write a new handle for the destination into `out`, or null when unset.
/// Caller must free a non-null handle with
/// [`mqc_destroy_destination`](crate::destination::mqc_destroy_destination).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_get_message_destination(
    message: *const MqcMessage,
    out: *mut *mut MqcDestination,
) -> MqcStatus {
    catch(|| {
        let message = unsafe { ref_from(message)? };
        unsafe { write_destination(out, message.inner.destination()) }
    })
}

/// Set the destination header. Null clears it.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_set_message_destination(
    message: *mut MqcMessage,
    destination: *const MqcDestination,
) -> MqcStatus {
    catch(|| {
        let message = unsafe { mut_from(message)? };
        let destination = unsafe { destination_or_none(destination) };
        message.inner.set_destination(destination);
        Ok(())
    })
}

/// Write the expiration time in epoch milliseconds into `out`. 0 means never.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_get_message_expiration(
    message: *const MqcMessage,
    out: *mut i64,
) -> MqcStatus {
    catch(|| {
        let message = unsafe { ref_from(message)? };
        unsafe { write_value(out, message.inner.expiration()) }
    })
}

/// Set the expiration time in epoch milliseconds.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_set_message_expiration(
    message: *mut MqcMessage,
    expiration: i64,
) -> MqcStatus {
    catch(|| {
        unsafe { mut_from(message)? }.inner.set_expiration(expiration);
        Ok(())
    })
}

/// Copy the message id into `buffer`, truncated to fit.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_get_message_message_id(
    message: *const MqcMessage,
    buffer: *mut c_char,
    size: usize,
) -> MqcStatus {
    catch(|| {
        let message = unsafe { ref_from(message)? };
        unsafe { copy_to_buffer(message.inner.message_id(), buffer, size) }
    })
}

/// Set the message id. Null clears it.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_set_message_message_id(
    message: *mut MqcMessage,
    message_id: *const c_char,
) -> MqcStatus {
    catch(|| {
        let message = unsafe { mut_from(message)? };
        let message_id = unsafe { c_str_or_empty(message_id)? };
        message.inner.set_message_id(message_id);
        Ok(())
    })
}

/// Write the priority into `out`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_get_message_priority(
    message: *const MqcMessage,
    out: *mut i32,
) -> MqcStatus {
    catch(|| {
        let message = unsafe { ref_from(message)? };
        unsafe { write_value(out, message.inner.priority()) }
    })
}

/// Set the priority header.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_set_message_priority(
    message: *mut MqcMessage,
    priority: i32,
) -> MqcStatus {
    catch(|| {
        unsafe { mut_from(message)? }.inner.set_priority(priority);
        Ok(())
    })
}

/// Write 1 into `out` when the message is a redelivery.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_get_message_redelivered(
    message: *const MqcMessage,
    out: *mut i32,
) -> MqcStatus {
    catch(|| {
        let message = unsafe { ref_from(message)? };
        unsafe { write_value(out, to_c_bool(message.inner.redelivered())) }
    })
}

/// Set the redelivered flag.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_set_message_redelivered(
    message: *mut MqcMessage,
    redelivered: i32,
) -> MqcStatus {
    catch(|| {
        unsafe { mut_from(message)? }
            .inner
            .set_redelivered(from_c_bool(redelivered));
        Ok(())
    })
}

/// Write a new handle for the reply-to destination into `out`, or null when
/// unset. Caller must free a non-null handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_get_message_reply_to(
    message: *const MqcMessage,
    out: *mut *mut MqcDestination,
) -> MqcStatus {
    catch(|| {
        let message = unsafe { ref_from(message)? };
        unsafe { write_destination(out, message.inner.reply_to()) }
    })
}

/// Set the reply-to destination. Null clears it.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_set_message_reply_to(
    message: *mut MqcMessage,
    destination: *const MqcDestination,
) -> MqcStatus {
    catch(|| {
        let message = unsafe { mut_from(message)? };
        let destination = unsafe { destination_or_none(destination) };
        message.inner.set_reply_to(destination);
        Ok(())
    })
}

/// Write the send time in epoch milliseconds into `out`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_get_message_timestamp(
    message: *const MqcMessage,
    out: *mut i64,
) -> MqcStatus {
    catch(|| {
        let message = unsafe { ref_from(message)? };
        unsafe { write_value(out, message.inner.timestamp()) }
    })
}

/// Set the timestamp header.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_set_message_timestamp(
    message: *mut MqcMessage,
    timestamp: i64,
) -> MqcStatus {
    catch(|| {
        unsafe { mut_from(message)? }.inner.set_timestamp(timestamp);
        Ok(())
    })
}

/// Copy the application-defined type header into `buffer`, truncated to fit.
/// Not to be confused with [`mqc_get_message_type`], which reports the body kind.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_get_message_header_type(
    message: *const MqcMessage,
    buffer: *mut c_char,
    size: usize,
) -> MqcStatus {
    catch(|| {
        let message = unsafe { ref_from(message)? };
        unsafe { copy_to_buffer(message.inner.message_type(), buffer, size) }
    })
}

/// Set the application-defined type header. Null clears it.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_set_message_header_type(
    message: *mut MqcMessage,
    message_type: *const c_char,
) -> MqcStatus {
    catch(|| {
        let message = unsafe { mut_from(message)? };
        let message_type = unsafe { c_str_or_empty(message_type)? };
        message.inner.set_message_type(message_type);
        Ok(())
    })
}

pub(crate) fn delivery_mode(mode: i32) -> Result<DeliveryMode, Error> {
    DeliveryMode::from_ffi(mode)
        .ok_or_else(|| Error::InvalidArgument(format!("unknown delivery mode {mode}")))
}

unsafe fn destination_or_none(destination: *const MqcDestination) -> Option<mqc::Destination> {
    unsafe { destination.as_ref() }.map(|d| d.inner.clone())
}

unsafe fn write_destination(
    out: *mut *mut MqcDestination,
    destination: Option<&mqc::Destination>,
) -> Result<(), Error> {
    match destination {
        Some(destination) => unsafe {
            write_out(
                out,
                MqcDestination {
                    inner: destination.clone(),
                },
            )
        },
        None => unsafe { write_value(out, std::ptr::null_mut()) },
    }
}
