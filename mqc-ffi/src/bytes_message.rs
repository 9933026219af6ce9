//! Bytes messages: a big-endian primitive codec over a cursor.
//!
//! New messages are in write mode. [`mqc_reset_bytes_message`] switches to
//! read mode and rewinds; reads before that fail with `MESSAGE_NOT_READABLE`
//! and writes after it with `MESSAGE_NOT_WRITABLE`.

use std::ffi::c_char;

use mqc::{BytesBody, MessageKind};

use crate::error::{Error, MqcStatus, catch};
use crate::ffi::*;

unsafe fn body<'a>(message: *mut MqcMessage) -> Result<&'a mut BytesBody, Error> {
    Ok(unsafe { typed(message, MessageKind::Bytes)? }.bytes_body_mut()?)
}

/// Create a bytes message holding a copy of the first `length` bytes of
/// `bytes`, which may be null when `length` is 0.
/// Caller must free with [`mqc_destroy_message`](crate::message::mqc_destroy_message).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_create_bytes_message(
    session: *const MqcSession,
    bytes: *const u8,
    length: usize,
    out: *mut *mut MqcMessage,
) -> MqcStatus {
    catch(|| {
        let session = unsafe { ref_from(session)? };
        let bytes = unsafe { byte_slice(bytes, length)? };
        let inner = session.inner.create_bytes_message(bytes)?;
        unsafe { write_out(out, MqcMessage::new(inner)) }
    })
}

/// Write the body length in bytes into `out`. Read mode only.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_get_bytes_message_body_length(
    message: *mut MqcMessage,
    out: *mut usize,
) -> MqcStatus {
    catch(|| {
        let length = unsafe { body(message)? }.body_length()?;
        unsafe { write_value(out, length) }
    })
}

/// Switch to read mode and rewind the cursor.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_reset_bytes_message(message: *mut MqcMessage) -> MqcStatus {
    catch(|| {
        unsafe { body(message)? }.reset();
        Ok(())
    })
}

// ---------------------------------------------------------------------------
// Primitives
// ---------------------------------------------------------------------------

/// Read a boolean (one byte) as 1 or 0.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_read_boolean_from_bytes_message(
    message: *mut MqcMessage,
    out: *mut i32,
) -> MqcStatus {
    catch(|| {
        let value = unsafe { body(message)? }.read_bool()?;
        unsafe { write_value(out, to_c_bool(value)) }
    })
}

/// Write a boolean as one byte.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_write_boolean_to_bytes_message(
    message: *mut MqcMessage,
    value: i32,
) -> MqcStatus {
    catch(|| Ok(unsafe { body(message)? }.write_bool(from_c_bool(value))?))
}

/// Read a signed byte.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_read_byte_from_bytes_message(
    message: *mut MqcMessage,
    out: *mut i8,
) -> MqcStatus {
    catch(|| {
        let value = unsafe { body(message)? }.read_byte()?;
        unsafe { write_value(out, value) }
    })
}

/// Write a signed byte.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_write_byte_to_bytes_message(
    message: *mut MqcMessage,
    value: i8,
) -> MqcStatus {
    catch(|| Ok(unsafe { body(message)? }.write_byte(value)?))
}

/// Read a two-byte UTF-16 code unit.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_read_char_from_bytes_message(
    message: *mut MqcMessage,
    out: *mut u16,
) -> MqcStatus {
    catch(|| {
        let value = unsafe { body(message)? }.read_char()?;
        unsafe { write_value(out, value) }
    })
}

/// Write a two-byte UTF-16 code unit.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_write_char_to_bytes_message(
    message: *mut MqcMessage,
    value: u16,
) -> MqcStatus {
    catch(|| Ok(unsafe { body(message)? }.write_char(value)?))
}

/// Read a short.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_read_short_from_bytes_message(
    message: *mut MqcMessage,
    out: *mut i16,
) -> MqcStatus {
    catch(|| {
        let value = unsafe { body(message)? }.read_short()?;
        unsafe { write_value(out, value) }
    })
}

/// Write a short.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_write_short_to_bytes_message(
    message: *mut MqcMessage,
    value: i16,
) -> MqcStatus {
    catch(|| Ok(unsafe { body(message)? }.write_short(value)?))
}

/// Read an int.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_read_int_from_bytes_message(
    message: *mut MqcMessage,
    out: *mut i32,
) -> MqcStatus {
    catch(|| {
        let value = unsafe { body(message)? }.read_int()?;
        unsafe { write_value(out, value) }
    })
}

/// Write an int.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_write_int_to_bytes_message(
    message: *mut MqcMessage,
    value: i32,
) -> MqcStatus {
    catch(|| Ok(unsafe { body(message)? }.write_int(value)?))
}

/// Read a long.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_read_long_from_bytes_message(
    message: *mut MqcMessage,
    out: *mut i64,
) -> MqcStatus {
    catch(|| {
        let value = unsafe { body(message)? }.read_long()?;
        unsafe { write_value(out, value) }
    })
}

/// Write a long.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_write_long_to_bytes_message(
    message: *mut MqcMessage,
    value: i64,
) -> MqcStatus {
    catch(|| Ok(unsafe { body(message)? }.write_long(value)?))
}

/// Read a float.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_read_float_from_bytes_message(
    message: *mut MqcMessage,
    out: *mut f32,
) -> MqcStatus {
    catch(|| {
        let value = unsafe { body(message)? }.read_float()?;
        unsafe { write_value(out, value) }
    })
}

/// Write a float.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_write_float_to_bytes_message(
    message: *mut MqcMessage,
    value: f32,
) -> MqcStatus {
    catch(|| Ok(unsafe { body(message)? }.write_float(value)?))
}

/// Read a double.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_read_double_from_bytes_message(
    message: *mut MqcMessage,
    out: *mut f64,
) -> MqcStatus {
    catch(|| {
        let value = unsafe { body(message)? }.read_double()?;
        unsafe { write_value(out, value) }
    })
}

/// Write a double.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_write_double_to_bytes_message(
    message: *mut MqcMessage,
    value: f64,
) -> MqcStatus {
    catch(|| Ok(unsafe { body(message)? }.write_double(value)?))
}

// ---------------------------------------------------------------------------
// Byte ranges and strings
// ---------------------------------------------------------------------------

/// Copy up to `size` bytes into `buffer`. The number copied goes into
/// `out_count` when it is not null. Fails with `INCOMPLETE_READ` when no
/// bytes remain.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_read_bytes_from_bytes_message(
    message: *mut MqcMessage,
    buffer: *mut u8,
    size: usize,
    out_count: *mut usize,
) -> MqcStatus {
    catch(|| {
        let body = unsafe { body(message)? };
        if buffer.is_null() && size > 0 {
            return Err(Error::NullPointer);
        }
        let buf: &mut [u8] = if size == 0 {
            &mut []
        } else {
            unsafe { std::slice::from_raw_parts_mut(buffer, size) }
        };
        let count = body.read_bytes(buf)?.ok_or(Error::IncompleteRead)?;
        if !out_count.is_null() {
            unsafe { out_count.write(count) };
        }
        Ok(())
    })
}

/// Append `length` bytes of `buffer` starting at `offset`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_write_bytes_to_bytes_message(
    message: *mut MqcMessage,
    buffer: *const u8,
    offset: usize,
    length: usize,
) -> MqcStatus {
    catch(|| {
        let body = unsafe { body(message)? };
        if length == 0 {
            return Ok(());
        }
        if buffer.is_null() {
            return Err(Error::NullPointer);
        }
        let bytes = unsafe { std::slice::from_raw_parts(buffer.add(offset), length) };
        Ok(body.write_bytes(bytes)?)
    })
}

/// Read a NUL-terminated string into `buffer`, truncated to fit.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_read_string_from_bytes_message(
    message: *mut MqcMessage,
    buffer: *mut c_char,
    size: usize,
) -> MqcStatus {
    catch(|| {
        let decoded = unsafe { body(message)? }.read_string();
        unsafe { copy_decoded(decoded, buffer, size) }
    })
}

/// Append `value` followed by a NUL byte.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_write_string_to_bytes_message(
    message: *mut MqcMessage,
    value: *const c_char,
) -> MqcStatus {
    catch(|| {
        let body = unsafe { body(message)? };
        let value = unsafe { c_str_to_string(value)? };
        Ok(body.write_string(&value)?)
    })
}

/// Read a length-prefixed modified UTF-8 string into `buffer`, truncated to fit.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_read_utf_from_bytes_message(
    message: *mut MqcMessage,
    buffer: *mut c_char,
    size: usize,
) -> MqcStatus {
    catch(|| {
        let decoded = unsafe { body(message)? }.read_utf();
        unsafe { copy_decoded(decoded, buffer, size) }
    })
}

/// Append `value` as a two-byte length and modified UTF-8.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_write_utf_to_bytes_message(
    message: *mut MqcMessage,
    value: *const c_char,
) -> MqcStatus {
    catch(|| {
        let body = unsafe { body(message)? };
        let value = unsafe { c_str_to_string(value)? };
        Ok(body.write_utf(&value)?)
    })
}
