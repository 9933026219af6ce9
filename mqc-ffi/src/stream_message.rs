//! Stream messages: an ordered sequence of typed values.

use std::ffi::c_char;

use mqc::{MessageKind, StreamBody};

use crate::error::{Error, MqcStatus, catch};
use crate::ffi::*;

unsafe fn body<'a>(message: *mut MqcMessage) -> Result<&'a mut StreamBody, Error> {
    Ok(unsafe { typed(message, MessageKind::Stream)? }.stream_body_mut()?)
}

/// Create an empty stream message in write mode.
/// Caller must free with [`mqc_destroy_message`](crate::message::mqc_destroy_message).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_create_stream_message(
    session: *const MqcSession,
    out: *mut *mut MqcMessage,
) -> MqcStatus {
    catch(|| {
        let session = unsafe { ref_from(session)? };
        let inner = session.inner.create_stream_message()?;
        unsafe { write_out(out, MqcMessage::new(inner)) }
    })
}

/// Switch to read mode and rewind to the first value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_reset_stream_message(message: *mut MqcMessage) -> MqcStatus {
    catch(|| {
        unsafe { body(message)? }.reset();
        Ok(())
    })
}

/// Read the next value as a boolean.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_read_boolean_from_stream_message(
    message: *mut MqcMessage,
    out: *mut i32,
) -> MqcStatus {
    catch(|| {
        let value = unsafe { body(message)? }.read_bool()?;
        unsafe { write_value(out, to_c_bool(value)) }
    })
}

/// Append a boolean.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_write_boolean_to_stream_message(
    message: *mut MqcMessage,
    value: i32,
) -> MqcStatus {
    catch(|| Ok(unsafe { body(message)? }.write(from_c_bool(value))?))
}

/// Read the next value as a byte.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_read_byte_from_stream_message(
    message: *mut MqcMessage,
    out: *mut i8,
) -> MqcStatus {
    catch(|| {
        let value = unsafe { body(message)? }.read_byte()?;
        unsafe { write_value(out, value) }
    })
}

/// Append a byte.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_write_byte_to_stream_message(
    message: *mut MqcMessage,
    value: i8,
) -> MqcStatus {
    catch(|| Ok(unsafe { body(message)? }.write(value)?))
}

/// Read the next value as a char.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_read_char_from_stream_message(
    message: *mut MqcMessage,
    out: *mut u16,
) -> MqcStatus {
    catch(|| {
        let value = unsafe { body(message)? }.read_char()?;
        unsafe { write_value(out, value) }
    })
}

/// Append a char.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_write_char_to_stream_message(
    message: *mut MqcMessage,
    value: u16,
) -> MqcStatus {
    catch(|| Ok(unsafe { body(message)? }.write_char(value)?))
}

/// Read the next value as a short.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_read_short_from_stream_message(
    message: *mut MqcMessage,
    out: *mut i16,
) -> MqcStatus {
    catch(|| {
        let value = unsafe { body(message)? }.read_short()?;
        unsafe { write_value(out, value) }
    })
}

/// Append a short.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_write_short_to_stream_message(
    message: *mut MqcMessage,
    value: i16,
) -> MqcStatus {
    catch(|| Ok(unsafe { body(message)? }.write(value)?))
}

/// Read the next value as an int.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_read_int_from_stream_message(
    message: *mut MqcMessage,
    out: *mut i32,
) -> MqcStatus {
    catch(|| {
        let value = unsafe { body(message)? }.read_int()?;
        unsafe { write_value(out, value) }
    })
}

/// Append an int.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_write_int_to_stream_message(
    message: *mut MqcMessage,
    value: i32,
) -> MqcStatus {
    catch(|| Ok(unsafe { body(message)? }.write(value)?))
}

/// Read the next value as a long.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_read_long_from_stream_message(
    message: *mut MqcMessage,
    out: *mut i64,
) -> MqcStatus {
    catch(|| {
        let value = unsafe { body(message)? }.read_long()?;
        unsafe { write_value(out, value) }
    })
}

/// Append a long.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_write_long_to_stream_message(
    message: *mut MqcMessage,
    value: i64,
) -> MqcStatus {
    catch(|| Ok(unsafe { body(message)? }.write(value)?))
}

/// Read the next value as a float.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_read_float_from_stream_message(
    message: *mut MqcMessage,
    out: *mut f32,
) -> MqcStatus {
    catch(|| {
        let value = unsafe { body(message)? }.read_float()?;
        unsafe { write_value(out, value) }
    })
}

/// Append a float.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_write_float_to_stream_message(
    message: *mut MqcMessage,
    value: f32,
) -> MqcStatus {
    catch(|| Ok(unsafe { body(message)? }.write(value)?))
}

/// Read the next value as a double.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_read_double_from_stream_message(
    message: *mut MqcMessage,
    out: *mut f64,
) -> MqcStatus {
    catch(|| {
        let value = unsafe { body(message)? }.read_double()?;
        unsafe { write_value(out, value) }
    })
}

/// Append a double.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_write_double_to_stream_message(
    message: *mut MqcMessage,
    value: f64,
) -> MqcStatus {
    catch(|| Ok(unsafe { body(message)? }.write(value)?))
}

/// Read the next value as a string into `buffer`, truncated to fit.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_read_string_from_stream_message(
    message: *mut MqcMessage,
    buffer: *mut c_char,
    size: usize,
) -> MqcStatus {
    catch(|| {
        let decoded = unsafe { body(message)? }.read_string();
        unsafe { copy_decoded(decoded, buffer, size) }
    })
}

/// Append a string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_write_string_to_stream_message(
    message: *mut MqcMessage,
    value: *const c_char,
) -> MqcStatus {
    catch(|| {
        let body = unsafe { body(message)? };
        let value = unsafe { c_str_to_string(value)? };
        Ok(body.write(value)?)
    })
}

/// Copy up to `size` bytes of the byte array under the cursor. Large arrays
/// are read over several calls; the call after the last piece fails with
/// `INCOMPLETE_READ` and moves on to the next value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_read_bytes_from_stream_message(
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

/// Append `length` bytes of `buffer` starting at `offset` as one byte array.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_write_bytes_to_stream_message(
    message: *mut MqcMessage,
    buffer: *const u8,
    offset: usize,
    length: usize,
) -> MqcStatus {
    catch(|| {
        let body = unsafe { body(message)? };
        if buffer.is_null() && length > 0 {
            return Err(Error::NullPointer);
        }
        let bytes = if length == 0 {
            &[][..]
        } else {
            unsafe { std::slice::from_raw_parts(buffer.add(offset), length) }
        };
        Ok(body.write(bytes)?)
    })
}
