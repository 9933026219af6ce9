//! Map messages: typed values stored under names.

use std::ffi::c_char;

use mqc::{MessageKind, Value, ValueMap};

use crate::error::{Error, MqcStatus, catch};
use crate::ffi::*;

unsafe fn entries<'a>(message: *mut MqcMessage) -> Result<&'a ValueMap, Error> {
    Ok(unsafe { typed(message, MessageKind::Map)? }.map_body()?)
}

unsafe fn set(message: *mut MqcMessage, key: *const c_char, value: Value) -> Result<(), Error> {
    let message = unsafe { typed(message, MessageKind::Map)? };
    let key = unsafe { c_key(key)? };
    message.map_body_mut()?.set(key, value);
    Ok(())
}

/// Create an empty map message.
/// Caller must free with [`mqc_destroy_message`](crate::message::mqc_destroy_message).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_create_map_message(
    session: *const MqcSession,
    out: *mut *mut MqcMessage,
) -> MqcStatus {
    catch(|| {
        let session = unsafe { ref_from(session)? };
        let inner = session.inner.create_map_message()?;
        unsafe { write_out(out, MqcMessage::new(inner)) }
    })
}

/// Write 1 into `out` when an entry named `key` exists.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_map_message_item_exists(
    message: *mut MqcMessage,
    key: *const c_char,
    out: *mut i32,
) -> MqcStatus {
    catch(|| {
        let entries = unsafe { entries(message)? };
        let key = unsafe { c_key(key)? };
        unsafe { write_value(out, to_c_bool(entries.contains(&key))) }
    })
}

/// Write the entry names into `out` and their number into `out_count`.
/// Caller must free a non-null array with
/// [`mqc_free_string_array`](crate::mqc_free_string_array).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_get_map_message_names(
    message: *mut MqcMessage,
    out: *mut *mut *mut c_char,
    out_count: *mut usize,
) -> MqcStatus {
    catch(|| {
        let entries = unsafe { entries(message)? };
        unsafe { write_string_array(entries.names(), out, out_count) }
    })
}

// ---------------------------------------------------------------------------
// Getters
// ---------------------------------------------------------------------------

/// Read a boolean entry. A missing entry reads as 0.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_get_map_message_boolean(
    message: *mut MqcMessage,
    key: *const c_char,
    out: *mut i32,
) -> MqcStatus {
    catch(|| {
        let entries = unsafe { entries(message)? };
        let key = unsafe { c_key(key)? };
        let value = entries.get_bool(&key)?;
        unsafe { write_value(out, to_c_bool(value)) }
    })
}

/// Read a byte entry.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_get_map_message_byte(
    message: *mut MqcMessage,
    key: *const c_char,
    out: *mut i8,
) -> MqcStatus {
    catch(|| {
        let entries = unsafe { entries(message)? };
        let key = unsafe { c_key(key)? };
        let value = entries.get_byte(&key)?;
        unsafe { write_value(out, value) }
    })
}

/// Read a char entry.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_get_map_message_char(
    message: *mut MqcMessage,
    key: *const c_char,
    out: *mut u16,
) -> MqcStatus {
    catch(|| {
        let entries = unsafe { entries(message)? };
        let key = unsafe { c_key(key)? };
        let value = entries.get_char(&key)?;
        unsafe { write_value(out, value) }
    })
}

/// Read a short entry.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_get_map_message_short(
    message: *mut MqcMessage,
    key: *const c_char,
    out: *mut i16,
) -> MqcStatus {
    catch(|| {
        let entries = unsafe { entries(message)? };
        let key = unsafe { c_key(key)? };
        let value = entries.get_short(&key)?;
        unsafe { write_value(out, value) }
    })
}

/// Read an int entry.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_get_map_message_int(
    message: *mut MqcMessage,
    key: *const c_char,
    out: *mut i32,
) -> MqcStatus {
    catch(|| {
        let entries = unsafe { entries(message)? };
        let key = unsafe { c_key(key)? };
        let value = entries.get_int(&key)?;
        unsafe { write_value(out, value) }
    })
}

/// Read a long entry.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_get_map_message_long(
    message: *mut MqcMessage,
    key: *const c_char,
    out: *mut i64,
) -> MqcStatus {
    catch(|| {
        let entries = unsafe { entries(message)? };
        let key = unsafe { c_key(key)? };
        let value = entries.get_long(&key)?;
        unsafe { write_value(out, value) }
    })
}

/// Read a float entry.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_get_map_message_float(
    message: *mut MqcMessage,
    key: *const c_char,
    out: *mut f32,
) -> MqcStatus {
    catch(|| {
        let entries = unsafe { entries(message)? };
        let key = unsafe { c_key(key)? };
        let value = entries.get_float(&key)?;
        unsafe { write_value(out, value) }
    })
}

/// Read a double entry.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_get_map_message_double(
    message: *mut MqcMessage,
    key: *const c_char,
    out: *mut f64,
) -> MqcStatus {
    catch(|| {
        let entries = unsafe { entries(message)? };
        let key = unsafe { c_key(key)? };
        let value = entries.get_double(&key)?;
        unsafe { write_value(out, value) }
    })
}

/// Copy a string entry into `buffer`, truncated to fit. A missing entry
/// reads as the empty string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_get_map_message_string(
    message: *mut MqcMessage,
    key: *const c_char,
    buffer: *mut c_char,
    size: usize,
) -> MqcStatus {
    catch(|| {
        let entries = unsafe { entries(message)? };
        let key = unsafe { c_key(key)? };
        unsafe { copy_decoded(entries.get_string(&key), buffer, size) }
    })
}

// ---------------------------------------------------------------------------
// Setters
// ---------------------------------------------------------------------------

/// Store a boolean entry.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_set_map_message_boolean(
    message: *mut MqcMessage,
    key: *const c_char,
    value: i32,
) -> MqcStatus {
    catch(|| unsafe { set(message, key, Value::Bool(from_c_bool(value))) })
}

/// Store a byte entry.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_set_map_message_byte(
    message: *mut MqcMessage,
    key: *const c_char,
    value: i8,
) -> MqcStatus {
    catch(|| unsafe { set(message, key, Value::Byte(value)) })
}

/// Store a char entry.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_set_map_message_char(
    message: *mut MqcMessage,
    key: *const c_char,
    value: u16,
) -> MqcStatus {
    catch(|| unsafe { set(message, key, Value::Char(value)) })
}

/// Store a short entry.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_set_map_message_short(
    message: *mut MqcMessage,
    key: *const c_char,
    value: i16,
) -> MqcStatus {
    catch(|| unsafe { set(message, key, Value::Short(value)) })
}

/// Store an int entry.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_set_map_message_int(
    message: *mut MqcMessage,
    key: *const c_char,
    value: i32,
) -> MqcStatus {
    catch(|| unsafe { set(message, key, Value::Int(value)) })
}

/// Store a long entry.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_set_map_message_long(
    message: *mut MqcMessage,
    key: *const c_char,
    value: i64,
) -> MqcStatus {
    catch(|| unsafe { set(message, key, Value::Long(value)) })
}

/// Store a float entry.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_set_map_message_float(
    message: *mut MqcMessage,
    key: *const c_char,
    value: f32,
) -> MqcStatus {
    catch(|| unsafe { set(message, key, Value::Float(value)) })
}

/// Store a double entry.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_set_map_message_double(
    message: *mut MqcMessage,
    key: *const c_char,
    value: f64,
) -> MqcStatus {
    catch(|| unsafe { set(message, key, Value::Double(value)) })
}

/// Store a string entry.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_set_map_message_string(
    message: *mut MqcMessage,
    key: *const c_char,
    value: *const c_char,
) -> MqcStatus {
    catch(|| {
        let value = unsafe { c_str_to_string(value)? };
        unsafe { set(message, key, Value::String(value)) }
    })
}
