//! Connection lifecycle, client ids and the last-error slot.
//!
//! Every call here goes through the connection-scoped translation, so a
//! failure can be read back as text with [`mqc_get_error_string`].

use std::ffi::c_char;

use crate::error::{MqcStatus, catch_connection};
use crate::ffi::*;

/// Close and free a connection.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_destroy_connection(connection: *mut MqcConnection) -> MqcStatus {
    unsafe { destroy(connection) }
}

/// Start delivery to the connection's consumers.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_start_connection(connection: *mut MqcConnection) -> MqcStatus {
    unsafe { catch_connection(connection, |c| Ok(c.inner.start()?)) }
}

/// Suspend delivery. Blocking receives keep waiting.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_stop_connection(connection: *mut MqcConnection) -> MqcStatus {
    unsafe { catch_connection(connection, |c| Ok(c.inner.stop()?)) }
}

/// Close the connection and everything made from it. Pending receives on
/// its consumers return. The handle must still be destroyed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_close_connection(connection: *mut MqcConnection) -> MqcStatus {
    unsafe {
        catch_connection(connection, |c| {
            c.inner.close();
            Ok(())
        })
    }
}

/// Set the client id. Only valid before the connection is started or a
/// session is created.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_set_connection_client_id(
    connection: *mut MqcConnection,
    client_id: *const c_char,
) -> MqcStatus {
    unsafe {
        catch_connection(connection, |c| {
            let client_id = c_str_to_string(client_id)?;
            Ok(c.inner.set_client_id(&client_id)?)
        })
    }
}

/// Copy the client id into `buffer`. Fails, writing nothing, when the id and
/// its terminator do not fit in `size` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_get_connection_client_id(
    connection: *mut MqcConnection,
    buffer: *mut c_char,
    size: usize,
) -> MqcStatus {
    unsafe {
        catch_connection(connection, |c| {
            let client_id = c.inner.client_id()?;
            copy_exact_to_buffer(&client_id, buffer, size)
        })
    }
}

/// Copy the message of the connection's last failure into `buffer`,
/// truncated to `length - 1` bytes and terminated.
///
/// Returns `buffer`, or null when nothing was recorded or the arguments are
/// unusable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_get_error_string(
    connection: *const MqcConnection,
    buffer: *mut c_char,
    length: usize,
) -> *const c_char {
    let Ok(connection) = (unsafe { ref_from(connection) }) else {
        return std::ptr::null();
    };
    let Some(message) = lock(&connection.last_error).as_ref().map(ToString::to_string) else {
        return std::ptr::null();
    };
    match unsafe { copy_to_buffer(&message, buffer, length) } {
        Ok(()) => buffer,
        Err(_) => std::ptr::null(),
    }
}
