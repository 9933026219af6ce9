//! Connection factories and connection creation.

use std::ffi::c_char;
use std::sync::Mutex;

use crate::error::{MqcStatus, catch};
use crate::ffi::*;

/// Create a factory for `uri` (`vm://<broker>[?options]`). `username` and
/// `password` may be null. Caller must free with
/// [`mqc_destroy_connection_factory`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_create_connection_factory(
    uri: *const c_char,
    username: *const c_char,
    password: *const c_char,
    out: *mut *mut MqcConnectionFactory,
) -> MqcStatus {
    catch(|| {
        let uri = unsafe { c_str_to_string(uri)? };
        let username = unsafe { c_str_or_empty(username)? };
        let password = unsafe { c_str_or_empty(password)? };
        let inner = mqc::ConnectionFactory::with_credentials(&uri, &username, &password)?;
        unsafe { write_out(out, MqcConnectionFactory { inner }) }
    })
}

/// Free a factory. Connections made from it stay usable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_destroy_connection_factory(
    factory: *mut MqcConnectionFactory,
) -> MqcStatus {
    unsafe { destroy(factory) }
}

/// Create a connection with the factory's credentials.
/// Caller must free with [`mqc_destroy_connection`](crate::connection::mqc_destroy_connection).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_create_default_connection(
    factory: *const MqcConnectionFactory,
    out: *mut *mut MqcConnection,
) -> MqcStatus {
    catch(|| {
        let factory = unsafe { ref_from(factory)? };
        if out.is_null() {
            return Err(crate::Error::NullPointer);
        }
        let inner = factory.inner.create_connection()?;
        unsafe { write_out(out, connection_handle(inner)) }
    })
}

/// Create a connection with explicit credentials and client id. Every string
/// may be null: null credentials are empty, a null client id keeps the
/// factory's default.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_create_connection(
    factory: *const MqcConnectionFactory,
    username: *const c_char,
    password: *const c_char,
    client_id: *const c_char,
    out: *mut *mut MqcConnection,
) -> MqcStatus {
    catch(|| {
        let factory = unsafe { ref_from(factory)? };
        let username = unsafe { c_str_or_empty(username)? };
        let password = unsafe { c_str_or_empty(password)? };
        let client_id = unsafe { c_str_to_option(client_id)? };
        if out.is_null() {
            return Err(crate::Error::NullPointer);
        }
        let inner =
            factory
                .inner
                .create_connection_with(&username, &password, client_id.as_deref())?;
        unsafe { write_out(out, connection_handle(inner)) }
    })
}

fn connection_handle(inner: mqc::Connection) -> MqcConnection {
    MqcConnection {
        inner,
        last_error: Mutex::new(None),
    }
}
