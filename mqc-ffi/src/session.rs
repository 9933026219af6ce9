//! Sessions: creation, transactions and durable subscriptions.

use std::ffi::c_char;

use mqc::AckMode;

use crate::error::{Error, MqcStatus, catch};
use crate::ffi::*;

/// Create an auto-acknowledge session.
/// Caller must free with [`mqc_destroy_session`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_create_default_session(
    connection: *const MqcConnection,
    out: *mut *mut MqcSession,
) -> MqcStatus {
    unsafe { mqc_create_session(connection, MQC_ACK_AUTO, out) }
}

/// Create a session with one of the `MQC_ACK_*` modes. Unknown modes fail
/// with `UNKNOWN_ACKTYPE`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_create_session(
    connection: *const MqcConnection,
    ack_mode: i32,
    out: *mut *mut MqcSession,
) -> MqcStatus {
    catch(|| {
        let connection = unsafe { ref_from(connection)? };
        let ack_mode = AckMode::from_ffi(ack_mode).ok_or(Error::UnknownAckMode(ack_mode))?;
        if out.is_null() {
            return Err(Error::NullPointer);
        }
        let inner = connection.inner.create_session(ack_mode)?;
        unsafe { write_out(out, MqcSession { inner }) }
    })
}

/// Close and free a session.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_destroy_session(session: *mut MqcSession) -> MqcStatus {
    unsafe { destroy(session) }
}

/// Close a session. Unacknowledged messages are redelivered and buffered
/// transactional sends are dropped.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_close_session(session: *mut MqcSession) -> MqcStatus {
    catch(|| {
        unsafe { ref_from(session)? }.inner.close();
        Ok(())
    })
}

/// Commit a transacted session.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_commit_session(session: *mut MqcSession) -> MqcStatus {
    catch(|| Ok(unsafe { ref_from(session)? }.inner.commit()?))
}

/// Roll back a transacted session.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_rollback_session(session: *mut MqcSession) -> MqcStatus {
    catch(|| Ok(unsafe { ref_from(session)? }.inner.rollback()?))
}

/// Redeliver every unacknowledged message of a non-transacted session.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_recover_session(session: *mut MqcSession) -> MqcStatus {
    catch(|| Ok(unsafe { ref_from(session)? }.inner.recover()?))
}

/// Remove the durable subscription `name` of the connection's client id.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_unsubscribe_durable_consumer(
    session: *mut MqcSession,
    name: *const c_char,
) -> MqcStatus {
    catch(|| {
        let session = unsafe { ref_from(session)? };
        let name = unsafe { c_str_to_string(name)? };
        Ok(session.inner.unsubscribe(&name)?)
    })
}

/// Write the session's `MQC_ACK_*` mode into `out`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_get_session_acknowledge_mode(
    session: *const MqcSession,
    out: *mut i32,
) -> MqcStatus {
    catch(|| {
        let session = unsafe { ref_from(session)? };
        unsafe { write_value(out, session.inner.ack_mode().to_ffi()) }
    })
}

/// Write 1 into `out` if the session is transacted, else 0.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_is_session_transacted(
    session: *const MqcSession,
    out: *mut i32,
) -> MqcStatus {
    catch(|| {
        let session = unsafe { ref_from(session)? };
        unsafe { write_value(out, to_c_bool(session.inner.is_transacted())) }
    })
}
