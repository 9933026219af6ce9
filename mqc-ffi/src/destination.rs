//! Destinations: queues, topics and their temporary forms.

use std::ffi::c_char;

use mqc::DestinationKind;

use crate::error::{Error, MqcStatus, catch};
use crate::ffi::*;

fn kind_from(kind: i32) -> Result<DestinationKind, Error> {
    DestinationKind::from_ffi(kind)
        .ok_or_else(|| Error::InvalidArgument(format!("unknown destination type {kind}")))
}

fn create(
    session: &MqcSession,
    kind: DestinationKind,
    name: Option<&str>,
) -> Result<mqc::Destination, Error> {
    let session = &session.inner;
    let destination = match (kind, name) {
        (DestinationKind::TemporaryQueue, _) => session.create_temporary_queue()?,
        (DestinationKind::TemporaryTopic, _) => session.create_temporary_topic()?,
        (DestinationKind::Queue, Some(name)) => session.create_queue(name)?,
        (DestinationKind::Topic, Some(name)) => session.create_topic(name)?,
        (DestinationKind::Queue | DestinationKind::Topic, None) => return Err(Error::NullPointer),
    };
    Ok(destination)
}

/// Create a destination of one of the `MQC_DESTINATION_*` types. `name` is
/// required for queues and topics and ignored for temporary types.
/// Caller must free with [`mqc_destroy_destination`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_create_destination(
    session: *const MqcSession,
    kind: i32,
    name: *const c_char,
    out: *mut *mut MqcDestination,
) -> MqcStatus {
    catch(|| {
        let session = unsafe { ref_from(session)? };
        let kind = kind_from(kind)?;
        let name = unsafe { c_str_to_option(name)? };
        if out.is_null() {
            return Err(Error::NullPointer);
        }
        let inner = create(session, kind, name.as_deref())?;
        unsafe { write_out(out, MqcDestination { inner }) }
    })
}

/// Create a temporary queue or topic. Any other type fails.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_create_temporary_destination(
    session: *const MqcSession,
    kind: i32,
    out: *mut *mut MqcDestination,
) -> MqcStatus {
    catch(|| {
        let session = unsafe { ref_from(session)? };
        let kind = kind_from(kind)?;
        if !kind.is_temporary() {
            return Err(Error::InvalidArgument(format!(
                "{kind:?} is not a temporary destination type"
            )));
        }
        if out.is_null() {
            return Err(Error::NullPointer);
        }
        let inner = create(session, kind, None)?;
        unsafe { write_out(out, MqcDestination { inner }) }
    })
}

/// Free a destination handle. The destination itself is unaffected.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_destroy_destination(destination: *mut MqcDestination) -> MqcStatus {
    unsafe { destroy(destination) }
}

/// Write 1 into `out` when both handles name the same destination.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_compare_destinations(
    lhs: *const MqcDestination,
    rhs: *const MqcDestination,
    out: *mut i32,
) -> MqcStatus {
    catch(|| {
        let lhs = unsafe { ref_from(lhs)? };
        let rhs = unsafe { ref_from(rhs)? };
        unsafe { write_value(out, to_c_bool(lhs.inner == rhs.inner)) }
    })
}

/// Write 1 into `out` for topics and temporary topics.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_is_destination_topic(
    destination: *const MqcDestination,
    out: *mut i32,
) -> MqcStatus {
    catch(|| {
        let destination = unsafe { ref_from(destination)? };
        unsafe { write_value(out, to_c_bool(destination.inner.is_topic())) }
    })
}

/// Write 1 into `out` for queues and temporary queues.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_is_destination_queue(
    destination: *const MqcDestination,
    out: *mut i32,
) -> MqcStatus {
    catch(|| {
        let destination = unsafe { ref_from(destination)? };
        unsafe { write_value(out, to_c_bool(destination.inner.is_queue())) }
    })
}

/// Write 1 into `out` for temporary destinations.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_is_destination_temporary(
    destination: *const MqcDestination,
    out: *mut i32,
) -> MqcStatus {
    catch(|| {
        let destination = unsafe { ref_from(destination)? };
        unsafe { write_value(out, to_c_bool(destination.inner.is_temporary())) }
    })
}

/// Copy the destination name into `buffer`, truncated to fit.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_get_destination_name(
    destination: *const MqcDestination,
    buffer: *mut c_char,
    size: usize,
) -> MqcStatus {
    catch(|| {
        let destination = unsafe { ref_from(destination)? };
        unsafe { copy_to_buffer(destination.inner.name(), buffer, size) }
    })
}
