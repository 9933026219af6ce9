//! Message producers.
//!
//! Sending stamps the headers on the caller's message; the message handle
//! stays owned by the caller.

use mqc::DeliveryMode;

use crate::error::{Error, MqcStatus, catch};
use crate::ffi::*;
use crate::message::delivery_mode;

/// Create a producer. A null `destination` leaves it unbound: every send must
/// then name a destination.
/// Caller must free with [`mqc_destroy_producer`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_create_producer(
    session: *const MqcSession,
    destination: *const MqcDestination,
    out: *mut *mut MqcMessageProducer,
) -> MqcStatus {
    catch(|| {
        let session = unsafe { ref_from(session)? };
        let destination = unsafe { destination.as_ref() }.map(|d| &d.inner);
        if out.is_null() {
            return Err(Error::NullPointer);
        }
        let inner = session.inner.create_producer(destination)?;
        unsafe { write_out(out, MqcMessageProducer { inner }) }
    })
}

/// Close and free a producer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_destroy_producer(producer: *mut MqcMessageProducer) -> MqcStatus {
    unsafe { destroy(producer) }
}

/// Close a producer. Later sends fail with `ILLEGAL_STATE`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_close_producer(producer: *mut MqcMessageProducer) -> MqcStatus {
    catch(|| {
        unsafe { ref_from(producer)? }.inner.close();
        Ok(())
    })
}

// ---------------------------------------------------------------------------
// Sending
// ---------------------------------------------------------------------------

/// Send to the producer's destination with explicit delivery mode, priority
/// and time to live in milliseconds (0 never expires).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_producer_send(
    producer: *const MqcMessageProducer,
    message: *mut MqcMessage,
    mode: i32,
    priority: i32,
    time_to_live: i64,
) -> MqcStatus {
    catch(|| {
        let producer = unsafe { ref_from(producer)? };
        let message = unsafe { mut_from(message)? };
        let mode = delivery_mode(mode)?;
        Ok(producer
            .inner
            .send_with(&mut message.inner, mode, priority, time_to_live)?)
    })
}

/// Send to `destination`. Fails with `UNSUPPORTED_OPERATION` when the
/// producer is bound to a different destination.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_producer_send_to_destination(
    producer: *const MqcMessageProducer,
    message: *mut MqcMessage,
    destination: *const MqcDestination,
    mode: i32,
    priority: i32,
    time_to_live: i64,
) -> MqcStatus {
    catch(|| {
        let producer = unsafe { ref_from(producer)? };
        let message = unsafe { mut_from(message)? };
        let destination = unsafe { ref_from(destination)? };
        let mode = delivery_mode(mode)?;
        Ok(producer.inner.send_to(
            &destination.inner,
            &mut message.inner,
            mode,
            priority,
            time_to_live,
        )?)
    })
}

/// Send with the producer's configured delivery mode, priority and time to live.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_producer_send_with_defaults(
    producer: *const MqcMessageProducer,
    message: *mut MqcMessage,
) -> MqcStatus {
    catch(|| {
        let producer = unsafe { ref_from(producer)? };
        let message = unsafe { mut_from(message)? };
        Ok(producer.inner.send(&mut message.inner)?)
    })
}

/// Send with the producer's delivery mode and priority and an explicit time
/// to live in milliseconds.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_producer_send_with_timeout(
    producer: *const MqcMessageProducer,
    message: *mut MqcMessage,
    time_to_live: i64,
) -> MqcStatus {
    catch(|| {
        let producer = unsafe { ref_from(producer)? };
        let message = unsafe { mut_from(message)? };
        let producer = &producer.inner;
        Ok(producer.send_with(
            &mut message.inner,
            producer.delivery_mode(),
            producer.priority(),
            time_to_live,
        )?)
    })
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Set the default delivery mode to one of the `MQC_DELIVERY_*` values.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_set_producer_delivery_mode(
    producer: *const MqcMessageProducer,
    mode: i32,
) -> MqcStatus {
    catch(|| {
        let producer = unsafe { ref_from(producer)? };
        let mode: DeliveryMode = delivery_mode(mode)?;
        producer.inner.set_delivery_mode(mode);
        Ok(())
    })
}

/// Write the default delivery mode into `out`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_get_producer_delivery_mode(
    producer: *const MqcMessageProducer,
    out: *mut i32,
) -> MqcStatus {
    catch(|| {
        let producer = unsafe { ref_from(producer)? };
        unsafe { write_value(out, producer.inner.delivery_mode().to_ffi()) }
    })
}

/// Stop (1) or resume (0) assigning message ids on send.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_set_producer_disable_message_id(
    producer: *const MqcMessageProducer,
    disable: i32,
) -> MqcStatus {
    catch(|| {
        unsafe { ref_from(producer)? }
            .inner
            .set_disable_message_id(from_c_bool(disable));
        Ok(())
    })
}

/// Write 1 into `out` when message ids are not assigned.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_get_producer_disable_message_id(
    producer: *const MqcMessageProducer,
    out: *mut i32,
) -> MqcStatus {
    catch(|| {
        let producer = unsafe { ref_from(producer)? };
        unsafe { write_value(out, to_c_bool(producer.inner.disable_message_id())) }
    })
}

/// Stop (1) or resume (0) stamping timestamps on send.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_set_producer_disable_message_timestamp(
    producer: *const MqcMessageProducer,
    disable: i32,
) -> MqcStatus {
    catch(|| {
        unsafe { ref_from(producer)? }
            .inner
            .set_disable_message_timestamp(from_c_bool(disable));
        Ok(())
    })
}

/// Write 1 into `out` when timestamps are not stamped.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_get_producer_disable_message_timestamp(
    producer: *const MqcMessageProducer,
    out: *mut i32,
) -> MqcStatus {
    catch(|| {
        let producer = unsafe { ref_from(producer)? };
        unsafe { write_value(out, to_c_bool(producer.inner.disable_message_timestamp())) }
    })
}

/// Set the default priority, 0 through 9.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_set_producer_priority(
    producer: *const MqcMessageProducer,
    priority: i32,
) -> MqcStatus {
    catch(|| Ok(unsafe { ref_from(producer)? }.inner.set_priority(priority)?))
}

/// Write the default priority into `out`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_get_producer_priority(
    producer: *const MqcMessageProducer,
    out: *mut i32,
) -> MqcStatus {
    catch(|| {
        let producer = unsafe { ref_from(producer)? };
        unsafe { write_value(out, producer.inner.priority()) }
    })
}

/// Set the default time to live in milliseconds. 0 never expires.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_set_producer_time_to_live(
    producer: *const MqcMessageProducer,
    time_to_live: i64,
) -> MqcStatus {
    catch(|| {
        Ok(unsafe { ref_from(producer)? }
            .inner
            .set_time_to_live(time_to_live)?)
    })
}

/// Write the default time to live in milliseconds into `out`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_get_producer_time_to_live(
    producer: *const MqcMessageProducer,
    out: *mut i64,
) -> MqcStatus {
    catch(|| {
        let producer = unsafe { ref_from(producer)? };
        unsafe { write_value(out, producer.inner.time_to_live()) }
    })
}
