//! `mqc-ffi` — C ABI bindings for the `mqc` messaging client.
//!
//! Design principles:
//! - Every public function returns an [`MqcStatus`] unless documented otherwise.
//! - Panics and runtime errors never cross the boundary; each maps to exactly one status.
//! - Connection-scoped calls also keep their last failure, read via
//!   [`mqc_get_error_string`](connection::mqc_get_error_string).
//! - Opaque handles are heap-allocated `Box<T>` behind `*mut T` with explicit
//!   `mqc_destroy_*` functions. Destroying null succeeds.
//! - Message handles carry a kind tag; typed accessors on another kind fail
//!   with `INVALID_MESSAGE_TYPE`.
//! - Blocking receives run on a shared tokio runtime.

mod ffi;

pub mod bytes_message;
pub mod connection;
pub mod connection_factory;
pub mod consumer;
pub mod destination;
pub mod error;
pub mod map_message;
pub mod message;
pub mod producer;
pub mod queue_browser;
pub mod session;
pub mod stream_message;
pub mod text_message;

pub use error::{Error, MqcStatus};
pub use ffi::{
    MQC_ACK_AUTO, MQC_ACK_CLIENT, MQC_ACK_DUPS_OK, MQC_ACK_INDIVIDUAL, MQC_ACK_TRANSACTED,
    MQC_DELIVERY_NON_PERSISTENT, MQC_DELIVERY_PERSISTENT, MQC_DESTINATION_QUEUE,
    MQC_DESTINATION_TEMPORARY_QUEUE, MQC_DESTINATION_TEMPORARY_TOPIC, MQC_DESTINATION_TOPIC,
    MQC_MESSAGE_KIND_BYTES, MQC_MESSAGE_KIND_MAP, MQC_MESSAGE_KIND_MESSAGE, MQC_MESSAGE_KIND_STREAM,
    MQC_MESSAGE_KIND_TEXT, MqcConnection, MqcConnectionFactory, MqcDestination, MqcMessage,
    MqcMessageConsumer, MqcMessageProducer, MqcQueueBrowser, MqcSession, mqc_free_string_array,
    mqc_init_logger, mqc_initialize, mqc_terminate,
};
