//! Messages: standard headers, typed properties and one of five body kinds.

pub mod bytes;
pub mod stream;

use std::time::{SystemTime, UNIX_EPOCH};

pub use bytes::BytesBody;
pub use stream::StreamBody;

use crate::destination::Destination;
use crate::error::{Error, Result};
use crate::session::AckToken;
use crate::types::DeliveryMode;
use crate::value::{Value, ValueMap};

/// Priority assigned to new messages and producers.
pub const DEFAULT_PRIORITY: i32 = 4;

/// Message body.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// No payload.
    Empty,
    /// A single string.
    Text(String),
    /// Big-endian primitive stream.
    Bytes(BytesBody),
    /// Named typed values.
    Map(ValueMap),
    /// Ordered typed values.
    Stream(StreamBody),
}

/// A message owned by the application.
///
/// Messages received from a consumer or browser arrive with read-only
/// properties and a read-only body; [`clear_properties`](Self::clear_properties)
/// and [`clear_body`](Self::clear_body) make them writable again.
#[derive(Debug, Clone)]
pub struct Message {
    correlation_id: String,
    delivery_mode: DeliveryMode,
    destination: Option<Destination>,
    expiration: i64,
    message_id: String,
    priority: i32,
    redelivered: bool,
    reply_to: Option<Destination>,
    timestamp: i64,
    message_type: String,
    properties: ValueMap,
    read_only_properties: bool,
    read_only_body: bool,
    body: Body,
    ack: Option<AckToken>,
}

impl Default for Message {
    fn default() -> Self {
        Self::with_body(Body::Empty)
    }
}

impl Message {
    fn with_body(body: Body) -> Self {
        Self {
            correlation_id: String::new(),
            delivery_mode: DeliveryMode::default(),
            destination: None,
            expiration: 0,
            message_id: String::new(),
            priority: DEFAULT_PRIORITY,
            redelivered: false,
            reply_to: None,
            timestamp: 0,
            message_type: String::new(),
            properties: ValueMap::new(),
            read_only_properties: false,
            read_only_body: false,
            body,
            ack: None,
        }
    }

    /// A message without a body.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A text message.
    pub fn text(text: impl Into<String>) -> Self {
        Self::with_body(Body::Text(text.into()))
    }

    /// A bytes message in write mode, pre-filled with `initial`.
    #[must_use]
    pub fn bytes(initial: &[u8]) -> Self {
        Self::with_body(Body::Bytes(BytesBody::new(initial)))
    }

    /// An empty map message.
    #[must_use]
    pub fn map() -> Self {
        Self::with_body(Body::Map(ValueMap::new()))
    }

    /// An empty stream message in write mode.
    #[must_use]
    pub fn stream() -> Self {
        Self::with_body(Body::Stream(StreamBody::default()))
    }

    /// The body.
    #[must_use]
    pub const fn body(&self) -> &Body {
        &self.body
    }

    // ---------------------------------------------------------------------
    // Typed bodies
    // ---------------------------------------------------------------------

    /// Text of a text message.
    ///
    /// # Errors
    ///
    /// [`Error::MessageFormat`] for other body kinds.
    pub fn get_text(&self) -> Result<&str> {
        match &self.body {
            Body::Text(text) => Ok(text),
            _ => Err(wrong_body("text")),
        }
    }

    /// Replace the text of a text message.
    ///
    /// # Errors
    ///
    /// [`Error::MessageNotWriteable`] on a received message,
    /// [`Error::MessageFormat`] for other body kinds.
    pub fn set_text(&mut self, text: impl Into<String>) -> Result<()> {
        let read_only = self.read_only_body;
        match &mut self.body {
            Body::Text(_) if read_only => Err(Error::MessageNotWriteable),
            Body::Text(current) => {
                *current = text.into();
                Ok(())
            }
            _ => Err(wrong_body("text")),
        }
    }

    /// Body of a bytes message. Mode checks live in [`BytesBody`].
    ///
    /// # Errors
    ///
    /// [`Error::MessageFormat`] for other body kinds.
    pub fn bytes_body_mut(&mut self) -> Result<&mut BytesBody> {
        match &mut self.body {
            Body::Bytes(body) => Ok(body),
            _ => Err(wrong_body("bytes")),
        }
    }

    /// Entries of a map message.
    ///
    /// # Errors
    ///
    /// [`Error::MessageFormat`] for other body kinds.
    pub fn map_body(&self) -> Result<&ValueMap> {
        match &self.body {
            Body::Map(map) => Ok(map),
            _ => Err(wrong_body("map")),
        }
    }

    /// Writable entries of a map message.
    ///
    /// # Errors
    ///
    /// [`Error::MessageNotWriteable`] on a received message,
    /// [`Error::MessageFormat`] for other body kinds.
    pub fn map_body_mut(&mut self) -> Result<&mut ValueMap> {
        let read_only = self.read_only_body;
        match &mut self.body {
            Body::Map(_) if read_only => Err(Error::MessageNotWriteable),
            Body::Map(map) => Ok(map),
            _ => Err(wrong_body("map")),
        }
    }

    /// Body of a stream message. Mode checks live in [`StreamBody`].
    ///
    /// # Errors
    ///
    /// [`Error::MessageFormat`] for other body kinds.
    pub fn stream_body_mut(&mut self) -> Result<&mut StreamBody> {
        match &mut self.body {
            Body::Stream(body) => Ok(body),
            _ => Err(wrong_body("stream")),
        }
    }

    /// Empty the body and make it writable. The body kind is kept.
    pub fn clear_body(&mut self) {
        match &mut self.body {
            Body::Empty => {}
            Body::Text(text) => text.clear(),
            Body::Bytes(body) => body.clear(),
            Body::Map(map) => map.clear(),
            Body::Stream(body) => body.clear(),
        }
        self.read_only_body = false;
    }

    // ---------------------------------------------------------------------
    // Properties
    // ---------------------------------------------------------------------

    /// Application properties.
    #[must_use]
    pub const fn properties(&self) -> &ValueMap {
        &self.properties
    }

    /// Set an application property.
    ///
    /// # Errors
    ///
    /// [`Error::MessageNotWriteable`] on a received message, [`Error::Other`]
    /// for an empty name.
    pub fn set_property(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        if name.is_empty() {
            return Err(Error::Other("property name must not be empty".into()));
        }
        if self.read_only_properties {
            return Err(Error::MessageNotWriteable);
        }
        self.properties.set(name, value);
        Ok(())
    }

    /// Remove every property and make the properties writable.
    pub fn clear_properties(&mut self) {
        self.properties.clear();
        self.read_only_properties = false;
    }

    // ---------------------------------------------------------------------
    // Headers
    // ---------------------------------------------------------------------

    /// `JMSCorrelationID`
    #[must_use]
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    /// Set `JMSCorrelationID`.
    pub fn set_correlation_id(&mut self, id: impl Into<String>) {
        self.correlation_id = id.into();
    }

    /// `JMSDeliveryMode`
    #[must_use]
    pub const fn delivery_mode(&self) -> DeliveryMode {
        self.delivery_mode
    }

    /// Set `JMSDeliveryMode`.
    pub const fn set_delivery_mode(&mut self, mode: DeliveryMode) {
        self.delivery_mode = mode;
    }

    /// `JMSDestination`, stamped when the message is sent.
    #[must_use]
    pub const fn destination(&self) -> Option<&Destination> {
        self.destination.as_ref()
    }

    /// Set `JMSDestination`.
    pub fn set_destination(&mut self, destination: Option<Destination>) {
        self.destination = destination;
    }

    /// `JMSExpiration` in epoch milliseconds; `0` never expires.
    #[must_use]
    pub const fn expiration(&self) -> i64 {
        self.expiration
    }

    /// Set `JMSExpiration`.
    pub const fn set_expiration(&mut self, expiration: i64) {
        self.expiration = expiration;
    }

    /// `JMSMessageID`
    #[must_use]
    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    /// Set `JMSMessageID`.
    pub fn set_message_id(&mut self, id: impl Into<String>) {
        self.message_id = id.into();
    }

    /// `JMSPriority`, 0 (lowest) to 9.
    #[must_use]
    pub const fn priority(&self) -> i32 {
        self.priority
    }

    /// Set `JMSPriority`.
    pub const fn set_priority(&mut self, priority: i32) {
        self.priority = priority;
    }

    /// `JMSRedelivered`
    #[must_use]
    pub const fn redelivered(&self) -> bool {
        self.redelivered
    }

    /// Set `JMSRedelivered`.
    pub const fn set_redelivered(&mut self, redelivered: bool) {
        self.redelivered = redelivered;
    }

    /// `JMSReplyTo`
    #[must_use]
    pub const fn reply_to(&self) -> Option<&Destination> {
        self.reply_to.as_ref()
    }

    /// Set `JMSReplyTo`.
    pub fn set_reply_to(&mut self, destination: Option<Destination>) {
        self.reply_to = destination;
    }

    /// `JMSTimestamp` in epoch milliseconds.
    #[must_use]
    pub const fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Set `JMSTimestamp`.
    pub const fn set_timestamp(&mut self, timestamp: i64) {
        self.timestamp = timestamp;
    }

    /// `JMSType`
    #[must_use]
    pub fn message_type(&self) -> &str {
        &self.message_type
    }

    /// Set `JMSType`.
    pub fn set_message_type(&mut self, message_type: impl Into<String>) {
        self.message_type = message_type.into();
    }

    // ---------------------------------------------------------------------
    // Delivery
    // ---------------------------------------------------------------------

    /// Acknowledge this message through the session that delivered it.
    ///
    /// A no-op for messages that were never received or whose session does
    /// not use client or individual acknowledgement.
    ///
    /// # Errors
    ///
    /// [`Error::IllegalState`] when the delivering session is closed.
    pub fn acknowledge(&self) -> Result<()> {
        self.ack.as_ref().map_or(Ok(()), AckToken::acknowledge)
    }

    /// Lock properties and body as they are on arrival.
    pub(crate) fn freeze(&mut self) {
        self.read_only_properties = true;
        self.read_only_body = true;
        match &mut self.body {
            Body::Bytes(body) => body.reset(),
            Body::Stream(body) => body.reset(),
            _ => {}
        }
    }

    pub(crate) fn set_ack(&mut self, token: Option<AckToken>) {
        self.ack = token;
    }

    pub(crate) const fn is_expired(&self, now: i64) -> bool {
        self.expiration != 0 && self.expiration <= now
    }

    /// Value of a header or property as seen by a message selector.
    pub(crate) fn selector_value(&self, identifier: &str) -> Option<Value> {
        let non_empty = |s: &str| (!s.is_empty()).then(|| Value::String(s.to_owned()));
        match identifier {
            "JMSMessageID" => non_empty(&self.message_id),
            "JMSCorrelationID" => non_empty(&self.correlation_id),
            "JMSType" => non_empty(&self.message_type),
            "JMSPriority" => Some(Value::Int(self.priority)),
            "JMSTimestamp" => Some(Value::Long(self.timestamp)),
            "JMSExpiration" => Some(Value::Long(self.expiration)),
            "JMSRedelivered" => Some(Value::Bool(self.redelivered)),
            "JMSDeliveryMode" => Some(Value::String(
                match self.delivery_mode {
                    DeliveryMode::Persistent => "PERSISTENT",
                    DeliveryMode::NonPersistent => "NON_PERSISTENT",
                }
                .to_owned(),
            )),
            name => self.properties.get(name).cloned(),
        }
    }
}

fn wrong_body(wanted: &str) -> Error {
    Error::MessageFormat(format!("not a {wanted} message"))
}

/// Milliseconds since the Unix epoch.
pub(crate) fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
