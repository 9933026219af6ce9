//! Message producers.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::trace;

use crate::broker::lock;
use crate::destination::Destination;
use crate::error::{Error, Result};
use crate::message::{DEFAULT_PRIORITY, Message, now_millis};
use crate::session::SessionCore;
use crate::types::DeliveryMode;

#[derive(Debug, Clone, Copy)]
struct ProducerConfig {
    delivery_mode: DeliveryMode,
    priority: i32,
    time_to_live: i64,
    disable_message_id: bool,
    disable_message_timestamp: bool,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            delivery_mode: DeliveryMode::Persistent,
            priority: DEFAULT_PRIORITY,
            time_to_live: 0,
            disable_message_id: false,
            disable_message_timestamp: false,
        }
    }
}

/// Sends messages, optionally bound to one destination.
pub struct Producer {
    session: Arc<SessionCore>,
    id: u64,
    destination: Option<Destination>,
    config: Mutex<ProducerConfig>,
    next_seq: AtomicU64,
    closed: AtomicBool,
}

impl std::fmt::Debug for Producer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Producer")
            .field("id", &self.id)
            .field("destination", &self.destination)
            .finish_non_exhaustive()
    }
}

impl Producer {
    pub(crate) fn new(session: Arc<SessionCore>, destination: Option<Destination>) -> Self {
        let id = session.next_producer_id();
        Self {
            session,
            id,
            destination,
            config: Mutex::new(ProducerConfig::default()),
            next_seq: AtomicU64::new(1),
            closed: AtomicBool::new(false),
        }
    }

    /// The bound destination, if any.
    #[must_use]
    pub const fn destination(&self) -> Option<&Destination> {
        self.destination.as_ref()
    }

    // ---------------------------------------------------------------------
    // Configuration
    // ---------------------------------------------------------------------

    /// Delivery mode used by [`send`](Self::send).
    #[must_use]
    pub fn delivery_mode(&self) -> DeliveryMode {
        lock(&self.config).delivery_mode
    }

    /// Set the default delivery mode.
    pub fn set_delivery_mode(&self, mode: DeliveryMode) {
        lock(&self.config).delivery_mode = mode;
    }

    /// Priority used by [`send`](Self::send).
    #[must_use]
    pub fn priority(&self) -> i32 {
        lock(&self.config).priority
    }

    /// # Errors
    ///
    /// [`Error::Other`] outside `0..=9`.
    pub fn set_priority(&self, priority: i32) -> Result<()> {
        check_priority(priority)?;
        lock(&self.config).priority = priority;
        Ok(())
    }

    /// Time to live in milliseconds; `0` means forever.
    #[must_use]
    pub fn time_to_live(&self) -> i64 {
        lock(&self.config).time_to_live
    }

    /// # Errors
    ///
    /// [`Error::Other`] for a negative value.
    pub fn set_time_to_live(&self, millis: i64) -> Result<()> {
        check_time_to_live(millis)?;
        lock(&self.config).time_to_live = millis;
        Ok(())
    }

    /// Whether `JMSMessageID` stamping is off.
    #[must_use]
    pub fn disable_message_id(&self) -> bool {
        lock(&self.config).disable_message_id
    }

    /// Stop stamping `JMSMessageID` on sent messages.
    pub fn set_disable_message_id(&self, disable: bool) {
        lock(&self.config).disable_message_id = disable;
    }

    /// Whether `JMSTimestamp` stamping is off.
    #[must_use]
    pub fn disable_message_timestamp(&self) -> bool {
        lock(&self.config).disable_message_timestamp
    }

    /// Stop stamping `JMSTimestamp` on sent messages.
    pub fn set_disable_message_timestamp(&self, disable: bool) {
        lock(&self.config).disable_message_timestamp = disable;
    }

    // ---------------------------------------------------------------------
    // Sending
    // ---------------------------------------------------------------------

    /// Send to the bound destination with the configured mode, priority and
    /// time to live.
    ///
    /// # Errors
    ///
    /// See [`send_with`](Self::send_with).
    pub fn send(&self, message: &mut Message) -> Result<()> {
        let config = *lock(&self.config);
        self.send_with(message, config.delivery_mode, config.priority, config.time_to_live)
    }

    /// Send to the bound destination with explicit quality of service.
    ///
    /// The headers are stamped on `message`; the broker receives a copy.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedOperation`] when the producer has no destination,
    /// [`Error::IllegalState`] when it or its session is closed,
    /// [`Error::Other`] for an invalid priority or time to live.
    pub fn send_with(
        &self,
        message: &mut Message,
        mode: DeliveryMode,
        priority: i32,
        time_to_live: i64,
    ) -> Result<()> {
        let destination = self.resolve(None)?.clone();
        self.dispatch(&destination, message, mode, priority, time_to_live)
    }

    /// Send to `destination`.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedOperation`] when the producer is bound to another
    /// destination, otherwise as [`send_with`](Self::send_with).
    pub fn send_to(
        &self,
        destination: &Destination,
        message: &mut Message,
        mode: DeliveryMode,
        priority: i32,
        time_to_live: i64,
    ) -> Result<()> {
        let destination = self.resolve(Some(destination))?.clone();
        self.dispatch(&destination, message, mode, priority, time_to_live)
    }

    /// Close the producer. Closing twice is a no-op.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    fn resolve<'a>(&'a self, requested: Option<&'a Destination>) -> Result<&'a Destination> {
        match (&self.destination, requested) {
            (Some(bound), None) => Ok(bound),
            (Some(bound), Some(requested)) if bound == requested => Ok(bound),
            (Some(bound), Some(requested)) => Err(Error::UnsupportedOperation(format!(
                "producer is bound to {bound}, cannot send to {requested}"
            ))),
            (None, Some(requested)) => Ok(requested),
            (None, None) => Err(Error::UnsupportedOperation(
                "producer has no destination".into(),
            )),
        }
    }

    fn dispatch(
        &self,
        destination: &Destination,
        message: &mut Message,
        mode: DeliveryMode,
        priority: i32,
        time_to_live: i64,
    ) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::closed("producer"));
        }
        check_priority(priority)?;
        check_time_to_live(time_to_live)?;
        let config = *lock(&self.config);

        let now = now_millis();
        message.set_destination(Some(destination.clone()));
        message.set_delivery_mode(mode);
        message.set_priority(priority);
        message.set_timestamp(if config.disable_message_timestamp { 0 } else { now });
        message.set_expiration(if time_to_live > 0 {
            now.saturating_add(time_to_live)
        } else {
            0
        });
        if config.disable_message_id {
            message.set_message_id("");
        } else {
            let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
            message.set_message_id(format!(
                "{}:{}:{}:{seq}",
                self.session.connection.id(),
                self.session.id(),
                self.id
            ));
        }

        trace!(destination = %destination, message_id = message.message_id(), "sending message");
        self.session.send(destination, message.clone())
    }
}

fn check_priority(priority: i32) -> Result<()> {
    if !(0..=9).contains(&priority) {
        return Err(Error::Other(format!(
            "priority must be between 0 and 9, got {priority}"
        )));
    }
    Ok(())
}

fn check_time_to_live(millis: i64) -> Result<()> {
    if millis < 0 {
        return Err(Error::Other(format!(
            "time to live must not be negative, got {millis}"
        )));
    }
    Ok(())
}
