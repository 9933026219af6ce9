//! Sessions: the single-threaded context for producing and consuming.
//!
//! A session tracks the messages it has delivered until they are
//! acknowledged (client and individual modes) or committed (transacted
//! mode). Unacknowledged messages go back to the head of the store they
//! came from on recover, rollback and close, flagged as redelivered.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::watch;
use tracing::debug;

use crate::broker::{Envelope, MessageStore, lock};
use crate::browser::QueueBrowser;
use crate::connection::ConnectionCore;
use crate::consumer::{Consumer, ConsumerCore};
use crate::destination::Destination;
use crate::error::{Error, Result};
use crate::message::Message;
use crate::producer::Producer;
use crate::selector::Selector;
use crate::types::{AckMode, DestinationKind};

/// Handle carried by a received message that acknowledges it through its
/// session.
#[derive(Debug, Clone)]
pub(crate) struct AckToken {
    session: Weak<SessionCore>,
    tag: u64,
}

impl AckToken {
    pub(crate) fn acknowledge(&self) -> Result<()> {
        self.session
            .upgrade()
            .ok_or_else(|| Error::closed("session"))?
            .acknowledge(self.tag)
    }
}

struct Delivered {
    tag: u64,
    store: Arc<MessageStore>,
    envelope: Envelope,
}

#[derive(Default)]
struct SessionState {
    next_delivery: u64,
    delivered: Vec<Delivered>,
    /// Sends buffered until commit.
    pending: Vec<(Destination, Message)>,
    consumers: Vec<Weak<ConsumerCore>>,
}

pub(crate) struct SessionCore {
    id: u64,
    pub(crate) connection: Arc<ConnectionCore>,
    ack_mode: AckMode,
    closed: watch::Sender<bool>,
    state: Mutex<SessionState>,
    next_producer: AtomicU64,
    next_consumer: AtomicU64,
}

impl SessionCore {
    pub(crate) const fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    pub(crate) fn watch_closed(&self) -> watch::Receiver<bool> {
        self.closed.subscribe()
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::closed("session"));
        }
        self.connection.ensure_open()
    }

    /// Hand a message taken from `store` to the application, recording it
    /// for acknowledgement when the mode needs it.
    ///
    /// Closed is checked under the state lock: once the session is closed
    /// the envelope goes back to the head of `store` and `None` is returned.
    pub(crate) fn deliver(
        self: &Arc<Self>,
        store: &Arc<MessageStore>,
        envelope: Envelope,
    ) -> Option<Message> {
        let mut state = lock(&self.state);
        if self.is_closed() {
            drop(state);
            store.requeue(envelope);
            return None;
        }
        let mut message = envelope.message.clone();
        if matches!(self.ack_mode, AckMode::Auto | AckMode::DupsOk) {
            return Some(message);
        }
        let tag = state.next_delivery;
        state.next_delivery += 1;
        state.delivered.push(Delivered {
            tag,
            store: Arc::clone(store),
            envelope,
        });
        drop(state);
        if matches!(self.ack_mode, AckMode::Client | AckMode::Individual) {
            message.set_ack(Some(AckToken {
                session: Arc::downgrade(self),
                tag,
            }));
        }
        Some(message)
    }

    fn acknowledge(&self, tag: u64) -> Result<()> {
        self.ensure_open()?;
        let mut state = lock(&self.state);
        match self.ack_mode {
            AckMode::Client => state.delivered.clear(),
            AckMode::Individual => state.delivered.retain(|d| d.tag != tag),
            _ => {}
        }
        Ok(())
    }

    pub(crate) fn send(&self, destination: &Destination, message: Message) -> Result<()> {
        self.ensure_open()?;
        if self.ack_mode == AckMode::Transacted {
            lock(&self.state).pending.push((destination.clone(), message));
            return Ok(());
        }
        self.connection
            .broker
            .publish(destination, message, self.connection.id())
    }

    pub(crate) fn register_consumer(&self, consumer: &Arc<ConsumerCore>) {
        let mut state = lock(&self.state);
        state.consumers.retain(|c| c.strong_count() > 0);
        state.consumers.push(Arc::downgrade(consumer));
    }

    pub(crate) fn next_producer_id(&self) -> u64 {
        self.next_producer.fetch_add(1, Ordering::Relaxed)
    }

    /// Put every unacknowledged delivery back, newest first so the oldest
    /// ends up at the head.
    fn redeliver(&self) {
        let delivered = std::mem::take(&mut lock(&self.state).delivered);
        if delivered.is_empty() {
            return;
        }
        debug!(session = self.id, count = delivered.len(), "redelivering messages");
        for Delivered {
            store,
            mut envelope,
            ..
        } in delivered.into_iter().rev()
        {
            envelope.message.set_redelivered(true);
            store.requeue(envelope);
        }
    }

    fn commit(&self) -> Result<()> {
        self.ensure_open()?;
        if self.ack_mode != AckMode::Transacted {
            return Err(Error::IllegalState("session is not transacted".into()));
        }
        let (pending, acknowledged) = {
            let mut state = lock(&self.state);
            let pending = std::mem::take(&mut state.pending);
            let acknowledged = std::mem::take(&mut state.delivered).len();
            (pending, acknowledged)
        };
        debug!(
            session = self.id,
            sent = pending.len(),
            acknowledged,
            "committed transaction"
        );
        let origin = self.connection.id();
        let mut first_error = None;
        for (destination, message) in pending {
            if let Err(e) = self.connection.broker.publish(&destination, message, origin) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn rollback(&self) -> Result<()> {
        self.ensure_open()?;
        if self.ack_mode != AckMode::Transacted {
            return Err(Error::IllegalState("session is not transacted".into()));
        }
        let discarded = std::mem::take(&mut lock(&self.state).pending).len();
        debug!(session = self.id, discarded, "rolled back transaction");
        self.redeliver();
        Ok(())
    }

    fn recover(&self) -> Result<()> {
        self.ensure_open()?;
        if self.ack_mode == AckMode::Transacted {
            return Err(Error::IllegalState(
                "recover is not valid on a transacted session".into(),
            ));
        }
        self.redeliver();
        Ok(())
    }

    pub(crate) fn close(&self) {
        if self.closed.send_replace(true) {
            return;
        }
        let consumers = {
            let mut state = lock(&self.state);
            state.pending.clear();
            std::mem::take(&mut state.consumers)
        };
        for consumer in consumers.iter().filter_map(Weak::upgrade) {
            consumer.close();
        }
        self.redeliver();
        debug!(session = self.id, "closed session");
    }
}

/// A session on a [`Connection`](crate::Connection).
///
/// Dropping the session closes it.
pub struct Session {
    core: Arc<SessionCore>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.core.id)
            .field("ack_mode", &self.core.ack_mode)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub(crate) fn open(connection: Arc<ConnectionCore>, id: u64, ack_mode: AckMode) -> Self {
        debug!(connection = connection.id(), session = id, ?ack_mode, "opened session");
        Self {
            core: Arc::new(SessionCore {
                id,
                connection,
                ack_mode,
                closed: watch::Sender::new(false),
                state: Mutex::new(SessionState::default()),
                next_producer: AtomicU64::new(1),
                next_consumer: AtomicU64::new(1),
            }),
        }
    }

    pub(crate) fn downgrade(&self) -> Weak<SessionCore> {
        Arc::downgrade(&self.core)
    }

    /// The acknowledgement mode.
    #[must_use]
    pub fn ack_mode(&self) -> AckMode {
        self.core.ack_mode
    }

    /// Whether sends and receives are grouped into transactions.
    #[must_use]
    pub fn is_transacted(&self) -> bool {
        self.core.ack_mode == AckMode::Transacted
    }

    // ---------------------------------------------------------------------
    // Destinations
    // ---------------------------------------------------------------------

    /// A queue named `name`.
    ///
    /// # Errors
    ///
    /// [`Error::IllegalState`] after close.
    pub fn create_queue(&self, name: &str) -> Result<Destination> {
        self.core.ensure_open()?;
        Ok(Destination::queue(name))
    }

    /// A topic named `name`.
    ///
    /// # Errors
    ///
    /// [`Error::IllegalState`] after close.
    pub fn create_topic(&self, name: &str) -> Result<Destination> {
        self.core.ensure_open()?;
        Ok(Destination::topic(name))
    }

    /// A queue that lives until the connection closes.
    ///
    /// # Errors
    ///
    /// [`Error::IllegalState`] after close.
    pub fn create_temporary_queue(&self) -> Result<Destination> {
        self.core.ensure_open()?;
        self.core
            .connection
            .create_temporary(DestinationKind::TemporaryQueue)
    }

    /// A topic that lives until the connection closes.
    ///
    /// # Errors
    ///
    /// [`Error::IllegalState`] after close.
    pub fn create_temporary_topic(&self) -> Result<Destination> {
        self.core.ensure_open()?;
        self.core
            .connection
            .create_temporary(DestinationKind::TemporaryTopic)
    }

    // ---------------------------------------------------------------------
    // Messages
    // ---------------------------------------------------------------------

    /// A message without a body.
    ///
    /// # Errors
    ///
    /// [`Error::IllegalState`] after close.
    pub fn create_message(&self) -> Result<Message> {
        self.core.ensure_open()?;
        Ok(Message::new())
    }

    /// A text message.
    ///
    /// # Errors
    ///
    /// [`Error::IllegalState`] after close.
    pub fn create_text_message(&self, text: &str) -> Result<Message> {
        self.core.ensure_open()?;
        Ok(Message::text(text))
    }

    /// A bytes message holding a copy of `initial`.
    ///
    /// # Errors
    ///
    /// [`Error::IllegalState`] after close.
    pub fn create_bytes_message(&self, initial: &[u8]) -> Result<Message> {
        self.core.ensure_open()?;
        Ok(Message::bytes(initial))
    }

    /// An empty map message.
    ///
    /// # Errors
    ///
    /// [`Error::IllegalState`] after close.
    pub fn create_map_message(&self) -> Result<Message> {
        self.core.ensure_open()?;
        Ok(Message::map())
    }

    /// An empty stream message.
    ///
    /// # Errors
    ///
    /// [`Error::IllegalState`] after close.
    pub fn create_stream_message(&self) -> Result<Message> {
        self.core.ensure_open()?;
        Ok(Message::stream())
    }

    // ---------------------------------------------------------------------
    // Endpoints
    // ---------------------------------------------------------------------

    /// A producer, bound to `destination` when one is given.
    ///
    /// # Errors
    ///
    /// [`Error::IllegalState`] after close.
    pub fn create_producer(&self, destination: Option<&Destination>) -> Result<Producer> {
        self.core.ensure_open()?;
        Ok(Producer::new(Arc::clone(&self.core), destination.cloned()))
    }

    /// A consumer on `destination`.
    ///
    /// With `no_local` set, a topic consumer skips messages published
    /// through this session's connection.
    ///
    /// # Errors
    ///
    /// [`Error::IllegalState`] after close, [`Error::InvalidSelector`] for a
    /// malformed selector, [`Error::InvalidDestination`] for a temporary
    /// destination of another connection.
    pub fn create_consumer(
        &self,
        destination: &Destination,
        selector: Option<&str>,
        no_local: bool,
    ) -> Result<Consumer> {
        self.core.ensure_open()?;
        let selector = Selector::parse_optional(selector)?;
        let id = self.core.next_consumer.fetch_add(1, Ordering::Relaxed);
        Consumer::open(&self.core, id, destination, selector, no_local)
    }

    /// A consumer on the durable subscription `name` of this connection's
    /// client id.
    ///
    /// # Errors
    ///
    /// As [`create_consumer`](Self::create_consumer), plus
    /// [`Error::InvalidDestination`] for anything but a regular topic and
    /// [`Error::IllegalState`] when the subscription already has a consumer.
    pub fn create_durable_consumer(
        &self,
        topic: &Destination,
        name: &str,
        selector: Option<&str>,
        no_local: bool,
    ) -> Result<Consumer> {
        self.core.ensure_open()?;
        let selector = Selector::parse_optional(selector)?;
        let id = self.core.next_consumer.fetch_add(1, Ordering::Relaxed);
        Consumer::open_durable(&self.core, id, topic, name, selector, no_local)
    }

    /// A browser over the pending messages of `queue`.
    ///
    /// # Errors
    ///
    /// [`Error::IllegalState`] after close, [`Error::InvalidDestination`] for
    /// a topic, [`Error::InvalidSelector`] for a malformed selector.
    pub fn create_browser(
        &self,
        queue: &Destination,
        selector: Option<&str>,
    ) -> Result<QueueBrowser> {
        self.core.ensure_open()?;
        let selector = Selector::parse_optional(selector)?;
        QueueBrowser::open(Arc::clone(&self.core), queue, selector)
    }

    /// Remove the durable subscription `name` of this connection's client id.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidDestination`] when no such subscription exists,
    /// [`Error::IllegalState`] while it has a consumer or after close.
    pub fn unsubscribe(&self, name: &str) -> Result<()> {
        self.core.ensure_open()?;
        let client_id = self.core.connection.client_id();
        self.core.connection.broker.unsubscribe_durable(&client_id, name)
    }

    // ---------------------------------------------------------------------
    // Transactions
    // ---------------------------------------------------------------------

    /// Publish buffered sends and forget delivered messages.
    ///
    /// # Errors
    ///
    /// [`Error::IllegalState`] on a non-transacted or closed session; the
    /// first publish failure otherwise.
    pub fn commit(&self) -> Result<()> {
        self.core.commit()
    }

    /// Discard buffered sends and redeliver delivered messages.
    ///
    /// # Errors
    ///
    /// [`Error::IllegalState`] on a non-transacted or closed session.
    pub fn rollback(&self) -> Result<()> {
        self.core.rollback()
    }

    /// Redeliver every unacknowledged message.
    ///
    /// # Errors
    ///
    /// [`Error::IllegalState`] on a transacted or closed session.
    pub fn recover(&self) -> Result<()> {
        self.core.recover()
    }

    /// Close the session and its consumers. Closing twice is a no-op.
    pub fn close(&self) {
        self.core.close();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.core.close();
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
