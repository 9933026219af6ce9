//! Message consumers.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::debug;

use crate::broker::{MessageStore, Subscription};
use crate::connection::ConnectionState;
use crate::destination::Destination;
use crate::error::{Error, Result};
use crate::message::Message;
use crate::selector::Selector;
use crate::session::SessionCore;

enum Source {
    Queue(Arc<MessageStore>),
    Topic(Arc<Subscription>),
    Durable {
        subscription: Arc<Subscription>,
        client_id: String,
        name: String,
    },
}

impl Source {
    fn store(&self) -> &Arc<MessageStore> {
        match self {
            Self::Queue(store) => store,
            Self::Topic(subscription) | Self::Durable { subscription, .. } => &subscription.store,
        }
    }
}

pub(crate) struct ConsumerCore {
    id: u64,
    session: Arc<SessionCore>,
    destination: Destination,
    source: Source,
    selector: Option<Selector>,
    closed: watch::Sender<bool>,
}

impl ConsumerCore {
    fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Take the next message for this consumer, if any is waiting.
    fn try_take(&self) -> Option<Message> {
        let store = self.source.store();
        // Topic subscriptions filter at publish time.
        let selector = match self.source {
            Source::Queue(_) => self.selector.as_ref(),
            _ => None,
        };
        let envelope = store.take(selector)?;
        self.session.deliver(store, envelope)
    }

    async fn receive_until(&self, deadline: Option<Instant>) -> Result<Option<Message>> {
        if self.is_closed() {
            return Err(Error::closed("consumer"));
        }
        let mut closed = self.closed.subscribe();
        let mut session_closed = self.session.watch_closed();
        let mut connection = self.session.connection.watch_state();

        loop {
            if *closed.borrow_and_update()
                || *session_closed.borrow_and_update()
                || *connection.borrow_and_update() == ConnectionState::Closed
            {
                return Ok(None);
            }

            let notified = self.source.store().notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if *connection.borrow() == ConnectionState::Started {
                if let Some(message) = self.try_take() {
                    return Ok(Some(message));
                }
            }

            let expired = async {
                match deadline {
                    Some(deadline) => tokio::time::sleep_until(deadline).await,
                    None => std::future::pending().await,
                }
            };
            tokio::select! {
                () = &mut notified => {}
                _ = closed.changed() => {}
                _ = session_closed.changed() => {}
                _ = connection.changed() => {}
                () = expired => return Ok(None),
            }
        }
    }

    pub(crate) fn close(&self) {
        if self.closed.send_replace(true) {
            return;
        }
        let broker = &self.session.connection.broker;
        match &self.source {
            Source::Queue(_) => {}
            Source::Topic(subscription) => broker.unsubscribe(&self.destination, subscription),
            Source::Durable {
                client_id, name, ..
            } => broker.deactivate_durable(client_id, name),
        }
        debug!(consumer = self.id, destination = %self.destination, "closed consumer");
    }
}

/// Receives messages from a queue, a topic or a durable subscription.
///
/// Dropping the consumer closes it.
pub struct Consumer {
    core: Arc<ConsumerCore>,
}

impl std::fmt::Debug for Consumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Consumer")
            .field("id", &self.core.id)
            .field("destination", &self.core.destination)
            .finish_non_exhaustive()
    }
}

impl Consumer {
    pub(crate) fn open(
        session: &Arc<SessionCore>,
        id: u64,
        destination: &Destination,
        selector: Option<Selector>,
        no_local: bool,
    ) -> Result<Self> {
        let connection = &session.connection;
        connection.broker.check_consumable(destination, connection.id())?;
        let source = if destination.is_queue() {
            Source::Queue(connection.broker.queue_store(destination))
        } else {
            Source::Topic(connection.broker.subscribe(
                destination,
                selector.clone(),
                no_local.then(|| connection.id().to_owned()),
            ))
        };
        Ok(Self::register(session, id, destination, source, selector))
    }

    pub(crate) fn open_durable(
        session: &Arc<SessionCore>,
        id: u64,
        topic: &Destination,
        name: &str,
        selector: Option<Selector>,
        no_local: bool,
    ) -> Result<Self> {
        if !topic.is_topic() || topic.is_temporary() {
            return Err(Error::InvalidDestination(format!(
                "durable subscriptions need a topic, got {topic}"
            )));
        }
        let connection = &session.connection;
        let client_id = connection.client_id();
        let subscription = connection.broker.subscribe_durable(
            &client_id,
            name,
            topic,
            selector.clone(),
            no_local.then(|| connection.id().to_owned()),
        )?;
        let source = Source::Durable {
            subscription,
            client_id,
            name: name.to_owned(),
        };
        Ok(Self::register(session, id, topic, source, selector))
    }

    fn register(
        session: &Arc<SessionCore>,
        id: u64,
        destination: &Destination,
        source: Source,
        selector: Option<Selector>,
    ) -> Self {
        let core = Arc::new(ConsumerCore {
            id,
            session: Arc::clone(session),
            destination: destination.clone(),
            source,
            selector,
            closed: watch::Sender::new(false),
        });
        session.register_consumer(&core);
        debug!(consumer = id, destination = %destination, "opened consumer");
        Self { core }
    }

    /// The destination consumed from.
    #[must_use]
    pub fn destination(&self) -> &Destination {
        &self.core.destination
    }

    /// The selector expression, if any.
    #[must_use]
    pub fn message_selector(&self) -> Option<&str> {
        self.core.selector.as_ref().map(Selector::source)
    }

    /// Wait for the next message.
    ///
    /// Returns `None` when the consumer, its session or its connection is
    /// closed while waiting. While the connection is stopped the call keeps
    /// waiting.
    ///
    /// # Errors
    ///
    /// [`Error::IllegalState`] if the consumer is already closed.
    pub async fn receive(&self) -> Result<Option<Message>> {
        self.core.receive_until(None).await
    }

    /// Wait at most `timeout` for the next message; `None` on expiry or close.
    /// A timeout too large to represent waits forever.
    ///
    /// # Errors
    ///
    /// [`Error::IllegalState`] if the consumer is already closed.
    pub async fn receive_timeout(&self, timeout: Duration) -> Result<Option<Message>> {
        self.core
            .receive_until(Instant::now().checked_add(timeout))
            .await
    }

    /// The next message if one is waiting and the connection is started.
    ///
    /// # Errors
    ///
    /// [`Error::IllegalState`] if the consumer is closed.
    pub fn receive_no_wait(&self) -> Result<Option<Message>> {
        if self.core.is_closed() {
            return Err(Error::closed("consumer"));
        }
        if self.core.session.connection.state() != ConnectionState::Started {
            return Ok(None);
        }
        Ok(self.core.try_take())
    }

    /// Close the consumer, waking any blocked receive. Closing twice is a
    /// no-op.
    pub fn close(&self) {
        self.core.close();
    }
}

impl Drop for Consumer {
    fn drop(&mut self) {
        self.core.close();
    }
}
