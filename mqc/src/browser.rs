//! Queue browsers: non-consuming views of a queue's pending messages.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::broker::{MessageStore, lock};
use crate::destination::Destination;
use crate::error::{Error, Result};
use crate::message::Message;
use crate::selector::Selector;
use crate::session::SessionCore;

/// Walks the messages pending on a queue without removing them.
///
/// Each message is returned at most once. Messages that arrive while
/// browsing are included when they are reached.
pub struct QueueBrowser {
    session: Arc<SessionCore>,
    queue: Destination,
    store: Arc<MessageStore>,
    selector: Option<Selector>,
    seen: Mutex<HashSet<u64>>,
    closed: AtomicBool,
}

impl std::fmt::Debug for QueueBrowser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueBrowser")
            .field("queue", &self.queue)
            .field("selector", &self.message_selector())
            .finish_non_exhaustive()
    }
}

impl QueueBrowser {
    pub(crate) fn open(
        session: Arc<SessionCore>,
        queue: &Destination,
        selector: Option<Selector>,
    ) -> Result<Self> {
        if !queue.is_queue() {
            return Err(Error::InvalidDestination(format!(
                "only queues can be browsed, got {queue}"
            )));
        }
        let connection = &session.connection;
        connection.broker.check_consumable(queue, connection.id())?;
        let store = connection.broker.queue_store(queue);
        Ok(Self {
            session,
            queue: queue.clone(),
            store,
            selector,
            seen: Mutex::new(HashSet::new()),
            closed: AtomicBool::new(false),
        })
    }

    /// The browsed queue.
    #[must_use]
    pub const fn queue(&self) -> &Destination {
        &self.queue
    }

    /// The selector expression, if any.
    #[must_use]
    pub fn message_selector(&self) -> Option<&str> {
        self.selector.as_ref().map(Selector::source)
    }

    /// Whether [`next_message`](Self::next_message) would return a message.
    ///
    /// # Errors
    ///
    /// [`Error::IllegalState`] when the browser or its session is closed.
    pub fn has_more_messages(&self) -> Result<bool> {
        self.ensure_open()?;
        let seen = lock(&self.seen);
        Ok(self.store.peek_unseen(self.selector.as_ref(), &seen).is_some())
    }

    /// A copy of the next pending message, or `None` once every pending
    /// message has been returned.
    ///
    /// # Errors
    ///
    /// [`Error::IllegalState`] when the browser or its session is closed.
    pub fn next_message(&self) -> Result<Option<Message>> {
        self.ensure_open()?;
        let mut seen = lock(&self.seen);
        let Some(envelope) = self.store.peek_unseen(self.selector.as_ref(), &seen) else {
            return Ok(None);
        };
        seen.insert(envelope.seq);
        Ok(Some(envelope.message))
    }

    /// Close the browser. Closing twice is a no-op.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::closed("browser"));
        }
        self.session.ensure_open()
    }
}
