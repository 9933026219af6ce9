//! In-process broker reached through `vm://<name>` URIs.
//!
//! Brokers live in a process-wide registry keyed by name. Each queue owns one
//! [`MessageStore`] shared by all of its consumers; each topic subscription
//! owns its own store, filled at publish time. Durable subscriptions are keyed
//! by client id and subscription name and keep their store while no consumer
//! is attached.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tokio::sync::futures::Notified;
use tracing::{debug, trace};

use crate::destination::Destination;
use crate::error::{Error, Result};
use crate::message::{Message, now_millis};
use crate::selector::Selector;

/// Lock a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

static REGISTRY: LazyLock<Mutex<HashMap<String, Arc<Broker>>>> = LazyLock::new(Default::default);

/// Credentials a broker requires from connecting clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Credentials {
    pub(crate) username: String,
    pub(crate) password: String,
}

/// Look up the broker called `name`, starting it when `create` is set.
pub(crate) fn connect(
    name: &str,
    create: bool,
    credentials: Option<Credentials>,
) -> Result<Arc<Broker>> {
    let mut registry = lock(&REGISTRY);
    if let Some(broker) = registry.get(name) {
        return Ok(Arc::clone(broker));
    }
    if !create {
        return Err(Error::ConnectionFailed(format!(
            "no broker named `{name}` is running"
        )));
    }
    let broker = Arc::new(Broker::new(name, credentials));
    registry.insert(name.to_owned(), Arc::clone(&broker));
    debug!(broker = name, "started in-process broker");
    Ok(broker)
}

/// Forget every registered broker.
///
/// Open connections keep their broker alive; new connections to the same
/// name start a fresh one.
pub fn shutdown() {
    let brokers = std::mem::take(&mut *lock(&REGISTRY));
    for name in brokers.keys() {
        debug!(broker = %name, "stopped in-process broker");
    }
}

// ---------------------------------------------------------------------------
// Message store
// ---------------------------------------------------------------------------

/// A message held by the broker, tagged with its arrival order and the
/// connection that sent it.
#[derive(Debug, Clone)]
pub(crate) struct Envelope {
    pub(crate) seq: u64,
    pub(crate) message: Message,
    pub(crate) origin: String,
}

#[derive(Debug, Default)]
struct StoreEntries {
    queue: VecDeque<Envelope>,
    next_seq: u64,
}

/// FIFO of pending messages with a wakeup for waiting consumers.
#[derive(Debug, Default)]
pub(crate) struct MessageStore {
    entries: Mutex<StoreEntries>,
    notify: Notify,
}

impl MessageStore {
    pub(crate) fn push(&self, message: Message, origin: &str) {
        let mut entries = lock(&self.entries);
        let seq = entries.next_seq;
        entries.next_seq += 1;
        entries.queue.push_back(Envelope {
            seq,
            message,
            origin: origin.to_owned(),
        });
        drop(entries);
        self.notify.notify_waiters();
    }

    /// Put a previously delivered message back at the head.
    pub(crate) fn requeue(&self, envelope: Envelope) {
        lock(&self.entries).queue.push_front(envelope);
        self.notify.notify_waiters();
    }

    /// Remove the first live message accepted by `selector`.
    pub(crate) fn take(&self, selector: Option<&Selector>) -> Option<Envelope> {
        let mut entries = lock(&self.entries);
        purge_expired(&mut entries.queue);
        let index = entries
            .queue
            .iter()
            .position(|e| selector.is_none_or(|s| s.matches(&e.message)))?;
        entries.queue.remove(index)
    }

    /// Copy of the first live message accepted by `selector` whose sequence
    /// number is not in `seen`.
    pub(crate) fn peek_unseen(
        &self,
        selector: Option<&Selector>,
        seen: &HashSet<u64>,
    ) -> Option<Envelope> {
        let mut entries = lock(&self.entries);
        purge_expired(&mut entries.queue);
        entries
            .queue
            .iter()
            .find(|e| !seen.contains(&e.seq) && selector.is_none_or(|s| s.matches(&e.message)))
            .cloned()
    }

    /// Future completing on the next push. Call `enable` before checking the
    /// store so a push in between is not missed.
    pub(crate) fn notified(&self) -> Notified<'_> {
        self.notify.notified()
    }
}

fn purge_expired(queue: &mut VecDeque<Envelope>) {
    let now = now_millis();
    let before = queue.len();
    queue.retain(|e| !e.message.is_expired(now));
    let dropped = before - queue.len();
    if dropped > 0 {
        debug!(dropped, "discarded expired messages");
    }
}

// ---------------------------------------------------------------------------
// Subscriptions
// ---------------------------------------------------------------------------

/// A topic subscription and the store it feeds.
#[derive(Debug)]
pub(crate) struct Subscription {
    pub(crate) store: Arc<MessageStore>,
    selector: Option<Selector>,
    /// Connection whose own publications are suppressed.
    no_local: Option<String>,
}

impl Subscription {
    fn new(store: Arc<MessageStore>, selector: Option<Selector>, no_local: Option<String>) -> Self {
        Self {
            store,
            selector,
            no_local,
        }
    }

    fn accepts(&self, message: &Message, origin: &str) -> bool {
        self.no_local.as_deref() != Some(origin)
            && self.selector.as_ref().is_none_or(|s| s.matches(message))
    }
}

#[derive(Debug)]
struct Durable {
    topic: Destination,
    selector: Option<String>,
    no_local: bool,
    subscription: Arc<Subscription>,
    active: bool,
}

// ---------------------------------------------------------------------------
// Broker
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct BrokerState {
    queues: HashMap<Destination, Arc<MessageStore>>,
    topics: HashMap<Destination, Vec<Arc<Subscription>>>,
    durables: HashMap<(String, String), Durable>,
    /// Live temporary destinations and the connection that owns each.
    temporaries: HashMap<Destination, String>,
    client_ids: HashSet<String>,
}

impl BrokerState {
    fn detach(&mut self, topic: &Destination, subscription: &Arc<Subscription>) {
        if let Some(subs) = self.topics.get_mut(topic) {
            subs.retain(|s| !Arc::ptr_eq(s, subscription));
        }
    }
}

/// A named in-process broker.
#[derive(Debug)]
pub(crate) struct Broker {
    name: String,
    credentials: Option<Credentials>,
    state: Mutex<BrokerState>,
}

impl Broker {
    fn new(name: &str, credentials: Option<Credentials>) -> Self {
        Self {
            name: name.to_owned(),
            credentials,
            state: Mutex::new(BrokerState::default()),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn authenticate(&self, username: &str, password: &str) -> Result<()> {
        match &self.credentials {
            Some(c) if c.username != username || c.password != password => Err(Error::Security(
                format!("user `{username}` is not authorized on broker `{}`", self.name),
            )),
            _ => Ok(()),
        }
    }

    pub(crate) fn register_client_id(&self, client_id: &str) -> Result<()> {
        if client_id.is_empty() {
            return Err(Error::InvalidClientId("client id must not be empty".into()));
        }
        if !lock(&self.state).client_ids.insert(client_id.to_owned()) {
            return Err(Error::InvalidClientId(format!(
                "client id `{client_id}` is already in use"
            )));
        }
        Ok(())
    }

    pub(crate) fn release_client_id(&self, client_id: &str) {
        lock(&self.state).client_ids.remove(client_id);
    }

    pub(crate) fn create_temporary(&self, destination: &Destination, owner: &str) {
        lock(&self.state)
            .temporaries
            .insert(destination.clone(), owner.to_owned());
    }

    /// Drop the temporary destinations owned by a closing connection.
    pub(crate) fn release_connection(&self, connection_id: &str) {
        let mut state = lock(&self.state);
        let owned: Vec<Destination> = state
            .temporaries
            .iter()
            .filter(|(_, owner)| owner.as_str() == connection_id)
            .map(|(d, _)| d.clone())
            .collect();
        for destination in owned {
            state.temporaries.remove(&destination);
            state.queues.remove(&destination);
            state.topics.remove(&destination);
            debug!(destination = %destination, "deleted temporary destination");
        }
    }

    /// Check that `connection_id` may consume from `destination`.
    pub(crate) fn check_consumable(
        &self,
        destination: &Destination,
        connection_id: &str,
    ) -> Result<()> {
        if !destination.is_temporary() {
            return Ok(());
        }
        match lock(&self.state).temporaries.get(destination) {
            None => Err(Error::InvalidDestination(format!(
                "{destination} has been deleted"
            ))),
            Some(owner) if owner != connection_id => Err(Error::InvalidDestination(format!(
                "{destination} belongs to another connection"
            ))),
            Some(_) => Ok(()),
        }
    }

    /// Store of `queue`, created on first use.
    pub(crate) fn queue_store(&self, queue: &Destination) -> Arc<MessageStore> {
        Arc::clone(lock(&self.state).queues.entry(queue.clone()).or_default())
    }

    /// Route a message to a queue or to every matching topic subscription.
    pub(crate) fn publish(
        &self,
        destination: &Destination,
        mut message: Message,
        origin: &str,
    ) -> Result<()> {
        message.freeze();
        message.set_ack(None);
        let mut state = lock(&self.state);
        if destination.is_temporary() && !state.temporaries.contains_key(destination) {
            return Err(Error::InvalidDestination(format!(
                "{destination} has been deleted"
            )));
        }
        if destination.is_queue() {
            let store = Arc::clone(state.queues.entry(destination.clone()).or_default());
            drop(state);
            store.push(message, origin);
            trace!(destination = %destination, "enqueued message");
            return Ok(());
        }
        let targets: Vec<Arc<MessageStore>> = state
            .topics
            .get(destination)
            .into_iter()
            .flatten()
            .filter(|s| s.accepts(&message, origin))
            .map(|s| Arc::clone(&s.store))
            .collect();
        drop(state);
        trace!(destination = %destination, subscribers = targets.len(), "published message");
        for store in targets {
            store.push(message.clone(), origin);
        }
        Ok(())
    }

    pub(crate) fn subscribe(
        &self,
        topic: &Destination,
        selector: Option<Selector>,
        no_local: Option<String>,
    ) -> Arc<Subscription> {
        let subscription = Arc::new(Subscription::new(
            Arc::new(MessageStore::default()),
            selector,
            no_local,
        ));
        lock(&self.state)
            .topics
            .entry(topic.clone())
            .or_default()
            .push(Arc::clone(&subscription));
        subscription
    }

    pub(crate) fn unsubscribe(&self, topic: &Destination, subscription: &Arc<Subscription>) {
        lock(&self.state).detach(topic, subscription);
    }

    /// Attach a consumer to the durable subscription `(client_id, name)`.
    ///
    /// An existing subscription with a different topic or selector is
    /// replaced and its pending messages are discarded.
    pub(crate) fn subscribe_durable(
        &self,
        client_id: &str,
        name: &str,
        topic: &Destination,
        selector: Option<Selector>,
        no_local: Option<String>,
    ) -> Result<Arc<Subscription>> {
        let mut state = lock(&self.state);
        let key = (client_id.to_owned(), name.to_owned());
        let source = selector.as_ref().map(|s| s.source().to_owned());

        let store = match state.durables.remove(&key) {
            Some(existing) if existing.active => {
                state.durables.insert(key, existing);
                return Err(Error::IllegalState(format!(
                    "durable subscription `{name}` already has an active consumer"
                )));
            }
            Some(existing) => {
                state.detach(&existing.topic, &existing.subscription);
                if existing.topic == *topic && existing.selector == source {
                    Arc::clone(&existing.subscription.store)
                } else {
                    debug!(subscription = name, "replacing durable subscription");
                    Arc::new(MessageStore::default())
                }
            }
            None => Arc::new(MessageStore::default()),
        };

        let subscription = Arc::new(Subscription::new(store, selector, no_local.clone()));
        state
            .topics
            .entry(topic.clone())
            .or_default()
            .push(Arc::clone(&subscription));
        state.durables.insert(
            key,
            Durable {
                topic: topic.clone(),
                selector: source,
                no_local: no_local.is_some(),
                subscription: Arc::clone(&subscription),
                active: true,
            },
        );
        Ok(subscription)
    }

    /// Mark a durable subscription as having no consumer. It keeps
    /// collecting messages.
    pub(crate) fn deactivate_durable(&self, client_id: &str, name: &str) {
        let mut state = lock(&self.state);
        let key = (client_id.to_owned(), name.to_owned());
        let Some(durable) = state.durables.get_mut(&key) else {
            return;
        };
        durable.active = false;
        if durable.no_local {
            // With no consumer attached nothing counts as local.
            let replacement = Arc::new(Subscription::new(
                Arc::clone(&durable.subscription.store),
                durable.subscription.selector.clone(),
                None,
            ));
            let previous = std::mem::replace(&mut durable.subscription, Arc::clone(&replacement));
            let topic = durable.topic.clone();
            state.detach(&topic, &previous);
            state.topics.entry(topic).or_default().push(replacement);
        }
    }

    pub(crate) fn unsubscribe_durable(&self, client_id: &str, name: &str) -> Result<()> {
        let mut state = lock(&self.state);
        let key = (client_id.to_owned(), name.to_owned());
        match state.durables.get(&key) {
            None => Err(Error::InvalidDestination(format!(
                "no durable subscription named `{name}`"
            ))),
            Some(durable) if durable.active => Err(Error::IllegalState(format!(
                "durable subscription `{name}` has an active consumer"
            ))),
            Some(_) => {
                if let Some(durable) = state.durables.remove(&key) {
                    state.detach(&durable.topic, &durable.subscription);
                }
                debug!(subscription = name, "removed durable subscription");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
#[path = "broker_tests.rs"]
mod tests;
