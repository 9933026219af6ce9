//! Connection factories and connections.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::watch;
use tracing::debug;

use crate::broker::{self, Broker, lock};
use crate::config::BrokerUri;
use crate::destination::Destination;
use crate::error::{Error, Result};
use crate::session::{Session, SessionCore};
use crate::types::{AckMode, DestinationKind};

// ---------------------------------------------------------------------------
// ConnectionFactory
// ---------------------------------------------------------------------------

/// Creates connections to the broker named by a URI.
#[derive(Debug, Clone)]
pub struct ConnectionFactory {
    uri: BrokerUri,
    username: String,
    password: String,
}

impl ConnectionFactory {
    /// Factory for `uri` with empty credentials.
    ///
    /// # Errors
    ///
    /// See [`BrokerUri::parse`].
    pub fn new(uri: &str) -> Result<Self> {
        Self::with_credentials(uri, "", "")
    }

    /// Factory for `uri` whose connections authenticate as `username`.
    ///
    /// # Errors
    ///
    /// See [`BrokerUri::parse`].
    pub fn with_credentials(uri: &str, username: &str, password: &str) -> Result<Self> {
        Ok(Self {
            uri: BrokerUri::parse(uri)?,
            username: username.to_owned(),
            password: password.to_owned(),
        })
    }

    /// The parsed broker URI.
    #[must_use]
    pub const fn uri(&self) -> &BrokerUri {
        &self.uri
    }

    /// Connect with the factory's credentials and client id.
    ///
    /// # Errors
    ///
    /// See [`create_connection_with`](Self::create_connection_with).
    pub fn create_connection(&self) -> Result<Connection> {
        self.create_connection_with(&self.username, &self.password, None)
    }

    /// Connect with explicit credentials.
    ///
    /// A `client_id` given here, or through the `jms.clientID` URI option,
    /// is fixed for the life of the connection. Without one the connection
    /// gets a generated id that may be replaced until the connection is
    /// used.
    ///
    /// # Errors
    ///
    /// [`Error::ConnectionFailed`] when the broker does not exist and the
    /// URI disables `create`, [`Error::Security`] when the credentials are
    /// rejected, [`Error::InvalidClientId`] when the client id is in use.
    pub fn create_connection_with(
        &self,
        username: &str,
        password: &str,
        client_id: Option<&str>,
    ) -> Result<Connection> {
        let broker = broker::connect(self.uri.broker(), self.uri.create(), self.uri.credentials())?;
        broker.authenticate(username, password)?;

        let id = generate_id()?;
        let client_id = match client_id.or(self.uri.client_id()) {
            Some(explicit) => ClientId {
                value: explicit.to_owned(),
                explicit: true,
                frozen: false,
            },
            None => ClientId {
                value: id.clone(),
                explicit: false,
                frozen: false,
            },
        };
        broker.register_client_id(&client_id.value)?;

        debug!(connection = %id, broker = broker.name(), "opened connection");
        Ok(Connection {
            core: Arc::new(ConnectionCore {
                id,
                broker,
                state: watch::Sender::new(ConnectionState::Stopped),
                client_id: Mutex::new(client_id),
                next_session: AtomicU64::new(1),
                next_temporary: AtomicU64::new(1),
                sessions: Mutex::new(Vec::new()),
            }),
        })
    }
}

fn generate_id() -> Result<String> {
    let mut bytes = [0u8; 12];
    getrandom::fill(&mut bytes)
        .map_err(|e| Error::Other(format!("failed to generate connection id: {e}")))?;
    Ok(format!("ID:{}", hex::encode(bytes)))
}

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

/// Delivery state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Consumers are not delivered to. New connections start here.
    Stopped,
    /// Consumers receive messages.
    Started,
    /// Terminal.
    Closed,
}

#[derive(Debug)]
struct ClientId {
    value: String,
    /// Supplied when the connection was created; never replaceable.
    explicit: bool,
    /// Set once the connection has been started or used.
    frozen: bool,
}

pub(crate) struct ConnectionCore {
    id: String,
    pub(crate) broker: Arc<Broker>,
    state: watch::Sender<ConnectionState>,
    client_id: Mutex<ClientId>,
    next_session: AtomicU64,
    next_temporary: AtomicU64,
    sessions: Mutex<Vec<Weak<SessionCore>>>,
}

impl ConnectionCore {
    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub(crate) fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.state() == ConnectionState::Closed {
            return Err(Error::closed("connection"));
        }
        Ok(())
    }

    pub(crate) fn client_id(&self) -> String {
        lock(&self.client_id).value.clone()
    }

    pub(crate) fn create_temporary(&self, kind: DestinationKind) -> Result<Destination> {
        self.ensure_open()?;
        let n = self.next_temporary.fetch_add(1, Ordering::Relaxed);
        let destination = Destination::new(kind, format!("{}:{n}", self.id));
        self.broker.create_temporary(&destination, &self.id);
        debug!(destination = %destination, "created temporary destination");
        Ok(destination)
    }

    fn freeze_client_id(&self) {
        lock(&self.client_id).frozen = true;
    }

    fn close(&self) {
        let was_open = self.state.send_if_modified(|state| {
            let open = *state != ConnectionState::Closed;
            *state = ConnectionState::Closed;
            open
        });
        if !was_open {
            return;
        }

        let sessions = std::mem::take(&mut *lock(&self.sessions));
        for session in sessions.iter().filter_map(Weak::upgrade) {
            session.close();
        }
        self.broker.release_connection(&self.id);
        self.broker.release_client_id(&lock(&self.client_id).value);
        debug!(connection = %self.id, "closed connection");
    }
}

/// A connection to an in-process broker.
///
/// Closing (or dropping) the connection closes its sessions, releases its
/// client id and deletes its temporary destinations.
pub struct Connection {
    core: Arc<ConnectionCore>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.core.id)
            .field("state", &self.core.state())
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Broker-assigned connection id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.core.id
    }

    /// Current delivery state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.core.state()
    }

    /// The client id.
    ///
    /// # Errors
    ///
    /// [`Error::IllegalState`] after close.
    pub fn client_id(&self) -> Result<String> {
        self.core.ensure_open()?;
        Ok(self.core.client_id())
    }

    /// Replace the generated client id.
    ///
    /// # Errors
    ///
    /// [`Error::IllegalState`] after close, after the connection was started
    /// or used to create a session, or when the id was fixed at creation;
    /// [`Error::InvalidClientId`] for an empty id or one in use.
    pub fn set_client_id(&self, client_id: &str) -> Result<()> {
        self.core.ensure_open()?;
        let mut current = lock(&self.core.client_id);
        if current.explicit || current.frozen {
            return Err(Error::IllegalState(
                "client id can only be set before the connection is used".into(),
            ));
        }
        self.core.broker.register_client_id(client_id)?;
        let previous = std::mem::replace(&mut current.value, client_id.to_owned());
        current.explicit = true;
        drop(current);
        self.core.broker.release_client_id(&previous);
        debug!(connection = %self.core.id, client_id, "set client id");
        Ok(())
    }

    /// Begin delivering messages to consumers.
    ///
    /// # Errors
    ///
    /// [`Error::IllegalState`] after close.
    pub fn start(&self) -> Result<()> {
        self.core.ensure_open()?;
        self.core.freeze_client_id();
        self.core.state.send_if_modified(|state| {
            let changed = *state == ConnectionState::Stopped;
            if changed {
                *state = ConnectionState::Started;
            }
            changed
        });
        debug!(connection = %self.core.id, "started connection");
        Ok(())
    }

    /// Suspend delivery. Blocked receives keep waiting.
    ///
    /// # Errors
    ///
    /// [`Error::IllegalState`] after close.
    pub fn stop(&self) -> Result<()> {
        self.core.ensure_open()?;
        self.core.state.send_if_modified(|state| {
            let changed = *state == ConnectionState::Started;
            if changed {
                *state = ConnectionState::Stopped;
            }
            changed
        });
        debug!(connection = %self.core.id, "stopped connection");
        Ok(())
    }

    /// Close the connection. Closing twice is a no-op.
    pub fn close(&self) {
        self.core.close();
    }

    /// Open a session.
    ///
    /// # Errors
    ///
    /// [`Error::IllegalState`] after close.
    pub fn create_session(&self, ack_mode: AckMode) -> Result<Session> {
        self.core.ensure_open()?;
        self.core.freeze_client_id();
        let id = self.core.next_session.fetch_add(1, Ordering::Relaxed);
        let session = Session::open(Arc::clone(&self.core), id, ack_mode);
        let mut sessions = lock(&self.core.sessions);
        sessions.retain(|s| s.strong_count() > 0);
        sessions.push(session.downgrade());
        Ok(session)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.core.close();
    }
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
