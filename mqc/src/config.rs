//! Broker URI parsing.
//!
//! Connection factories are configured by a single URI of the form
//! `vm://<broker>?option=value&...`. Recognised options:
//!
//! | Option            | Meaning                                             |
//! |-------------------|-----------------------------------------------------|
//! | `create`          | Start the named broker on first use (default true). |
//! | `broker.username` | User the broker requires when it is created.        |
//! | `broker.password` | Password the broker requires when it is created.    |
//! | `jms.clientID`    | Client id given to every connection of the factory. |
//!
//! Unknown options are logged and ignored.

use url::Url;

use crate::broker::Credentials;
use crate::error::{Error, Result};

/// Parsed connection factory URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerUri {
    uri: String,
    broker: String,
    create: bool,
    username: Option<String>,
    password: Option<String>,
    client_id: Option<String>,
}

impl BrokerUri {
    /// Parse a `vm://` URI.
    ///
    /// # Errors
    ///
    /// [`Error::Uri`] for malformed URIs, [`Error::Other`] for another scheme,
    /// a missing broker name or an option value that does not parse.
    pub fn parse(uri: &str) -> Result<Self> {
        let url = Url::parse(uri)?;
        if url.scheme() != "vm" {
            return Err(Error::Other(format!(
                "unsupported transport scheme `{}`",
                url.scheme()
            )));
        }
        let broker = url.host_str().unwrap_or_default();
        if broker.is_empty() {
            return Err(Error::Other(format!("`{uri}` does not name a broker")));
        }

        let mut parsed = Self {
            uri: uri.to_owned(),
            broker: broker.to_owned(),
            create: true,
            username: None,
            password: None,
            client_id: None,
        };
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "create" => parsed.create = parse_bool(&key, &value)?,
                "broker.username" => parsed.username = Some(value.into_owned()),
                "broker.password" => parsed.password = Some(value.into_owned()),
                "jms.clientID" => parsed.client_id = Some(value.into_owned()),
                other => tracing::warn!(option = other, "ignoring unknown uri option"),
            }
        }
        Ok(parsed)
    }

    /// The URI as given.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.uri
    }

    /// Name of the in-process broker.
    #[must_use]
    pub fn broker(&self) -> &str {
        &self.broker
    }

    /// Whether a missing broker is started on connect.
    #[must_use]
    pub const fn create(&self) -> bool {
        self.create
    }

    /// Client id configured through `jms.clientID`.
    #[must_use]
    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    pub(crate) fn credentials(&self) -> Option<Credentials> {
        if self.username.is_none() && self.password.is_none() {
            return None;
        }
        Some(Credentials {
            username: self.username.clone().unwrap_or_default(),
            password: self.password.clone().unwrap_or_default(),
        })
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    if value.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if value.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(Error::Other(format!(
            "option `{key}` expects true or false, got `{value}`"
        )))
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
