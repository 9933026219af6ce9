#![doc = include_str!("../README.md")]

pub mod broker;
pub mod browser;
pub mod config;
pub mod connection;
pub mod consumer;
pub mod destination;
pub mod error;
pub mod message;
pub mod producer;
pub mod selector;
pub mod session;
pub mod types;
pub mod value;

// Re-export core public API at crate root.
pub use browser::QueueBrowser;
pub use config::BrokerUri;
pub use connection::{Connection, ConnectionFactory, ConnectionState};
pub use consumer::Consumer;
pub use destination::Destination;
pub use error::{Error, Result};
pub use message::{Body, BytesBody, DEFAULT_PRIORITY, Message, StreamBody};
pub use producer::Producer;
pub use selector::Selector;
pub use session::Session;
pub use types::{AckMode, DeliveryMode, DestinationKind, MessageKind};
pub use value::{Value, ValueMap};
