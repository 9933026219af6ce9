//! Queue and topic addresses.

use std::fmt;

use crate::types::DestinationKind;

/// A named queue or topic, compared by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Destination {
    kind: DestinationKind,
    name: String,
}

impl Destination {
    /// A point-to-point queue.
    pub fn queue(name: impl Into<String>) -> Self {
        Self {
            kind: DestinationKind::Queue,
            name: name.into(),
        }
    }

    /// A publish/subscribe topic.
    pub fn topic(name: impl Into<String>) -> Self {
        Self {
            kind: DestinationKind::Topic,
            name: name.into(),
        }
    }

    pub(crate) fn new(kind: DestinationKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    /// The destination kind.
    #[must_use]
    pub const fn kind(&self) -> DestinationKind {
        self.kind
    }

    /// The destination name. Temporary destinations carry a generated name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Topic or temporary topic.
    #[must_use]
    pub const fn is_topic(&self) -> bool {
        self.kind.is_topic()
    }

    /// Queue or temporary queue.
    #[must_use]
    pub const fn is_queue(&self) -> bool {
        !self.kind.is_topic()
    }

    /// Temporary queue or temporary topic.
    #[must_use]
    pub const fn is_temporary(&self) -> bool {
        self.kind.is_temporary()
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheme = match self.kind {
            DestinationKind::Topic => "topic",
            DestinationKind::Queue => "queue",
            DestinationKind::TemporaryTopic => "temp-topic",
            DestinationKind::TemporaryQueue => "temp-queue",
        };
        write!(f, "{scheme}://{}", self.name)
    }
}
