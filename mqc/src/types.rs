//! Runtime enumerations shared with the C boundary.

macro_rules! ffi_enum {
    ($(#[$meta:meta])* $vis:vis enum $name:ident {
        $($(#[$vm:meta])* $variant:ident = $val:expr),* $(,)?
    }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(i32)]
        $vis enum $name { $($(#[$vm])* $variant = $val),* }

        impl $name {
            /// Convert from FFI `i32`. Returns `None` for unknown values.
            #[must_use]
            pub fn from_ffi(v: i32) -> Option<Self> {
                match v { $($val => Some(Self::$variant),)* _ => None }
            }

            /// Convert to the FFI `i32` representation.
            #[must_use]
            pub fn to_ffi(self) -> i32 {
                self as i32
            }
        }
    };
}

ffi_enum! {
    /// Acknowledgement discipline of a session.
    #[derive(Default)]
    pub enum AckMode {
        /// Messages are acknowledged as soon as they are received.
        #[default]
        Auto = 0,
        /// Lazy acknowledgement; duplicates are tolerated.
        DupsOk = 1,
        /// Acknowledging one message acknowledges every message the session delivered.
        Client = 2,
        /// Sends and receives are grouped into transactions.
        Transacted = 3,
        /// Each message is acknowledged on its own.
        Individual = 4,
    }
}

ffi_enum! {
    /// Whether a message outlives a broker restart.
    #[derive(Default)]
    pub enum DeliveryMode {
        /// Durable delivery.
        #[default]
        Persistent = 0,
        /// Best-effort delivery.
        NonPersistent = 1,
    }
}

ffi_enum! {
    /// Kind of a destination.
    pub enum DestinationKind {
        /// Publish/subscribe destination.
        Topic = 0,
        /// Point-to-point destination.
        Queue = 1,
        /// Topic that lives as long as its connection.
        TemporaryTopic = 2,
        /// Queue that lives as long as its connection.
        TemporaryQueue = 3,
    }
}

impl DestinationKind {
    /// Whether this is one of the connection-scoped kinds.
    #[must_use]
    pub const fn is_temporary(self) -> bool {
        matches!(self, Self::TemporaryTopic | Self::TemporaryQueue)
    }

    /// Whether messages fan out to every subscriber.
    #[must_use]
    pub const fn is_topic(self) -> bool {
        matches!(self, Self::Topic | Self::TemporaryTopic)
    }
}

ffi_enum! {
    /// Body kind of a message.
    pub enum MessageKind {
        /// Headers and properties only.
        Message = 0,
        /// A single string.
        Text = 1,
        /// An opaque byte stream with typed primitives.
        Bytes = 2,
        /// Named typed values.
        Map = 3,
        /// A sequence of typed values.
        Stream = 4,
    }
}
