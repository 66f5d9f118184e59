//! Package implement the protocol core of an MQTT version-3 client.
//!
//! The core is made of three coupled pieces,
//!
//! * A byte-stream framer and codec, for MQTT fixed-header, variable-header and
//!   payload, refer to [v3] module and [FrameReader].
//! * A message-identifier keyed transaction tracker that drives QoS-1 and QoS-2
//!   acknowledgement handshakes, refer to [Tracker].
//! * A topic matcher implementing `+` and `#` wildcards, refer to [TopicFilter].
//!
//! Socket ownership, reconnect loops and keep-alive timers are left to the
//! application. Application hands over a [Transport] to [Connection] and feeds
//! received frames into [Connection::on_frame].
//!
//! Message identifiers are dispensed per topic, refer [IdDispenser], while
//! in-flight publishes are tracked by identifier alone. Concurrent QoS-1/QoS-2
//! publishes on different topics may collide on an identifier, in which case
//! the later publish replaces the earlier one in [Tracker]. Applications that
//! need many topics in flight should wait for acknowledgements per identifier.

#[macro_use]
mod error;
#[macro_use]
pub mod v3;

mod client;
mod config;
mod connection;
mod dispenser;
mod framer;
mod keep_alive;
mod payload;
mod subscription;
mod topic;
mod tracker;
mod types;
pub mod util;

#[cfg(test)]
mod testing;

pub use client::{Client, ClientBuilder};
pub use config::{Config, ConfigWill};
pub use connection::{Connection, ConnectionState, Handler, HandlerID, Transport};
pub use dispenser::IdDispenser;
pub use error::{Error, ErrorDetail, ErrorKind};
pub use framer::FrameReader;
pub use keep_alive::KeepAlive;
pub use payload::{AsciiConverter, ByteConverter, RawConverter, Utf8Converter};
pub use payload::{I16Converter, I32Converter, I64Converter};
pub use payload::{Message, PayloadConverter};
pub use subscription::{Subscription, SubscriptionRegistry, SubscriptionStatus};
pub use topic::{TopicFilter, TopicName};
pub use tracker::{MessageCallback, Tracker};
pub use types::{Blob, VarU32};
pub use v3::{Packet, PacketType, QoS};

/// Result returned by this methods and functions defined in this package.
pub type Result<T> = std::result::Result<T, Error>;

/// Type alias for message identifier, a.k.a PacketID.
pub type PacketID = u16;

/// Protocol name sent in CONNECT, for MQTT version 3.
pub const PROTOCOL_NAME: &str = "MQIsdp";
/// Protocol version sent in CONNECT.
pub const PROTOCOL_VERSION: u8 = 3;
/// Maximum value that can be encoded as remaining-length, in 4 bytes.
pub const MAX_REMAINING_LEN: u32 = 268_435_455;
/// Maximum length of client identifier allowed by MQTT version 3.
pub const MAX_CLIENT_ID_LEN: usize = 23;
/// Maximum length of a topic string.
pub const MAX_TOPIC_LEN: usize = 65_535;
/// Default port for MQTT.
pub const MQTT_PORT: u16 = 1883;

/// Trait for protocol framing, data-encoding and decoding. Shall return one of the
/// following error-kind: `InvalidHeader`, `InvalidPayloadSize`, `MalformedPacket`,
/// `ClientIdentifierTooLong`.
pub trait Packetize: Sized {
    /// Deserialize bytes and construct a packet or packet's field. Return the value
    /// and the number of bytes consumed from the `stream`.
    fn decode<T: AsRef<[u8]>>(stream: T) -> Result<(Self, usize)>;

    /// Serialize value into bytes.
    fn encode(&self) -> Result<Blob>;
}
