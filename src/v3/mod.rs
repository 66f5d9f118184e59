//! Module implement MQTT Version-3 packet serialization.
//!
//! Every packet is framed as,
//!
//! ```ignore
//!          7                          3                          0
//!          +--------------------------+--------------------------+
//! byte 1   | MQTT Control Packet Type | DUP | QoS(2 bits) | RETAIN|
//!          +--------------------------+--------------------------+
//!          |         Remaining Bytes Len  (1/2/3/4 bytes)        |
//!          +-----------------------------------------------------+
//!          |         Variable header, type specific              |
//!          +-----------------------------------------------------+
//!          |         Payload, type specific                      |
//!          +-----------------------------------------------------+
//! ```

#[cfg(any(feature = "fuzzy", test))]
use arbitrary::{Arbitrary, Error as ArbitraryError, Unstructured};

use std::fmt;
#[cfg(any(feature = "fuzzy", test))]
use std::result;

use crate::{Blob, Packetize, VarU32};
use crate::{Error, ErrorKind, PacketID, Result};

/// MQTT packetization, decode a single field.
macro_rules! dec_field {
    ($type:ty, $stream:expr, $n:expr; $($pred:tt)*) => {{
        if $($pred)* {
            let (val, m) = <$type>::decode(crate::util::advance($stream, $n)?)?;
            (Some(val), $n + m)
        } else {
            (None, $n)
        }
    }};
    ($type:ty, $stream:expr, $n:expr) => {{
        let (val, m) = <$type>::decode(crate::util::advance($stream, $n)?)?;
        (val, $n + m)
    }};
}
pub(crate) use dec_field;

/// MQTT packetization, to create the 1 byte fixed-header.
macro_rules! fixed_byte {
    ($pkt_type:expr, $retain:expr, $qos:expr, $dup:expr) => {{
        let retain: u8 = if $retain { 0b0001 } else { 0b0000 };
        let qos: u8 = u8::from($qos) << 1;
        let dup: u8 = if $dup { 0b1000 } else { 0b0000 };
        let pkt_type: u8 = u8::from($pkt_type) << 4;

        pkt_type | dup | qos | retain
    }};
}
pub(crate) use fixed_byte;

mod connack;
mod connect;
mod ping;
mod pubaclc;
mod publish;
mod sub;
mod suback;
mod unsub;
mod unsuback;

pub use connack::{ConnAck, ConnackReturnCode};
pub use connect::{Connect, ConnectFlags, ConnectPayload};
pub use ping::{Disconnect, PingReq, PingResp};
pub use pubaclc::Pub;
pub use publish::Publish;
pub use sub::{SubscribeFilter, Subscribe};
pub use suback::SubAck;
pub use unsub::UnSubscribe;
pub use unsuback::UnsubAck;

/// MQTT packet type, type-codes 0 and 15 are reserved in version 3.
#[cfg_attr(any(feature = "fuzzy", test), derive(Arbitrary))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PacketType {
    Connect = 1,
    ConnAck = 2,
    Publish = 3,
    PubAck = 4,
    PubRec = 5,
    PubRel = 6,
    PubComp = 7,
    Subscribe = 8,
    SubAck = 9,
    UnSubscribe = 10,
    UnsubAck = 11,
    PingReq = 12,
    PingResp = 13,
    Disconnect = 14,
}

impl TryFrom<u8> for PacketType {
    type Error = Error;

    fn try_from(val: u8) -> Result<PacketType> {
        let val = match val {
            1 => PacketType::Connect,
            2 => PacketType::ConnAck,
            3 => PacketType::Publish,
            4 => PacketType::PubAck,
            5 => PacketType::PubRec,
            6 => PacketType::PubRel,
            7 => PacketType::PubComp,
            8 => PacketType::Subscribe,
            9 => PacketType::SubAck,
            10 => PacketType::UnSubscribe,
            11 => PacketType::UnsubAck,
            12 => PacketType::PingReq,
            13 => PacketType::PingResp,
            14 => PacketType::Disconnect,
            val => err!(InvalidHeader, desc: "unsupported message type {}", val)?,
        };

        Ok(val)
    }
}

impl From<PacketType> for u8 {
    fn from(val: PacketType) -> u8 {
        val as u8
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            PacketType::Connect => "CONNECT",
            PacketType::ConnAck => "CONNACK",
            PacketType::Publish => "PUBLISH",
            PacketType::PubAck => "PUBACK",
            PacketType::PubRec => "PUBREC",
            PacketType::PubRel => "PUBREL",
            PacketType::PubComp => "PUBCOMP",
            PacketType::Subscribe => "SUBSCRIBE",
            PacketType::SubAck => "SUBACK",
            PacketType::UnSubscribe => "UNSUBSCRIBE",
            PacketType::UnsubAck => "UNSUBACK",
            PacketType::PingReq => "PINGREQ",
            PacketType::PingResp => "PINGRESP",
            PacketType::Disconnect => "DISCONNECT",
        };
        write!(f, "{}", name)
    }
}

/// Quality of service. `Reserved` is the unused 2-bit value 3, kept so that a
/// fixed-header can round trip bit for bit, it is never valid for a message.
#[cfg_attr(any(feature = "fuzzy", test), derive(Arbitrary))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QoS {
    AtMostOnce = 0,
    AtLeastOnce = 1,
    ExactlyOnce = 2,
    Reserved = 3,
}

impl Default for QoS {
    fn default() -> QoS {
        QoS::AtMostOnce
    }
}

impl TryFrom<u8> for QoS {
    type Error = Error;

    fn try_from(val: u8) -> Result<QoS> {
        let val = match val {
            0 => QoS::AtMostOnce,
            1 => QoS::AtLeastOnce,
            2 => QoS::ExactlyOnce,
            3 => QoS::Reserved,
            val => err!(MalformedPacket, desc: "invalid QoS {}", val)?,
        };

        Ok(val)
    }
}

impl From<QoS> for u8 {
    fn from(val: QoS) -> u8 {
        val as u8
    }
}

impl QoS {
    /// Whether this QoS is one of the three usable delivery levels.
    pub fn is_valid(&self) -> bool {
        !matches!(self, QoS::Reserved)
    }

    fn validate(&self, what: &str) -> Result<()> {
        match self {
            QoS::Reserved => err!(MalformedPacket, desc: "{} reserved QoS", what),
            _ => Ok(()),
        }
    }
}

/// Fixed header, the first 2 to 5 bytes of every packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedHeader {
    pub packet_type: PacketType,
    pub duplicate: bool,
    pub qos: QoS,
    pub retain: bool,
    /// Length of variable header + payload, doesn't include fixed header.
    pub remaining_len: VarU32,
}

#[cfg(any(feature = "fuzzy", test))]
impl<'a> Arbitrary<'a> for FixedHeader {
    fn arbitrary(uns: &mut Unstructured<'a>) -> result::Result<Self, ArbitraryError> {
        let pkt_type: PacketType = uns.arbitrary()?;
        let rem_len: VarU32 = uns.arbitrary()?;

        let fh = match pkt_type {
            PacketType::Publish => {
                let qos = *uns.choose(&[
                    QoS::AtMostOnce,
                    QoS::AtLeastOnce,
                    QoS::ExactlyOnce,
                ])?;
                FixedHeader::new_publish(uns.arbitrary()?, qos, uns.arbitrary()?, rem_len)
            }
            PacketType::PubRel => FixedHeader::new_pubrel(rem_len),
            PacketType::Subscribe => FixedHeader::new_subscribe(rem_len),
            PacketType::UnSubscribe => FixedHeader::new_unsubscribe(rem_len),
            pkt_type => FixedHeader::new(pkt_type, rem_len),
        };

        fh.map_err(|_| ArbitraryError::IncorrectFormat)
    }
}

impl Packetize for FixedHeader {
    fn decode<T: AsRef<[u8]>>(stream: T) -> Result<(FixedHeader, usize)> {
        let stream: &[u8] = stream.as_ref();

        if stream.len() < 2 {
            err!(InvalidHeader, desc: "FixedHeader insufficient bytes {}", stream.len())?;
        }

        let byte1 = stream[0];
        let packet_type = PacketType::try_from((byte1 & Self::HDR_PKT_TYPE) >> 4)?;
        let qos = QoS::try_from((byte1 & Self::HDR_QOS) >> 1)?;
        let duplicate = (byte1 & Self::HDR_DUP) > 0;
        let retain = (byte1 & Self::HDR_RETAIN) > 0;

        let (remaining_len, n) = dec_field!(VarU32, stream, 1);

        let fh = FixedHeader { packet_type, duplicate, qos, retain, remaining_len };
        Ok((fh, n))
    }

    fn encode(&self) -> Result<Blob> {
        let remaining_len = self.remaining_len.encode()?;
        let n = remaining_len.as_ref().len();

        let mut data = [0_u8; 32];
        data[0] = self.to_byte1();
        data[1..1 + n].copy_from_slice(remaining_len.as_ref());

        Ok(Blob::Small { data, size: 1 + n })
    }
}

impl FixedHeader {
    pub const HDR_RETAIN: u8 = 0b_0000_0001;
    pub const HDR_QOS: u8 = 0b_0000_0110;
    pub const HDR_DUP: u8 = 0b_0000_1000;
    pub const HDR_PKT_TYPE: u8 = 0b_1111_0000;

    /// Construct fixed-header for CONNECT, CONNACK, PUBACK, PUBREC, PUBCOMP, SUBACK,
    /// UNSUBACK, PINGREQ, PINGRESP, DISCONNECT.
    pub fn new(packet_type: PacketType, remaining_len: VarU32) -> Result<FixedHeader> {
        if remaining_len > VarU32::MAX {
            err!(InvalidPayloadSize, desc: "FixedHeader remain-len {}", *remaining_len)?
        }

        let val = FixedHeader {
            packet_type,
            duplicate: false,
            qos: QoS::AtMostOnce,
            retain: false,
            remaining_len,
        };
        Ok(val)
    }

    /// Construct fixed-header for PUBLISH.
    pub fn new_publish(
        retain: bool,
        qos: QoS,
        duplicate: bool,
        remaining_len: VarU32,
    ) -> Result<FixedHeader> {
        let mut fh = FixedHeader::new(PacketType::Publish, remaining_len)?;
        fh.retain = retain;
        fh.qos = qos;
        fh.duplicate = duplicate;
        Ok(fh)
    }

    /// Construct fixed-header for PUBREL.
    pub fn new_pubrel(remaining_len: VarU32) -> Result<FixedHeader> {
        let mut fh = FixedHeader::new(PacketType::PubRel, remaining_len)?;
        fh.qos = QoS::AtLeastOnce;
        Ok(fh)
    }

    /// Construct fixed-header for SUBSCRIBE.
    pub fn new_subscribe(remaining_len: VarU32) -> Result<FixedHeader> {
        let mut fh = FixedHeader::new(PacketType::Subscribe, remaining_len)?;
        fh.qos = QoS::AtLeastOnce;
        Ok(fh)
    }

    /// Construct fixed-header for UNSUBSCRIBE.
    pub fn new_unsubscribe(remaining_len: VarU32) -> Result<FixedHeader> {
        let mut fh = FixedHeader::new(PacketType::UnSubscribe, remaining_len)?;
        fh.qos = QoS::AtLeastOnce;
        Ok(fh)
    }

    pub fn to_byte1(&self) -> u8 {
        fixed_byte!(self.packet_type, self.retain, self.qos, self.duplicate)
    }

    /// Length of fixed header, byte-1 plus 1 to 4 bytes of remaining length.
    pub fn len(&self) -> Result<usize> {
        Ok(1 + self.remaining_len.encoded_len()?)
    }

    /// Total frame length, fixed header plus remaining length.
    pub fn frame_len(&self) -> Result<usize> {
        Ok(self.len()? + usize::try_from(*self.remaining_len)?)
    }

    /// Check header flags against the packet type. PUBREL, SUBSCRIBE and
    /// UNSUBSCRIBE carry QoS-1, PUBLISH can carry any usable QoS, rest of the
    /// packets carry zero flags. DUP is tolerated on packets that can be re-sent.
    pub fn validate(&self) -> Result<()> {
        use PacketType::*;
        use QoS::{AtLeastOnce, AtMostOnce};

        match self.packet_type {
            Publish => self.qos.validate("FixedHeader"),
            PubRel | Subscribe | UnSubscribe if self.qos == AtLeastOnce && !self.retain => {
                Ok(())
            }
            PubRel | Subscribe | UnSubscribe => {
                err!(MalformedPacket, desc: "FixedHeader invalid flags {:?}", self)
            }
            _ if self.qos == AtMostOnce && !self.retain && !self.duplicate => Ok(()),
            _ => err!(MalformedPacket, desc: "FixedHeader invalid flags {:?}", self),
        }
    }

    /// Validate the header, for `pkt_type`, and make sure that the full frame is
    /// available in `stream`. Return the frame-length.
    pub(crate) fn check(&self, pkt_type: PacketType, stream: &[u8]) -> Result<usize> {
        if self.packet_type != pkt_type {
            err!(MalformedPacket, desc: "expected {} found {}", pkt_type, self.packet_type)?;
        }
        self.validate()?;
        crate::util::frame_len(self.len()?, *self.remaining_len, stream)
    }
}

/// Enumeration of all MQTT version-3 packets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    Connect(Connect),
    ConnAck(ConnAck),
    Publish(Publish),
    PubAck(Pub),
    PubRec(Pub),
    PubRel(Pub),
    PubComp(Pub),
    Subscribe(Subscribe),
    SubAck(SubAck),
    UnSubscribe(UnSubscribe),
    UnsubAck(UnsubAck),
    PingReq,
    PingResp,
    Disconnect,
}

#[cfg(any(feature = "fuzzy", test))]
impl<'a> Arbitrary<'a> for Packet {
    fn arbitrary(uns: &mut Unstructured<'a>) -> result::Result<Self, ArbitraryError> {
        let pkt_type: PacketType = uns.arbitrary()?;
        let pkt = match pkt_type {
            PacketType::Connect => Packet::Connect(uns.arbitrary()?),
            PacketType::ConnAck => Packet::ConnAck(uns.arbitrary()?),
            PacketType::Publish => Packet::Publish(uns.arbitrary()?),
            PacketType::PubAck => Packet::PubAck(Pub::new_puback(uns.arbitrary()?)),
            PacketType::PubRec => Packet::PubRec(Pub::new_pubrec(uns.arbitrary()?)),
            PacketType::PubRel => Packet::PubRel(Pub::new_pubrel(uns.arbitrary()?)),
            PacketType::PubComp => Packet::PubComp(Pub::new_pubcomp(uns.arbitrary()?)),
            PacketType::Subscribe => Packet::Subscribe(uns.arbitrary()?),
            PacketType::SubAck => Packet::SubAck(uns.arbitrary()?),
            PacketType::UnSubscribe => Packet::UnSubscribe(uns.arbitrary()?),
            PacketType::UnsubAck => Packet::UnsubAck(uns.arbitrary()?),
            PacketType::PingReq => Packet::PingReq,
            PacketType::PingResp => Packet::PingResp,
            PacketType::Disconnect => Packet::Disconnect,
        };

        Ok(pkt)
    }
}

impl Packetize for Packet {
    fn decode<T: AsRef<[u8]>>(stream: T) -> Result<(Self, usize)> {
        let stream: &[u8] = stream.as_ref();
        let (fh, _) = FixedHeader::decode(stream)?;

        match fh.packet_type {
            PacketType::Connect => {
                let (pkt, n) = Connect::decode(stream)?;
                Ok((Packet::Connect(pkt), n))
            }
            PacketType::ConnAck => {
                let (pkt, n) = ConnAck::decode(stream)?;
                Ok((Packet::ConnAck(pkt), n))
            }
            PacketType::Publish => {
                let (pkt, n) = Publish::decode(stream)?;
                Ok((Packet::Publish(pkt), n))
            }
            PacketType::PubAck => {
                let (pkt, n) = Pub::decode(stream)?;
                Ok((Packet::PubAck(pkt), n))
            }
            PacketType::PubRec => {
                let (pkt, n) = Pub::decode(stream)?;
                Ok((Packet::PubRec(pkt), n))
            }
            PacketType::PubRel => {
                let (pkt, n) = Pub::decode(stream)?;
                Ok((Packet::PubRel(pkt), n))
            }
            PacketType::PubComp => {
                let (pkt, n) = Pub::decode(stream)?;
                Ok((Packet::PubComp(pkt), n))
            }
            PacketType::Subscribe => {
                let (pkt, n) = Subscribe::decode(stream)?;
                Ok((Packet::Subscribe(pkt), n))
            }
            PacketType::SubAck => {
                let (pkt, n) = SubAck::decode(stream)?;
                Ok((Packet::SubAck(pkt), n))
            }
            PacketType::UnSubscribe => {
                let (pkt, n) = UnSubscribe::decode(stream)?;
                Ok((Packet::UnSubscribe(pkt), n))
            }
            PacketType::UnsubAck => {
                let (pkt, n) = UnsubAck::decode(stream)?;
                Ok((Packet::UnsubAck(pkt), n))
            }
            PacketType::PingReq => {
                let (_pkt, n) = PingReq::decode(stream)?;
                Ok((Packet::PingReq, n))
            }
            PacketType::PingResp => {
                let (_pkt, n) = PingResp::decode(stream)?;
                Ok((Packet::PingResp, n))
            }
            PacketType::Disconnect => {
                let (_pkt, n) = Disconnect::decode(stream)?;
                Ok((Packet::Disconnect, n))
            }
        }
    }

    fn encode(&self) -> Result<Blob> {
        match self {
            Packet::Connect(pkt) => pkt.encode(),
            Packet::ConnAck(pkt) => pkt.encode(),
            Packet::Publish(pkt) => pkt.encode(),
            Packet::PubAck(pkt) => pkt.encode(),
            Packet::PubRec(pkt) => pkt.encode(),
            Packet::PubRel(pkt) => pkt.encode(),
            Packet::PubComp(pkt) => pkt.encode(),
            Packet::Subscribe(pkt) => pkt.encode(),
            Packet::SubAck(pkt) => pkt.encode(),
            Packet::UnSubscribe(pkt) => pkt.encode(),
            Packet::UnsubAck(pkt) => pkt.encode(),
            Packet::PingReq => PingReq.encode(),
            Packet::PingResp => PingResp.encode(),
            Packet::Disconnect => Disconnect.encode(),
        }
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Packet::Publish(publ) => write!(f, "{}", publ),
            pkt => match pkt.to_packet_id() {
                Some(packet_id) => write!(f, "{}<{}>", pkt.to_packet_type(), packet_id),
                None => write!(f, "{}", pkt.to_packet_type()),
            },
        }
    }
}

impl Packet {
    pub fn to_packet_type(&self) -> PacketType {
        match self {
            Packet::Connect(_) => PacketType::Connect,
            Packet::ConnAck(_) => PacketType::ConnAck,
            Packet::Publish(_) => PacketType::Publish,
            Packet::PubAck(_) => PacketType::PubAck,
            Packet::PubRec(_) => PacketType::PubRec,
            Packet::PubRel(_) => PacketType::PubRel,
            Packet::PubComp(_) => PacketType::PubComp,
            Packet::Subscribe(_) => PacketType::Subscribe,
            Packet::SubAck(_) => PacketType::SubAck,
            Packet::UnSubscribe(_) => PacketType::UnSubscribe,
            Packet::UnsubAck(_) => PacketType::UnsubAck,
            Packet::PingReq => PacketType::PingReq,
            Packet::PingResp => PacketType::PingResp,
            Packet::Disconnect => PacketType::Disconnect,
        }
    }

    /// Message identifier carried by this packet, if any. QoS-0 publish has none.
    pub fn to_packet_id(&self) -> Option<PacketID> {
        match self {
            Packet::Publish(publ) => publ.packet_id,
            Packet::PubAck(pkt)
            | Packet::PubRec(pkt)
            | Packet::PubRel(pkt)
            | Packet::PubComp(pkt) => Some(pkt.packet_id),
            Packet::Subscribe(sub) => Some(sub.packet_id),
            Packet::SubAck(suback) => Some(suback.packet_id),
            Packet::UnSubscribe(unsub) => Some(unsub.packet_id),
            Packet::UnsubAck(unsuback) => Some(unsuback.packet_id),
            Packet::Connect(_)
            | Packet::ConnAck(_)
            | Packet::PingReq
            | Packet::PingResp
            | Packet::Disconnect => None,
        }
    }
}

/// Prefix the encoded fixed-header to `data`, `data` holding the variable header
/// and payload.
pub(crate) fn insert_fixed_header(fh: FixedHeader, mut data: Vec<u8>) -> Result<Vec<u8>> {
    let a = data.len();

    let fh_blob = fh.encode()?;
    let fh_bytes = fh_blob.as_ref();
    let n = fh_bytes.len();

    data.extend_from_slice(fh_bytes);
    data.copy_within(..a, n);
    data[..n].copy_from_slice(fh_bytes);

    Ok(data)
}

/// Variable header + payload must be consumed exactly, as declared by the
/// remaining-length.
pub(crate) fn check_consumed(pp: &str, n: usize, m: usize) -> Result<()> {
    if n != m {
        err!(MalformedPacket, desc: "{} consumed {} remaining-len says {}", pp, n, m)
    } else {
        Ok(())
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod mod_test;
