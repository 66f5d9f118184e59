#[cfg(any(feature = "fuzzy", test))]
use arbitrary::{Arbitrary, Error as ArbitraryError, Unstructured};

#[cfg(any(feature = "fuzzy", test))]
use std::result;
use std::fmt;

use crate::v3::{insert_fixed_header, FixedHeader, PacketType, QoS};
use crate::{Blob, PacketID, Packetize, VarU32};
use crate::{Error, ErrorKind, Result};

const PP: &'static str = "Packet::Publish";

/// PUBLISH packet. Payload is opaque and takes up the rest of the frame, it
/// carries no length prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publish {
    pub retain: bool,
    pub qos: QoS,
    pub duplicate: bool,
    pub topic_name: String,
    /// Present only for QoS-1 and QoS-2.
    pub packet_id: Option<PacketID>,
    pub payload: Vec<u8>,
}

impl fmt::Display for Publish {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let packet_id = self.packet_id.map(|x| x.to_string()).unwrap_or("-".to_string());
        write!(
            f,
            "PUBLISH<{:?},packet_id:{},qos:{:?},payload:{}>",
            self.topic_name,
            packet_id,
            self.qos,
            self.payload.len()
        )
    }
}

#[cfg(any(feature = "fuzzy", test))]
impl<'a> Arbitrary<'a> for Publish {
    fn arbitrary(uns: &mut Unstructured<'a>) -> result::Result<Self, ArbitraryError> {
        let topics = ["A/Topic", "finance/ibm", "/a/b", "sport", "a//b"];
        let qos = *uns.choose(&[QoS::AtMostOnce, QoS::AtLeastOnce, QoS::ExactlyOnce])?;
        let (packet_id, duplicate) = match qos {
            QoS::AtMostOnce => (None, false),
            _ => (Some(uns.arbitrary()?), uns.arbitrary()?),
        };

        let val = Publish {
            retain: uns.arbitrary()?,
            qos,
            duplicate,
            topic_name: uns.choose(&topics)?.to_string(),
            packet_id,
            payload: uns.arbitrary()?,
        };

        Ok(val)
    }
}

impl Packetize for Publish {
    fn decode<T: AsRef<[u8]>>(stream: T) -> Result<(Self, usize)> {
        let stream: &[u8] = stream.as_ref();

        let (fh, n) = dec_field!(FixedHeader, stream, 0);
        let m = fh.check(PacketType::Publish, stream)?;
        let stream = &stream[..m];

        let qos = fh.qos;
        let (topic_name, n) = dec_field!(String, stream, n);
        let (packet_id, n) = dec_field!(
            u16,
            stream,
            n;
            matches!(qos, QoS::AtLeastOnce | QoS::ExactlyOnce)
        );
        let payload = stream[n..].to_vec();

        let val = Publish {
            retain: fh.retain,
            qos,
            duplicate: fh.duplicate,
            topic_name,
            packet_id,
            payload,
        };
        val.validate()?;

        Ok((val, m))
    }

    fn encode(&self) -> Result<Blob> {
        self.validate()?;

        let mut data = Vec::with_capacity(self.topic_name.len() + self.payload.len() + 4);
        data.extend_from_slice(self.topic_name.encode()?.as_ref());
        if let Some(packet_id) = self.packet_id {
            data.extend_from_slice(packet_id.encode()?.as_ref());
        }
        data.extend_from_slice(&self.payload);

        let fh = FixedHeader::new_publish(
            self.retain,
            self.qos,
            self.duplicate,
            VarU32(data.len().try_into()?),
        )?;
        data = insert_fixed_header(fh, data)?;

        Ok(Blob::Large { data })
    }
}

impl Publish {
    /// Create a PUBLISH packet, `packet_id` is ignored for QoS-0.
    pub fn new(topic_name: &str, qos: QoS, packet_id: PacketID, payload: Vec<u8>) -> Publish {
        let packet_id = match qos {
            QoS::AtMostOnce => None,
            _ => Some(packet_id),
        };

        Publish {
            retain: false,
            qos,
            duplicate: false,
            topic_name: topic_name.to_string(),
            packet_id,
            payload,
        }
    }

    pub fn set_retain(&mut self, retain: bool) -> &mut Self {
        self.retain = retain;
        self
    }

    pub fn set_duplicate(&mut self, duplicate: bool) -> &mut Self {
        self.duplicate = duplicate;
        self
    }

    fn validate(&self) -> Result<()> {
        match (self.qos, self.packet_id) {
            (QoS::Reserved, _) => err!(MalformedPacket, desc: "{} reserved QoS", PP),
            (QoS::AtMostOnce, Some(_)) => {
                err!(MalformedPacket, desc: "{} packet_id for QoS0", PP)
            }
            (QoS::AtLeastOnce | QoS::ExactlyOnce, None) => {
                err!(MalformedPacket, desc: "{} missing packet_id {:?}", PP, self.qos)
            }
            (_, _) => Ok(()),
        }
    }
}
