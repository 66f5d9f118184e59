use std::fmt;

use crate::v3::{check_consumed, insert_fixed_header, FixedHeader, PacketType};
use crate::{Blob, PacketID, Packetize, VarU32};
use crate::{Error, ErrorKind, Result};

const PP: &'static str = "Packet::Pub";

/// PUBACK, PUBREC, PUBREL, PUBCOMP packets, variable header is just the
/// message identifier.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Pub {
    pub packet_type: PacketType,
    pub packet_id: PacketID,
}

impl fmt::Display for Pub {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} packet_id:{}", self.packet_type, self.packet_id)
    }
}

impl Packetize for Pub {
    fn decode<T: AsRef<[u8]>>(stream: T) -> Result<(Self, usize)> {
        let stream: &[u8] = stream.as_ref();

        let (fh, n) = dec_field!(FixedHeader, stream, 0);
        let packet_type = match fh.packet_type {
            pt @ PacketType::PubAck
            | pt @ PacketType::PubRec
            | pt @ PacketType::PubRel
            | pt @ PacketType::PubComp => pt,
            pt => err!(MalformedPacket, desc: "{} packet-type {}", PP, pt)?,
        };
        let m = fh.check(packet_type, stream)?;
        let stream = &stream[..m];

        let (packet_id, n) = dec_field!(u16, stream, n);
        check_consumed(PP, n, m)?;

        Ok((Pub { packet_type, packet_id }, n))
    }

    fn encode(&self) -> Result<Blob> {
        let data = self.packet_id.encode()?.as_ref().to_vec();

        let fh = match self.packet_type {
            PacketType::PubRel => FixedHeader::new_pubrel(VarU32(2))?,
            PacketType::PubAck | PacketType::PubRec | PacketType::PubComp => {
                FixedHeader::new(self.packet_type, VarU32(2))?
            }
            pt => err!(InvalidInput, desc: "{} packet-type {}", PP, pt)?,
        };
        let data = insert_fixed_header(fh, data)?;

        Ok(Blob::Large { data })
    }
}

impl Pub {
    pub fn new_puback(packet_id: PacketID) -> Pub {
        Pub { packet_type: PacketType::PubAck, packet_id }
    }

    pub fn new_pubrec(packet_id: PacketID) -> Pub {
        Pub { packet_type: PacketType::PubRec, packet_id }
    }

    pub fn new_pubrel(packet_id: PacketID) -> Pub {
        Pub { packet_type: PacketType::PubRel, packet_id }
    }

    pub fn new_pubcomp(packet_id: PacketID) -> Pub {
        Pub { packet_type: PacketType::PubComp, packet_id }
    }
}
