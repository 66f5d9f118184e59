#[cfg(any(feature = "fuzzy", test))]
use arbitrary::Arbitrary;

use crate::v3::{check_consumed, insert_fixed_header, FixedHeader, PacketType};
use crate::{Blob, PacketID, Packetize, Result, VarU32};

const PP: &'static str = "Packet::UnsubAck";

/// UNSUBACK packet
#[cfg_attr(any(feature = "fuzzy", test), derive(Arbitrary))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnsubAck {
    pub packet_id: PacketID,
}

impl Packetize for UnsubAck {
    fn decode<T: AsRef<[u8]>>(stream: T) -> Result<(Self, usize)> {
        let stream: &[u8] = stream.as_ref();

        let (fh, n) = dec_field!(FixedHeader, stream, 0);
        let m = fh.check(PacketType::UnsubAck, stream)?;
        let stream = &stream[..m];

        let (packet_id, n) = dec_field!(u16, stream, n);
        check_consumed(PP, n, m)?;

        Ok((UnsubAck { packet_id }, n))
    }

    fn encode(&self) -> Result<Blob> {
        let data = self.packet_id.encode()?.as_ref().to_vec();

        let fh = FixedHeader::new(PacketType::UnsubAck, VarU32(2))?;
        let data = insert_fixed_header(fh, data)?;

        Ok(Blob::Large { data })
    }
}
