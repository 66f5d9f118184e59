#[cfg(any(feature = "fuzzy", test))]
use arbitrary::{Arbitrary, Error as ArbitraryError, Unstructured};

#[cfg(any(feature = "fuzzy", test))]
use std::result;

use crate::v3::{insert_fixed_header, FixedHeader, PacketType, QoS};
use crate::{Blob, PacketID, Packetize, VarU32};
use crate::{Error, ErrorKind, Result};

const PP: &'static str = "Packet::SubAck";

/// SUBACK packet, one granted QoS per requested topic filter, in the same order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubAck {
    pub packet_id: PacketID,
    pub return_codes: Vec<QoS>,
}

#[cfg(any(feature = "fuzzy", test))]
impl<'a> Arbitrary<'a> for SubAck {
    fn arbitrary(uns: &mut Unstructured<'a>) -> result::Result<Self, ArbitraryError> {
        let qoss = [QoS::AtMostOnce, QoS::AtLeastOnce, QoS::ExactlyOnce];
        let mut return_codes = vec![*uns.choose(&qoss)?];
        for _ in 0..uns.int_in_range(0_u8..=4)? {
            return_codes.push(*uns.choose(&qoss)?);
        }

        Ok(SubAck { packet_id: uns.arbitrary()?, return_codes })
    }
}

impl Packetize for SubAck {
    fn decode<T: AsRef<[u8]>>(stream: T) -> Result<(Self, usize)> {
        let stream: &[u8] = stream.as_ref();

        let (fh, n) = dec_field!(FixedHeader, stream, 0);
        let m = fh.check(PacketType::SubAck, stream)?;
        let stream = &stream[..m];

        let (packet_id, n) = dec_field!(u16, stream, n);
        if n == m {
            err!(MalformedPacket, desc: "{} no payload", PP)?;
        }

        let mut return_codes = Vec::with_capacity(m - n);
        for code in stream[n..].iter() {
            match QoS::try_from(*code) {
                Ok(QoS::Reserved) | Err(_) => {
                    err!(MalformedPacket, desc: "{} granted QoS {:x}", PP, code)?
                }
                Ok(qos) => return_codes.push(qos),
            }
        }

        Ok((SubAck { packet_id, return_codes }, m))
    }

    fn encode(&self) -> Result<Blob> {
        let mut data = Vec::with_capacity(2 + self.return_codes.len());
        data.extend_from_slice(self.packet_id.encode()?.as_ref());
        data.extend(self.return_codes.iter().map(|qos| u8::from(*qos)));

        let fh = FixedHeader::new(PacketType::SubAck, VarU32(data.len().try_into()?))?;
        data = insert_fixed_header(fh, data)?;

        Ok(Blob::Large { data })
    }
}
