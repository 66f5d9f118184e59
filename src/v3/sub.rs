#[cfg(any(feature = "fuzzy", test))]
use arbitrary::{Arbitrary, Error as ArbitraryError, Unstructured};

#[cfg(any(feature = "fuzzy", test))]
use std::result;

use crate::v3::{insert_fixed_header, FixedHeader, PacketType, QoS};
use crate::{Blob, PacketID, Packetize, VarU32};
use crate::{Error, ErrorKind, Result};

const PP: &'static str = "Packet::Subscribe";

/// Single (topic-filter, requested-qos) pair in SUBSCRIBE payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeFilter {
    pub topic_filter: String,
    pub qos: QoS,
}

#[cfg(any(feature = "fuzzy", test))]
impl<'a> Arbitrary<'a> for SubscribeFilter {
    fn arbitrary(uns: &mut Unstructured<'a>) -> result::Result<Self, ArbitraryError> {
        let filters = ["#", "finance/#", "finance/+", "a/b/c", "+/+", "/"];
        let val = SubscribeFilter {
            topic_filter: uns.choose(&filters)?.to_string(),
            qos: *uns.choose(&[QoS::AtMostOnce, QoS::AtLeastOnce, QoS::ExactlyOnce])?,
        };
        Ok(val)
    }
}

impl Packetize for SubscribeFilter {
    fn decode<T: AsRef<[u8]>>(stream: T) -> Result<(Self, usize)> {
        let stream: &[u8] = stream.as_ref();

        let (topic_filter, n) = dec_field!(String, stream, 0);
        let (qos, n) = dec_field!(u8, stream, n);
        let qos = match QoS::try_from(qos)? {
            QoS::Reserved => err!(MalformedPacket, desc: "{} requested QoS 3", PP)?,
            qos => qos,
        };

        Ok((SubscribeFilter { topic_filter, qos }, n))
    }

    fn encode(&self) -> Result<Blob> {
        let mut data = self.topic_filter.encode()?.into_vec();
        data.push(u8::from(self.qos));

        Ok(Blob::Large { data })
    }
}

/// SUBSCRIBE packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscribe {
    pub packet_id: PacketID,
    pub filters: Vec<SubscribeFilter>,
}

#[cfg(any(feature = "fuzzy", test))]
impl<'a> Arbitrary<'a> for Subscribe {
    fn arbitrary(uns: &mut Unstructured<'a>) -> result::Result<Self, ArbitraryError> {
        let mut filters: Vec<SubscribeFilter> = uns.arbitrary()?;
        if filters.is_empty() {
            filters.push(uns.arbitrary()?);
        }

        Ok(Subscribe { packet_id: uns.arbitrary()?, filters })
    }
}

impl Packetize for Subscribe {
    fn decode<T: AsRef<[u8]>>(stream: T) -> Result<(Self, usize)> {
        let stream: &[u8] = stream.as_ref();

        let (fh, n) = dec_field!(FixedHeader, stream, 0);
        let m = fh.check(PacketType::Subscribe, stream)?;
        let stream = &stream[..m];

        let (packet_id, mut n) = dec_field!(u16, stream, n);

        let mut filters = vec![];
        while n < m {
            let (filter, k) = dec_field!(SubscribeFilter, stream, n);
            filters.push(filter);
            n = k;
        }

        let val = Subscribe { packet_id, filters };
        val.validate()?;

        Ok((val, n))
    }

    fn encode(&self) -> Result<Blob> {
        self.validate()?;

        let mut data = Vec::with_capacity(64);
        data.extend_from_slice(self.packet_id.encode()?.as_ref());
        for filter in self.filters.iter() {
            data.extend_from_slice(filter.encode()?.as_ref());
        }

        let fh = FixedHeader::new_subscribe(VarU32(data.len().try_into()?))?;
        data = insert_fixed_header(fh, data)?;

        Ok(Blob::Large { data })
    }
}

impl Subscribe {
    pub fn new(packet_id: PacketID, topic_filter: &str, qos: QoS) -> Subscribe {
        let filter = SubscribeFilter { topic_filter: topic_filter.to_string(), qos };
        Subscribe { packet_id, filters: vec![filter] }
    }

    fn validate(&self) -> Result<()> {
        if self.filters.is_empty() {
            err!(MalformedPacket, desc: "{} no topic filters", PP)?;
        }
        Ok(())
    }
}
