#[cfg(any(feature = "fuzzy", test))]
use arbitrary::{Arbitrary, Error as ArbitraryError, Unstructured};

#[cfg(any(feature = "fuzzy", test))]
use std::result;

use crate::v3::{insert_fixed_header, FixedHeader, PacketType};
use crate::{Blob, PacketID, Packetize, VarU32};
use crate::{Error, ErrorKind, Result};

const PP: &'static str = "Packet::UnSubscribe";

/// UNSUBSCRIBE packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnSubscribe {
    pub packet_id: PacketID,
    pub topic_filters: Vec<String>,
}

#[cfg(any(feature = "fuzzy", test))]
impl<'a> Arbitrary<'a> for UnSubscribe {
    fn arbitrary(uns: &mut Unstructured<'a>) -> result::Result<Self, ArbitraryError> {
        let filters = ["#", "finance/#", "finance/+", "a/b/c"];
        let mut topic_filters = vec![uns.choose(&filters)?.to_string()];
        for _ in 0..uns.int_in_range(0_u8..=3)? {
            topic_filters.push(uns.choose(&filters)?.to_string());
        }

        Ok(UnSubscribe { packet_id: uns.arbitrary()?, topic_filters })
    }
}

impl Packetize for UnSubscribe {
    fn decode<T: AsRef<[u8]>>(stream: T) -> Result<(Self, usize)> {
        let stream: &[u8] = stream.as_ref();

        let (fh, n) = dec_field!(FixedHeader, stream, 0);
        let m = fh.check(PacketType::UnSubscribe, stream)?;
        let stream = &stream[..m];

        let (packet_id, mut n) = dec_field!(u16, stream, n);

        let mut topic_filters = vec![];
        while n < m {
            let (topic_filter, k) = dec_field!(String, stream, n);
            topic_filters.push(topic_filter);
            n = k;
        }

        let val = UnSubscribe { packet_id, topic_filters };
        val.validate()?;

        Ok((val, n))
    }

    fn encode(&self) -> Result<Blob> {
        self.validate()?;

        let mut data = Vec::with_capacity(64);
        data.extend_from_slice(self.packet_id.encode()?.as_ref());
        for topic_filter in self.topic_filters.iter() {
            data.extend_from_slice(topic_filter.encode()?.as_ref());
        }

        let fh = FixedHeader::new_unsubscribe(VarU32(data.len().try_into()?))?;
        data = insert_fixed_header(fh, data)?;

        Ok(Blob::Large { data })
    }
}

impl UnSubscribe {
    pub fn new(packet_id: PacketID, topic_filter: &str) -> UnSubscribe {
        UnSubscribe { packet_id, topic_filters: vec![topic_filter.to_string()] }
    }

    fn validate(&self) -> Result<()> {
        if self.topic_filters.is_empty() {
            err!(MalformedPacket, desc: "{} no topic filters", PP)?;
        }
        Ok(())
    }
}
