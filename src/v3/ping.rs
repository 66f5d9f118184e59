#[cfg(any(feature = "fuzzy", test))]
use arbitrary::Arbitrary;

use crate::v3::{check_consumed, FixedHeader, PacketType};
use crate::{Blob, Packetize, Result, VarU32};

macro_rules! header_only {
    ($(#[$doc:meta])* $name:ident, $pkt_type:ident, $pp:expr) => {
        $(#[$doc])*
        #[cfg_attr(any(feature = "fuzzy", test), derive(Arbitrary))]
        #[derive(Clone, Copy, PartialEq, Eq, Debug)]
        pub struct $name;

        impl Packetize for $name {
            fn decode<T: AsRef<[u8]>>(stream: T) -> Result<(Self, usize)> {
                let stream: &[u8] = stream.as_ref();

                let (fh, n) = dec_field!(FixedHeader, stream, 0);
                let m = fh.check(PacketType::$pkt_type, stream)?;
                check_consumed($pp, n, m)?;

                Ok(($name, n))
            }

            fn encode(&self) -> Result<Blob> {
                let fh = FixedHeader::new(PacketType::$pkt_type, VarU32(0))?;
                fh.encode()
            }
        }
    };
}

header_only!(
    /// PINGREQ packet
    PingReq,
    PingReq,
    "Packet::PingReq"
);
header_only!(
    /// PINGRESP packet
    PingResp,
    PingResp,
    "Packet::PingResp"
);
header_only!(
    /// DISCONNECT packet
    Disconnect,
    Disconnect,
    "Packet::Disconnect"
);
