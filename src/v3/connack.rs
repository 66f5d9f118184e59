#[cfg(any(feature = "fuzzy", test))]
use arbitrary::Arbitrary;

use std::fmt;

use crate::v3::{check_consumed, insert_fixed_header, FixedHeader, PacketType};
use crate::{Blob, Packetize, VarU32};
use crate::{Error, ErrorKind, Result};

const PP: &'static str = "Packet::ConnAck";

/// Return code in CONNACK packet.
#[cfg_attr(any(feature = "fuzzy", test), derive(Arbitrary))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnackReturnCode {
    Accepted = 0,
    UnacceptedProtocolVersion = 1,
    IdentifierRejected = 2,
    BrokerUnavailable = 3,
    BadUsernameOrPassword = 4,
    NotAuthorized = 5,
}

impl TryFrom<u8> for ConnackReturnCode {
    type Error = Error;

    fn try_from(val: u8) -> Result<Self> {
        let val = match val {
            0 => ConnackReturnCode::Accepted,
            1 => ConnackReturnCode::UnacceptedProtocolVersion,
            2 => ConnackReturnCode::IdentifierRejected,
            3 => ConnackReturnCode::BrokerUnavailable,
            4 => ConnackReturnCode::BadUsernameOrPassword,
            5 => ConnackReturnCode::NotAuthorized,
            val => err!(MalformedPacket, desc: "{} return-code {}", PP, val)?,
        };

        Ok(val)
    }
}

impl fmt::Display for ConnackReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            ConnackReturnCode::Accepted => "accepted",
            ConnackReturnCode::UnacceptedProtocolVersion => "unaccepted protocol version",
            ConnackReturnCode::IdentifierRejected => "identifier rejected",
            ConnackReturnCode::BrokerUnavailable => "broker unavailable",
            ConnackReturnCode::BadUsernameOrPassword => "bad username or password",
            ConnackReturnCode::NotAuthorized => "not authorized",
        };
        write!(f, "{}", s)
    }
}

/// CONNACK packet, reserved byte followed by the return code.
#[cfg_attr(any(feature = "fuzzy", test), derive(Arbitrary))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnAck {
    pub return_code: ConnackReturnCode,
}

impl Packetize for ConnAck {
    fn decode<T: AsRef<[u8]>>(stream: T) -> Result<(Self, usize)> {
        let stream: &[u8] = stream.as_ref();

        let (fh, n) = dec_field!(FixedHeader, stream, 0);
        let m = fh.check(PacketType::ConnAck, stream)?;
        let stream = &stream[..m];

        let (_reserved, n) = dec_field!(u8, stream, n);
        let (code, n) = dec_field!(u8, stream, n);
        check_consumed(PP, n, m)?;

        let val = ConnAck { return_code: ConnackReturnCode::try_from(code)? };
        Ok((val, n))
    }

    fn encode(&self) -> Result<Blob> {
        let data = vec![0, self.return_code as u8];

        let fh = FixedHeader::new(PacketType::ConnAck, VarU32(2))?;
        let data = insert_fixed_header(fh, data)?;

        Ok(Blob::Large { data })
    }
}

impl ConnAck {
    pub fn new(return_code: ConnackReturnCode) -> ConnAck {
        ConnAck { return_code }
    }

    pub fn is_accepted(&self) -> bool {
        self.return_code == ConnackReturnCode::Accepted
    }
}
