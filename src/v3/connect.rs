#[cfg(any(feature = "fuzzy", test))]
use arbitrary::{Arbitrary, Error as ArbitraryError, Unstructured};

use std::ops::Deref;
#[cfg(any(feature = "fuzzy", test))]
use std::result;

use crate::v3::{check_consumed, insert_fixed_header, FixedHeader, PacketType, QoS};
use crate::{Blob, ErrorDetail, Packetize, VarU32};
use crate::{Error, ErrorKind, Result};
use crate::{MAX_CLIENT_ID_LEN, PROTOCOL_NAME, PROTOCOL_VERSION};

const PP: &'static str = "Packet::Connect";

/// Connect flags, packed into one byte,
///
/// ```txt
///  7          6          5            4   3      2          1            0
///  username | password | will-retain | will-qos | will-flag | clean-start | reserved
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct ConnectFlags(pub u8);

impl Deref for ConnectFlags {
    type Target = u8;

    fn deref(&self) -> &u8 {
        &self.0
    }
}

impl Packetize for ConnectFlags {
    fn decode<T: AsRef<[u8]>>(stream: T) -> Result<(Self, usize)> {
        let stream: &[u8] = stream.as_ref();

        let (flags, n) = dec_field!(u8, stream, 0);
        Ok((ConnectFlags(flags), n))
    }

    fn encode(&self) -> Result<Blob> {
        self.0.encode()
    }
}

impl ConnectFlags {
    pub const RESERVED: ConnectFlags = ConnectFlags(0b_0000_0001);
    pub const CLEAN_START: ConnectFlags = ConnectFlags(0b_0000_0010);
    pub const WILL_FLAG: ConnectFlags = ConnectFlags(0b_0000_0100);
    pub const WILL_RETAIN: ConnectFlags = ConnectFlags(0b_0010_0000);
    pub const PASSWORD: ConnectFlags = ConnectFlags(0b_0100_0000);
    pub const USERNAME: ConnectFlags = ConnectFlags(0b_1000_0000);

    const WILL_QOS_MASK: u8 = 0b_0001_1000;

    pub fn new(flags: &[ConnectFlags]) -> ConnectFlags {
        flags.iter().fold(ConnectFlags(0), |acc, flag| ConnectFlags(acc.0 | flag.0))
    }

    pub fn is_reserved(&self) -> bool {
        (self.0 & Self::RESERVED.0) > 0
    }

    pub fn is_clean_start(&self) -> bool {
        (self.0 & Self::CLEAN_START.0) > 0
    }

    pub fn is_will_flag(&self) -> bool {
        (self.0 & Self::WILL_FLAG.0) > 0
    }

    pub fn will_qos(&self) -> QoS {
        match (self.0 & Self::WILL_QOS_MASK) >> 3 {
            0 => QoS::AtMostOnce,
            1 => QoS::AtLeastOnce,
            2 => QoS::ExactlyOnce,
            _ => QoS::Reserved,
        }
    }

    pub fn is_will_retain(&self) -> bool {
        (self.0 & Self::WILL_RETAIN.0) > 0
    }

    pub fn is_password(&self) -> bool {
        (self.0 & Self::PASSWORD.0) > 0
    }

    pub fn is_username(&self) -> bool {
        (self.0 & Self::USERNAME.0) > 0
    }

    fn set(&mut self, flag: ConnectFlags, on: bool) {
        match on {
            true => self.0 |= flag.0,
            false => self.0 &= !flag.0,
        }
    }

    fn set_will_qos(&mut self, qos: QoS) {
        self.0 = (self.0 & !Self::WILL_QOS_MASK) | (u8::from(qos) << 3);
    }
}

/// CONNECT payload, fields appear on the wire in the same order.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct ConnectPayload {
    pub client_id: String,
    pub will_topic: Option<String>,
    pub will_message: Option<Vec<u8>>,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[cfg(any(feature = "fuzzy", test))]
impl<'a> Arbitrary<'a> for ConnectPayload {
    fn arbitrary(uns: &mut Unstructured<'a>) -> result::Result<Self, ArbitraryError> {
        let client_ids = ["andy111", "mqv3-client", "a", "01234567890123456789012"];
        let mut payload = ConnectPayload {
            client_id: uns.choose(&client_ids)?.to_string(),
            ..ConnectPayload::default()
        };
        if uns.arbitrary::<bool>()? {
            let topic = uns.choose(&["last/will", "a/b/c", "/"])?.to_string();
            payload = payload.with_will(topic, uns.arbitrary()?);
        }
        if uns.arbitrary::<bool>()? {
            payload = payload.with_credentials(uns.arbitrary()?, uns.arbitrary()?);
        }

        Ok(payload)
    }
}

impl ConnectPayload {
    /// Create a payload for `client_id`, fail with `ClientIdentifierTooLong` if
    /// the identifier is longer than `max_len`.
    pub fn new(client_id: &str, max_len: usize) -> Result<ConnectPayload> {
        validate_client_id(client_id, max_len)?;

        let val = ConnectPayload {
            client_id: client_id.to_string(),
            ..ConnectPayload::default()
        };
        Ok(val)
    }

    pub fn with_will(mut self, topic: String, message: Vec<u8>) -> ConnectPayload {
        self.will_topic = Some(topic);
        self.will_message = Some(message);
        self
    }

    pub fn with_credentials(
        mut self,
        username: String,
        password: Option<String>,
    ) -> ConnectPayload {
        self.username = Some(username);
        self.password = password;
        self
    }
}

/// CONNECT packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connect {
    pub protocol_name: String,
    pub protocol_version: u8,
    pub flags: ConnectFlags,
    /// Keep alive interval in seconds.
    pub keep_alive: u16,
    pub payload: ConnectPayload,
}

#[cfg(any(feature = "fuzzy", test))]
impl<'a> Arbitrary<'a> for Connect {
    fn arbitrary(uns: &mut Unstructured<'a>) -> result::Result<Self, ArbitraryError> {
        let payload: ConnectPayload = uns.arbitrary()?;
        let mut val = Connect::new(payload, uns.arbitrary()?, uns.arbitrary()?);
        if val.flags.is_will_flag() {
            let qos = *uns.choose(&[QoS::AtMostOnce, QoS::AtLeastOnce, QoS::ExactlyOnce])?;
            val.set_will_options(qos, uns.arbitrary()?);
        }

        Ok(val)
    }
}

impl Packetize for Connect {
    fn decode<T: AsRef<[u8]>>(stream: T) -> Result<(Self, usize)> {
        let stream: &[u8] = stream.as_ref();

        let (fh, n) = dec_field!(FixedHeader, stream, 0);
        let m = fh.check(PacketType::Connect, stream)?;
        let stream = &stream[..m];

        let (protocol_name, n) = dec_field!(String, stream, n);
        let (protocol_version, n) = dec_field!(u8, stream, n);
        let (flags, n) = dec_field!(ConnectFlags, stream, n);
        let (keep_alive, n) = dec_field!(u16, stream, n);

        let will_flag = flags.is_will_flag();
        let (client_id, n) = dec_field!(String, stream, n);
        let (will_topic, n) = dec_field!(String, stream, n; will_flag);
        let (will_message, n) = dec_field!(Vec<u8>, stream, n; will_flag);
        let (username, n) = dec_field!(String, stream, n; flags.is_username());
        let (password, n) = dec_field!(String, stream, n; flags.is_password());
        check_consumed(PP, n, m)?;

        let val = Connect {
            protocol_name,
            protocol_version,
            flags,
            keep_alive,
            payload: ConnectPayload {
                client_id,
                will_topic,
                will_message,
                username,
                password,
            },
        };
        val.validate(MAX_CLIENT_ID_LEN)?;

        Ok((val, n))
    }

    fn encode(&self) -> Result<Blob> {
        self.validate(usize::MAX)?;

        let mut data = Vec::with_capacity(64);
        data.extend_from_slice(self.protocol_name.encode()?.as_ref());
        data.extend_from_slice(self.protocol_version.encode()?.as_ref());
        data.extend_from_slice(self.flags.encode()?.as_ref());
        data.extend_from_slice(self.keep_alive.encode()?.as_ref());

        let payload = &self.payload;
        data.extend_from_slice(payload.client_id.encode()?.as_ref());
        if let Some(will_topic) = &payload.will_topic {
            data.extend_from_slice(will_topic.encode()?.as_ref());
        }
        if let Some(will_message) = &payload.will_message {
            data.extend_from_slice(will_message.encode()?.as_ref());
        }
        if let Some(username) = &payload.username {
            data.extend_from_slice(username.encode()?.as_ref());
        }
        if let Some(password) = &payload.password {
            data.extend_from_slice(password.encode()?.as_ref());
        }

        let fh = FixedHeader::new(PacketType::Connect, VarU32(data.len().try_into()?))?;
        data = insert_fixed_header(fh, data)?;

        Ok(Blob::Large { data })
    }
}

impl Connect {
    /// Create a CONNECT packet, connect-flags are computed from the payload.
    pub fn new(payload: ConnectPayload, keep_alive: u16, clean_start: bool) -> Connect {
        let mut flags = ConnectFlags::default();
        flags.set(ConnectFlags::CLEAN_START, clean_start);
        flags.set(ConnectFlags::WILL_FLAG, payload.will_topic.is_some());
        flags.set(ConnectFlags::USERNAME, payload.username.is_some());
        flags.set(ConnectFlags::PASSWORD, payload.password.is_some());

        Connect {
            protocol_name: PROTOCOL_NAME.to_string(),
            protocol_version: PROTOCOL_VERSION,
            flags,
            keep_alive,
            payload,
        }
    }

    /// Set will-qos and will-retain, applicable only when will-flag is set.
    pub fn set_will_options(&mut self, qos: QoS, retain: bool) {
        self.flags.set_will_qos(qos);
        self.flags.set(ConnectFlags::WILL_RETAIN, retain);
    }

    // Received CONNECT is held to the protocol limit. Outbound CONNECT was
    // already checked by ConnectPayload::new against the caller's limit.
    fn validate(&self, max_client_id_len: usize) -> Result<()> {
        if self.protocol_name != PROTOCOL_NAME {
            err!(ProtocolError, desc: "{} protocol {:?}", PP, self.protocol_name)?;
        }
        if self.protocol_version != PROTOCOL_VERSION {
            err!(ProtocolError, desc: "{} version {}", PP, self.protocol_version)?;
        }

        validate_client_id(&self.payload.client_id, max_client_id_len)?;

        let (flags, pld) = (&self.flags, &self.payload);
        if flags.is_will_flag() != pld.will_topic.is_some()
            || flags.is_will_flag() != pld.will_message.is_some()
        {
            err!(MalformedPacket, desc: "{} will-flag/will-fields mismatch", PP)?;
        }
        if flags.is_username() != pld.username.is_some() {
            err!(MalformedPacket, desc: "{} username-flag/username mismatch", PP)?;
        }
        if flags.is_password() != pld.password.is_some() {
            err!(MalformedPacket, desc: "{} password-flag/password mismatch", PP)?;
        }

        Ok(())
    }
}

fn validate_client_id(client_id: &str, max_len: usize) -> Result<()> {
    if client_id.is_empty() {
        err!(InvalidInput, desc: "{} empty client_id", PP)
    } else if client_id.len() > max_len {
        let detail = ErrorDetail::ClientId { client_id: client_id.to_string(), max_len };
        err!(
            ClientIdentifierTooLong,
            detail: detail,
            "{} client_id {:?} longer than {}",
            PP,
            client_id,
            max_len
        )
    } else {
        Ok(())
    }
}
