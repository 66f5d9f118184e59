#[cfg(any(feature = "fuzzy", test))]
use arbitrary::{Arbitrary, Error as ArbitraryError, Unstructured};
#[cfg(any(feature = "fuzzy", test))]
use std::result;

use std::ops::Deref;

use crate::{Error, ErrorKind, Packetize, Result, MAX_REMAINING_LEN};

/// Type is associated with [Packetize] trait and optimizes on the returned byte-blob.
///
/// Small variant stores the bytes in stack.
/// Large variant stores the bytes in heap.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum Blob {
    Small { data: [u8; 32], size: usize },
    Large { data: Vec<u8> },
}

impl AsRef<[u8]> for Blob {
    fn as_ref(&self) -> &[u8] {
        match self {
            Blob::Small { data, size } => &data[..*size],
            Blob::Large { data } => data,
        }
    }
}

impl Blob {
    pub fn into_vec(self) -> Vec<u8> {
        match self {
            Blob::Small { data, size } => data[..size].to_vec(),
            Blob::Large { data } => data,
        }
    }
}

/// Type implement the variable-length "remaining length" integer.
///
/// Uses continuation bit at position 7 to continue reading next byte, there can
/// be at most 4 bytes, first byte carries the least significant 7 bits.
///
/// ```txt
/// i/p stream: 0b1xxx_xxxx 0b1yyy_yyyy 0b1zzz_zzzz 0b0www_wwww, low-byte to high-byte
/// o/p u32   : 0bwww_wwww_zzz_zzzz_yyy_yyyy_xxx_xxxx
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct VarU32(pub u32);

#[cfg(any(feature = "fuzzy", test))]
impl<'a> Arbitrary<'a> for VarU32 {
    fn arbitrary(uns: &mut Unstructured<'a>) -> result::Result<Self, ArbitraryError> {
        let val: u32 = uns.arbitrary()?;
        Ok(VarU32(val % (*VarU32::MAX + 1)))
    }
}

impl Deref for VarU32 {
    type Target = u32;

    fn deref(&self) -> &u32 {
        &self.0
    }
}

impl Packetize for VarU32 {
    fn decode<T: AsRef<[u8]>>(stream: T) -> Result<(Self, usize)> {
        let stream: &[u8] = stream.as_ref();

        let mut out = 0_u32;
        for (i, byte) in stream.iter().take(4).enumerate() {
            out += ((*byte as u32) & 0x7f) << (7 * (i as u32));
            if *byte < 0x80 {
                return Ok((VarU32(out), i + 1));
            }
        }

        match stream.len() {
            n if n >= 4 => err!(InvalidHeader, desc: "VarU32::decode more than 4 bytes"),
            n => err!(InvalidHeader, desc: "VarU32::decode insufficient bytes {}", n),
        }
    }

    fn encode(&self) -> Result<Blob> {
        let mut data = [0_u8; 32];
        let size = match self.0 {
            val if val < 128 => {
                data[0] = (val & 0x7f_u32) as u8;
                1
            }
            val if val < 16_384 => {
                data[0] = ((val & 0x7f_u32) as u8) | 0x80;
                data[1] = ((val >> 7) & 0x7f_u32) as u8;
                2
            }
            val if val < 2_097_152 => {
                data[0] = ((val & 0x7f_u32) as u8) | 0x80;
                data[1] = (((val >> 7) & 0x7f_u32) as u8) | 0x80;
                data[2] = ((val >> 14) & 0x7f_u32) as u8;
                3
            }
            val if val <= *VarU32::MAX => {
                data[0] = ((val & 0x7f_u32) as u8) | 0x80;
                data[1] = (((val >> 7) & 0x7f_u32) as u8) | 0x80;
                data[2] = (((val >> 14) & 0x7f_u32) as u8) | 0x80;
                data[3] = ((val >> 21) & 0x7f_u32) as u8;
                4
            }
            val => err!(InvalidPayloadSize, desc: "VarU32::encode({}) over max", val)?,
        };

        Ok(Blob::Small { data, size })
    }
}

impl VarU32 {
    pub const MAX: VarU32 = VarU32(MAX_REMAINING_LEN);

    /// Number of bytes needed to encode this value, between 1 and 4.
    pub fn encoded_len(&self) -> Result<usize> {
        let n = match self.0 {
            val if val < 128 => 1,
            val if val < 16_384 => 2,
            val if val < 2_097_152 => 3,
            val if val <= *VarU32::MAX => 4,
            val => err!(InvalidPayloadSize, desc: "VarU32 {} over max", val)?,
        };

        Ok(n)
    }
}

impl Packetize for u8 {
    fn decode<T: AsRef<[u8]>>(stream: T) -> Result<(Self, usize)> {
        let stream: &[u8] = stream.as_ref();

        match stream.first() {
            Some(val) => Ok((*val, 1)),
            None => err!(InvalidPayloadSize, desc: "u8::decode()"),
        }
    }

    fn encode(&self) -> Result<Blob> {
        let mut data = [0_u8; 32];
        data[0] = *self;
        Ok(Blob::Small { data, size: 1 })
    }
}

impl Packetize for u16 {
    fn decode<T: AsRef<[u8]>>(stream: T) -> Result<(Self, usize)> {
        let stream: &[u8] = stream.as_ref();

        match stream {
            [a, b, ..] => Ok((u16::from_be_bytes([*a, *b]), 2)),
            _ => err!(InvalidPayloadSize, desc: "u16::decode()"),
        }
    }

    fn encode(&self) -> Result<Blob> {
        let mut data = [0_u8; 32];
        data[..2].copy_from_slice(&self.to_be_bytes());
        Ok(Blob::Small { data, size: 2 })
    }
}

/// MQTT string, 2-byte big-endian length prefix followed by utf8 bytes.
impl Packetize for String {
    fn decode<T: AsRef<[u8]>>(stream: T) -> Result<(Self, usize)> {
        let stream: &[u8] = stream.as_ref();

        let (bytes, n) = Vec::<u8>::decode(stream)?;
        match String::from_utf8(bytes) {
            Ok(s) => Ok((s, n)),
            Err(err) => err!(MalformedPacket, cause: err, "String::decode not utf8"),
        }
    }

    fn encode(&self) -> Result<Blob> {
        match self.len() {
            n if n > (u16::MAX as usize) => {
                err!(InvalidPayloadSize, desc: "String::encode too large {}", n)
            }
            n if n < 30 => {
                let mut data = [0_u8; 32];
                data[0..2].copy_from_slice(&(n as u16).to_be_bytes());
                data[2..2 + n].copy_from_slice(self.as_bytes());
                Ok(Blob::Small { data, size: 2 + n })
            }
            n => {
                let mut data = Vec::with_capacity(2 + n);
                data.extend_from_slice(&(n as u16).to_be_bytes());
                data.extend_from_slice(self.as_bytes());
                Ok(Blob::Large { data })
            }
        }
    }
}

/// Length prefixed binary data, same framing as MQTT string.
impl Packetize for Vec<u8> {
    fn decode<T: AsRef<[u8]>>(stream: T) -> Result<(Self, usize)> {
        let stream: &[u8] = stream.as_ref();

        let (len, _) = u16::decode(stream)?;
        let len = usize::from(len);
        if len + 2 > stream.len() {
            err!(InvalidPayloadSize, desc: "bytes::decode {} > {}", len + 2, stream.len())?;
        }
        Ok((stream[2..2 + len].to_vec(), 2 + len))
    }

    fn encode(&self) -> Result<Blob> {
        match self.len() {
            n if n > (u16::MAX as usize) => {
                err!(InvalidPayloadSize, desc: "bytes::encode too large {}", n)
            }
            n => {
                let mut data = Vec::with_capacity(2 + n);
                data.extend_from_slice(&(n as u16).to_be_bytes());
                data.extend_from_slice(self);
                Ok(Blob::Large { data })
            }
        }
    }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
