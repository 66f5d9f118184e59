//! Payload conversion between application values and publish payload bytes.

use std::fmt;

use crate::v3::{Publish, QoS};
use crate::{Error, ErrorKind, Result};

/// Convert an application value of type `T` to and from payload bytes.
pub trait PayloadConverter<T> {
    fn to_bytes(&self, data: T) -> Result<Vec<u8>>;

    fn from_bytes(&self, bytes: &[u8]) -> Result<T>;
}

/// UTF-8 string payload.
#[derive(Clone, Copy, Default, Debug)]
pub struct Utf8Converter;

impl PayloadConverter<String> for Utf8Converter {
    fn to_bytes(&self, data: String) -> Result<Vec<u8>> {
        Ok(data.into_bytes())
    }

    fn from_bytes(&self, bytes: &[u8]) -> Result<String> {
        err!(FailConvert, try: String::from_utf8(bytes.to_vec()), "payload not utf8")
    }
}

/// ASCII string payload, one byte per character.
#[derive(Clone, Copy, Default, Debug)]
pub struct AsciiConverter;

impl PayloadConverter<String> for AsciiConverter {
    fn to_bytes(&self, data: String) -> Result<Vec<u8>> {
        if data.is_ascii() {
            Ok(data.into_bytes())
        } else {
            err!(FailConvert, desc: "not ascii {:?}", data)
        }
    }

    fn from_bytes(&self, bytes: &[u8]) -> Result<String> {
        if bytes.is_ascii() {
            Ok(bytes.iter().map(|b| *b as char).collect())
        } else {
            err!(FailConvert, desc: "payload not ascii")
        }
    }
}

/// Single byte payload.
#[derive(Clone, Copy, Default, Debug)]
pub struct ByteConverter;

impl PayloadConverter<u8> for ByteConverter {
    fn to_bytes(&self, data: u8) -> Result<Vec<u8>> {
        Ok(vec![data])
    }

    fn from_bytes(&self, bytes: &[u8]) -> Result<u8> {
        match bytes {
            [byte] => Ok(*byte),
            _ => err!(FailConvert, desc: "byte payload of len {}", bytes.len()),
        }
    }
}

macro_rules! int_converter {
    ($(#[$doc:meta])* $name:ident, $type:ty) => {
        $(#[$doc])*
        #[derive(Clone, Copy, Default, Debug)]
        pub struct $name;

        impl PayloadConverter<$type> for $name {
            fn to_bytes(&self, data: $type) -> Result<Vec<u8>> {
                Ok(data.to_be_bytes().to_vec())
            }

            fn from_bytes(&self, bytes: &[u8]) -> Result<$type> {
                match <[u8; std::mem::size_of::<$type>()]>::try_from(bytes) {
                    Ok(arr) => Ok(<$type>::from_be_bytes(arr)),
                    Err(_) => err!(
                        FailConvert,
                        desc: "{} payload of len {}",
                        stringify!($type),
                        bytes.len()
                    ),
                }
            }
        }
    };
}

int_converter!(
    /// Big-endian 16-bit signed integer payload.
    I16Converter,
    i16
);
int_converter!(
    /// Big-endian 32-bit signed integer payload.
    I32Converter,
    i32
);
int_converter!(
    /// Big-endian 64-bit signed integer payload.
    I64Converter,
    i64
);

/// Opaque bytes, passed through.
#[derive(Clone, Copy, Default, Debug)]
pub struct RawConverter;

impl PayloadConverter<Vec<u8>> for RawConverter {
    fn to_bytes(&self, data: Vec<u8>) -> Result<Vec<u8>> {
        Ok(data)
    }

    fn from_bytes(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        Ok(bytes.to_vec())
    }
}

/// Application message received on a topic.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Message {
    pub topic: String,
    pub qos: QoS,
    pub retain: bool,
    pub duplicate: bool,
    pub payload: Vec<u8>,
}

impl From<Publish> for Message {
    fn from(publ: Publish) -> Message {
        Message {
            topic: publ.topic_name,
            qos: publ.qos,
            retain: publ.retain,
            duplicate: publ.duplicate,
            payload: publ.payload,
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Message<{:?},{:?},len:{}>", self.topic, self.qos, self.payload.len())
    }
}

impl Message {
    /// Convert payload using any [PayloadConverter].
    pub fn convert<T, C>(&self, converter: &C) -> Result<T>
    where
        C: PayloadConverter<T>,
    {
        converter.from_bytes(&self.payload)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.payload
    }

    pub fn to_utf8(&self) -> Result<String> {
        self.convert(&Utf8Converter)
    }

    pub fn to_ascii(&self) -> Result<String> {
        self.convert(&AsciiConverter)
    }

    pub fn to_byte(&self) -> Result<u8> {
        self.convert(&ByteConverter)
    }

    pub fn to_i16(&self) -> Result<i16> {
        self.convert(&I16Converter)
    }

    pub fn to_i32(&self) -> Result<i32> {
        self.convert(&I32Converter)
    }

    pub fn to_i64(&self) -> Result<i64> {
        self.convert(&I64Converter)
    }
}

#[cfg(test)]
#[path = "payload_test.rs"]
mod payload_test;
