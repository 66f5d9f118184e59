//! Incremental frame reader.
//!
//! Frame boundaries are discovered from the stream itself, first the fixed-header
//! byte, then the remaining-length varint one byte at a time, then exactly
//! remaining-length bytes. Reader never consumes bytes beyond the current frame.

use log::trace;

use std::{io, mem};

use crate::{ConnectionState, Packetize, VarU32, MAX_REMAINING_LEN};
use crate::{Error, ErrorDetail, ErrorKind, Result};

/// Default upper bound on a frame, the largest remaining-length plus header.
pub const DEF_MAX_FRAME_SIZE: usize = (MAX_REMAINING_LEN as usize) + 5;

enum ReadState {
    Header { data: Vec<u8> },
    Remain { data: Vec<u8>, filled: usize },
}

impl Default for ReadState {
    fn default() -> ReadState {
        ReadState::Header { data: Vec::with_capacity(5) }
    }
}

enum Step {
    Again(ReadState),
    Block(ReadState),
    Done(Vec<u8>),
}

/// Read whole MQTT frames from a byte stream. Works with blocking and
/// non-blocking streams, partial progress is kept across `WouldBlock`.
pub struct FrameReader<R> {
    prefix: String,
    stream: R,
    max_size: usize,
    state: ReadState,
}

impl<R> FrameReader<R>
where
    R: io::Read,
{
    pub fn new(prefix: &str, stream: R) -> FrameReader<R> {
        FrameReader {
            prefix: prefix.to_string(),
            stream,
            max_size: DEF_MAX_FRAME_SIZE,
            state: ReadState::default(),
        }
    }

    /// Frames larger than `max_size`, including the fixed header, fail with
    /// `InvalidPayloadSize`.
    pub fn set_max_size(&mut self, max_size: usize) -> &mut Self {
        self.max_size = max_size;
        self
    }

    /// Read the next frame, fixed-header included. Return `None` if the stream
    /// would block before the frame is complete.
    ///
    /// End of stream fails with `ConnectionError`. After any error the reader
    /// starts afresh, though the stream position is no longer trustworthy.
    pub fn read_frame(&mut self) -> Result<Option<Vec<u8>>> {
        loop {
            let state = mem::take(&mut self.state);
            match self.step(state)? {
                Step::Again(state) => self.state = state,
                Step::Block(state) => {
                    self.state = state;
                    break Ok(None);
                }
                Step::Done(frame) => {
                    trace!("{} frame len:{}", self.prefix, frame.len());
                    break Ok(Some(frame));
                }
            }
        }
    }

    pub fn into_inner(self) -> R {
        self.stream
    }

    fn step(&mut self, state: ReadState) -> Result<Step> {
        match state {
            ReadState::Header { mut data } => {
                let mut byte = [0_u8; 1];
                match self.stream.read(&mut byte) {
                    Ok(0) if data.is_empty() => err!(
                        ConnectionError,
                        detail: ErrorDetail::State(ConnectionState::Disconnected),
                        "{} end of stream",
                        self.prefix
                    ),
                    Ok(0) => err!(
                        ConnectionError,
                        detail: ErrorDetail::State(ConnectionState::Disconnected),
                        "{} end of stream within header {:?}",
                        self.prefix,
                        data
                    ),
                    Ok(_) => {
                        data.push(byte[0]);
                        self.to_remain(data)
                    }
                    Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                        Ok(Step::Block(ReadState::Header { data }))
                    }
                    Err(err) if err.kind() == io::ErrorKind::Interrupted => {
                        Ok(Step::Again(ReadState::Header { data }))
                    }
                    Err(err) => err!(IOError, cause: err, "{} reading header", self.prefix),
                }
            }
            ReadState::Remain { mut data, filled } => {
                match self.stream.read(&mut data[filled..]) {
                    Ok(0) => err!(
                        ConnectionError,
                        detail: ErrorDetail::State(ConnectionState::Disconnected),
                        "{} end of stream within frame {}/{}",
                        self.prefix,
                        filled,
                        data.len()
                    ),
                    Ok(n) if (filled + n) == data.len() => Ok(Step::Done(data)),
                    Ok(n) => Ok(Step::Again(ReadState::Remain { data, filled: filled + n })),
                    Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                        Ok(Step::Block(ReadState::Remain { data, filled }))
                    }
                    Err(err) if err.kind() == io::ErrorKind::Interrupted => {
                        Ok(Step::Again(ReadState::Remain { data, filled }))
                    }
                    Err(err) => err!(IOError, cause: err, "{} reading frame", self.prefix),
                }
            }
        }
    }

    // data[0] is the fixed-header byte, rest is remaining-length read so far.
    fn to_remain(&self, mut data: Vec<u8>) -> Result<Step> {
        let more = match data.last() {
            Some(byte) => (byte & 0x80) != 0,
            None => true,
        };
        if data.len() < 2 || (more && data.len() < 5) {
            return Ok(Step::Again(ReadState::Header { data }));
        }

        let (remaining_len, _) = VarU32::decode(&data[1..])?;
        let hdr_len = data.len();
        let frame_len = hdr_len + usize::try_from(*remaining_len)?;
        if frame_len > self.max_size {
            err!(
                InvalidPayloadSize,
                desc: "{} frame {} > max {}",
                self.prefix,
                frame_len,
                self.max_size
            )?
        }

        if frame_len == hdr_len {
            Ok(Step::Done(data))
        } else {
            data.resize(frame_len, 0);
            Ok(Step::Again(ReadState::Remain { data, filled: hdr_len }))
        }
    }
}

#[cfg(test)]
#[path = "framer_test.rs"]
mod framer_test;
