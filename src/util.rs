//! Helpers shared by the codec, the connection and the `mqdump` tool.

use std::sync::{Mutex, MutexGuard};

use crate::{Error, ErrorKind, Result};

/// Skip `n` bytes from the stream, `n` can be at most the stream's length.
pub fn advance(stream: &[u8], n: usize) -> Result<&[u8]> {
    if n <= stream.len() {
        Ok(&stream[n..])
    } else {
        err!(InvalidPayloadSize, desc: "insufficient bytes in packet {} > {}", n, stream.len())
    }
}

/// Return the frame boundary, fixed-header length plus remaining-length, making
/// sure that many bytes are available in the stream.
pub fn frame_len(fh_len: usize, remaining_len: u32, stream: &[u8]) -> Result<usize> {
    let m = fh_len + usize::try_from(remaining_len)?;
    if m <= stream.len() {
        Ok(m)
    } else {
        err!(InvalidPayloadSize, desc: "frame {} > available {}", m, stream.len())
    }
}

/// Acquire the lock, a poisoned lock is taken over as is. Critical sections in
/// this package never leave the guarded state half-updated.
pub fn lock<T>(mu: &Mutex<T>) -> MutexGuard<T> {
    mu.lock().unwrap_or_else(|err| err.into_inner())
}

/// Render bytes as space separated hex, used while tracing frames.
pub fn to_hex(bytes: &[u8]) -> String {
    let hexs: Vec<String> = bytes.iter().map(|b| format!("{:02x}", b)).collect();
    hexs.join(" ")
}

#[cfg(test)]
#[path = "util_test.rs"]
mod util_test;
