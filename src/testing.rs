//! Test helpers shared by unit tests.

use std::sync::{
    atomic::{AtomicBool, Ordering::SeqCst},
    Mutex,
};

use crate::v3::Packet;
use crate::{Error, ErrorKind, Packetize, Result, Transport};

/// Transport that records every sent frame.
#[derive(Default)]
pub struct MockTransport {
    frames: Mutex<Vec<Vec<u8>>>,
    broken: AtomicBool,
}

impl Transport for MockTransport {
    fn send(&self, data: &[u8]) -> Result<()> {
        if self.broken.load(SeqCst) {
            err!(IOError, desc: "mock transport broken")
        } else {
            self.frames.lock().unwrap().push(data.to_vec());
            Ok(())
        }
    }
}

impl MockTransport {
    pub fn set_broken(&self, broken: bool) {
        self.broken.store(broken, SeqCst)
    }

    /// Drain and decode all sent frames.
    pub fn take_packets(&self) -> Vec<Packet> {
        let frames: Vec<Vec<u8>> = self.frames.lock().unwrap().drain(..).collect();
        frames.iter().map(|f| Packet::decode(f).unwrap().0).collect()
    }

    pub fn len(&self) -> usize {
        self.frames.lock().unwrap().len()
    }
}
