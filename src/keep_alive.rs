use log::debug;

use std::time;

use crate::{ConnectionState, Error, ErrorDetail, ErrorKind, Result};

/// Keep alive bookkeeping for a client connection.
///
/// Every outbound packet resets the ping timer, a PINGREQ is due only when nothing
/// was sent for a full keep-alive interval. Every inbound packet resets the
/// liveness timer, broker is considered gone if nothing arrives for one and a half
/// times the interval.
pub struct KeepAlive {
    prefix: String,
    interval: Option<time::Duration>,
    sent_at: time::Instant,
    received_at: time::Instant,
}

impl KeepAlive {
    /// Factor applied on the keep-alive interval before declaring the broker dead.
    pub const EXPIRY_FACTOR: f32 = 1.5;

    /// Create keep-alive bookkeeping for `keep_alive` seconds, 0 disables it.
    pub fn new(prefix: &str, keep_alive: u16) -> KeepAlive {
        let interval = match keep_alive {
            0 => None,
            secs => Some(time::Duration::from_secs(u64::from(secs))),
        };
        let prefix = format!("{}-keepalive", prefix);
        let now = time::Instant::now();
        KeepAlive { prefix, interval, sent_at: now, received_at: now }
    }

    pub fn interval(&self) -> Option<time::Duration> {
        self.interval
    }

    /// Mark that a packet was sent.
    pub fn sent(&mut self) {
        self.sent_at = time::Instant::now();
    }

    /// Mark that a packet was received.
    pub fn received(&mut self) {
        self.received_at = time::Instant::now();
    }

    /// Restart both timers, called when CONNECT is sent.
    pub fn reset(&mut self) {
        let now = time::Instant::now();
        self.sent_at = now;
        self.received_at = now;
    }

    /// Return whether a PINGREQ is due at `now`.
    pub fn is_ping_due(&self, now: time::Instant) -> bool {
        match self.interval {
            Some(interval) => now >= self.sent_at + interval,
            None => false,
        }
    }

    /// Fail with `ConnectionError`, carrying `state`, if nothing was received
    /// for too long.
    pub fn expired(&self, now: time::Instant, state: ConnectionState) -> Result<()> {
        match self.interval {
            Some(interval) => {
                let limit = interval.mul_f32(Self::EXPIRY_FACTOR);
                if now < self.received_at + limit {
                    Ok(())
                } else {
                    debug!("{} silent since {:?}", self.prefix, self.received_at);
                    err!(
                        ConnectionError,
                        detail: ErrorDetail::State(state),
                        "{} keep alive expired received_at:{:?} limit:{:?}",
                        self.prefix,
                        self.received_at,
                        limit
                    )
                }
            }
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "keep_alive_test.rs"]
mod keep_alive_test;
