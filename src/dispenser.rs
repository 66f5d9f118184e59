use log::trace;

use std::collections::HashMap;
use std::sync::Mutex;

use crate::{util, PacketID};

/// Key used to allocate message identifiers for SUBSCRIBE and UNSUBSCRIBE.
pub const SUBSCRIPTIONS_KEY: &str = "subscriptions";

/// Message identifier dispenser, keyed by an arbitrary string.
///
/// First call to [IdDispenser::next] for a key returns 0, every subsequent call
/// returns the previous value plus one, wrapping from 65535 back to 0. All keys
/// share a single lock.
#[derive(Default)]
pub struct IdDispenser {
    ids: Mutex<HashMap<String, PacketID>>,
}

impl IdDispenser {
    pub fn new() -> IdDispenser {
        IdDispenser::default()
    }

    /// Key used for publishes on `topic`.
    pub fn topic_key(topic: &str) -> String {
        format!("topic:{}", topic)
    }

    pub fn next(&self, key: &str) -> PacketID {
        let mut ids = util::lock(&self.ids);
        let id = match ids.get_mut(key) {
            Some(id) => {
                *id = id.wrapping_add(1);
                *id
            }
            None => {
                ids.insert(key.to_string(), 0);
                0
            }
        };
        trace!("dispenser key:{:?} id:{}", key, id);

        id
    }

    /// Last issued identifier for `key`, if any.
    pub fn current(&self, key: &str) -> Option<PacketID> {
        util::lock(&self.ids).get(key).copied()
    }

    /// Forget `key`, next allocation starts again from 0.
    pub fn reset(&self, key: &str) {
        util::lock(&self.ids).remove(key);
    }
}

#[cfg(test)]
#[path = "dispenser_test.rs"]
mod dispenser_test;
