use chrono::{DateTime, Utc};
use log::{debug, warn};

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, Weak};
use std::fmt;

use crate::connection::{Connection, Handler, HandlerID};
use crate::dispenser::SUBSCRIPTIONS_KEY;
use crate::v3::{Packet, PacketType, QoS, SubAck, Subscribe, UnSubscribe, UnsubAck};
use crate::{util, IdDispenser, PacketID, TopicFilter, TopicName};
use crate::{Error, ErrorKind, Result};

/// A subscription, pending until SUBACK and active after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    /// Identifier of the last SUBSCRIBE or UNSUBSCRIBE sent for this topic.
    pub packet_id: PacketID,
    pub created_time: DateTime<Utc>,
    pub topic: TopicFilter,
    /// Requested QoS while pending, granted QoS once active.
    pub qos: QoS,
}

impl fmt::Display for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Subscription<{},{:?},{}>", self.topic, self.qos, self.packet_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionStatus {
    DoesNotExist,
    Pending,
    Active,
}

/// Subscription registry. Pending subscriptions are keyed by message identifier,
/// active subscriptions by topic string.
pub struct SubscriptionRegistry {
    prefix: String,
    connection: Arc<Connection>,
    dispenser: Arc<IdDispenser>,
    pending: Mutex<BTreeMap<PacketID, Subscription>>,
    active: Mutex<BTreeMap<String, Subscription>>,
    handlers: Mutex<Vec<(PacketType, HandlerID)>>,
}

impl Drop for SubscriptionRegistry {
    fn drop(&mut self) {
        let handlers: Vec<(PacketType, HandlerID)> =
            util::lock(&self.handlers).drain(..).collect();
        for (pkt_type, id) in handlers.into_iter() {
            self.connection.unregister_for_message(pkt_type, id);
        }
    }
}

impl SubscriptionRegistry {
    /// Create a registry and register it with `connection` for SUBACK and UNSUBACK.
    pub fn new(
        connection: Arc<Connection>,
        dispenser: Arc<IdDispenser>,
    ) -> Arc<SubscriptionRegistry> {
        let registry = Arc::new(SubscriptionRegistry {
            prefix: format!("{}-subscriptions", connection.as_prefix()),
            connection: Arc::clone(&connection),
            dispenser,
            pending: Mutex::new(BTreeMap::new()),
            active: Mutex::new(BTreeMap::new()),
            handlers: Mutex::new(Vec::default()),
        });

        let mut ids = vec![];
        for pkt_type in [PacketType::SubAck, PacketType::UnsubAck] {
            let weak: Weak<SubscriptionRegistry> = Arc::downgrade(&registry);
            let handler: Handler = Arc::new(move |pkt: &Packet| -> Result<()> {
                match (weak.upgrade(), pkt) {
                    (Some(registry), Packet::SubAck(suback)) => registry.on_suback(suback),
                    (Some(registry), Packet::UnsubAck(unsuback)) => {
                        registry.on_unsuback(unsuback)
                    }
                    (_, _) => Ok(()),
                }
            });
            ids.push((pkt_type, connection.register_for_message(pkt_type, handler)));
        }
        *util::lock(&registry.handlers) = ids;

        registry
    }

    /// Send SUBSCRIBE for `topic` and hold it as pending until its SUBACK.
    pub fn subscribe(&self, topic: &str, qos: QoS) -> Result<Subscription> {
        let topic = TopicFilter::try_from(topic)?;
        if !qos.is_valid() {
            err!(InvalidInput, desc: "{} subscribe with {:?}", self.prefix, qos)?;
        }

        let packet_id = self.dispenser.next(SUBSCRIPTIONS_KEY);
        let sub = Subscription { packet_id, created_time: Utc::now(), topic, qos };

        util::lock(&self.pending).insert(packet_id, sub.clone());
        let pkt = Packet::Subscribe(Subscribe::new(packet_id, &sub.topic, qos));
        if let Err(err) = self.connection.send_message(&pkt) {
            util::lock(&self.pending).remove(&packet_id);
            return Err(err);
        }
        debug!("{} pending {}", self.prefix, sub);

        Ok(sub)
    }

    /// Move the pending subscription to active. Fail with `ProtocolError` if no
    /// subscription is pending for the acknowledged identifier.
    pub fn on_suback(&self, suback: &SubAck) -> Result<()> {
        let sub = util::lock(&self.pending).remove(&suback.packet_id);
        let mut sub = match sub {
            Some(sub) => sub,
            None => err!(
                ProtocolError,
                desc: "{} SUBACK for unknown packet_id {}",
                self.prefix,
                suback.packet_id
            )?,
        };

        if let Some(qos) = suback.return_codes.first() {
            sub.qos = *qos;
        }
        debug!("{} active {}", self.prefix, sub);
        util::lock(&self.active).insert(sub.topic.to_string(), sub);

        Ok(())
    }

    /// Send UNSUBSCRIBE for an active `topic`, the subscription stays active
    /// until its UNSUBACK.
    pub fn unsubscribe(&self, topic: &str) -> Result<PacketID> {
        let packet_id = match util::lock(&self.active).get_mut(topic) {
            Some(sub) => {
                sub.packet_id = self.dispenser.next(SUBSCRIPTIONS_KEY);
                sub.packet_id
            }
            None => err!(InvalidInput, desc: "{} not subscribed to {:?}", self.prefix, topic)?,
        };

        let pkt = Packet::UnSubscribe(UnSubscribe::new(packet_id, topic));
        self.connection.send_message(&pkt)?;

        Ok(packet_id)
    }

    /// Remove the active subscription carrying the acknowledged identifier, an
    /// unknown identifier is only logged.
    pub fn on_unsuback(&self, unsuback: &UnsubAck) -> Result<()> {
        let mut active = util::lock(&self.active);
        let topic = active
            .iter()
            .find(|(_, sub)| sub.packet_id == unsuback.packet_id)
            .map(|(topic, _)| topic.clone());

        match topic {
            Some(topic) => {
                active.remove(&topic);
                debug!("{} unsubscribed {:?}", self.prefix, topic);
            }
            None => warn!(
                "{} UNSUBACK for unknown packet_id {}",
                self.prefix, unsuback.packet_id
            ),
        }

        Ok(())
    }

    pub fn status(&self, topic: &str) -> SubscriptionStatus {
        if util::lock(&self.active).contains_key(topic) {
            return SubscriptionStatus::Active;
        }
        let pending = util::lock(&self.pending);
        match pending.values().any(|sub| &*sub.topic == topic) {
            true => SubscriptionStatus::Pending,
            false => SubscriptionStatus::DoesNotExist,
        }
    }

    /// Active subscriptions whose filter matches `topic`.
    pub fn matching(&self, topic: &TopicName) -> Vec<Subscription> {
        let active = util::lock(&self.active);
        active.values().filter(|sub| sub.topic.matches(topic)).cloned().collect()
    }

    pub fn to_active(&self) -> Vec<Subscription> {
        util::lock(&self.active).values().cloned().collect()
    }
}

#[cfg(test)]
#[path = "subscription_test.rs"]
mod subscription_test;
