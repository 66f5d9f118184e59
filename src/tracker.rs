//! QoS publish handshake, tracks in-flight publishes keyed by message identifier.
//!
//! Outbound,
//!
//! * QoS-0, PUBLISH is sent and forgotten.
//! * QoS-1, PUBLISH is held in `published` until the matching PUBACK.
//! * QoS-2, PUBLISH is held in `published`, PUBREC is answered with PUBREL and
//!   the entry is released on the matching PUBCOMP.
//!
//! Inbound,
//!
//! * QoS-0, delivered.
//! * QoS-1, delivered and acknowledged with PUBACK.
//! * QoS-2, held in `received` and answered with PUBREC, re-sent PUBLISH for the
//!   same identifier is not held again. On PUBREL the entry is released,
//!   delivered and answered with PUBCOMP.
//!
//! Identifiers are allocated per topic while `published` is keyed by identifier
//! alone. Two in-flight QoS-1/QoS-2 publishes on different topics can share an
//! identifier, the later one replaces the earlier entry and a warning is logged.

use log::{debug, warn};

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, Weak};

use crate::connection::{Connection, Handler, HandlerID};
use crate::v3::{Packet, PacketType, Pub, Publish, QoS};
use crate::{util, IdDispenser, Message, PacketID, TopicName};
use crate::{Error, ErrorKind, Result};

/// Callback for application messages, on QoS-2 it is invoked once per handshake.
pub type MessageCallback = Arc<dyn Fn(&Message) + Send + Sync>;

/// Transaction tracker for QoS-1 and QoS-2 publish handshakes.
pub struct Tracker {
    prefix: String,
    connection: Arc<Connection>,
    dispenser: Arc<IdDispenser>,
    published: Mutex<BTreeMap<PacketID, Publish>>,
    received: Mutex<BTreeMap<PacketID, Publish>>,
    callbacks: Mutex<Vec<MessageCallback>>,
    handlers: Mutex<Vec<(PacketType, HandlerID)>>,
}

impl Drop for Tracker {
    fn drop(&mut self) {
        self.unregister()
    }
}

impl Tracker {
    const PACKET_TYPES: [PacketType; 5] = [
        PacketType::Publish,
        PacketType::PubAck,
        PacketType::PubRec,
        PacketType::PubRel,
        PacketType::PubComp,
    ];

    /// Create a tracker and register it with `connection` for PUBLISH, PUBACK,
    /// PUBREC, PUBREL and PUBCOMP.
    pub fn new(connection: Arc<Connection>, dispenser: Arc<IdDispenser>) -> Arc<Tracker> {
        let tracker = Arc::new(Tracker {
            prefix: format!("{}-tracker", connection.as_prefix()),
            connection: Arc::clone(&connection),
            dispenser,
            published: Mutex::new(BTreeMap::new()),
            received: Mutex::new(BTreeMap::new()),
            callbacks: Mutex::new(Vec::default()),
            handlers: Mutex::new(Vec::default()),
        });

        let mut ids = Vec::with_capacity(Self::PACKET_TYPES.len());
        for pkt_type in Self::PACKET_TYPES.iter() {
            let weak: Weak<Tracker> = Arc::downgrade(&tracker);
            let handler: Handler = Arc::new(move |pkt: &Packet| -> Result<()> {
                match weak.upgrade() {
                    Some(tracker) => tracker.handle_packet(pkt),
                    None => Ok(()),
                }
            });
            ids.push((*pkt_type, connection.register_for_message(*pkt_type, handler)));
        }
        *util::lock(&tracker.handlers) = ids;

        tracker
    }

    /// Add a callback for delivered application messages.
    pub fn add_callback(&self, callback: MessageCallback) {
        util::lock(&self.callbacks).push(callback)
    }

    /// Publish `payload` on `topic`. The message identifier is allocated from the
    /// topic's key and returned, QoS-0 publish allocates one but does not carry it.
    pub fn publish(&self, topic: &str, qos: QoS, payload: Vec<u8>) -> Result<PacketID> {
        let topic = TopicName::try_from(topic)?;
        if !qos.is_valid() {
            err!(InvalidInput, desc: "{} publish with {:?}", self.prefix, qos)?;
        }

        let packet_id = self.dispenser.next(&IdDispenser::topic_key(&topic));
        let publ = Publish::new(&topic, qos, packet_id, payload);

        if qos != QoS::AtMostOnce {
            let old = util::lock(&self.published).insert(packet_id, publ.clone());
            if old.is_some() {
                warn!("{} in-flight publish {} replaced", self.prefix, packet_id);
            }
        }

        match self.connection.send_message(&Packet::Publish(publ)) {
            Ok(()) => {
                debug!("{} published {:?} {} {:?}", self.prefix, &*topic, packet_id, qos);
                Ok(packet_id)
            }
            Err(err) => {
                if qos != QoS::AtMostOnce {
                    util::lock(&self.published).remove(&packet_id);
                }
                Err(err)
            }
        }
    }

    /// Handle packets dispatched by the connection.
    pub fn handle_packet(&self, pkt: &Packet) -> Result<()> {
        match pkt {
            Packet::Publish(publ) => self.on_publish(publ),
            Packet::PubAck(puback) => self.on_puback(puback.packet_id),
            Packet::PubRec(pubrec) => self.on_pubrec(pubrec.packet_id),
            Packet::PubRel(pubrel) => self.on_pubrel(pubrel.packet_id),
            Packet::PubComp(pubcomp) => self.on_pubcomp(pubcomp.packet_id),
            pkt => err!(InvalidInput, desc: "{} unexpected packet {}", self.prefix, pkt),
        }
    }

    pub fn published_ids(&self) -> Vec<PacketID> {
        util::lock(&self.published).keys().copied().collect()
    }

    pub fn received_ids(&self) -> Vec<PacketID> {
        util::lock(&self.received).keys().copied().collect()
    }

    fn on_publish(&self, publ: &Publish) -> Result<()> {
        if let Err(err) = TopicName::try_from(publ.topic_name.as_str()) {
            warn!("{} dropping {}: {}", self.prefix, publ, err);
            return Ok(());
        }

        match (publ.qos, publ.packet_id) {
            (QoS::AtMostOnce, _) => self.deliver(publ),
            (QoS::AtLeastOnce, Some(packet_id)) => {
                self.deliver(publ);
                self.send(Packet::PubAck(Pub::new_puback(packet_id)))?;
            }
            (QoS::ExactlyOnce, Some(packet_id)) => {
                {
                    let mut received = util::lock(&self.received);
                    match received.get(&packet_id) {
                        Some(_) => debug!("{} duplicate publish {}", self.prefix, packet_id),
                        None => {
                            received.insert(packet_id, publ.clone());
                        }
                    }
                }
                self.send(Packet::PubRec(Pub::new_pubrec(packet_id)))?;
            }
            (qos, packet_id) => err!(
                MalformedPacket,
                desc: "{} publish qos:{:?} packet_id:{:?}",
                self.prefix,
                qos,
                packet_id
            )?,
        }

        Ok(())
    }

    fn on_pubrel(&self, packet_id: PacketID) -> Result<()> {
        let publ = util::lock(&self.received).remove(&packet_id);
        match publ {
            Some(publ) => {
                self.deliver(&publ);
                self.send(Packet::PubComp(Pub::new_pubcomp(packet_id)))
            }
            None => {
                debug!("{} PUBREL for unknown packet_id {}", self.prefix, packet_id);
                Ok(())
            }
        }
    }

    fn on_puback(&self, packet_id: PacketID) -> Result<()> {
        let mut published = util::lock(&self.published);
        match published.get(&packet_id).map(|publ| publ.qos) {
            Some(QoS::AtLeastOnce) => {
                published.remove(&packet_id);
                debug!("{} QoS1 publish {} complete", self.prefix, packet_id);
            }
            Some(qos) => {
                warn!("{} PUBACK for {:?} publish {}", self.prefix, qos, packet_id)
            }
            None => warn!("{} PUBACK for unknown packet_id {}", self.prefix, packet_id),
        }
        Ok(())
    }

    fn on_pubrec(&self, packet_id: PacketID) -> Result<()> {
        let qos = util::lock(&self.published).get(&packet_id).map(|publ| publ.qos);
        match qos {
            Some(QoS::ExactlyOnce) => {
                self.send(Packet::PubRel(Pub::new_pubrel(packet_id)))?;
                debug!("{} QoS2 publish {} released", self.prefix, packet_id);
            }
            Some(qos) => warn!("{} PUBREC for {:?} publish {}", self.prefix, qos, packet_id),
            None => warn!("{} PUBREC for unknown packet_id {}", self.prefix, packet_id),
        }
        Ok(())
    }

    fn on_pubcomp(&self, packet_id: PacketID) -> Result<()> {
        let mut published = util::lock(&self.published);
        match published.get(&packet_id).map(|publ| publ.qos) {
            Some(QoS::ExactlyOnce) => {
                published.remove(&packet_id);
                debug!("{} QoS2 publish {} complete", self.prefix, packet_id);
            }
            Some(qos) => {
                warn!("{} PUBCOMP for {:?} publish {}", self.prefix, qos, packet_id)
            }
            None => warn!("{} PUBCOMP for unknown packet_id {}", self.prefix, packet_id),
        }
        Ok(())
    }

    fn deliver(&self, publ: &Publish) {
        let callbacks: Vec<MessageCallback> = util::lock(&self.callbacks).clone();
        let msg = Message::from(publ.clone());
        for callback in callbacks.iter() {
            callback(&msg)
        }
    }

    fn send(&self, pkt: Packet) -> Result<()> {
        self.connection.send_message(&pkt)
    }

    fn unregister(&self) {
        let handlers: Vec<(PacketType, HandlerID)> =
            util::lock(&self.handlers).drain(..).collect();
        for (pkt_type, id) in handlers.into_iter() {
            self.connection.unregister_for_message(pkt_type, id);
        }
    }
}

#[cfg(test)]
#[path = "tracker_test.rs"]
mod tracker_test;
