//! Client composes the connection, transaction tracker and subscription registry
//! over an application supplied [Transport].
//!
//! Clients can send CONNECT, PUBLISH, PUBACK, PUBREC, PUBREL, PUBCOMP,
//! SUBSCRIBE, UNSUBSCRIBE, PINGREQ, DISCONNECT packets
//!
//! Clients can recieve CONNACK, PUBLISH, PUBACK, PUBREC, PUBREL, PUBCOMP,
//! SUBACK, UNSUBACK, PINGRESP packets

use log::{debug, info};

use std::sync::{Arc, Weak};

use crate::connection::{Connection, ConnectionState, Handler, HandlerID, Transport};
use crate::subscription::{SubscriptionRegistry, SubscriptionStatus};
use crate::tracker::{MessageCallback, Tracker};
use crate::v3::{ConnAck, Connect, ConnectPayload, Packet, PacketType, QoS};
use crate::{Config, IdDispenser, Message, PacketID, Packetize, PayloadConverter, TopicName};
use crate::{Error, ErrorDetail, ErrorKind, Result};

pub struct ClientBuilder {
    /// Client identifier, refer [Config::client_id].
    pub client_id: String,
    /// Refer [Config::max_client_id_len].
    pub max_client_id_len: usize,
    // CONNECT options
    pub clean_start: bool,
    pub keep_alive: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub will_topic: Option<String>,
    pub will_message: Option<Vec<u8>>,
    pub will_qos: QoS,
    pub will_retain: bool,
}

impl Default for ClientBuilder {
    fn default() -> ClientBuilder {
        let config = Config::default();
        ClientBuilder {
            client_id: config.client_id(),
            max_client_id_len: config.max_client_id_len(),
            clean_start: config.clean_start(),
            keep_alive: config.keep_alive(),
            username: None,
            password: None,
            will_topic: None,
            will_message: None,
            will_qos: QoS::AtMostOnce,
            will_retain: false,
        }
    }
}

impl ClientBuilder {
    pub fn from_config(config: &Config) -> Result<ClientBuilder> {
        let mut builder = ClientBuilder {
            client_id: config.client_id(),
            max_client_id_len: config.max_client_id_len(),
            clean_start: config.clean_start(),
            keep_alive: config.keep_alive(),
            username: config.username.clone(),
            password: config.password.clone(),
            ..ClientBuilder::default()
        };
        if let Some(will) = &config.will {
            builder.will_topic = Some(will.topic.clone());
            builder.will_message = Some(will.message.as_bytes().to_vec());
            builder.will_qos = will.qos()?;
            builder.will_retain = will.retain();
        }

        Ok(builder)
    }

    /// Build a client over `transport`. CONNECT packet is prepared here, hence a
    /// client identifier longer than `max_client_id_len` fails with
    /// `ClientIdentifierTooLong` before anything is sent.
    pub fn build(self, transport: Arc<dyn Transport>) -> Result<Client> {
        let connect = self.to_connect()?;

        let connection = Arc::new(Connection::new(&self.client_id, transport, self.keep_alive));
        let dispenser = Arc::new(IdDispenser::new());
        let tracker = Tracker::new(Arc::clone(&connection), Arc::clone(&dispenser));
        let subscriptions =
            SubscriptionRegistry::new(Arc::clone(&connection), Arc::clone(&dispenser));

        let weak: Weak<Connection> = Arc::downgrade(&connection);
        let handler: Handler = Arc::new(move |pkt: &Packet| -> Result<()> {
            match (weak.upgrade(), pkt) {
                (Some(connection), Packet::ConnAck(connack)) => on_connack(&connection, connack),
                (_, _) => Ok(()),
            }
        });
        let connack_handler = connection.register_for_message(PacketType::ConnAck, handler);

        let client = Client {
            client_id: self.client_id,
            connect,
            connection,
            tracker,
            subscriptions,
            connack_handler,
        };
        Ok(client)
    }

    fn to_connect(&self) -> Result<Connect> {
        let mut payload = ConnectPayload::new(&self.client_id, self.max_client_id_len)?;
        if let (Some(topic), Some(message)) = (&self.will_topic, &self.will_message) {
            TopicName::try_from(topic.as_str())?;
            payload = payload.with_will(topic.clone(), message.clone());
        }
        if let Some(username) = &self.username {
            payload = payload.with_credentials(username.clone(), self.password.clone());
        }

        let mut connect = Connect::new(payload, self.keep_alive, self.clean_start);
        if connect.flags.is_will_flag() {
            if !self.will_qos.is_valid() {
                err!(InvalidInput, desc: "will with {:?}", self.will_qos)?;
            }
            connect.set_will_options(self.will_qos, self.will_retain);
        }

        Ok(connect)
    }
}

fn on_connack(connection: &Connection, connack: &ConnAck) -> Result<()> {
    let prefix = connection.as_prefix();
    match connection.state() {
        ConnectionState::Connecting if connack.is_accepted() => {
            connection.set_state(ConnectionState::Connected);
            info!("{} connected", prefix);
            Ok(())
        }
        ConnectionState::Connecting => {
            connection.set_state(ConnectionState::Faulted);
            err!(
                ProtocolError,
                detail: ErrorDetail::State(ConnectionState::Faulted),
                "{} connection refused {}",
                prefix,
                connack.return_code
            )
        }
        state => err!(
            ProtocolError,
            detail: ErrorDetail::State(state),
            "{} unexpected CONNACK in state {}",
            prefix,
            state
        ),
    }
}

/// MQTT version 3 client. Received frames are fed through [Client::on_frame],
/// from a reader thread, while application threads publish and subscribe.
pub struct Client {
    client_id: String,
    connect: Connect,
    connection: Arc<Connection>,
    tracker: Arc<Tracker>,
    subscriptions: Arc<SubscriptionRegistry>,
    connack_handler: HandlerID,
}

impl Drop for Client {
    fn drop(&mut self) {
        let id = self.connack_handler;
        self.connection.unregister_for_message(PacketType::ConnAck, id);
    }
}

impl Client {
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn as_connection(&self) -> &Connection {
        &self.connection
    }

    /// Send CONNECT, connection is established when CONNACK is received.
    pub fn connect(&self) -> Result<()> {
        let state = self.connection.state();
        match state {
            ConnectionState::Disconnected | ConnectionState::Faulted => (),
            state => err!(
                ConnectionError,
                detail: ErrorDetail::State(state),
                "{} connect in state {}",
                self.client_id,
                state
            )?,
        }

        let pkt = Packet::Connect(self.connect.clone());
        pkt.encode()?;

        self.connection.set_state(ConnectionState::Connecting);
        match self.connection.send_message(&pkt) {
            Ok(()) => Ok(()),
            Err(err) => {
                // transport failure leaves the connection Faulted.
                if self.connection.state() == ConnectionState::Connecting {
                    self.connection.set_state(state);
                }
                Err(err)
            }
        }
    }

    /// Send DISCONNECT and move to `Disconnected`.
    pub fn disconnect(&self) -> Result<()> {
        self.connection.send_message(&Packet::Disconnect)?;
        self.connection.set_state(ConnectionState::Disconnected);
        debug!("{} disconnected", self.client_id);

        Ok(())
    }

    /// Publish raw `payload` on `topic`, return the allocated message identifier.
    pub fn publish(&self, topic: &str, qos: QoS, payload: Vec<u8>) -> Result<PacketID> {
        self.tracker.publish(topic, qos, payload)
    }

    /// Publish `data` converted to bytes using `converter`.
    pub fn publish_with<T, C>(
        &self,
        topic: &str,
        qos: QoS,
        converter: &C,
        data: T,
    ) -> Result<PacketID>
    where
        C: PayloadConverter<T>,
    {
        let payload = converter.to_bytes(data)?;
        self.tracker.publish(topic, qos, payload)
    }

    /// Subscribe to `topic`, return the SUBSCRIBE message identifier.
    pub fn subscribe(&self, topic: &str, qos: QoS) -> Result<PacketID> {
        Ok(self.subscriptions.subscribe(topic, qos)?.packet_id)
    }

    /// Unsubscribe from an active `topic`, return the UNSUBSCRIBE message identifier.
    pub fn unsubscribe(&self, topic: &str) -> Result<PacketID> {
        self.subscriptions.unsubscribe(topic)
    }

    pub fn subscription_status(&self, topic: &str) -> SubscriptionStatus {
        self.subscriptions.status(topic)
    }

    /// Register `callback` for messages received on any active subscription.
    pub fn on_message(&self, callback: MessageCallback) {
        let weak: Weak<SubscriptionRegistry> = Arc::downgrade(&self.subscriptions);
        let prefix = self.client_id.clone();
        self.tracker.add_callback(Arc::new(move |msg: &Message| {
            let subscribed = match (weak.upgrade(), TopicName::try_from(msg.topic.as_str())) {
                (Some(subs), Ok(topic)) => !subs.matching(&topic).is_empty(),
                (_, _) => false,
            };
            match subscribed {
                true => callback(msg),
                false => debug!("{} no subscription for {}", prefix, msg),
            }
        }))
    }

    /// Send PINGREQ if keep alive is due, fail with `ConnectionError` if the
    /// broker is silent for too long.
    pub fn ping_if_due(&self) -> Result<bool> {
        self.connection.check_alive()?;
        match self.connection.state() {
            ConnectionState::Connected if self.connection.is_ping_due() => {
                self.connection.send_message(&Packet::PingReq)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Feed one received frame, refer [Connection::on_frame].
    pub fn on_frame(&self, frame: &[u8]) -> Result<Packet> {
        self.connection.on_frame(frame)
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod client_test;
