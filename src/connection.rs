//! Connection layer, owns the transport handle, connection state and the
//! per message-type dispatch table.

use log::{debug, error, trace};

use std::collections::BTreeMap;
use std::sync::{
    atomic::{AtomicU64, Ordering::SeqCst},
    Arc, Mutex,
};
use std::{fmt, time};

use crate::v3::{Packet, PacketType};
use crate::{util, KeepAlive, Packetize};
use crate::{Error, ErrorDetail, ErrorKind, Result};

/// Byte sink for encoded packets. Socket ownership, buffering and reconnect are
/// left to the implementation.
pub trait Transport: Send + Sync {
    /// Send one fully encoded packet.
    fn send(&self, data: &[u8]) -> Result<()>;
}

/// State of a client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnecting,
    Disconnected,
    Faulted,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Callback invoked for every received packet of the registered type.
pub type Handler = Arc<dyn Fn(&Packet) -> Result<()> + Send + Sync>;

/// Identifies a registered handler, used to unregister it.
pub type HandlerID = u64;

/// Connection, shared between the application threads that send and the reader
/// thread that feeds received frames via [Connection::on_frame].
pub struct Connection {
    prefix: String,
    transport: Arc<dyn Transport>,
    state: Mutex<ConnectionState>,
    handlers: Mutex<BTreeMap<PacketType, Vec<(HandlerID, Handler)>>>,
    next_handler_id: AtomicU64,
    keep_alive: Mutex<KeepAlive>,
}

impl Connection {
    pub fn new(prefix: &str, transport: Arc<dyn Transport>, keep_alive: u16) -> Connection {
        Connection {
            prefix: prefix.to_string(),
            transport,
            state: Mutex::new(ConnectionState::Disconnected),
            handlers: Mutex::new(BTreeMap::new()),
            next_handler_id: AtomicU64::new(1),
            keep_alive: Mutex::new(KeepAlive::new(prefix, keep_alive)),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *util::lock(&self.state)
    }

    pub fn set_state(&self, state: ConnectionState) {
        let mut current = util::lock(&self.state);
        if *current != state {
            debug!("{} state {} -> {}", self.prefix, *current, state);
            *current = state;
        }
    }

    /// Register `handler` for packets of type `pkt_type`. Handlers for the same
    /// type are invoked in registration order.
    pub fn register_for_message(&self, pkt_type: PacketType, handler: Handler) -> HandlerID {
        let id = self.next_handler_id.fetch_add(1, SeqCst);
        util::lock(&self.handlers).entry(pkt_type).or_default().push((id, handler));
        trace!("{} registered handler {} for {}", self.prefix, id, pkt_type);

        id
    }

    /// Remove a handler, return false if it was not registered for `pkt_type`.
    pub fn unregister_for_message(&self, pkt_type: PacketType, id: HandlerID) -> bool {
        let mut handlers = util::lock(&self.handlers);
        match handlers.get_mut(&pkt_type) {
            Some(list) => match list.iter().position(|(hid, _)| *hid == id) {
                Some(off) => {
                    list.remove(off);
                    true
                }
                None => false,
            },
            None => false,
        }
    }

    /// Encode and send `pkt`. CONNECT and DISCONNECT can be sent while connecting,
    /// rest of the packets need an established connection.
    pub fn send_message(&self, pkt: &Packet) -> Result<()> {
        use ConnectionState::{Connected, Connecting};

        let state = self.state();
        match (pkt.to_packet_type(), state) {
            (_, Connected) => (),
            (PacketType::Connect | PacketType::Disconnect, Connecting) => (),
            (pkt_type, state) => err!(
                ConnectionError,
                detail: ErrorDetail::State(state),
                "{} cannot send {} in state {}",
                self.prefix,
                pkt_type,
                state
            )?,
        }

        let blob = pkt.encode()?;
        trace!("{} send {} [{}]", self.prefix, pkt, util::to_hex(blob.as_ref()));

        match self.transport.send(blob.as_ref()) {
            Ok(()) => {
                match pkt {
                    Packet::Connect(_) => util::lock(&self.keep_alive).reset(),
                    _ => util::lock(&self.keep_alive).sent(),
                }
                debug!("{} sent {}", self.prefix, pkt);
                Ok(())
            }
            Err(err) => {
                self.set_state(ConnectionState::Faulted);
                err!(
                    ConnectionError,
                    detail: ErrorDetail::State(ConnectionState::Faulted),
                    "{} transport failed sending {}: {}",
                    self.prefix,
                    pkt,
                    err
                )
            }
        }
    }

    /// Decode one fully framed packet and dispatch it to registered handlers.
    ///
    /// Codec errors are returned to the caller and fault the connection, the
    /// stream position can no longer be trusted. Handler errors are logged.
    pub fn on_frame(&self, frame: &[u8]) -> Result<Packet> {
        trace!("{} recv [{}]", self.prefix, util::to_hex(frame));

        let pkt = match Packet::decode(frame) {
            Ok((pkt, _)) => pkt,
            Err(err) => {
                self.set_state(ConnectionState::Faulted);
                return Err(err);
            }
        };
        util::lock(&self.keep_alive).received();
        debug!("{} received {}", self.prefix, pkt);

        let handlers: Vec<(HandlerID, Handler)> = {
            let handlers = util::lock(&self.handlers);
            handlers.get(&pkt.to_packet_type()).cloned().unwrap_or_default()
        };
        for (id, handler) in handlers.iter() {
            if let Err(err) = handler(&pkt) {
                error!("{} handler {} failed for {}: {}", self.prefix, id, pkt, err);
            }
        }

        Ok(pkt)
    }

    /// Return whether a PINGREQ should be sent now.
    pub fn is_ping_due(&self) -> bool {
        util::lock(&self.keep_alive).is_ping_due(time::Instant::now())
    }

    /// Fail if the broker has been silent for longer than keep-alive allows.
    /// Liveness is checked only while connected.
    pub fn check_alive(&self) -> Result<()> {
        let state = self.state();
        if state != ConnectionState::Connected {
            return Ok(());
        }

        let res = util::lock(&self.keep_alive).expired(time::Instant::now(), state);
        if res.is_err() {
            self.set_state(ConnectionState::Faulted);
        }
        res
    }

    pub fn as_prefix(&self) -> &str {
        &self.prefix
    }
}

#[cfg(test)]
#[path = "connection_test.rs"]
mod connection_test;
