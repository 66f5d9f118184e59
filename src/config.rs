use serde::Deserialize;

use std::{fs, path};

use crate::v3::QoS;
use crate::{Error, ErrorKind, Result, MAX_CLIENT_ID_LEN};

/// Client configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// Client identifier sent in CONNECT.
    /// * **Default**: generated, refer to [Config::client_id]
    pub client_id: Option<String>,

    /// Keep alive interval in seconds, sent in CONNECT. ZERO disables keep alive.
    /// * **Default**: [Config::DEF_KEEP_ALIVE]
    pub keep_alive: Option<u16>,

    /// Ask the broker to discard any previous session for this client.
    /// * **Default**: [Config::DEF_CLEAN_START]
    pub clean_start: Option<bool>,

    /// Maximum length of client identifier, longer identifiers are rejected before
    /// CONNECT is encoded.
    /// * **Default**: [MAX_CLIENT_ID_LEN]
    pub max_client_id_len: Option<usize>,

    pub username: Option<String>,
    pub password: Option<String>,

    /// Will message, published by the broker if this client goes away without
    /// a DISCONNECT.
    /// * **Default**: None
    pub will: Option<ConfigWill>,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            client_id: None,
            keep_alive: Some(Self::DEF_KEEP_ALIVE),
            clean_start: Some(Self::DEF_CLEAN_START),
            max_client_id_len: Some(MAX_CLIENT_ID_LEN),
            username: None,
            password: None,
            will: None,
        }
    }
}

impl Config {
    /// Refer to [Config::keep_alive]
    pub const DEF_KEEP_ALIVE: u16 = 60; // in seconds.
    /// Refer to [Config::clean_start]
    pub const DEF_CLEAN_START: bool = true;
    /// Prefix for generated client identifiers.
    pub const DEF_CLIENT_ID_PREFIX: &'static str = "mqv3-";

    /// Construct a new configuration from a file located by `loc`.
    pub fn from_file<P>(loc: P) -> Result<Config>
    where
        P: AsRef<path::Path>,
    {
        use std::str::from_utf8;

        let ploc: &path::Path = loc.as_ref();
        let data = err!(IOError, try: fs::read(ploc), "reading config from {:?}", ploc)?;
        let s = err!(FailConvert, try: from_utf8(&data), "config not utf8 {:?}", ploc)?;
        Config::from_toml(s)
    }

    /// Construct a new configuration from toml text.
    pub fn from_toml(s: &str) -> Result<Config> {
        err!(FailConvert, try: toml::from_str(s), "config not toml")
    }

    /// Configured client identifier, or a fresh one made from a v4 uuid and
    /// truncated to [Config::max_client_id_len]. Every call generates a new one
    /// when not configured.
    pub fn client_id(&self) -> String {
        match &self.client_id {
            Some(client_id) => client_id.clone(),
            None => {
                let uuid = uuid::Uuid::new_v4().simple().to_string();
                let client_id = format!("{}{}", Self::DEF_CLIENT_ID_PREFIX, uuid);
                client_id.chars().take(self.max_client_id_len()).collect()
            }
        }
    }

    pub fn keep_alive(&self) -> u16 {
        self.keep_alive.unwrap_or(Self::DEF_KEEP_ALIVE)
    }

    pub fn clean_start(&self) -> bool {
        self.clean_start.unwrap_or(Self::DEF_CLEAN_START)
    }

    pub fn max_client_id_len(&self) -> usize {
        self.max_client_id_len.unwrap_or(MAX_CLIENT_ID_LEN)
    }
}

/// Will message configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct ConfigWill {
    pub topic: String,
    pub message: String,
    /// * **Default**: 0
    pub qos: Option<u8>,
    /// * **Default**: false
    pub retain: Option<bool>,
}

impl ConfigWill {
    pub fn qos(&self) -> Result<QoS> {
        match QoS::try_from(self.qos.unwrap_or(0))? {
            QoS::Reserved => err!(InvalidInput, desc: "will qos {:?}", self.qos),
            qos => Ok(qos),
        }
    }

    pub fn retain(&self) -> bool {
        self.retain.unwrap_or(false)
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
