//! Relay configuration.
//!
//! Transport names are kept as plain strings while decoding so that an
//! unknown name surfaces as [`Error::SignalingMethodNotSupported`] at setup
//! rather than as a generic decode error.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::transport::TransportKind;

/// Settings for one signaling transport.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportSettings {
    /// Well-known relay point reachable over this transport.
    #[serde(default, alias = "backend_jid", alias = "backendJid")]
    pub backend: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Identity of this node.
    pub me: String,
    /// Transport name -> settings.
    #[serde(default)]
    pub transports: BTreeMap<String, TransportSettings>,
    /// Statically known peers: identity -> transport name.
    #[serde(default)]
    pub peers: BTreeMap<String, String>,
}

impl RelayConfig {
    pub fn new(me: impl Into<String>) -> Self {
        Self {
            me: me.into(),
            ..Self::default()
        }
    }

    pub fn with_transport(mut self, kind: TransportKind, settings: TransportSettings) -> Self {
        self.transports.insert(kind.as_str().to_string(), settings);
        self
    }

    pub fn with_peer(mut self, identity: impl Into<String>, kind: TransportKind) -> Self {
        self.peers.insert(identity.into(), kind.as_str().to_string());
        self
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| Error::Config {
            reason: e.to_string(),
        })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| Error::Config {
            reason: format!("{}: {}", path.display(), e),
        })?;
        Self::from_json(&content)
    }

    /// Configured transports with their names checked.
    pub fn transports(&self) -> Result<Vec<(TransportKind, &TransportSettings)>> {
        self.transports
            .iter()
            .map(|(name, settings)| Ok((name.parse::<TransportKind>()?, settings)))
            .collect()
    }

    /// Configured peers with their transport names checked.
    pub fn peers(&self) -> Result<Vec<(&str, TransportKind)>> {
        self.peers
            .iter()
            .map(|(identity, name)| Ok((identity.as_str(), name.parse::<TransportKind>()?)))
            .collect()
    }

    /// Check everything that setup would otherwise fail on.
    pub fn validate(&self) -> Result<()> {
        if self.me.is_empty() {
            return Err(Error::Config {
                reason: "`me` must not be empty".to_string(),
            });
        }
        self.transports()?;
        self.peers()?;
        Ok(())
    }
}
