//! Target networks and their connection profiles.

use std::str::FromStr;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{DeploymentError, ProviderConfig};

/// Default JSON-RPC port of a local development node.
pub const DEFAULT_PORT: u16 = 8545;

/// Default client-side wait for a transaction receipt (50 blocks of 15 seconds).
pub const DEFAULT_CONFIRMATION_TIMEOUT_SECS: u64 = 750;

/// One gwei, in wei.
const GWEI: u64 = 1_000_000_000;

/// Networks the DealDefi contracts can be migrated to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Network {
    Development,
    Ropsten,
    Mainnet,
}

impl Network {
    /// Parse a network name, turning unknown names into a configuration error.
    pub fn from_name(name: &str) -> Result<Self, DeploymentError> {
        Self::from_str(name).map_err(|_| DeploymentError::UnknownNetwork(name.to_string()))
    }

    /// The profile used for this network when the configuration file has none.
    pub fn default_profile(&self) -> NetworkProfile {
        match self {
            Network::Development => NetworkProfile {
                gas: Some(5_000_000),
                ..NetworkProfile::default()
            },
            Network::Ropsten => NetworkProfile {
                network_id: NetworkId::Id(3),
                gas: Some(5_500_000),
                gas_price: Some(10 * GWEI),
                provider: Some(ProviderConfig::private_key("ROPSTEN_PRIVATE_KEY", "ROPSTEN_RPC_URL")),
                ..NetworkProfile::default()
            },
            Network::Mainnet => NetworkProfile {
                network_id: NetworkId::Id(1),
                gas: Some(5_500_000),
                gas_price: Some(50 * GWEI),
                provider: Some(ProviderConfig::private_key("MAINNET_PRIVATE_KEY", "MAINNET_RPC_URL")),
                ..NetworkProfile::default()
            },
        }
    }
}

/// Network id a profile accepts: any id (`"*"`) or a specific chain id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "NetworkIdRepr", into = "NetworkIdRepr")]
pub enum NetworkId {
    #[default]
    Any,
    Id(u64),
}

impl NetworkId {
    /// Whether a node reporting `chain_id` is acceptable for this profile.
    pub fn matches(&self, chain_id: u64) -> bool {
        match self {
            NetworkId::Any => true,
            NetworkId::Id(id) => *id == chain_id,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum NetworkIdRepr {
    Id(u64),
    Text(String),
}

impl TryFrom<NetworkIdRepr> for NetworkId {
    type Error = String;

    fn try_from(repr: NetworkIdRepr) -> Result<Self, Self::Error> {
        match repr {
            NetworkIdRepr::Id(id) => Ok(NetworkId::Id(id)),
            NetworkIdRepr::Text(text) if text == "*" => Ok(NetworkId::Any),
            NetworkIdRepr::Text(text) => text
                .parse()
                .map(NetworkId::Id)
                .map_err(|_| format!("invalid network_id '{}': expected \"*\" or an integer", text)),
        }
    }
}

impl From<NetworkId> for NetworkIdRepr {
    fn from(id: NetworkId) -> Self {
        match id {
            NetworkId::Any => NetworkIdRepr::Text("*".to_string()),
            NetworkId::Id(id) => NetworkIdRepr::Id(id),
        }
    }
}

/// Connection and transaction parameters for one network.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkProfile {
    /// Host of an unlocked JSON-RPC node. Ignored when a provider is set.
    pub host: String,
    /// Port of an unlocked JSON-RPC node. Ignored when a provider is set.
    pub port: u16,
    /// Chain id the node must report.
    pub network_id: NetworkId,
    /// Maximum gas per transaction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas: Option<u64>,
    /// Gas price in wei. Queried from the node when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<u64>,
    /// Prepare transactions without submitting them.
    pub dry_run: bool,
    /// How long to wait for a transaction receipt.
    pub confirmation_timeout_secs: u64,
    /// Signing provider used instead of the node's unlocked accounts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderConfig>,
}

impl Default for NetworkProfile {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            network_id: NetworkId::Any,
            gas: None,
            gas_price: None,
            dry_run: false,
            confirmation_timeout_secs: DEFAULT_CONFIRMATION_TIMEOUT_SECS,
            provider: None,
        }
    }
}

impl NetworkProfile {
    /// JSON-RPC URL of the node described by `host` and `port`.
    pub fn node_url(&self) -> anyhow::Result<Url> {
        Url::parse(&format!("http://{}:{}/", self.host, self.port))
            .with_context(|| format!("Invalid node address {}:{}", self.host, self.port))
    }
}
