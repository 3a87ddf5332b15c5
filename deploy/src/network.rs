use crate::error::{Error, Result};
use crate::shared::contract_id_hex;
use fuels::types::ContractId;
use maplit::btreemap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

pub const LOCAL_NETWORK_ID: u64 = 31337;
pub const TESTNET_NETWORK_ID: u64 = 0;
pub const MAINNET_NETWORK_ID: u64 = 9889;

/// Confirmations used for networks that are only known through a price feed override.
pub const DEFAULT_CONFIRMATIONS: u32 = 1;
/// Confirmations the built-in public networks wait for.
pub const PUBLIC_CONFIRMATIONS: u32 = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkEnvironment {
    /// Ephemeral network, the price feed has to be mocked.
    Development,
    Public { price_feed: Option<ContractId> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkParameters {
    pub network_id: u64,
    pub name: String,
    pub environment: NetworkEnvironment,
    pub required_confirmations: u32,
}

impl NetworkParameters {
    pub fn development(network_id: u64, name: &str, required_confirmations: u32) -> Self {
        Self {
            network_id,
            name: name.to_string(),
            environment: NetworkEnvironment::Development,
            required_confirmations,
        }
    }

    pub fn public(
        network_id: u64,
        name: &str,
        price_feed: Option<ContractId>,
        required_confirmations: u32,
    ) -> Self {
        Self {
            network_id,
            name: name.to_string(),
            environment: NetworkEnvironment::Public { price_feed },
            required_confirmations,
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self.environment, NetworkEnvironment::Development)
    }

    /// Static price feed address. Always `None` on development networks.
    pub fn price_feed(&self) -> Option<ContractId> {
        match self.environment {
            NetworkEnvironment::Development => None,
            NetworkEnvironment::Public { price_feed } => price_feed,
        }
    }
}

/// One row of a networks file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkEntry {
    pub network_id: u64,
    pub name: String,
    #[serde(default)]
    pub development: bool,
    #[serde(default, with = "contract_id_hex::option")]
    pub price_feed: Option<ContractId>,
    #[serde(default = "default_confirmations")]
    pub confirmations: u32,
}

fn default_confirmations() -> u32 {
    DEFAULT_CONFIRMATIONS
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworksFile {
    pub networks: Vec<NetworkEntry>,
}

impl From<NetworkEntry> for NetworkParameters {
    fn from(entry: NetworkEntry) -> Self {
        if entry.development {
            if let Some(price_feed) = entry.price_feed {
                warn!(
                    network_id = entry.network_id,
                    "ignoring price feed {:#x} configured for development network", price_feed
                );
            }
            NetworkParameters::development(entry.network_id, &entry.name, entry.confirmations)
        } else {
            NetworkParameters::public(
                entry.network_id,
                &entry.name,
                entry.price_feed,
                entry.confirmations,
            )
        }
    }
}

impl From<&NetworkParameters> for NetworkEntry {
    fn from(params: &NetworkParameters) -> Self {
        Self {
            network_id: params.network_id,
            name: params.name.clone(),
            development: params.is_development(),
            price_feed: params.price_feed(),
            confirmations: params.required_confirmations,
        }
    }
}

/// Read-only table of the networks the deployer knows about.
#[derive(Debug, Clone)]
pub struct NetworkRegistry {
    networks: BTreeMap<u64, NetworkParameters>,
}

impl NetworkRegistry {
    /// Networks known without any configuration. Public networks carry no
    /// price feed here; it comes from a networks file or the override.
    pub fn builtin() -> Self {
        let networks = btreemap! {
            LOCAL_NETWORK_ID => NetworkParameters::development(LOCAL_NETWORK_ID, "local", 1),
            TESTNET_NETWORK_ID => NetworkParameters::public(
                TESTNET_NETWORK_ID,
                "testnet",
                None,
                PUBLIC_CONFIRMATIONS,
            ),
            MAINNET_NETWORK_ID => NetworkParameters::public(
                MAINNET_NETWORK_ID,
                "mainnet",
                None,
                PUBLIC_CONFIRMATIONS,
            ),
        };
        Self { networks }
    }

    pub fn from_parameters(networks: impl IntoIterator<Item = NetworkParameters>) -> Self {
        Self {
            networks: networks
                .into_iter()
                .map(|params| (params.network_id, params))
                .collect(),
        }
    }

    /// Built-in networks, with entries of `path` added or replacing them.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut registry = Self::builtin();
        if let Some(path) = path {
            let file = Self::read_file(path)?;
            debug!(path = %path.display(), entries = file.networks.len(), "loaded networks file");
            registry.extend(file.networks.into_iter().map(NetworkParameters::from));
        }
        Ok(registry)
    }

    fn read_file(path: &Path) -> Result<NetworksFile> {
        let contents = std::fs::read_to_string(path).map_err(|err| {
            Error::Config(format!("cannot read networks file {}: {err}", path.display()))
        })?;
        serde_json::from_str(&contents).map_err(|err| {
            Error::Config(format!("malformed networks file {}: {err}", path.display()))
        })
    }

    pub fn extend(&mut self, networks: impl IntoIterator<Item = NetworkParameters>) {
        for params in networks {
            self.networks.insert(params.network_id, params);
        }
    }

    pub fn lookup(&self, network_id: u64) -> Result<&NetworkParameters> {
        self.networks
            .get(&network_id)
            .ok_or(Error::UnknownNetwork(network_id))
    }

    /// Parameters on the resolution path. A network without an entry is still
    /// usable as a public network when a price feed override is configured.
    pub fn parameters(
        &self,
        network_id: u64,
        price_feed_override: Option<ContractId>,
    ) -> Result<NetworkParameters> {
        match (self.lookup(network_id), price_feed_override) {
            (Ok(params), _) => Ok(params.clone()),
            (Err(_), Some(price_feed)) => Ok(NetworkParameters::public(
                network_id,
                "custom",
                Some(price_feed),
                DEFAULT_CONFIRMATIONS,
            )),
            (Err(err), None) => Err(err),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &NetworkParameters> {
        self.networks.values()
    }
}
