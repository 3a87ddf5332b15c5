use crate::error::{Error, Result};
use crate::network::LOCAL_NETWORK_ID;
use clap::Parser;
use dotenvy::dotenv;
use fuels::crypto::SecretKey;
use fuels::prelude::{
    launch_custom_provider_and_get_wallets, Provider, WalletUnlocked, WalletsConfig,
};
use fuels::types::ContractId;
use reqwest::Url;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Parser)]
#[clap(version, about = "Deploys fund_me with the price feed of the target network")]
pub struct Arguments {
    /// Network to deploy to, keyed into the network registry.
    #[clap(long, env = "NETWORK_ID", default_value_t = LOCAL_NETWORK_ID)]
    pub network_id: u64,

    /// Fuel node to connect to. Without it a development network runs on an
    /// in-process node.
    #[clap(long, env = "FUEL_URL")]
    pub fuel_url: Option<String>,

    #[clap(long, env = "DEPLOYER_PK", hide_env_values = true)]
    pub deployer_pk: Option<String>,

    /// Credential for the explorer verification API. Verification is skipped
    /// when it is not set.
    #[clap(long, env = "EXPLORER_API_KEY", hide_env_values = true)]
    pub explorer_api_key: Option<String>,

    #[clap(long, env = "EXPLORER_API_URL")]
    pub explorer_api_url: Option<Url>,

    /// Overrides the confirmation count of the target network.
    #[clap(long, env = "MIN_CONFIRMATIONS")]
    pub min_confirmations: Option<u32>,

    /// Price feed to use instead of the one in the network registry.
    #[clap(long, env = "PRICE_FEED_ADDRESS", value_parser = parse_contract_id)]
    pub price_feed_address: Option<ContractId>,

    /// JSON file adding to or replacing the built-in network table.
    #[clap(long, env = "NETWORKS_FILE")]
    pub networks_file: Option<PathBuf>,

    #[clap(long, env = "DEPLOYMENTS_DIR", default_value = "deployments")]
    pub deployments_dir: PathBuf,

    /// Directory holding `<name>/out/release/<name>.bin` artifacts.
    #[clap(long, env = "ARTIFACTS_DIR", default_value = "..")]
    pub artifacts_dir: PathBuf,

    /// Seconds to wait for the required confirmations.
    #[clap(long, env = "CONFIRMATION_TIMEOUT", default_value_t = 300)]
    pub confirmation_timeout: u64,

    #[clap(long, env = "LOG_FILTER", default_value = "info,deploy=debug")]
    pub log_filter: String,
}

/// Process-wide settings the orchestration reads. Built once at start-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub network_id: u64,
    pub verification_api_key: Option<String>,
    pub min_confirmations: Option<u32>,
    pub price_feed_override: Option<ContractId>,
    pub confirmation_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network_id: LOCAL_NETWORK_ID,
            verification_api_key: None,
            min_confirmations: None,
            price_feed_override: None,
            confirmation_timeout: Duration::from_secs(300),
        }
    }
}

impl Config {
    pub fn from_arguments(args: &Arguments) -> Result<Self> {
        let verification_api_key = args
            .explorer_api_key
            .clone()
            .filter(|key| !key.trim().is_empty());
        if verification_api_key.is_some() && args.explorer_api_url.is_none() {
            return Err(Error::Config(
                "EXPLORER_API_KEY is set but EXPLORER_API_URL is missing".to_string(),
            ));
        }
        Ok(Self {
            network_id: args.network_id,
            verification_api_key,
            min_confirmations: args.min_confirmations,
            price_feed_override: args.price_feed_address,
            confirmation_timeout: Duration::from_secs(args.confirmation_timeout),
        })
    }

    /// Confirmations to wait for on a network requiring `required`.
    pub fn confirmations(&self, required: u32) -> u32 {
        self.min_confirmations.unwrap_or(required)
    }
}

/// Reads `.env` if present, then the command line.
pub fn arguments() -> Arguments {
    dotenv().ok();
    Arguments::parse()
}

pub fn init_logging(filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();
}

pub fn parse_contract_id(value: &str) -> Result<ContractId, String> {
    ContractId::from_str(value.trim()).map_err(|err| format!("invalid contract id {value:?}: {err}"))
}

pub async fn connect_wallet(fuel_url: &str, deployer_pk: &str) -> Result<WalletUnlocked> {
    let secret = SecretKey::from_str(deployer_pk)
        .map_err(|err| Error::Config(format!("invalid DEPLOYER_PK: {err}")))?;
    let provider = Provider::connect(fuel_url)
        .await
        .map_err(|err| Error::Config(format!("cannot connect to {fuel_url}: {err}")))?;
    Ok(WalletUnlocked::new_from_private_key(secret, Some(provider)))
}

/// Starts an in-process node and returns its funded wallet.
pub async fn launch_local_wallet() -> Result<WalletUnlocked> {
    let mut wallets = launch_custom_provider_and_get_wallets(
        WalletsConfig::new(Some(1), Some(1), Some(1_000_000_000)),
        None,
        None,
    )
    .await
    .map_err(|err| Error::Config(format!("cannot launch local node: {err}")))?;
    wallets
        .pop()
        .ok_or_else(|| Error::Config("local node returned no wallets".to_string()))
}

/// Serde helpers storing contract ids as `0x` hex strings.
pub mod contract_id_hex {
    use super::parse_contract_id;
    use fuels::types::ContractId;
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(id: &ContractId, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{id:#x}"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ContractId, D::Error> {
        let value = String::deserialize(deserializer)?;
        parse_contract_id(&value).map_err(D::Error::custom)
    }

    pub mod option {
        use super::parse_contract_id;
        use fuels::types::ContractId;
        use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            id: &Option<ContractId>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match id {
                Some(id) => super::serialize(id, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<ContractId>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|value| parse_contract_id(&value).map_err(D::Error::custom))
                .transpose()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Arguments {
        let mut argv = vec!["deploy"];
        argv.extend_from_slice(extra);
        Arguments::parse_from(argv)
    }

    #[test]
    fn blank_api_key_disables_verification() {
        let config = Config::from_arguments(&args(&["--explorer-api-key", " "])).unwrap();
        assert_eq!(config.verification_api_key, None);
    }

    #[test]
    fn api_key_without_url_is_rejected() {
        let result = Config::from_arguments(&args(&["--explorer-api-key", "KEY"]));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn confirmation_override_takes_precedence() {
        let config = Config::from_arguments(&args(&[
            "--network-id",
            "5",
            "--min-confirmations",
            "3",
            "--confirmation-timeout",
            "10",
        ]))
        .unwrap();
        assert_eq!(config.network_id, 5);
        assert_eq!(config.confirmations(6), 3);
        assert_eq!(config.confirmation_timeout, Duration::from_secs(10));
        assert_eq!(Config::default().confirmations(6), 6);
    }

    #[test]
    fn price_feed_override_is_parsed() {
        let feed = format!("{:#x}", ContractId::new([0xfe; 32]));
        let config =
            Config::from_arguments(&args(&["--price-feed-address", feed.as_str()])).unwrap();
        assert_eq!(config.price_feed_override, Some(ContractId::new([0xfe; 32])));
        assert!(parse_contract_id("0xFEED").is_err());
    }
}
