use crate::deployments::DeploymentRegistry;
use crate::error::{Error, Result};
use crate::shared::contract_id_hex;
use anyhow::{ensure, Context};
use chrono::{DateTime, Utc};
use fuels::accounts::ViewOnlyAccount;
use fuels::core::codec::{ABIEncoder, EncoderConfig};
use fuels::core::traits::Tokenizable;
use fuels::core::Configurables;
use fuels::prelude::{Contract, LoadConfiguration, TxPolicies, WalletUnlocked};
use fuels::types::{ContractId, Token};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractType {
    FundMe,
    MockV3Aggregator,
}

impl ContractType {
    pub fn name(&self) -> &'static str {
        match self {
            ContractType::FundMe => "fund_me",
            ContractType::MockV3Aggregator => "mock_v3_aggregator",
        }
    }
}

/// Decimals reported by the mock price feed.
pub const MOCK_DECIMALS: u8 = 8;
/// 2000 with `MOCK_DECIMALS` decimals.
pub const MOCK_INITIAL_ANSWER: u64 = 200_000_000_000;

/// Value bound to a configurable of the deployed contract. Arguments bind
/// positionally to the configurables declared in the contract ABI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ConstructorArg {
    ContractId(#[serde(with = "contract_id_hex")] ContractId),
    U8(u8),
    U64(u64),
    Bool(bool),
}

impl ConstructorArg {
    /// Whether a configurable of ABI type `type_name` can hold this value.
    pub fn fits(&self, type_name: &str) -> bool {
        match self {
            ConstructorArg::ContractId(_) => {
                matches!(type_name, "b256" | "struct std::contract_id::ContractId")
            }
            ConstructorArg::U8(_) => type_name == "u8",
            ConstructorArg::U64(_) => type_name == "u64",
            ConstructorArg::Bool(_) => type_name == "bool",
        }
    }

    pub fn into_token(self) -> Token {
        match self {
            ConstructorArg::ContractId(id) => id.into_token(),
            ConstructorArg::U8(value) => value.into_token(),
            ConstructorArg::U64(value) => value.into_token(),
            ConstructorArg::Bool(value) => value.into_token(),
        }
    }
}

impl fmt::Display for ConstructorArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstructorArg::ContractId(id) => write!(f, "{id:#x}"),
            ConstructorArg::U8(value) => write!(f, "{value}"),
            ConstructorArg::U64(value) => write!(f, "{value}"),
            ConstructorArg::Bool(value) => write!(f, "{value}"),
        }
    }
}

pub fn encode_args(args: &[ConstructorArg]) -> anyhow::Result<Vec<u8>> {
    let tokens: Vec<Token> = args.iter().cloned().map(ConstructorArg::into_token).collect();
    Ok(ABIEncoder::new(EncoderConfig::default()).encode(&tokens)?)
}

/// A contract that was submitted and included in a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeployedContract {
    pub contract_id: ContractId,
    /// Chain height observed once the deployment was accepted. Never below
    /// the inclusion height, so confirmations counted from it are a lower
    /// bound.
    pub block_height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub contract_name: String,
    pub network_id: u64,
    pub constructor_args: Vec<ConstructorArg>,
    #[serde(with = "contract_id_hex")]
    pub deployed_address: ContractId,
    pub confirmations_waited: u32,
    pub block_height: u32,
    pub deployed_at: DateTime<Utc>,
}

/// Chain access needed to deploy a contract and watch it settle.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ContractDeployer: Send + Sync {
    /// Submits one deployment of the named artifact. Never deduplicates.
    async fn deploy(
        &self,
        contract_name: &str,
        constructor_args: &[ConstructorArg],
    ) -> anyhow::Result<DeployedContract>;

    /// Blocks observed so far, counting the block that included the contract.
    async fn confirmations(&self, deployed: &DeployedContract) -> anyhow::Result<u32>;
}

pub struct DeploymentExecutor<'a> {
    deployer: &'a dyn ContractDeployer,
    registry: &'a dyn DeploymentRegistry,
    network_id: u64,
    confirmation_timeout: Duration,
    poll_interval: Duration,
}

impl<'a> DeploymentExecutor<'a> {
    const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

    pub fn new(
        deployer: &'a dyn ContractDeployer,
        registry: &'a dyn DeploymentRegistry,
        network_id: u64,
        confirmation_timeout: Duration,
    ) -> Self {
        Self {
            deployer,
            registry,
            network_id,
            confirmation_timeout,
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn network_id(&self) -> u64 {
        self.network_id
    }

    /// Deploys `contract_name`, waits for `required_confirmations` and records
    /// the result. A failure is never retried here: the transaction may have
    /// landed anyway.
    pub async fn deploy(
        &self,
        contract_name: &str,
        constructor_args: Vec<ConstructorArg>,
        required_confirmations: u32,
    ) -> Result<DeploymentRecord> {
        info!(
            contract = contract_name,
            network_id = self.network_id,
            args = ?constructor_args.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "deploying"
        );
        let deployed = self
            .deployer
            .deploy(contract_name, &constructor_args)
            .await
            .map_err(|err| Error::deployment(contract_name, err))?;
        debug!(
            contract = contract_name,
            block_height = deployed.block_height,
            "submitted {:#x}", deployed.contract_id
        );

        let confirmations_waited = self
            .wait_for_confirmations(contract_name, &deployed, required_confirmations)
            .await?;

        let record = DeploymentRecord {
            contract_name: contract_name.to_string(),
            network_id: self.network_id,
            constructor_args,
            deployed_address: deployed.contract_id,
            confirmations_waited,
            block_height: deployed.block_height,
            deployed_at: Utc::now(),
        };
        self.registry.record(&record).map_err(Error::Registry)?;
        info!(
            contract = contract_name,
            confirmations = confirmations_waited,
            "{contract_name} deployed at {:#x}", record.deployed_address
        );
        Ok(record)
    }

    async fn wait_for_confirmations(
        &self,
        contract_name: &str,
        deployed: &DeployedContract,
        required: u32,
    ) -> Result<u32> {
        if required == 0 {
            return Ok(0);
        }
        tokio::time::timeout(
            self.confirmation_timeout,
            self.poll_confirmations(contract_name, deployed, required),
        )
        .await
        .map_err(|_| {
            Error::deployment(
                contract_name,
                format!(
                    "timed out after {:?} waiting for {required} confirmations",
                    self.confirmation_timeout
                ),
            )
        })?
    }

    async fn poll_confirmations(
        &self,
        contract_name: &str,
        deployed: &DeployedContract,
        required: u32,
    ) -> Result<u32> {
        loop {
            let seen = self
                .deployer
                .confirmations(deployed)
                .await
                .map_err(|err| Error::deployment(contract_name, err))?;
            if seen >= required {
                return Ok(seen);
            }
            debug!(contract = contract_name, seen, required, "waiting for confirmations");
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

/// Configurables table of a compiled program ABI.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramAbi {
    #[serde(default)]
    pub concrete_types: Vec<AbiConcreteType>,
    #[serde(default)]
    pub configurables: Vec<AbiConfigurable>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbiConcreteType {
    #[serde(rename = "type")]
    pub type_name: String,
    pub concrete_type_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbiConfigurable {
    pub name: String,
    pub concrete_type_id: String,
    pub offset: u64,
}

impl ProgramAbi {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read ABI {}", path.display()))?;
        serde_json::from_str(&contents).with_context(|| format!("malformed ABI {}", path.display()))
    }

    fn type_name(&self, configurable: &AbiConfigurable) -> anyhow::Result<&str> {
        self.concrete_types
            .iter()
            .find(|ty| ty.concrete_type_id == configurable.concrete_type_id)
            .map(|ty| ty.type_name.as_str())
            .with_context(|| {
                format!(
                    "configurable {} refers to unknown type {}",
                    configurable.name, configurable.concrete_type_id
                )
            })
    }

    /// Encodes `args` into the binary offsets of the configurables. Argument
    /// `i` binds to the `i`-th configurable in declaration order and must
    /// match its type.
    pub fn bind(&self, args: &[ConstructorArg]) -> anyhow::Result<Vec<(u64, Vec<u8>)>> {
        ensure!(
            self.configurables.len() == args.len(),
            "contract declares {} configurables but {} constructor arguments were given",
            self.configurables.len(),
            args.len()
        );
        self.configurables
            .iter()
            .zip(args)
            .map(|(configurable, arg)| {
                let type_name = self.type_name(configurable)?;
                ensure!(
                    arg.fits(type_name),
                    "configurable {} is a {type_name}, cannot bind {arg:?}",
                    configurable.name
                );
                let bytes = encode_args(std::slice::from_ref(arg))
                    .with_context(|| format!("cannot encode {} = {arg}", configurable.name))?;
                Ok::<_, anyhow::Error>((configurable.offset, bytes))
            })
            .collect()
    }
}

/// Deploys compiled Sway artifacts to a Fuel node.
pub struct FuelDeployer {
    wallet: WalletUnlocked,
    artifacts_dir: PathBuf,
    produce_blocks: bool,
}

impl FuelDeployer {
    pub fn new(wallet: WalletUnlocked, artifacts_dir: impl Into<PathBuf>) -> Self {
        Self {
            wallet,
            artifacts_dir: artifacts_dir.into(),
            produce_blocks: false,
        }
    }

    /// For a node that only makes blocks on demand: every confirmation check
    /// produces one.
    pub fn with_block_production(mut self) -> Self {
        self.produce_blocks = true;
        self
    }

    pub fn wallet(&self) -> &WalletUnlocked {
        &self.wallet
    }

    fn release_dir(&self, contract: &str) -> PathBuf {
        self.artifacts_dir.join(contract).join("out").join("release")
    }

    fn configurables(
        &self,
        contract: &str,
        args: &[ConstructorArg],
    ) -> anyhow::Result<Configurables> {
        if args.is_empty() {
            return Ok(Configurables::default());
        }
        let abi_path = self.release_dir(contract).join(format!("{contract}-abi.json"));
        let abi = ProgramAbi::from_file(&abi_path)?;
        Ok(Configurables::new(abi.bind(args)?))
    }

    async fn block_height(&self) -> anyhow::Result<u32> {
        Ok(self.wallet.try_provider()?.latest_block_height().await?)
    }
}

#[async_trait::async_trait]
impl ContractDeployer for FuelDeployer {
    async fn deploy(
        &self,
        contract_name: &str,
        constructor_args: &[ConstructorArg],
    ) -> anyhow::Result<DeployedContract> {
        let configurables = self.configurables(contract_name, constructor_args)?;
        let binary = self.release_dir(contract_name).join(format!("{contract_name}.bin"));
        let salt: [u8; 32] = rand::thread_rng().gen();
        let contract = Contract::load_from(
            &binary,
            LoadConfiguration::default().with_configurables(configurables),
        )
        .with_context(|| format!("cannot load {}", binary.display()))?
        .with_salt(salt);
        let contract_id: ContractId = contract
            .deploy(&self.wallet, TxPolicies::default())
            .await?
            .into();
        let block_height = self.block_height().await?;
        Ok(DeployedContract {
            contract_id,
            block_height,
        })
    }

    async fn confirmations(&self, deployed: &DeployedContract) -> anyhow::Result<u32> {
        if self.produce_blocks {
            self.wallet.try_provider()?.produce_blocks(1, None).await?;
        }
        let latest = self.block_height().await?;
        Ok(latest.saturating_sub(deployed.block_height).saturating_add(1))
    }
}
