use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::anyhow;
use deploy::deployer::{ConstructorArg, ContractDeployer, DeployedContract, DeploymentRecord};
use deploy::deployments::{DeploymentRegistry, MemoryDeploymentRegistry};
use deploy::error::Result;
use deploy::network::{NetworkParameters, NetworkRegistry};
use deploy::orchestrator::{self, Context, RunOutcome};
use deploy::shared::Config;
use deploy::verify::{VerificationRequest, VerificationService};
use fuels::types::ContractId;

pub const LOCAL_NETWORK: u64 = 31337;
pub const PUBLIC_NETWORK: u64 = 5;
pub const UNLISTED_NETWORK: u64 = 99;

pub const MOCK: ContractId = ContractId::new([0x0c; 32]);
pub const FEED: ContractId = ContractId::new([0xfe; 32]);
pub const FUND_ME: ContractId = ContractId::new([0xf0; 32]);

pub fn networks() -> NetworkRegistry {
    NetworkRegistry::from_parameters([
        NetworkParameters::development(LOCAL_NETWORK, "local", 1),
        NetworkParameters::public(PUBLIC_NETWORK, "staging", Some(FEED), 6),
    ])
}

pub fn config(network_id: u64, api_key: Option<&str>) -> Config {
    Config {
        network_id,
        verification_api_key: api_key.map(str::to_string),
        ..Config::default()
    }
}

/// Hands out the queued addresses in order. Every confirmation check mines a block.
#[derive(Default)]
pub struct FakeDeployer {
    addresses: Mutex<VecDeque<ContractId>>,
    deployments: Mutex<Vec<(String, Vec<ConstructorArg>)>>,
    height: AtomicU32,
}

impl FakeDeployer {
    pub fn new(addresses: impl IntoIterator<Item = ContractId>) -> Self {
        Self {
            addresses: Mutex::new(addresses.into_iter().collect()),
            deployments: Mutex::default(),
            height: AtomicU32::new(0),
        }
    }

    pub fn deployments(&self) -> Vec<(String, Vec<ConstructorArg>)> {
        self.deployments.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ContractDeployer for FakeDeployer {
    async fn deploy(
        &self,
        contract_name: &str,
        constructor_args: &[ConstructorArg],
    ) -> anyhow::Result<DeployedContract> {
        self.deployments
            .lock()
            .unwrap()
            .push((contract_name.to_string(), constructor_args.to_vec()));
        let contract_id = self
            .addresses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow!("insufficient funds"))?;
        Ok(DeployedContract {
            contract_id,
            block_height: self.height.fetch_add(1, Ordering::SeqCst) + 1,
        })
    }

    async fn confirmations(&self, deployed: &DeployedContract) -> anyhow::Result<u32> {
        let latest = self.height.fetch_add(1, Ordering::SeqCst);
        Ok(latest + 1 - deployed.block_height)
    }
}

/// Memory registry that counts how often it was consulted.
#[derive(Default)]
pub struct CountingRegistry {
    inner: MemoryDeploymentRegistry,
    calls: AtomicUsize,
}

impl CountingRegistry {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DeploymentRegistry for CountingRegistry {
    fn get(&self, name: &str, network_id: u64) -> anyhow::Result<Option<DeploymentRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.get(name, network_id)
    }

    fn record(&self, record: &DeploymentRecord) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.record(record)
    }

    fn list(&self, network_id: u64) -> anyhow::Result<Vec<DeploymentRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.list(network_id)
    }
}

pub struct FakeVerifier {
    rejection: Option<String>,
    requests: Mutex<Vec<VerificationRequest>>,
}

impl FakeVerifier {
    pub fn accepting() -> Self {
        Self {
            rejection: None,
            requests: Mutex::default(),
        }
    }

    pub fn rejecting(reason: &str) -> Self {
        Self {
            rejection: Some(reason.to_string()),
            requests: Mutex::default(),
        }
    }

    pub fn requests(&self) -> Vec<VerificationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl VerificationService for FakeVerifier {
    async fn submit(&self, _credential: &str, request: &VerificationRequest) -> anyhow::Result<()> {
        self.requests.lock().unwrap().push(request.clone());
        match &self.rejection {
            Some(reason) => Err(anyhow!("{reason}")),
            None => Ok(()),
        }
    }
}

/// Everything a run talks to, faked.
pub struct Fixture {
    pub config: Config,
    pub networks: NetworkRegistry,
    pub deployer: FakeDeployer,
    pub registry: CountingRegistry,
    pub verifier: FakeVerifier,
}

impl Fixture {
    pub fn new(config: Config, deployer: FakeDeployer, verifier: FakeVerifier) -> Self {
        Self {
            config,
            networks: networks(),
            deployer,
            registry: CountingRegistry::default(),
            verifier,
        }
    }

    pub async fn run(&self) -> Result<RunOutcome> {
        let context = Context {
            config: &self.config,
            networks: &self.networks,
            deployer: &self.deployer,
            registry: &self.registry,
            verifier: Some(&self.verifier),
            poll_interval: Some(Duration::from_millis(1)),
        };
        let outcome = orchestrator::run(&context, self.config.network_id).await;
        outcome
    }
}
