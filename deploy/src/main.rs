use deploy::deployer::FuelDeployer;
use deploy::deployments::{DeploymentRegistry, FileDeploymentRegistry, MemoryDeploymentRegistry};
use deploy::error::{Error, Result};
use deploy::network::NetworkRegistry;
use deploy::orchestrator::{self, Context, RunOutcome, VerificationOutcome};
use deploy::shared::{
    arguments, connect_wallet, init_logging, launch_local_wallet, Arguments, Config,
};
use deploy::verify::{ExplorerClient, VerificationService};
use fuels::prelude::WalletUnlocked;
use std::process::ExitCode;
use tracing::{error, info, warn};

enum DeployTarget {
    /// In-process node whose deployments vanish with the process.
    Local,
    OnChain { fuel_url: String, deployer_pk: String },
}

impl DeployTarget {
    fn select(args: &Arguments, development: bool) -> Result<Self> {
        match (&args.fuel_url, &args.deployer_pk) {
            (None, _) if development => Ok(DeployTarget::Local),
            (Some(fuel_url), Some(deployer_pk)) => Ok(DeployTarget::OnChain {
                fuel_url: fuel_url.clone(),
                deployer_pk: deployer_pk.clone(),
            }),
            (None, _) => Err(Error::Config(
                "FUEL_URL is required for public networks".to_string(),
            )),
            (Some(_), None) => Err(Error::Config(
                "DEPLOYER_PK is required with FUEL_URL".to_string(),
            )),
        }
    }

    async fn connect(
        &self,
        args: &Arguments,
    ) -> Result<(WalletUnlocked, Box<dyn DeploymentRegistry>)> {
        match self {
            DeployTarget::Local => {
                info!("no FUEL_URL configured, launching an in-process node");
                let wallet = launch_local_wallet().await?;
                Ok((wallet, Box::new(MemoryDeploymentRegistry::default())))
            }
            DeployTarget::OnChain { fuel_url, deployer_pk } => {
                let wallet = connect_wallet(fuel_url, deployer_pk).await?;
                Ok((wallet, Box::new(FileDeploymentRegistry::new(&args.deployments_dir))))
            }
        }
    }
}

async fn deploy(args: &Arguments) -> Result<RunOutcome> {
    let config = Config::from_arguments(args)?;
    let networks = NetworkRegistry::load(args.networks_file.as_deref())?;
    // Unknown networks fail here, before anything connects or deploys.
    let network = networks.parameters(config.network_id, config.price_feed_override)?;

    let target = DeployTarget::select(args, network.is_development())?;
    let (wallet, registry) = target.connect(args).await?;
    info!("deployer wallet address: {}", wallet.address());
    let mut deployer = FuelDeployer::new(wallet, &args.artifacts_dir);
    if matches!(target, DeployTarget::Local) {
        // The in-process node only makes blocks when transactions arrive.
        deployer = deployer.with_block_production();
    }

    let explorer = args
        .explorer_api_url
        .clone()
        .map(ExplorerClient::new)
        .transpose()?;
    let context = Context {
        config: &config,
        networks: &networks,
        deployer: &deployer,
        registry: registry.as_ref(),
        verifier: explorer.as_ref().map(|client| client as &dyn VerificationService),
        poll_interval: None,
    };
    let outcome = orchestrator::run(&context, config.network_id).await?;
    Ok(outcome)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = arguments();
    init_logging(&args.log_filter);

    match deploy(&args).await {
        Ok(outcome) => {
            info!(
                network = %outcome.network.name,
                price_feed = %format!("{:#x}", outcome.price_feed),
                "fund_me deployed at {:#x}", outcome.record.deployed_address
            );
            match &outcome.verification {
                VerificationOutcome::Verified => info!("fund_me verified"),
                VerificationOutcome::Skipped(reason) => info!(?reason, "verification skipped"),
                VerificationOutcome::Failed(reason) => warn!("verification failed: {reason}"),
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
