//! The deploy run: resolve the price feed, deploy `fund_me`, verify it.

use crate::deployer::{
    ConstructorArg, ContractDeployer, ContractType, DeploymentExecutor, DeploymentRecord,
};
use crate::deployments::DeploymentRegistry;
use crate::error::{Error, Result};
use crate::mock::MockProvisioner;
use crate::network::{NetworkParameters, NetworkRegistry};
use crate::resolver::DependencyResolver;
use crate::shared::Config;
use crate::verify::{SkipReason, VerificationService, VerificationStatus, VerificationTrigger};
use fuels::types::ContractId;
use std::time::Duration;
use tracing::{info, warn};

/// Collaborators of a run, built once by the caller.
pub struct Context<'a> {
    pub config: &'a Config,
    pub networks: &'a NetworkRegistry,
    pub deployer: &'a dyn ContractDeployer,
    pub registry: &'a dyn DeploymentRegistry,
    pub verifier: Option<&'a dyn VerificationService>,
    pub poll_interval: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    Verified,
    Skipped(SkipReason),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub network: NetworkParameters,
    pub price_feed: ContractId,
    pub record: DeploymentRecord,
    pub verification: VerificationOutcome,
}

/// Runs the stages in order and stops at the first fatal error. A failed
/// verification is reported in the outcome, the deployment stands.
pub async fn run(context: &Context<'_>, network_id: u64) -> Result<RunOutcome> {
    let config = context.config;
    let network = context
        .networks
        .parameters(network_id, config.price_feed_override)?;
    let confirmations = config.confirmations(network.required_confirmations);
    info!(
        network_id,
        network = %network.name,
        development = network.is_development(),
        confirmations,
        "starting deployment"
    );

    let mut executor = DeploymentExecutor::new(
        context.deployer,
        context.registry,
        network_id,
        config.confirmation_timeout,
    );
    if let Some(poll_interval) = context.poll_interval {
        executor = executor.with_poll_interval(poll_interval);
    }
    let mocks = MockProvisioner::new(&executor, context.registry, confirmations);
    let resolver = DependencyResolver::new(context.networks, &mocks, config.price_feed_override);
    let price_feed = resolver.resolve(network_id).await?;

    let record = executor
        .deploy(
            ContractType::FundMe.name(),
            vec![ConstructorArg::ContractId(price_feed)],
            confirmations,
        )
        .await?;

    let trigger = VerificationTrigger::new(context.verifier, config);
    let verification = match trigger.verify(&network, &record).await {
        Ok(VerificationStatus::Verified) => VerificationOutcome::Verified,
        Ok(VerificationStatus::Skipped(reason)) => VerificationOutcome::Skipped(reason),
        Err(Error::VerificationFailed { reason, .. }) => {
            warn!("deployment succeeded but verification failed: {reason}");
            VerificationOutcome::Failed(reason)
        }
        Err(err) => return Err(err),
    };

    Ok(RunOutcome {
        network,
        price_feed,
        record,
        verification,
    })
}
