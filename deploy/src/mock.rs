use crate::deployer::{
    ConstructorArg, ContractType, DeploymentExecutor, MOCK_DECIMALS, MOCK_INITIAL_ANSWER,
};
use crate::deployments::DeploymentRegistry;
use crate::error::{Error, Result};
use fuels::types::ContractId;
use tracing::info;

/// Stands up the mock price feed on development networks.
pub struct MockProvisioner<'a> {
    executor: &'a DeploymentExecutor<'a>,
    registry: &'a dyn DeploymentRegistry,
    required_confirmations: u32,
}

impl<'a> MockProvisioner<'a> {
    pub fn new(
        executor: &'a DeploymentExecutor<'a>,
        registry: &'a dyn DeploymentRegistry,
        required_confirmations: u32,
    ) -> Self {
        Self {
            executor,
            registry,
            required_confirmations,
        }
    }

    /// Address of the mock on `network_id`, deploying it if the deployment
    /// registry does not know one yet.
    pub async fn ensure_mock(&self, network_id: u64) -> Result<ContractId> {
        let name = ContractType::MockV3Aggregator.name();
        if let Some(existing) = self.registry.get(name, network_id).map_err(Error::Registry)? {
            info!(network_id, "reusing {name} at {:#x}", existing.deployed_address);
            return Ok(existing.deployed_address);
        }

        info!(network_id, "local network detected, deploying {name}");
        let args = vec![
            ConstructorArg::U8(MOCK_DECIMALS),
            ConstructorArg::U64(MOCK_INITIAL_ANSWER),
        ];
        let record = self
            .executor
            .deploy(name, args, self.required_confirmations)
            .await
            .map_err(|err| Error::MockDeploymentFailed {
                network_id,
                source: Box::new(err),
            })?;
        Ok(record.deployed_address)
    }
}
