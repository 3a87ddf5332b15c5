use crate::error::{Error, Result};
use crate::mock::MockProvisioner;
use crate::network::{NetworkEnvironment, NetworkRegistry};
use fuels::types::ContractId;
use tracing::{debug, info};

/// Picks the price feed `fund_me` is built against.
pub struct DependencyResolver<'a> {
    networks: &'a NetworkRegistry,
    mocks: &'a MockProvisioner<'a>,
    price_feed_override: Option<ContractId>,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(
        networks: &'a NetworkRegistry,
        mocks: &'a MockProvisioner<'a>,
        price_feed_override: Option<ContractId>,
    ) -> Self {
        Self {
            networks,
            mocks,
            price_feed_override,
        }
    }

    pub async fn resolve(&self, network_id: u64) -> Result<ContractId> {
        let params = self.networks.parameters(network_id, self.price_feed_override)?;
        match params.environment {
            NetworkEnvironment::Development => {
                if self.price_feed_override.is_some() {
                    debug!(network_id, "ignoring price feed override on a development network");
                }
                self.mocks.ensure_mock(network_id).await
            }
            NetworkEnvironment::Public { price_feed } => {
                let price_feed = self
                    .price_feed_override
                    .or(price_feed)
                    .ok_or(Error::MissingDependencyAddress(network_id))?;
                info!(network_id, network = %params.name, "using price feed {:#x}", price_feed);
                Ok(price_feed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deployer::{DeployedContract, DeploymentExecutor, MockContractDeployer};
    use crate::deployments::MemoryDeploymentRegistry;
    use crate::network::NetworkParameters;
    use std::time::Duration;

    const FEED: ContractId = ContractId::new([0xfe; 32]);
    const OTHER_FEED: ContractId = ContractId::new([0xee; 32]);
    const MOCK: ContractId = ContractId::new([0x11; 32]);

    fn networks() -> NetworkRegistry {
        NetworkRegistry::from_parameters([
            NetworkParameters::development(31337, "local", 1),
            NetworkParameters::public(5, "staging", Some(FEED), 6),
            NetworkParameters::public(7, "unconfigured", None, 1),
        ])
    }

    fn untouched_deployer() -> MockContractDeployer {
        let mut deployer = MockContractDeployer::new();
        deployer.expect_deploy().never();
        deployer.expect_confirmations().never();
        deployer
    }

    async fn resolve(
        deployer: &MockContractDeployer,
        network_id: u64,
        price_feed_override: Option<ContractId>,
    ) -> Result<ContractId> {
        let registry = MemoryDeploymentRegistry::default();
        let executor = DeploymentExecutor::new(deployer, &registry, network_id, Duration::from_secs(5));
        let mocks = MockProvisioner::new(&executor, &registry, 1);
        let networks = networks();
        let resolver = DependencyResolver::new(&networks, &mocks, price_feed_override);
        let resolved = resolver.resolve(network_id).await;
        resolved
    }

    #[tokio::test]
    async fn development_network_uses_the_mock() {
        let mut deployer = MockContractDeployer::new();
        deployer.expect_deploy().times(1).returning(|_, _| {
            Ok(DeployedContract {
                contract_id: MOCK,
                block_height: 1,
            })
        });
        deployer.expect_confirmations().returning(|_| Ok(1));

        // The override is a static address and never applies to development networks.
        assert_eq!(resolve(&deployer, 31337, Some(OTHER_FEED)).await.unwrap(), MOCK);
    }

    #[tokio::test]
    async fn public_network_uses_the_registry_address() {
        let deployer = untouched_deployer();
        assert_eq!(resolve(&deployer, 5, None).await.unwrap(), FEED);
    }

    #[tokio::test]
    async fn override_wins_over_the_registry_address() {
        let deployer = untouched_deployer();
        assert_eq!(resolve(&deployer, 5, Some(OTHER_FEED)).await.unwrap(), OTHER_FEED);
        assert_eq!(resolve(&deployer, 7, Some(OTHER_FEED)).await.unwrap(), OTHER_FEED);
        assert_eq!(resolve(&deployer, 99, Some(OTHER_FEED)).await.unwrap(), OTHER_FEED);
    }

    #[tokio::test]
    async fn public_network_without_address_is_a_config_error() {
        let deployer = untouched_deployer();
        assert!(matches!(
            resolve(&deployer, 7, None).await,
            Err(Error::MissingDependencyAddress(7))
        ));
    }

    #[tokio::test]
    async fn unlisted_network_is_unknown() {
        let deployer = untouched_deployer();
        assert!(matches!(
            resolve(&deployer, 99, None).await,
            Err(Error::UnknownNetwork(99))
        ));
    }
}
