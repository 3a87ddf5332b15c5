use fuels::types::ContractId;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("network {0} has no registry entry and no price feed override")]
    UnknownNetwork(u64),

    #[error("network {0} is public but has no price feed address configured")]
    MissingDependencyAddress(u64),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("deploying the mock price feed on network {network_id} failed: {source}")]
    MockDeploymentFailed {
        network_id: u64,
        #[source]
        source: Box<Error>,
    },

    #[error("deploying {contract} failed: {reason}")]
    DeploymentFailed { contract: String, reason: String },

    #[error("deployment registry error: {0:#}")]
    Registry(anyhow::Error),

    #[error("verification of {address:#x} failed: {reason}")]
    VerificationFailed { address: ContractId, reason: String },
}

impl Error {
    /// Whether the error must abort the run. Only verification failures are
    /// reported without affecting the exit status.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::VerificationFailed { .. })
    }

    pub(crate) fn deployment(contract: &str, reason: impl std::fmt::Display) -> Self {
        Error::DeploymentFailed {
            contract: contract.to_string(),
            reason: format!("{reason:#}"),
        }
    }
}
