use crate::deployer::{encode_args, ConstructorArg, DeploymentRecord};
use crate::error::{Error, Result};
use crate::network::NetworkParameters;
use crate::shared::Config;
use anyhow::{bail, ensure, Context};
use fuels::types::ContractId;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationRequest {
    pub address: ContractId,
    pub contract_name: String,
    pub constructor_args: Vec<ConstructorArg>,
}

impl From<&DeploymentRecord> for VerificationRequest {
    fn from(record: &DeploymentRecord) -> Self {
        Self {
            address: record.deployed_address,
            contract_name: record.contract_name.clone(),
            constructor_args: record.constructor_args.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    DevelopmentNetwork,
    NoCredential,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationStatus {
    Verified,
    Skipped(SkipReason),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait VerificationService: Send + Sync {
    /// Err carries the reason the service refused the submission.
    async fn submit(&self, credential: &str, request: &VerificationRequest) -> anyhow::Result<()>;
}

pub struct VerificationTrigger<'a> {
    service: Option<&'a dyn VerificationService>,
    credential: Option<&'a str>,
}

impl<'a> VerificationTrigger<'a> {
    /// `service` is `None` when no explorer is configured at all.
    pub fn new(service: Option<&'a dyn VerificationService>, config: &'a Config) -> Self {
        Self {
            service,
            credential: config.verification_api_key.as_deref(),
        }
    }

    pub async fn verify(
        &self,
        network: &NetworkParameters,
        record: &DeploymentRecord,
    ) -> Result<VerificationStatus> {
        if network.is_development() {
            debug!(network_id = network.network_id, "development network, skipping verification");
            return Ok(VerificationStatus::Skipped(SkipReason::DevelopmentNetwork));
        }
        let (Some(service), Some(credential)) = (self.service, self.credential) else {
            debug!("no explorer API key configured, skipping verification");
            return Ok(VerificationStatus::Skipped(SkipReason::NoCredential));
        };

        info!(contract = %record.contract_name, "verifying {:#x}", record.deployed_address);
        let request = VerificationRequest::from(record);
        match service.submit(credential, &request).await {
            Ok(()) => {
                info!(contract = %record.contract_name, "verified");
                Ok(VerificationStatus::Verified)
            }
            Err(err) => {
                warn!(contract = %record.contract_name, "verification failed: {err:#}");
                Err(Error::VerificationFailed {
                    address: record.deployed_address,
                    reason: format!("{err:#}"),
                })
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExplorerResponse {
    status: String,
    #[serde(default)]
    message: String,
    result: String,
}

/// Client for an Etherscan-style explorer verification API.
pub struct ExplorerClient {
    client: Client,
    api_url: Url,
    poll_interval: Duration,
    max_polls: u32,
}

impl ExplorerClient {
    const PENDING: &'static str = "Pending in queue";
    const VERIFIED: &'static str = "Pass - Verified";

    pub fn new(api_url: Url) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| Error::Config(format!("cannot build HTTP client: {err}")))?;
        Ok(Self {
            client,
            api_url,
            poll_interval: Duration::from_secs(5),
            max_polls: 10,
        })
    }

    pub fn with_polling(mut self, poll_interval: Duration, max_polls: u32) -> Self {
        self.poll_interval = poll_interval;
        self.max_polls = max_polls;
        self
    }

    async fn parse(response: reqwest::Response) -> anyhow::Result<ExplorerResponse> {
        ensure!(
            response.status().is_success(),
            "explorer API request failed: {}",
            response.status()
        );
        response
            .json()
            .await
            .context("malformed explorer API response")
    }

    async fn check_status(&self, credential: &str, guid: &str) -> anyhow::Result<ExplorerResponse> {
        let response = self
            .client
            .get(self.api_url.clone())
            .query(&[
                ("apikey", credential),
                ("module", "contract"),
                ("action", "checkverifystatus"),
                ("guid", guid),
            ])
            .send()
            .await?;
        Self::parse(response).await
    }
}

#[async_trait::async_trait]
impl VerificationService for ExplorerClient {
    async fn submit(&self, credential: &str, request: &VerificationRequest) -> anyhow::Result<()> {
        let address = format!("{:#x}", request.address);
        let args = hex::encode(encode_args(&request.constructor_args)?);
        let response = self
            .client
            .post(self.api_url.clone())
            .form(&[
                ("apikey", credential),
                ("module", "contract"),
                ("action", "verifysourcecode"),
                ("contractaddress", address.as_str()),
                ("contractname", request.contract_name.as_str()),
                ("constructorArguements", args.as_str()),
            ])
            .send()
            .await?;
        let submitted = Self::parse(response).await?;
        ensure!(submitted.status == "1", "{}", submitted.result);
        let guid = submitted.result;
        debug!(%guid, "verification submitted");

        for _ in 0..self.max_polls {
            tokio::time::sleep(self.poll_interval).await;
            let status = self.check_status(credential, &guid).await?;
            if status.result == Self::PENDING {
                continue;
            }
            if status.status == "1" && status.result == Self::VERIFIED {
                debug!(message = %status.message, "{}", status.result);
                return Ok(());
            }
            bail!("{}", status.result);
        }
        bail!("verification still pending after {} checks", self.max_polls)
    }
}
