//! Where deployed contracts are remembered between and within runs.

use crate::deployer::DeploymentRecord;
use anyhow::Context;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

pub trait DeploymentRegistry: Send + Sync {
    fn get(&self, name: &str, network_id: u64) -> anyhow::Result<Option<DeploymentRecord>>;

    /// Stores `record`, replacing an earlier record of the same contract.
    fn record(&self, record: &DeploymentRecord) -> anyhow::Result<()>;

    fn list(&self, network_id: u64) -> anyhow::Result<Vec<DeploymentRecord>>;
}

/// Records that live as long as the process, for ephemeral networks and tests.
#[derive(Debug, Default)]
pub struct MemoryDeploymentRegistry {
    records: Mutex<BTreeMap<(u64, String), DeploymentRecord>>,
}

impl MemoryDeploymentRegistry {
    fn records(&self) -> std::sync::MutexGuard<'_, BTreeMap<(u64, String), DeploymentRecord>> {
        // A poisoned lock still holds consistent records: inserts are atomic.
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DeploymentRegistry for MemoryDeploymentRegistry {
    fn get(&self, name: &str, network_id: u64) -> anyhow::Result<Option<DeploymentRecord>> {
        Ok(self.records().get(&(network_id, name.to_string())).cloned())
    }

    fn record(&self, record: &DeploymentRecord) -> anyhow::Result<()> {
        self.records().insert(
            (record.network_id, record.contract_name.clone()),
            record.clone(),
        );
        Ok(())
    }

    fn list(&self, network_id: u64) -> anyhow::Result<Vec<DeploymentRecord>> {
        Ok(self
            .records()
            .iter()
            .filter(|((network, _), _)| *network == network_id)
            .map(|(_, record)| record.clone())
            .collect())
    }
}

/// One JSON file per contract under `<root>/<network_id>/<name>.json`.
#[derive(Debug, Clone)]
pub struct FileDeploymentRegistry {
    root: PathBuf,
}

impl FileDeploymentRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn network_dir(&self, network_id: u64) -> PathBuf {
        self.root.join(network_id.to_string())
    }

    fn path(&self, name: &str, network_id: u64) -> PathBuf {
        self.network_dir(network_id).join(format!("{name}.json"))
    }

    fn read(path: &Path) -> anyhow::Result<DeploymentRecord> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        serde_json::from_str(&contents).with_context(|| format!("malformed record {}", path.display()))
    }
}

impl DeploymentRegistry for FileDeploymentRegistry {
    fn get(&self, name: &str, network_id: u64) -> anyhow::Result<Option<DeploymentRecord>> {
        let path = self.path(name, network_id);
        if !path.exists() {
            return Ok(None);
        }
        Self::read(&path).map(Some)
    }

    fn record(&self, record: &DeploymentRecord) -> anyhow::Result<()> {
        let dir = self.network_dir(record.network_id);
        std::fs::create_dir_all(&dir).with_context(|| format!("cannot create {}", dir.display()))?;
        let path = self.path(&record.contract_name, record.network_id);
        let json = serde_json::to_string_pretty(record)?;
        std::fs::write(&path, json).with_context(|| format!("cannot write {}", path.display()))?;
        debug!(path = %path.display(), "recorded deployment");
        Ok(())
    }

    fn list(&self, network_id: u64) -> anyhow::Result<Vec<DeploymentRecord>> {
        let dir = self.network_dir(network_id);
        if !dir.exists() {
            return Ok(vec![]);
        }
        let mut records = Vec::new();
        for entry in std::fs::read_dir(&dir).with_context(|| format!("cannot list {}", dir.display()))? {
            let path = entry?.path();
            if path.extension().is_some_and(|extension| extension == "json") {
                records.push(Self::read(&path)?);
            }
        }
        records.sort_by(|a, b| a.contract_name.cmp(&b.contract_name));
        Ok(records)
    }
}
