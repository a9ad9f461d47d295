//! Deployment records kept between runs.
//!
//! A record is written after every confirmed step, so a run that fails after
//! the token was deployed leaves enough behind to deploy only the pre-sale on
//! the next run.

use std::{
    fs::File,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::{
    ContractId, DeployedContractRef, DeploymentError, DeploymentOutcome, Network, ResolvedPlan,
};

/// Progress of the migration on one network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub network: Network,
    pub chain_id: u64,
    /// Hash of the resolved plan the contracts were deployed with.
    pub plan_hash: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub token: Option<DeployedContractRef>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub presale: Option<DeployedContractRef>,
    /// Unix timestamp of the last update.
    pub updated_at: i64,
    /// Version of the migrator that wrote the record.
    pub tool_version: String,
}

impl DeploymentRecord {
    /// An empty record for `plan` on `chain_id`.
    pub fn new(plan: &ResolvedPlan, chain_id: u64) -> Self {
        Self {
            network: plan.network,
            chain_id,
            plan_hash: plan.compute_hash(),
            token: None,
            presale: None,
            updated_at: chrono::Utc::now().timestamp(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Record a confirmed deployment step.
    pub fn set(&mut self, deployed: DeployedContractRef) {
        match deployed.contract {
            ContractId::Erc20Token => self.token = Some(deployed),
            ContractId::PreSale => self.presale = Some(deployed),
        }
        self.updated_at = chrono::Utc::now().timestamp();
    }

    /// The complete outcome, when both steps are recorded.
    pub fn outcome(&self, funds_receiver: alloy_core::primitives::Address) -> Option<DeploymentOutcome> {
        Some(DeploymentOutcome {
            network: self.network,
            funds_receiver,
            token: self.token.clone()?,
            presale: self.presale.clone()?,
        })
    }

    /// Check that this record was produced by `plan` on `chain_id`.
    pub fn validate(
        &self,
        path: &Path,
        plan: &ResolvedPlan,
        chain_id: u64,
    ) -> Result<(), DeploymentError> {
        let stale = |reason: String| DeploymentError::StaleRecord {
            path: path.display().to_string(),
            reason,
        };

        if self.network != plan.network {
            return Err(stale(format!("record is for network '{}'", self.network)));
        }
        if self.chain_id != chain_id {
            return Err(stale(format!(
                "record is for chain id {}, node reports {}",
                self.chain_id, chain_id
            )));
        }
        if self.plan_hash != plan.compute_hash() {
            return Err(stale("plan parameters changed since the record was written".to_string()));
        }
        if let Some(token) = self.token.as_ref().filter(|t| t.contract != ContractId::Erc20Token) {
            return Err(stale(format!("token entry describes {}", token.contract)));
        }
        if let Some(presale) = self.presale.as_ref().filter(|p| p.contract != ContractId::PreSale) {
            return Err(stale(format!("pre-sale entry describes {}", presale.contract)));
        }
        if self.presale.is_some() && self.token.is_none() {
            return Err(stale("pre-sale recorded without a token".to_string()));
        }

        Ok(())
    }

    /// Save the record as formatted JSON, creating parent directories.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let json =
            serde_json::to_string_pretty(self).context("Failed to serialize deployment record")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write deployment record to {}", path.display()))?;

        tracing::debug!(path = %path.display(), "Deployment record saved");
        Ok(())
    }

    /// Load a record from a file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("Deployment record does not exist: {}", path.display());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read deployment record from {}", path.display()))?;

        serde_json::from_str(&content).context("Failed to parse deployment record JSON")
    }

    /// Load a record if one exists.
    pub fn load_if_exists(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        Self::load_from_file(path).map(Some)
    }
}

/// Exclusive lock preventing two migrations from running on the same network.
///
/// Released when dropped.
#[derive(Debug)]
pub struct MigrationLock {
    file: File,
    path: PathBuf,
}

impl MigrationLock {
    /// Take the lock next to `record_path`, failing if another run holds it.
    pub fn acquire(record_path: &Path) -> Result<Self> {
        let path = record_path.with_extension("lock");
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let file = File::create(&path)
            .with_context(|| format!("Failed to create lock file {}", path.display()))?;
        file.try_lock_exclusive().with_context(|| {
            format!(
                "Another migration is already running (lock held on {})",
                path.display()
            )
        })?;

        tracing::debug!(path = %path.display(), "Migration lock acquired");
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for MigrationLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(err = %e, path = %self.path.display(), "Failed to release migration lock");
        }
    }
}
