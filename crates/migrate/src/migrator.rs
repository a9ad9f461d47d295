//! Runs a complete migration against one network.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::{
    ArtifactStore, ContractDeployer, DeployedContractRef, DeploymentOutcome, DeploymentPlan,
    MigrationConfig, Network, RpcDeployer, Sequencer, resolve_plan,
    record::{DeploymentRecord, MigrationLock},
};

/// Per-run switches layered over the configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationOptions {
    /// Only prepare transactions, regardless of the profile.
    pub dry_run: bool,
    /// Continue from the deployment record instead of starting over.
    pub resume: bool,
}

/// What a migration run did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationReport {
    pub outcome: DeploymentOutcome,
    pub chain_id: u64,
    pub dry_run: bool,
    /// Contracts taken from the deployment record rather than deployed by this run.
    pub reused: Vec<DeployedContractRef>,
    /// Where progress was recorded. `None` for dry runs.
    pub record_path: Option<PathBuf>,
}

/// Deploys the DealDefi contracts as described by a [`MigrationConfig`].
pub struct Migrator<'a> {
    config: &'a MigrationConfig,
    plan: DeploymentPlan,
}

impl<'a> Migrator<'a> {
    pub fn new(config: &'a MigrationConfig) -> Self {
        Self {
            config,
            plan: DeploymentPlan::default(),
        }
    }

    /// Connect to `network` over JSON-RPC and run the migration.
    pub async fn run(&self, network: Network, options: &MigrationOptions) -> Result<MigrationReport> {
        let mut profile = self.config.profile(network)?.clone();
        profile.dry_run |= options.dry_run;

        let mut deployer = RpcDeployer::new(
            network,
            &profile,
            ArtifactStore::new(&self.config.artifacts_dir),
            self.config.compilers.solc.clone(),
        )?;

        tracing::info!(
            network = %network,
            url = %deployer.url(),
            dry_run = profile.dry_run,
            "Connecting to node..."
        );

        let chain_id = deployer.verify_chain_id(profile.network_id).await?;

        self.migrate(&mut deployer, network, chain_id, profile.dry_run, options.resume)
            .await
    }

    /// Run the migration through `deployer`, recording progress unless `dry_run`.
    pub async fn migrate<D: ContractDeployer>(
        &self,
        deployer: &mut D,
        network: Network,
        chain_id: u64,
        dry_run: bool,
        resume: bool,
    ) -> Result<MigrationReport> {
        let plan = resolve_plan(deployer, &self.plan, network).await?;

        if dry_run {
            let outcome = Sequencer::new(deployer, plan)
                .deploy_token()
                .await?
                .deploy_presale()
                .await?;

            return Ok(MigrationReport {
                outcome,
                chain_id,
                dry_run,
                reused: Vec::new(),
                record_path: None,
            });
        }

        let record_path = self.config.record_path(network);
        let _lock = MigrationLock::acquire(&record_path)?;

        let existing = if resume {
            DeploymentRecord::load_if_exists(&record_path)?
        } else {
            if record_path.exists() {
                tracing::warn!(
                    path = %record_path.display(),
                    "Existing deployment record will be replaced"
                );
            }
            None
        };

        if let Some(existing) = &existing {
            existing.validate(&record_path, &plan, chain_id)?;

            if let Some(outcome) = existing.outcome(plan.funds_receiver) {
                tracing::info!(
                    network = %network,
                    token = %outcome.token.address,
                    presale = %outcome.presale.address,
                    "Migration already complete, nothing to do"
                );

                return Ok(MigrationReport {
                    reused: vec![outcome.token.clone(), outcome.presale.clone()],
                    outcome,
                    chain_id,
                    dry_run,
                    record_path: Some(record_path),
                });
            }
        }

        let mut record = existing.unwrap_or_else(|| DeploymentRecord::new(&plan, chain_id));
        let mut reused = Vec::new();

        let sequencer = match record.token.clone() {
            Some(token) => {
                reused.push(token.clone());
                Sequencer::new(deployer, plan).resume_from_token(token)
            }
            None => {
                let sequencer = Sequencer::new(deployer, plan).deploy_token().await?;
                self.persist(&mut record, &record_path, chain_id, sequencer.token().clone())?;
                sequencer
            }
        };

        let outcome = sequencer.deploy_presale().await?;
        self.persist(&mut record, &record_path, chain_id, outcome.presale.clone())?;

        Ok(MigrationReport {
            outcome,
            chain_id,
            dry_run,
            reused,
            record_path: Some(record_path),
        })
    }

    fn persist(
        &self,
        record: &mut DeploymentRecord,
        path: &Path,
        chain_id: u64,
        deployed: DeployedContractRef,
    ) -> Result<()> {
        record.set(deployed.clone());
        record.save_to_file(path)?;

        if self.config.update_artifacts {
            ArtifactStore::new(&self.config.artifacts_dir).record_deployment(chain_id, &deployed)?;
        }
        Ok(())
    }
}
