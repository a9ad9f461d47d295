//! Migration configuration: network profiles, compiler settings and paths.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::{DeploymentError, Network, NetworkProfile};

/// The default name of the migration configuration file.
pub const CONFIG_FILENAME: &str = "Migrate.toml";

/// Prefix of environment variables overriding configuration values.
pub const ENV_PREFIX: &str = "DDFI_";

/// Solidity optimizer settings the artifacts are expected to be built with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OptimizerSettings {
    pub enabled: bool,
    pub runs: u32,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            runs: 200,
        }
    }
}

/// solc settings the artifacts are expected to be built with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct SolcSettings {
    /// Compiler version (or version prefix).
    pub version: String,
    /// Whether the compiler is run from a docker image.
    pub docker: bool,
    /// Parser used by the compiler front end.
    pub parser: String,
    pub optimizer: OptimizerSettings,
}

impl Default for SolcSettings {
    fn default() -> Self {
        Self {
            version: "0.6.2".to_string(),
            docker: false,
            parser: "solcjs".to_string(),
            optimizer: OptimizerSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerSettings {
    pub solc: SolcSettings,
}

/// Complete configuration of a migration run.
///
/// Built once at startup and passed by reference to everything that needs it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// Directory of compiled contract artifacts.
    pub artifacts_dir: PathBuf,
    /// Directory where deployment records are kept.
    pub deployments_dir: PathBuf,
    /// Write deployed addresses back into the artifacts.
    pub update_artifacts: bool,
    /// Expected compiler settings.
    pub compilers: CompilerSettings,
    /// Profile of every network that can be targeted.
    pub networks: BTreeMap<Network, NetworkProfile>,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            artifacts_dir: PathBuf::from("build/contracts"),
            deployments_dir: PathBuf::from("deployments"),
            update_artifacts: true,
            compilers: CompilerSettings::default(),
            networks: Network::iter()
                .map(|network| (network, network.default_profile()))
                .collect(),
        }
    }
}

impl MigrationConfig {
    /// Layer defaults, an optional TOML file and `DDFI_` environment variables.
    ///
    /// Nested keys are separated by a double underscore, e.g.
    /// `DDFI_NETWORKS__DEVELOPMENT__PORT=7545`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(path) = path {
            if !path.exists() {
                anyhow::bail!("Configuration file not found: {}", path.display());
            }
            figment = figment.merge(Toml::file(path));
        }

        let config: Self = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to load migration configuration")?;

        tracing::debug!(
            path = ?path.map(Path::display),
            networks = config.networks.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Render the configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize migration config to TOML")
    }

    /// Profile of `network`.
    pub fn profile(&self, network: Network) -> Result<&NetworkProfile, DeploymentError> {
        self.networks
            .get(&network)
            .ok_or(DeploymentError::MissingProfile(network))
    }

    /// Path of the deployment record for `network`.
    pub fn record_path(&self, network: Network) -> PathBuf {
        self.deployments_dir.join(format!("{}.json", network))
    }
}
