//! Compiled contract artifacts (Truffle JSON format).

use std::path::PathBuf;

use alloy_core::primitives::Bytes;
use anyhow::Context;
use serde::Deserialize;
use serde_json::Value;

use crate::{ContractId, DeployedContractRef, DeploymentError, config::SolcSettings};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArtifact {
    contract_name: String,
    bytecode: String,
    #[serde(default)]
    compiler: Option<CompilerInfo>,
    #[serde(default)]
    metadata: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct CompilerInfo {
    #[serde(default)]
    version: String,
}

#[derive(Debug, Deserialize)]
struct Metadata {
    settings: MetadataSettings,
}

#[derive(Debug, Deserialize)]
struct MetadataSettings {
    optimizer: MetadataOptimizer,
}

#[derive(Debug, Deserialize)]
struct MetadataOptimizer {
    enabled: bool,
    runs: u32,
}

/// A compiled contract ready to be deployed.
#[derive(Debug, Clone)]
pub struct ContractArtifact {
    pub contract: ContractId,
    pub bytecode: Bytes,
    /// Compiler version recorded in the artifact, if any.
    pub compiler_version: Option<String>,
    /// Optimizer settings recorded in the artifact metadata, if any.
    pub optimizer: Option<(bool, u32)>,
}

impl ContractArtifact {
    fn parse(contract: ContractId, content: &str) -> Result<Self, DeploymentError> {
        let invalid = |reason: String| DeploymentError::Artifact { contract, reason };

        let raw: RawArtifact = serde_json::from_str(content)
            .map_err(|e| invalid(format!("malformed artifact JSON: {}", e)))?;

        if raw.contract_name != contract.artifact_name() {
            return Err(invalid(format!(
                "artifact describes contract '{}'",
                raw.contract_name
            )));
        }

        let code = raw.bytecode.trim_start_matches("0x");
        if code.is_empty() {
            return Err(invalid("bytecode is empty (abstract contract or interface?)".to_string()));
        }
        if let Some(pos) = code.find("__") {
            let placeholder: String = code[pos..].chars().take(40).collect();
            return Err(invalid(format!("bytecode has an unlinked library: {}", placeholder)));
        }
        let bytecode = hex::decode(code)
            .map_err(|e| invalid(format!("bytecode is not valid hex: {}", e)))?;

        let optimizer = raw
            .metadata
            .as_deref()
            .and_then(|metadata| serde_json::from_str::<Metadata>(metadata).ok())
            .map(|metadata| {
                (
                    metadata.settings.optimizer.enabled,
                    metadata.settings.optimizer.runs,
                )
            });

        Ok(Self {
            contract,
            bytecode: bytecode.into(),
            compiler_version: raw
                .compiler
                .map(|compiler| compiler.version)
                .filter(|version| !version.is_empty()),
            optimizer,
        })
    }

    /// Warn when the artifact was built with settings other than the configured ones.
    ///
    /// Returns whether the artifact matched.
    pub fn check_compiler(&self, solc: &SolcSettings) -> bool {
        let mut matches = true;

        if let Some(version) = self
            .compiler_version
            .as_ref()
            .filter(|version| !version.starts_with(&solc.version))
        {
            tracing::warn!(
                contract = %self.contract,
                artifact_version = %version,
                configured_version = %solc.version,
                "Artifact was compiled with a different solc version"
            );
            matches = false;
        }

        if let Some((enabled, runs)) = self.optimizer.filter(|(enabled, runs)| {
            *enabled != solc.optimizer.enabled || (*enabled && *runs != solc.optimizer.runs)
        }) {
            tracing::warn!(
                contract = %self.contract,
                artifact_optimizer_enabled = enabled,
                artifact_optimizer_runs = runs,
                configured_optimizer_enabled = solc.optimizer.enabled,
                configured_optimizer_runs = solc.optimizer.runs,
                "Artifact was compiled with different optimizer settings"
            );
            matches = false;
        }

        matches
    }
}

/// Directory of compiled artifacts, one `<ContractName>.json` per contract.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the artifact for `contract`.
    pub fn path(&self, contract: ContractId) -> PathBuf {
        self.dir.join(format!("{}.json", contract.artifact_name()))
    }

    /// Load and validate the artifact for `contract`.
    pub fn load(&self, contract: ContractId) -> Result<ContractArtifact, DeploymentError> {
        let path = self.path(contract);
        let content = std::fs::read_to_string(&path).map_err(|e| DeploymentError::Artifact {
            contract,
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let artifact = ContractArtifact::parse(contract, &content)?;
        tracing::debug!(
            contract = %contract,
            path = %path.display(),
            bytecode_len = artifact.bytecode.len(),
            "Artifact loaded"
        );
        Ok(artifact)
    }

    /// Record a confirmed deployment under `networks.<chain_id>` in the artifact.
    pub fn record_deployment(
        &self,
        chain_id: u64,
        deployed: &DeployedContractRef,
    ) -> anyhow::Result<()> {
        let path = self.path(deployed.contract);
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut artifact: Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        let root = artifact
            .as_object_mut()
            .context("Artifact root is not a JSON object")?;
        let networks = root
            .entry("networks")
            .or_insert_with(|| Value::Object(Default::default()));
        let networks = networks
            .as_object_mut()
            .context("Artifact 'networks' is not a JSON object")?;

        let mut entry = serde_json::json!({
            "address": deployed.address.to_checksum(None),
        });
        if let Some(tx_hash) = deployed.tx_hash {
            entry["transactionHash"] = Value::String(tx_hash.to_string());
        }
        networks.insert(chain_id.to_string(), entry);

        let json = serde_json::to_string_pretty(&artifact)
            .context("Failed to serialize updated artifact")?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        tracing::debug!(
            contract = %deployed.contract,
            chain_id,
            address = %deployed.address,
            "Artifact updated with deployed address"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_core::primitives::{Address, B256};
    use tempdir::TempDir;

    fn artifact_json(name: &str, bytecode: &str) -> String {
        serde_json::json!({
            "contractName": name,
            "abi": [],
            "bytecode": bytecode,
            "compiler": { "name": "solc", "version": "0.6.2+commit.bacdbe57.Emscripten.clang" },
            "metadata": r#"{"settings":{"optimizer":{"enabled":true,"runs":200}}}"#,
            "networks": {}
        })
        .to_string()
    }

    fn store_with(files: &[(&str, String)]) -> (TempDir, ArtifactStore) {
        let temp_dir = TempDir::new("ddfi-artifacts").expect("Failed to create temp dir");
        for (name, content) in files {
            std::fs::write(temp_dir.path().join(format!("{}.json", name)), content).unwrap();
        }
        let store = ArtifactStore::new(temp_dir.path());
        (temp_dir, store)
    }

    #[test]
    fn test_load_valid_artifact() {
        let (_dir, store) = store_with(&[("ERC20Token", artifact_json("ERC20Token", "0x60806040"))]);

        let artifact = store.load(ContractId::Erc20Token).unwrap();
        assert_eq!(artifact.bytecode.as_ref(), &[0x60, 0x80, 0x60, 0x40]);
        assert_eq!(artifact.optimizer, Some((true, 200)));
        assert!(artifact.check_compiler(&SolcSettings::default()));
    }

    #[test]
    fn test_compiler_mismatch_is_reported() {
        let (_dir, store) = store_with(&[("PreSale", artifact_json("PreSale", "0x6080"))]);
        let artifact = store.load(ContractId::PreSale).unwrap();

        let solc = SolcSettings {
            version: "0.8.19".to_string(),
            ..SolcSettings::default()
        };
        assert!(!artifact.check_compiler(&solc));

        let mut solc = SolcSettings::default();
        solc.optimizer.runs = 1000;
        assert!(!artifact.check_compiler(&solc));
    }

    #[test]
    fn test_missing_artifact() {
        let (_dir, store) = store_with(&[]);
        let err = store.load(ContractId::PreSale).unwrap_err();
        assert!(matches!(err, DeploymentError::Artifact { contract: ContractId::PreSale, .. }));
    }

    #[test]
    fn test_invalid_artifacts() {
        let (_dir, store) = store_with(&[
            ("ERC20Token", artifact_json("ERC20Token", "0x")),
            (
                "PreSale",
                artifact_json("PreSale", "0x6080__$0123456789abcdef0123456789abcdef01$__"),
            ),
        ]);

        let empty = store.load(ContractId::Erc20Token).unwrap_err();
        assert!(empty.to_string().contains("empty"));

        let unlinked = store.load(ContractId::PreSale).unwrap_err();
        assert!(unlinked.to_string().contains("unlinked library"));
    }

    #[test]
    fn test_wrong_contract_name() {
        let (_dir, store) = store_with(&[("PreSale", artifact_json("ERC20Token", "0x6080"))]);
        assert!(store.load(ContractId::PreSale).is_err());
    }

    #[test]
    fn test_record_deployment() {
        let (_dir, store) = store_with(&[("ERC20Token", artifact_json("ERC20Token", "0x6080"))]);

        let deployed = DeployedContractRef {
            contract: ContractId::Erc20Token,
            address: Address::repeat_byte(0xab),
            tx_hash: Some(B256::repeat_byte(0x01)),
        };
        store.record_deployment(3, &deployed).unwrap();

        let content = std::fs::read_to_string(store.path(ContractId::Erc20Token)).unwrap();
        let json: Value = serde_json::from_str(&content).unwrap();
        assert_eq!(
            json["networks"]["3"]["address"].as_str().unwrap().to_lowercase(),
            format!("0x{}", "ab".repeat(20))
        );
        assert_eq!(
            json["networks"]["3"]["transactionHash"].as_str().unwrap(),
            format!("0x{}", "01".repeat(32))
        );
        // The artifact stays loadable.
        assert!(store.load(ContractId::Erc20Token).is_ok());
    }
}
