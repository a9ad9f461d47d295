//! Error types surfaced by a migration run.

use crate::{ContractId, Network};

/// Broad category of a [`DeploymentError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ErrorKind {
    /// The run was misconfigured and nothing was submitted for the failing step.
    Configuration,
    /// A transaction failed to submit or confirm.
    Transaction,
    /// The signing credential or RPC endpoint could not be loaded.
    Credential,
}

/// Errors returned by the deployment sequencer and its collaborators.
#[derive(Debug, thiserror::Error)]
pub enum DeploymentError {
    #[error("unknown network '{0}', expected one of: development, ropsten, mainnet")]
    UnknownNetwork(String),

    #[error("no profile configured for network '{0}'")]
    MissingProfile(Network),

    #[error("profile for network '{network}' is invalid: {reason}")]
    InvalidProfile { network: Network, reason: String },

    #[error("no accounts available on network '{0}'")]
    NoAccounts(Network),

    #[error("node reports chain id {actual}, but the '{network}' profile expects {expected}")]
    ChainIdMismatch {
        network: Network,
        expected: u64,
        actual: u64,
    },

    #[error("artifact for {contract} is unusable: {reason}")]
    Artifact { contract: ContractId, reason: String },

    #[error("deployment record {path} does not match the current plan: {reason}")]
    StaleRecord { path: String, reason: String },

    #[error("transaction deploying {contract} failed: {reason}")]
    Transaction { contract: ContractId, reason: String },

    #[error("transaction deploying {contract} was reverted (tx {tx_hash})")]
    Reverted { contract: ContractId, tx_hash: String },

    #[error("RPC request failed: {0}")]
    Rpc(String),

    #[error("credential error: {0}")]
    Credential(String),
}

impl DeploymentError {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownNetwork(_)
            | Self::MissingProfile(_)
            | Self::InvalidProfile { .. }
            | Self::NoAccounts(_)
            | Self::ChainIdMismatch { .. }
            | Self::Artifact { .. }
            | Self::StaleRecord { .. } => ErrorKind::Configuration,
            Self::Transaction { .. } | Self::Reverted { .. } | Self::Rpc(_) => {
                ErrorKind::Transaction
            }
            Self::Credential(_) => ErrorKind::Credential,
        }
    }

    /// Build a transaction error from any error chain, keeping the full context.
    pub(crate) fn transaction(contract: ContractId, err: impl Into<anyhow::Error>) -> Self {
        Self::Transaction {
            contract,
            reason: format!("{:#}", err.into()),
        }
    }

    pub(crate) fn rpc(err: impl Into<anyhow::Error>) -> Self {
        Self::Rpc(format!("{:#}", err.into()))
    }
}
