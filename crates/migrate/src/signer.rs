//! Local transaction signing for remote networks.
//!
//! Remote networks (Ropsten, mainnet) are reached through a public RPC endpoint
//! that holds no unlocked accounts, so creation transactions are signed locally
//! with a key read from the environment and submitted as raw transactions.

use alloy_consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy_core::primitives::{Address, B256, Bytes, TxKind, U256};
use alloy_eips::eip2718::Encodable2718;
use alloy_signer::SignerSync;
use alloy_signer_local::{MnemonicBuilder, PrivateKeySigner, coins_bip39::English};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::DeploymentError;

/// Where the signing credential is read from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum CredentialSource {
    /// A hex-encoded private key stored in the named environment variable.
    PrivateKey { env: String },
    /// A BIP-39 mnemonic stored in the named environment variable.
    Mnemonic {
        env: String,
        #[serde(default)]
        index: u32,
    },
}

/// Signing provider configuration of a network profile.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Source of the signing key.
    pub credential: CredentialSource,
    /// Environment variable holding the RPC endpoint URL.
    pub rpc_url_env: String,
}

impl ProviderConfig {
    /// Provider signing with a private key, both values read from the environment.
    pub fn private_key(key_env: impl Into<String>, rpc_url_env: impl Into<String>) -> Self {
        Self {
            credential: CredentialSource::PrivateKey { env: key_env.into() },
            rpc_url_env: rpc_url_env.into(),
        }
    }
}

/// A signer bound to the RPC endpoint it submits to.
#[derive(Debug, Clone)]
pub struct SigningProvider {
    signer: PrivateKeySigner,
    rpc_url: Url,
}

impl SigningProvider {
    /// Build a provider from environment variables named by `config`.
    pub fn from_env(config: &ProviderConfig) -> Result<Self, DeploymentError> {
        Self::from_lookup(config, |name| std::env::var(name).ok())
    }

    /// Build a provider resolving variable names through `lookup`.
    pub fn from_lookup(
        config: &ProviderConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, DeploymentError> {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or_else(|| {
                    DeploymentError::Credential(format!("environment variable {} is not set", name))
                })
        };

        let signer = match &config.credential {
            CredentialSource::PrivateKey { env } => read(env)?
                .parse::<PrivateKeySigner>()
                .map_err(|e| {
                    DeploymentError::Credential(format!("{} is not a valid private key: {}", env, e))
                })?,
            CredentialSource::Mnemonic { env, index } => MnemonicBuilder::<English>::default()
                .phrase(read(env)?)
                .index(*index)
                .and_then(|builder| builder.build())
                .map_err(|e| {
                    DeploymentError::Credential(format!("{} is not a valid mnemonic: {}", env, e))
                })?,
        };

        let raw_url = read(&config.rpc_url_env)?;
        let rpc_url = Url::parse(&raw_url).map_err(|e| {
            DeploymentError::Credential(format!(
                "{} is not a valid URL: {}",
                config.rpc_url_env, e
            ))
        })?;

        tracing::debug!(address = %signer.address(), "Signing provider ready");

        Ok(Self { signer, rpc_url })
    }

    /// Address transactions are sent from.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Endpoint signed transactions are submitted to.
    pub fn rpc_url(&self) -> &Url {
        &self.rpc_url
    }

    /// Sign a creation transaction, returning the raw encoding and its hash.
    pub fn sign_create(&self, tx: &LegacyCreateTx) -> anyhow::Result<SignedTransaction> {
        let tx = tx.to_consensus();
        let signature = self.signer.sign_hash_sync(&tx.signature_hash())?;
        let envelope = TxEnvelope::Legacy(tx.into_signed(signature));

        Ok(SignedTransaction {
            raw: envelope.encoded_2718().into(),
            hash: *envelope.tx_hash(),
        })
    }
}

/// A contract-creation transaction in the legacy format, signed with EIP-155
/// replay protection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyCreateTx {
    pub nonce: u64,
    pub gas_price: u64,
    pub gas_limit: u64,
    pub data: Bytes,
    pub chain_id: u64,
}

impl LegacyCreateTx {
    fn to_consensus(&self) -> TxLegacy {
        TxLegacy {
            chain_id: Some(self.chain_id),
            nonce: self.nonce,
            gas_price: u128::from(self.gas_price),
            gas_limit: self.gas_limit,
            to: TxKind::Create,
            value: U256::ZERO,
            input: self.data.clone(),
        }
    }

    /// Hash the signature is computed over.
    pub fn signing_hash(&self) -> B256 {
        self.to_consensus().signature_hash()
    }
}

/// A signed transaction ready for `eth_sendRawTransaction`.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub raw: Bytes,
    pub hash: B256,
}
