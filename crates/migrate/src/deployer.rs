//! The deployer capability and its JSON-RPC implementation.

use std::{future::Future, time::Duration};

use alloy_core::primitives::{Address, B256};
use anyhow::Context;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::{
    ArtifactStore, ConstructorArgs, ContractId, DeployedContractRef, DeploymentError, Network,
    NetworkId, NetworkProfile,
    config::SolcSettings,
    rpc,
    signer::{LegacyCreateTx, SigningProvider},
};

/// Capability to publish contracts on a chain.
///
/// Every call to [`ContractDeployer::deploy`] submits one creation transaction and
/// resolves only once it is confirmed (or has failed).
pub trait ContractDeployer: Send {
    /// Accounts the deployer can send from, in the node's order.
    fn accounts(&mut self) -> impl Future<Output = Result<Vec<Address>, DeploymentError>> + Send;

    /// Deploy the contract constructed by `args` and wait for its confirmation.
    fn deploy(
        &mut self,
        args: ConstructorArgs,
    ) -> impl Future<Output = Result<DeployedContractRef, DeploymentError>> + Send;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionReceipt {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    contract_address: Option<Address>,
    #[serde(default)]
    block_number: Option<String>,
    #[serde(default)]
    gas_used: Option<String>,
}

/// Deploys contracts through an Ethereum JSON-RPC endpoint.
///
/// Without a signing provider the node's first unlocked account sends the
/// transactions (`eth_sendTransaction`). With one, transactions are signed locally
/// and submitted with `eth_sendRawTransaction`.
pub struct RpcDeployer {
    network: Network,
    client: reqwest::Client,
    url: Url,
    signer: Option<SigningProvider>,
    artifacts: ArtifactStore,
    solc: SolcSettings,
    gas: Option<u64>,
    gas_price: Option<u64>,
    dry_run: bool,
    confirmation_timeout: Duration,
    poll_interval: Duration,
    chain_id: Option<u64>,
    dry_run_nonce: Option<u64>,
}

impl RpcDeployer {
    /// Build a deployer for `network`.
    ///
    /// The signing provider, when the profile has one, is built here so that
    /// credential problems surface before anything is deployed.
    pub fn new(
        network: Network,
        profile: &NetworkProfile,
        artifacts: ArtifactStore,
        solc: SolcSettings,
    ) -> Result<Self, DeploymentError> {
        let signer = profile
            .provider
            .as_ref()
            .map(SigningProvider::from_env)
            .transpose()?;

        Self::with_signer(network, profile, signer, artifacts, solc)
    }

    /// Build a deployer with an explicit signing provider.
    pub fn with_signer(
        network: Network,
        profile: &NetworkProfile,
        signer: Option<SigningProvider>,
        artifacts: ArtifactStore,
        solc: SolcSettings,
    ) -> Result<Self, DeploymentError> {
        let url = match &signer {
            Some(signer) => signer.rpc_url().clone(),
            None => profile
                .node_url()
                .map_err(|e| DeploymentError::InvalidProfile {
                    network,
                    reason: format!("{:#}", e),
                })?,
        };

        let client = rpc::create_client().map_err(DeploymentError::rpc)?;

        Ok(Self {
            network,
            client,
            url,
            signer,
            artifacts,
            solc,
            gas: profile.gas,
            gas_price: profile.gas_price,
            dry_run: profile.dry_run,
            confirmation_timeout: Duration::from_secs(profile.confirmation_timeout_secs),
            poll_interval: rpc::DEFAULT_POLL_INTERVAL,
            chain_id: None,
            dry_run_nonce: None,
        })
    }

    /// Override the delay between receipt polls.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Endpoint transactions are sent to.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Whether transactions are only prepared, never submitted.
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Chain id reported by the node.
    pub async fn chain_id(&mut self) -> Result<u64, DeploymentError> {
        if let Some(chain_id) = self.chain_id {
            return Ok(chain_id);
        }

        let raw: String = self
            .call("eth_chainId", vec![])
            .await
            .map_err(DeploymentError::rpc)?;
        let chain_id = rpc::parse_quantity(&raw).map_err(DeploymentError::rpc)?;
        self.chain_id = Some(chain_id);
        Ok(chain_id)
    }

    /// Check that the node is on the chain the profile pins.
    pub async fn verify_chain_id(&mut self, expected: NetworkId) -> Result<u64, DeploymentError> {
        let actual = self.chain_id().await?;

        match expected {
            NetworkId::Id(expected) if expected != actual => {
                Err(DeploymentError::ChainIdMismatch {
                    network: self.network,
                    expected,
                    actual,
                })
            }
            _ => {
                tracing::debug!(network = %self.network, chain_id = actual, "Chain id verified");
                Ok(actual)
            }
        }
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<serde_json::Value>,
    ) -> anyhow::Result<T> {
        rpc::json_rpc_call(&self.client, self.url.as_str(), method, params).await
    }

    async fn sender(&self) -> Result<Address, DeploymentError> {
        match &self.signer {
            Some(signer) => Ok(signer.address()),
            None => self
                .node_accounts()
                .await?
                .first()
                .copied()
                .ok_or(DeploymentError::NoAccounts(self.network)),
        }
    }

    async fn node_accounts(&self) -> Result<Vec<Address>, DeploymentError> {
        self.call("eth_accounts", vec![])
            .await
            .map_err(DeploymentError::rpc)
    }

    async fn pending_nonce(&self, address: Address) -> anyhow::Result<u64> {
        let raw: String = self
            .call(
                "eth_getTransactionCount",
                vec![json!(address), json!("pending")],
            )
            .await?;
        rpc::parse_quantity(&raw)
    }

    /// Predict the address a creation transaction would get, without sending it.
    async fn simulate(
        &mut self,
        contract: ContractId,
        from: Address,
    ) -> Result<DeployedContractRef, DeploymentError> {
        let nonce = match self.dry_run_nonce {
            Some(nonce) => nonce,
            None => self
                .pending_nonce(from)
                .await
                .map_err(|e| DeploymentError::transaction(contract, e))?,
        };
        self.dry_run_nonce = Some(nonce + 1);

        let address = from.create(nonce);
        tracing::info!(
            contract = %contract,
            from = %from,
            nonce,
            predicted_address = %address,
            "Dry run: transaction prepared but not submitted"
        );

        Ok(DeployedContractRef {
            contract,
            address,
            tx_hash: None,
        })
    }

    async fn send_unlocked(&self, from: Address, data: String) -> anyhow::Result<B256> {
        let mut tx = json!({
            "from": from,
            "data": data,
        });
        if let Some(gas) = self.gas {
            tx["gas"] = json!(format!("0x{:x}", gas));
        }
        if let Some(gas_price) = self.gas_price {
            tx["gasPrice"] = json!(format!("0x{:x}", gas_price));
        }

        self.call("eth_sendTransaction", vec![tx])
            .await
            .context("Failed to send transaction")
    }

    async fn send_signed(&mut self, from: Address, data: Vec<u8>) -> anyhow::Result<B256> {
        let chain_id = self.chain_id().await.map_err(anyhow::Error::new)?;
        let nonce = self.pending_nonce(from).await?;

        let gas_price = match self.gas_price {
            Some(gas_price) => gas_price,
            None => {
                let raw: String = self.call("eth_gasPrice", vec![]).await?;
                rpc::parse_quantity(&raw)?
            }
        };

        let data_hex = format!("0x{}", hex::encode(&data));
        let gas_limit = match self.gas {
            Some(gas) => gas,
            None => {
                let raw: String = self
                    .call(
                        "eth_estimateGas",
                        vec![json!({ "from": from, "data": data_hex })],
                    )
                    .await
                    .context("Failed to estimate gas")?;
                rpc::parse_quantity(&raw)?
            }
        };

        let tx = LegacyCreateTx {
            nonce,
            gas_price,
            gas_limit,
            data: data.into(),
            chain_id,
        };
        let signer = self
            .signer
            .as_ref()
            .context("No signing provider configured")?;
        let signed = signer.sign_create(&tx).context("Failed to sign transaction")?;

        tracing::debug!(
            nonce,
            gas_price,
            gas_limit,
            chain_id,
            tx_hash = %signed.hash,
            "Submitting signed transaction"
        );

        self.call("eth_sendRawTransaction", vec![json!(signed.raw)])
            .await
            .context("Failed to send raw transaction")
    }

    async fn wait_for_receipt(&self, tx_hash: B256) -> anyhow::Result<TransactionReceipt> {
        let client = self.client.clone();
        let url = self.url.to_string();

        rpc::poll_until(
            &format!("receipt of {}", tx_hash),
            self.confirmation_timeout,
            self.poll_interval,
            || {
                let client = client.clone();
                let url = url.clone();
                async move {
                    rpc::json_rpc_call::<Option<TransactionReceipt>>(
                        &client,
                        &url,
                        "eth_getTransactionReceipt",
                        vec![json!(tx_hash)],
                    )
                    .await
                }
            },
        )
        .await
    }
}

impl ContractDeployer for RpcDeployer {
    async fn accounts(&mut self) -> Result<Vec<Address>, DeploymentError> {
        match &self.signer {
            Some(signer) => Ok(vec![signer.address()]),
            None => self.node_accounts().await,
        }
    }

    async fn deploy(
        &mut self,
        args: ConstructorArgs,
    ) -> Result<DeployedContractRef, DeploymentError> {
        let contract = args.contract();
        let artifact = self.artifacts.load(contract)?;
        artifact.check_compiler(&self.solc);

        let data = args.creation_code(&artifact.bytecode);
        let from = self.sender().await?;

        if self.dry_run {
            return self.simulate(contract, from).await;
        }

        tracing::info!(
            contract = %contract,
            network = %self.network,
            from = %from,
            size = data.len(),
            "Submitting creation transaction"
        );

        let sent = if self.signer.is_some() {
            self.send_signed(from, data.to_vec()).await
        } else {
            self.send_unlocked(from, format!("0x{}", hex::encode(&data)))
                .await
        };
        let tx_hash = sent.map_err(|e| DeploymentError::transaction(contract, e))?;

        tracing::info!(contract = %contract, tx_hash = %tx_hash, "Waiting for confirmation...");

        let receipt = self
            .wait_for_receipt(tx_hash)
            .await
            .map_err(|e| DeploymentError::transaction(contract, e))?;

        if receipt.status.as_deref() == Some("0x0") {
            return Err(DeploymentError::Reverted {
                contract,
                tx_hash: tx_hash.to_string(),
            });
        }

        let address = receipt.contract_address.ok_or_else(|| {
            DeploymentError::transaction(
                contract,
                anyhow::anyhow!("receipt of {} has no contract address", tx_hash),
            )
        })?;

        tracing::info!(
            contract = %contract,
            address = %address,
            tx_hash = %tx_hash,
            block = receipt.block_number.as_deref().unwrap_or("?"),
            gas_used = receipt.gas_used.as_deref().unwrap_or("?"),
            "Contract deployed"
        );

        Ok(DeployedContractRef {
            contract,
            address,
            tx_hash: Some(tx_hash),
        })
    }
}
