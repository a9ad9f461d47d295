//! The DealDefi deployment plan.

use alloy_core::primitives::{Address, address};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{ConstructorArgs, DeploymentError, Network};

/// Name passed to the `ERC20Token` constructor.
pub const TOKEN_NAME: &str = "DealDefi Token";
/// Symbol passed to the `ERC20Token` constructor.
pub const TOKEN_SYMBOL: &str = "DDFI";

/// Receiver of pre-sale proceeds on Ropsten.
pub const ROPSTEN_FUNDS_RECEIVER: Address = address!("8213Fb521A39daFf48e0c6cEA19DA6458dA1264e");
/// Receiver of pre-sale proceeds on mainnet.
pub const MAINNET_FUNDS_RECEIVER: Address = address!("Ab012ed9C8Dd6C955e3652c746888F0FDD686273");

/// Who receives the funds collected by the pre-sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FundsReceiver {
    /// The first account reported by the deployer.
    FirstAccount,
    /// A fixed address.
    Fixed(Address),
}

/// Token parameters and per-network funds receivers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentPlan {
    pub token_name: String,
    pub token_symbol: String,
}

impl Default for DeploymentPlan {
    fn default() -> Self {
        Self {
            token_name: TOKEN_NAME.to_string(),
            token_symbol: TOKEN_SYMBOL.to_string(),
        }
    }
}

impl DeploymentPlan {
    /// Funds receiver for `network`.
    pub fn funds_receiver(&self, network: Network) -> FundsReceiver {
        match network {
            Network::Development => FundsReceiver::FirstAccount,
            Network::Ropsten => FundsReceiver::Fixed(ROPSTEN_FUNDS_RECEIVER),
            Network::Mainnet => FundsReceiver::Fixed(MAINNET_FUNDS_RECEIVER),
        }
    }

    /// Resolve the funds receiver against the deployer's accounts.
    pub fn resolve(
        &self,
        network: Network,
        accounts: &[Address],
    ) -> Result<ResolvedPlan, DeploymentError> {
        let funds_receiver = match self.funds_receiver(network) {
            FundsReceiver::Fixed(address) => address,
            FundsReceiver::FirstAccount => *accounts
                .first()
                .ok_or(DeploymentError::NoAccounts(network))?,
        };

        Ok(ResolvedPlan {
            network,
            token_name: self.token_name.clone(),
            token_symbol: self.token_symbol.clone(),
            funds_receiver,
        })
    }
}

/// A plan with its funds receiver fixed for one network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPlan {
    pub network: Network,
    pub token_name: String,
    pub token_symbol: String,
    pub funds_receiver: Address,
}

impl ResolvedPlan {
    /// Constructor arguments of the token step.
    pub fn token_args(&self) -> ConstructorArgs {
        ConstructorArgs::Token {
            name: self.token_name.clone(),
            symbol: self.token_symbol.clone(),
        }
    }

    /// Constructor arguments of the pre-sale step, given the deployed token.
    pub fn presale_args(&self, token: Address) -> ConstructorArgs {
        ConstructorArgs::PreSale {
            token,
            funds_receiver: self.funds_receiver,
        }
    }

    /// SHA-256 of the plan's JSON form, hex encoded.
    pub fn compute_hash(&self) -> String {
        let json =
            serde_json::to_string(self).expect("ResolvedPlan serialization should never fail");

        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        hex::encode(hasher.finalize())
    }
}
