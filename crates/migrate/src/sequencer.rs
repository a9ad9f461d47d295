//! Deployment sequencing: `ERC20Token` first, then `PreSale`.
//!
//! The order is carried by the type of the [`Sequencer`]: the pre-sale step only
//! exists on a sequencer in the [`PreSaleStage`], and the only ways to reach that
//! stage are a completed token deployment or a previously recorded one.
//!
//! ```no_run
//! use dealdefi_migrate::{ContractDeployer, DeploymentPlan, Network, Sequencer};
//!
//! # async fn example(deployer: &mut impl ContractDeployer) -> Result<(), dealdefi_migrate::DeploymentError> {
//! let plan = dealdefi_migrate::resolve_plan(deployer, &DeploymentPlan::default(), Network::Development).await?;
//! let outcome = Sequencer::new(deployer, plan)
//!     .deploy_token()
//!     .await?
//!     .deploy_presale()
//!     .await?;
//! println!("token at {}", outcome.token.address);
//! # Ok(())
//! # }
//! ```

use alloy_core::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::{
    ContractDeployer, DeployedContractRef, DeploymentError, DeploymentPlan, Network,
    ResolvedPlan, plan::FundsReceiver,
};

/// Nothing deployed yet; the token comes next.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenStage;

/// The token is deployed; the pre-sale comes next.
#[derive(Debug, Clone)]
pub struct PreSaleStage {
    token: DeployedContractRef,
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::TokenStage {}
    impl Sealed for super::PreSaleStage {}
}

/// Marker trait for sequencer stages.
pub trait SequencerStage: sealed::Sealed {}

impl SequencerStage for TokenStage {}
impl SequencerStage for PreSaleStage {}

/// Addresses produced by a complete migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentOutcome {
    pub network: Network,
    pub funds_receiver: Address,
    pub token: DeployedContractRef,
    pub presale: DeployedContractRef,
}

/// Runs the deployment steps of a resolved plan, in order.
pub struct Sequencer<'a, D, S: SequencerStage = TokenStage> {
    deployer: &'a mut D,
    plan: ResolvedPlan,
    stage: S,
}

impl<'a, D: ContractDeployer> Sequencer<'a, D, TokenStage> {
    pub fn new(deployer: &'a mut D, plan: ResolvedPlan) -> Self {
        Self {
            deployer,
            plan,
            stage: TokenStage,
        }
    }

    /// Deploy `ERC20Token` and wait for it to be confirmed.
    pub async fn deploy_token(self) -> Result<Sequencer<'a, D, PreSaleStage>, DeploymentError> {
        tracing::info!(
            network = %self.plan.network,
            name = %self.plan.token_name,
            symbol = %self.plan.token_symbol,
            "Deploying ERC20Token..."
        );

        let token = self.deployer.deploy(self.plan.token_args()).await?;

        Ok(Sequencer {
            deployer: self.deployer,
            plan: self.plan,
            stage: PreSaleStage { token },
        })
    }

    /// Skip the token step, reusing a token deployed by an earlier run.
    pub fn resume_from_token(self, token: DeployedContractRef) -> Sequencer<'a, D, PreSaleStage> {
        tracing::info!(
            network = %self.plan.network,
            token = %token.address,
            "Reusing previously deployed ERC20Token"
        );

        Sequencer {
            deployer: self.deployer,
            plan: self.plan,
            stage: PreSaleStage { token },
        }
    }
}

impl<'a, D: ContractDeployer> Sequencer<'a, D, PreSaleStage> {
    /// The deployed token the pre-sale will be constructed with.
    pub fn token(&self) -> &DeployedContractRef {
        &self.stage.token
    }

    /// Deploy `PreSale(token, fundsReceiver)` and wait for it to be confirmed.
    pub async fn deploy_presale(self) -> Result<DeploymentOutcome, DeploymentError> {
        let token = self.stage.token;

        tracing::info!(
            network = %self.plan.network,
            token = %token.address,
            funds_receiver = %self.plan.funds_receiver,
            "Deploying PreSale..."
        );

        let presale = self
            .deployer
            .deploy(self.plan.presale_args(token.address))
            .await?;

        Ok(DeploymentOutcome {
            network: self.plan.network,
            funds_receiver: self.plan.funds_receiver,
            token,
            presale,
        })
    }
}

/// Fix the funds receiver of `plan` for `network`, asking the deployer for its
/// accounts when the receiver is the first account.
pub async fn resolve_plan<D: ContractDeployer>(
    deployer: &mut D,
    plan: &DeploymentPlan,
    network: Network,
) -> Result<ResolvedPlan, DeploymentError> {
    let accounts = match plan.funds_receiver(network) {
        FundsReceiver::FirstAccount => deployer.accounts().await?,
        FundsReceiver::Fixed(_) => Vec::new(),
    };
    plan.resolve(network, &accounts)
}

/// Deploy the token, then the pre-sale, on the network named `network_name`.
///
/// Unknown network names fail before any deployment call is made.
pub async fn deploy<D: ContractDeployer>(
    deployer: &mut D,
    plan: &DeploymentPlan,
    network_name: &str,
) -> Result<DeploymentOutcome, DeploymentError> {
    let network = Network::from_name(network_name)?;
    let resolved = resolve_plan(deployer, plan, network).await?;

    Sequencer::new(deployer, resolved)
        .deploy_token()
        .await?
        .deploy_presale()
        .await
}
