//! dealdefi-migrate - Deployment library for the DealDefi contracts.
//!
//! Deploys `ERC20Token("DealDefi Token", "DDFI")` and then
//! `PreSale(token, fundsReceiver)` to a configured network, either through a
//! node's unlocked account or with a locally held key.

mod artifacts;
pub use artifacts::{ArtifactStore, ContractArtifact};

pub mod config;
pub use config::{CONFIG_FILENAME, MigrationConfig};

mod contracts;
pub use contracts::{ConstructorArgs, ContractId, DeployedContractRef};

mod deployer;
pub use deployer::{ContractDeployer, RpcDeployer};

mod error;
pub use error::{DeploymentError, ErrorKind};

mod migrator;
pub use migrator::{MigrationOptions, MigrationReport, Migrator};

mod network;
pub use network::{Network, NetworkId, NetworkProfile};

pub mod plan;
pub use plan::{DeploymentPlan, ResolvedPlan};

pub mod record;
pub use record::DeploymentRecord;

pub mod rpc;

mod sequencer;
pub use sequencer::{
    DeploymentOutcome, PreSaleStage, Sequencer, SequencerStage, TokenStage, deploy, resolve_plan,
};

pub mod signer;
pub use signer::{CredentialSource, ProviderConfig, SigningProvider};
