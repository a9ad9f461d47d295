//! Contracts deployed by the migration and their constructor arguments.

use alloy_core::{
    primitives::{Address, B256, Bytes},
    sol_types::SolValue,
};
use serde::{Deserialize, Serialize};

/// Contracts known to the migration, in deployment order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
pub enum ContractId {
    #[serde(rename = "ERC20Token")]
    #[strum(serialize = "ERC20Token")]
    Erc20Token,
    #[serde(rename = "PreSale")]
    #[strum(serialize = "PreSale")]
    PreSale,
}

impl ContractId {
    /// Name of the compiled artifact (`<name>.json`) for this contract.
    pub fn artifact_name(&self) -> &'static str {
        match self {
            ContractId::Erc20Token => "ERC20Token",
            ContractId::PreSale => "PreSale",
        }
    }
}

/// Constructor arguments of a deployment step.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConstructorArgs {
    /// `ERC20Token(string name, string symbol)`
    Token { name: String, symbol: String },
    /// `PreSale(address token, address fundsReceiver)`
    PreSale {
        token: Address,
        funds_receiver: Address,
    },
}

impl ConstructorArgs {
    /// The contract these arguments construct.
    pub fn contract(&self) -> ContractId {
        match self {
            ConstructorArgs::Token { .. } => ContractId::Erc20Token,
            ConstructorArgs::PreSale { .. } => ContractId::PreSale,
        }
    }

    /// ABI-encode the arguments as they are appended to the creation bytecode.
    pub fn abi_encode(&self) -> Vec<u8> {
        match self {
            ConstructorArgs::Token { name, symbol } => {
                (name.clone(), symbol.clone()).abi_encode_params()
            }
            ConstructorArgs::PreSale {
                token,
                funds_receiver,
            } => (*token, *funds_receiver).abi_encode_params(),
        }
    }

    /// Creation payload: `bytecode ‖ abi_encode(args)`.
    pub fn creation_code(&self, bytecode: &Bytes) -> Bytes {
        let mut data = bytecode.to_vec();
        data.extend(self.abi_encode());
        data.into()
    }
}

/// A contract that has been deployed (or, in a dry run, would be deployed).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeployedContractRef {
    /// Which contract was deployed.
    pub contract: ContractId,
    /// Address of the contract on chain.
    pub address: Address,
    /// Creation transaction. `None` for dry runs.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tx_hash: Option<B256>,
}
