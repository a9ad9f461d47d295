//! Helpers shared by the integration tests.

#![allow(dead_code)]

use std::path::Path;

use alloy_core::primitives::{Address, B256};
use dealdefi_migrate::{
    ConstructorArgs, ContractDeployer, ContractId, DeployedContractRef, DeploymentError,
};

/// Minimal runtime-less bytecode used for artifacts in tests.
pub const TEST_BYTECODE: &str = "0x6080604052348015600f57600080fd5b50";

/// In-memory deployer recording every call it receives.
#[derive(Debug, Default)]
pub struct RecordingDeployer {
    pub accounts: Vec<Address>,
    pub accounts_calls: usize,
    pub calls: Vec<ConstructorArgs>,
    /// Fail the deployment of this contract.
    pub fail_on: Option<ContractId>,
}

impl RecordingDeployer {
    pub fn with_accounts(accounts: Vec<Address>) -> Self {
        Self {
            accounts,
            ..Self::default()
        }
    }

    pub fn failing_on(mut self, contract: ContractId) -> Self {
        self.fail_on = Some(contract);
        self
    }

    /// Contracts deployed so far, in call order.
    pub fn deployed(&self) -> Vec<ContractId> {
        self.calls.iter().map(ConstructorArgs::contract).collect()
    }

    /// Address handed out for the `n`-th deployment (1-based).
    pub fn address_of(n: u8) -> Address {
        Address::repeat_byte(0xc0 + n)
    }
}

impl ContractDeployer for RecordingDeployer {
    async fn accounts(&mut self) -> Result<Vec<Address>, DeploymentError> {
        self.accounts_calls += 1;
        Ok(self.accounts.clone())
    }

    async fn deploy(
        &mut self,
        args: ConstructorArgs,
    ) -> Result<DeployedContractRef, DeploymentError> {
        let contract = args.contract();
        self.calls.push(args);

        if self.fail_on == Some(contract) {
            return Err(DeploymentError::Reverted {
                contract,
                tx_hash: format!("{}", B256::repeat_byte(0xee)),
            });
        }

        let n = self.calls.len() as u8;
        Ok(DeployedContractRef {
            contract,
            address: Self::address_of(n),
            tx_hash: Some(B256::repeat_byte(n)),
        })
    }
}

/// Write Truffle-style artifacts for both contracts into `dir`.
pub fn write_artifacts(dir: &Path) {
    std::fs::create_dir_all(dir).expect("Failed to create artifacts dir");

    for name in ["ERC20Token", "PreSale"] {
        let artifact = serde_json::json!({
            "contractName": name,
            "abi": [],
            "bytecode": TEST_BYTECODE,
            "compiler": { "name": "solc", "version": "0.6.2+commit.bacdbe57.Emscripten.clang" },
            "metadata": "{\"settings\":{\"optimizer\":{\"enabled\":true,\"runs\":200}}}",
            "networks": {}
        });
        std::fs::write(
            dir.join(format!("{}.json", name)),
            serde_json::to_string_pretty(&artifact).unwrap(),
        )
        .expect("Failed to write artifact");
    }
}
