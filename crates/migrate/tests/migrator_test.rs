//! Migration runs with deployment records and artifact write-back.

mod common;

use alloy_core::primitives::{Address, address};
use common::{RecordingDeployer, write_artifacts};
use dealdefi_migrate::{
    ContractId, DeploymentError, DeploymentRecord, ErrorKind, MigrationConfig, Migrator, Network,
};
use tempdir::TempDir;

const FIRST_ACCOUNT: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
const CHAIN_ID: u64 = 1337;

fn test_config(temp_dir: &TempDir) -> MigrationConfig {
    let artifacts_dir = temp_dir.path().join("build/contracts");
    write_artifacts(&artifacts_dir);

    MigrationConfig {
        artifacts_dir,
        deployments_dir: temp_dir.path().join("deployments"),
        ..MigrationConfig::default()
    }
}

fn read_json(path: &std::path::Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[tokio::test]
async fn test_run_records_both_steps() {
    let temp_dir = TempDir::new("ddfi-migrator").expect("Failed to create temp dir");
    let config = test_config(&temp_dir);
    let mut deployer = RecordingDeployer::with_accounts(vec![FIRST_ACCOUNT]);

    let report = Migrator::new(&config)
        .migrate(&mut deployer, Network::Development, CHAIN_ID, false, false)
        .await
        .unwrap();

    assert!(report.reused.is_empty());
    assert!(!report.dry_run);
    assert_eq!(report.chain_id, CHAIN_ID);

    let record_path = config.record_path(Network::Development);
    assert_eq!(report.record_path.as_deref(), Some(record_path.as_path()));

    let record = DeploymentRecord::load_from_file(&record_path).unwrap();
    assert_eq!(record.chain_id, CHAIN_ID);
    assert_eq!(record.token.as_ref(), Some(&report.outcome.token));
    assert_eq!(record.presale.as_ref(), Some(&report.outcome.presale));
    assert_eq!(record.tool_version, env!("CARGO_PKG_VERSION"));

    let token_artifact = read_json(&config.artifacts_dir.join("ERC20Token.json"));
    assert_eq!(
        token_artifact["networks"]["1337"]["address"],
        RecordingDeployer::address_of(1).to_checksum(None)
    );
    let presale_artifact = read_json(&config.artifacts_dir.join("PreSale.json"));
    assert_eq!(
        presale_artifact["networks"]["1337"]["address"],
        RecordingDeployer::address_of(2).to_checksum(None)
    );
}

#[tokio::test]
async fn test_resume_after_presale_failure() {
    let temp_dir = TempDir::new("ddfi-migrator").expect("Failed to create temp dir");
    let config = test_config(&temp_dir);
    let migrator = Migrator::new(&config);

    let mut failing =
        RecordingDeployer::with_accounts(vec![FIRST_ACCOUNT]).failing_on(ContractId::PreSale);
    let err = migrator
        .migrate(&mut failing, Network::Ropsten, 3, false, false)
        .await
        .unwrap_err();
    let err = err.downcast_ref::<DeploymentError>().unwrap();
    assert_eq!(err.kind(), ErrorKind::Transaction);

    let record_path = config.record_path(Network::Ropsten);
    let partial = DeploymentRecord::load_from_file(&record_path).unwrap();
    let token = partial.token.clone().expect("token should be recorded");
    assert!(partial.presale.is_none());

    let mut deployer = RecordingDeployer::with_accounts(vec![FIRST_ACCOUNT]);
    let report = migrator
        .migrate(&mut deployer, Network::Ropsten, 3, false, true)
        .await
        .unwrap();

    assert_eq!(deployer.deployed(), vec![ContractId::PreSale]);
    assert_eq!(report.reused, vec![token.clone()]);
    assert_eq!(report.outcome.token, token);

    let complete = DeploymentRecord::load_from_file(&record_path).unwrap();
    assert_eq!(complete.token, Some(token));
    assert_eq!(complete.presale, Some(report.outcome.presale));
}

#[tokio::test]
async fn test_resume_complete_record_is_noop() {
    let temp_dir = TempDir::new("ddfi-migrator").expect("Failed to create temp dir");
    let config = test_config(&temp_dir);
    let migrator = Migrator::new(&config);

    let mut first = RecordingDeployer::with_accounts(vec![FIRST_ACCOUNT]);
    let first_report = migrator
        .migrate(&mut first, Network::Development, CHAIN_ID, false, false)
        .await
        .unwrap();

    let mut second = RecordingDeployer::with_accounts(vec![FIRST_ACCOUNT]);
    let report = migrator
        .migrate(&mut second, Network::Development, CHAIN_ID, false, true)
        .await
        .unwrap();

    assert!(second.calls.is_empty());
    assert_eq!(report.outcome, first_report.outcome);
    assert_eq!(report.reused.len(), 2);
}

#[tokio::test]
async fn test_resume_rejects_other_chain() {
    let temp_dir = TempDir::new("ddfi-migrator").expect("Failed to create temp dir");
    let config = test_config(&temp_dir);
    let migrator = Migrator::new(&config);

    let mut failing =
        RecordingDeployer::with_accounts(vec![FIRST_ACCOUNT]).failing_on(ContractId::PreSale);
    assert!(
        migrator
            .migrate(&mut failing, Network::Development, CHAIN_ID, false, false)
            .await
            .is_err()
    );

    let mut deployer = RecordingDeployer::with_accounts(vec![FIRST_ACCOUNT]);
    let err = migrator
        .migrate(&mut deployer, Network::Development, 31337, false, true)
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<DeploymentError>(),
        Some(DeploymentError::StaleRecord { .. })
    ));
    assert!(deployer.calls.is_empty());
}

#[tokio::test]
async fn test_without_resume_starts_over() {
    let temp_dir = TempDir::new("ddfi-migrator").expect("Failed to create temp dir");
    let config = test_config(&temp_dir);
    let migrator = Migrator::new(&config);

    let mut first = RecordingDeployer::with_accounts(vec![FIRST_ACCOUNT]);
    migrator
        .migrate(&mut first, Network::Development, CHAIN_ID, false, false)
        .await
        .unwrap();

    let mut second = RecordingDeployer::with_accounts(vec![FIRST_ACCOUNT]);
    migrator
        .migrate(&mut second, Network::Development, CHAIN_ID, false, false)
        .await
        .unwrap();

    assert_eq!(second.deployed(), vec![ContractId::Erc20Token, ContractId::PreSale]);
}

#[tokio::test]
async fn test_dry_run_writes_nothing() {
    let temp_dir = TempDir::new("ddfi-migrator").expect("Failed to create temp dir");
    let config = test_config(&temp_dir);
    let mut deployer = RecordingDeployer::with_accounts(vec![FIRST_ACCOUNT]);

    let report = Migrator::new(&config)
        .migrate(&mut deployer, Network::Development, CHAIN_ID, true, false)
        .await
        .unwrap();

    assert!(report.dry_run);
    assert!(report.record_path.is_none());
    assert_eq!(deployer.calls.len(), 2);
    assert!(!config.deployments_dir.exists());

    let token_artifact = read_json(&config.artifacts_dir.join("ERC20Token.json"));
    assert_eq!(token_artifact["networks"], serde_json::json!({}));
}

#[tokio::test]
async fn test_artifact_write_back_can_be_disabled() {
    let temp_dir = TempDir::new("ddfi-migrator").expect("Failed to create temp dir");
    let config = MigrationConfig {
        update_artifacts: false,
        ..test_config(&temp_dir)
    };
    let mut deployer = RecordingDeployer::with_accounts(vec![FIRST_ACCOUNT]);

    Migrator::new(&config)
        .migrate(&mut deployer, Network::Mainnet, 1, false, false)
        .await
        .unwrap();

    let presale_artifact = read_json(&config.artifacts_dir.join("PreSale.json"));
    assert_eq!(presale_artifact["networks"], serde_json::json!({}));
    assert!(config.record_path(Network::Mainnet).exists());
}
