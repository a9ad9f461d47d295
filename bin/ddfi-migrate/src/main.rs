//! ddfi-migrate deploys the DealDefi token and pre-sale contracts to a configured network.

mod cli;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use comfy_table::{Table, presets::UTF8_FULL};

use cli::{Cli, OutputFormat};
use dealdefi_migrate::{
    CONFIG_FILENAME, DeploymentError, MigrationConfig, MigrationOptions, MigrationReport,
    Migrator, Network,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    if let Err(err) = run(cli).await {
        match err.downcast_ref::<DeploymentError>() {
            Some(deployment_err) => {
                tracing::error!(kind = %deployment_err.kind(), "Migration failed: {:#}", err)
            }
            None => tracing::error!("Migration failed: {:#}", err),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.clone().or_else(|| {
        let default = PathBuf::from(CONFIG_FILENAME);
        default.exists().then_some(default)
    });

    let mut config = MigrationConfig::load(config_path.as_deref())?;
    if let Some(artifacts) = cli.artifacts {
        config.artifacts_dir = artifacts;
    }

    if cli.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let network = Network::from_name(&cli.network)?;

    tracing::info!(
        network = %network,
        config_path = ?config_path,
        artifacts_dir = %config.artifacts_dir.display(),
        "Starting migration..."
    );

    let options = MigrationOptions {
        dry_run: cli.dry_run,
        resume: cli.resume,
    };
    let report = Migrator::new(&config).run(network, &options).await?;

    match cli.output {
        OutputFormat::Table => println!("{}", summary_table(&report)),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize migration report")?
        ),
    }

    Ok(())
}

fn summary_table(report: &MigrationReport) -> Table {
    let outcome = &report.outcome;

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Contract", "Address", "Transaction"]);

    for deployed in [&outcome.token, &outcome.presale] {
        let tx = match deployed.tx_hash {
            Some(hash) if report.reused.contains(deployed) => format!("{} (earlier run)", hash),
            Some(hash) => hash.to_string(),
            None if report.dry_run => "dry run".to_string(),
            None => "-".to_string(),
        };
        table.add_row(vec![
            deployed.contract.to_string(),
            deployed.address.to_checksum(None),
            tx,
        ]);
    }

    table.add_row(vec![
        "Funds receiver".to_string(),
        outcome.funds_receiver.to_checksum(None),
        String::new(),
    ]);
    table.add_row(vec![
        "Network".to_string(),
        format!("{} (chain id {})", outcome.network, report.chain_id),
        String::new(),
    ]);

    table
}
