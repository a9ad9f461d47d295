use std::path::PathBuf;

use clap::Parser;
use tracing::level_filters::LevelFilter;

/// How the migration result is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Parser)]
#[command(name = "ddfi-migrate")]
#[command(
    author,
    version,
    about = "Deploy the DealDefi token and pre-sale contracts"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, env = "DDFI_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// The network to migrate: development, ropsten or mainnet.
    #[arg(short, long, env = "DDFI_NETWORK", default_value = "development")]
    pub network: String,

    /// The path to the migration configuration file.
    ///
    /// If not provided, ./Migrate.toml is used when it exists, otherwise the
    /// built-in network profiles.
    #[arg(short, long, env = "DDFI_CONFIG")]
    pub config: Option<PathBuf>,

    /// The directory holding the compiled contract artifacts.
    #[arg(long, env = "DDFI_ARTIFACTS")]
    pub artifacts: Option<PathBuf>,

    /// Prepare the transactions without submitting them.
    #[arg(long, env = "DDFI_DRY_RUN")]
    pub dry_run: bool,

    /// Continue from the deployment record of a previous run.
    ///
    /// A confirmed token is reused and only the pre-sale is deployed.
    #[arg(long, env = "DDFI_RESUME")]
    pub resume: bool,

    /// Print the effective configuration as TOML and exit.
    #[arg(long)]
    pub print_config: bool,

    /// How to print the deployed contracts.
    #[arg(long, env = "DDFI_OUTPUT", default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,
}
