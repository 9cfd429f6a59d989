use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use alloy::primitives::Address;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};

use tokensale_chain::{
    ConnectOptions, Connection, ContractArtifacts, MigrationParams, RpcEndpoint, WalletSource,
    from_wei, migrate, resolve_addresses, run_interaction,
};
use tokensale_core::{CONFIG_FILE_NAME, SaleConfig, logging};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Parser)]
#[command(name = "tokensale", version, about = "Deploy and drive the MyToken / TokenSale contracts")]
struct Cli {
    /// Project configuration file.
    #[arg(long, global = true, default_value = CONFIG_FILE_NAME)]
    config: PathBuf,

    /// Network profile to use.
    #[arg(long, global = true, default_value = "development")]
    network: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write the default configuration file.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
    /// Deploy MyToken and TokenSale and record their addresses.
    Migrate {
        /// Transfer the whole token supply to the sale contract.
        #[arg(long)]
        fund: bool,
    },
    /// Buy tokens from the sale with account 0.
    Interact {
        #[arg(long)]
        token: Option<Address>,
        #[arg(long)]
        sale: Option<Address>,
        /// Number of whole tokens to buy.
        #[arg(long)]
        amount: Option<u64>,
    },
    /// End the sale from the admin account (account 0).
    EndSale {
        #[arg(long)]
        sale: Option<Address>,
    },
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    SaleConfig::default().save(path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

async fn connect(config: &SaleConfig, network: &str) -> Result<Arc<Connection>> {
    let profile = config.network(network)?;
    let endpoint = RpcEndpoint::resolve(network, profile, &config.rpc)?;
    let source = WalletSource::for_profile(profile)?;
    let options = ConnectOptions::from_settings(Some(profile), &config.rpc);
    let conn = Connection::connect(&endpoint, source, options)
        .await
        .with_context(|| format!("Failed to connect to network {network}"))?;
    Ok(conn)
}

async fn migrate_cmd(config: &SaleConfig, network: &str, fund: bool) -> Result<()> {
    let artifacts = ContractArtifacts::load(&config.artifacts_dir, &config.compilers.solc.version)?;
    let params = MigrationParams::from_settings(&config.sale, fund)?;
    let conn = connect(config, network).await?;

    let deployment = migrate(conn, &artifacts, &params, network).await?;
    let path = config.deployment_path(network);
    deployment.record.save(&path)?;

    println!("MyToken:   {}", deployment.token.address());
    println!("TokenSale: {}", deployment.sale.address());
    println!("Record:    {}", path.display());
    Ok(())
}

async fn interact_cmd(
    config: &SaleConfig,
    network: &str,
    token: Option<Address>,
    sale: Option<Address>,
    amount: Option<u64>,
) -> Result<()> {
    let conn = connect(config, network).await?;
    let (token, sale) =
        resolve_addresses(&conn, token, sale, &config.deployment_path(network)).await?;
    let amount = amount.unwrap_or(config.sale.tokens_to_buy);

    let report = run_interaction(&token, &sale, amount).await?;
    for line in report.lines() {
        println!("{line}");
    }
    Ok(())
}

async fn end_sale_cmd(config: &SaleConfig, network: &str, sale: Option<Address>) -> Result<()> {
    let conn = connect(config, network).await?;
    let (token, sale) =
        resolve_addresses(&conn, None, sale, &config.deployment_path(network)).await?;
    let admin = conn.account(0)?;

    let before = token.balance_of(admin).await?;
    sale.end_sale(admin).await?;
    let after = token.balance_of(admin).await?;

    println!("Sale ended; admin received {} MTK", from_wei(after.saturating_sub(before)));
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let network = cli.network.as_str();
    match cli.command {
        Command::Init { force } => init_config(&cli.config, force),
        Command::Migrate { fund } => {
            let config = SaleConfig::load_or_default(&cli.config)?;
            migrate_cmd(&config, network, fund).await
        }
        Command::Interact {
            token,
            sale,
            amount,
        } => {
            let config = SaleConfig::load_or_default(&cli.config)?;
            interact_cmd(&config, network, token, sale, amount).await
        }
        Command::EndSale { sale } => {
            let config = SaleConfig::load_or_default(&cli.config)?;
            end_sale_cmd(&config, network, sale).await
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let logging = logging::init_logging();
    info!(
        log_dir = ?logging.log_dir(),
        "tokensale v{VERSION}, network {}",
        cli.network
    );

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
