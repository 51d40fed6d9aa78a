//! FX Position Sizing Calculator
//!
//! Sizes a position from an account balance, allocation percentage,
//! leverage, and instrument price, resolving the account/instrument
//! exchange rate through a cached multi-source fallback chain.

mod api;
mod app;
mod assets;
mod config;
mod connectivity;
mod error;
mod models;
mod rates;
mod runner;
mod sizing;
mod snapshot;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::api::FrankfurterClient;
use crate::app::Controller;
use crate::config::EngineConfig;
use crate::models::{CurrencyPair, SizingRequest};

/// FX position sizing CLI.
#[derive(Parser)]
#[command(name = "fxsizer")]
#[command(about = "Size a position with cached, multi-source FX rate resolution", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Directory holding the asset JSON files
    #[arg(long, env = "FXSIZER_ASSETS_DIR")]
    assets_dir: Option<PathBuf>,

    /// Primary rate provider base URL
    #[arg(long, env = "FXSIZER_PRIMARY_URL")]
    primary_url: Option<String>,

    /// Fallback rate provider base URL
    #[arg(long, env = "FXSIZER_FALLBACK_URL")]
    fallback_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Size a position
    Size {
        /// Account balance in the account currency
        #[arg(short, long)]
        balance: f64,

        /// Percentage of the balance to allocate (0-100]
        #[arg(short, long)]
        allocation: f64,

        /// Leverage multiplier
        #[arg(short, long, default_value = "1")]
        leverage: f64,

        /// Instrument price in the instrument currency
        #[arg(short, long)]
        price: f64,

        /// Account currency code (e.g. GBP)
        #[arg(long)]
        base: String,

        /// Instrument currency code (e.g. USD)
        #[arg(long)]
        quote: String,

        /// Manual exchange rate; bypasses cache and network entirely
        #[arg(short, long)]
        rate: Option<f64>,

        /// Serve a stale cached rate if every source fails
        #[arg(long)]
        allow_stale: bool,
    },

    /// Resolve an exchange rate without sizing anything
    Rate {
        /// Base (account) currency code
        base: String,

        /// Quote (instrument) currency code
        quote: String,

        /// Manual rate; bypasses resolution
        #[arg(short, long)]
        rate: Option<f64>,

        /// Serve a stale cached rate if every source fails
        #[arg(long)]
        allow_stale: bool,
    },

    /// Check network reachability
    Probe,

    /// Resolve every standard pair to warm the rate cache
    Prewarm,

    /// Inspect or rebuild the asset files
    Assets {
        #[command(subcommand)]
        command: AssetsCommands,
    },

    /// Show the effective configuration
    Config,
}

#[derive(Subcommand)]
enum AssetsCommands {
    /// Show loaded currencies, pairs, and instruments
    Show,

    /// Rebuild the currency list and pair split from the primary provider
    Sync,

    /// Compare the local asset version against a remote marker
    Version {
        /// URL of the remote asset_version.json
        #[arg(long)]
        remote_url: String,
    },
}

/// Suggest a starting point for `--rate` from the snapshot.
fn print_last_known(controller: &Controller, pair: &CurrencyPair) {
    if let Some(entry) = controller.snapshot().get(pair) {
        eprintln!(
            "Last known rate for {}: {} (recorded {})",
            pair,
            entry.rate,
            entry.recorded_at.format("%Y-%m-%d %H:%M UTC")
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = EngineConfig::default();
    if let Some(dir) = cli.assets_dir {
        config.snapshot_path = dir.join("previous_rates.json");
        config.assets_dir = dir;
    }
    if let Some(url) = cli.primary_url {
        config.primary_url = url;
    }
    if let Some(url) = cli.fallback_url {
        config.fallback_url = url;
    }

    match cli.command {
        Commands::Size {
            balance,
            allocation,
            leverage,
            price,
            base,
            quote,
            rate,
            allow_stale,
        } => {
            config.allow_stale = allow_stale;
            let mut controller = Controller::new(config)?;

            let request = SizingRequest {
                account_balance: Decimal::try_from(balance)?,
                allocation_pct: Decimal::try_from(allocation)?,
                leverage: Decimal::try_from(leverage)?,
                instrument_price: Decimal::try_from(price)?,
                pair: CurrencyPair::new(&base, &quote)?,
                manual_rate: rate.map(Decimal::try_from).transpose()?,
            };

            info!(pair = %request.pair, "Sizing position");
            let pair = request.pair.clone();
            match controller.calculate(request).await {
                Ok(result) => {
                    let annotation = if result.inverted { " (inverted)" } else { "" };
                    println!("\n=== Position Size ===");
                    println!("Quantity:  {}", result.quantity);
                    println!("Rate used: {}{}", result.rate_used, annotation);
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    print_last_known(&controller, &pair);
                    std::process::exit(1);
                }
            }
        }

        Commands::Rate {
            base,
            quote,
            rate,
            allow_stale,
        } => {
            config.allow_stale = allow_stale;
            let mut controller = Controller::new(config)?;

            let pair = CurrencyPair::new(&base, &quote)?;
            let manual = rate.map(Decimal::try_from).transpose()?;

            match controller.resolve_rate(&pair, manual).await {
                Ok(resolution) => {
                    let annotation = if resolution.inverted { " (inverted)" } else { "" };
                    println!("{} = {}{}", pair, resolution.rate, annotation);
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    print_last_known(&controller, &pair);
                    std::process::exit(1);
                }
            }
        }

        Commands::Probe => {
            let controller = Controller::new(config)?;
            if controller.is_online().await {
                println!("Online");
            } else {
                println!("Offline - rate lookups will need a manual rate");
            }
        }

        Commands::Prewarm => {
            let controller = Controller::new(config)?;
            let total = controller.catalog().standard_pairs().len();
            if total == 0 {
                println!("No standard pairs loaded. Run 'fxsizer assets sync' first.");
                return Ok(());
            }

            println!("Pre-warming {} standard pairs...", total);
            controller.prewarm();
            controller.drain().await;

            let cached = controller.cached_rates().await;
            println!("Done: {}/{} pairs cached.", cached, total);
        }

        Commands::Assets { command } => match command {
            AssetsCommands::Show => {
                let controller = Controller::new(config)?;
                let catalog = controller.catalog();

                println!("\n=== Asset Catalog ===");
                println!("Currencies:        {}", catalog.currencies().len());
                println!("Standard pairs:    {}", catalog.standard_pairs().len());
                println!("Other pairs:       {}", catalog.other_pairs().len());
                println!("Other instruments: {}", catalog.other_instruments().len());
                println!("Snapshot rates:    {}", controller.snapshot().len());

                if !catalog.other_instruments().is_empty() {
                    println!("\n--- Non-currency instruments ---");
                    for name in catalog.other_instruments() {
                        println!("  {}", name);
                    }
                }
            }

            AssetsCommands::Sync => {
                let client = FrankfurterClient::new(&config)?;
                println!("Fetching currency list from {}...", config.primary_url);

                let currencies = client.get_currencies().await?;
                assets::sync_catalog(&config.assets_dir, &currencies)?;

                let catalog = assets::AssetCatalog::load(&config.assets_dir)?;
                println!(
                    "Synced {} currencies into {} standard and {} other pairs.",
                    catalog.currencies().len(),
                    catalog.standard_pairs().len(),
                    catalog.other_pairs().len()
                );
            }

            AssetsCommands::Version { remote_url } => {
                let local = assets::read_local_version(&config.assets_dir)?;
                let remote =
                    assets::fetch_remote_version(&remote_url, config.fetch_timeout()).await?;

                println!("Local version:  {}", local.version);
                println!("Remote version: {}", remote.version);
                if assets::is_update_available(&local.version, &remote.version) {
                    println!("Update available - run 'fxsizer assets sync'.");
                } else {
                    println!("Assets are up to date.");
                }
            }
        },

        Commands::Config => {
            println!("\n=== Engine Configuration ===\n");
            println!("Rate Resolution:");
            println!("  Cache TTL:        {}s", config.cache_ttl_secs);
            println!("  Fetch Timeout:    {}s", config.fetch_timeout_secs);
            println!("  Fetch Retries:    {}", config.fetch_retries);
            println!("  Primary URL:      {}", config.primary_url);
            println!("  Fallback URL:     {}", config.fallback_url);
            println!("  Allow Stale:      {}", config.allow_stale);

            println!("\nConnectivity:");
            println!("  Probe Address:    {}", config.probe_addr);
            println!("  Probe Timeout:    {}s", config.probe_timeout_secs);

            println!("\nScheduling:");
            println!("  Worker Pool Size: {}", config.worker_count);

            println!("\nPaths:");
            println!("  Assets Dir:       {}", config.assets_dir.display());
            println!("  Snapshot Path:    {}", config.snapshot_path.display());
        }
    }

    Ok(())
}
