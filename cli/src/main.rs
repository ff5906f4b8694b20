mod asset_commands;

use std::path::PathBuf;

use chronicle_retrieval::ChronicleConfig;
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::asset_commands::{AssetKind, IndexArgs, ResolveArgs};

#[derive(Parser)]
#[command(name = "chronicle", about = "Chronicle asset index and resolver")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./chronicle.toml, then the user config dir).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the embedding index for a catalog, or load it from cache.
    Index {
        /// Which catalog to index.
        kind: AssetKind,
        #[command(flatten)]
        args: IndexArgs,
    },
    /// Resolve texts to their closest assets.
    Resolve {
        /// Which catalog to resolve against.
        kind: AssetKind,
        #[command(flatten)]
        args: ResolveArgs,
    },
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as TOML.
    Show,
    /// List the locations searched for a configuration file.
    Paths,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<ChronicleConfig> {
    let config = match path {
        Some(path) => ChronicleConfig::load(path)?,
        None => ChronicleConfig::discover()?,
    };
    debug!(model = %config.embedding.model, "configuration loaded");
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "chronicle starting");

    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Index { kind, args } => asset_commands::handle_index(&config, kind, args).await,
        Commands::Resolve { kind, args } => {
            asset_commands::handle_resolve(&config, kind, args).await
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                print!("{}", config.to_toml_string()?);
                Ok(())
            }
            ConfigAction::Paths => {
                for path in ChronicleConfig::default_paths() {
                    let marker = if path.is_file() { "*" } else { " " };
                    println!("{marker} {}", path.display());
                }
                Ok(())
            }
        },
    }
}
