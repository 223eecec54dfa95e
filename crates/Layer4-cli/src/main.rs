//! Tether CLI - Main entry point

mod demo;

use clap::{Parser, Subcommand};
use tether_foundation::{EngineConfig, JsonStore, ENGINE_CONFIG_FILE};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Tether - tool execution engine with timeouts and background tasks
#[derive(Parser, Debug)]
#[command(name = "tether")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the effective engine configuration as JSON
    Config {
        /// Write the effective configuration to ./.tether/engine.json
        #[arg(long)]
        init: bool,
    },
    /// Run a built-in sleep tool through foreground, background and promotion
    Demo {
        /// Body duration of the background run in milliseconds
        #[arg(long, default_value = "300")]
        ms: u64,

        /// Foreground timeout in milliseconds (promotion kicks in above it)
        #[arg(long, default_value = "200")]
        timeout: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let config = EngineConfig::load().unwrap_or_else(|e| {
        eprintln!("Warning: Failed to load config: {}", e);
        EngineConfig::default()
    });

    match args.command {
        Command::Config { init } => {
            if init {
                let store = JsonStore::current_project()?;
                config.save_to(&store)?;
                println!("Wrote {}", store.file_path(ENGINE_CONFIG_FILE).display());
            }
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Command::Demo { ms, timeout } => {
            tokio::select! {
                result = demo::run(config, ms, timeout) => result?,
                _ = tokio::signal::ctrl_c() => {
                    eprintln!("\nInterrupted");
                }
            }
        }
    }

    Ok(())
}
