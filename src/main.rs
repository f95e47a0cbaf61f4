//! # Covet backend CLI (`covet`)
//!
//! ```bash
//! covet --config ./config/covet.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `covet init` | Create the SQLite database and the pins table |
//! | `covet serve` | Start the HTTP API |
//! | `covet pins list` | Print every saved pin, newest first |
//! | `covet pins clear` | Delete every saved pin |
//!
//! The curation endpoint uses the `OPENAI_API_KEY` environment variable
//! when present; without it the service still runs and curation answers
//! with its degraded random-selection mode.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use covet::config;
use covet::db;
use covet::migrate;
use covet::server;
use covet::store::PinStore;

/// Covet backend — pin storage and AI outfit curation for the Covet
/// browser extension.
#[derive(Parser)]
#[command(
    name = "covet",
    about = "Covet backend — pin storage and AI outfit curation",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/covet.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the pins table. Idempotent —
    /// running it multiple times is safe, and `serve` runs it on startup
    /// anyway.
    Init,

    /// Start the HTTP API server.
    ///
    /// Binds to the address configured in `[server].bind` and serves the
    /// pin and curation endpoints until the process is terminated.
    Serve,

    /// Inspect or empty the pin table.
    Pins {
        #[command(subcommand)]
        action: PinsAction,
    },
}

#[derive(Subcommand)]
enum PinsAction {
    /// Print every saved pin, newest first.
    List,
    /// Delete every saved pin and print how many were removed.
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg.db).await?;
            migrate::run_migrations(&pool, cfg.store.dedupe_images).await?;
            pool.close().await;
            println!("Database initialized successfully.");
        }
        Commands::Serve => {
            tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| "covet=info,tower_http=warn".into()),
                )
                .init();
            server::run_server(&cfg).await?;
        }
        Commands::Pins { action } => {
            let pool = db::connect(&cfg.db).await?;
            migrate::run_migrations(&pool, cfg.store.dedupe_images).await?;
            let store = PinStore::new(pool.clone(), cfg.store.dedupe_images);

            match action {
                PinsAction::List => {
                    let pins = store.list_all().await?;
                    if pins.is_empty() {
                        println!("No pins.");
                    }
                    for pin in &pins {
                        let saved = chrono::DateTime::from_timestamp_millis(pin.saved_at)
                            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
                            .unwrap_or_else(|| pin.saved_at.to_string());
                        let text = if pin.text.is_empty() {
                            "(no description)"
                        } else {
                            pin.text.as_str()
                        };
                        println!("{}. [{}] {}", pin.id, saved, text);
                        println!("    image: {}", pin.image);
                    }
                }
                PinsAction::Clear => {
                    let removed = store.delete_all().await?;
                    println!("Removed {} pins.", removed);
                }
            }

            pool.close().await;
        }
    }

    Ok(())
}
