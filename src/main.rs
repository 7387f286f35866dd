//! Trading Journal API
//!
//! Records trades in SQLite and reports realized P&L statistics over the
//! closed ones, either over HTTP or from the command line.

mod api;
mod config;
mod db;
mod models;
mod stats;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::api::JournalServer;
use crate::config::ServerConfig;
use crate::db::Database;
use crate::stats::StatsCalculator;

/// Trading journal CLI.
#[derive(Parser)]
#[command(name = "trading-journal")]
#[command(about = "Record trades and analyze realized performance", long_about = None)]
struct Cli {
    /// Database URL
    #[arg(
        short,
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./trading_journal.db?mode=rwc"
    )]
    database: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Interface to bind
        #[arg(long, env = "HOST", default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on
        #[arg(short, long, env = "PORT", default_value = "8000")]
        port: u16,

        /// Allowed CORS origin (repeatable; "*" allows any)
        #[arg(long = "cors-origin", env = "CORS_ORIGINS", value_delimiter = ',')]
        cors_origins: Vec<String>,

        /// Directory of a built frontend to serve
        #[arg(long, env = "STATIC_DIR")]
        static_dir: Option<PathBuf>,
    },

    /// Show the realized P&L summary
    Stats,

    /// List all recorded trades
    List,
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

    // Initialize database
    let db = Database::new(&cli.database).await?;

    match cli.command {
        Commands::Serve {
            host,
            port,
            cors_origins,
            static_dir,
        } => {
            let defaults = ServerConfig::default();
            let config = ServerConfig {
                host,
                port,
                cors_origins: if cors_origins.is_empty() {
                    defaults.cors_origins
                } else {
                    cors_origins
                },
                static_dir,
            };

            info!(
                database = %cli.database,
                origins = ?config.cors_origins,
                "Starting trading journal API"
            );

            JournalServer::new(config, db).start().await?;
        }

        Commands::Stats => {
            let trades = db.list_all().await?;
            let summary = StatsCalculator::summarize(&trades);
            println!("{}", summary);
        }

        Commands::List => {
            let trades = db.list_all().await?;

            if trades.is_empty() {
                println!("No trades recorded yet. Start the API with 'trading-journal serve'.");
                return Ok(());
            }

            println!(
                "\n{:>5} {:<12} {:<6} {:>10} {:>12} {:>12} {:>12} {:<16}",
                "ID", "SYMBOL", "SIDE", "QTY", "ENTRY", "EXIT", "P&L", "OPENED"
            );
            println!("{}", "-".repeat(92));

            for trade in trades {
                let exit = trade
                    .exit_price
                    .map_or_else(|| "open".to_string(), |p| format!("{:.2}", p));
                let pnl = trade
                    .pnl()
                    .map_or_else(|| "-".to_string(), |p| format!("{:.2}", p));

                println!(
                    "{:>5} {:<12} {:<6} {:>10} {:>12.2} {:>12} {:>12} {:<16}",
                    trade.id,
                    truncate(&trade.symbol, 12),
                    trade.side,
                    trade.quantity,
                    trade.entry_price,
                    exit,
                    pnl,
                    trade.entry_time.format("%Y-%m-%d %H:%M")
                );
            }
        }
    }

    Ok(())
}

/// Truncate a string with ellipsis if too long.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
