//! Kledo Invoice Sync - service entry point
//!
//! Opens the settings database, wires the connection manager and API client
//! together, and serves the admin/webhook HTTP surface.

use clap::Parser;
use kledo_sync::web::{serve, AppState};
use kledo_sync::{init_schema, SettingsStore};
use rusqlite::Connection;
use std::path::PathBuf;

/// Kledo invoice sync server - creates Kledo invoices from completed orders
#[derive(Parser, Debug)]
#[command(name = "kledo_sync")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the SQLite settings database
    #[arg(short, long, default_value_t = default_db_path())]
    database: String,

    /// Port for the admin/webhook HTTP server
    #[arg(short, long, default_value_t = 8787)]
    port: u16,

    /// Public base URL of this service, used for the OAuth redirect URI
    /// (defaults to http://localhost:<port>)
    #[arg(long)]
    public_url: Option<String>,
}

/// Returns the default database path: ~/.local/share/kledo_sync/kledo.db
fn default_db_path() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("kledo_sync")
        .join("kledo.db")
        .to_string_lossy()
        .to_string()
}

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let db_path = PathBuf::from(&args.database);

    log::info!("Starting kledo_sync...");
    log::info!("Database path: {}", db_path.display());

    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        if !parent.exists() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                log::error!("Failed to create database directory: {e}");
                std::process::exit(1);
            }
            log::info!("Created directory: {}", parent.display());
        }
    }

    // Open the settings database
    let conn = match Connection::open(&db_path) {
        Ok(conn) => {
            log::info!("Opened database: {}", db_path.display());
            conn
        }
        Err(e) => {
            log::error!("Failed to open database: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = init_schema(&conn) {
        log::error!("Failed to initialize schema: {e}");
        std::process::exit(1);
    }

    let public_url = args
        .public_url
        .unwrap_or_else(|| format!("http://localhost:{}", args.port));
    let state = AppState::new(SettingsStore::new(conn), public_url);

    if let Err(e) = serve(state, args.port).await {
        log::error!("Server error: {e}");
        std::process::exit(1);
    }
}
