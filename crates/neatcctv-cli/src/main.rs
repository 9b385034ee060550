//! neatcctv - command line client for the NeatCCTV vehicle tracking API.
//!
//! Logs in to the vendor, lists vehicles and their status, and resolves
//! live video stream addresses. Session state is kept between runs.

mod commands;

use std::io;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use neatcctv_core::DEFAULT_CHANNEL;

/// Directory for a daily-rolling log file, if set
const LOG_DIR_ENV: &str = "NEATCCTV_LOG_DIR";

#[derive(Parser)]
#[command(name = "neatcctv", version, about = "NeatCCTV vehicle tracking client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in to the vendor API
    Login {
        #[arg(short, long)]
        username: Option<String>,
        /// Password (prompted for when omitted)
        #[arg(long)]
        password: Option<String>,
        /// Remember the password in the OS keychain
        #[arg(long)]
        remember: bool,
    },
    /// Start a demo session with a fabricated fleet
    Demo,
    /// Log out and clear the stored session
    Logout {
        /// Also forget the remembered password
        #[arg(long)]
        forget: bool,
    },
    /// Show the current session
    Status,
    /// List vehicles
    Vehicles {
        /// Use the device-number listing endpoint
        #[arg(long)]
        fallback: bool,
    },
    /// Online status of a device
    Online { device: String },
    /// GPS status of a device
    Gps { device: String },
    /// Track points of a device between two times (vendor time format)
    Track {
        device: String,
        start: String,
        end: String,
    },
    /// Latest reported position of a device
    Position { device: String },
    /// Resolve a live video stream address
    Stream {
        device: String,
        #[arg(short, long, default_value_t = DEFAULT_CHANNEL)]
        channel: u32,
        /// RTSP instead of HLS
        #[arg(long)]
        rtsp: bool,
    },
}

/// Initialize the tracing subscriber for logging
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match std::env::var_os(LOG_DIR_ENV) {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "neatcctv.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _log_guard = init_tracing();
    let cli = Cli::parse();
    info!("neatcctv starting");

    commands::run(cli.command).await
}
