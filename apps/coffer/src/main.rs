//! # Coffer - Personal Finance Ledger Store
//!
//! The main binary for Coffer.
//!
//! This application provides:
//! - CLI interface over the state document
//! - Remote-or-local persistence with fallback
//! - A self-hosted remote endpoint server
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      apps/coffer (THE BINARY)                   │
//! │                                                                 │
//! │  ┌─────────────┐    ┌──────────────┐    ┌──────────────────┐   │
//! │  │   CLI       │───►│    Vault     │    │ Endpoint Server  │   │
//! │  │  (clap)     │    │ (1 writer)   │    │     (axum)       │   │
//! │  └─────────────┘    └──────┬───────┘    └────────┬─────────┘   │
//! │                            ▼                     │              │
//! │                   ┌─────────────────┐   HTTP     │              │
//! │                   │   Coordinator   │───────────►│              │
//! │                   │ remote │ local  │  (reqwest) │              │
//! │                   └────────┬────────┘                           │
//! │                            ▼                                    │
//! │                    ┌───────────────┐                            │
//! │                    │  coffer-core  │                            │
//! │                    │ (THE STORE)   │                            │
//! │                    └───────────────┘                            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Local ledger
//! coffer status
//! coffer add transactions --json '{"type":"expense","amount":12.5,"category":"food"}'
//! coffer export -o backup.txt
//!
//! # Self-hosted remote
//! coffer serve --port 8787
//! coffer remote set http://127.0.0.1:8787/macros/s/local/exec
//! ```

use clap::Parser;
use coffer::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    // COFFER_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("COFFER_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let default_filter = match cli.command {
        Some(cli::Commands::Serve { .. }) => "coffer=info,tower_http=debug",
        _ => "coffer=warn",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

/// Print the Coffer startup banner.
fn print_banner() {
    println!(
        r#"
   ██████╗ ██████╗ ███████╗███████╗███████╗██████╗
  ██╔════╝██╔═══██╗██╔════╝██╔════╝██╔════╝██╔══██╗
  ██║     ██║   ██║█████╗  █████╗  █████╗  ██████╔╝
  ██║     ██║   ██║██╔══╝  ██╔══╝  ██╔══╝  ██╔══██╗
  ╚██████╗╚██████╔╝██║     ██║     ███████╗██║  ██║
   ╚═════╝ ╚═════╝ ╚═╝     ╚═╝     ╚══════╝╚═╝  ╚═╝

  Coffer v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
