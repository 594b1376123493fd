//! # Coffer CLI Module
//!
//! This module implements the CLI interface for Coffer.
//!
//! ## Available Commands
//!
//! - `status` - Show where data lives and what it holds
//! - `dump` - Print the live document as JSON
//! - `add` / `edit` / `delete` - Record mutations
//! - `category add|remove` - Category mutations
//! - `export` / `import` - Portable snapshot files
//! - `remote show|set|clear|push` - Remote endpoint management
//! - `settings reminder-days|theme` - Preferences
//! - `reset` - Replace everything with defaults
//! - `serve` - Run a self-hosted remote endpoint

mod commands;

use crate::config::CofferConfig;
use clap::{Parser, Subcommand};
use coffer_core::{CategoryDomain, CofferError, Collection};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Coffer - personal finance ledger store
///
/// Keeps transactions, investments, cards, debts, subscriptions and reminders
/// in one encoded document, on this device or on a remote endpoint.
#[derive(Parser, Debug)]
#[command(name = "coffer")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the config file (default: ./coffer.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the local slot database (overrides config and COFFER_DATA)
    #[arg(short = 'D', long, global = true)]
    pub data: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show storage location, record counts and settings
    Status,

    /// Print the live document (or one collection) as JSON
    Dump {
        /// Only this collection
        #[arg(short = 'C', long)]
        collection: Option<Collection>,
    },

    /// Add a record
    Add {
        /// Target collection (transactions, investments, cards, debts, subscriptions, reminders)
        collection: Collection,

        /// Record fields as a JSON object; an id is generated when absent
        #[arg(short, long)]
        json: String,
    },

    /// Update fields of an existing record
    Edit {
        collection: Collection,

        /// Record id
        id: String,

        /// Fields to overwrite, as a JSON object
        #[arg(short, long)]
        json: String,
    },

    /// Delete a record
    Delete {
        collection: Collection,

        /// Record id
        id: String,
    },

    /// Manage categories
    Category {
        #[command(subcommand)]
        action: CategoryCommand,
    },

    /// Export the live document to a snapshot file
    Export {
        /// Output file path (default: coffer-backup-YYYY-MM-DD.txt)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import a snapshot file, replacing the fields it contains
    Import {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Manage the remote endpoint
    Remote {
        #[command(subcommand)]
        action: RemoteCommand,
    },

    /// Show or change preferences
    Settings {
        #[command(subcommand)]
        action: SettingsCommand,
    },

    /// Replace all data with the built-in defaults
    Reset {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Run a self-hosted remote endpoint
    Serve {
        /// Host to bind to
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,
    },
}

/// `coffer category ...`
#[derive(Subcommand, Debug)]
pub enum CategoryCommand {
    /// Add a category
    Add {
        /// income, expense or investment
        domain: CategoryDomain,
        id: String,
        name: String,
        #[arg(long, default_value = "#6b7280")]
        color: String,
    },
    /// Remove a category (records keep the dangling id)
    Remove { domain: CategoryDomain, id: String },
}

/// `coffer remote ...`
#[derive(Subcommand, Debug)]
pub enum RemoteCommand {
    /// Show the configured endpoint and policy
    Show,
    /// Connect to an endpoint (deployment id or full URL) and migrate data to it
    Set { identifier: String },
    /// Forget the endpoint (reversible policy only)
    Clear,
    /// Re-send the local slot to the endpoint (reversible policy only)
    Push,
}

/// `coffer settings ...`
#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
    /// Show or set the reminder lookahead (1-30 days)
    ReminderDays { days: Option<u8> },
    /// Show or set the theme: dark, light or toggle
    Theme { value: Option<String> },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), CofferError> {
    let mut config = CofferConfig::load(cli.config.as_deref())?;
    if let Some(data) = cli.data {
        config.data_path = data;
    }
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Status) | None => cmd_status(&config, json_mode).await,
        Some(Commands::Dump { collection }) => cmd_dump(&config, collection).await,
        Some(Commands::Add { collection, json }) => {
            cmd_add(&config, json_mode, collection, &json).await
        }
        Some(Commands::Edit {
            collection,
            id,
            json,
        }) => cmd_edit(&config, json_mode, collection, &id, &json).await,
        Some(Commands::Delete { collection, id }) => {
            cmd_delete(&config, json_mode, collection, &id).await
        }
        Some(Commands::Category { action }) => cmd_category(&config, json_mode, action).await,
        Some(Commands::Export { output }) => cmd_export(&config, json_mode, output).await,
        Some(Commands::Import { input, yes }) => cmd_import(&config, json_mode, &input, yes).await,
        Some(Commands::Remote { action }) => cmd_remote(&config, json_mode, action).await,
        Some(Commands::Settings { action }) => cmd_settings(&config, json_mode, action),
        Some(Commands::Reset { yes }) => cmd_reset(&config, json_mode, yes).await,
        Some(Commands::Serve { host, port }) => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            cmd_serve(&config).await
        }
    }
}
