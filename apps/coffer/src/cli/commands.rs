//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.
//!
//! Degraded saves (remote fallback, failed writes) are reported as warnings
//! on stderr; the command itself still completes.

use super::{CategoryCommand, RemoteCommand, SettingsCommand};
use crate::api;
use crate::config::CofferConfig;
use crate::coordinator::{BackingStore, LoadReport, PersistenceCoordinator, SaveOutcome};
use crate::remote::HttpRemote;
use crate::vault::Vault;
use coffer_core::primitives::{MAX_IMPORT_FILE_SIZE, SET_ASIDE_SLOT};
use coffer_core::{
    Category, CategoryDomain, CofferError, Collection, PreparedImport, Record, RedbSlots, Theme,
    record_id,
};
use serde_json::{Value, json};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

type CliVault = Vault<RedbSlots, HttpRemote>;

// =============================================================================
// SETUP
// =============================================================================

/// Build the coordinator described by the config.
pub fn build_coordinator(
    config: &CofferConfig,
) -> Result<PersistenceCoordinator<RedbSlots, HttpRemote>, CofferError> {
    let slots = RedbSlots::open_with_quota(&config.data_path, config.slot_quota_bytes)?;
    let remote = HttpRemote::new(config.remote.timeout())
        .map_err(|e| CofferError::ConfigError(e.to_string()))?;
    Ok(PersistenceCoordinator::new(slots, remote)
        .with_url_template(config.remote.url_template.clone())
        .with_policy(config.remote.migration))
}

/// Open the vault, reporting load fallbacks.
async fn open_vault(config: &CofferConfig) -> Result<(CliVault, LoadReport), CofferError> {
    let (vault, report) = Vault::open(build_coordinator(config)?).await;
    if let Some(reason) = &report.remote_failure {
        warn(&format!("Remote unavailable ({}); using data on this device", reason));
    }
    if let Some(reason) = &report.set_aside {
        warn(&format!(
            "Stored data could not be loaded ({}); it was kept in slot '{}'",
            reason, SET_ASIDE_SLOT
        ));
    }
    if let Some(reason) = vault.coordinator().save_hold() {
        warn(&format!("Saves are disabled: {}", reason));
    }
    if let Some(outcome) = &report.normalized {
        notify(outcome);
    }
    Ok((vault, report))
}

fn warn(message: &str) {
    eprintln!("warning: {}", message);
}

/// Print a non-blocking notification for a degraded save.
fn notify(outcome: &SaveOutcome) {
    if let Some(message) = outcome.notification() {
        warn(&message);
    }
}

fn save_label(outcome: &SaveOutcome) -> &'static str {
    match outcome {
        SaveOutcome::Remote => "remote",
        SaveOutcome::Local => "local",
        SaveOutcome::LocalFallback { .. } => "local-fallback",
        SaveOutcome::Failed { .. } => "failed",
    }
}

fn print_json(value: &Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_default()
    );
}

/// Parse a JSON object argument into a record.
fn parse_record(raw: &str) -> Result<Record, CofferError> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(record)) => Ok(record),
        Ok(_) => Err(CofferError::InvalidRecord(
            "Record must be a JSON object".to_string(),
        )),
        Err(e) => Err(CofferError::InvalidRecord(format!("Invalid JSON: {}", e))),
    }
}

/// Ask a yes/no question on stdin. Anything but y/yes is no.
fn confirm(question: &str) -> bool {
    print!("{} [y/N] ", question);
    if std::io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    if std::io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

// =============================================================================
// FILE PATHS
// =============================================================================

/// Resolve an input path to an existing regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, CofferError> {
    let canonical = path.canonicalize().map_err(|e| {
        CofferError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(CofferError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Resolve an output path whose parent directory must exist.
fn validate_output_path(path: &Path) -> Result<PathBuf, CofferError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        CofferError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(CofferError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| CofferError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show where data lives and what it holds.
pub async fn cmd_status(config: &CofferConfig, json_mode: bool) -> Result<(), CofferError> {
    let (vault, report) = open_vault(config).await?;
    let coordinator = vault.coordinator();
    let settings = coordinator.settings();
    let doc = vault.document();

    let backing = match coordinator.backing_store() {
        BackingStore::Local => "local".to_string(),
        BackingStore::Remote(address) => address.to_string(),
    };
    let reminder_days = settings.reminder_days()?;
    let theme = settings.theme()?;
    let slot_keys = coordinator.slots().keys()?;

    if json_mode {
        let counts: serde_json::Map<String, Value> = Collection::ALL
            .iter()
            .map(|c| (c.as_str().to_string(), json!(doc.records(*c).len())))
            .collect();
        print_json(&json!({
            "database": config.data_path.to_string_lossy(),
            "backing_store": backing,
            "source": report.source,
            "rung": report.strategy.map(|s| s.name()),
            "records": counts,
            "categories": {
                "income": doc.categories.income.len(),
                "expense": doc.categories.expense.len(),
                "investment": doc.categories.investment.len(),
            },
            "reminder_days": reminder_days,
            "theme": theme,
            "remote_migration": coordinator.policy(),
            "slots": slot_keys,
            "set_aside": report.set_aside,
        }));
        return Ok(());
    }

    println!("Coffer Status");
    println!("=============");
    println!("Database:      {:?}", config.data_path);
    println!("Backing store: {}", backing);
    println!("Loaded from:   {:?}", report.source);
    if let Some(strategy) = report.strategy {
        println!("Format:        {}", strategy);
    }
    println!();
    for collection in Collection::ALL {
        println!(
            "{:<14} {}",
            format!("{}:", collection),
            doc.records(collection).len()
        );
    }
    println!();
    for domain in CategoryDomain::ALL {
        println!(
            "{:<14} {} categories",
            format!("{}:", domain),
            doc.categories.domain(domain).len()
        );
    }
    println!();
    println!("Reminder days: {}", reminder_days);
    println!("Theme:         {}", theme);
    println!("Remote policy: {}", coordinator.policy());
    println!("Slots:         {}", slot_keys.join(", "));

    Ok(())
}

// =============================================================================
// DUMP COMMAND
// =============================================================================

/// Print the live document, or one collection, as JSON.
pub async fn cmd_dump(
    config: &CofferConfig,
    collection: Option<Collection>,
) -> Result<(), CofferError> {
    let (vault, _) = open_vault(config).await?;
    let doc = vault.document();

    let value = match collection {
        Some(c) => Value::Array(doc.records(c).to_vec()),
        None => doc.to_value()?,
    };
    print_json(&value);
    Ok(())
}

// =============================================================================
// RECORD COMMANDS
// =============================================================================

fn report_record(
    json_mode: bool,
    verb: &str,
    collection: Collection,
    id: &str,
    saved: &SaveOutcome,
) {
    notify(saved);
    if json_mode {
        print_json(&json!({
            "success": saved.is_persisted(),
            "action": verb,
            "collection": collection,
            "id": id,
            "saved": save_label(saved),
        }));
    } else {
        println!("{} {} record {}", verb, collection, id);
    }
}

/// Add a record.
pub async fn cmd_add(
    config: &CofferConfig,
    json_mode: bool,
    collection: Collection,
    raw: &str,
) -> Result<(), CofferError> {
    let record = parse_record(raw)?;
    let (mut vault, _) = open_vault(config).await?;

    if let Some(id) = record_id(&record) {
        if vault.document().find_record(collection, &id).is_some() {
            return Err(CofferError::InvalidRecord(format!(
                "A {} record with id '{}' already exists; use edit",
                collection, id
            )));
        }
    }

    let committed = vault.upsert_record(collection, record).await;
    report_record(json_mode, "Added", collection, &committed.value, &committed.saved);
    Ok(())
}

/// Overwrite fields of an existing record.
pub async fn cmd_edit(
    config: &CofferConfig,
    json_mode: bool,
    collection: Collection,
    id: &str,
    raw: &str,
) -> Result<(), CofferError> {
    let changes = parse_record(raw)?;
    let (mut vault, _) = open_vault(config).await?;

    let mut record = vault
        .document()
        .find_record(collection, id)
        .cloned()
        .ok_or_else(|| {
            CofferError::InvalidRecord(format!("No {} record with id '{}'", collection, id))
        })?;

    for (key, value) in changes {
        if key != "id" {
            record.insert(key, value);
        }
    }

    let committed = vault.upsert_record(collection, record).await;
    report_record(json_mode, "Updated", collection, &committed.value, &committed.saved);
    Ok(())
}

/// Delete a record.
pub async fn cmd_delete(
    config: &CofferConfig,
    json_mode: bool,
    collection: Collection,
    id: &str,
) -> Result<(), CofferError> {
    let (mut vault, _) = open_vault(config).await?;

    match vault.delete_record(collection, id).await {
        Some(saved) => {
            report_record(json_mode, "Deleted", collection, id, &saved);
            Ok(())
        }
        None => Err(CofferError::InvalidRecord(format!(
            "No {} record with id '{}'",
            collection, id
        ))),
    }
}

// =============================================================================
// CATEGORY COMMANDS
// =============================================================================

/// Add or remove a category.
pub async fn cmd_category(
    config: &CofferConfig,
    json_mode: bool,
    action: CategoryCommand,
) -> Result<(), CofferError> {
    let (mut vault, _) = open_vault(config).await?;

    let (verb, domain, id, saved) = match action {
        CategoryCommand::Add {
            domain,
            id,
            name,
            color,
        } => {
            let saved = vault
                .add_category(domain, Category::new(id.clone(), name, color))
                .await?;
            ("Added", domain, id, saved)
        }
        CategoryCommand::Remove { domain, id } => {
            let saved = vault.remove_category(domain, &id).await.ok_or_else(|| {
                CofferError::InvalidRecord(format!("No {} category '{}'", domain, id))
            })?;
            ("Removed", domain, id, saved)
        }
    };

    notify(&saved);
    if json_mode {
        print_json(&json!({
            "success": saved.is_persisted(),
            "action": verb,
            "domain": domain,
            "id": id,
            "saved": save_label(&saved),
        }));
    } else {
        println!("{} {} category '{}'", verb, domain, id);
    }
    Ok(())
}

// =============================================================================
// EXPORT / IMPORT COMMANDS
// =============================================================================

/// Write a snapshot file of the live document.
pub async fn cmd_export(
    config: &CofferConfig,
    json_mode: bool,
    output: Option<PathBuf>,
) -> Result<(), CofferError> {
    let (vault, _) = open_vault(config).await?;
    let snapshot = vault.export_snapshot()?;

    let target = output.unwrap_or_else(|| PathBuf::from(&snapshot.file_name));
    let target = validate_output_path(&target)?;
    std::fs::write(&target, &snapshot.contents)
        .map_err(|e| CofferError::IoError(format!("Cannot write {}: {}", target.display(), e)))?;

    if json_mode {
        print_json(&json!({
            "success": true,
            "file": target.to_string_lossy(),
            "bytes": snapshot.contents.len(),
        }));
    } else {
        println!("Exported to {}", target.display());
    }
    Ok(())
}

fn describe_import(prepared: &PreparedImport) -> String {
    let mut description = format!("{} records", prepared.record_count());
    if let Some(date) = &prepared.exported_at {
        description.push_str(&format!(" exported {}", date));
    }
    description
}

/// Import a snapshot file behind a confirmation prompt.
pub async fn cmd_import(
    config: &CofferConfig,
    json_mode: bool,
    input: &Path,
    yes: bool,
) -> Result<(), CofferError> {
    let path = validate_file_path(input)?;
    let size = std::fs::metadata(&path)
        .map_err(|e| CofferError::IoError(format!("Cannot read file metadata: {}", e)))?
        .len();
    if size > MAX_IMPORT_FILE_SIZE as u64 {
        return Err(coffer_core::ImportRejection::TooLarge {
            size: size as usize,
            limit: MAX_IMPORT_FILE_SIZE,
        }
        .into());
    }
    let bytes = std::fs::read(&path)
        .map_err(|e| CofferError::IoError(format!("Cannot read {}: {}", path.display(), e)))?;

    let (mut vault, _) = open_vault(config).await?;
    let committed = vault
        .import_snapshot(&bytes, |prepared| {
            yes || confirm(&format!(
                "Replace current data with {}?",
                describe_import(prepared)
            ))
        })
        .await?;

    notify(&committed.saved);
    if json_mode {
        print_json(&json!({
            "success": committed.saved.is_persisted(),
            "format": committed.value.strategy.name(),
            "records": committed.value.record_count(),
            "exported_at": committed.value.exported_at,
            "saved": save_label(&committed.saved),
        }));
    } else {
        println!("Imported {}", describe_import(&committed.value));
    }
    Ok(())
}

// =============================================================================
// REMOTE COMMANDS
// =============================================================================

/// Show, set, clear or push the remote endpoint.
pub async fn cmd_remote(
    config: &CofferConfig,
    json_mode: bool,
    action: RemoteCommand,
) -> Result<(), CofferError> {
    match action {
        RemoteCommand::Show => {
            let coordinator = build_coordinator(config)?;
            let identifier = coordinator.settings().remote_endpoint()?;
            let address = identifier.as_deref().map(|id| coordinator.resolve(id));
            if json_mode {
                print_json(&json!({
                    "identifier": identifier,
                    "url": address.map(|a| a.to_string()),
                    "policy": coordinator.policy(),
                }));
            } else {
                match address {
                    Some(address) => println!("Remote endpoint: {}", address),
                    None => println!("No remote endpoint configured; data stays on this device"),
                }
                println!("Policy:          {}", coordinator.policy());
            }
        }
        RemoteCommand::Set { identifier } => {
            let (vault, _) = open_vault(config).await?;
            let report = vault.connect_remote(&identifier).await?;
            if let Some(reason) = &report.reach_failure {
                warn(&format!(
                    "Endpoint saved, but could not verify connection: {}",
                    reason
                ));
            }
            if let Some(outcome) = &report.migrated {
                notify(outcome);
            }
            if json_mode {
                print_json(&json!({
                    "success": true,
                    "url": report.address.to_string(),
                    "verified": report.reach_failure.is_none(),
                    "migrated": report.migrated.as_ref().map(save_label),
                }));
            } else {
                println!("Remote endpoint set: {}", report.address);
            }
        }
        RemoteCommand::Clear => {
            build_coordinator(config)?.clear_remote()?;
            if json_mode {
                print_json(&json!({"success": true}));
            } else {
                println!("Remote endpoint cleared; data stays on this device");
            }
        }
        RemoteCommand::Push => {
            build_coordinator(config)?.push_local_to_remote().await?;
            if json_mode {
                print_json(&json!({"success": true}));
            } else {
                println!("Local data pushed to remote endpoint");
            }
        }
    }
    Ok(())
}

// =============================================================================
// SETTINGS COMMANDS
// =============================================================================

/// Show or change preferences. Settings never touch the remote.
pub fn cmd_settings(
    config: &CofferConfig,
    json_mode: bool,
    action: SettingsCommand,
) -> Result<(), CofferError> {
    let slots = RedbSlots::open_with_quota(&config.data_path, config.slot_quota_bytes)?;
    let settings = coffer_core::Settings::new(&slots);

    let (key, value) = match action {
        SettingsCommand::ReminderDays { days } => {
            if let Some(days) = days {
                settings.set_reminder_days(days)?;
            }
            ("reminder_days", json!(settings.reminder_days()?))
        }
        SettingsCommand::Theme { value } => {
            let theme = match value.as_deref() {
                None => settings.theme()?,
                Some("toggle") => settings.toggle_theme()?,
                Some(raw) => {
                    let theme: Theme = raw.parse()?;
                    settings.set_theme(theme)?;
                    theme
                }
            };
            ("theme", json!(theme))
        }
    };

    if json_mode {
        let mut out = serde_json::Map::new();
        out.insert(key.to_string(), value);
        print_json(&Value::Object(out));
    } else {
        println!("{}: {}", key, value);
    }
    Ok(())
}

// =============================================================================
// RESET COMMAND
// =============================================================================

/// Replace all data with the built-in defaults.
pub async fn cmd_reset(
    config: &CofferConfig,
    json_mode: bool,
    yes: bool,
) -> Result<(), CofferError> {
    let (mut vault, _) = open_vault(config).await?;

    if !yes && !confirm("Delete ALL records and restore default categories?") {
        println!("Reset cancelled");
        return Ok(());
    }

    let saved = vault.reset().await;
    notify(&saved);

    if json_mode {
        print_json(&json!({
            "success": saved.is_persisted(),
            "saved": save_label(&saved),
        }));
    } else {
        println!("All data reset to defaults");
    }
    Ok(())
}

// =============================================================================
// SERVE COMMAND
// =============================================================================

/// Run the self-hosted remote endpoint.
pub async fn cmd_serve(config: &CofferConfig) -> Result<(), CofferError> {
    let server = &config.server;

    println!("Coffer Endpoint Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:        {}", server.host);
    println!("  Port:        {}", server.port);
    println!("  Database:    {:?}", server.data_path);
    println!("  Deployments: {}", server.deployments.len());
    println!();
    println!("Endpoints:");
    println!("  GET  /macros/s/<deployment>/exec?action=read - Fetch stored blob");
    println!("  POST /macros/s/<deployment>/exec?action=save - Store blob");
    println!("  GET  /health                                 - Health check");
    println!();
    println!("Point a client at it with:");
    println!(
        "  coffer remote set http://{}:{}/macros/s/<deployment>/exec",
        server.host, server.port
    );
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let quota = config
        .slot_quota_bytes
        .saturating_mul(server.deployments.len() as u64);
    api::run_server(server, quota).await
}
