//! # Persistence Coordinator
//!
//! Load and save of the state document against whichever backing store is
//! configured, with the codec, legacy migration and fallbacks applied.
//!
//! ## Load
//!
//! ```text
//! Remote configured?
//!   ├─ read ok, empty body ─────────────► defaults (remote is authoritative)
//!   ├─ read ok, ladder recovers ────────► merge onto defaults
//!   └─ read fails / ladder fails ─┐
//! Local slot ◄────────────────────┘
//!   ├─ ladder recovers ─────────────────► merge onto defaults
//!   └─ absent / unreadable ─────────────► defaults
//! Then at most ONE save if a legacy rung was used or records are present.
//! ```
//!
//! Text that a rung recognises but that cannot be merged (a plain JSON array,
//! `transactions` holding a string) is copied to [`SET_ASIDE_SLOT`] before
//! anything else happens. Local text is copied even when no rung recognises
//! it. If that copy cannot be written, every later save from this
//! coordinator is refused so the original is never overwritten.
//!
//! ## Save
//!
//! Encode once. Remote configured: write there, and on any failure write the
//! same blob to the local slot (the identifier is kept). Otherwise write the
//! local slot. Save never returns an error, only a [`SaveOutcome`].

use crate::remote::{DEFAULT_URL_TEMPLATE, RemoteAddress, RemoteEndpoint};
use coffer_core::primitives::{DOCUMENT_SLOT, SET_ASIDE_SLOT};
use coffer_core::{
    CofferError, ObfuscationCodec, Recovery, Settings, SlotStore, StateDocument, Strategy, recover,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

// =============================================================================
// BACKING STORE
// =============================================================================

/// Where the document lives for one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackingStore {
    Local,
    Remote(RemoteAddress),
}

/// Whether a remote, once configured, may be disconnected or re-seeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RemoteMigration {
    /// The identifier cannot be cleared and local data is never pushed back.
    #[default]
    OneWay,
    /// `clear_remote` and `push_local_to_remote` are allowed.
    Reversible,
}

impl RemoteMigration {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OneWay => "one-way",
            Self::Reversible => "reversible",
        }
    }
}

impl fmt::Display for RemoteMigration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RemoteMigration {
    type Err = CofferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "one-way" => Ok(Self::OneWay),
            "reversible" => Ok(Self::Reversible),
            other => Err(CofferError::ConfigError(format!(
                "Unknown remote migration policy '{}': use one-way or reversible",
                other
            ))),
        }
    }
}

// =============================================================================
// OUTCOMES
// =============================================================================

/// How a save settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Acknowledged by the remote endpoint.
    Remote,
    /// Written to the local slot (no remote configured).
    Local,
    /// The remote failed; the blob was written to the local slot instead.
    LocalFallback { reason: String },
    /// Nothing was written.
    Failed { reason: String },
}

impl SaveOutcome {
    /// Whether the blob reached some durable store.
    #[must_use]
    pub fn is_persisted(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    /// A non-blocking message for the user, if this outcome deserves one.
    #[must_use]
    pub fn notification(&self) -> Option<String> {
        match self {
            Self::Remote | Self::Local => None,
            Self::LocalFallback { reason } => Some(format!(
                "Remote save failed ({}); data kept on this device",
                reason
            )),
            Self::Failed { reason } => Some(format!("Save failed: {}", reason)),
        }
    }
}

/// Which store a loaded document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentSource {
    /// Nothing usable was found; built-in defaults.
    Defaults,
    Remote,
    Local,
}

/// Everything a caller may want to know about a load.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    /// The live document after merging onto defaults.
    pub document: StateDocument,
    pub source: DocumentSource,
    /// Ladder rung that produced the data, if any.
    pub strategy: Option<Strategy>,
    /// Why the remote path was abandoned, if it was.
    pub remote_failure: Option<String>,
    /// Outcome of the normalizing save, if one ran.
    pub normalized: Option<SaveOutcome>,
    /// Why stored text was copied to the set-aside slot instead of loaded.
    pub set_aside: Option<String>,
}

impl LoadReport {
    fn defaults() -> Self {
        Self {
            document: StateDocument::new(),
            source: DocumentSource::Defaults,
            strategy: None,
            remote_failure: None,
            normalized: None,
            set_aside: None,
        }
    }
}

/// Why stored text did not become the document.
struct Unusable {
    reason: String,
    /// A rung claimed the text, so it is real data in an unexpected shape.
    recognised: bool,
}

// =============================================================================
// COORDINATOR
// =============================================================================

/// Orchestrates load/save against the configured backing store.
pub struct PersistenceCoordinator<S, R> {
    slots: S,
    remote: R,
    codec: ObfuscationCodec,
    url_template: String,
    policy: RemoteMigration,
    /// Set when unusable data could not be copied aside; saves are refused.
    hold: OnceLock<String>,
}

impl<S: SlotStore, R: RemoteEndpoint> PersistenceCoordinator<S, R> {
    /// Create a coordinator with the default codec, template and policy.
    pub fn new(slots: S, remote: R) -> Self {
        Self {
            slots,
            remote,
            codec: ObfuscationCodec::default(),
            url_template: DEFAULT_URL_TEMPLATE.to_string(),
            policy: RemoteMigration::default(),
            hold: OnceLock::new(),
        }
    }

    #[must_use]
    pub fn with_codec(mut self, codec: ObfuscationCodec) -> Self {
        self.codec = codec;
        self
    }

    #[must_use]
    pub fn with_url_template(mut self, template: impl Into<String>) -> Self {
        self.url_template = template.into();
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: RemoteMigration) -> Self {
        self.policy = policy;
        self
    }

    pub fn codec(&self) -> &ObfuscationCodec {
        &self.codec
    }

    pub fn policy(&self) -> RemoteMigration {
        self.policy
    }

    pub fn slots(&self) -> &S {
        &self.slots
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Why saves are being refused, if they are.
    pub fn save_hold(&self) -> Option<&str> {
        self.hold.get().map(String::as_str)
    }

    /// Typed access to the settings slots.
    pub fn settings(&self) -> Settings<'_, S> {
        Settings::new(&self.slots)
    }

    /// Resolve an identifier with this coordinator's template.
    pub fn resolve(&self, identifier: &str) -> RemoteAddress {
        RemoteAddress::resolve(identifier, &self.url_template)
    }

    /// Pick the backing store for one operation.
    ///
    /// An unreadable settings slot counts as "no remote configured".
    pub fn backing_store(&self) -> BackingStore {
        match self.settings().remote_endpoint() {
            Ok(Some(identifier)) => BackingStore::Remote(self.resolve(&identifier)),
            Ok(None) => BackingStore::Local,
            Err(e) => {
                tracing::warn!(error = %e, "Cannot read remote endpoint setting, using local slot");
                BackingStore::Local
            }
        }
    }

    // -------------------------------------------------------------------------
    // LOAD
    // -------------------------------------------------------------------------

    /// Load the document. Never fails: the worst case is the default document.
    pub async fn load(&self) -> LoadReport {
        let mut report = LoadReport::defaults();
        let mut read_local = true;

        if let BackingStore::Remote(address) = self.backing_store() {
            match self.remote.read(&address).await {
                Ok(body) if body.trim().is_empty() => {
                    tracing::info!(remote = %address, "Remote endpoint is empty, starting from defaults");
                    read_local = false;
                }
                Ok(body) => match self.recover_into(&mut report.document, &body) {
                    Ok(strategy) => {
                        tracing::info!(remote = %address, rung = %strategy, "Loaded document from remote");
                        report.source = DocumentSource::Remote;
                        report.strategy = Some(strategy);
                        read_local = false;
                    }
                    Err(unusable) => {
                        tracing::warn!(remote = %address, reason = %unusable.reason, "Remote data unreadable, falling back to local slot");
                        if unusable.recognised {
                            self.set_aside(&mut report, &body, &unusable.reason);
                        }
                        report.remote_failure = Some(unusable.reason);
                    }
                },
                Err(e) => {
                    tracing::warn!(remote = %address, error = %e, "Remote read failed, falling back to local slot");
                    report.remote_failure = Some(e.to_string());
                }
            }
        }

        if read_local {
            match self.slots.read(DOCUMENT_SLOT) {
                Ok(Some(text)) => match self.recover_into(&mut report.document, &text) {
                    Ok(strategy) => {
                        tracing::debug!(rung = %strategy, "Loaded document from local slot");
                        report.source = DocumentSource::Local;
                        report.strategy = Some(strategy);
                    }
                    Err(unusable) => {
                        tracing::warn!(reason = %unusable.reason, "Local slot unreadable, starting from defaults");
                        self.set_aside(&mut report, &text, &unusable.reason);
                    }
                },
                Ok(None) => tracing::debug!("Local slot empty, starting from defaults"),
                Err(e) => tracing::warn!(error = %e, "Local slot read failed, starting from defaults"),
            }
        }

        let migrate = report.strategy.is_some_and(Strategy::needs_migration);
        if migrate || report.document.has_records() {
            if migrate {
                tracing::info!("Re-saving legacy plaintext data in encoded form");
            }
            report.normalized = Some(self.save(&report.document).await);
        }

        report
    }

    /// Run the recovery ladder and merge the result onto `document`.
    fn recover_into(&self, document: &mut StateDocument, text: &str) -> Result<Strategy, Unusable> {
        let recognised = |reason: String| Unusable {
            reason,
            recognised: true,
        };
        match recover(&self.codec, text) {
            Recovery::Recovered { patch, strategy } => document
                .apply(&patch)
                .map(|()| strategy)
                .map_err(|e| recognised(format!("{} rung: {}", strategy, e))),
            Recovery::Failed { strategy, reason } => {
                Err(recognised(format!("{} rung: {}", strategy, reason)))
            }
            Recovery::Exhausted => Err(Unusable {
                reason: "neither an encoded blob nor legacy JSON".to_string(),
                recognised: false,
            }),
        }
    }

    /// Copy unusable stored text to the set-aside slot, or hold all saves.
    fn set_aside(&self, report: &mut LoadReport, text: &str, reason: &str) {
        report.set_aside = Some(reason.to_string());
        match self.slots.write(SET_ASIDE_SLOT, text) {
            Ok(()) => {
                tracing::warn!(slot = SET_ASIDE_SLOT, bytes = text.len(), "Unusable data copied aside");
            }
            Err(e) => {
                tracing::error!(error = %e, "Cannot copy unusable data aside, saves are held");
                let _ = self.hold.set(format!(
                    "unreadable data could not be copied to '{}' ({}); refusing to overwrite it",
                    SET_ASIDE_SLOT, e
                ));
            }
        }
    }

    // -------------------------------------------------------------------------
    // SAVE
    // -------------------------------------------------------------------------

    /// Save the document. Never fails; see [`SaveOutcome`].
    pub async fn save(&self, document: &StateDocument) -> SaveOutcome {
        if let Some(reason) = self.hold.get() {
            tracing::warn!(%reason, "Save refused");
            return SaveOutcome::Failed {
                reason: reason.clone(),
            };
        }

        let blob = match self.codec.encode(document) {
            Ok(blob) => blob,
            Err(e) => {
                tracing::error!(error = %e, "Cannot encode document");
                return SaveOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        };

        match self.backing_store() {
            BackingStore::Remote(address) => match self.remote.write(&address, &blob).await {
                Ok(()) => {
                    tracing::debug!(remote = %address, bytes = blob.len(), "Saved to remote");
                    SaveOutcome::Remote
                }
                Err(remote_err) => {
                    tracing::warn!(remote = %address, error = %remote_err, "Remote save failed, writing local slot");
                    match self.slots.write(DOCUMENT_SLOT, &blob) {
                        Ok(()) => SaveOutcome::LocalFallback {
                            reason: remote_err.to_string(),
                        },
                        Err(local_err) => {
                            tracing::error!(error = %local_err, "Local fallback write failed");
                            SaveOutcome::Failed {
                                reason: format!("{}; local fallback: {}", remote_err, local_err),
                            }
                        }
                    }
                }
            },
            BackingStore::Local => match self.slots.write(DOCUMENT_SLOT, &blob) {
                Ok(()) => {
                    tracing::debug!(bytes = blob.len(), "Saved to local slot");
                    SaveOutcome::Local
                }
                Err(e) => {
                    tracing::error!(error = %e, "Local save failed");
                    SaveOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            },
        }
    }

    // -------------------------------------------------------------------------
    // REMOTE MANAGEMENT
    // -------------------------------------------------------------------------

    /// Check that an address answers a read.
    pub async fn check_reachable(&self, address: &RemoteAddress) -> Result<(), String> {
        self.remote
            .read(address)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    fn require_reversible(&self, operation: &str) -> Result<(), CofferError> {
        match self.policy {
            RemoteMigration::Reversible => Ok(()),
            RemoteMigration::OneWay => Err(CofferError::PolicyDenied(format!(
                "{} requires remote migration policy 'reversible' (current: {})",
                operation, self.policy
            ))),
        }
    }

    /// Forget the Remote Endpoint Identifier. Reversible policy only.
    pub fn clear_remote(&self) -> Result<(), CofferError> {
        self.require_reversible("clearing the remote endpoint")?;
        self.settings().clear_remote_endpoint()?;
        tracing::info!("Remote endpoint cleared, local slot is authoritative");
        Ok(())
    }

    /// Re-send the local slot blob to the remote verbatim. Reversible policy only.
    pub async fn push_local_to_remote(&self) -> Result<(), CofferError> {
        self.require_reversible("pushing local data to the remote")?;

        let BackingStore::Remote(address) = self.backing_store() else {
            return Err(CofferError::InvalidSetting(
                "No remote endpoint configured".to_string(),
            ));
        };
        let Some(blob) = self.slots.read(DOCUMENT_SLOT)? else {
            return Err(CofferError::InvalidSetting(
                "Local slot is empty, nothing to push".to_string(),
            ));
        };

        self.remote
            .write(&address, &blob)
            .await
            .map_err(|e| CofferError::IoError(format!("Push to {} failed: {}", address, e)))?;
        tracing::info!(remote = %address, bytes = blob.len(), "Local slot pushed to remote");
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_parses_kebab_case() {
        assert_eq!("one-way".parse::<RemoteMigration>().ok(), Some(RemoteMigration::OneWay));
        assert_eq!(
            "reversible".parse::<RemoteMigration>().ok(),
            Some(RemoteMigration::Reversible)
        );
        assert!("both".parse::<RemoteMigration>().is_err());
    }

    #[test]
    fn policy_defaults_to_one_way() {
        assert_eq!(RemoteMigration::default(), RemoteMigration::OneWay);
    }

    #[test]
    fn notifications_only_for_degraded_saves() {
        assert_eq!(SaveOutcome::Remote.notification(), None);
        assert_eq!(SaveOutcome::Local.notification(), None);
        assert!(
            SaveOutcome::LocalFallback {
                reason: "timeout".to_string()
            }
            .notification()
            .is_some()
        );
        assert!(
            !SaveOutcome::Failed {
                reason: "full".to_string()
            }
            .is_persisted()
        );
    }
}
