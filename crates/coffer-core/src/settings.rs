//! # Settings Slots
//!
//! User preferences kept next to the document in the local slot store:
//! the Remote Endpoint Identifier, the reminder lookahead window and the theme.
//!
//! Settings are always local, even when the document lives on a remote.

use crate::CofferError;
use crate::primitives::{
    DEFAULT_REMINDER_DAYS, MAX_REMINDER_DAYS, MIN_REMINDER_DAYS, REMINDER_DAYS_SLOT,
    REMOTE_ENDPOINT_SLOT, THEME_SLOT,
};
use crate::storage::SlotStore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// UI theme preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dark => "dark",
            Self::Light => "light",
        }
    }

    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = CofferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dark" => Ok(Self::Dark),
            "light" => Ok(Self::Light),
            other => Err(CofferError::InvalidSetting(format!(
                "Unknown theme '{}': use dark or light",
                other
            ))),
        }
    }
}

/// Typed access to the settings slots of a store.
pub struct Settings<'a, S: SlotStore + ?Sized> {
    slots: &'a S,
}

impl<'a, S: SlotStore + ?Sized> Settings<'a, S> {
    #[must_use]
    pub fn new(slots: &'a S) -> Self {
        Self { slots }
    }

    /// The configured Remote Endpoint Identifier, if any.
    ///
    /// A blank stored value counts as unconfigured.
    pub fn remote_endpoint(&self) -> Result<Option<String>, CofferError> {
        Ok(self
            .slots
            .read(REMOTE_ENDPOINT_SLOT)?
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty()))
    }

    /// Persist a Remote Endpoint Identifier.
    pub fn set_remote_endpoint(&self, id: &str) -> Result<(), CofferError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(CofferError::InvalidSetting(
                "Remote endpoint identifier must not be empty".to_string(),
            ));
        }
        self.slots.write(REMOTE_ENDPOINT_SLOT, id)
    }

    /// Forget the Remote Endpoint Identifier.
    ///
    /// Whether callers may do this is a policy decision made above the store.
    pub fn clear_remote_endpoint(&self) -> Result<(), CofferError> {
        self.slots.remove(REMOTE_ENDPOINT_SLOT)
    }

    /// Reminder lookahead in days.
    ///
    /// Missing, unparsable or out-of-range values read as the default.
    pub fn reminder_days(&self) -> Result<u8, CofferError> {
        let stored = self.slots.read(REMINDER_DAYS_SLOT)?;
        Ok(stored
            .and_then(|raw| raw.trim().parse::<u8>().ok())
            .filter(|days| (MIN_REMINDER_DAYS..=MAX_REMINDER_DAYS).contains(days))
            .unwrap_or(DEFAULT_REMINDER_DAYS))
    }

    /// Store a reminder lookahead. Values outside 1–30 are rejected.
    pub fn set_reminder_days(&self, days: u8) -> Result<(), CofferError> {
        if !(MIN_REMINDER_DAYS..=MAX_REMINDER_DAYS).contains(&days) {
            return Err(CofferError::InvalidSetting(format!(
                "Reminder lookahead must be between {} and {} days, got {}",
                MIN_REMINDER_DAYS, MAX_REMINDER_DAYS, days
            )));
        }
        self.slots.write(REMINDER_DAYS_SLOT, &days.to_string())
    }

    /// Theme preference; unknown stored values read as the default.
    pub fn theme(&self) -> Result<Theme, CofferError> {
        Ok(self
            .slots
            .read(THEME_SLOT)?
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default())
    }

    pub fn set_theme(&self, theme: Theme) -> Result<(), CofferError> {
        self.slots.write(THEME_SLOT, theme.as_str())
    }

    /// Flip the theme and return the new value.
    pub fn toggle_theme(&self) -> Result<Theme, CofferError> {
        let next = self.theme()?.toggled();
        self.set_theme(next)?;
        Ok(next)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemorySlots;

    #[test]
    fn defaults_when_unset() {
        let slots = MemorySlots::new();
        let settings = Settings::new(&slots);

        assert_eq!(settings.remote_endpoint().expect("remote"), None);
        assert_eq!(settings.reminder_days().expect("days"), 7);
        assert_eq!(settings.theme().expect("theme"), Theme::Dark);
    }

    #[test]
    fn reminder_days_range_enforced() {
        let slots = MemorySlots::new();
        let settings = Settings::new(&slots);

        settings.set_reminder_days(30).expect("upper bound");
        assert_eq!(settings.reminder_days().expect("days"), 30);

        assert!(settings.set_reminder_days(0).is_err());
        assert!(settings.set_reminder_days(31).is_err());
        assert_eq!(settings.reminder_days().expect("days"), 30);
    }

    #[test]
    fn corrupt_reminder_days_read_as_default() {
        let slots = MemorySlots::new();
        slots.write(REMINDER_DAYS_SLOT, "ninety").expect("write");
        assert_eq!(Settings::new(&slots).reminder_days().expect("days"), 7);

        slots.write(REMINDER_DAYS_SLOT, "45").expect("write");
        assert_eq!(Settings::new(&slots).reminder_days().expect("days"), 7);
    }

    #[test]
    fn remote_endpoint_trimmed_and_cleared() {
        let slots = MemorySlots::new();
        let settings = Settings::new(&slots);

        settings.set_remote_endpoint("  AKfy-deploy  ").expect("set");
        assert_eq!(
            settings.remote_endpoint().expect("remote").as_deref(),
            Some("AKfy-deploy")
        );
        assert!(settings.set_remote_endpoint("   ").is_err());

        settings.clear_remote_endpoint().expect("clear");
        assert_eq!(settings.remote_endpoint().expect("remote"), None);
    }

    #[test]
    fn theme_toggles() {
        let slots = MemorySlots::new();
        let settings = Settings::new(&slots);

        assert_eq!(settings.toggle_theme().expect("toggle"), Theme::Light);
        assert_eq!(settings.toggle_theme().expect("toggle"), Theme::Dark);
    }
}
