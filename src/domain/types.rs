//! Shared types for the trip roster

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Registrant email address
///
/// Keeps the casing it was supplied with for display, but compares and hashes
/// case-insensitively: `Alice@Example.com` and `alice@example.com` are the
/// same person on a trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    pub fn new(email: impl Into<String>) -> Self {
        Self(email.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercased form used for every comparison
    pub fn key(&self) -> String {
        self.0.to_lowercase()
    }
}

impl PartialEq for Email {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0 || self.key() == other.key()
    }
}

impl Eq for Email {}

impl Hash for Email {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl std::fmt::Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Email {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Check-in flag carried by every registrant
///
/// Older data files spell the values with a space ("Checked In"); those are
/// accepted on read and written back in the canonical form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CheckInStatus {
    #[default]
    #[serde(alias = "Not Checked In")]
    NotCheckedIn,
    #[serde(alias = "Checked In")]
    CheckedIn,
}

impl CheckInStatus {
    pub fn is_checked_in(&self) -> bool {
        matches!(self, CheckInStatus::CheckedIn)
    }
}

/// One person on a trip, either holding a seat or waitlisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registrant {
    pub name: String,
    pub email: Email,
    #[serde(default)]
    pub check_in: CheckInStatus,
}

impl Registrant {
    /// Fresh registration, never checked in
    pub fn new(name: impl Into<String>, email: Email) -> Self {
        Self { name: name.into(), email, check_in: CheckInStatus::NotCheckedIn }
    }
}

/// Verified identity of whoever is driving an operation
///
/// Produced by an identity provider; the roster trusts `email` as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub name: String,
    pub email: Email,
}

impl Caller {
    pub fn new(name: impl Into<String>, email: impl Into<Email>) -> Self {
        Self { name: name.into(), email: email.into() }
    }

    /// Display name to record, falling back to the email when none was given
    pub fn display_name(&self) -> &str {
        let name = self.name.trim();
        if name.is_empty() {
            self.email.as_str()
        } else {
            name
        }
    }
}

/// Which of a trip's two lists an entry lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    Bus,
    Waitlist,
}

impl ListKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListKind::Bus => "bus",
            ListKind::Waitlist => "waitlist",
        }
    }
}

/// Returns true if a trip name is safe to use as a URL path segment and file stem
pub fn is_valid_trip_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
