use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimestampMs(pub u64);

impl TimestampMs {
    pub fn elapsed_since(self, earlier: TimestampMs) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

/// Base-58 encoded Solana address. Validity is decided by an
/// [`AddressValidator`](crate::ports::AddressValidator), not by this type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Public key bytes behind the address (plain base-58 decode).
    pub fn public_key_bytes(&self) -> Result<Vec<u8>, bs58::decode::Error> {
        bs58::decode(&self.0).into_vec()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for Address {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedAccount {
    pub address: Address,
    pub label: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl SavedAccount {
    pub fn new(address: impl Into<Address>, label: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            label: label.into(),
            notes: String::new(),
            tags: Vec::new(),
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Labeled summary of a saved account, as handed to a connecting page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectedAccount {
    pub address: Address,
    pub label: String,
    pub tags: Vec<String>,
}

impl From<&SavedAccount> for ConnectedAccount {
    fn from(account: &SavedAccount) -> Self {
        Self {
            address: account.address.clone(),
            label: account.label.clone(),
            tags: account.tags.clone(),
        }
    }
}

/// Requesting hostname -> addresses the user approved for it.
pub type Connections = BTreeMap<String, Vec<Address>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockSettings {
    pub is_enabled: bool,
    #[serde(default)]
    pub credential_id: Option<String>,
    #[serde(default)]
    pub public_key: Option<String>,
    pub relying_party_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockState {
    pub is_locked: bool,
    pub last_activity_timestamp: TimestampMs,
}

impl LockState {
    pub fn locked() -> Self {
        Self {
            is_locked: true,
            last_activity_timestamp: TimestampMs(0),
        }
    }

    pub fn unlocked_at(now: TimestampMs) -> Self {
        Self {
            is_locked: false,
            last_activity_timestamp: now,
        }
    }
}

impl Default for LockState {
    fn default() -> Self {
        Self::locked()
    }
}

/// Credential material returned by an authenticator enrollment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRegistration {
    pub credential_id: String,
    pub public_key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    pub enable_filters: bool,
    pub search: String,
    pub selected_tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportAddressesReport {
    pub imported_count: usize,
    pub skipped: Vec<Address>,
    pub invalid: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportAccountsReport {
    pub imported_count: usize,
    pub skipped: Vec<Address>,
    pub invalid: Vec<String>,
}
