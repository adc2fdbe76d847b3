//! Text formats for moving the address book in and out: a pretty JSON array
//! of accounts, and one address per line.

use thiserror::Error;

use crate::domain::SavedAccount;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Invalid file, does not contain accounts")]
    NotAccounts(#[source] serde_json::Error),
}

pub fn export_accounts_json<'a>(
    accounts: impl IntoIterator<Item = &'a SavedAccount>,
) -> Result<String, serde_json::Error> {
    let accounts: Vec<&SavedAccount> = accounts.into_iter().collect();
    serde_json::to_string_pretty(&accounts)
}

pub fn export_addresses_text<'a>(accounts: impl IntoIterator<Item = &'a SavedAccount>) -> String {
    accounts
        .into_iter()
        .map(|a| a.address.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parses an accounts export. Any structural problem rejects the whole file.
pub fn parse_accounts_json(raw: &str) -> Result<Vec<SavedAccount>, ImportError> {
    serde_json::from_str(raw).map_err(ImportError::NotAccounts)
}

/// Splits pasted text into candidate addresses, one per non-blank line.
pub fn parse_addresses_text(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect()
}
