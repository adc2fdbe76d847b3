//! Saved-account address book persisted as one JSON blob.
//!
//! Every mutation reads the whole list, applies the change and writes the
//! whole list back. Concurrent writers race; the last write wins.

use std::collections::{BTreeMap, HashSet};

use thiserror::Error;

use crate::domain::{
    Address, ConnectedAccount, ImportAccountsReport, ImportAddressesReport, SavedAccount,
};
use crate::ports::{AddressValidator, KeyValuePort, PortError};

pub const SAVED_ACCOUNTS_KEY: &str = "local:accounts";

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Invalid address")]
    InvalidAddress,
    #[error("Label can't be empty")]
    EmptyLabel,
    #[error("Address already exists")]
    AddressExists,
    #[error("Label already exists")]
    LabelExists,
    #[error("No account found for address {0}")]
    NotFound(Address),
    #[error("stored accounts are corrupt: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Port(#[from] PortError),
}

/// Labels collide when they are equal ignoring case. Accents still count.
pub fn labels_collide(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

#[derive(Debug, Clone)]
pub struct AccountStore<S, V> {
    storage: S,
    validator: V,
}

impl<S: KeyValuePort, V: AddressValidator> AccountStore<S, V> {
    pub fn new(storage: S, validator: V) -> Self {
        Self { storage, validator }
    }

    pub fn validator(&self) -> &V {
        &self.validator
    }

    pub fn list(&self) -> Result<Vec<SavedAccount>, AccountError> {
        match self.storage.get_item(SAVED_ACCOUNTS_KEY)? {
            Some(raw) => {
                serde_json::from_str(&raw).map_err(|e| AccountError::Corrupt(e.to_string()))
            }
            None => Ok(Vec::new()),
        }
    }

    fn write(&self, accounts: &[SavedAccount]) -> Result<(), AccountError> {
        let raw = serde_json::to_string(accounts)
            .map_err(|e| PortError::Validation(format!("accounts serialization failed: {e}")))?;
        self.storage.set_item(SAVED_ACCOUNTS_KEY, &raw)?;
        Ok(())
    }

    fn validate(&self, account: &SavedAccount) -> Result<(), AccountError> {
        if !self.validator.is_valid_address(account.address.as_str()) {
            return Err(AccountError::InvalidAddress);
        }
        if account.label.is_empty() {
            return Err(AccountError::EmptyLabel);
        }
        Ok(())
    }

    pub fn get(&self, address: &Address) -> Result<SavedAccount, AccountError> {
        self.list()?
            .into_iter()
            .find(|a| &a.address == address)
            .ok_or_else(|| AccountError::NotFound(address.clone()))
    }

    pub fn save_new(&self, account: SavedAccount) -> Result<(), AccountError> {
        self.validate(&account)?;
        let mut accounts = self.list()?;
        for existing in &accounts {
            if existing.address == account.address {
                return Err(AccountError::AddressExists);
            }
            if labels_collide(&existing.label, &account.label) {
                return Err(AccountError::LabelExists);
            }
        }
        accounts.push(normalize_tags(account));
        self.write(&accounts)
    }

    /// Replaces label, notes and tags of the account with the same address.
    pub fn update(&self, account: SavedAccount) -> Result<(), AccountError> {
        self.validate(&account)?;
        let mut accounts = self.list()?;
        if accounts
            .iter()
            .any(|a| a.address != account.address && labels_collide(&a.label, &account.label))
        {
            return Err(AccountError::LabelExists);
        }
        let slot = accounts
            .iter_mut()
            .find(|a| a.address == account.address)
            .ok_or_else(|| AccountError::NotFound(account.address.clone()))?;
        *slot = normalize_tags(account);
        self.write(&accounts)
    }

    pub fn delete(&self, address: &Address) -> Result<(), AccountError> {
        let mut accounts = self.list()?;
        accounts.retain(|a| &a.address != address);
        self.write(&accounts)
    }

    /// Distinct tags in first-seen order.
    pub fn all_tags(&self) -> Result<Vec<String>, AccountError> {
        let mut seen = HashSet::new();
        let mut tags = Vec::new();
        for account in self.list()? {
            for tag in account.tags {
                if seen.insert(tag.clone()) {
                    tags.push(tag);
                }
            }
        }
        Ok(tags)
    }

    /// Joins `addresses` against the store, keeping their order and silently
    /// omitting any address without a saved account.
    pub fn connected_accounts(
        &self,
        addresses: &[Address],
    ) -> Result<Vec<ConnectedAccount>, AccountError> {
        let accounts = self.list()?;
        Ok(addresses
            .iter()
            .filter_map(|address| accounts.iter().find(|a| &a.address == address))
            .map(ConnectedAccount::from)
            .collect())
    }

    pub fn tags_for_addresses(
        &self,
        addresses: &[Address],
    ) -> Result<BTreeMap<Address, Vec<String>>, AccountError> {
        let accounts = self.list()?;
        Ok(addresses
            .iter()
            .filter_map(|address| {
                accounts
                    .iter()
                    .find(|a| &a.address == address)
                    .map(|a| (address.clone(), a.tags.clone()))
            })
            .collect())
    }

    /// Adds bare addresses with generated `account N` labels. Invalid strings
    /// and addresses already present (including repeats within `raw`) are
    /// reported, not saved.
    pub fn import_addresses(&self, raw: &[String]) -> Result<ImportAddressesReport, AccountError> {
        let mut accounts = self.list()?;
        let mut addresses: HashSet<Address> = accounts.iter().map(|a| a.address.clone()).collect();
        let mut labels = LabelSet::from_accounts(&accounts);
        let mut report = ImportAddressesReport::default();

        for candidate in raw {
            if !self.validator.is_valid_address(candidate) {
                report.invalid.push(candidate.clone());
                continue;
            }
            let address = Address::new(candidate.as_str());
            if !addresses.insert(address.clone()) {
                report.skipped.push(address);
                continue;
            }
            let label = labels.next_free(accounts.len() + 1);
            labels.insert(&label);
            accounts.push(SavedAccount::new(address, label));
            report.imported_count += 1;
        }

        self.write(&accounts)?;
        tracing::info!(
            imported = report.imported_count,
            skipped = report.skipped.len(),
            invalid = report.invalid.len(),
            "imported addresses"
        );
        Ok(report)
    }

    /// Adds full accounts. Existing addresses are skipped untouched; a
    /// colliding or empty label is replaced with a fresh `account N`.
    pub fn import_accounts(
        &self,
        incoming: Vec<SavedAccount>,
    ) -> Result<ImportAccountsReport, AccountError> {
        let mut accounts = self.list()?;
        let mut addresses: HashSet<Address> = accounts.iter().map(|a| a.address.clone()).collect();
        let mut labels = LabelSet::from_accounts(&accounts);
        let mut report = ImportAccountsReport::default();

        for mut account in incoming {
            if !self.validator.is_valid_address(account.address.as_str()) {
                report.invalid.push(account.address.to_string());
                continue;
            }
            if addresses.contains(&account.address) {
                report.skipped.push(account.address);
                continue;
            }
            if account.label.is_empty() || labels.contains(&account.label) {
                account.label = labels.next_free(accounts.len() + 1);
            }
            labels.insert(&account.label);
            addresses.insert(account.address.clone());
            accounts.push(normalize_tags(account));
            report.imported_count += 1;
        }

        self.write(&accounts)?;
        tracing::info!(
            imported = report.imported_count,
            skipped = report.skipped.len(),
            "imported accounts"
        );
        Ok(report)
    }
}

fn normalize_tags(mut account: SavedAccount) -> SavedAccount {
    let mut seen = HashSet::new();
    account.tags.retain(|t| !t.is_empty() && seen.insert(t.clone()));
    account
}

/// Case-folded label index used while generating import labels.
struct LabelSet(HashSet<String>);

impl LabelSet {
    fn from_accounts(accounts: &[SavedAccount]) -> Self {
        Self(accounts.iter().map(|a| a.label.to_lowercase()).collect())
    }

    fn contains(&self, label: &str) -> bool {
        self.0.contains(&label.to_lowercase())
    }

    fn insert(&mut self, label: &str) {
        self.0.insert(label.to_lowercase());
    }

    fn next_free(&self, start: usize) -> String {
        let mut n = start;
        loop {
            let label = format!("account {n}");
            if !self.contains(&label) {
                return label;
            }
            n += 1;
        }
    }
}
