//! Account search, tag filtering and the persisted filter UI state.

use std::collections::{BTreeSet, HashSet};

use crate::domain::{FilterState, SavedAccount};
use crate::ports::KeyValuePort;

pub const FILTER_STATE_KEY: &str = "local:filterState";

/// Case-insensitive substring match on label, notes or address.
pub fn search_accounts<'a>(accounts: &'a [SavedAccount], query: &str) -> Vec<&'a SavedAccount> {
    let query = query.to_lowercase();
    accounts
        .iter()
        .filter(|a| matches_query(a, &query))
        .collect()
}

fn matches_query(account: &SavedAccount, lowercase_query: &str) -> bool {
    account.label.to_lowercase().contains(lowercase_query)
        || account.notes.to_lowercase().contains(lowercase_query)
        || account.address.as_str().to_lowercase().contains(lowercase_query)
}

/// Accounts carrying at least one of `selected`.
pub fn filter_by_tags<'a>(
    accounts: &'a [SavedAccount],
    selected: &HashSet<String>,
) -> Vec<&'a SavedAccount> {
    accounts
        .iter()
        .filter(|a| a.tags.iter().any(|t| selected.contains(t)))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagOption {
    pub tag_name: String,
    pub selected: bool,
}

/// Every tag in use, sorted. Nothing is selected while filters are off.
pub fn tag_options(
    accounts: &[SavedAccount],
    filters_enabled: bool,
    selected: &HashSet<String>,
) -> Vec<TagOption> {
    accounts
        .iter()
        .flat_map(|a| a.tags.iter())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(|tag| TagOption {
            tag_name: tag.clone(),
            selected: filters_enabled && selected.contains(tag),
        })
        .collect()
}

/// Applies a saved filter state: tag filter first (when enabled), then the
/// search query.
pub fn apply_filter_state<'a>(
    accounts: &'a [SavedAccount],
    state: &FilterState,
) -> Vec<&'a SavedAccount> {
    let selected: HashSet<String> = state.selected_tags.iter().cloned().collect();
    let query = state.search.to_lowercase();
    accounts
        .iter()
        .filter(|a| !state.enable_filters || a.tags.iter().any(|t| selected.contains(t)))
        .filter(|a| matches_query(a, &query))
        .collect()
}

/// Best-effort persistence of the filter UI state. Nothing here fails.
#[derive(Debug, Clone)]
pub struct FilterStateStore<S> {
    storage: S,
}

impl<S: KeyValuePort> FilterStateStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn load(&self) -> Option<FilterState> {
        let raw = match self.storage.get_item(FILTER_STATE_KEY) {
            Ok(Some(raw)) if !raw.is_empty() => raw,
            Ok(_) => return None,
            Err(e) => {
                tracing::error!(error = %e, "error reading filter state");
                return None;
            }
        };
        serde_json::from_str(&raw)
            .map_err(|e| tracing::debug!(error = %e, "ignoring malformed filter state"))
            .ok()
    }

    pub fn save(&self, state: &FilterState) {
        let result = serde_json::to_string(state)
            .map_err(|e| e.to_string())
            .and_then(|raw| {
                self.storage
                    .set_item(FILTER_STATE_KEY, &raw)
                    .map_err(|e| e.to_string())
            });
        if let Err(error) = result {
            tracing::error!(%error, "error saving filter state");
        }
    }

    pub fn clear(&self) {
        if let Err(e) = self.storage.remove_item(FILTER_STATE_KEY) {
            tracing::error!(error = %e, "error clearing filter state");
        }
    }
}
