use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use orbit_core::coordinator::DEFAULT_SIDE_PANEL_PATH;
use orbit_core::lock::{
    DEFAULT_INACTIVITY_TIMEOUT_MS, DEFAULT_RELOCK_CHECK_INTERVAL_MS, DEFAULT_RELYING_PARTY_ID,
};
use orbit_core::{
    AuthenticatorPort, ClockPort, ContentEvent, KeyValuePort, LockGuard, LockStore, Resolver,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrbitConfig {
    pub inactivity_timeout_ms: u64,
    pub relock_check_interval_ms: u64,
    pub activity_debounce_ms: u64,
    /// Deadline for page requests awaiting a relay response. `None` waits
    /// forever.
    pub request_timeout_ms: Option<u64>,
    pub storage_path: PathBuf,
    pub side_panel_path: String,
    pub relying_party_id: String,
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self {
            inactivity_timeout_ms: DEFAULT_INACTIVITY_TIMEOUT_MS,
            relock_check_interval_ms: DEFAULT_RELOCK_CHECK_INTERVAL_MS,
            activity_debounce_ms: 1_000,
            request_timeout_ms: None,
            storage_path: PathBuf::from("./orbit-storage.json"),
            side_panel_path: DEFAULT_SIDE_PANEL_PATH.to_owned(),
            relying_party_id: DEFAULT_RELYING_PARTY_ID.to_owned(),
        }
    }
}

impl OrbitConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any variable source; unset keys keep defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let number = |key: &str, default: u64| match lookup(key) {
            None => default,
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(key, value = %raw, default, "invalid number, using default");
                default
            }),
        };

        let request_timeout_ms = lookup("ORBIT_REQUEST_TIMEOUT_MS").and_then(|raw| {
            match raw.trim().parse::<u64>() {
                Ok(0) => None,
                Ok(ms) => Some(ms),
                Err(_) => {
                    tracing::warn!(
                        value = %raw,
                        "invalid ORBIT_REQUEST_TIMEOUT_MS, requests will not time out"
                    );
                    None
                }
            }
        });

        Self {
            inactivity_timeout_ms: number(
                "ORBIT_INACTIVITY_TIMEOUT_MS",
                defaults.inactivity_timeout_ms,
            ),
            relock_check_interval_ms: number(
                "ORBIT_RELOCK_CHECK_INTERVAL_MS",
                defaults.relock_check_interval_ms,
            ),
            activity_debounce_ms: number(
                "ORBIT_ACTIVITY_DEBOUNCE_MS",
                defaults.activity_debounce_ms,
            ),
            request_timeout_ms,
            storage_path: lookup("ORBIT_STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_path),
            side_panel_path: lookup("ORBIT_SIDE_PANEL_PATH").unwrap_or(defaults.side_panel_path),
            relying_party_id: lookup("ORBIT_RELYING_PARTY_ID")
                .unwrap_or(defaults.relying_party_id),
        }
    }

    pub fn relock_check_interval(&self) -> Duration {
        Duration::from_millis(self.relock_check_interval_ms)
    }

    pub fn activity_debounce(&self) -> Duration {
        Duration::from_millis(self.activity_debounce_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    /// Resolver for the page wallet, with the configured request deadline.
    pub fn resolver(&self) -> Arc<Resolver<ContentEvent>> {
        match self.request_timeout() {
            Some(timeout) => Resolver::with_timeout(timeout),
            None => Resolver::new(),
        }
    }

    /// Side panel lock guard enrolling under the configured relying party.
    pub fn lock_guard<S, A, C>(&self, storage: S, authenticator: A, clock: C) -> LockGuard<S, A, C>
    where
        S: KeyValuePort,
        A: AuthenticatorPort,
        C: ClockPort,
    {
        LockGuard::new(LockStore::new(storage), authenticator, clock)
            .with_relying_party_id(self.relying_party_id.clone())
    }
}
