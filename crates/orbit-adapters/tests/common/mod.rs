#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use orbit_adapters::MemoryStorageAdapter;
use orbit_core::{
    AuthenticatorPort, ClockPort, LockSettings, LockState, LockStore, PortError, TimestampMs,
};

pub const T0: u64 = 1_739_750_400_000;
pub const SYSTEM_PROGRAM: &str = "11111111111111111111111111111111";
pub const TOKEN_PROGRAM: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
pub const PAGE_ORIGIN: &str = "https://app.example.com";
pub const PAGE_URL: &str = "https://app.example.com/swap";
pub const PANEL_URL: &str = "chrome-extension://orbit/sidepanel.html";

#[derive(Debug, Clone, Default)]
pub struct TestClock {
    now: Arc<AtomicU64>,
}

impl TestClock {
    pub fn at(now_ms: u64) -> Self {
        let clock = Self::default();
        clock.set(now_ms);
        clock
    }

    pub fn set(&self, now_ms: u64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }
}

impl ClockPort for TestClock {
    fn now_ms(&self) -> Result<u64, PortError> {
        Ok(self.now.load(Ordering::SeqCst))
    }
}

/// Authenticator that accepts or refuses every credential.
#[derive(Debug, Clone, Copy)]
pub struct FixedAuthenticator(pub bool);

impl AuthenticatorPort for FixedAuthenticator {
    fn authenticate(&self, _credential_id: &str) -> Result<bool, PortError> {
        Ok(self.0)
    }
}

pub fn enable_lock(
    storage: &MemoryStorageAdapter,
    last_activity_ms: u64,
) -> LockStore<MemoryStorageAdapter> {
    let lock = LockStore::new(storage.clone());
    lock.save_settings(&LockSettings {
        is_enabled: true,
        credential_id: Some("cred".to_owned()),
        public_key: None,
        relying_party_id: "orbit.local".to_owned(),
    })
    .expect("save settings");
    lock.set_state(&LockState::unlocked_at(TimestampMs(last_activity_ms)))
        .expect("save state");
    lock
}
