#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use orbit_core::ports::{
    AddressValidator, AuthenticatorPort, ClockPort, KeyValuePort, PortError, RuntimePort,
    SidePanelPort, TabsPort, WindowPort,
};
use orbit_core::{Address, SavedAccount};
use serde_json::Value;

pub const SYSTEM_PROGRAM: &str = "11111111111111111111111111111111";
pub const TOKEN_PROGRAM: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
pub const WRAPPED_SOL: &str = "So11111111111111111111111111111111111111112";
pub const VOTE_PROGRAM: &str = "Vote111111111111111111111111111111111111111";

pub fn address(raw: &str) -> Address {
    Address::new(raw)
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    items: Arc<Mutex<HashMap<String, String>>>,
    fail_writes: Arc<Mutex<bool>>,
}

impl MemoryStore {
    pub fn raw(&self, key: &str) -> Option<String> {
        self.items.lock().expect("store lock").get(key).cloned()
    }

    pub fn put_raw(&self, key: &str, value: &str) {
        self.items
            .lock()
            .expect("store lock")
            .insert(key.to_owned(), value.to_owned());
    }

    pub fn fail_writes(&self, fail: bool) {
        *self.fail_writes.lock().expect("flag lock") = fail;
    }

    pub fn restart(&self) {
        self.items
            .lock()
            .expect("store lock")
            .retain(|k, _| !k.starts_with("session:"));
    }

    fn check_writable(&self) -> Result<(), PortError> {
        if *self.fail_writes.lock().expect("flag lock") {
            return Err(PortError::Storage("writes disabled".to_owned()));
        }
        Ok(())
    }
}

impl KeyValuePort for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, PortError> {
        Ok(self.raw(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), PortError> {
        self.check_writable()?;
        self.put_raw(key, value);
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), PortError> {
        self.check_writable()?;
        self.items.lock().expect("store lock").remove(key);
        Ok(())
    }
}

/// Accepts base-58 strings that decode to 32 bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Base58Validator;

impl AddressValidator for Base58Validator {
    fn is_valid_address(&self, raw: &str) -> bool {
        matches!(bs58::decode(raw).into_vec(), Ok(bytes) if bytes.len() == 32)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Recorder {
    messages: Arc<Mutex<Vec<Value>>>,
}

impl Recorder {
    pub fn messages(&self) -> Vec<Value> {
        self.messages.lock().expect("recorder lock").clone()
    }

    pub fn take(&self) -> Vec<Value> {
        std::mem::take(&mut *self.messages.lock().expect("recorder lock"))
    }

    pub fn last(&self) -> Option<Value> {
        self.messages().last().cloned()
    }

    fn push(&self, data: Value) {
        self.messages.lock().expect("recorder lock").push(data);
    }
}

impl WindowPort for Recorder {
    fn post_message(&self, data: Value) -> Result<(), PortError> {
        self.push(data);
        Ok(())
    }
}

impl RuntimePort for Recorder {
    fn send_message(&self, data: Value) -> Result<(), PortError> {
        self.push(data);
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordingTabs {
    sent: Arc<Mutex<Vec<(u64, Value)>>>,
}

impl RecordingTabs {
    pub fn sent(&self) -> Vec<(u64, Value)> {
        self.sent.lock().expect("tabs lock").clone()
    }
}

impl TabsPort for RecordingTabs {
    fn send_message(&self, tab_id: u64, data: Value) -> Result<(), PortError> {
        self.sent.lock().expect("tabs lock").push((tab_id, data));
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordingSidePanel {
    pub paths: Arc<Mutex<Vec<String>>>,
    pub opened: Arc<Mutex<Vec<u64>>>,
    pub behavior: Arc<Mutex<Option<bool>>>,
    pub fail_open: bool,
}

impl RecordingSidePanel {
    pub fn failing_open() -> Self {
        Self {
            fail_open: true,
            ..Self::default()
        }
    }

    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().expect("panel lock").clone()
    }

    pub fn opened(&self) -> Vec<u64> {
        self.opened.lock().expect("panel lock").clone()
    }
}

impl SidePanelPort for RecordingSidePanel {
    fn set_options(&self, path: &str, _enabled: bool) -> Result<(), PortError> {
        self.paths.lock().expect("panel lock").push(path.to_owned());
        Ok(())
    }

    fn open(&self, tab_id: u64) -> Result<(), PortError> {
        if self.fail_open {
            return Err(PortError::Transport("side panel unavailable".to_owned()));
        }
        self.opened.lock().expect("panel lock").push(tab_id);
        Ok(())
    }

    fn set_panel_behavior(&self, open_panel_on_action_click: bool) -> Result<(), PortError> {
        *self.behavior.lock().expect("panel lock") = Some(open_panel_on_action_click);
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_ms: Arc<Mutex<u64>>,
}

impl ManualClock {
    pub fn at(now_ms: u64) -> Self {
        let clock = Self::default();
        clock.set(now_ms);
        clock
    }

    pub fn set(&self, now_ms: u64) {
        *self.now_ms.lock().expect("clock lock") = now_ms;
    }
}

impl ClockPort for ManualClock {
    fn now_ms(&self) -> Result<u64, PortError> {
        Ok(*self.now_ms.lock().expect("clock lock"))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StaticAuthenticator(pub bool);

impl AuthenticatorPort for StaticAuthenticator {
    fn authenticate(&self, _credential_id: &str) -> Result<bool, PortError> {
        Ok(self.0)
    }
}

pub fn seed_accounts(store: &MemoryStore, accounts: &[SavedAccount]) {
    store.put_raw(
        orbit_core::accounts::SAVED_ACCOUNTS_KEY,
        &serde_json::to_string(accounts).expect("serialize accounts"),
    );
}
