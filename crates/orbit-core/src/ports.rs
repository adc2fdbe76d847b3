use serde_json::Value;
use thiserror::Error;

use crate::domain::TimestampMs;

#[derive(Debug, Error)]
pub enum PortError {
    #[error("port not implemented: {0}")]
    NotImplemented(&'static str),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("policy error: {0}")]
    Policy(String),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Device-local string key-value store. Keys prefixed with `session:` live
/// only as long as the host process; every other key is durable.
pub trait KeyValuePort {
    fn get_item(&self, key: &str) -> Result<Option<String>, PortError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), PortError>;
    fn remove_item(&self, key: &str) -> Result<(), PortError>;
}

pub trait ClockPort {
    fn now_ms(&self) -> Result<u64, PortError>;

    fn now(&self) -> Result<TimestampMs, PortError> {
        self.now_ms().map(TimestampMs)
    }
}

/// Chain-specific address format check.
pub trait AddressValidator {
    fn is_valid_address(&self, raw: &str) -> bool;
}

/// The page's shared `window.postMessage` channel.
pub trait WindowPort {
    fn post_message(&self, data: Value) -> Result<(), PortError>;
}

/// Privileged runtime messaging from a content relay to the coordinator.
pub trait RuntimePort {
    fn send_message(&self, data: Value) -> Result<(), PortError>;
}

/// Coordinator-to-tab delivery.
pub trait TabsPort {
    fn send_message(&self, tab_id: u64, data: Value) -> Result<(), PortError>;
}

pub trait SidePanelPort {
    fn set_options(&self, path: &str, enabled: bool) -> Result<(), PortError>;
    fn open(&self, tab_id: u64) -> Result<(), PortError>;
    fn set_panel_behavior(&self, open_panel_on_action_click: bool) -> Result<(), PortError>;
}

/// Platform authenticator (biometric) verification of an enrolled credential.
pub trait AuthenticatorPort {
    fn authenticate(&self, credential_id: &str) -> Result<bool, PortError>;
}
