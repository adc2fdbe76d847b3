//! Biometric session lock: persisted settings, session-scoped lock state and
//! the route guard consulted by the side panel.
//!
//! Reads never fail outward. Missing, unreadable or malformed records degrade
//! to "no settings" and "locked" respectively.

use thiserror::Error;

use crate::domain::{CredentialRegistration, LockSettings, LockState, TimestampMs};
use crate::ports::{AuthenticatorPort, ClockPort, KeyValuePort, PortError};
use crate::query::side_panel_route;
use crate::state_machine::{apply_lock_action, LockAction, StateTransition};

pub const LOCK_SETTINGS_KEY: &str = "local:biometricLockSettings";
pub const LOCK_STATE_KEY: &str = "session:biometricLockState";

pub const DEFAULT_INACTIVITY_TIMEOUT_MS: u64 = 30 * 60 * 1000;
pub const DEFAULT_RELOCK_CHECK_INTERVAL_MS: u64 = 5 * 60 * 1000;

/// Path prefix of the interactive connect screen, reachable while locked.
pub const CONNECT_ROUTE_PREFIX: &str = "/accounts/connect";

pub const DEFAULT_RELYING_PARTY_ID: &str = "orbit.local";

#[derive(Debug, Error)]
pub enum LockError {
    #[error("Authentication failed. Please try again.")]
    AuthenticationFailed,
    #[error(transparent)]
    Port(#[from] PortError),
}

#[derive(Debug, Clone)]
pub struct LockStore<S> {
    storage: S,
}

impl<S: KeyValuePort> LockStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn settings(&self) -> Option<LockSettings> {
        let raw = match self.storage.get_item(LOCK_SETTINGS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::error!(error = %e, "error reading biometric lock settings");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(settings) => Some(settings),
            Err(e) => {
                tracing::error!(error = %e, "invalid biometric lock settings");
                None
            }
        }
    }

    pub fn save_settings(&self, settings: &LockSettings) -> Result<(), PortError> {
        let raw = serde_json::to_string(settings).map_err(|e| {
            PortError::Validation(format!("lock settings serialization failed: {e}"))
        })?;
        self.storage.set_item(LOCK_SETTINGS_KEY, &raw)
    }

    /// Removes both the settings and the session lock state.
    pub fn clear_settings(&self) -> Result<(), PortError> {
        self.storage.remove_item(LOCK_SETTINGS_KEY)?;
        self.storage.remove_item(LOCK_STATE_KEY)
    }

    pub fn is_enabled(&self) -> bool {
        self.settings().map(|s| s.is_enabled).unwrap_or(false)
    }

    pub fn state(&self) -> LockState {
        let raw = match self.storage.get_item(LOCK_STATE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return LockState::locked(),
            Err(e) => {
                tracing::error!(error = %e, "error reading lock state");
                return LockState::locked();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "invalid lock state, treating as locked");
            LockState::locked()
        })
    }

    pub fn set_state(&self, state: &LockState) -> Result<(), PortError> {
        let raw = serde_json::to_string(state)
            .map_err(|e| PortError::Validation(format!("lock state serialization failed: {e}")))?;
        self.storage.set_item(LOCK_STATE_KEY, &raw)
    }

    /// Stamps activity on an unlocked session. Returns the transition taken,
    /// or `None` when the lock is disabled or the session is locked.
    pub fn record_activity(&self, now: TimestampMs) -> Result<Option<StateTransition>, PortError> {
        if !self.is_enabled() {
            return Ok(None);
        }
        match apply_lock_action(self.state(), LockAction::Activity, now) {
            Ok((next, transition)) => {
                self.set_state(&next)?;
                Ok(Some(transition))
            }
            Err(e) => {
                tracing::debug!(error = %e, "ignoring activity while locked");
                Ok(None)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAccess {
    Granted,
    Locked,
}

/// Route gate for the side panel.
#[derive(Debug, Clone)]
pub struct LockGuard<S, A, C> {
    pub store: LockStore<S>,
    authenticator: A,
    clock: C,
    relying_party_id: String,
}

impl<S, A, C> LockGuard<S, A, C>
where
    S: KeyValuePort,
    A: AuthenticatorPort,
    C: ClockPort,
{
    pub fn new(store: LockStore<S>, authenticator: A, clock: C) -> Self {
        Self {
            store,
            authenticator,
            clock,
            relying_party_id: DEFAULT_RELYING_PARTY_ID.to_owned(),
        }
    }

    /// Relying party recorded with new enrollments.
    pub fn with_relying_party_id(mut self, relying_party_id: impl Into<String>) -> Self {
        self.relying_party_id = relying_party_id.into();
        self
    }

    pub fn is_locked(&self) -> bool {
        self.store.is_enabled() && self.store.state().is_locked
    }

    /// Accepts entry paths as well as routes; the connect entry written by
    /// the coordinator resolves to the connect route.
    pub fn access(&self, path: &str) -> RouteAccess {
        if side_panel_route(path).starts_with(CONNECT_ROUTE_PREFIX) || !self.is_locked() {
            RouteAccess::Granted
        } else {
            RouteAccess::Locked
        }
    }

    pub fn unlock(&self) -> Result<(), LockError> {
        let credential_id = self.store.settings().and_then(|s| s.credential_id);
        match credential_id {
            // Settings without a credential cannot be verified; unlock anyway.
            None => tracing::warn!("no enrolled credential, unlocking without verification"),
            Some(id) => match self.authenticator.authenticate(&id) {
                Ok(true) => {}
                Ok(false) => return Err(LockError::AuthenticationFailed),
                Err(e) => {
                    tracing::warn!(error = %e, "authenticator error");
                    return Err(LockError::AuthenticationFailed);
                }
            },
        }
        self.start_session()
    }

    pub fn enroll(&self, registration: CredentialRegistration) -> Result<(), LockError> {
        self.store.save_settings(&LockSettings {
            is_enabled: true,
            credential_id: Some(registration.credential_id),
            public_key: Some(registration.public_key),
            relying_party_id: self.relying_party_id.clone(),
        })?;
        tracing::info!(relying_party_id = %self.relying_party_id, "biometric lock enabled");
        self.start_session()
    }

    pub fn disable(&self) -> Result<(), LockError> {
        self.store.clear_settings()?;
        tracing::info!("biometric lock disabled");
        Ok(())
    }

    fn start_session(&self) -> Result<(), LockError> {
        let now = self.clock.now()?;
        let (next, _) = apply_lock_action(self.store.state(), LockAction::Authenticate, now)
            .map_err(|e| PortError::Policy(e.to_string()))?;
        self.store.set_state(&next)?;
        Ok(())
    }
}
