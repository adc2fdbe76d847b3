//! Background coordinator: the only context that opens connection UI and the
//! only one that routes decisions back to a tab. Also owns the startup and
//! periodic re-lock hooks.
//!
//! Nothing here returns an error to the message sender. Failures are logged
//! and the coordinator keeps running.

use serde_json::Value;

use crate::events::{
    decode, encode, origin_hostname, BackgroundEvent, InjectedEvent, MessageSender,
    SidePanelEvent, TaggedEvent,
};
use crate::lock::{LockStore, DEFAULT_INACTIVITY_TIMEOUT_MS};
use crate::ports::{ClockPort, KeyValuePort, SidePanelPort, TabsPort};
use crate::query::ConnectRequestParams;
use crate::state_machine::{apply_lock_action, inactivity_elapsed, LockAction, StateTransition};

pub const DEFAULT_SIDE_PANEL_PATH: &str = "/sidepanel.html";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorOutcome {
    Ignored,
    ConnectUiOpened { tab_id: u64, path: String },
    ConnectUiUnavailable { tab_id: u64 },
    DecisionForwarded { tab_id: u64 },
}

#[derive(Debug, Clone)]
pub struct BackgroundCoordinator<S, P, T, C> {
    lock: LockStore<S>,
    side_panel: P,
    tabs: T,
    clock: C,
    side_panel_path: String,
    inactivity_timeout_ms: u64,
}

impl<S, P, T, C> BackgroundCoordinator<S, P, T, C>
where
    S: KeyValuePort,
    P: SidePanelPort,
    T: TabsPort,
    C: ClockPort,
{
    pub fn new(storage: S, side_panel: P, tabs: T, clock: C) -> Self {
        Self {
            lock: LockStore::new(storage),
            side_panel,
            tabs,
            clock,
            side_panel_path: DEFAULT_SIDE_PANEL_PATH.to_owned(),
            inactivity_timeout_ms: DEFAULT_INACTIVITY_TIMEOUT_MS,
        }
    }

    pub fn with_side_panel_path(mut self, path: impl Into<String>) -> Self {
        self.side_panel_path = path.into();
        self
    }

    pub fn with_inactivity_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.inactivity_timeout_ms = timeout_ms;
        self
    }

    pub fn lock_store(&self) -> &LockStore<S> {
        &self.lock
    }

    /// Routes a runtime message from a relay or the side panel.
    pub fn handle_message(&self, data: &Value, sender: &MessageSender) -> CoordinatorOutcome {
        let Some(sender_url) = sender.url.as_deref() else {
            tracing::debug!("dropping message with unknown sender");
            return CoordinatorOutcome::Ignored;
        };

        if let Some(event) = decode::<InjectedEvent>(data) {
            return match event {
                InjectedEvent::RequestConnection { request_id } => {
                    self.open_connect_ui(request_id, sender_url, sender.tab_id)
                }
                other => {
                    tracing::debug!(kind = other.kind(), "ignoring event relays answer locally");
                    CoordinatorOutcome::Ignored
                }
            };
        }

        if let Some(SidePanelEvent::ConnectionSubmit {
            tab_id,
            request_id,
            for_origin,
            addresses,
        }) = decode::<SidePanelEvent>(data)
        {
            let forwarded = BackgroundEvent::ConnectionSubmitForwarded {
                request_id,
                for_origin,
                addresses,
            };
            return match encode(&forwarded).and_then(|msg| self.tabs.send_message(tab_id, msg)) {
                Ok(()) => {
                    tracing::debug!(tab_id, request_id, "forwarded connection decision");
                    CoordinatorOutcome::DecisionForwarded { tab_id }
                }
                Err(e) => {
                    tracing::error!(
                        tab_id,
                        request_id,
                        error = %e,
                        "failed to forward connection decision"
                    );
                    CoordinatorOutcome::Ignored
                }
            };
        }

        CoordinatorOutcome::Ignored
    }

    fn open_connect_ui(
        &self,
        request_id: u64,
        sender_url: &str,
        tab_id: Option<u64>,
    ) -> CoordinatorOutcome {
        let Some(tab_id) = tab_id else {
            tracing::warn!(request_id, "connection request without a sender tab");
            return CoordinatorOutcome::Ignored;
        };
        let Some(for_origin) = origin_hostname(sender_url) else {
            tracing::warn!(request_id, url = sender_url, "sender url has no hostname");
            return CoordinatorOutcome::Ignored;
        };

        let path = ConnectRequestParams {
            tab_id,
            request_id,
            for_origin,
        }
        .to_path(&self.side_panel_path);

        if let Err(e) = self.side_panel.set_options(&path, true) {
            tracing::error!(tab_id, error = %e, "error configuring side panel");
        }
        match self.side_panel.open(tab_id) {
            Ok(()) => {
                tracing::info!(tab_id, request_id, "opened connect screen");
                CoordinatorOutcome::ConnectUiOpened { tab_id, path }
            }
            Err(e) => {
                // No popup fallback; the page's request stays pending.
                tracing::error!(tab_id, error = %e, "error opening side panel");
                CoordinatorOutcome::ConnectUiUnavailable { tab_id }
            }
        }
    }

    /// Toolbar click opens the side panel instead of a popup.
    pub fn configure_action_behavior(&self) {
        if let Err(e) = self.side_panel.set_panel_behavior(true) {
            tracing::error!(error = %e, "error setting side panel behavior");
        }
    }

    /// Forces the lock on process start when the lock feature is enabled.
    pub fn on_startup(&self) -> Option<StateTransition> {
        if !self.lock.is_enabled() {
            return None;
        }
        let state = self.lock.state();
        let (next, transition) =
            match apply_lock_action(state, LockAction::Restart, state.last_activity_timestamp) {
                Ok(applied) => applied,
                Err(e) => {
                    tracing::error!(error = %e, "restart transition rejected");
                    return None;
                }
            };
        if let Err(e) = self.lock.set_state(&next) {
            tracing::error!(error = %e, "failed to lock on startup");
            return None;
        }
        tracing::info!("biometric lock engaged on startup");
        Some(transition)
    }

    /// One tick of the periodic re-lock check. A failed write is retried by
    /// the next tick.
    pub fn relock_tick(&self) -> Option<StateTransition> {
        if !self.lock.is_enabled() {
            return None;
        }
        let state = self.lock.state();
        if state.is_locked {
            return None;
        }
        let now = match self.clock.now() {
            Ok(now) => now,
            Err(e) => {
                tracing::error!(error = %e, "clock unavailable for re-lock check");
                return None;
            }
        };
        if !inactivity_elapsed(&state, now, self.inactivity_timeout_ms) {
            return None;
        }

        let (next, transition) = match apply_lock_action(state, LockAction::InactivityElapsed, now)
        {
            Ok(applied) => applied,
            Err(e) => {
                tracing::error!(error = %e, "inactivity transition rejected");
                return None;
            }
        };
        if let Err(e) = self.lock.set_state(&next) {
            tracing::error!(error = %e, "failed to persist inactivity lock");
            return None;
        }
        tracing::info!(
            idle_ms = now.elapsed_since(state.last_activity_timestamp),
            "locked after inactivity"
        );
        Some(transition)
    }
}
