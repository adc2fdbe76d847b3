use std::sync::{Arc, Mutex};

use orbit_core::{PortError, SidePanelPort};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SidePanelCall {
    SetOptions { path: String, enabled: bool },
    Open { tab_id: u64 },
    SetPanelBehavior { open_panel_on_action_click: bool },
}

/// Side panel that records every request. Used by the host binary, which has
/// no browser surface to drive, and by tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingSidePanel {
    calls: Arc<Mutex<Vec<SidePanelCall>>>,
    open_unavailable: bool,
}

impl RecordingSidePanel {
    /// A panel whose `open` always fails, as when the browser refuses to show
    /// it without a user gesture.
    pub fn unavailable() -> Self {
        Self {
            open_unavailable: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<SidePanelCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Path most recently configured through `set_options`.
    pub fn current_path(&self) -> Option<String> {
        self.calls().into_iter().rev().find_map(|call| match call {
            SidePanelCall::SetOptions { path, .. } => Some(path),
            _ => None,
        })
    }

    fn record(&self, call: SidePanelCall) -> Result<(), PortError> {
        tracing::debug!(?call, "side panel");
        self.calls
            .lock()
            .map_err(|e| PortError::Transport(format!("side panel lock poisoned: {e}")))?
            .push(call);
        Ok(())
    }
}

impl SidePanelPort for RecordingSidePanel {
    fn set_options(&self, path: &str, enabled: bool) -> Result<(), PortError> {
        self.record(SidePanelCall::SetOptions {
            path: path.to_owned(),
            enabled,
        })
    }

    fn open(&self, tab_id: u64) -> Result<(), PortError> {
        if self.open_unavailable {
            return Err(PortError::NotImplemented("side_panel.open"));
        }
        self.record(SidePanelCall::Open { tab_id })
    }

    fn set_panel_behavior(&self, open_panel_on_action_click: bool) -> Result<(), PortError> {
        self.record(SidePanelCall::SetPanelBehavior {
            open_panel_on_action_click,
        })
    }
}
