//! In-process stand-in for the browser's messaging fabric.
//!
//! Each context gets a port handle; messages queue on the bus until the
//! driver drains them and hands them to the receiving component. Delivery
//! is fire-and-forget, as in the browser.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use orbit_core::{MessageSender, PortError, RuntimePort, TabsPort, WindowMessage, WindowPort};
use serde_json::Value;

#[derive(Debug, Default)]
struct Queues {
    windows: BTreeMap<u64, VecDeque<WindowMessage>>,
    background: VecDeque<(Value, MessageSender)>,
    tabs: BTreeMap<u64, VecDeque<Value>>,
}

#[derive(Debug, Clone, Default)]
pub struct MessageBus {
    queues: Arc<Mutex<Queues>>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn queues(&self) -> Result<MutexGuard<'_, Queues>, PortError> {
        self.queues
            .lock()
            .map_err(|e| PortError::Transport(format!("message bus lock poisoned: {e}")))
    }

    /// The shared window channel of the page loaded in `tab_id`. Page script
    /// and relay post through the same handle.
    pub fn page_window(&self, tab_id: u64, page_origin: impl Into<String>) -> PageWindow {
        PageWindow {
            bus: self.clone(),
            tab_id,
            page_origin: page_origin.into(),
        }
    }

    /// Runtime channel of the relay injected into `tab_id`.
    pub fn content_runtime(&self, tab_id: u64, page_url: impl Into<String>) -> RuntimeSender {
        RuntimeSender {
            bus: self.clone(),
            sender: MessageSender {
                url: Some(page_url.into()),
                tab_id: Some(tab_id),
            },
        }
    }

    /// Runtime channel of an extension page such as the side panel.
    pub fn extension_runtime(&self, page_url: impl Into<String>) -> RuntimeSender {
        RuntimeSender {
            bus: self.clone(),
            sender: MessageSender {
                url: Some(page_url.into()),
                tab_id: None,
            },
        }
    }

    pub fn tabs(&self) -> TabRouter {
        TabRouter { bus: self.clone() }
    }

    pub fn take_window_messages(&self, tab_id: u64) -> Result<Vec<WindowMessage>, PortError> {
        Ok(self
            .queues()?
            .windows
            .remove(&tab_id)
            .map(Vec::from)
            .unwrap_or_default())
    }

    pub fn take_background_messages(&self) -> Result<Vec<(Value, MessageSender)>, PortError> {
        Ok(self.queues()?.background.drain(..).collect())
    }

    pub fn take_tab_messages(&self, tab_id: u64) -> Result<Vec<Value>, PortError> {
        Ok(self
            .queues()?
            .tabs
            .remove(&tab_id)
            .map(Vec::from)
            .unwrap_or_default())
    }

    pub fn is_idle(&self) -> bool {
        self.queues()
            .map(|q| {
                q.background.is_empty()
                    && q.windows.values().all(VecDeque::is_empty)
                    && q.tabs.values().all(VecDeque::is_empty)
            })
            .unwrap_or(true)
    }
}

#[derive(Debug, Clone)]
pub struct PageWindow {
    bus: MessageBus,
    tab_id: u64,
    page_origin: String,
}

impl WindowPort for PageWindow {
    fn post_message(&self, data: Value) -> Result<(), PortError> {
        let message = WindowMessage::trusted(self.page_origin.clone(), data);
        self.bus
            .queues()?
            .windows
            .entry(self.tab_id)
            .or_default()
            .push_back(message);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct RuntimeSender {
    bus: MessageBus,
    sender: MessageSender,
}

impl RuntimePort for RuntimeSender {
    fn send_message(&self, data: Value) -> Result<(), PortError> {
        self.bus
            .queues()?
            .background
            .push_back((data, self.sender.clone()));
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct TabRouter {
    bus: MessageBus,
}

impl TabsPort for TabRouter {
    fn send_message(&self, tab_id: u64, data: Value) -> Result<(), PortError> {
        self.bus
            .queues()?
            .tabs
            .entry(tab_id)
            .or_default()
            .push_back(data);
        Ok(())
    }
}
