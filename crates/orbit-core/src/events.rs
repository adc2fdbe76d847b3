//! Messages exchanged between the page script, the content relay, the
//! background coordinator and the side panel.
//!
//! Every message is a JSON object carrying an `origin` tag naming the context
//! that produced it and a `type` discriminant. A receiver only decodes the
//! family whose origin it expects; anything else decodes to `None`.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{Address, ConnectedAccount};
use crate::ports::PortError;

/// Correlation id, scoped to the resolver that allocated it.
pub type RequestId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventOrigin {
    Injected,
    Content,
    Background,
    SidePanel,
}

impl EventOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            EventOrigin::Injected => "injected",
            EventOrigin::Content => "content",
            EventOrigin::Background => "background",
            EventOrigin::SidePanel => "sidePanel",
        }
    }
}

pub trait TaggedEvent: Serialize + DeserializeOwned {
    const ORIGIN: EventOrigin;

    fn request_id(&self) -> RequestId;

    fn kind(&self) -> &'static str;
}

/// Page script -> content relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum InjectedEvent {
    RequestConnection {
        request_id: RequestId,
    },
    SilentConnection {
        request_id: RequestId,
    },
    Disconnect {
        request_id: RequestId,
    },
    GetTagsForAddresses {
        request_id: RequestId,
        addresses: Vec<Address>,
    },
}

impl TaggedEvent for InjectedEvent {
    const ORIGIN: EventOrigin = EventOrigin::Injected;

    fn request_id(&self) -> RequestId {
        match self {
            InjectedEvent::RequestConnection { request_id }
            | InjectedEvent::SilentConnection { request_id }
            | InjectedEvent::Disconnect { request_id }
            | InjectedEvent::GetTagsForAddresses { request_id, .. } => *request_id,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            InjectedEvent::RequestConnection { .. } => "requestConnection",
            InjectedEvent::SilentConnection { .. } => "silentConnection",
            InjectedEvent::Disconnect { .. } => "disconnect",
            InjectedEvent::GetTagsForAddresses { .. } => "getTagsForAddresses",
        }
    }
}

/// Content relay -> page script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ContentEvent {
    ConnectAccounts {
        request_id: RequestId,
        accounts: Vec<ConnectedAccount>,
    },
    DisconnectComplete {
        request_id: RequestId,
    },
    TagsForAddresses {
        request_id: RequestId,
        tags: BTreeMap<Address, Vec<String>>,
    },
}

impl TaggedEvent for ContentEvent {
    const ORIGIN: EventOrigin = EventOrigin::Content;

    fn request_id(&self) -> RequestId {
        match self {
            ContentEvent::ConnectAccounts { request_id, .. }
            | ContentEvent::DisconnectComplete { request_id }
            | ContentEvent::TagsForAddresses { request_id, .. } => *request_id,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ContentEvent::ConnectAccounts { .. } => "connectAccounts",
            ContentEvent::DisconnectComplete { .. } => "disconnectComplete",
            ContentEvent::TagsForAddresses { .. } => "tagsForAddresses",
        }
    }
}

/// Background coordinator -> content relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum BackgroundEvent {
    ConnectionSubmitForwarded {
        request_id: RequestId,
        for_origin: String,
        addresses: Vec<Address>,
    },
}

impl TaggedEvent for BackgroundEvent {
    const ORIGIN: EventOrigin = EventOrigin::Background;

    fn request_id(&self) -> RequestId {
        match self {
            BackgroundEvent::ConnectionSubmitForwarded { request_id, .. } => *request_id,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            BackgroundEvent::ConnectionSubmitForwarded { .. } => "connectionSubmitForwarded",
        }
    }
}

/// Side panel -> background coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum SidePanelEvent {
    ConnectionSubmit {
        tab_id: u64,
        request_id: RequestId,
        for_origin: String,
        addresses: Vec<Address>,
    },
}

impl TaggedEvent for SidePanelEvent {
    const ORIGIN: EventOrigin = EventOrigin::SidePanel;

    fn request_id(&self) -> RequestId {
        match self {
            SidePanelEvent::ConnectionSubmit { request_id, .. } => *request_id,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            SidePanelEvent::ConnectionSubmit { .. } => "connectionSubmit",
        }
    }
}

/// Serializes an event and stamps its `origin` tag.
pub fn encode<E: TaggedEvent>(event: &E) -> Result<Value, PortError> {
    let mut value = serde_json::to_value(event)
        .map_err(|e| PortError::Validation(format!("event serialization failed: {e}")))?;
    let map = value
        .as_object_mut()
        .ok_or_else(|| PortError::Validation("event must serialize to an object".to_owned()))?;
    map.insert(
        "origin".to_owned(),
        Value::String(E::ORIGIN.as_str().to_owned()),
    );
    Ok(value)
}

/// Decodes `data` as an `E` if and only if it carries `E`'s origin tag and a
/// recognised `type`. Never fails loudly.
pub fn decode<E: TaggedEvent>(data: &Value) -> Option<E> {
    let origin = data.get("origin").and_then(Value::as_str)?;
    if origin != E::ORIGIN.as_str() {
        return None;
    }
    match serde_json::from_value(data.clone()) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::debug!(origin, error = %e, "dropping unrecognised event");
            None
        }
    }
}

/// A message observed on the page's window channel.
#[derive(Debug, Clone)]
pub struct WindowMessage {
    pub data: Value,
    /// False when the message was synthesized by a page script instead of
    /// the browser.
    pub is_trusted: bool,
    /// Serialized origin of the posting page, e.g. `https://app.example`.
    pub origin: String,
}

impl WindowMessage {
    pub fn trusted(origin: impl Into<String>, data: Value) -> Self {
        Self {
            data,
            is_trusted: true,
            origin: origin.into(),
        }
    }
}

/// Sender metadata attached to a runtime message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageSender {
    pub url: Option<String>,
    pub tab_id: Option<u64>,
}

/// Hostname of a page origin or URL; `None` if it does not parse or has no host.
pub fn origin_hostname(origin: &str) -> Option<String> {
    let parsed = url::Url::parse(origin).ok()?;
    parsed.host_str().map(str::to_owned)
}
