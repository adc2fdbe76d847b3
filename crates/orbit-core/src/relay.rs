//! Content relay between the page's window channel and the privileged
//! runtime channel.
//!
//! Silent connects, disconnects and tag lookups are answered locally from
//! storage and never reach the coordinator. Only interactive connection
//! requests are forwarded.

use thiserror::Error;

use crate::accounts::{AccountError, AccountStore};
use crate::connections::{dedup, ConnectionStore};
use crate::domain::Address;
use crate::events::{
    decode, encode, origin_hostname, BackgroundEvent, ContentEvent, InjectedEvent, RequestId,
    TaggedEvent, WindowMessage,
};
use crate::ports::{AddressValidator, KeyValuePort, PortError, RuntimePort, WindowPort};

#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Accounts(#[from] AccountError),
    #[error(transparent)]
    Port(#[from] PortError),
}

/// What the relay did with an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    Dropped,
    Answered(&'static str),
    Forwarded,
}

#[derive(Debug, Clone)]
pub struct ContentRelay<S, V, W, R> {
    accounts: AccountStore<S, V>,
    connections: ConnectionStore<S>,
    window: W,
    runtime: R,
}

impl<S, V, W, R> ContentRelay<S, V, W, R>
where
    S: KeyValuePort + Clone,
    V: AddressValidator,
    W: WindowPort,
    R: RuntimePort,
{
    pub fn new(storage: S, validator: V, window: W, runtime: R) -> Self {
        Self {
            accounts: AccountStore::new(storage.clone(), validator),
            connections: ConnectionStore::new(storage),
            window,
            runtime,
        }
    }

    /// Handles a message seen on the page's window channel.
    pub fn handle_window_message(
        &self,
        message: &WindowMessage,
    ) -> Result<RelayOutcome, RelayError> {
        if !message.is_trusted {
            tracing::debug!(origin = %message.origin, "dropping untrusted window message");
            return Ok(RelayOutcome::Dropped);
        }
        let Some(event) = decode::<InjectedEvent>(&message.data) else {
            return Ok(RelayOutcome::Dropped);
        };

        match event {
            InjectedEvent::SilentConnection { request_id } => {
                let addresses = match origin_hostname(&message.origin) {
                    Some(host) => self.connections.get(&host)?.unwrap_or_default(),
                    None => {
                        tracing::debug!(origin = %message.origin, "page origin has no hostname");
                        Vec::new()
                    }
                };
                self.post_accounts(request_id, &addresses)?;
                Ok(RelayOutcome::Answered("connectAccounts"))
            }
            InjectedEvent::Disconnect { request_id } => {
                if let Some(host) = origin_hostname(&message.origin) {
                    self.connections.remove(&host)?;
                    tracing::info!(origin = %host, "site disconnected");
                }
                self.post(&ContentEvent::DisconnectComplete { request_id })?;
                Ok(RelayOutcome::Answered("disconnectComplete"))
            }
            InjectedEvent::GetTagsForAddresses {
                request_id,
                addresses,
            } => {
                let tags = self.accounts.tags_for_addresses(&addresses)?;
                self.post(&ContentEvent::TagsForAddresses { request_id, tags })?;
                Ok(RelayOutcome::Answered("tagsForAddresses"))
            }
            event @ InjectedEvent::RequestConnection { .. } => {
                tracing::debug!(
                    request_id = event.request_id(),
                    "forwarding connection request to background"
                );
                self.runtime.send_message(message.data.clone())?;
                Ok(RelayOutcome::Forwarded)
            }
        }
    }

    /// Handles a message delivered to this tab by the coordinator.
    pub fn handle_runtime_message(
        &self,
        data: &serde_json::Value,
    ) -> Result<RelayOutcome, RelayError> {
        let Some(event) = decode::<BackgroundEvent>(data) else {
            return Ok(RelayOutcome::Dropped);
        };
        match event {
            BackgroundEvent::ConnectionSubmitForwarded {
                request_id,
                for_origin,
                addresses,
            } => {
                let addresses = dedup(&addresses);
                self.connections.save(&for_origin, &addresses)?;
                tracing::info!(
                    origin = %for_origin,
                    approved = addresses.len(),
                    "connection decision received"
                );
                self.post_accounts(request_id, &addresses)?;
                Ok(RelayOutcome::Answered("connectAccounts"))
            }
        }
    }

    fn post_accounts(
        &self,
        request_id: RequestId,
        addresses: &[Address],
    ) -> Result<(), RelayError> {
        let accounts = self.accounts.connected_accounts(addresses)?;
        self.post(&ContentEvent::ConnectAccounts {
            request_id,
            accounts,
        })
    }

    fn post(&self, event: &ContentEvent) -> Result<(), RelayError> {
        self.window.post_message(encode(event)?)?;
        Ok(())
    }
}
