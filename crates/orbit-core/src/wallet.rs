//! Page-facing wallet registered with the multi-wallet discovery protocol.
//!
//! Lives in the page context. Every call that needs privileged data posts an
//! [`InjectedEvent`] on the window channel and awaits the relay's
//! [`ContentEvent`] through a [`Resolver`].

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use thiserror::Error;

use crate::domain::{Address, ConnectedAccount};
use crate::events::{
    decode, encode, ContentEvent, InjectedEvent, RequestId, TaggedEvent, WindowMessage,
};
use crate::ports::{PortError, WindowPort};
use crate::resolver::{PendingRequest, Resolver, ResolverError};

pub const WALLET_NAME: &str = "Orbit";
pub const WALLET_VERSION: &str = "1.0.0";

pub const SOLANA_MAINNET_CHAIN: &str = "solana:mainnet";
pub const SOLANA_DEVNET_CHAIN: &str = "solana:devnet";
pub const SOLANA_TESTNET_CHAIN: &str = "solana:testnet";
pub const SOLANA_LOCALNET_CHAIN: &str = "solana:localnet";
pub const SOLANA_CHAINS: &[&str] = &[
    SOLANA_MAINNET_CHAIN,
    SOLANA_DEVNET_CHAIN,
    SOLANA_TESTNET_CHAIN,
    SOLANA_LOCALNET_CHAIN,
];

pub const STANDARD_CONNECT: &str = "standard:connect";
pub const STANDARD_DISCONNECT: &str = "standard:disconnect";
pub const STANDARD_EVENTS: &str = "standard:events";
pub const SOLANA_SIGN_TRANSACTION: &str = "solana:signTransaction";
pub const ACCOUNTS_TAGS: &str = "accounts:tags";
pub const ADDITIONAL_FIELD_TAGS: &str = "additionalField:tags";

/// Wallet-level features. Transaction signing is advertised only because
/// most dApps hide wallets without it; calling it always fails.
pub const WALLET_FEATURES: &[&str] = &[
    STANDARD_CONNECT,
    STANDARD_DISCONNECT,
    STANDARD_EVENTS,
    SOLANA_SIGN_TRANSACTION,
    ACCOUNTS_TAGS,
];
pub const ACCOUNT_FEATURES: &[&str] = &[STANDARD_CONNECT, STANDARD_EVENTS, ADDITIONAL_FIELD_TAGS];

const ICON_SVG: &str = concat!(
    r##"<svg xmlns="http://www.w3.org/2000/svg" width="128" height="128" viewBox="0 0 96 96">"##,
    r##"<circle cx="48" cy="48" r="21" fill="none" stroke="#90cdf4" stroke-width="6"/>"##,
    r##"<circle cx="48" cy="9.6" r="4.5" fill="#90cdf4"/>"##,
    r##"<circle cx="84.1" cy="35.1" r="4.5" fill="#90cdf4"/>"##,
    r##"<circle cx="72" cy="77.9" r="4.5" fill="#90cdf4"/>"##,
    r##"<circle cx="24" cy="79.4" r="4.5" fill="#90cdf4"/>"##,
    r##"<circle cx="10.8" cy="39.6" r="4.5" fill="#90cdf4"/>"##,
    "</svg>"
);

pub fn icon_data_uri() -> String {
    format!("data:image/svg+xml;base64,{}", STANDARD.encode(ICON_SVG))
}

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("The user rejected the request.")]
    UserRejected,
    #[error("Wallet does not support signing transactions")]
    Unsupported,
    #[error("no response received for request {0}")]
    NoResponse(RequestId),
    #[error("unexpected {kind} response to request {request_id}")]
    UnexpectedResponse {
        request_id: RequestId,
        kind: &'static str,
    },
    #[error("invalid account address: {0}")]
    InvalidAddress(Address),
    #[error(transparent)]
    Port(#[from] PortError),
}

impl From<ResolverError> for WalletError {
    fn from(e: ResolverError) -> Self {
        match e {
            ResolverError::NoResponse(id) | ResolverError::Abandoned(id) => {
                WalletError::NoResponse(id)
            }
            ResolverError::Port(e) => WalletError::Port(e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletAccount {
    pub address: Address,
    pub public_key: Vec<u8>,
    pub label: String,
    pub chains: &'static [&'static str],
    pub features: &'static [&'static str],
    pub tags: Vec<String>,
}

impl TryFrom<&ConnectedAccount> for WalletAccount {
    type Error = WalletError;

    fn try_from(account: &ConnectedAccount) -> Result<Self, Self::Error> {
        let public_key = account
            .address
            .public_key_bytes()
            .map_err(|_| WalletError::InvalidAddress(account.address.clone()))?;
        Ok(Self {
            address: account.address.clone(),
            public_key,
            label: account.label.clone(),
            chains: SOLANA_CHAINS,
            features: ACCOUNT_FEATURES,
            tags: account.tags.clone(),
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectOptions {
    pub silent: bool,
}

#[derive(Debug, Clone)]
pub struct ConnectOutput {
    pub accounts: Arc<[WalletAccount]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WalletEventName {
    Change,
}

#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub accounts: Arc<[WalletAccount]>,
}

pub type Listener = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

#[derive(Clone, Default)]
struct ListenerRegistry {
    inner: Arc<Mutex<HashMap<WalletEventName, Vec<Listener>>>>,
}

impl ListenerRegistry {
    fn add(&self, event: WalletEventName, listener: Listener) {
        if let Ok(mut g) = self.inner.lock() {
            g.entry(event).or_default().push(listener);
        }
    }

    /// Removes every registration of `listener` (compared by pointer).
    fn remove(&self, event: WalletEventName, listener: &Listener) {
        if let Ok(mut g) = self.inner.lock() {
            if let Some(list) = g.get_mut(&event) {
                list.retain(|existing| !Arc::ptr_eq(existing, listener));
            }
        }
    }

    fn snapshot(&self, event: WalletEventName) -> Vec<Listener> {
        self.inner
            .lock()
            .ok()
            .and_then(|g| g.get(&event).cloned())
            .unwrap_or_default()
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self
            .inner
            .lock()
            .map(|g| g.values().map(Vec::len).sum::<usize>())
            .unwrap_or(0);
        f.debug_struct("ListenerRegistry")
            .field("listeners", &count)
            .finish()
    }
}

/// Handle returned by [`OrbitWallet::on`].
#[must_use = "dropping a Subscription keeps the listener registered"]
pub struct Subscription {
    registry: ListenerRegistry,
    event: WalletEventName,
    listener: Listener,
}

impl Subscription {
    pub fn unsubscribe(self) {
        self.registry.remove(self.event, &self.listener);
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("event", &self.event)
            .finish_non_exhaustive()
    }
}

pub struct OrbitWallet<W> {
    window: W,
    resolver: Arc<Resolver<ContentEvent>>,
    accounts: Mutex<Arc<[WalletAccount]>>,
    listeners: ListenerRegistry,
}

impl<W> fmt::Debug for OrbitWallet<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrbitWallet")
            .field("accounts", &self.accounts)
            .field("listeners", &self.listeners)
            .finish_non_exhaustive()
    }
}

impl<W> OrbitWallet<W>
where
    W: WindowPort + Send + Sync + 'static,
{
    pub fn new(window: W, resolver: Arc<Resolver<ContentEvent>>) -> Arc<Self> {
        Arc::new(Self {
            window,
            resolver,
            accounts: Mutex::new(Arc::from(Vec::new())),
            listeners: ListenerRegistry::default(),
        })
    }

    /// Builds the wallet and immediately issues a silent connect so that
    /// previously approved accounts appear without prompting. The request is
    /// posted before this returns; the response is awaited on a spawned task,
    /// so this must run inside a Tokio runtime.
    pub fn inject(window: W, resolver: Arc<Resolver<ContentEvent>>) -> Arc<Self> {
        let wallet = Self::new(window, resolver);
        let initial = wallet.connect(ConnectOptions { silent: true });
        tokio::spawn(async move {
            if let Err(e) = initial.await {
                tracing::warn!(error = %e, "initial silent connect failed");
            }
        });
        tracing::info!(name = WALLET_NAME, "wallet injected");
        wallet
    }

    pub fn name(&self) -> &'static str {
        WALLET_NAME
    }

    pub fn version(&self) -> &'static str {
        WALLET_VERSION
    }

    pub fn icon(&self) -> String {
        icon_data_uri()
    }

    pub fn chains(&self) -> &'static [&'static str] {
        SOLANA_CHAINS
    }

    pub fn features(&self) -> &'static [&'static str] {
        WALLET_FEATURES
    }

    pub fn accounts(&self) -> Arc<[WalletAccount]> {
        match self.accounts.lock() {
            Ok(g) => Arc::clone(&g),
            Err(e) => Arc::clone(&e.into_inner()),
        }
    }

    /// Posts the connect request now and returns a future resolving to the
    /// accounts the relay answered with. An interactive connect that yields
    /// no accounts fails with [`WalletError::UserRejected`].
    pub fn connect(
        self: &Arc<Self>,
        options: ConnectOptions,
    ) -> impl Future<Output = Result<ConnectOutput, WalletError>> + Send + 'static {
        let dispatched = self.dispatch(|request_id| {
            if options.silent {
                InjectedEvent::SilentConnection { request_id }
            } else {
                InjectedEvent::RequestConnection { request_id }
            }
        });
        let wallet = Arc::clone(self);
        async move {
            let response = dispatched?.wait().await?;
            wallet.finish_connect(response, options.silent)
        }
    }

    /// Clears the cached accounts and notifies listeners before returning,
    /// then tells the relay. The returned future completes once the relay
    /// confirms.
    pub fn disconnect(
        self: &Arc<Self>,
    ) -> impl Future<Output = Result<(), WalletError>> + Send + 'static {
        let empty: Arc<[WalletAccount]> = Arc::from(Vec::new());
        self.store_accounts(Arc::clone(&empty));
        self.emit_change(empty);

        let dispatched = self.dispatch(|request_id| InjectedEvent::Disconnect { request_id });
        async move {
            match dispatched?.wait().await? {
                ContentEvent::DisconnectComplete { .. } => Ok(()),
                other => Err(unexpected(&other)),
            }
        }
    }

    /// `accounts:tags` feature: tags per saved address. Addresses without a
    /// saved account are absent from the result.
    pub fn get_tags_for_addresses(
        self: &Arc<Self>,
        addresses: Vec<Address>,
    ) -> impl Future<Output = Result<BTreeMap<Address, Vec<String>>, WalletError>> + Send + 'static
    {
        let dispatched = self.dispatch(move |request_id| InjectedEvent::GetTagsForAddresses {
            request_id,
            addresses,
        });
        async move {
            match dispatched?.wait().await? {
                ContentEvent::TagsForAddresses { tags, .. } => Ok(tags),
                other => Err(unexpected(&other)),
            }
        }
    }

    pub async fn sign_transaction(&self, _transaction: &[u8]) -> Result<Vec<u8>, WalletError> {
        Err(WalletError::Unsupported)
    }

    pub fn on<F>(&self, event: WalletEventName, listener: F) -> Subscription
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.on_listener(event, Arc::new(listener))
    }

    /// Registers an existing listener handle; registering the same handle
    /// twice calls it twice until unsubscribed.
    pub fn on_listener(&self, event: WalletEventName, listener: Listener) -> Subscription {
        self.listeners.add(event, Arc::clone(&listener));
        Subscription {
            registry: self.listeners.clone(),
            event,
            listener,
        }
    }

    /// Feeds a window message to the resolver. Untrusted messages and
    /// anything not tagged `content` are ignored.
    pub fn handle_window_message(&self, message: &WindowMessage) -> bool {
        if !message.is_trusted {
            tracing::debug!("dropping untrusted window message");
            return false;
        }
        match decode::<ContentEvent>(&message.data) {
            Some(event) => self.resolver.resolve(event),
            None => false,
        }
    }

    fn dispatch(
        &self,
        make: impl FnOnce(RequestId) -> InjectedEvent,
    ) -> Result<PendingRequest<ContentEvent>, WalletError> {
        let pending = self.resolver.begin_request()?;
        let request_id = pending.request_id();
        let event = make(request_id);
        if let Err(e) = encode(&event).and_then(|data| self.window.post_message(data)) {
            self.resolver.cancel(request_id);
            return Err(e.into());
        }
        tracing::debug!(request_id, kind = event.kind(), "posted wallet request");
        Ok(pending)
    }

    fn finish_connect(
        &self,
        response: ContentEvent,
        silent: bool,
    ) -> Result<ConnectOutput, WalletError> {
        let accounts = match response {
            ContentEvent::ConnectAccounts { accounts, .. } => accounts,
            other => return Err(unexpected(&other)),
        };
        let accounts = accounts
            .iter()
            .map(WalletAccount::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        if accounts.is_empty() && !silent {
            return Err(WalletError::UserRejected);
        }

        let next: Arc<[WalletAccount]> = Arc::from(accounts);
        // Identity comparison: a freshly built list always counts as a change.
        if self.store_accounts(Arc::clone(&next)) {
            self.emit_change(Arc::clone(&next));
        }
        Ok(ConnectOutput { accounts: next })
    }

    /// Swaps the cached list, returning whether it is a different list.
    fn store_accounts(&self, next: Arc<[WalletAccount]>) -> bool {
        let mut g = match self.accounts.lock() {
            Ok(g) => g,
            Err(e) => e.into_inner(),
        };
        let changed = !Arc::ptr_eq(&g, &next);
        *g = next;
        changed
    }

    fn emit_change(&self, accounts: Arc<[WalletAccount]>) {
        let event = ChangeEvent { accounts };
        for listener in self.listeners.snapshot(WalletEventName::Change) {
            listener(&event);
        }
    }
}

fn unexpected(event: &ContentEvent) -> WalletError {
    WalletError::UnexpectedResponse {
        request_id: event.request_id(),
        kind: event.kind(),
    }
}
