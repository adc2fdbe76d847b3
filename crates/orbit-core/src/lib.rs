pub mod accounts;
pub mod connect_screen;
pub mod connections;
pub mod coordinator;
pub mod domain;
pub mod events;
pub mod filter;
pub mod import_export;
pub mod lock;
pub mod ports;
pub mod query;
pub mod relay;
pub mod resolver;
pub mod state_machine;
pub mod wallet;

pub use accounts::{AccountError, AccountStore};
pub use connect_screen::{ConnectRequest, ConnectScreen, ConnectScreenError};
pub use connections::ConnectionStore;
pub use coordinator::{BackgroundCoordinator, CoordinatorOutcome};
pub use domain::{
    Address, ConnectedAccount, FilterState, LockSettings, LockState, SavedAccount, TimestampMs,
};
pub use events::{
    BackgroundEvent, ContentEvent, EventOrigin, InjectedEvent, MessageSender, RequestId,
    SidePanelEvent, TaggedEvent, WindowMessage,
};
pub use filter::FilterStateStore;
pub use lock::{LockError, LockGuard, LockStore, RouteAccess};
pub use ports::{
    AddressValidator, AuthenticatorPort, ClockPort, KeyValuePort, PortError, RuntimePort,
    SidePanelPort, TabsPort, WindowPort,
};
pub use query::{side_panel_route, ConnectRequestParams, QueryError};
pub use relay::{ContentRelay, RelayError, RelayOutcome};
pub use resolver::{PendingRequest, Resolver, ResolverError};
pub use state_machine::{LockAction, LockStatus, StateTransition};
pub use wallet::{ConnectOptions, OrbitWallet, Subscription, WalletAccount, WalletError};
