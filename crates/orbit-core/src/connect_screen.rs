//! Side-panel connect screen: parses the coordinator's addressing parameters,
//! preselects the site's previous approval and submits the user's decision.

use thiserror::Error;

use crate::accounts::{AccountError, AccountStore};
use crate::connections::ConnectionStore;
use crate::coordinator::DEFAULT_SIDE_PANEL_PATH;
use crate::domain::{Address, SavedAccount};
use crate::events::{encode, SidePanelEvent};
use crate::ports::{AddressValidator, KeyValuePort, PortError, RuntimePort, SidePanelPort};
use crate::query::{ConnectRequestParams, QueryError};

#[derive(Debug, Error)]
pub enum ConnectScreenError {
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    Accounts(#[from] AccountError),
    #[error(transparent)]
    Port(#[from] PortError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    pub params: ConnectRequestParams,
    pub accounts: Vec<SavedAccount>,
    /// Addresses the site was previously allowed to see.
    pub preselected: Vec<Address>,
}

#[derive(Debug, Clone)]
pub struct ConnectScreen<S, V, R, P> {
    accounts: AccountStore<S, V>,
    connections: ConnectionStore<S>,
    runtime: R,
    side_panel: P,
    home_path: String,
}

impl<S, V, R, P> ConnectScreen<S, V, R, P>
where
    S: KeyValuePort + Clone,
    V: AddressValidator,
    R: RuntimePort,
    P: SidePanelPort,
{
    pub fn new(storage: S, validator: V, runtime: R, side_panel: P) -> Self {
        Self {
            accounts: AccountStore::new(storage.clone(), validator),
            connections: ConnectionStore::new(storage),
            runtime,
            side_panel,
            home_path: DEFAULT_SIDE_PANEL_PATH.to_owned(),
        }
    }

    pub fn with_home_path(mut self, path: impl Into<String>) -> Self {
        self.home_path = path.into();
        self
    }

    /// Malformed parameters are a hard error.
    pub fn load(&self, path: &str) -> Result<ConnectRequest, ConnectScreenError> {
        let params = ConnectRequestParams::from_path(path)?;
        let preselected = self
            .connections
            .get(&params.for_origin)?
            .unwrap_or_default();
        Ok(ConnectRequest {
            accounts: self.accounts.list()?,
            preselected,
            params,
        })
    }

    /// Sends the decision to the coordinator, then points the side panel back
    /// at the home page. An empty selection means the user cancelled.
    pub fn submit(
        &self,
        params: &ConnectRequestParams,
        addresses: Vec<Address>,
    ) -> Result<(), ConnectScreenError> {
        let event = SidePanelEvent::ConnectionSubmit {
            tab_id: params.tab_id,
            request_id: params.request_id,
            for_origin: params.for_origin.clone(),
            addresses,
        };
        self.runtime.send_message(encode(&event)?)?;
        self.side_panel.set_options(&self.home_path, true)?;
        Ok(())
    }

    pub fn cancel(&self, params: &ConnectRequestParams) -> Result<(), ConnectScreenError> {
        self.submit(params, Vec::new())
    }
}
