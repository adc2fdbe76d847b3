use crate::domain::{Address, Connections};
use crate::ports::{KeyValuePort, PortError};

pub const CONNECTIONS_KEY: &str = "local:connections";

/// Per-hostname record of addresses a site was allowed to see. An absent
/// entry means "never connected"; an empty list is never stored.
#[derive(Debug, Clone)]
pub struct ConnectionStore<S> {
    storage: S,
}

impl<S: KeyValuePort> ConnectionStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn all(&self) -> Result<Connections, PortError> {
        match self.storage.get_item(CONNECTIONS_KEY)? {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| PortError::Storage(format!("stored connections are corrupt: {e}"))),
            None => Ok(Connections::new()),
        }
    }

    fn write(&self, connections: &Connections) -> Result<(), PortError> {
        let raw = serde_json::to_string(connections)
            .map_err(|e| PortError::Validation(format!("connections serialization failed: {e}")))?;
        self.storage.set_item(CONNECTIONS_KEY, &raw)
    }

    pub fn get(&self, origin: &str) -> Result<Option<Vec<Address>>, PortError> {
        Ok(self.all()?.remove(origin))
    }

    /// Replaces the origin's addresses. An empty list is a no-op.
    pub fn save(&self, origin: &str, addresses: &[Address]) -> Result<(), PortError> {
        if addresses.is_empty() {
            return Ok(());
        }
        let mut connections = self.all()?;
        connections.insert(origin.to_owned(), dedup(addresses));
        self.write(&connections)
    }

    pub fn remove(&self, origin: &str) -> Result<(), PortError> {
        let mut connections = self.all()?;
        if connections.remove(origin).is_some() {
            self.write(&connections)?;
        }
        Ok(())
    }
}

/// Drops repeated addresses, keeping first-seen order.
pub fn dedup(addresses: &[Address]) -> Vec<Address> {
    let mut out: Vec<Address> = Vec::with_capacity(addresses.len());
    for address in addresses {
        if !out.contains(address) {
            out.push(address.clone());
        }
    }
    out
}
