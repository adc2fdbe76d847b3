//! Request/response correlation for fire-and-forget message channels.
//!
//! `begin_request` hands out the next id from a per-instance counter and parks
//! a oneshot sender under it; `resolve` settles the sender whose id matches the
//! incoming response. Responses may arrive in any order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::oneshot;

use crate::events::{RequestId, TaggedEvent};
use crate::ports::PortError;

#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("no response received for request {0}")]
    NoResponse(RequestId),
    #[error("request {0} was abandoned before a response arrived")]
    Abandoned(RequestId),
    #[error(transparent)]
    Port(#[from] PortError),
}

#[derive(Debug)]
pub struct Resolver<T> {
    state: Mutex<ResolverState<T>>,
    timeout: Option<Duration>,
}

#[derive(Debug)]
struct ResolverState<T> {
    next_request_id: RequestId,
    pending: HashMap<RequestId, oneshot::Sender<T>>,
}

impl<T> Default for ResolverState<T> {
    fn default() -> Self {
        Self {
            next_request_id: 0,
            pending: HashMap::new(),
        }
    }
}

impl<T> Default for Resolver<T> {
    fn default() -> Self {
        Self {
            state: Mutex::new(ResolverState::default()),
            timeout: None,
        }
    }
}

impl<T: TaggedEvent> Resolver<T> {
    /// Resolver whose requests wait forever for their response.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Resolver whose requests fail with [`ResolverError::NoResponse`] once
    /// `timeout` elapses without a matching response.
    pub fn with_timeout(timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(ResolverState::default()),
            timeout: Some(timeout),
        })
    }

    pub fn begin_request(self: &Arc<Self>) -> Result<PendingRequest<T>, PortError> {
        let (tx, rx) = oneshot::channel();
        let mut g = self
            .state
            .lock()
            .map_err(|e| PortError::Transport(format!("resolver lock poisoned: {e}")))?;
        let request_id = g.next_request_id;
        g.next_request_id = g.next_request_id.saturating_add(1);
        g.pending.insert(request_id, tx);
        Ok(PendingRequest {
            request_id,
            receiver: rx,
            resolver: Arc::clone(self),
        })
    }

    /// Settles the pending request matching `event`. Returns `false` (and
    /// logs) when no request with that id is outstanding.
    pub fn resolve(&self, event: T) -> bool {
        let request_id = event.request_id();
        let sender = match self.state.lock() {
            Ok(mut g) => g.pending.remove(&request_id),
            Err(e) => {
                tracing::error!(request_id, error = %e, "resolver lock poisoned");
                return false;
            }
        };
        let Some(sender) = sender else {
            tracing::warn!(
                request_id,
                kind = event.kind(),
                "response for unknown or already resolved request"
            );
            return false;
        };
        if sender.send(event).is_err() {
            tracing::debug!(request_id, "requester went away before the response arrived");
        }
        true
    }

    /// Drops the pending entry for `request_id`, if any.
    pub fn cancel(&self, request_id: RequestId) {
        if let Ok(mut g) = self.state.lock() {
            g.pending.remove(&request_id);
        }
    }

    pub fn pending_count(&self) -> usize {
        self.state.lock().map(|g| g.pending.len()).unwrap_or(0)
    }
}

#[derive(Debug)]
pub struct PendingRequest<T: TaggedEvent> {
    request_id: RequestId,
    receiver: oneshot::Receiver<T>,
    resolver: Arc<Resolver<T>>,
}

impl<T: TaggedEvent> PendingRequest<T> {
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    pub async fn wait(self) -> Result<T, ResolverError> {
        let request_id = self.request_id;
        let outcome = match self.resolver.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, self.receiver).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    self.resolver.cancel(request_id);
                    tracing::warn!(request_id, "request timed out without a response");
                    return Err(ResolverError::NoResponse(request_id));
                }
            },
            None => self.receiver.await,
        };
        outcome.map_err(|_| ResolverError::Abandoned(request_id))
    }
}
