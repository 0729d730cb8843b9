//! Identity to transport resolution.
//!
//! ## Lookup order
//! 1. Backend identities, one per transport, fixed by configuration.
//! 2. The general peer table, filled as peers connect.
//!
//! A backend identity always resolves to its backend binding, even if the
//! same identity was also put in the peer table through some other path.
//! Peer bindings follow last-write-wins and stay until the transport that
//! created them calls [`ConnectionRegistry::unregister`].

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::debug;

use crate::transport::{Connection, Sink, TransportKind, TransportTable};

#[derive(Clone, Debug, Default)]
struct Backend {
    identity: Option<String>,
    connection: Option<Connection>,
}

/// Resolves peer identities to live send capabilities.
#[derive(Default)]
pub struct ConnectionRegistry {
    backends: RwLock<TransportTable<Backend>>,
    peers: DashMap<String, Connection>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Designate `identity` as the well-known backend for `kind`.
    ///
    /// Replaces any previous designation for that transport, dropping its
    /// binding.
    pub fn set_backend_identity(&self, kind: TransportKind, identity: impl Into<String>) {
        let identity = identity.into();
        debug!(transport = %kind, backend = %identity, "Backend identity set");
        *self.backends.write().get_mut(kind) = Backend {
            identity: Some(identity),
            connection: None,
        };
    }

    #[must_use]
    pub fn backend_identity(&self, kind: TransportKind) -> Option<String> {
        self.backends.read().get(kind).identity.clone()
    }

    /// Bind `identity` to `sink` on transport `kind`.
    ///
    /// Goes to the backend slot when `identity` is `kind`'s backend
    /// identity, otherwise to the peer table. Returns the binding that was
    /// replaced, if any.
    pub fn register(
        &self,
        kind: TransportKind,
        identity: impl Into<String>,
        sink: Arc<dyn Sink>,
    ) -> Option<Connection> {
        let identity = identity.into();
        let connection = Connection::new(kind, sink);

        {
            let mut backends = self.backends.write();
            let backend = backends.get_mut(kind);
            if backend.identity.as_deref() == Some(identity.as_str()) {
                debug!(transport = %kind, backend = %identity, "Backend connection registered");
                return backend.connection.replace(connection);
            }
        }

        let previous = self.peers.insert(identity.clone(), connection);
        if previous.is_some() {
            debug!(transport = %kind, peer = %identity, "Peer connection replaced");
        } else {
            debug!(transport = %kind, peer = %identity, "Peer connection registered");
        }
        previous
    }

    /// Remove a peer binding.
    ///
    /// Backend bindings belong to configuration and are left alone.
    pub fn unregister(&self, identity: &str) -> Option<Connection> {
        let removed = self.peers.remove(identity).map(|(_, connection)| connection);
        if let Some(ref connection) = removed {
            debug!(transport = %connection.kind, peer = %identity, "Peer connection removed");
        }
        removed
    }

    /// Find the connection for `identity`, backends first.
    #[must_use]
    pub fn resolve(&self, identity: &str) -> Option<Connection> {
        {
            let backends = self.backends.read();
            for (_, backend) in backends.iter() {
                if backend.identity.as_deref() == Some(identity) {
                    if let Some(connection) = &backend.connection {
                        return Some(connection.clone());
                    }
                }
            }
        }

        self.peers.get(identity).map(|entry| entry.value().clone())
    }

    /// Number of peer bindings, backends excluded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

impl std::fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("backends", &*self.backends.read())
            .field("peers", &self.len())
            .finish()
    }
}
