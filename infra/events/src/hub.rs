use crate::error::EventHubError;
use crate::{SessionEvent, SsoEvent, TopologySnapshot};
use sgrid_domain::node::Topology;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::trace;

/// A safe default for broadcast buffers.
/// 128 is usually enough for lifecycle notifications between sweeps.
pub const DEFAULT_CAPACITY: usize = 128;
const MIN_CAPACITY: usize = 1;

/// The cluster event hub.
///
/// Cheap to clone; all clones share the same underlying channels.
#[derive(Debug, Clone)]
pub struct ClusterEvents {
    topology: watch::Sender<TopologySnapshot>,
    sessions: broadcast::Sender<SessionEvent>,
    sso: broadcast::Sender<SsoEvent>,
}

impl ClusterEvents {
    /// Creates a hub seeded with an initial topology and default buffer capacity.
    #[must_use]
    pub fn new(initial: Topology) -> Self {
        let (topology, _) = watch::channel(Arc::new(initial));
        let (sessions, _) = broadcast::channel(DEFAULT_CAPACITY);
        let (sso, _) = broadcast::channel(DEFAULT_CAPACITY);
        Self { topology, sessions, sso }
    }

    /// Creates a hub with an explicit broadcast buffer capacity.
    ///
    /// # Errors
    /// Returns [`EventHubError::InvalidCapacity`] if `capacity` is zero.
    pub fn with_capacity(initial: Topology, capacity: usize) -> Result<Self, EventHubError> {
        if capacity < MIN_CAPACITY {
            return Err(EventHubError::InvalidCapacity {
                message: format!("capacity must be >= {MIN_CAPACITY}").into(),
                context: None,
            });
        }

        let (topology, _) = watch::channel(Arc::new(initial));
        let (sessions, _) = broadcast::channel(capacity);
        let (sso, _) = broadcast::channel(capacity);
        Ok(Self { topology, sessions, sso })
    }

    /// Publishes a new topology snapshot, replacing the previous one.
    pub fn publish_topology(&self, topology: Topology) {
        trace!(members = topology.len(), "Topology snapshot published");
        self.topology.send_replace(Arc::new(topology));
    }

    /// Subscribes to topology snapshots. The receiver immediately sees the
    /// latest snapshot.
    #[must_use]
    pub fn watch_topology(&self) -> watch::Receiver<TopologySnapshot> {
        self.topology.subscribe()
    }

    /// Returns the current topology snapshot without subscribing.
    #[must_use]
    pub fn current_topology(&self) -> TopologySnapshot {
        self.topology.borrow().clone()
    }

    /// Publishes a session lifecycle event.
    ///
    /// Returns the number of receivers the event was delivered to; zero when
    /// nobody is subscribed.
    pub fn publish_session(&self, event: SessionEvent) -> usize {
        match self.sessions.send(event) {
            Ok(count) => {
                trace!(count, "Session event dispatched");
                count
            },
            Err(broadcast::error::SendError(event)) => {
                trace!(manager = %event.manager, "Session event dropped: no active subscribers");
                0
            },
        }
    }

    /// Subscribes to session lifecycle events.
    #[must_use]
    pub fn subscribe_sessions(&self) -> broadcast::Receiver<SessionEvent> {
        self.sessions.subscribe()
    }

    /// Publishes a single-sign-on event.
    ///
    /// Returns the number of receivers the event was delivered to; zero when
    /// nobody is subscribed.
    pub fn publish_sso(&self, event: SsoEvent) -> usize {
        match self.sso.send(event) {
            Ok(count) => {
                trace!(count, "SSO event dispatched");
                count
            },
            Err(broadcast::error::SendError(event)) => {
                trace!(sso = %event.sso, "SSO event dropped: no active subscribers");
                0
            },
        }
    }

    /// Subscribes to single-sign-on events.
    #[must_use]
    pub fn subscribe_sso(&self) -> broadcast::Receiver<SsoEvent> {
        self.sso.subscribe()
    }
}

impl Default for ClusterEvents {
    fn default() -> Self {
        Self::new(Topology::new(sgrid_domain::node::NodeId::from("local"), Vec::new()))
    }
}
