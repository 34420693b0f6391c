//! # Routing
//!
//! Session ownership and affinity route location.
//!
//! Every session-management instance compiles its affinity policy into a
//! [`RouteLocator`]. Locators are pure: they read an immutable [`Topology`]
//! snapshot from the cluster event hub and compute the route token a session
//! should advertise, with no locks on the request path.

pub mod affinity;
mod error;
pub mod ownership;

pub use crate::affinity::{RouteLocator, parse_ranked};
pub use crate::error::{RoutingError, RoutingErrorExt};
pub use crate::ownership::{Ownership, ownership};

use fxhash::FxHashMap;
use sgrid_domain::config::GridConfig;
use sgrid_domain::node::{NodeId, NodeInfo, Topology};
use sgrid_events::ClusterEvents;
use sgrid_kernel::domain::registry::InitializedSlice;

/// Routing slice state: one compiled locator per session-management instance.
#[sgrid_derive::sgrid_slice]
pub struct Routing {
    pub locators: FxHashMap<String, RouteLocator>,
    pub events: ClusterEvents,
}

impl RoutingInner {
    /// Route token for `session` in the named session-management instance,
    /// computed against the current topology snapshot.
    ///
    /// # Errors
    /// Returns [`RoutingError::UnknownManager`] when no such instance exists.
    pub fn locate(&self, manager: &str, session: &str) -> Result<Option<String>, RoutingError> {
        let locator = self.locators.get(manager).ok_or_else(|| RoutingError::UnknownManager {
            message: manager.to_owned().into(),
            context: None,
        })?;

        Ok(locator.locate(session, &self.events.current_topology()))
    }

    /// Current ownership of a session key, for diagnostics.
    #[must_use]
    pub fn ownership_of(&self, session: &str, replicas: usize) -> Ownership {
        ownership(&self.events.current_topology(), session, replicas)
    }
}

/// Builds the seed topology from configuration: the declared members plus the
/// local node.
#[must_use]
pub fn seed_topology(config: &GridConfig) -> Topology {
    let local = NodeId::new(config.node.id.clone());
    let mut members: Vec<NodeInfo> = config
        .routing
        .members
        .iter()
        .map(|m| NodeInfo::new(m.id.clone(), m.route.as_deref()))
        .collect();
    members.push(NodeInfo::new(config.node.id.clone(), config.node.route.as_deref()));

    Topology::new(local, members)
}

/// Initialize the routing slice.
///
/// Publishes the seed topology to the event hub and compiles one locator per
/// declared session-management instance.
///
/// # Errors
/// Returns [`RoutingError::InvalidAffinity`] for an uncompilable policy.
pub fn init(config: &GridConfig, events: &ClusterEvents) -> Result<InitializedSlice, RoutingError> {
    events.publish_topology(seed_topology(config));

    let replicas = config.routing.replicas;
    let mut locators = FxHashMap::default();
    for (name, manager) in &config.session_managers {
        let locator = RouteLocator::from_config(&manager.affinity, replicas)?;
        locators.insert(name.clone(), locator);
    }

    tracing::info!(
        locators = locators.len(),
        replicas,
        "Routing slice initialized"
    );

    let slice = Routing::new(RoutingInner { locators, events: events.clone() });
    Ok(InitializedSlice::new(slice))
}
