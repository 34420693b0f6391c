//! Cluster node identity and topology snapshots.
//!
//! A [`Topology`] is an immutable view of the cluster at one point in time.
//! Routing and session slices read snapshots; they never observe a topology
//! mid-update.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier of a cluster member.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Route token a member advertises to load balancers (the jvm-route analogue).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteId(String);

impl RouteId {
    #[must_use]
    pub fn new(route: impl Into<String>) -> Self {
        Self(route.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RouteId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A cluster member and the route it advertises.
///
/// A member without a route can own sessions but cannot be targeted by
/// client-side affinity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub id: NodeId,
    pub route: Option<RouteId>,
}

impl NodeInfo {
    #[must_use]
    pub fn new(id: impl Into<String>, route: Option<&str>) -> Self {
        Self { id: NodeId::new(id), route: route.map(RouteId::from) }
    }
}

/// Immutable snapshot of cluster membership.
///
/// Members are kept sorted by id so ownership computations are deterministic
/// regardless of the order updates arrived in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    local: NodeId,
    members: Vec<NodeInfo>,
}

impl Topology {
    /// Builds a snapshot, sorting members by id and ensuring the local node is present.
    #[must_use]
    pub fn new(local: NodeId, mut members: Vec<NodeInfo>) -> Self {
        if !members.iter().any(|m| m.id == local) {
            members.push(NodeInfo { id: local.clone(), route: None });
        }
        members.sort_by(|a, b| a.id.cmp(&b.id));
        members.dedup_by(|a, b| a.id == b.id);
        Self { local, members }
    }

    #[must_use]
    pub fn local(&self) -> &NodeId {
        &self.local
    }

    #[must_use]
    pub fn members(&self) -> &[NodeInfo] {
        &self.members
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn member(&self, id: &NodeId) -> Option<&NodeInfo> {
        self.members.iter().find(|m| &m.id == id)
    }

    /// Route advertised by `id`, if the member exists and has one.
    #[must_use]
    pub fn route_of(&self, id: &NodeId) -> Option<&RouteId> {
        self.member(id).and_then(|m| m.route.as_ref())
    }

    /// Route advertised by the local member.
    #[must_use]
    pub fn local_route(&self) -> Option<&RouteId> {
        self.route_of(&self.local)
    }

    /// Returns a snapshot with `member` inserted or replaced.
    #[must_use]
    pub fn with_member(&self, member: NodeInfo) -> Self {
        let mut members: Vec<NodeInfo> =
            self.members.iter().filter(|m| m.id != member.id).cloned().collect();
        members.push(member);
        Self::new(self.local.clone(), members)
    }

    /// Returns a snapshot with `id` removed. Removing the local member is a no-op.
    #[must_use]
    pub fn without_member(&self, id: &NodeId) -> Self {
        if id == &self.local {
            return self.clone();
        }
        let members = self.members.iter().filter(|m| &m.id != id).cloned().collect();
        Self::new(self.local.clone(), members)
    }
}
