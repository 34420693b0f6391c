//! # Cluster Event Hub
//!
//! A thread-safe hub carrying the three event streams the grid runs on:
//!
//! * **Topology**: a `watch` channel of immutable [`Topology`] snapshots.
//!   Subscribers (route locators, session managers) always observe the latest
//!   complete snapshot; intermediate updates may be skipped.
//! * **Session events**: a `broadcast` channel of session lifecycle
//!   notifications (created/expired/passivated/activated/invalidated).
//! * **SSO events**: a `broadcast` channel of single-sign-on notifications,
//!   including remote credential updates and empty/not-empty transitions.
//!
//! Publishing never blocks: broadcast events with no subscribers are dropped
//! and counted as delivered to zero receivers.

mod error;
mod hub;

pub use crate::error::{EventHubError, EventHubErrorExt};
pub use crate::hub::{ClusterEvents, DEFAULT_CAPACITY};

use sgrid_domain::node::Topology;
use std::sync::Arc;

/// Session lifecycle notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEvent {
    /// Name of the session-management instance.
    pub manager: String,
    /// Session identifier.
    pub session: String,
    pub kind: SessionEventKind,
}

impl SessionEvent {
    #[must_use]
    pub fn new(manager: impl Into<String>, session: impl Into<String>, kind: SessionEventKind) -> Self {
        Self { manager: manager.into(), session: session.into(), kind }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEventKind {
    Created,
    Expired,
    Passivated,
    Activated,
    Invalidated,
}

/// Single-sign-on notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsoEvent {
    /// SSO entry identifier.
    pub sso: String,
    pub kind: SsoEventKind,
}

impl SsoEvent {
    #[must_use]
    pub fn new(sso: impl Into<String>, kind: SsoEventKind) -> Self {
        Self { sso: sso.into(), kind }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SsoEventKind {
    Registered,
    /// Credentials changed; peers must refresh their cached copy.
    Updated,
    Deregistered,
    /// The entry lost its last session and entered the empty grace period.
    Empty,
    /// A session was associated with a previously empty entry.
    NotEmpty,
    /// Sessions invalidated as part of a cascading logout.
    SessionsInvalidated { sessions: Vec<String> },
}

/// Shared topology snapshot as carried on the watch channel.
pub type TopologySnapshot = Arc<Topology>;
