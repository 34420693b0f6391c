//! # Sessions
//!
//! Distributable session management.
//!
//! Each configured instance gets a [`SessionManager`]: an in-memory map of
//! active sessions with granularity-aware dirty tracking, an expiration/
//! passivation sweep, and a passivation namespace in the record store.
//! Session lifecycle transitions publish to the cluster event hub so routing
//! and SSO can react without coupling.

mod error;
pub mod expiration;
pub mod manager;
pub mod record;

pub use crate::error::{SessionsError, SessionsErrorExt};
pub use crate::expiration::spawn_sweeper;
pub use crate::manager::{SessionManager, StatsSnapshot};
pub use crate::record::{Delta, SessionRecord};

use fxhash::FxHashMap;
use sgrid_domain::config::GridConfig;
use sgrid_events::ClusterEvents;
use sgrid_kernel::domain::registry::InitializedSlice;
use sgrid_store::Store;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Sessions slice state: one manager per configured instance.
#[sgrid_derive::sgrid_slice]
pub struct Sessions {
    managers: FxHashMap<String, Arc<SessionManager>>,
}

impl SessionsInner {
    /// Looks up a manager by instance name.
    #[must_use]
    pub fn manager(&self, name: &str) -> Option<&Arc<SessionManager>> {
        self.managers.get(name)
    }

    /// Iterates all managers.
    pub fn managers(&self) -> impl Iterator<Item = &Arc<SessionManager>> {
        self.managers.values()
    }

    /// Statistics for every manager.
    #[must_use]
    pub fn stats(&self) -> Vec<StatsSnapshot> {
        let mut stats: Vec<StatsSnapshot> = self.managers.values().map(|m| m.stats()).collect();
        stats.sort_by(|a, b| a.name.cmp(&b.name));
        stats
    }

    /// Spawns the expiration sweeper for every manager.
    ///
    /// Must be called from within a Tokio runtime. Handles are returned so
    /// the caller can abort them on shutdown.
    #[must_use]
    pub fn spawn_sweepers(&self) -> Vec<JoinHandle<()>> {
        self.managers.values().map(|manager| spawn_sweeper(Arc::clone(manager))).collect()
    }
}

/// Initialize the sessions slice.
///
/// # Errors
/// Returns [`SessionsError::Store`] when a passivation namespace cannot be
/// created for an instance.
pub fn init(
    config: &GridConfig,
    events: &ClusterEvents,
    store: &Store,
) -> Result<InitializedSlice, SessionsError> {
    let mut managers = FxHashMap::default();

    for (name, manager_config) in &config.session_managers {
        let records = store.namespace(name).context(format!("namespace for '{name}'"))?;
        let manager = SessionManager::new(
            name.clone(),
            manager_config.clone(),
            records,
            events.clone(),
        );
        managers.insert(name.clone(), Arc::new(manager));
    }

    tracing::info!(managers = managers.len(), "Sessions slice initialized");

    let slice = Sessions::new(SessionsInner { managers });
    Ok(InitializedSlice::new(slice))
}
