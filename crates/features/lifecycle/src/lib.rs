//! # Lifecycle
//!
//! Managed-server lifecycle operation handlers.
//!
//! The host registry tracks named managed servers and validates every
//! operation (start/stop/restart/reload/suspend/resume) against the current
//! state. Illegal operations fail synchronously with a failure description
//! and no state change; configuration changes against a live server set
//! restart/reload-required flags instead.

mod error;
pub mod registry;
pub mod state;

pub use crate::error::{LifecycleError, LifecycleErrorExt};
pub use crate::registry::HostRegistry;
pub use crate::state::{Operation, OperationOutcome, ServerState, ServerStatus};

use sgrid_domain::config::GridConfig;
use sgrid_kernel::domain::registry::InitializedSlice;
use std::sync::Arc;

/// Lifecycle slice state.
#[sgrid_derive::sgrid_slice]
pub struct Host {
    pub registry: Arc<HostRegistry>,
}

/// Initialize the lifecycle slice from the configured server list.
///
/// # Errors
/// Infallible today; kept fallible for parity with the other slices.
pub fn init(config: &GridConfig) -> Result<InitializedSlice, LifecycleError> {
    let registry = Arc::new(HostRegistry::new());
    for server in &config.servers {
        registry.register(server.name.clone(), server.auto_start);
    }

    tracing::info!(servers = config.servers.len(), "Lifecycle slice initialized");

    let slice = Host::new(HostInner { registry });
    Ok(InitializedSlice::new(slice))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sgrid_domain::config::ManagedServerConfig;

    #[test]
    fn init_registers_configured_servers() {
        let mut config = GridConfig::default();
        config.servers = vec![
            ManagedServerConfig { name: "web-1".to_owned(), auto_start: true },
            ManagedServerConfig { name: "web-2".to_owned(), auto_start: false },
        ];

        let slice = init(&config).unwrap();
        let host = slice.state.as_any().downcast_ref::<Host>().unwrap();

        let statuses = host.registry.statuses();
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[0].state, ServerState::Running);
        assert_eq!(statuses[1].state, ServerState::Stopped);
    }
}
