//! # Single Sign-On
//!
//! A clustered single sign-on registry: one entry per authenticated
//! principal, grouping the sessions it holds across session-management
//! instances and caching the credentials peers need to re-authenticate it.
//! Deregistration cascades a logout to every associated session via the
//! cluster event hub.

mod error;
pub mod manager;

pub use crate::error::{SsoError, SsoErrorExt};
pub use crate::manager::{Credentials, SessionRef, SsoManager};

use sgrid_domain::config::GridConfig;
use sgrid_events::ClusterEvents;
use sgrid_kernel::domain::registry::InitializedSlice;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// SSO slice state. `manager` is `None` when the feature is disabled.
#[sgrid_derive::sgrid_slice]
pub struct Sso {
    manager: Option<Arc<SsoManager>>,
}

impl SsoInner {
    /// The registry, if enabled.
    ///
    /// # Errors
    /// Returns [`SsoError::Disabled`] when SSO is off.
    pub fn manager(&self) -> Result<&Arc<SsoManager>, SsoError> {
        self.manager.as_ref().ok_or_else(|| SsoError::Disabled {
            message: "single sign-on is not enabled".into(),
            context: None,
        })
    }

    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.manager.is_some()
    }

    /// Spawns the periodic expiration sweep, if enabled.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn spawn_sweeper(&self) -> Option<JoinHandle<()>> {
        let manager = Arc::clone(self.manager.as_ref()?);
        let interval =
            Duration::from_secs(manager.config().process_expires_interval_secs.max(1));

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                manager.process_expires();
            }
        }))
    }
}

/// Initialize the SSO slice.
///
/// # Errors
/// Infallible today; kept fallible for parity with the other slices.
pub fn init(config: &GridConfig, events: &ClusterEvents) -> Result<InitializedSlice, SsoError> {
    let manager = config
        .sso
        .enabled
        .then(|| Arc::new(SsoManager::new(config.sso.clone(), events.clone())));

    tracing::info!(enabled = manager.is_some(), "SSO slice initialized");

    let slice = Sso::new(SsoInner { manager });
    Ok(InitializedSlice::new(slice))
}
