//! Facade crate for SessionGrid features and shared modules.
//! Re-exports domain/kernel primitives and aggregates slice initialization.
//! Keep this crate thin: it should compose other crates, not implement grid logic.
//!
//! ## Usage
//! - Add `sgrid` and call [`init`] to build every provider slice from a loaded
//!   [`GridConfig`]; register the returned slices into the kernel state.

pub use sgrid_domain as domain;
use sgrid_domain::config::GridConfig;
use sgrid_events::ClusterEvents;
pub use sgrid_kernel as kernel;
use sgrid_store::Store;

#[cfg(feature = "server")]
pub mod server {
    pub mod router {
        pub use sgrid_kernel::server::router::system_router;
    }
}

/// Feature registry for runtime introspection.
pub mod features {
    pub use sgrid_lifecycle as lifecycle;
    pub use sgrid_routing as routing;
    pub use sgrid_sessions as sessions;
    pub use sgrid_sockets as sockets;
    pub use sgrid_sso as sso;

    /// Build-time enabled features (by Cargo feature).
    pub const ENABLED: &[&str] = &[
        #[cfg(feature = "server")]
        "server",
        "sockets",
        "routing",
        "sessions",
        "sso",
        "lifecycle",
    ];

    #[must_use]
    pub fn is_enabled(name: &str) -> bool {
        ENABLED.contains(&name)
    }
}

/// Initialize all provider slices.
///
/// Order matters: routing seeds the topology other slices read.
///
/// # Errors
/// Returns an error if any slice initialization fails.
pub fn init(
    config: &GridConfig,
    events: &ClusterEvents,
    store: &Store,
) -> Result<Vec<domain::registry::InitializedSlice>, Box<dyn std::error::Error>> {
    let mut slices = Vec::new();

    // Sockets: interfaces and bindings must resolve before anything listens.
    slices.push(features::sockets::init(config)?);

    // Routing: publishes the seed topology and compiles affinity locators.
    slices.push(features::routing::init(config, events)?);

    // Sessions
    slices.push(features::sessions::init(config, events, store)?);

    // Single sign-on
    slices.push(features::sso::init(config, events)?);

    // Managed-server lifecycle
    slices.push(features::lifecycle::init(config)?);

    Ok(slices)
}
