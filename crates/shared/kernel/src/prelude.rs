//! Convenience re-exports for slice and app crates.

pub use crate::config::{ConfigError, load_config};
pub use crate::safe_nanoid;
pub use sgrid_domain::config::GridConfig;
pub use sgrid_domain::node::{NodeId, NodeInfo, RouteId, Topology};
pub use sgrid_domain::registry::{InitializedSlice, ProviderSlice};

#[cfg(feature = "server")]
pub use crate::server::state::{GridState, GridStateError};
