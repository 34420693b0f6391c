//! Shared constants used across slices and the API surface.

/// OpenAPI tag for system endpoints (health, version).
pub const SYSTEM_TAG: &str = "System";
/// OpenAPI tag for routing/affinity endpoints.
pub const ROUTING_TAG: &str = "Routing";
/// OpenAPI tag for session-management endpoints.
pub const SESSIONS_TAG: &str = "Sessions";
/// OpenAPI tag for interface/binding endpoints.
pub const SOCKETS_TAG: &str = "Sockets";
/// OpenAPI tag for managed-server lifecycle endpoints.
pub const LIFECYCLE_TAG: &str = "Lifecycle";

/// Default delimiter joining routes in a ranked affinity token.
pub const DEFAULT_ROUTE_DELIMITER: &str = ".";
/// Default cap on the number of routes in a ranked affinity token.
pub const DEFAULT_MAX_ROUTES: usize = 3;
/// Default number of backup owners computed per session key.
pub const DEFAULT_REPLICAS: usize = 2;

/// Default idle timeout before a session expires (seconds).
pub const DEFAULT_SESSION_IDLE_TIMEOUT_SECS: u64 = 1800;
/// Default interval between session expiration/passivation sweeps (seconds).
pub const DEFAULT_SESSION_SWEEP_INTERVAL_SECS: u64 = 30;
/// Default grace period for an SSO entry with no associated sessions (seconds).
pub const DEFAULT_SSO_MAX_EMPTY_LIFE_SECS: u64 = 1800;
/// Default interval between SSO expiration sweeps (seconds).
pub const DEFAULT_SSO_PROCESS_EXPIRES_SECS: u64 = 60;
