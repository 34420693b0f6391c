use crate::constants::{
    DEFAULT_MAX_ROUTES, DEFAULT_REPLICAS, DEFAULT_ROUTE_DELIMITER,
    DEFAULT_SESSION_IDLE_TIMEOUT_SECS, DEFAULT_SESSION_SWEEP_INTERVAL_SECS,
    DEFAULT_SSO_MAX_EMPTY_LIFE_SECS, DEFAULT_SSO_PROCESS_EXPIRES_SECS,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::sync::Arc;

/// Top-level grid configuration shared across services.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GridConfigInner {
    pub node: NodeConfig,
    pub server: ServerConfig,
    pub interfaces: Vec<InterfaceConfig>,
    pub socket_bindings: BindingGroupConfig,
    pub routing: RoutingConfig,
    pub session_managers: BTreeMap<String, SessionManagementConfig>,
    pub sso: SsoConfig,
    pub servers: Vec<ManagedServerConfig>,
    pub store: StoreConfig,
}

/// Thin Arc-wrapped config for inexpensive cloning into subsystems.
#[derive(Default, Debug, Clone, Deserialize)]
pub struct GridConfig {
    #[serde(flatten, default)]
    inner: Arc<GridConfigInner>,
}

impl Deref for GridConfig {
    type Target = GridConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for GridConfig {
    fn deref_mut(&mut self) -> &mut GridConfigInner {
        Arc::make_mut(&mut self.inner)
    }
}

/// Identity of this cluster member.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Stable member id, unique within the cluster.
    pub id: String,
    /// Route token advertised to load balancers. `None` disables client affinity to this node.
    pub route: Option<String>,
}

/// Admin/routing API listener configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Name of the socket binding the API listens on.
    pub binding: String,
    pub ssl: Option<SslConfig>,
}

/// TLS certificate/key paths.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SslConfig {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// A named interface: the first enumerated (interface, address) pair accepted
/// by every criterion is the interface's resolved address.
#[derive(Debug, Clone, Deserialize)]
pub struct InterfaceConfig {
    pub name: String,
    pub criteria: Vec<CriterionConfig>,
}

/// Declarative form of an interface selection criterion.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum CriterionConfig {
    Loopback,
    LinkLocal,
    SiteLocal,
    Public,
    Up,
    Virtual,
    Multicast,
    PointToPoint,
    /// Exact NIC name match.
    Nic { name: String },
    /// NIC name regular-expression match.
    NicMatch { pattern: String },
    /// Exact address (or resolvable host name) match.
    InetAddress { value: String },
    /// CIDR subnet membership, e.g. `10.0.0.0/8` or `fd00::/16`.
    Subnet { value: String },
    /// Satisfied when at least one nested criterion is.
    Any { of: Vec<CriterionConfig> },
    /// Satisfied when no nested criterion is.
    Not { of: Vec<CriterionConfig> },
}

/// A group of named port bindings sharing a default interface and a port offset.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BindingGroupConfig {
    pub default_interface: String,
    /// Added to every non-fixed port in the group.
    pub port_offset: u16,
    pub bindings: BTreeMap<String, SocketBindingConfig>,
}

/// A single named socket binding.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SocketBindingConfig {
    /// Interface override; falls back to the group's default interface.
    pub interface: Option<String>,
    pub port: u16,
    /// When set, the group's port offset is not applied.
    pub fixed_port: bool,
    pub multicast_address: Option<IpAddr>,
    pub multicast_port: Option<u16>,
}

/// Cluster routing configuration: seed membership and ownership fan-out.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Number of backup owners computed per session key.
    pub replicas: usize,
    /// Seed members; the local node is added implicitly.
    pub members: Vec<MemberConfig>,
}

/// A seed cluster member.
#[derive(Debug, Clone, Deserialize)]
pub struct MemberConfig {
    pub id: String,
    #[serde(default)]
    pub route: Option<String>,
}

/// Replication unit for session state.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Granularity {
    /// The whole session replicates as one unit.
    #[default]
    Session,
    /// Each attribute replicates independently (dirty tracking per attribute).
    Attribute,
}

/// One distributable session-management instance.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionManagementConfig {
    pub granularity: Granularity,
    /// Cap on concurrently active (in-memory) sessions. `None` means unbounded.
    pub max_active: Option<u64>,
    /// Idle time after which a session expires.
    pub idle_timeout_secs: u64,
    /// Interval between expiration/passivation sweeps.
    pub sweep_interval_secs: u64,
    pub passivation: Option<PassivationConfig>,
    pub affinity: AffinityConfig,
}

/// Passivation thresholds; both are idle times measured from last access.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct PassivationConfig {
    /// Minimum idle time before a session may passivate under memory pressure.
    pub min_idle_secs: u64,
    /// Idle time after which a session always passivates. `None` means never.
    pub max_idle_secs: Option<u64>,
}

/// Affinity policy deciding which route token a session advertises.
#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "policy", rename_all = "kebab-case")]
pub enum AffinityConfig {
    /// No affinity: requests may land anywhere.
    None,
    /// Always route to the local member.
    #[default]
    Local,
    /// Route to the member currently owning the session key.
    PrimaryOwner,
    /// Ordered failover list of owner routes.
    Ranked {
        #[serde(default = "default_delimiter")]
        delimiter: String,
        #[serde(default = "default_max_routes")]
        max_routes: usize,
    },
}

fn default_delimiter() -> String {
    DEFAULT_ROUTE_DELIMITER.to_owned()
}

const fn default_max_routes() -> usize {
    DEFAULT_MAX_ROUTES
}

/// Single sign-on configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SsoConfig {
    pub enabled: bool,
    /// Grace period for an entry with no associated sessions.
    pub max_empty_life_secs: u64,
    /// Interval between expiration sweeps.
    pub process_expires_interval_secs: u64,
}

/// A managed server registered with the lifecycle host registry.
#[derive(Debug, Clone, Deserialize)]
pub struct ManagedServerConfig {
    pub name: String,
    #[serde(default)]
    pub auto_start: bool,
}

/// Passivation store roots.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
    pub compression: bool,
}

// --- Default ---

impl Default for GridConfigInner {
    fn default() -> Self {
        Self {
            node: NodeConfig::default(),
            server: ServerConfig::default(),
            // A loopback interface keeps the default binding group resolvable
            // out of the box.
            interfaces: vec![InterfaceConfig {
                name: "default".to_owned(),
                criteria: vec![CriterionConfig::Loopback],
            }],
            socket_bindings: BindingGroupConfig::default(),
            routing: RoutingConfig::default(),
            session_managers: BTreeMap::new(),
            sso: SsoConfig::default(),
            servers: Vec::new(),
            store: StoreConfig::default(),
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self { id: "node-1".to_owned(), route: Some("node-1".to_owned()) }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { binding: "admin".to_owned(), ssl: None }
    }
}

impl Default for SslConfig {
    fn default() -> Self {
        Self { cert: PathBuf::from("cert.pem"), key: PathBuf::from("key.pem") }
    }
}

impl Default for BindingGroupConfig {
    fn default() -> Self {
        Self {
            default_interface: "default".to_owned(),
            port_offset: 0,
            bindings: BTreeMap::from([("admin".to_owned(), SocketBindingConfig::default())]),
        }
    }
}

impl Default for SocketBindingConfig {
    fn default() -> Self {
        Self {
            interface: None,
            port: 4590,
            fixed_port: false,
            multicast_address: None,
            multicast_port: None,
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self { replicas: DEFAULT_REPLICAS, members: Vec::new() }
    }
}

impl Default for SessionManagementConfig {
    fn default() -> Self {
        Self {
            granularity: Granularity::default(),
            max_active: None,
            idle_timeout_secs: DEFAULT_SESSION_IDLE_TIMEOUT_SECS,
            sweep_interval_secs: DEFAULT_SESSION_SWEEP_INTERVAL_SECS,
            passivation: None,
            affinity: AffinityConfig::default(),
        }
    }
}

impl Default for PassivationConfig {
    fn default() -> Self {
        Self { min_idle_secs: 60, max_idle_secs: None }
    }
}

impl Default for SsoConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_empty_life_secs: DEFAULT_SSO_MAX_EMPTY_LIFE_SECS,
            process_expires_interval_secs: DEFAULT_SSO_PROCESS_EXPIRES_SECS,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { data_dir: PathBuf::from("data"), compression: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_provide_an_admin_binding() {
        let config = GridConfigInner::default();
        assert!(config.socket_bindings.bindings.contains_key("admin"));
        assert_eq!(config.server.binding, "admin");
    }

    #[test]
    fn criteria_deserialize_from_kebab_case_tags() {
        let toml = r#"
            name = "public"
            criteria = [
                { type = "up" },
                { type = "not", of = [{ type = "loopback" }] },
                { type = "subnet", value = "10.0.0.0/8" },
            ]
        "#;
        let interface: InterfaceConfig = toml::from_str(toml).unwrap();
        assert_eq!(interface.criteria.len(), 3);
        assert_eq!(
            interface.criteria[2],
            CriterionConfig::Subnet { value: "10.0.0.0/8".to_owned() }
        );
    }

    #[test]
    fn ranked_affinity_fills_in_defaults() {
        let toml = r#"policy = "ranked""#;
        let affinity: AffinityConfig = toml::from_str(toml).unwrap();
        assert_eq!(
            affinity,
            AffinityConfig::Ranked { delimiter: ".".to_owned(), max_routes: 3 }
        );
    }
}
