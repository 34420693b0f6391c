//! # Interface Selection Criteria
//!
//! Pure predicates deciding whether a (interface, address) pair is acceptable
//! for binding. A [`CriteriaSet`] is a conjunction: every criterion must
//! accept the pair. `Any` nests a disjunction, `Not` a negated disjunction.
//!
//! Matching is side-effect-free except for host-name resolution caching and
//! one-time warnings for unresolvable or wildcard addresses.

use crate::error::SocketsError;
use crate::interfaces::NetInterface;
use regex::Regex;
use sgrid_domain::config::CriterionConfig;
use sgrid_domain::flags::InterfaceFlags;
use std::net::{IpAddr, ToSocketAddrs};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

/// A compiled conjunction of criteria.
#[derive(Debug)]
pub struct CriteriaSet {
    criteria: Vec<Criterion>,
}

impl CriteriaSet {
    /// Compiles a declarative criteria list.
    ///
    /// # Errors
    /// Returns [`SocketsError::InvalidCriterion`] when the list is empty, a
    /// regex fails to compile, or a subnet specification is malformed.
    pub fn compile(configs: &[CriterionConfig]) -> Result<Self, SocketsError> {
        if configs.is_empty() {
            return Err(SocketsError::InvalidCriterion {
                message: "at least one criterion is required".into(),
                context: None,
            });
        }

        let criteria =
            configs.iter().map(Criterion::compile).collect::<Result<Vec<_>, _>>()?;
        Ok(Self { criteria })
    }

    /// True iff every criterion accepts the pair.
    #[must_use]
    pub fn accepts(&self, iface: &NetInterface, addr: IpAddr) -> bool {
        self.criteria.iter().all(|criterion| criterion.matches(iface, addr))
    }
}

/// A single compiled criterion.
#[derive(Debug)]
pub enum Criterion {
    Loopback,
    LinkLocal,
    SiteLocal,
    Public,
    Up,
    Virtual,
    Multicast,
    PointToPoint,
    Nic(String),
    NicMatch(Regex),
    InetAddress(AddressMatcher),
    Subnet(SubnetMatcher),
    Any(Vec<Criterion>),
    Not(Vec<Criterion>),
}

impl Criterion {
    /// Compiles one declarative criterion, recursing into combinators.
    ///
    /// # Errors
    /// Returns [`SocketsError::InvalidCriterion`] for malformed patterns.
    pub fn compile(config: &CriterionConfig) -> Result<Self, SocketsError> {
        Ok(match config {
            CriterionConfig::Loopback => Self::Loopback,
            CriterionConfig::LinkLocal => Self::LinkLocal,
            CriterionConfig::SiteLocal => Self::SiteLocal,
            CriterionConfig::Public => Self::Public,
            CriterionConfig::Up => Self::Up,
            CriterionConfig::Virtual => Self::Virtual,
            CriterionConfig::Multicast => Self::Multicast,
            CriterionConfig::PointToPoint => Self::PointToPoint,
            CriterionConfig::Nic { name } => Self::Nic(name.clone()),
            CriterionConfig::NicMatch { pattern } => {
                let regex = Regex::new(pattern).map_err(|e| SocketsError::InvalidCriterion {
                    message: format!("bad NIC pattern '{pattern}': {e}").into(),
                    context: None,
                })?;
                Self::NicMatch(regex)
            },
            CriterionConfig::InetAddress { value } => {
                Self::InetAddress(AddressMatcher::new(value.clone()))
            },
            CriterionConfig::Subnet { value } => Self::Subnet(SubnetMatcher::parse(value)?),
            CriterionConfig::Any { of } => Self::Any(Self::compile_all(of)?),
            CriterionConfig::Not { of } => Self::Not(Self::compile_all(of)?),
        })
    }

    fn compile_all(configs: &[CriterionConfig]) -> Result<Vec<Self>, SocketsError> {
        if configs.is_empty() {
            return Err(SocketsError::InvalidCriterion {
                message: "combinator requires at least one nested criterion".into(),
                context: None,
            });
        }
        configs.iter().map(Self::compile).collect()
    }

    /// Whether the pair is acceptable under this criterion.
    #[must_use]
    pub fn matches(&self, iface: &NetInterface, addr: IpAddr) -> bool {
        match self {
            Self::Loopback => addr.is_loopback(),
            Self::LinkLocal => is_link_local(addr),
            Self::SiteLocal => is_site_local(addr),
            Self::Public => {
                !addr.is_loopback()
                    && !is_link_local(addr)
                    && !is_site_local(addr)
                    && !addr.is_unspecified()
            },
            Self::Up => iface.flags.contains(InterfaceFlags::UP),
            Self::Virtual => iface.flags.contains(InterfaceFlags::VIRTUAL),
            Self::Multicast => iface.flags.contains(InterfaceFlags::MULTICAST),
            Self::PointToPoint => iface.flags.contains(InterfaceFlags::POINT_TO_POINT),
            Self::Nic(name) => iface.name == *name,
            Self::NicMatch(regex) => regex.is_match(&iface.name),
            Self::InetAddress(matcher) => matcher.matches(addr),
            Self::Subnet(matcher) => matcher.matches(addr),
            Self::Any(nested) => nested.iter().any(|c| c.matches(iface, addr)),
            Self::Not(nested) => !nested.iter().any(|c| c.matches(iface, addr)),
        }
    }
}

/// Matches a single configured address, resolving host names lazily.
#[derive(Debug)]
pub struct AddressMatcher {
    spec: String,
    resolved: OnceLock<Option<IpAddr>>,
    warned_unresolvable: AtomicBool,
}

impl AddressMatcher {
    fn new(spec: String) -> Self {
        let resolved = OnceLock::new();
        if let Ok(addr) = spec.parse::<IpAddr>() {
            if addr.is_unspecified() {
                warn!(address = %spec, "Wildcard address configured as a match criterion; it will never equal a bound address");
            }
            let _ = resolved.set(Some(addr));
        }
        Self { spec, resolved, warned_unresolvable: AtomicBool::new(false) }
    }

    /// Resolution result, computed at most once per matcher.
    fn resolved(&self) -> Option<IpAddr> {
        *self.resolved.get_or_init(|| {
            (self.spec.as_str(), 0u16)
                .to_socket_addrs()
                .ok()
                .and_then(|mut addrs| addrs.next())
                .map(|sock| sock.ip())
        })
    }

    fn matches(&self, addr: IpAddr) -> bool {
        match self.resolved() {
            Some(expected) => expected == addr,
            None => {
                if !self.warned_unresolvable.swap(true, Ordering::Relaxed) {
                    warn!(host = %self.spec, "Configured address is unresolvable; criterion will never match");
                }
                false
            },
        }
    }
}

/// CIDR subnet membership test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetMatcher {
    network: IpAddr,
    prefix: u8,
}

impl SubnetMatcher {
    /// Parses `network/prefix` notation, e.g. `10.0.0.0/8` or `fd00::/16`.
    ///
    /// # Errors
    /// Returns [`SocketsError::InvalidCriterion`] for malformed input or a
    /// prefix longer than the address family allows.
    pub fn parse(value: &str) -> Result<Self, SocketsError> {
        let invalid = |detail: String| SocketsError::InvalidCriterion {
            message: format!("bad subnet '{value}': {detail}").into(),
            context: None,
        };

        let (network, prefix) =
            value.split_once('/').ok_or_else(|| invalid("missing '/prefix'".to_owned()))?;

        let network: IpAddr =
            network.parse().map_err(|e| invalid(format!("bad network address: {e}")))?;
        let prefix: u8 = prefix.parse().map_err(|e| invalid(format!("bad prefix: {e}")))?;

        let max = match network {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        if prefix > max {
            return Err(invalid(format!("prefix {prefix} exceeds family maximum {max}")));
        }

        Ok(Self { network, prefix })
    }

    /// True iff `addr` shares the network's prefix bits. An address-family
    /// mismatch is rejected immediately.
    #[must_use]
    pub fn matches(&self, addr: IpAddr) -> bool {
        match (self.network, addr) {
            (IpAddr::V4(network), IpAddr::V4(addr)) => {
                prefix_bits_equal(&network.octets(), &addr.octets(), self.prefix)
            },
            (IpAddr::V6(network), IpAddr::V6(addr)) => {
                prefix_bits_equal(&network.octets(), &addr.octets(), self.prefix)
            },
            _ => false,
        }
    }
}

fn prefix_bits_equal(network: &[u8], addr: &[u8], prefix: u8) -> bool {
    let full_bytes = usize::from(prefix / 8);
    if network[..full_bytes] != addr[..full_bytes] {
        return false;
    }

    let remainder = prefix % 8;
    if remainder == 0 {
        return true;
    }
    let mask = 0xffu8 << (8 - remainder);
    (network[full_bytes] & mask) == (addr[full_bytes] & mask)
}

fn is_link_local(addr: IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => v4.is_link_local(),
        // fe80::/10
        IpAddr::V6(v6) => (v6.segments()[0] & 0xffc0) == 0xfe80,
    }
}

fn is_site_local(addr: IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => v4.is_private(),
        // fec0::/10
        IpAddr::V6(v6) => (v6.segments()[0] & 0xffc0) == 0xfec0,
    }
}
