//! Network interface snapshots, enumeration, and address selection.

use crate::criteria::CriteriaSet;
use crate::error::SocketsError;
use fxhash::FxHashMap;
use serde::Serialize;
use sgrid_domain::config::InterfaceConfig;
use sgrid_domain::flags::InterfaceFlags;
use std::net::IpAddr;
use tracing::debug;

/// Point-in-time snapshot of one network interface.
///
/// Criteria evaluate against snapshots, so the matcher itself never touches
/// the OS; tests and embedders can hand in synthetic interfaces.
#[derive(Debug, Clone, Serialize)]
pub struct NetInterface {
    pub name: String,
    pub flags: InterfaceFlags,
    pub addrs: Vec<IpAddr>,
}

/// An interface name resolved to one concrete bind address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedInterface {
    /// Declared interface name from the configuration.
    pub name: String,
    /// OS interface the address belongs to.
    pub nic: String,
    pub addr: IpAddr,
}

/// Enumerates OS network interfaces, grouping addresses by interface name.
///
/// Flags are derived best-effort from what the OS enumeration exposes: an
/// interface with a configured address is reported `UP`; `LOOPBACK` follows
/// its addresses; a `:`-suffixed alias is reported `VIRTUAL`; `MULTICAST` is
/// assumed for up, non-point-to-point interfaces. Flag-sensitive criteria that
/// need exact data can evaluate snapshots supplied by the embedder instead.
///
/// # Errors
/// Returns [`SocketsError::Io`] when the OS refuses to enumerate interfaces.
pub fn enumerate() -> Result<Vec<NetInterface>, SocketsError> {
    let mut grouped: FxHashMap<String, Vec<IpAddr>> = FxHashMap::default();
    let mut order: Vec<String> = Vec::new();

    for entry in get_if_addrs::get_if_addrs()? {
        let addr = entry.addr.ip();
        let name = entry.name;
        if !grouped.contains_key(&name) {
            order.push(name.clone());
        }
        grouped.entry(name).or_default().push(addr);
    }

    let interfaces = order
        .into_iter()
        .map(|name| {
            let addrs = grouped.remove(&name).unwrap_or_default();
            let mut flags = InterfaceFlags::UP;
            if addrs.iter().any(IpAddr::is_loopback) {
                flags |= InterfaceFlags::LOOPBACK;
            }
            if name.contains(':') {
                flags |= InterfaceFlags::VIRTUAL;
            }
            if !flags.contains(InterfaceFlags::POINT_TO_POINT) {
                flags |= InterfaceFlags::MULTICAST;
            }
            NetInterface { name, flags, addrs }
        })
        .collect();

    Ok(interfaces)
}

/// Picks the first (interface, address) pair accepted by the criteria.
///
/// Interfaces are probed in enumeration order and addresses in the order the
/// OS reported them, so the result is stable for a fixed snapshot.
#[must_use]
pub fn select_address<'a>(
    interfaces: &'a [NetInterface],
    criteria: &CriteriaSet,
) -> Option<(&'a NetInterface, IpAddr)> {
    for iface in interfaces {
        for &addr in &iface.addrs {
            if criteria.accepts(iface, addr) {
                return Some((iface, addr));
            }
        }
    }
    None
}

/// Resolves every declared interface against a snapshot.
///
/// # Errors
/// Returns [`SocketsError::InvalidCriterion`] for uncompilable criteria and
/// [`SocketsError::NoMatch`] when a declared interface matches nothing.
pub fn resolve_interfaces(
    declared: &[InterfaceConfig],
    interfaces: &[NetInterface],
) -> Result<Vec<ResolvedInterface>, SocketsError> {
    let mut resolved = Vec::with_capacity(declared.len());

    for config in declared {
        let criteria = CriteriaSet::compile(&config.criteria)?;
        let (iface, addr) =
            select_address(interfaces, &criteria).ok_or_else(|| SocketsError::NoMatch {
                message: config.name.clone().into(),
                context: Some("no enumerated address satisfied the interface criteria".into()),
            })?;

        debug!(interface = %config.name, nic = %iface.name, address = %addr, "Interface resolved");
        resolved.push(ResolvedInterface {
            name: config.name.clone(),
            nic: iface.name.clone(),
            addr,
        });
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sgrid_domain::config::CriterionConfig;

    fn snapshot() -> Vec<NetInterface> {
        vec![
            NetInterface {
                name: "lo".to_owned(),
                flags: InterfaceFlags::UP | InterfaceFlags::LOOPBACK | InterfaceFlags::MULTICAST,
                addrs: vec!["127.0.0.1".parse().unwrap(), "::1".parse().unwrap()],
            },
            NetInterface {
                name: "eth0".to_owned(),
                flags: InterfaceFlags::UP | InterfaceFlags::MULTICAST,
                addrs: vec!["10.1.2.3".parse().unwrap(), "203.0.113.7".parse().unwrap()],
            },
        ]
    }

    #[test]
    fn selection_returns_first_acceptable_pair() {
        let criteria = CriteriaSet::compile(&[CriterionConfig::SiteLocal]).unwrap();
        let snap = snapshot();
        let (iface, addr) = select_address(&snap, &criteria).expect("match");
        assert_eq!(iface.name, "eth0");
        assert_eq!(addr, "10.1.2.3".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn selection_misses_when_nothing_matches() {
        let criteria = CriteriaSet::compile(&[CriterionConfig::PointToPoint]).unwrap();
        assert!(select_address(&snapshot(), &criteria).is_none());
    }

    #[test]
    fn declared_interfaces_resolve_by_name() {
        let declared = vec![
            InterfaceConfig {
                name: "default".to_owned(),
                criteria: vec![CriterionConfig::Loopback],
            },
            InterfaceConfig {
                name: "public".to_owned(),
                criteria: vec![CriterionConfig::Public],
            },
        ];

        let resolved = resolve_interfaces(&declared, &snapshot()).unwrap();
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].nic, "lo");
        assert_eq!(resolved[1].addr, "203.0.113.7".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn unresolvable_interface_is_an_error() {
        let declared = vec![InterfaceConfig {
            name: "mesh".to_owned(),
            criteria: vec![CriterionConfig::Nic { name: "wg0".to_owned() }],
        }];

        let err = resolve_interfaces(&declared, &snapshot()).unwrap_err();
        assert!(matches!(err, SocketsError::NoMatch { .. }));
    }
}
