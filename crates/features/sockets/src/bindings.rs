//! Socket binding resolution.
//!
//! A binding group names a set of ports, each bound to a declared interface,
//! with a group-wide port offset applied to every non-fixed port. Resolution
//! is synchronous and fails fast: an unknown interface reference or a
//! malformed multicast declaration rejects the configuration before any
//! listener starts.

use crate::error::SocketsError;
use crate::interfaces::ResolvedInterface;
use fxhash::FxHashMap;
use serde::Serialize;
use sgrid_domain::config::{BindingGroupConfig, SocketBindingConfig};
use std::net::{IpAddr, SocketAddr};
use tracing::debug;

/// A named binding resolved to concrete socket addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedBinding {
    pub name: String,
    /// Declared interface the binding resolved through.
    pub interface: String,
    pub addr: SocketAddr,
    pub multicast: Option<SocketAddr>,
}

/// Resolves every binding in a group against already-resolved interfaces.
///
/// # Errors
/// Returns [`SocketsError::UnknownInterface`] for a dangling interface
/// reference and [`SocketsError::InvalidBinding`] for port overflow or a
/// malformed multicast declaration.
pub fn resolve_bindings(
    group: &BindingGroupConfig,
    interfaces: &[ResolvedInterface],
) -> Result<Vec<ResolvedBinding>, SocketsError> {
    let by_name: FxHashMap<&str, &ResolvedInterface> =
        interfaces.iter().map(|iface| (iface.name.as_str(), iface)).collect();

    let mut resolved = Vec::with_capacity(group.bindings.len());
    for (name, binding) in &group.bindings {
        resolved.push(resolve_binding(name, binding, group, &by_name)?);
    }
    Ok(resolved)
}

fn resolve_binding(
    name: &str,
    binding: &SocketBindingConfig,
    group: &BindingGroupConfig,
    interfaces: &FxHashMap<&str, &ResolvedInterface>,
) -> Result<ResolvedBinding, SocketsError> {
    let interface_name =
        binding.interface.as_deref().unwrap_or(group.default_interface.as_str());

    let interface =
        interfaces.get(interface_name).ok_or_else(|| SocketsError::UnknownInterface {
            message: interface_name.to_owned().into(),
            context: Some(format!("referenced by socket binding '{name}'").into()),
        })?;

    let port = effective_port(name, binding.port, binding.fixed_port, group.port_offset)?;
    let multicast = resolve_multicast(name, binding)?;

    let addr = SocketAddr::new(interface.addr, port);
    debug!(binding = %name, %addr, "Socket binding resolved");

    Ok(ResolvedBinding {
        name: name.to_owned(),
        interface: interface_name.to_owned(),
        addr,
        multicast,
    })
}

fn effective_port(
    name: &str,
    port: u16,
    fixed: bool,
    offset: u16,
) -> Result<u16, SocketsError> {
    if fixed {
        return Ok(port);
    }
    port.checked_add(offset).ok_or_else(|| SocketsError::InvalidBinding {
        message: format!("port {port} + offset {offset} overflows for binding '{name}'").into(),
        context: None,
    })
}

fn resolve_multicast(
    name: &str,
    binding: &SocketBindingConfig,
) -> Result<Option<SocketAddr>, SocketsError> {
    let Some(addr) = binding.multicast_address else {
        return Ok(None);
    };

    if !is_multicast(addr) {
        return Err(SocketsError::InvalidBinding {
            message: format!("'{addr}' is not a multicast address (binding '{name}')").into(),
            context: None,
        });
    }

    let port = binding.multicast_port.ok_or_else(|| SocketsError::InvalidBinding {
        message: format!("multicast address without multicast port (binding '{name}')").into(),
        context: None,
    })?;

    Ok(Some(SocketAddr::new(addr, port)))
}

fn is_multicast(addr: IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => v4.is_multicast(),
        IpAddr::V6(v6) => v6.is_multicast(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn interfaces() -> Vec<ResolvedInterface> {
        vec![
            ResolvedInterface {
                name: "default".to_owned(),
                nic: "lo".to_owned(),
                addr: "127.0.0.1".parse().unwrap(),
            },
            ResolvedInterface {
                name: "public".to_owned(),
                nic: "eth0".to_owned(),
                addr: "203.0.113.7".parse().unwrap(),
            },
        ]
    }

    fn group(offset: u16, bindings: BTreeMap<String, SocketBindingConfig>) -> BindingGroupConfig {
        BindingGroupConfig { default_interface: "default".to_owned(), port_offset: offset, bindings }
    }

    fn binding(port: u16) -> SocketBindingConfig {
        SocketBindingConfig { port, ..SocketBindingConfig::default() }
    }

    #[test]
    fn offset_applies_to_non_fixed_ports() {
        let mut bindings = BTreeMap::new();
        bindings.insert("http".to_owned(), binding(8080));
        bindings.insert(
            "mgmt".to_owned(),
            SocketBindingConfig { fixed_port: true, ..binding(9990) },
        );

        let resolved = resolve_bindings(&group(100, bindings), &interfaces()).unwrap();
        let by_name: BTreeMap<&str, &ResolvedBinding> =
            resolved.iter().map(|b| (b.name.as_str(), b)).collect();

        assert_eq!(by_name["http"].addr.port(), 8180);
        assert_eq!(by_name["mgmt"].addr.port(), 9990);
    }

    #[test]
    fn bindings_fall_back_to_the_group_interface() {
        let mut bindings = BTreeMap::new();
        bindings.insert("http".to_owned(), binding(8080));
        bindings.insert(
            "external".to_owned(),
            SocketBindingConfig { interface: Some("public".to_owned()), ..binding(80) },
        );

        let resolved = resolve_bindings(&group(0, bindings), &interfaces()).unwrap();
        let by_name: BTreeMap<&str, &ResolvedBinding> =
            resolved.iter().map(|b| (b.name.as_str(), b)).collect();

        assert_eq!(by_name["http"].addr.ip(), "127.0.0.1".parse::<IpAddr>().unwrap());
        assert_eq!(by_name["external"].addr.ip(), "203.0.113.7".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn unknown_interface_reference_fails() {
        let mut bindings = BTreeMap::new();
        bindings.insert(
            "broken".to_owned(),
            SocketBindingConfig { interface: Some("missing".to_owned()), ..binding(80) },
        );

        let err = resolve_bindings(&group(0, bindings), &interfaces()).unwrap_err();
        assert!(matches!(err, SocketsError::UnknownInterface { .. }));
    }

    #[test]
    fn port_overflow_is_rejected() {
        let mut bindings = BTreeMap::new();
        bindings.insert("high".to_owned(), binding(65000));

        let err = resolve_bindings(&group(1000, bindings), &interfaces()).unwrap_err();
        assert!(matches!(err, SocketsError::InvalidBinding { .. }));
    }

    #[test]
    fn multicast_validation() {
        let mut bindings = BTreeMap::new();
        bindings.insert(
            "cluster".to_owned(),
            SocketBindingConfig {
                multicast_address: Some("230.0.0.4".parse().unwrap()),
                multicast_port: Some(45700),
                ..binding(7600)
            },
        );

        let resolved = resolve_bindings(&group(0, bindings), &interfaces()).unwrap();
        assert_eq!(
            resolved[0].multicast,
            Some("230.0.0.4:45700".parse::<SocketAddr>().unwrap())
        );

        // A unicast multicast-address is rejected.
        let mut bindings = BTreeMap::new();
        bindings.insert(
            "bad".to_owned(),
            SocketBindingConfig {
                multicast_address: Some("10.0.0.4".parse().unwrap()),
                multicast_port: Some(45700),
                ..binding(7600)
            },
        );
        let err = resolve_bindings(&group(0, bindings), &interfaces()).unwrap_err();
        assert!(matches!(err, SocketsError::InvalidBinding { .. }));

        // A multicast address without a port is rejected.
        let mut bindings = BTreeMap::new();
        bindings.insert(
            "portless".to_owned(),
            SocketBindingConfig {
                multicast_address: Some("230.0.0.4".parse().unwrap()),
                multicast_port: None,
                ..binding(7600)
            },
        );
        let err = resolve_bindings(&group(0, bindings), &interfaces()).unwrap_err();
        assert!(matches!(err, SocketsError::InvalidBinding { .. }));
    }
}
