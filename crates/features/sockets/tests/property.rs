use proptest::prelude::*;
use sgrid_domain::config::CriterionConfig;
use sgrid_domain::flags::InterfaceFlags;
use sgrid_sockets::criteria::{Criterion, SubnetMatcher};
use sgrid_sockets::interfaces::NetInterface;
use std::net::{IpAddr, Ipv4Addr};

fn probe_interface() -> NetInterface {
    NetInterface {
        name: "eth0".to_owned(),
        flags: InterfaceFlags::UP | InterfaceFlags::MULTICAST,
        addrs: Vec::new(),
    }
}

fn nested() -> Vec<CriterionConfig> {
    vec![
        CriterionConfig::Loopback,
        CriterionConfig::SiteLocal,
        CriterionConfig::LinkLocal,
    ]
}

proptest! {
    // `Any` must hold iff at least one nested criterion holds; `Not` iff none does.
    #[test]
    fn any_and_not_agree_with_nested_disjunction(bits in any::<u32>()) {
        let addr = IpAddr::V4(Ipv4Addr::from(bits));
        let iface = probe_interface();

        let individually: Vec<bool> = nested()
            .iter()
            .map(|c| Criterion::compile(c).unwrap().matches(&iface, addr))
            .collect();
        let disjunction = individually.iter().any(|&m| m);

        let any = Criterion::compile(&CriterionConfig::Any { of: nested() }).unwrap();
        let not = Criterion::compile(&CriterionConfig::Not { of: nested() }).unwrap();

        prop_assert_eq!(any.matches(&iface, addr), disjunction);
        prop_assert_eq!(not.matches(&iface, addr), !disjunction);
    }

    // An address is in a subnet iff its leading `prefix` bits equal the network's.
    #[test]
    fn subnet_matches_exactly_the_prefix_bits(
        addr_bits in any::<u32>(),
        net_bits in any::<u32>(),
        prefix in 0u8..=32,
    ) {
        let network = Ipv4Addr::from(net_bits);
        let matcher = SubnetMatcher::parse(&format!("{network}/{prefix}")).unwrap();

        let expected = if prefix == 0 {
            true
        } else {
            (addr_bits >> (32 - u32::from(prefix))) == (net_bits >> (32 - u32::from(prefix)))
        };

        prop_assert_eq!(matcher.matches(IpAddr::V4(Ipv4Addr::from(addr_bits))), expected);
    }

    // Family mismatch is always rejected, whatever the prefix.
    #[test]
    fn subnet_rejects_family_mismatch(net_bits in any::<u32>(), prefix in 0u8..=32) {
        let network = Ipv4Addr::from(net_bits);
        let matcher = SubnetMatcher::parse(&format!("{network}/{prefix}")).unwrap();
        prop_assert!(!matcher.matches("fd00::1".parse::<IpAddr>().unwrap()));
    }
}
