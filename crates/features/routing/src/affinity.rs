//! Affinity policies: which route token a session advertises.
//!
//! * `None`: no affinity, requests may land anywhere.
//! * `Local`: always the local member's route.
//! * `PrimaryOwner`: the route of the member owning the session key, falling
//!   back to the local route when the owner advertises none.
//! * `Ranked`: an ordered, delimiter-joined, length-capped list of owner
//!   routes for client-side failover.

use crate::error::RoutingError;
use crate::ownership::ownership;
use sgrid_domain::config::AffinityConfig;
use sgrid_domain::node::Topology;

/// A compiled affinity policy for one session-management instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteLocator {
    None,
    Local,
    PrimaryOwner {
        replicas: usize,
    },
    Ranked {
        delimiter: String,
        max_routes: usize,
        replicas: usize,
    },
}

impl RouteLocator {
    /// Compiles the declarative affinity policy.
    ///
    /// `replicas` is the cluster-wide backup-owner count and bounds how many
    /// failover targets a ranked token can draw from.
    ///
    /// # Errors
    /// Returns [`RoutingError::InvalidAffinity`] for an empty delimiter or a
    /// zero `max_routes`.
    pub fn from_config(affinity: &AffinityConfig, replicas: usize) -> Result<Self, RoutingError> {
        Ok(match affinity {
            AffinityConfig::None => Self::None,
            AffinityConfig::Local => Self::Local,
            AffinityConfig::PrimaryOwner => Self::PrimaryOwner { replicas },
            AffinityConfig::Ranked { delimiter, max_routes } => {
                if delimiter.is_empty() {
                    return Err(RoutingError::InvalidAffinity {
                        message: "ranked delimiter cannot be empty".into(),
                        context: None,
                    });
                }
                if *max_routes == 0 {
                    return Err(RoutingError::InvalidAffinity {
                        message: "ranked max_routes must be at least 1".into(),
                        context: None,
                    });
                }
                Self::Ranked { delimiter: delimiter.clone(), max_routes: *max_routes, replicas }
            },
        })
    }

    /// Produces the route token for `session` under `topology`.
    ///
    /// Returns `None` when the policy yields no route (no affinity, or no
    /// member advertises one).
    #[must_use]
    pub fn locate(&self, session: &str, topology: &Topology) -> Option<String> {
        match self {
            Self::None => None,
            Self::Local => topology.local_route().map(|r| r.as_str().to_owned()),
            Self::PrimaryOwner { replicas } => {
                let owners = ownership(topology, session, *replicas);
                topology
                    .route_of(&owners.primary)
                    // The owner may not advertise a route; the local member
                    // is always a valid fallback target.
                    .or_else(|| topology.local_route())
                    .map(|r| r.as_str().to_owned())
            },
            Self::Ranked { delimiter, max_routes, replicas } => {
                let owners = ownership(topology, session, *replicas);

                let mut routes: Vec<&str> = Vec::with_capacity((*max_routes).min(8));
                let candidates =
                    owners.iter().chain(std::iter::once(topology.local())).filter_map(|id| {
                        topology.route_of(id).map(sgrid_domain::node::RouteId::as_str)
                    });
                for route in candidates {
                    if !routes.contains(&route) {
                        routes.push(route);
                    }
                    if routes.len() == *max_routes {
                        break;
                    }
                }

                if routes.is_empty() { None } else { Some(routes.join(delimiter)) }
            },
        }
    }
}

/// Splits a ranked route token back into its failover-ordered routes.
#[must_use]
pub fn parse_ranked(token: &str, delimiter: &str) -> Vec<String> {
    if token.is_empty() {
        return Vec::new();
    }
    token.split(delimiter).map(str::to_owned).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sgrid_domain::node::{NodeId, NodeInfo};

    fn topology() -> Topology {
        Topology::new(
            NodeId::from("n1"),
            vec![
                NodeInfo::new("n1", Some("r1")),
                NodeInfo::new("n2", Some("r2")),
                NodeInfo::new("n3", Some("r3")),
                NodeInfo::new("n4", Some("r4")),
            ],
        )
    }

    fn ranked(delimiter: &str, max_routes: usize) -> RouteLocator {
        RouteLocator::from_config(
            &AffinityConfig::Ranked { delimiter: delimiter.to_owned(), max_routes },
            2,
        )
        .unwrap()
    }

    #[test]
    fn no_affinity_yields_no_route() {
        let locator = RouteLocator::from_config(&AffinityConfig::None, 2).unwrap();
        assert_eq!(locator.locate("s1", &topology()), None);
    }

    #[test]
    fn local_affinity_yields_the_local_route() {
        let locator = RouteLocator::from_config(&AffinityConfig::Local, 2).unwrap();
        assert_eq!(locator.locate("s1", &topology()), Some("r1".to_owned()));
    }

    #[test]
    fn primary_owner_routes_to_the_owner() {
        let locator = RouteLocator::from_config(&AffinityConfig::PrimaryOwner, 2).unwrap();
        let topology = topology();

        let route = locator.locate("s1", &topology).expect("route");
        let owners = ownership(&topology, "s1", 2);
        assert_eq!(route, topology.route_of(&owners.primary).unwrap().as_str());
    }

    #[test]
    fn primary_owner_falls_back_to_the_local_route() {
        // No member advertises a route except the local one.
        let topology = Topology::new(
            NodeId::from("n1"),
            vec![NodeInfo::new("n1", Some("r1")), NodeInfo::new("n2", None)],
        );
        let locator = RouteLocator::from_config(&AffinityConfig::PrimaryOwner, 2).unwrap();

        for session in ["a", "b", "c", "d", "e"] {
            assert_eq!(locator.locate(session, &topology), Some("r1".to_owned()));
        }
    }

    #[test]
    fn ranked_token_respects_cap_and_delimiter() {
        let topology = topology();
        for max_routes in 1..=4 {
            let locator = ranked(".", max_routes);
            let token = locator.locate("s1", &topology).expect("token");
            let routes = parse_ranked(&token, ".");

            assert!(routes.len() <= max_routes, "token {token} exceeds cap {max_routes}");
            assert_eq!(routes.join("."), token);
        }
    }

    #[test]
    fn ranked_token_puts_the_primary_first() {
        let topology = topology();
        let locator = ranked(".", 3);
        let token = locator.locate("s1", &topology).expect("token");
        let owners = ownership(&topology, "s1", 2);

        let first = parse_ranked(&token, ".").remove(0);
        assert_eq!(first, topology.route_of(&owners.primary).unwrap().as_str());
    }

    #[test]
    fn ranked_token_contains_distinct_routes() {
        let topology = topology();
        let locator = ranked("|", 4);
        let token = locator.locate("s1", &topology).expect("token");
        let routes = parse_ranked(&token, "|");

        let mut deduped = routes.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), routes.len());
    }

    #[test]
    fn ranked_skips_routeless_members() {
        let topology = Topology::new(
            NodeId::from("n1"),
            vec![
                NodeInfo::new("n1", Some("r1")),
                NodeInfo::new("n2", None),
                NodeInfo::new("n3", Some("r3")),
            ],
        );
        let locator = ranked(".", 3);

        let token = locator.locate("s1", &topology).expect("token");
        assert!(!token.contains("n2"));
        for route in parse_ranked(&token, ".") {
            assert!(["r1", "r3"].contains(&route.as_str()));
        }
    }

    #[test]
    fn ranked_with_no_routes_yields_none() {
        let topology = Topology::new(
            NodeId::from("n1"),
            vec![NodeInfo::new("n1", None), NodeInfo::new("n2", None)],
        );
        let locator = ranked(".", 3);
        assert_eq!(locator.locate("s1", &topology), None);
    }

    #[test]
    fn invalid_ranked_configs_are_rejected() {
        let empty_delimiter =
            AffinityConfig::Ranked { delimiter: String::new(), max_routes: 3 };
        assert!(matches!(
            RouteLocator::from_config(&empty_delimiter, 2),
            Err(RoutingError::InvalidAffinity { .. })
        ));

        let zero_routes = AffinityConfig::Ranked { delimiter: ".".to_owned(), max_routes: 0 };
        assert!(matches!(
            RouteLocator::from_config(&zero_routes, 2),
            Err(RoutingError::InvalidAffinity { .. })
        ));
    }

    #[test]
    fn parse_is_the_inverse_of_format() {
        let topology = topology();
        let locator = ranked(".", 3);
        let token = locator.locate("s42", &topology).expect("token");
        assert_eq!(parse_ranked(&token, ".").join("."), token);
    }
}
