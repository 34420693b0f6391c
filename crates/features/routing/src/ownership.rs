//! Deterministic session ownership over a topology snapshot.
//!
//! The primary owner comes from a jump consistent hash over the sorted member
//! list; backup owners are ordered by rendezvous score. Both are pure
//! functions of (topology, key), so every member computes identical ownership
//! for a session without coordination.

use sgrid_domain::node::{NodeId, Topology};

/// Primary/backup ownership of one session key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ownership {
    /// Member responsible for the session.
    pub primary: NodeId,
    /// Failover targets, best first.
    pub backups: Vec<NodeId>,
}

impl Ownership {
    /// Owners in failover order: primary first, then backups.
    pub fn iter(&self) -> impl Iterator<Item = &NodeId> {
        std::iter::once(&self.primary).chain(self.backups.iter())
    }
}

/// Computes ownership of `key` with up to `backups` failover targets.
///
/// The topology always contains at least the local member, so a primary
/// always exists. Fewer backups than requested are returned when the cluster
/// is small.
#[must_use]
pub fn ownership(topology: &Topology, key: &str, backups: usize) -> Ownership {
    let members = topology.members();
    let key_hash = stable_key_hash(key);

    let primary_index = jump_consistent_hash(key_hash, members.len());
    let primary = members[primary_index].id.clone();

    let mut candidates: Vec<(f64, &NodeId)> = members
        .iter()
        .map(|m| &m.id)
        .filter(|id| **id != primary)
        .map(|id| (rendezvous_score(key_hash, id), id))
        .collect();

    candidates.sort_by(|(score_a, _), (score_b, _)| {
        score_b.partial_cmp(score_a).unwrap_or(std::cmp::Ordering::Equal)
    });

    let backups = candidates.into_iter().take(backups).map(|(_, id)| id.clone()).collect();

    Ownership { primary, backups }
}

/// FNV-1a over the session key bytes.
fn stable_key_hash(key: &str) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x1000_0000_01b3;
    key.bytes().fold(FNV_OFFSET, |hash, byte| {
        let hash = hash ^ u64::from(byte);
        hash.wrapping_mul(FNV_PRIME)
    })
}

fn rendezvous_score(key_hash: u64, node: &NodeId) -> f64 {
    let mut hash = key_hash ^ 0x9e37_79b9_7f4a_7c15;
    for byte in node.as_str().as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0xff51_afd7_ed55_8ccd);
    }
    (hash as f64) / (u64::MAX as f64)
}

fn jump_consistent_hash(mut key: u64, buckets: usize) -> usize {
    let mut b: i64 = -1;
    let mut j: i64 = 0;
    let buckets = buckets as i64;
    while j < buckets {
        b = j;
        key = key.wrapping_mul(2_862_933_555_777_941_757).wrapping_add(1);
        let denom = ((key >> 33) + 1) as f64;
        j = (((b as f64) + 1.0) * (1u64 << 31) as f64 / denom) as i64;
    }
    b.max(0) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use sgrid_domain::node::NodeInfo;

    fn cluster(n: u16) -> Topology {
        let members = (1..=n)
            .map(|i| NodeInfo::new(format!("node-{i:02}"), Some(&format!("r{i:02}"))))
            .collect();
        Topology::new(NodeId::from("node-01"), members)
    }

    #[test]
    fn ownership_is_deterministic() {
        let topology = cluster(5);
        let first = ownership(&topology, "session-abc", 2);
        let second = ownership(&topology, "session-abc", 2);
        assert_eq!(first, second);
        assert_eq!(first.backups.len(), 2);
    }

    #[test]
    fn ownership_is_stable_under_member_reordering() {
        let a = Topology::new(
            NodeId::from("n1"),
            vec![NodeInfo::new("n1", None), NodeInfo::new("n2", None), NodeInfo::new("n3", None)],
        );
        let b = Topology::new(
            NodeId::from("n1"),
            vec![NodeInfo::new("n3", None), NodeInfo::new("n1", None), NodeInfo::new("n2", None)],
        );

        for key in ["s1", "s2", "s3", "another-session"] {
            assert_eq!(ownership(&a, key, 2), ownership(&b, key, 2));
        }
    }

    #[test]
    fn backups_exclude_the_primary_and_are_distinct() {
        let topology = cluster(6);
        for key in ["k1", "k2", "k3", "k4", "k5"] {
            let owners = ownership(&topology, key, 3);
            assert!(!owners.backups.contains(&owners.primary));

            let mut seen = owners.backups.clone();
            seen.dedup();
            assert_eq!(seen.len(), owners.backups.len());
        }
    }

    #[test]
    fn small_clusters_cap_the_backup_count() {
        let topology = cluster(2);
        let owners = ownership(&topology, "session", 5);
        assert_eq!(owners.backups.len(), 1);
    }

    #[test]
    fn single_member_owns_everything() {
        let topology = Topology::new(NodeId::from("solo"), Vec::new());
        let owners = ownership(&topology, "any-session", 2);
        assert_eq!(owners.primary, NodeId::from("solo"));
        assert!(owners.backups.is_empty());
    }

    #[test]
    fn keys_spread_across_members() {
        let topology = cluster(4);
        let mut seen = std::collections::BTreeSet::new();
        for i in 0..200 {
            seen.insert(ownership(&topology, &format!("session-{i}"), 0).primary);
        }
        assert_eq!(seen.len(), 4, "every member should own some keys");
    }
}
