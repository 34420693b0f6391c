//! Session records and granularity-aware dirty tracking.

use serde::{Deserialize, Serialize};
use sgrid_domain::config::Granularity;
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// The persistent form of a session: what passivates to the store and what a
/// replication transport would ship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    /// Creation time, unix milliseconds.
    pub created_ms: u64,
    /// Last access time, unix milliseconds. Refreshed on every touch.
    pub last_access_ms: u64,
    /// Opaque serialized attribute values.
    pub attributes: BTreeMap<String, Vec<u8>>,
}

impl SessionRecord {
    #[must_use]
    pub fn new(id: String) -> Self {
        let now = unix_millis();
        Self { id, created_ms: now, last_access_ms: now, attributes: BTreeMap::new() }
    }
}

/// What changed since the last delta was taken, shaped by the configured
/// replication granularity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delta {
    /// Nothing changed.
    Clean,
    /// Session granularity: the whole record is the replication unit.
    Whole(SessionRecord),
    /// Attribute granularity: only the touched attributes ship.
    Attributes {
        id: String,
        changed: BTreeMap<String, Vec<u8>>,
        removed: Vec<String>,
    },
}

/// Tracks modifications against one session according to granularity.
#[derive(Debug)]
pub(crate) struct DirtyTracker {
    granularity: Granularity,
    whole_dirty: bool,
    changed: BTreeMap<String, Vec<u8>>,
    removed: Vec<String>,
}

impl DirtyTracker {
    pub(crate) fn new(granularity: Granularity) -> Self {
        Self { granularity, whole_dirty: false, changed: BTreeMap::new(), removed: Vec::new() }
    }

    pub(crate) fn mark_set(&mut self, key: &str, value: &[u8]) {
        match self.granularity {
            Granularity::Session => self.whole_dirty = true,
            Granularity::Attribute => {
                self.removed.retain(|k| k != key);
                self.changed.insert(key.to_owned(), value.to_vec());
            },
        }
    }

    pub(crate) fn mark_removed(&mut self, key: &str) {
        match self.granularity {
            Granularity::Session => self.whole_dirty = true,
            Granularity::Attribute => {
                self.changed.remove(key);
                self.removed.push(key.to_owned());
            },
        }
    }

    /// Drains the pending changes into a [`Delta`].
    pub(crate) fn take(&mut self, record: &SessionRecord) -> Delta {
        match self.granularity {
            Granularity::Session => {
                if std::mem::take(&mut self.whole_dirty) {
                    Delta::Whole(record.clone())
                } else {
                    Delta::Clean
                }
            },
            Granularity::Attribute => {
                if self.changed.is_empty() && self.removed.is_empty() {
                    return Delta::Clean;
                }
                Delta::Attributes {
                    id: record.id.clone(),
                    changed: std::mem::take(&mut self.changed),
                    removed: std::mem::take(&mut self.removed),
                }
            },
        }
    }
}

pub(crate) fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_granularity_marks_the_whole_record() {
        let record = SessionRecord::new("s1".to_owned());
        let mut tracker = DirtyTracker::new(Granularity::Session);

        assert_eq!(tracker.take(&record), Delta::Clean);

        tracker.mark_set("user", b"alice");
        assert!(matches!(tracker.take(&record), Delta::Whole(_)));
        assert_eq!(tracker.take(&record), Delta::Clean);
    }

    #[test]
    fn attribute_granularity_tracks_individual_keys() {
        let record = SessionRecord::new("s1".to_owned());
        let mut tracker = DirtyTracker::new(Granularity::Attribute);

        tracker.mark_set("user", b"alice");
        tracker.mark_set("cart", b"3 items");
        tracker.mark_removed("stale");

        match tracker.take(&record) {
            Delta::Attributes { id, changed, removed } => {
                assert_eq!(id, "s1");
                assert_eq!(changed.len(), 2);
                assert_eq!(removed, vec!["stale".to_owned()]);
            },
            other => panic!("unexpected delta: {other:?}"),
        }

        assert_eq!(tracker.take(&record), Delta::Clean);
    }

    #[test]
    fn remove_supersedes_a_pending_set() {
        let record = SessionRecord::new("s1".to_owned());
        let mut tracker = DirtyTracker::new(Granularity::Attribute);

        tracker.mark_set("user", b"alice");
        tracker.mark_removed("user");

        match tracker.take(&record) {
            Delta::Attributes { changed, removed, .. } => {
                assert!(changed.is_empty());
                assert_eq!(removed, vec!["user".to_owned()]);
            },
            other => panic!("unexpected delta: {other:?}"),
        }
    }

    #[test]
    fn records_roundtrip_through_postcard() {
        let mut record = SessionRecord::new("s1".to_owned());
        record.attributes.insert("user".to_owned(), b"alice".to_vec());

        let bytes = postcard::to_stdvec(&record).unwrap();
        let back: SessionRecord = postcard::from_bytes(&bytes).unwrap();
        assert_eq!(back, record);
    }
}
