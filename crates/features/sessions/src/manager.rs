//! The distributable session manager.
//!
//! One manager per configured session-management instance. Active sessions
//! live in memory; idle sessions expire, and (when passivation is enabled)
//! park their serialized state in the record store until the next access
//! activates them again.

use crate::error::{SessionsError, SessionsErrorExt};
use crate::record::{Delta, DirtyTracker, SessionRecord, unix_millis};
use fxhash::FxHashMap;
use parking_lot::RwLock;
use serde::Serialize;
use sgrid_domain::config::SessionManagementConfig;
use sgrid_events::{ClusterEvents, SessionEvent, SessionEventKind};
use sgrid_kernel::safe_nanoid;
use sgrid_store::{RecordStore, StoreError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

#[derive(Debug)]
struct ActiveSession {
    record: SessionRecord,
    dirty: DirtyTracker,
    last_access: Instant,
}

/// Lifetime counters for one manager.
#[derive(Debug, Default)]
struct Counters {
    created: AtomicU64,
    expired: AtomicU64,
    passivated: AtomicU64,
    activated: AtomicU64,
    invalidated: AtomicU64,
    max_concurrent: AtomicU64,
}

/// Point-in-time statistics snapshot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub name: String,
    pub active: u64,
    pub created: u64,
    pub expired: u64,
    pub passivated: u64,
    pub activated: u64,
    pub invalidated: u64,
    pub max_concurrent: u64,
}

/// A named session-management instance.
#[derive(Debug)]
pub struct SessionManager {
    name: String,
    config: SessionManagementConfig,
    active: RwLock<FxHashMap<String, ActiveSession>>,
    records: RecordStore,
    events: ClusterEvents,
    counters: Counters,
}

impl SessionManager {
    #[must_use]
    pub fn new(
        name: String,
        config: SessionManagementConfig,
        records: RecordStore,
        events: ClusterEvents,
    ) -> Self {
        Self {
            name,
            config,
            active: RwLock::new(FxHashMap::default()),
            records,
            events,
            counters: Counters::default(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn config(&self) -> &SessionManagementConfig {
        &self.config
    }

    /// Creates a new session and returns its id.
    pub fn create(&self) -> String {
        let id = safe_nanoid!();
        let record = SessionRecord::new(id.clone());
        let session = ActiveSession {
            record,
            dirty: DirtyTracker::new(self.config.granularity),
            last_access: Instant::now(),
        };

        let count = {
            let mut active = self.active.write();
            active.insert(id.clone(), session);
            active.len() as u64
        };
        self.counters.created.fetch_add(1, Ordering::Relaxed);
        self.counters.max_concurrent.fetch_max(count, Ordering::Relaxed);

        trace!(manager = %self.name, session = %id, "Session created");
        self.publish(&id, SessionEventKind::Created);
        id
    }

    /// Touches the session, activating it from the store if passivated.
    ///
    /// # Errors
    /// Returns [`SessionsError::NotFound`] when the session is neither active
    /// nor passivated.
    pub async fn access(&self, id: &str) -> Result<(), SessionsError> {
        self.ensure_active(id).await
    }

    /// Sets an attribute, activating the session if needed.
    ///
    /// # Errors
    /// Returns [`SessionsError::NotFound`] for an unknown session.
    pub async fn set_attribute(
        &self,
        id: &str,
        key: &str,
        value: Vec<u8>,
    ) -> Result<(), SessionsError> {
        self.ensure_active(id).await?;
        self.with_session(id, |session| {
            session.dirty.mark_set(key, &value);
            session.record.attributes.insert(key.to_owned(), value);
        })
    }

    /// Reads an attribute, activating the session if needed.
    ///
    /// # Errors
    /// Returns [`SessionsError::NotFound`] for an unknown session.
    pub async fn get_attribute(
        &self,
        id: &str,
        key: &str,
    ) -> Result<Option<Vec<u8>>, SessionsError> {
        self.ensure_active(id).await?;
        let mut value = None;
        self.with_session(id, |session| {
            value = session.record.attributes.get(key).cloned();
        })?;
        Ok(value)
    }

    /// Removes an attribute, activating the session if needed.
    ///
    /// # Errors
    /// Returns [`SessionsError::NotFound`] for an unknown session.
    pub async fn remove_attribute(
        &self,
        id: &str,
        key: &str,
    ) -> Result<Option<Vec<u8>>, SessionsError> {
        self.ensure_active(id).await?;
        let mut value = None;
        self.with_session(id, |session| {
            value = session.record.attributes.remove(key);
            if value.is_some() {
                session.dirty.mark_removed(key);
            }
        })?;
        Ok(value)
    }

    /// Drains the pending replication delta for a session.
    ///
    /// # Errors
    /// Returns [`SessionsError::NotFound`] when the session is not active.
    pub fn take_delta(&self, id: &str) -> Result<Delta, SessionsError> {
        let mut active = self.active.write();
        let session = active.get_mut(id).ok_or_else(|| SessionsError::NotFound {
            message: id.to_owned().into(),
            context: None,
        })?;
        Ok(session.dirty.take(&session.record))
    }

    /// Invalidates a session wherever it lives (memory or store).
    ///
    /// # Errors
    /// Returns [`SessionsError::NotFound`] when the session does not exist.
    pub async fn invalidate(&self, id: &str) -> Result<(), SessionsError> {
        let removed = self.active.write().remove(id).is_some();

        if !removed {
            match self.records.remove_record(id).await {
                Ok(()) => {},
                Err(StoreError::RecordNotFound { .. }) => {
                    return Err(SessionsError::NotFound {
                        message: id.to_owned().into(),
                        context: None,
                    });
                },
                Err(e) => return Err(e).context("removing passivated session"),
            }
        }

        self.counters.invalidated.fetch_add(1, Ordering::Relaxed);
        debug!(manager = %self.name, session = %id, "Session invalidated");
        self.publish(id, SessionEventKind::Invalidated);
        Ok(())
    }

    /// Passivates one active session into the record store.
    ///
    /// # Errors
    /// Returns [`SessionsError::NotFound`] when the session is not active, or
    /// a store/codec error when persisting fails (the session stays active).
    pub async fn passivate(&self, id: &str) -> Result<(), SessionsError> {
        let record = {
            let active = self.active.read();
            let session = active.get(id).ok_or_else(|| SessionsError::NotFound {
                message: id.to_owned().into(),
                context: None,
            })?;
            session.record.clone()
        };

        let bytes = postcard::to_stdvec(&record).context("encoding passivation record")?;
        self.records.write_record(id, &bytes).await.context("writing passivation record")?;

        self.active.write().remove(id);
        self.counters.passivated.fetch_add(1, Ordering::Relaxed);
        debug!(manager = %self.name, session = %id, "Session passivated");
        self.publish(id, SessionEventKind::Passivated);
        Ok(())
    }

    /// Number of sessions currently held in memory.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.read().len()
    }

    /// Current statistics.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            name: self.name.clone(),
            active: self.active_count() as u64,
            created: self.counters.created.load(Ordering::Relaxed),
            expired: self.counters.expired.load(Ordering::Relaxed),
            passivated: self.counters.passivated.load(Ordering::Relaxed),
            activated: self.counters.activated.load(Ordering::Relaxed),
            invalidated: self.counters.invalidated.load(Ordering::Relaxed),
            max_concurrent: self.counters.max_concurrent.load(Ordering::Relaxed),
        }
    }

    /// One expiration/passivation sweep.
    ///
    /// Precedence follows the classic distributable manager:
    /// 1. A session idle past the idle timeout expires.
    /// 2. With passivation enabled, a session idle past `max_idle` passivates
    ///    unconditionally.
    /// 3. While the active count exceeds `max_active`, the longest-idle
    ///    sessions past `min_idle` passivate until the cap is met.
    ///
    /// Passivated records idle past the idle timeout are expired from the
    /// store as well.
    pub async fn process_expiration(&self) {
        let now = Instant::now();
        let idle_timeout = Duration::from_secs(self.config.idle_timeout_secs);

        let mut expire = Vec::new();
        let mut force = Vec::new();
        let mut pressure: Vec<(Duration, String)> = Vec::new();

        {
            let active = self.active.read();
            for (id, session) in active.iter() {
                let idle = now.saturating_duration_since(session.last_access);

                if idle > idle_timeout {
                    expire.push(id.clone());
                    continue;
                }

                if let Some(passivation) = self.config.passivation {
                    if let Some(max_idle) = passivation.max_idle_secs
                        && idle > Duration::from_secs(max_idle)
                    {
                        force.push(id.clone());
                        continue;
                    }
                    if idle >= Duration::from_secs(passivation.min_idle_secs) {
                        pressure.push((idle, id.clone()));
                    }
                }
            }
        }

        for id in expire {
            if self.active.write().remove(&id).is_some() {
                self.counters.expired.fetch_add(1, Ordering::Relaxed);
                debug!(manager = %self.name, session = %id, "Session expired");
                self.publish(&id, SessionEventKind::Expired);
            }
        }

        for id in force {
            if let Err(e) = self.passivate(&id).await {
                debug!(manager = %self.name, session = %id, error = %e, "Problem passivating session");
            }
        }

        if let Some(max_active) = self.config.max_active {
            // Longest idle first.
            pressure.sort_by(|(a, _), (b, _)| b.cmp(a));
            for (_, id) in pressure {
                if self.active_count() as u64 <= max_active {
                    break;
                }
                if let Err(e) = self.passivate(&id).await {
                    debug!(manager = %self.name, session = %id, error = %e, "Problem passivating session");
                }
            }
        }

        self.expire_passivated(idle_timeout).await;
    }

    /// Expires passivated records whose last access is older than the idle timeout.
    async fn expire_passivated(&self, idle_timeout: Duration) {
        let Ok(ids) = self.records.list_records().await else {
            return;
        };
        let now_ms = unix_millis();
        let timeout_ms = idle_timeout.as_millis() as u64;

        for id in ids {
            let Ok(bytes) = self.records.read_record(&id).await else {
                continue;
            };
            let Ok(record) = postcard::from_bytes::<SessionRecord>(&bytes) else {
                // An undecodable record is useless; drop it.
                let _ = self.records.remove_record(&id).await;
                continue;
            };

            if now_ms.saturating_sub(record.last_access_ms) > timeout_ms
                && self.records.remove_record(&id).await.is_ok()
            {
                self.counters.expired.fetch_add(1, Ordering::Relaxed);
                debug!(manager = %self.name, session = %id, "Passivated session expired");
                self.publish(&id, SessionEventKind::Expired);
            }
        }
    }

    /// Touches an active session; true when it was present.
    fn touch(&self, id: &str) -> bool {
        let mut active = self.active.write();
        match active.get_mut(id) {
            Some(session) => {
                session.last_access = Instant::now();
                session.record.last_access_ms = unix_millis();
                true
            },
            None => false,
        }
    }

    async fn ensure_active(&self, id: &str) -> Result<(), SessionsError> {
        if self.touch(id) {
            return Ok(());
        }

        // Not in memory: try to activate from the store.
        let bytes = match self.records.read_record(id).await {
            Ok(bytes) => bytes,
            Err(StoreError::RecordNotFound { .. }) => {
                // A concurrent activation may have won the race.
                if self.touch(id) {
                    return Ok(());
                }
                return Err(SessionsError::NotFound {
                    message: id.to_owned().into(),
                    context: None,
                });
            },
            Err(e) => return Err(e).context("reading passivation record"),
        };

        let mut record: SessionRecord =
            postcard::from_bytes(&bytes).context("decoding passivation record")?;
        let _ = self.records.remove_record(id).await;

        record.last_access_ms = unix_millis();
        let session = ActiveSession {
            record,
            dirty: DirtyTracker::new(self.config.granularity),
            last_access: Instant::now(),
        };

        let count = {
            let mut active = self.active.write();
            active.entry(id.to_owned()).or_insert(session);
            active.len() as u64
        };
        self.counters.max_concurrent.fetch_max(count, Ordering::Relaxed);
        self.counters.activated.fetch_add(1, Ordering::Relaxed);

        debug!(manager = %self.name, session = %id, "Session activated");
        self.publish(id, SessionEventKind::Activated);
        Ok(())
    }

    fn with_session(
        &self,
        id: &str,
        f: impl FnOnce(&mut ActiveSession),
    ) -> Result<(), SessionsError> {
        let mut active = self.active.write();
        let session = active.get_mut(id).ok_or_else(|| SessionsError::NotFound {
            message: id.to_owned().into(),
            context: None,
        })?;
        f(session);
        Ok(())
    }

    fn publish(&self, id: &str, kind: SessionEventKind) {
        self.events.publish_session(SessionEvent::new(self.name.clone(), id, kind));
    }
}
