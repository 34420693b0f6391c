//! The single sign-on registry.
//!
//! An SSO entry groups the sessions a principal holds across
//! session-management instances, plus the credentials peers need to
//! re-authenticate the principal locally. An entry that loses its last
//! session is not removed immediately: cross-node association races are
//! normal, so it survives for `max_empty_life` before the periodic sweep
//! reclaims it.

use crate::error::SsoError;
use fxhash::FxHashMap;
use parking_lot::RwLock;
use sgrid_domain::config::SsoConfig;
use sgrid_events::{ClusterEvents, SsoEvent, SsoEventKind};
use sgrid_kernel::safe_nanoid;
use std::collections::BTreeSet;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, trace};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Credentials cached for cross-node re-authentication.
///
/// Wiped from memory on drop; `Debug` never prints the password.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self { username: username.into(), password: password.into() }
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// A session reference: (session-management instance, session id).
pub type SessionRef = (String, String);

#[derive(Debug)]
struct SsoEntry {
    sessions: BTreeSet<SessionRef>,
    credentials: Option<Credentials>,
    /// Set while the entry has no sessions; cleared on re-association.
    empty_since: Option<Instant>,
}

/// The single sign-on registry.
#[derive(Debug)]
pub struct SsoManager {
    config: SsoConfig,
    entries: RwLock<FxHashMap<String, SsoEntry>>,
    events: ClusterEvents,
}

impl SsoManager {
    #[must_use]
    pub fn new(config: SsoConfig, events: ClusterEvents) -> Self {
        Self { config, entries: RwLock::new(FxHashMap::default()), events }
    }

    #[must_use]
    pub const fn config(&self) -> &SsoConfig {
        &self.config
    }

    /// Registers a new SSO entry and returns its id.
    ///
    /// The entry starts without sessions, inside its empty grace period, so a
    /// registration that is never associated does not live forever.
    pub fn register(&self, credentials: Option<Credentials>) -> String {
        let id = safe_nanoid!();
        let entry = SsoEntry {
            sessions: BTreeSet::new(),
            credentials,
            empty_since: Some(Instant::now()),
        };
        self.entries.write().insert(id.clone(), entry);

        debug!(sso = %id, "SSO entry registered");
        self.events.publish_sso(SsoEvent::new(id.clone(), SsoEventKind::Registered));
        id
    }

    /// Associates a session with an entry.
    ///
    /// # Errors
    /// Returns [`SsoError::NotFound`] for an unknown entry.
    pub fn associate(
        &self,
        sso: &str,
        manager: impl Into<String>,
        session: impl Into<String>,
    ) -> Result<(), SsoError> {
        let was_empty = {
            let mut entries = self.entries.write();
            let entry = entries.get_mut(sso).ok_or_else(|| not_found(sso))?;
            let was_empty = entry.sessions.is_empty();
            entry.sessions.insert((manager.into(), session.into()));
            entry.empty_since = None;
            was_empty
        };

        trace!(sso = %sso, "Session associated");
        if was_empty {
            self.events.publish_sso(SsoEvent::new(sso, SsoEventKind::NotEmpty));
        }
        Ok(())
    }

    /// Disassociates a session from an entry.
    ///
    /// # Errors
    /// Returns [`SsoError::NotFound`] for an unknown entry.
    pub fn disassociate(
        &self,
        sso: &str,
        manager: &str,
        session: &str,
    ) -> Result<(), SsoError> {
        let now_empty = {
            let mut entries = self.entries.write();
            let entry = entries.get_mut(sso).ok_or_else(|| not_found(sso))?;
            entry.sessions.remove(&(manager.to_owned(), session.to_owned()));
            let now_empty = entry.sessions.is_empty();
            if now_empty && entry.empty_since.is_none() {
                entry.empty_since = Some(Instant::now());
            }
            now_empty
        };

        trace!(sso = %sso, "Session disassociated");
        if now_empty {
            self.events.publish_sso(SsoEvent::new(sso, SsoEventKind::Empty));
        }
        Ok(())
    }

    /// Removes an entry, cascading a logout to all of its sessions.
    ///
    /// Returns the sessions that were associated so the caller can invalidate
    /// them in their session managers; the same list is broadcast as a
    /// [`SsoEventKind::SessionsInvalidated`] event.
    ///
    /// # Errors
    /// Returns [`SsoError::NotFound`] for an unknown entry.
    pub fn deregister(&self, sso: &str) -> Result<Vec<SessionRef>, SsoError> {
        let entry = self.entries.write().remove(sso).ok_or_else(|| not_found(sso))?;
        let sessions: Vec<SessionRef> = entry.sessions.into_iter().collect();

        debug!(sso = %sso, sessions = sessions.len(), "SSO entry deregistered");
        self.events.publish_sso(SsoEvent::new(sso, SsoEventKind::Deregistered));
        if !sessions.is_empty() {
            self.events.publish_sso(SsoEvent::new(
                sso,
                SsoEventKind::SessionsInvalidated {
                    sessions: sessions.iter().map(|(_, s)| s.clone()).collect(),
                },
            ));
        }
        Ok(sessions)
    }

    /// Replaces the cached credentials, notifying peers.
    ///
    /// # Errors
    /// Returns [`SsoError::NotFound`] for an unknown entry.
    pub fn update_credentials(
        &self,
        sso: &str,
        credentials: Credentials,
    ) -> Result<(), SsoError> {
        {
            let mut entries = self.entries.write();
            let entry = entries.get_mut(sso).ok_or_else(|| not_found(sso))?;
            entry.credentials = Some(credentials);
        }

        debug!(sso = %sso, "SSO credentials updated");
        self.events.publish_sso(SsoEvent::new(sso, SsoEventKind::Updated));
        Ok(())
    }

    /// Cached credentials for an entry.
    ///
    /// # Errors
    /// Returns [`SsoError::NotFound`] for an unknown entry.
    pub fn credentials(&self, sso: &str) -> Result<Option<Credentials>, SsoError> {
        let entries = self.entries.read();
        let entry = entries.get(sso).ok_or_else(|| not_found(sso))?;
        Ok(entry.credentials.clone())
    }

    /// Sessions currently associated with an entry.
    ///
    /// # Errors
    /// Returns [`SsoError::NotFound`] for an unknown entry.
    pub fn sessions_of(&self, sso: &str) -> Result<Vec<SessionRef>, SsoError> {
        let entries = self.entries.read();
        let entry = entries.get(sso).ok_or_else(|| not_found(sso))?;
        Ok(entry.sessions.iter().cloned().collect())
    }

    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.entries.read().len()
    }

    /// One expiration sweep: entries empty longer than `max_empty_life` are
    /// deregistered.
    pub fn process_expires(&self) {
        let max_empty = Duration::from_secs(self.config.max_empty_life_secs);
        let now = Instant::now();

        let expired: Vec<String> = {
            let entries = self.entries.read();
            entries
                .iter()
                .filter(|(_, entry)| {
                    entry
                        .empty_since
                        .is_some_and(|since| now.saturating_duration_since(since) > max_empty)
                })
                .map(|(id, _)| id.clone())
                .collect()
        };

        for id in expired {
            // Re-check under the write lock: the entry may have been
            // re-associated since the scan.
            let removed = {
                let mut entries = self.entries.write();
                match entries.get(&id) {
                    Some(entry) if entry.empty_since.is_some() => entries.remove(&id).is_some(),
                    _ => false,
                }
            };
            if removed {
                debug!(sso = %id, "Empty SSO entry expired");
                self.events.publish_sso(SsoEvent::new(id, SsoEventKind::Deregistered));
            }
        }
    }
}

fn not_found(sso: &str) -> SsoError {
    SsoError::NotFound { message: sso.to_owned().into(), context: None }
}
