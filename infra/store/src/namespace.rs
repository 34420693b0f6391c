use crate::engine::{RECORD_EXT, Store, TMP_MARKER};
use crate::error::StoreError;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use walkdir::WalkDir;

/// Validates a namespace name (one per session-management instance).
///
/// Names are lowercased; only ASCII alphanumerics and `_` are allowed.
pub(crate) fn validate_namespace(value: &str) -> Result<String, StoreError> {
    let name = value.to_lowercase();

    if name.is_empty() {
        return Err(StoreError::InvalidName {
            message: "EMPTY".into(),
            context: Some("Namespace cannot be empty".into()),
        });
    }

    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(StoreError::InvalidName {
            message: name.into(),
            context: Some("Namespace contains illegal characters".into()),
        });
    }

    Ok(name)
}

/// Validates a record id (a session or SSO identifier).
///
/// Ids come from the safe-alphabet generator, so anything else is rejected:
/// ASCII alphanumerics, `-` and `_` only. This is what makes path traversal
/// impossible by construction.
fn validate_record_id(id: &str) -> Result<(), StoreError> {
    if id.is_empty() {
        return Err(StoreError::InvalidName {
            message: "EMPTY".into(),
            context: Some("Record id cannot be empty".into()),
        });
    }

    if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(StoreError::InvalidName {
            message: id.to_owned().into(),
            context: Some("Record id contains illegal characters".into()),
        });
    }

    Ok(())
}

/// A lightweight, namespaced view of the passivation store.
///
/// All records of one session-management instance live under one namespace
/// directory, sharded by record id. Cloning is inexpensive as the view only
/// holds a reference-counted handle to the core engine.
#[derive(Debug, Clone)]
pub struct RecordStore {
    store: Store,
    namespace: Arc<str>,
}

impl RecordStore {
    pub(crate) fn new(store: Store, namespace: String) -> Self {
        Self { store, namespace: namespace.into() }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.namespace
    }

    fn resolve(&self, id: &str) -> Result<PathBuf, StoreError> {
        validate_record_id(id)?;
        Ok(self.store.record_path(&self.namespace, id))
    }

    /// Reads a record, decompressing transparently.
    ///
    /// # Errors
    /// Returns [`StoreError::RecordNotFound`] if no record exists for `id`.
    /// Returns [`StoreError::Decompress`] if the stored data is corrupted.
    pub async fn read_record(&self, id: &str) -> Result<Vec<u8>, StoreError> {
        let resolved = self.resolve(id)?;
        self.store.read_bytes(&resolved).await
    }

    /// Writes a record atomically, replacing any previous version.
    ///
    /// # Errors
    /// Returns [`StoreError::InvalidName`] for an illegal id.
    /// Returns [`StoreError::Io`] on disk failure.
    pub async fn write_record(&self, id: &str, data: &[u8]) -> Result<(), StoreError> {
        let resolved = self.resolve(id)?;
        self.store.write_bytes(&resolved, data).await
    }

    /// Removes a record.
    ///
    /// # Errors
    /// Returns [`StoreError::RecordNotFound`] if no record exists for `id`.
    pub async fn remove_record(&self, id: &str) -> Result<(), StoreError> {
        let resolved = self.resolve(id)?;
        self.store.remove(&resolved).await
    }

    /// Whether a record exists for `id`.
    ///
    /// # Errors
    /// Returns [`StoreError::InvalidName`] for an illegal id.
    pub fn contains(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.resolve(id)?.exists())
    }

    /// Lists all record ids in this namespace.
    ///
    /// Used for restart recovery and expiration sweeps over passivated
    /// sessions. The walk runs on a blocking thread.
    ///
    /// # Errors
    /// Returns [`StoreError::Io`] if the blocking walk cannot be scheduled.
    pub async fn list_records(&self) -> Result<Vec<String>, StoreError> {
        let dir = self.store.namespace_dir(&self.namespace);

        tokio::task::spawn_blocking(move || {
            if !dir.exists() {
                return Vec::new();
            }
            WalkDir::new(&dir)
                .into_iter()
                .flatten()
                .filter(|entry| entry.file_type().is_file())
                .filter_map(|entry| {
                    let name = entry.file_name().to_str()?;
                    if name.contains(TMP_MARKER) {
                        return None;
                    }
                    name.strip_suffix(&format!(".{RECORD_EXT}")).map(str::to_owned)
                })
                .collect()
        })
        .await
        .map_err(|e| StoreError::Io {
            source: std::io::Error::other(e),
            context: Some("Record listing task panicked".into()),
        })
    }

    /// Removes every record in this namespace. Returns how many were removed.
    pub async fn clear(&self) -> usize {
        let mut removed = 0;
        if let Ok(ids) = self.list_records().await {
            for id in ids {
                if self.remove_record(&id).await.is_ok() {
                    removed += 1;
                }
            }
        }
        let _ = fs::remove_dir(self.store.namespace_dir(&self.namespace)).await;
        removed
    }
}
