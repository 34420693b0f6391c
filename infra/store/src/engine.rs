//! Core store engine providing sandboxed, atomic, and compressed record I/O.
//!
//! This module contains the primary [`Store`] handle, which owns the physical
//! filesystem root and provides namespaced access for individual
//! session-management instances.

use crate::builder::StoreBuilder;
use crate::error::{StoreError, StoreErrorExt};
use crate::maintenance;
use crate::namespace::{self, RecordStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Marker embedded in temporary file names so maintenance can spot leftovers.
pub(crate) const TMP_MARKER: &str = ".sgridtmp.";
/// Extension of persisted record files.
pub(crate) const RECORD_EXT: &str = "rec";

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum Compression {
    #[default]
    None,
    Lz4,
}

impl Compression {
    #[must_use]
    pub(crate) fn compress(self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::None => data.to_vec(),
            Self::Lz4 => lz4_flex::compress_prepend_size(data),
        }
    }

    pub(crate) fn decompress(self, data: &[u8]) -> Result<Vec<u8>, StoreError> {
        match self {
            Self::None => Ok(data.to_vec()),
            Self::Lz4 => {
                lz4_flex::decompress_size_prepended(data).context("Lz4 decompression failed")
            },
        }
    }
}

/// The internal shared state of a [`Store`] instance.
#[derive(Debug)]
pub(crate) struct StoreInner {
    /// The canonicalized physical path on the disk where all records live.
    pub(crate) root: PathBuf,
    /// Whether transparent LZ4 compression is enabled for this instance.
    pub(crate) compression: Compression,
    /// A unique counter used to generate temporary file names.
    pub(crate) tmp_counter: AtomicU64,
}

/// A thread-safe handle to the passivation store.
///
/// This handle is internally reference-counted (`Arc`) and can be cheaply
/// cloned across threads or tasks. All record access goes through a
/// [`RecordStore`] namespace obtained from [`Store::namespace`].
#[derive(Debug, Clone)]
pub struct Store {
    pub(crate) inner: Arc<StoreInner>,
}

impl Store {
    #[must_use = "The store is not initialized until you call .connect()"]
    pub fn builder() -> StoreBuilder {
        StoreBuilder::new()
    }

    /// Returns the namespaced record view for one session-management instance.
    ///
    /// # Constraints
    /// - Names must be **alphanumeric** (a-z, 0-9) or use **underscores** (`_`).
    /// - Names are automatically converted to **lowercase**.
    /// - Empty names are prohibited.
    ///
    /// # Errors
    /// Returns [`StoreError::InvalidName`] if the name is empty or contains
    /// illegal characters.
    pub fn namespace(&self, name: impl AsRef<str>) -> Result<RecordStore, StoreError> {
        let ns = namespace::validate_namespace(name.as_ref())?;
        Ok(RecordStore::new(self.clone(), ns))
    }

    /// Physical directory of a namespace. The namespace name must already be validated.
    pub(crate) fn namespace_dir(&self, ns: &str) -> PathBuf {
        self.inner.root.join(ns)
    }

    /// Physical path of a record within a namespace, with sharding applied.
    ///
    /// Records are sharded by the first characters of the id
    /// (`<root>/<ns>/<s1>/<s2>/<id>.rec`) to keep directories small under
    /// large session counts.
    pub(crate) fn record_path(&self, ns: &str, id: &str) -> PathBuf {
        let mut path = self.namespace_dir(ns);
        let chars: Vec<char> = id.chars().collect();
        if chars.len() >= 4 {
            path.push(chars[0..2].iter().collect::<String>());
            path.push(chars[2..4].iter().collect::<String>());
        }
        path.push(format!("{id}.{RECORD_EXT}"));
        path
    }

    pub(crate) async fn read_bytes(&self, resolved: &Path) -> Result<Vec<u8>, StoreError> {
        let data = match fs::read(resolved).await {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::RecordNotFound {
                    message: resolved.display().to_string().into(),
                    context: None,
                });
            },
            Err(err) => {
                return Err(StoreError::Io {
                    source: err,
                    context: Some(format!("Read failed: {}", resolved.display()).into()),
                });
            },
        };

        self.inner.compression.decompress(&data)
    }

    /// Writes record bytes atomically.
    ///
    /// 1. Data is written to a unique temporary file (`*.sgridtmp.<id>`).
    /// 2. The file is synced to hardware (`fsync`).
    /// 3. The temporary file is renamed to the final destination.
    ///
    /// On platforms that do not support atomic replace for existing targets,
    /// the implementation falls back to remove-then-rename.
    pub(crate) async fn write_bytes(&self, resolved: &Path, data: &[u8]) -> Result<(), StoreError> {
        if let Some(parent) = resolved.parent() {
            fs::create_dir_all(parent)
                .await
                .context(format!("Failed to create shards for {}", resolved.display()))?;
        }

        let temp = unique_tmp_path(resolved, &self.inner.tmp_counter);
        let final_data = self.inner.compression.compress(data);

        {
            let mut file = fs::OpenOptions::new()
                .create_new(true)
                .write(true)
                .open(&temp)
                .await
                .context(format!("Temp creation failed: {}", temp.display()))?;
            file.write_all(&final_data).await.context("Write failed")?;
            file.sync_all().await.context("Hardware sync failed")?;
        }

        if let Err(err) = fs::rename(&temp, resolved).await {
            if err.kind() == std::io::ErrorKind::AlreadyExists {
                fs::remove_file(resolved)
                    .await
                    .context(format!("Failed to replace existing record: {}", resolved.display()))?;
                fs::rename(&temp, resolved).await.context(format!(
                    "Atomic swap failed: {} -> {}",
                    temp.display(),
                    resolved.display()
                ))?;
            } else {
                return Err(StoreError::Io {
                    source: err,
                    context: Some(
                        format!("Atomic swap failed: {} -> {}", temp.display(), resolved.display())
                            .into(),
                    ),
                });
            }
        }

        debug!(path = %resolved.display(), "Record saved atomically");
        Ok(())
    }

    pub(crate) async fn remove(&self, resolved: &Path) -> Result<(), StoreError> {
        match fs::remove_file(resolved).await {
            Ok(()) => {},
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::RecordNotFound {
                    message: resolved.display().to_string().into(),
                    context: None,
                });
            },
            Err(err) => {
                return Err(StoreError::Io {
                    source: err,
                    context: Some(format!("Failed to delete: {}", resolved.display()).into()),
                });
            },
        }
        debug!(path = %resolved.display(), "Record deleted");
        Ok(())
    }

    /// Removes stale temporary files left behind by crashed writers.
    pub async fn purge_tmp(&self) {
        maintenance::purge_tmp(&self.inner.root).await;
    }

    /// Removes records older than `max_age` across all namespaces.
    ///
    /// Used at boot to drop passivated sessions that would have expired while
    /// the process was down. Returns the number of records removed.
    pub async fn purge_stale_records(&self, max_age: Duration) -> usize {
        maintenance::purge_stale_records(&self.inner.root, max_age).await
    }
}

fn unique_tmp_path(target: &Path, counter: &AtomicU64) -> PathBuf {
    let counter = counter.fetch_add(1, Ordering::Relaxed);
    let file_name = target.file_name().and_then(|s| s.to_str()).unwrap_or("record");
    let tmp_name = format!("{file_name}{TMP_MARKER}{counter}");
    target.with_file_name(tmp_name)
}
