//! A sandboxed store for passivated session records.
//!
//! Session managers evict idle sessions from memory and park their serialized
//! state here until the next request activates them again. The store is a thin,
//! hardened layer over the filesystem:
//!
//! - **Keyed records**: Data is addressed by validated record ids, not paths.
//!   Ids are restricted to a safe alphabet, so path traversal is impossible by
//!   construction.
//! - **Atomic Writes**: Uses an "atomic swap" pattern (unique temp write +
//!   `fsync` + `rename`) so a crash mid-passivation never corrupts a record.
//! - **Transparent Compression**: Optional LZ4 block compression, invisible to
//!   the consumer.
//! - **Namespacing & Sharding**: One namespace per session-management instance,
//!   with automatic directory sharding to keep large session counts fast.
//! - **Self-Healing**: Orphaned temporary files are cleaned up during
//!   initialization, and stale records can be purged by age.
//!
//! # Example
//!
//! ```rust
//! use sgrid_store::{Store, Compression, StoreError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), StoreError> {
//!     # let tmp = tempfile::tempdir().unwrap();
//!     # let root = tmp.path().join("data");
//!     let store = Store::builder()
//!         .root(&root)
//!         .compression(Compression::Lz4)
//!         .connect()
//!         .await?;
//!
//!     let web = store.namespace("web")?;
//!     web.write_record("aBcDeFgH1234", b"serialized session").await?;
//!     let bytes = web.read_record("aBcDeFgH1234").await?;
//!     assert_eq!(bytes, b"serialized session");
//!
//!     Ok(())
//! }
//! ```

mod builder;
mod engine;
mod error;
mod maintenance;
mod namespace;

pub use builder::StoreBuilder;
pub use engine::{Compression, Store};
pub use error::{StoreError, StoreErrorExt};
pub use namespace::RecordStore;
