//! # Sockets
//!
//! Network interface selection and socket binding resolution.
//!
//! A deployment declares *interfaces* as criteria sets ("a site-local,
//! non-virtual address", "whatever NIC matches `^eth\d+$`") and *socket
//! bindings* as named ports over those interfaces. At boot this slice
//! enumerates the host's interfaces, resolves every declared interface to a
//! concrete address, and resolves every binding to a socket address,
//! failing the whole configuration synchronously if anything dangles.
//!
//! The criteria matcher itself is a pure predicate over interface snapshots;
//! see [`criteria`].

pub mod bindings;
pub mod criteria;
mod error;
pub mod interfaces;

pub use crate::bindings::{ResolvedBinding, resolve_bindings};
pub use crate::criteria::{CriteriaSet, Criterion};
pub use crate::error::{SocketsError, SocketsErrorExt};
pub use crate::interfaces::{NetInterface, ResolvedInterface, enumerate, resolve_interfaces, select_address};

use sgrid_domain::config::GridConfig;
use sgrid_kernel::domain::registry::InitializedSlice;

/// Sockets slice state: the fully resolved interface and binding tables.
#[sgrid_derive::sgrid_slice]
pub struct Sockets {
    pub interfaces: Vec<ResolvedInterface>,
    pub bindings: Vec<ResolvedBinding>,
}

impl SocketsInner {
    /// Looks up a resolved binding by name.
    #[must_use]
    pub fn binding(&self, name: &str) -> Option<&ResolvedBinding> {
        self.bindings.iter().find(|b| b.name == name)
    }

    /// Looks up a resolved interface by declared name.
    #[must_use]
    pub fn interface(&self, name: &str) -> Option<&ResolvedInterface> {
        self.interfaces.iter().find(|i| i.name == name)
    }
}

/// Initialize the sockets slice from live OS enumeration.
///
/// # Errors
/// Returns [`SocketsError`] when criteria do not compile, a declared
/// interface matches nothing, or a binding is malformed.
pub fn init(config: &GridConfig) -> Result<InitializedSlice, SocketsError> {
    let snapshot = enumerate()?;
    init_with_snapshot(config, &snapshot)
}

/// Initialize the sockets slice against a supplied interface snapshot.
///
/// # Errors
/// Same failure modes as [`init`]; used by tests and embedders that manage
/// their own enumeration.
pub fn init_with_snapshot(
    config: &GridConfig,
    snapshot: &[NetInterface],
) -> Result<InitializedSlice, SocketsError> {
    let interfaces = resolve_interfaces(&config.interfaces, snapshot)?;
    let bindings = resolve_bindings(&config.socket_bindings, &interfaces)?;

    tracing::info!(
        interfaces = interfaces.len(),
        bindings = bindings.len(),
        "Sockets slice initialized"
    );

    let slice = Sockets::new(SocketsInner { interfaces, bindings });
    Ok(InitializedSlice::new(slice))
}
