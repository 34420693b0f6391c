//! Kernel utilities shared across slices.
//! Keep this crate lightweight; it re-exports ergonomic helpers for IDs, config loading,
//! and the shared server state.
//!
//! ## ID generation
//! Use `safe_nanoid!` for URL-safe, unambiguous session and SSO ids:
//! ```rust
//! # use sgrid_kernel::safe_nanoid;
//! let id = safe_nanoid!();
//! assert_eq!(id.len(), 16);
//! ```
//!
//! ## Config loading
//! ```rust,ignore
//! use sgrid_kernel::config::load_config;
//! let cfg: sgrid_domain::config::GridConfig = load_config(Some("server")).unwrap();
//! ```
pub mod config;
pub mod prelude;
#[cfg(feature = "server")]
pub mod server;

// Alphabet excludes visually ambiguous characters (I, O, l, 0, 1).
pub const SAFE_ALPHABET: &[char; 55] = &[
    '2', '3', '4', '5', '6', '7', '8', '9', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K', 'L',
    'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', 'a', 'b', 'c', 'd', 'e', 'f',
    'g', 'h', 'j', 'k', 'm', 'n', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

pub use sgrid_domain as domain;
pub use nanoid::nanoid;

/// Generates an unambiguous `NanoID` (no visually confusing characters).
///
/// Sixteen characters of a 55-symbol alphabet gives session ids enough entropy
/// to make guessing attacks impractical.
#[macro_export]
macro_rules! safe_nanoid {
    () => {
        $crate::nanoid!(16, $crate::SAFE_ALPHABET)
    };
    ($size:expr) => {
        $crate::nanoid!($size, $crate::SAFE_ALPHABET)
    };
}
