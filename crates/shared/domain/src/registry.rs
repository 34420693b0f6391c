//! Slice registry for modular providers.
//! This provides a minimal type-erased container for the pre-initialized provider state.

use std::any::{Any, TypeId};
use std::fmt::Debug;

/// Marker trait for provider state that can be shared across threads.
pub trait ProviderSlice: Any + Debug + Send + Sync {
    /// Helper to allow downcasting from the trait object.
    fn as_any(&self) -> &dyn Any;
}

/// A container for an initialized provider.
#[derive(Debug)]
pub struct InitializedSlice {
    pub id: TypeId,
    pub state: Box<dyn ProviderSlice>,
}

impl InitializedSlice {
    /// Create a new initialized slice from a concrete state.
    pub fn new<T: ProviderSlice>(state: T) -> Self {
        Self { id: TypeId::of::<T>(), state: Box::new(state) }
    }
}
