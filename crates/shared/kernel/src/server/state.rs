use axum::extract::FromRef;
use fxhash::FxHashMap;
use sgrid_domain::config::GridConfig;
use sgrid_domain::registry::{InitializedSlice, ProviderSlice};
use sgrid_events::ClusterEvents;
use sgrid_store::Store;
use std::any::TypeId;
use std::borrow::Cow;
use std::ops::Deref;
use std::sync::Arc;

#[sgrid_derive::sgrid_error]
pub enum GridStateError {
    #[error("State validation error{}: {message}", format_context(.context))]
    Validation { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
    #[error("State missing provider slice{}: {message}", format_context(.context))]
    MissingSlice { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

#[derive(Debug)]
pub struct GridStateInner {
    pub config: GridConfig,
    pub events: ClusterEvents,
    pub store: Store,
    slices: FxHashMap<TypeId, InitializedSlice>,
}

/// Shared application state handed to every API handler.
#[derive(Debug, Clone)]
pub struct GridState {
    inner: Arc<GridStateInner>,
}

impl GridState {
    #[must_use]
    pub fn builder() -> GridStateBuilder {
        GridStateBuilder::default()
    }

    #[must_use]
    pub fn get_slice<T: ProviderSlice>(&self) -> Option<&T> {
        self.inner
            .slices
            .get(&TypeId::of::<T>())
            .and_then(|initialized| initialized.state.as_any().downcast_ref::<T>())
    }

    /// Returns a reference to the slice if it is registered.
    ///
    /// # Errors
    /// Returns an error if the slice is not registered.
    pub fn try_get_slice<T: ProviderSlice>(&self) -> Result<&T, GridStateError> {
        self.get_slice::<T>().ok_or_else(|| GridStateError::MissingSlice {
            message: std::any::type_name::<T>().into(),
            context: None,
        })
    }

    /// Iterates over registered slice type IDs (for diagnostics).
    pub fn slice_ids(&self) -> impl Iterator<Item = &TypeId> {
        self.inner.slices.keys()
    }
}

impl Deref for GridState {
    type Target = GridStateInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl FromRef<GridState> for GridConfig {
    fn from_ref(state: &GridState) -> Self {
        state.inner.config.clone()
    }
}

impl FromRef<GridState> for ClusterEvents {
    fn from_ref(state: &GridState) -> Self {
        state.inner.events.clone()
    }
}

impl FromRef<GridState> for Store {
    fn from_ref(state: &GridState) -> Self {
        state.inner.store.clone()
    }
}

#[derive(Debug, Default)]
pub struct GridStateBuilder {
    config: Option<GridConfig>,
    events: Option<ClusterEvents>,
    store: Option<Store>,
    slices: FxHashMap<TypeId, InitializedSlice>,
}

impl GridStateBuilder {
    #[must_use]
    pub fn config(mut self, config: GridConfig) -> Self {
        self.config = Some(config);
        self
    }

    #[must_use]
    pub fn events(mut self, events: ClusterEvents) -> Self {
        self.events = Some(events);
        self
    }

    #[must_use]
    pub fn store(mut self, store: Store) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn register_slice(mut self, slice: InitializedSlice) -> Self {
        self.slices.insert(slice.id, slice);
        self
    }

    /// Registers multiple slices at once.
    #[must_use]
    pub fn register_slices<I>(mut self, slices: I) -> Self
    where
        I: IntoIterator<Item = InitializedSlice>,
    {
        for slice in slices {
            self.slices.insert(slice.id, slice);
        }
        self
    }

    /// Finalizes the state.
    ///
    /// # Errors
    /// Returns [`GridStateError::Validation`] when a required component was not provided.
    pub fn build(self) -> Result<GridState, GridStateError> {
        let config = self.config.ok_or_else(|| GridStateError::Validation {
            message: "GridConfig not provided".into(),
            context: None,
        })?;
        let events = self.events.ok_or_else(|| GridStateError::Validation {
            message: "ClusterEvents not provided".into(),
            context: None,
        })?;
        let store = self.store.ok_or_else(|| GridStateError::Validation {
            message: "Store not provided".into(),
            context: None,
        })?;

        Ok(GridState {
            inner: Arc::new(GridStateInner { config, events, store, slices: self.slices }),
        })
    }
}
