//! Per-type memo of derived layers.
//!
//! A layer is built the first time any instance of its type bootstraps, then
//! reused by every later instance. Concurrent first bootstraps of one type
//! race on the map entry; exactly one of them builds.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use jolt_core::Callable;

use crate::error::BootstrapError;
use crate::instance::Instance;
use crate::layer::DerivedLayer;
use crate::types::{TypeDef, TypeKey, TypeRef};

#[derive(Debug, Default)]
pub struct LayerRegistry {
    layers: DashMap<TypeKey, Arc<DerivedLayer>>,
    /// Successful builds, for observing memoization.
    builds: AtomicU64,
}

impl LayerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry used by [`Instance::construct`] and [`Instance::bootstrap`].
    pub fn global() -> &'static Self {
        static GLOBAL: OnceLock<LayerRegistry> = OnceLock::new();
        GLOBAL.get_or_init(Self::new)
    }

    /// Returns the memoized layer for `ty`, building it on first request.
    ///
    /// A failed build is not memoized; the next request classifies again and
    /// reports the same error.
    ///
    /// # Errors
    ///
    /// Returns the classification error from [`DerivedLayer::build`].
    pub fn layer_for(&self, ty: &TypeRef) -> Result<Arc<DerivedLayer>, BootstrapError> {
        if let Some(layer) = self.layers.get(&ty.key()) {
            return Ok(Arc::clone(layer.value()));
        }
        let entry = self.layers.entry(ty.key()).or_try_insert_with(|| {
            let layer = DerivedLayer::build(ty)?;
            self.builds.fetch_add(1, Ordering::Relaxed);
            Ok::<_, BootstrapError>(Arc::new(layer))
        })?;
        Ok(Arc::clone(entry.value()))
    }

    /// Migrates `instance` to its type's layer.
    ///
    /// Returns the layer's reinitializer. An instance that already resolves
    /// through a layer is left untouched.
    ///
    /// # Errors
    ///
    /// Returns the classification error for the instance's type.
    pub fn bootstrap(&self, instance: &Instance) -> Result<Callable, BootstrapError> {
        if let Some(layer) = instance.layer() {
            return Ok(layer.reinitializer());
        }
        let layer = self.layer_for(instance.type_ref()).inspect_err(|err| {
            tracing::warn!(
                type_name = instance.type_ref().name(),
                error = %err,
                "bootstrap failed"
            );
        })?;
        instance.repoint(&layer);
        Ok(layer.reinitializer())
    }

    #[must_use]
    pub fn is_built(&self, ty: &TypeDef) -> bool {
        self.layers.contains_key(&ty.key())
    }

    #[must_use]
    pub fn builds(&self) -> u64 {
        self.builds.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}
