//! Catalog staging: one catalog per eligible pack, strictly in manifest order.

use std::path::Path;
use std::sync::Arc;

use crate::config::Environment;
use crate::engine::{CatalogHandle, ResourceEngine};
use crate::error::{BootstrapError, Result};
use crate::models::PackDescriptor;
use crate::transport::{self, RetryError, RetryPolicy, Route, Transport};

/// Where a pack's catalog will be loaded from.
pub fn catalog_location(base: &str, pack: &PackDescriptor) -> String {
    transport::join(base, &pack.runtime_catalog_file())
}

/// Loads pack catalogs into the resolution engine.
pub struct CatalogStager<E: ?Sized> {
    engine: Arc<E>,
    transport: Arc<dyn Transport>,
    environment: Environment,
    policy: RetryPolicy,
}

impl<E: ResourceEngine + ?Sized> CatalogStager<E> {
    pub fn new(
        engine: Arc<E>,
        transport: Arc<dyn Transport>,
        environment: Environment,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            engine,
            transport,
            environment,
            policy,
        }
    }

    /// Stage the catalog of `pack` found under `base`.
    ///
    /// A local catalog must exist on disk before the engine is asked for it.
    /// Remote loads are retried on transient engine failures.
    pub async fn stage(&self, base: &str, pack: &PackDescriptor) -> Result<CatalogHandle> {
        let location = catalog_location(base, pack);
        let route = transport::route(base, self.environment)?;

        if route == Route::LocalFile && !self.transport.exists(Path::new(&location)).await {
            return Err(BootstrapError::NotFound { path: location });
        }

        let handle = self
            .policy
            .run("catalog", |attempt| {
                tracing::debug!(pack = %pack.id, location = %location, attempt, "Loading catalog");
                self.engine.load_catalog(&location)
            })
            .await
            .map_err(|e| match e {
                RetryError::Fatal(e) => BootstrapError::from_engine(&location, e),
                exhausted => BootstrapError::transport(&location, exhausted),
            })?;

        tracing::info!(pack = %pack.id, title = %pack.title, location = %location, "Catalog staged");
        Ok(handle)
    }
}
