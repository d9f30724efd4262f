//! One bootstrap run, from base location to populated scene.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::catalog::CatalogStager;
use crate::config::BootstrapConfig;
use crate::engine::{ResourceEngine, SceneGraph};
use crate::error::{BootstrapError, Result};
use crate::lifecycle::ResourceLifecycle;
use crate::locator::ContentLocator;
use crate::manifest::ManifestResolver;
use crate::models::{BootstrapOutcome, PackDescriptor, ReleaseReport};
use crate::populate::{RoomChooser, ScenePopulator};
use crate::transport::{self, RetryPolicy, Transport};

/// Owns the catalogs and instances of a run until [`shutdown`](Self::shutdown)
/// or drop, whichever comes first.
pub struct ContentBootstrap<E>
where
    E: ResourceEngine + SceneGraph + ?Sized,
{
    config: BootstrapConfig,
    engine: Arc<E>,
    transport: Arc<dyn Transport>,
    locator: ContentLocator<E>,
    lifecycle: ResourceLifecycle,
    populator: ScenePopulator,
}

impl<E> ContentBootstrap<E>
where
    E: ResourceEngine + SceneGraph + ?Sized,
{
    pub fn new(config: BootstrapConfig, engine: Arc<E>, transport: Arc<dyn Transport>) -> Self {
        let populator = ScenePopulator::with_seed(config.random_seed);
        Self {
            locator: ContentLocator::new(engine.clone()),
            lifecycle: ResourceLifecycle::new(),
            config,
            engine,
            transport,
            populator,
        }
    }

    /// Replace the default first-room policy.
    pub fn with_room_chooser(mut self, chooser: impl RoomChooser + 'static) -> Self {
        self.populator.set_chooser(chooser);
        self
    }

    pub fn config(&self) -> &BootstrapConfig {
        &self.config
    }

    pub fn locator(&self) -> &ContentLocator<E> {
        &self.locator
    }

    pub fn lifecycle(&self) -> &ResourceLifecycle {
        &self.lifecycle
    }

    /// Run against the current UTC time.
    pub async fn run(&mut self) -> Result<BootstrapOutcome> {
        self.run_at(Utc::now()).await
    }

    /// Run with eligibility evaluated at `now`.
    ///
    /// Anything held from an earlier run is released first. Manifest and
    /// catalog failures abort with no catalog left registered; a manifest
    /// with nothing released yet ends with [`BootstrapOutcome::NoEligiblePacks`].
    pub async fn run_at(&mut self, now: DateTime<Utc>) -> Result<BootstrapOutcome> {
        if !self.lifecycle.is_empty() {
            self.shutdown();
        }

        let base =
            transport::resolve_base(&self.config.base_location, &self.config.project_root())?;
        let policy = RetryPolicy::from(&self.config.transport);
        tracing::info!(
            base = %base,
            environment = self.config.environment.as_str(),
            "Bootstrapping content"
        );

        let resolver =
            ManifestResolver::new(self.transport.clone(), self.config.environment, policy);
        let packs = match resolver.load_eligible(&base, now).await {
            Err(BootstrapError::NoEligiblePacks) => return Ok(BootstrapOutcome::NoEligiblePacks),
            other => other?,
        };

        self.stage_all(&base, &packs, policy).await?;

        let report = self
            .populator
            .populate(&*self.engine, &self.locator, &mut self.lifecycle)
            .await;
        Ok(BootstrapOutcome::Populated(report))
    }

    async fn stage_all(
        &mut self,
        base: &str,
        packs: &[PackDescriptor],
        policy: RetryPolicy,
    ) -> Result<()> {
        let stager = CatalogStager::new(
            self.engine.clone(),
            self.transport.clone(),
            self.config.environment,
            policy,
        );
        for pack in packs {
            match stager.stage(base, pack).await {
                Ok(handle) => {
                    self.lifecycle.track(handle);
                    self.locator.register(handle);
                }
                Err(e) => {
                    tracing::error!(pack = %pack.id, error = %e, "Catalog staging failed");
                    self.shutdown();
                    return Err(BootstrapError::Catalog {
                        pack_id: pack.id.clone(),
                        source: Box::new(e),
                    });
                }
            }
        }
        Ok(())
    }

    /// Release everything this run acquired. Safe to call repeatedly.
    pub fn shutdown(&mut self) -> ReleaseReport {
        let report = self.lifecycle.release_all(&*self.engine);
        self.locator.clear();
        report
    }
}

impl<E> Drop for ContentBootstrap<E>
where
    E: ResourceEngine + SceneGraph + ?Sized,
{
    fn drop(&mut self) {
        if !self.lifecycle.is_empty() {
            self.shutdown();
        }
    }
}
