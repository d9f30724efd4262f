//! Ownership of everything a run acquires, and its release.

use crate::engine::{CatalogHandle, InstanceId, ResourceEngine};
use crate::models::ReleaseReport;

/// Something the tracker must give back to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tracked {
    Catalog(CatalogHandle),
    Instance(InstanceId),
}

impl From<CatalogHandle> for Tracked {
    fn from(handle: CatalogHandle) -> Self {
        Self::Catalog(handle)
    }
}

impl From<InstanceId> for Tracked {
    fn from(instance: InstanceId) -> Self {
        Self::Instance(instance)
    }
}

/// Per-run release list for staged catalogs and spawned instances.
///
/// An item is tracked at most once. [`release_all`](Self::release_all) is
/// best-effort, never fails, and leaves the tracker empty.
#[derive(Debug, Default)]
pub struct ResourceLifecycle {
    catalogs: Vec<CatalogHandle>,
    instances: Vec<InstanceId>,
}

impl ResourceLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the item was already tracked.
    pub fn track(&mut self, item: impl Into<Tracked>) -> bool {
        match item.into() {
            Tracked::Catalog(handle) => push_unique(&mut self.catalogs, handle),
            Tracked::Instance(instance) => push_unique(&mut self.instances, instance),
        }
    }

    pub fn catalogs(&self) -> &[CatalogHandle] {
        &self.catalogs
    }

    pub fn instances(&self) -> &[InstanceId] {
        &self.instances
    }

    pub fn is_empty(&self) -> bool {
        self.catalogs.is_empty() && self.instances.is_empty()
    }

    /// Release instances, then catalogs, each newest first.
    ///
    /// Individual failures are logged and counted; the remaining items are
    /// still released. A second call finds nothing to do.
    pub fn release_all<E: ResourceEngine + ?Sized>(&mut self, engine: &E) -> ReleaseReport {
        let mut report = ReleaseReport::default();
        let instances = std::mem::take(&mut self.instances);
        let catalogs = std::mem::take(&mut self.catalogs);

        for instance in instances.into_iter().rev() {
            match engine.release_instance(instance) {
                Ok(()) => report.instances_released += 1,
                Err(e) => {
                    report.failures += 1;
                    tracing::warn!(instance = instance.0, error = %e, "Instance release failed");
                }
            }
        }

        for catalog in catalogs.into_iter().rev() {
            match engine.remove_catalog(catalog) {
                Ok(()) => report.catalogs_released += 1,
                Err(e) => {
                    report.failures += 1;
                    tracing::warn!(catalog = catalog.0, error = %e, "Catalog removal failed");
                }
            }
        }

        if !report.is_empty() {
            tracing::info!(
                instances = report.instances_released,
                catalogs = report.catalogs_released,
                failures = report.failures,
                "Released bootstrap resources"
            );
        }
        report
    }
}

fn push_unique<T: PartialEq>(list: &mut Vec<T>, item: T) -> bool {
    if list.contains(&item) {
        return false;
    }
    list.push(item);
    true
}
