//! Address and label queries over the staged catalogs.

use std::collections::HashMap;
use std::sync::Arc;

use crate::engine::{CatalogHandle, EngineError, ResourceEngine, ResourceLocation};

/// Read side of the catalog registry.
///
/// Catalogs are registered in staging order and never change afterwards, so
/// queries are repeatable for the lifetime of a run.
pub struct ContentLocator<E: ?Sized> {
    engine: Arc<E>,
    catalogs: Vec<CatalogHandle>,
}

impl<E: ResourceEngine + ?Sized> ContentLocator<E> {
    pub fn new(engine: Arc<E>) -> Self {
        Self {
            engine,
            catalogs: Vec::new(),
        }
    }

    pub fn register(&mut self, catalog: CatalogHandle) {
        if !self.catalogs.contains(&catalog) {
            self.catalogs.push(catalog);
        }
    }

    /// Forget every catalog, e.g. after teardown released them.
    pub fn clear(&mut self) {
        self.catalogs.clear();
    }

    pub fn catalogs(&self) -> &[CatalogHandle] {
        &self.catalogs
    }

    /// Keys starting with `prefix`, in ordinal order.
    ///
    /// Prefix and uniqueness are both case-insensitive; when two catalogs
    /// spell an address differently, the spelling registered first is kept.
    pub fn addresses_by_prefix(&self, prefix: &str) -> Vec<String> {
        let prefix = prefix.to_lowercase();
        let mut matches: HashMap<String, String> = HashMap::new();
        for key in self
            .catalogs
            .iter()
            .flat_map(|catalog| self.engine.catalog_keys(*catalog))
        {
            let normalized = key.to_lowercase();
            if normalized.starts_with(&prefix) {
                matches.entry(normalized).or_insert(key);
            }
        }
        let mut addresses: Vec<String> = matches.into_values().collect();
        addresses.sort();
        addresses
    }

    /// Locations tagged with `label`; empty when nothing carries it.
    pub async fn candidates_by_label(
        &self,
        label: &str,
    ) -> Result<Vec<ResourceLocation>, EngineError> {
        if self.catalogs.is_empty() {
            return Ok(Vec::new());
        }
        self.engine.locations_by_label(label).await
    }
}
