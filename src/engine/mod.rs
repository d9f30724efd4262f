//! Seams to the resource-management engine and the scene graph.
//!
//! The bootstrap never owns asset data. It holds opaque handles issued by a
//! [`ResourceEngine`] and gives them back exactly once through the lifecycle
//! tracker. Scene access is limited to what population needs: node names,
//! local transform reset and a mesh audit.

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::transport::Retryable;

/// A staged catalog (locator) registered with the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CatalogHandle(pub u64);

/// A loaded asset template, released once it has been instantiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetHandle(pub u64);

/// A live object in the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId(pub u64);

/// Where a labelled asset can be loaded from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceLocation {
    /// The address the asset is registered under.
    pub primary_key: String,
    /// Engine-internal identifier, e.g. the bundle path.
    pub internal_id: String,
}

impl ResourceLocation {
    pub fn new(primary_key: impl Into<String>, internal_id: impl Into<String>) -> Self {
        Self {
            primary_key: primary_key.into(),
            internal_id: internal_id.into(),
        }
    }
}

/// A descendant of an instance, as seen during slot scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneNode {
    pub id: InstanceId,
    pub name: String,
}

/// Engine errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    /// Transient failure, e.g. the remote catalog could not be downloaded.
    #[error("Unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed data: {0}")]
    Malformed(String),

    #[error("Missing: {0}")]
    Missing(String),

    /// The handle is unknown or was already released.
    #[error("Rejected: {0}")]
    Rejected(String),
}

impl Retryable for EngineError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Address/label resolution and instantiation, implemented by the host engine.
///
/// The async methods are the run's suspension points; release methods are
/// synchronous so teardown can run from `Drop`.
#[async_trait]
pub trait ResourceEngine: Send + Sync {
    /// Load the catalog at `location` and register its locator.
    async fn load_catalog(&self, location: &str) -> Result<CatalogHandle, EngineError>;

    /// Unregister a locator added by [`load_catalog`](Self::load_catalog).
    fn remove_catalog(&self, catalog: CatalogHandle) -> Result<(), EngineError>;

    /// Every string key the locator behind `catalog` answers to.
    fn catalog_keys(&self, catalog: CatalogHandle) -> Vec<String>;

    /// Locations tagged with `label` across all registered locators.
    async fn locations_by_label(&self, label: &str) -> Result<Vec<ResourceLocation>, EngineError>;

    async fn load_asset(&self, address: &str) -> Result<AssetHandle, EngineError>;

    /// Create a root-level instance of a loaded asset.
    async fn instantiate_asset(&self, asset: AssetHandle) -> Result<InstanceId, EngineError>;

    fn release_asset(&self, asset: AssetHandle);

    /// Instantiate a location as a child of `parent`, keeping the engine's
    /// dependency tracking intact.
    async fn instantiate_location(
        &self,
        location: &ResourceLocation,
        parent: InstanceId,
    ) -> Result<InstanceId, EngineError>;

    fn release_instance(&self, instance: InstanceId) -> Result<(), EngineError>;
}

/// Read access to the scene an instance lives in.
pub trait SceneGraph: Send + Sync {
    /// All descendants of `root` in depth-first pre-order, `root` excluded.
    fn descendants(&self, root: InstanceId) -> Vec<SceneNode>;

    /// Local position to origin, rotation to identity, scale to one.
    fn reset_local_transform(&self, node: InstanceId);

    /// Mesh-bearing components under `root` (inclusive) whose mesh is null.
    fn missing_mesh_count(&self, root: InstanceId) -> usize;
}
