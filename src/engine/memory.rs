//! In-process [`ResourceEngine`] and [`SceneGraph`].
//!
//! Catalogs are declared up front by location; loading one registers its
//! addresses and labels. Instances form a simple node tree with local
//! transforms and optional mesh components. Scripted failures and call
//! counters make it suitable for exercising a full bootstrap without a host
//! engine.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use super::{
    AssetHandle, CatalogHandle, EngineError, InstanceId, ResourceEngine, ResourceLocation,
    SceneGraph, SceneNode,
};

/// Local placement relative to the parent node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: [f32; 3],
    pub rotation: [f32; 4],
    pub scale: [f32; 3],
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: [0.0, 0.0, 0.0],
        rotation: [0.0, 0.0, 0.0, 1.0],
        scale: [1.0, 1.0, 1.0],
    };
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Mesh component state on a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mesh {
    #[default]
    None,
    Present,
    /// Component exists but its mesh reference is null.
    Missing,
}

/// Authoring-time node tree an asset instantiates from.
#[derive(Debug, Clone, PartialEq)]
pub struct PrefabNode {
    pub name: String,
    pub mesh: Mesh,
    pub transform: Transform,
    pub children: Vec<PrefabNode>,
}

impl PrefabNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mesh: Mesh::None,
            transform: Transform::IDENTITY,
            children: Vec::new(),
        }
    }

    pub fn child(mut self, child: PrefabNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn mesh(mut self, mesh: Mesh) -> Self {
        self.mesh = mesh;
        self
    }

    pub fn transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }
}

#[derive(Debug, Clone)]
struct AssetDef {
    address: String,
    internal_id: String,
    labels: Vec<String>,
    prefab: PrefabNode,
}

/// Contents of one catalog file.
#[derive(Debug, Clone, Default)]
pub struct CatalogDef {
    assets: Vec<AssetDef>,
}

impl CatalogDef {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an asset reachable by `address` only.
    pub fn asset(self, address: impl Into<String>, prefab: PrefabNode) -> Self {
        self.labeled_asset(address, &[], prefab)
    }

    /// Add an asset reachable by `address` and every label in `labels`.
    pub fn labeled_asset(
        mut self,
        address: impl Into<String>,
        labels: &[&str],
        prefab: PrefabNode,
    ) -> Self {
        let address = address.into();
        self.assets.push(AssetDef {
            internal_id: format!("bundle://{}", address),
            address,
            labels: labels.iter().map(|l| l.to_string()).collect(),
            prefab,
        });
        self
    }
}

#[derive(Debug)]
struct Node {
    name: String,
    parent: Option<InstanceId>,
    children: Vec<InstanceId>,
    mesh: Mesh,
    transform: Transform,
}

#[derive(Debug, Default)]
struct State {
    next_id: u64,
    definitions: HashMap<String, CatalogDef>,
    /// Failures still to inject per catalog location.
    pending_failures: HashMap<String, usize>,
    load_attempts: HashMap<String, usize>,
    /// Registered locators in load order.
    registered: Vec<(CatalogHandle, String)>,
    assets: HashMap<AssetHandle, PrefabNode>,
    nodes: HashMap<InstanceId, Node>,
    /// Roots handed out by instantiate calls and not yet released.
    live_roots: HashSet<InstanceId>,
    failing_releases: HashSet<InstanceId>,
    released_instances: Vec<InstanceId>,
    removed_catalogs: Vec<CatalogHandle>,
    label_queries: usize,
}

impl State {
    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Registered catalogs, newest first, so later loads take precedence.
    fn registered_defs(&self) -> impl Iterator<Item = &CatalogDef> {
        self.registered
            .iter()
            .rev()
            .filter_map(|(_, location)| self.definitions.get(location))
    }

    fn find_asset(&self, address: &str) -> Option<&AssetDef> {
        self.registered_defs()
            .flat_map(|def| def.assets.iter())
            .find(|asset| asset.address.eq_ignore_ascii_case(address))
    }

    fn spawn(&mut self, prefab: &PrefabNode, parent: Option<InstanceId>) -> InstanceId {
        let id = InstanceId(self.next());
        self.nodes.insert(
            id,
            Node {
                name: prefab.name.clone(),
                parent,
                children: Vec::new(),
                mesh: prefab.mesh,
                transform: prefab.transform,
            },
        );
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.push(id);
        }
        for child in &prefab.children {
            self.spawn(child, Some(id));
        }
        id
    }

    fn subtree(&self, root: InstanceId) -> Vec<InstanceId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.get(&id) {
                out.push(id);
                stack.extend(node.children.iter().rev());
            }
        }
        out
    }

    fn destroy(&mut self, root: InstanceId) {
        if let Some(parent) = self.nodes.get(&root).and_then(|n| n.parent) {
            if let Some(parent) = self.nodes.get_mut(&parent) {
                parent.children.retain(|c| *c != root);
            }
        }
        for id in self.subtree(root) {
            self.nodes.remove(&id);
            self.live_roots.remove(&id);
        }
    }
}

/// Shared in-memory engine; clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryEngine {
    state: Arc<Mutex<State>>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// A panic while holding the lock leaves the bookkeeping usable, so a
    /// poisoned lock is recovered rather than propagated.
    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make `def` loadable from `location`.
    pub fn define_catalog(&self, location: impl Into<String>, def: CatalogDef) {
        self.lock().definitions.insert(location.into(), def);
    }

    /// The next `times` loads of `location` fail as unavailable.
    pub fn fail_catalog_loads(&self, location: impl Into<String>, times: usize) {
        self.lock().pending_failures.insert(location.into(), times);
    }

    /// Releasing `instance` will report an error and leave it alive.
    pub fn fail_release_of(&self, instance: InstanceId) {
        self.lock().failing_releases.insert(instance);
    }

    pub fn catalog_load_attempts(&self, location: &str) -> usize {
        self.lock().load_attempts.get(location).copied().unwrap_or(0)
    }

    pub fn registered_catalogs(&self) -> Vec<CatalogHandle> {
        self.lock().registered.iter().map(|(h, _)| *h).collect()
    }

    /// Locations of registered catalogs in load order.
    pub fn registered_locations(&self) -> Vec<String> {
        self.lock().registered.iter().map(|(_, l)| l.clone()).collect()
    }

    pub fn removed_catalogs(&self) -> Vec<CatalogHandle> {
        self.lock().removed_catalogs.clone()
    }

    pub fn released_instances(&self) -> Vec<InstanceId> {
        self.lock().released_instances.clone()
    }

    /// Instantiated roots that have not been released.
    pub fn live_instances(&self) -> usize {
        self.lock().live_roots.len()
    }

    pub fn loaded_assets(&self) -> usize {
        self.lock().assets.len()
    }

    pub fn label_queries(&self) -> usize {
        self.lock().label_queries
    }

    pub fn node_name(&self, id: InstanceId) -> Option<String> {
        self.lock().nodes.get(&id).map(|n| n.name.clone())
    }

    pub fn parent_of(&self, id: InstanceId) -> Option<InstanceId> {
        self.lock().nodes.get(&id).and_then(|n| n.parent)
    }

    pub fn children_of(&self, id: InstanceId) -> Vec<InstanceId> {
        self.lock()
            .nodes
            .get(&id)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    pub fn local_transform(&self, id: InstanceId) -> Option<Transform> {
        self.lock().nodes.get(&id).map(|n| n.transform)
    }
}

#[async_trait]
impl ResourceEngine for MemoryEngine {
    async fn load_catalog(&self, location: &str) -> Result<CatalogHandle, EngineError> {
        let mut state = self.lock();
        *state.load_attempts.entry(location.to_string()).or_default() += 1;

        if let Some(remaining) = state.pending_failures.get_mut(location) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(EngineError::Unavailable(format!("{} unreachable", location)));
            }
        }
        if !state.definitions.contains_key(location) {
            return Err(EngineError::Missing(location.to_string()));
        }

        let handle = CatalogHandle(state.next());
        state.registered.push((handle, location.to_string()));
        Ok(handle)
    }

    fn remove_catalog(&self, catalog: CatalogHandle) -> Result<(), EngineError> {
        let mut state = self.lock();
        let before = state.registered.len();
        state.registered.retain(|(h, _)| *h != catalog);
        if state.registered.len() == before {
            return Err(EngineError::Rejected(format!("catalog {:?}", catalog)));
        }
        state.removed_catalogs.push(catalog);
        Ok(())
    }

    fn catalog_keys(&self, catalog: CatalogHandle) -> Vec<String> {
        let state = self.lock();
        let Some(def) = state
            .registered
            .iter()
            .find(|(h, _)| *h == catalog)
            .and_then(|(_, location)| state.definitions.get(location))
        else {
            return Vec::new();
        };
        def.assets
            .iter()
            .flat_map(|a| std::iter::once(a.address.clone()).chain(a.labels.iter().cloned()))
            .collect()
    }

    async fn locations_by_label(&self, label: &str) -> Result<Vec<ResourceLocation>, EngineError> {
        let mut state = self.lock();
        state.label_queries += 1;

        let mut seen = HashSet::new();
        let mut locations = Vec::new();
        for def in state.registered_defs() {
            for asset in &def.assets {
                if asset.labels.iter().any(|l| l == label) && seen.insert(asset.address.clone()) {
                    locations.push(ResourceLocation::new(&asset.address, &asset.internal_id));
                }
            }
        }
        Ok(locations)
    }

    async fn load_asset(&self, address: &str) -> Result<AssetHandle, EngineError> {
        let mut state = self.lock();
        let prefab = state
            .find_asset(address)
            .map(|a| a.prefab.clone())
            .ok_or_else(|| EngineError::Missing(address.to_string()))?;
        let handle = AssetHandle(state.next());
        state.assets.insert(handle, prefab);
        Ok(handle)
    }

    async fn instantiate_asset(&self, asset: AssetHandle) -> Result<InstanceId, EngineError> {
        let mut state = self.lock();
        let prefab = state
            .assets
            .get(&asset)
            .cloned()
            .ok_or_else(|| EngineError::Rejected(format!("asset {:?}", asset)))?;
        let id = state.spawn(&prefab, None);
        state.live_roots.insert(id);
        Ok(id)
    }

    fn release_asset(&self, asset: AssetHandle) {
        self.lock().assets.remove(&asset);
    }

    async fn instantiate_location(
        &self,
        location: &ResourceLocation,
        parent: InstanceId,
    ) -> Result<InstanceId, EngineError> {
        let mut state = self.lock();
        if !state.nodes.contains_key(&parent) {
            return Err(EngineError::Rejected(format!("parent {:?}", parent)));
        }
        let prefab = state
            .find_asset(&location.primary_key)
            .map(|a| a.prefab.clone())
            .ok_or_else(|| EngineError::Missing(location.primary_key.clone()))?;
        let id = state.spawn(&prefab, Some(parent));
        state.live_roots.insert(id);
        Ok(id)
    }

    fn release_instance(&self, instance: InstanceId) -> Result<(), EngineError> {
        let mut state = self.lock();
        if state.failing_releases.contains(&instance) {
            return Err(EngineError::Rejected(format!("instance {:?} is pinned", instance)));
        }
        if !state.live_roots.contains(&instance) {
            return Err(EngineError::Rejected(format!("instance {:?}", instance)));
        }
        state.destroy(instance);
        state.released_instances.push(instance);
        Ok(())
    }
}

impl SceneGraph for MemoryEngine {
    fn descendants(&self, root: InstanceId) -> Vec<SceneNode> {
        let state = self.lock();
        state
            .subtree(root)
            .into_iter()
            .skip(1)
            .filter_map(|id| {
                state.nodes.get(&id).map(|n| SceneNode {
                    id,
                    name: n.name.clone(),
                })
            })
            .collect()
    }

    fn reset_local_transform(&self, node: InstanceId) {
        if let Some(node) = self.lock().nodes.get_mut(&node) {
            node.transform = Transform::IDENTITY;
        }
    }

    fn missing_mesh_count(&self, root: InstanceId) -> usize {
        let state = self.lock();
        state
            .subtree(root)
            .iter()
            .filter(|id| state.nodes.get(*id).is_some_and(|n| n.mesh == Mesh::Missing))
            .count()
    }
}
