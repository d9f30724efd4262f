//! Slot-driven scene population.
//!
//! A room is instantiated from the `rooms/` namespace, then every descendant
//! named like `slot_<category>` is filled with a random asset labelled
//! `furniture:<category>`. Nothing here fails the run: missing rooms, empty
//! labels, malformed slot names and mesh defects are logged and counted.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::engine::{InstanceId, ResourceEngine, ResourceLocation, SceneGraph, SceneNode};
use crate::error::BootstrapError;
use crate::lifecycle::ResourceLifecycle;
use crate::locator::ContentLocator;
use crate::models::{PopulationReport, PopulationState, SlotDescriptor};

/// Address namespace of room roots.
pub const ROOM_PREFIX: &str = "rooms/";

/// Picks which room to instantiate from the sorted room addresses.
pub trait RoomChooser: Send + Sync {
    /// Index into `rooms`, or `None` to skip population.
    fn choose(&self, rooms: &[String]) -> Option<usize>;
}

/// Always the first address in sort order.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstRoom;

impl RoomChooser for FirstRoom {
    fn choose(&self, rooms: &[String]) -> Option<usize> {
        (!rooms.is_empty()).then_some(0)
    }
}

impl<F> RoomChooser for F
where
    F: Fn(&[String]) -> Option<usize> + Send + Sync,
{
    fn choose(&self, rooms: &[String]) -> Option<usize> {
        self(rooms)
    }
}

pub struct ScenePopulator<R = StdRng> {
    chooser: Box<dyn RoomChooser>,
    rng: R,
    state: PopulationState,
}

impl ScenePopulator<StdRng> {
    /// Seeded for reproducible picks, or from entropy when `seed` is `None`.
    pub fn with_seed(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::new(rng)
    }
}

impl<R: Rng + Send> ScenePopulator<R> {
    pub fn new(rng: R) -> Self {
        Self {
            chooser: Box::new(FirstRoom),
            rng,
            state: PopulationState::Idle,
        }
    }

    pub fn with_chooser(mut self, chooser: impl RoomChooser + 'static) -> Self {
        self.set_chooser(chooser);
        self
    }

    pub fn set_chooser(&mut self, chooser: impl RoomChooser + 'static) {
        self.chooser = Box::new(chooser);
    }

    pub fn state(&self) -> PopulationState {
        self.state
    }

    fn enter(&mut self, next: PopulationState) {
        tracing::trace!(from = self.state.as_str(), to = next.as_str(), "Population state");
        self.state = next;
    }

    /// Instantiate a room and fill its slots.
    ///
    /// Every instance created is handed to `lifecycle` as soon as it exists.
    pub async fn populate<E>(
        &mut self,
        engine: &E,
        locator: &ContentLocator<E>,
        lifecycle: &mut ResourceLifecycle,
    ) -> PopulationReport
    where
        E: ResourceEngine + SceneGraph + ?Sized,
    {
        self.enter(PopulationState::RoomLoading);
        let Some((address, root)) = self.load_room(engine, locator, lifecycle).await else {
            self.enter(PopulationState::Aborted);
            return PopulationReport::aborted(None);
        };
        self.enter(PopulationState::RoomReady);

        let mut report = PopulationReport {
            room: Some(address),
            ..PopulationReport::default()
        };

        self.enter(PopulationState::SlotScan);
        for node in engine.descendants(root) {
            if !SlotDescriptor::is_marker(&node.name) {
                continue;
            }
            match SlotDescriptor::parse(&node.name) {
                Ok(slot) => {
                    report.slots_scanned += 1;
                    self.fill_slot(engine, locator, lifecycle, &node, &slot, &mut report)
                        .await;
                    self.enter(PopulationState::SlotScan);
                }
                Err(e) => {
                    tracing::warn!(
                        slot = %node.name,
                        reason = %e,
                        "Slot name malformed (expected 'slot_<category>[_anything]')"
                    );
                    report.malformed_slots.push(node.name);
                }
            }
        }

        self.enter(PopulationState::Done);
        report.state = PopulationState::Done;
        tracing::info!(
            slots = report.slots_scanned,
            spawned = report.slots_filled,
            "Slot fill complete"
        );
        report
    }

    async fn load_room<E>(
        &mut self,
        engine: &E,
        locator: &ContentLocator<E>,
        lifecycle: &mut ResourceLifecycle,
    ) -> Option<(String, InstanceId)>
    where
        E: ResourceEngine + SceneGraph + ?Sized,
    {
        let rooms = locator.addresses_by_prefix(ROOM_PREFIX);
        if rooms.is_empty() {
            let err = BootstrapError::ContentNotFound {
                what: format!("addresses under '{}'", ROOM_PREFIX),
            };
            tracing::warn!(error = %err, "No rooms found");
            return None;
        }
        let Some(address) = self.chooser.choose(&rooms).and_then(|i| rooms.get(i)) else {
            tracing::warn!(rooms = rooms.len(), "Room chooser picked no room");
            return None;
        };

        let asset = match engine.load_asset(address).await {
            Ok(asset) => asset,
            Err(e) => {
                tracing::warn!(address = %address, error = %e, "Room load failed");
                return None;
            }
        };
        let instantiated = engine.instantiate_asset(asset).await;
        engine.release_asset(asset);

        match instantiated {
            Ok(root) => {
                lifecycle.track(root);
                tracing::info!(address = %address, "Room instantiated");
                Some((address.clone(), root))
            }
            Err(e) => {
                tracing::warn!(address = %address, error = %e, "Room instantiation failed");
                None
            }
        }
    }

    async fn fill_slot<E>(
        &mut self,
        engine: &E,
        locator: &ContentLocator<E>,
        lifecycle: &mut ResourceLifecycle,
        node: &SceneNode,
        slot: &SlotDescriptor,
        report: &mut PopulationReport,
    ) where
        E: ResourceEngine + SceneGraph + ?Sized,
    {
        self.enter(PopulationState::SlotResolving);
        let label = slot.label();
        let candidates = match locator.candidates_by_label(&label).await {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::warn!(label = %label, slot = %slot.name, error = %e, "Label query failed");
                Vec::new()
            }
        };
        if candidates.is_empty() {
            let err = BootstrapError::ContentNotFound {
                what: format!("label '{}'", label),
            };
            tracing::warn!(slot = %slot.name, error = %err, "No furniture found for label");
            report.unmatched_slots.push(slot.name.clone());
            return;
        }

        let chosen = &candidates[self.rng.gen_range(0..candidates.len())];
        tracing::info!(
            label = %label,
            primary = %chosen.primary_key,
            id = %chosen.internal_id,
            slot = %slot.name,
            "Spawning furniture"
        );

        self.enter(PopulationState::SlotInstantiating);
        let instance = match engine.instantiate_location(chosen, node.id).await {
            Ok(instance) => instance,
            Err(e) => {
                tracing::warn!(
                    label = %label,
                    primary = %chosen.primary_key,
                    error = %e,
                    "Furniture instantiation failed"
                );
                return;
            }
        };

        engine.reset_local_transform(instance);
        lifecycle.track(instance);
        report.slots_filled += 1;

        audit_meshes(engine, instance, &label, chosen, slot, report);
    }
}

/// Warn when a fresh instance has mesh components without mesh data.
fn audit_meshes<E: SceneGraph + ?Sized>(
    engine: &E,
    instance: InstanceId,
    label: &str,
    chosen: &ResourceLocation,
    slot: &SlotDescriptor,
    report: &mut PopulationReport,
) {
    let missing = engine.missing_mesh_count(instance);
    if missing > 0 {
        tracing::warn!(
            label,
            missing,
            primary = %chosen.primary_key,
            id = %chosen.internal_id,
            "Spawned furniture has mesh components without meshes"
        );
        report.mesh_defects.push(slot.name.clone());
    }
}
