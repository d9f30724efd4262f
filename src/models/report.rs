use serde::{Deserialize, Serialize};

/// Where a population run is, or where it stopped.
///
/// `Idle → RoomLoading → RoomReady → SlotScan → (SlotResolving →
/// SlotInstantiating)* → Done`, with `Aborted` reachable while the room loads.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PopulationState {
    #[default]
    Idle,
    RoomLoading,
    RoomReady,
    SlotScan,
    SlotResolving,
    SlotInstantiating,
    Done,
    Aborted,
}

impl PopulationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::RoomLoading => "room_loading",
            Self::RoomReady => "room_ready",
            Self::SlotScan => "slot_scan",
            Self::SlotResolving => "slot_resolving",
            Self::SlotInstantiating => "slot_instantiating",
            Self::Done => "done",
            Self::Aborted => "aborted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }
}

/// Outcome of one population run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PopulationReport {
    pub state: PopulationState,
    /// Address of the instantiated room, if one was loaded.
    pub room: Option<String>,
    /// Well-formed slot markers found.
    pub slots_scanned: usize,
    /// Slots that received an instance.
    pub slots_filled: usize,
    /// Names that looked like slots but did not parse.
    pub malformed_slots: Vec<String>,
    /// Slot names whose label had no candidates.
    pub unmatched_slots: Vec<String>,
    /// Slot names whose chosen instance came up with missing meshes.
    pub mesh_defects: Vec<String>,
}

impl PopulationReport {
    pub fn aborted(room: Option<String>) -> Self {
        Self {
            state: PopulationState::Aborted,
            room,
            ..Self::default()
        }
    }
}

/// Result of a teardown pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReleaseReport {
    pub instances_released: usize,
    pub catalogs_released: usize,
    pub failures: usize,
}

impl ReleaseReport {
    pub fn is_empty(&self) -> bool {
        self.instances_released == 0 && self.catalogs_released == 0 && self.failures == 0
    }
}

/// How a bootstrap run ended without error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// The manifest parsed but nothing is released yet.
    NoEligiblePacks,
    Populated(PopulationReport),
}
