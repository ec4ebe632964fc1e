//! Entity state stores.
//!
//! Each submodule holds the authoritative, queryable model of one aspect of
//! the robot's configuration: loaded labware, declared liquids and well
//! volumes, tip consumption, attached pipettes, deck modules, and the deck
//! configuration itself. The slices are aggregated in [`EngineState`].
//!
//! # Mutation discipline
//!
//! Stores are pure data plus query methods. The ONLY mutation entry point is
//! [`EngineState::apply`], invoked exclusively by the command executor when
//! it commits a completed command's [`StateChange`]s. Command
//! implementations receive `&EngineState` (or an owned clone taken before
//! any hardware await) and cannot mutate anything. Queries against unknown
//! ids fail with typed errors; stores never silently default.

pub mod deck_config;
pub mod labware;
pub mod liquid;
pub mod modules;
pub mod pipettes;
pub mod tips;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::deck::{AddressableArea, DeckDefinition, DeckPoint};

pub use deck_config::DeckConfigStore;
pub use labware::{LabwareStore, LoadedLabware};
pub use liquid::{Liquid, LiquidStore};
pub use modules::{LoadedModule, ModuleModel, ModuleStore};
pub use pipettes::{LoadedPipette, PipetteConfig, PipetteStore, TipAttachment};
pub use tips::TipStore;

/// Where a piece of labware sits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LabwareLocation {
    /// Directly on a deck slot or other addressable area.
    AddressableArea { area_name: String },
    /// On top of a loaded module.
    Module { module_id: String },
    /// Removed from the deck but still tracked.
    OffDeck,
}

impl std::fmt::Display for LabwareLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LabwareLocation::AddressableArea { area_name } => write!(f, "{area_name}"),
            LabwareLocation::Module { module_id } => write!(f, "module {module_id}"),
            LabwareLocation::OffDeck => write!(f, "off-deck"),
        }
    }
}

/// A committed state mutation, produced by a successful command and applied
/// atomically by the executor.
#[derive(Debug, Clone, PartialEq)]
pub enum StateChange {
    LiquidAdded {
        liquid: Liquid,
    },
    LabwareLoaded {
        labware: LoadedLabware,
    },
    LabwareMoved {
        labware_id: String,
        new_location: LabwareLocation,
    },
    LiquidLoaded {
        labware_id: String,
        volume_by_well: BTreeMap<String, f64>,
    },
    PipetteLoaded {
        pipette: LoadedPipette,
    },
    ModuleLoaded {
        module: LoadedModule,
    },
    TipsUsed {
        labware_id: String,
        well_names: Vec<String>,
    },
    TipsReset {
        labware_id: String,
    },
    TipAttached {
        pipette_id: String,
        tip: TipAttachment,
    },
    TipDropped {
        pipette_id: String,
    },
    PipetteAspirated {
        pipette_id: String,
        labware_id: String,
        well_name: String,
        volume_ul: f64,
    },
    PipetteDispensed {
        pipette_id: String,
        labware_id: String,
        well_name: String,
        volume_ul: f64,
    },
    PipetteMoved {
        pipette_id: String,
        position: DeckPoint,
    },
    HomeCompleted,
    FixtureConfigured {
        cutout_id: String,
        cutout_fixture_id: String,
    },
    AreaResolved {
        area: AddressableArea,
    },
}

/// Aggregate of all entity state slices for one run.
///
/// Cheap to clone: definitions are shared via `Arc`, the rest is small
/// per-run bookkeeping. The executor clones the state before each command's
/// hardware phase so no lock is held across an await.
#[derive(Debug, Clone)]
pub struct EngineState {
    pub deck: DeckConfigStore,
    pub labware: LabwareStore,
    pub liquids: LiquidStore,
    pub tips: TipStore,
    pub pipettes: PipetteStore,
    pub modules: ModuleStore,
}

impl EngineState {
    /// Build the initial state for a run from the deck definition and the
    /// robot's current deck configuration (installed fixture per cutout).
    pub fn new(
        deck_definition: Arc<DeckDefinition>,
        installed_fixtures: BTreeMap<String, String>,
    ) -> Self {
        Self {
            deck: DeckConfigStore::new(deck_definition, installed_fixtures),
            labware: LabwareStore::default(),
            liquids: LiquidStore::default(),
            tips: TipStore::default(),
            pipettes: PipetteStore::default(),
            modules: ModuleStore::default(),
        }
    }

    /// Apply one committed state change. Exhaustive over every change kind;
    /// adding a variant without handling it here is a compile error.
    pub(crate) fn apply(&mut self, change: &StateChange) {
        match change {
            StateChange::LiquidAdded { liquid } => {
                self.liquids.add_liquid(liquid.clone());
            }
            StateChange::LabwareLoaded { labware } => {
                if labware.definition.parameters.is_tiprack {
                    self.tips.register_rack(&labware.id, &labware.definition);
                }
                self.labware.add(labware.clone());
            }
            StateChange::LabwareMoved {
                labware_id,
                new_location,
            } => {
                self.labware.relocate(labware_id, new_location.clone());
            }
            StateChange::LiquidLoaded {
                labware_id,
                volume_by_well,
            } => {
                self.liquids.add_volumes(labware_id, volume_by_well);
            }
            StateChange::PipetteLoaded { pipette } => {
                self.pipettes.add(pipette.clone());
            }
            StateChange::ModuleLoaded { module } => {
                self.modules.add(module.clone());
            }
            StateChange::TipsUsed {
                labware_id,
                well_names,
            } => {
                self.tips.mark_used(labware_id, well_names);
            }
            StateChange::TipsReset { labware_id } => {
                self.tips.reset_rack(labware_id);
            }
            StateChange::TipAttached { pipette_id, tip } => {
                self.pipettes.attach_tip(pipette_id, tip.clone());
            }
            StateChange::TipDropped { pipette_id } => {
                self.pipettes.drop_tip(pipette_id);
            }
            StateChange::PipetteAspirated {
                pipette_id,
                labware_id,
                well_name,
                volume_ul,
            } => {
                self.pipettes.record_aspirate(pipette_id, *volume_ul);
                self.liquids.remove_volume(labware_id, well_name, *volume_ul);
            }
            StateChange::PipetteDispensed {
                pipette_id,
                labware_id,
                well_name,
                volume_ul,
            } => {
                self.pipettes.record_dispense(pipette_id, *volume_ul);
                self.liquids.add_volume(labware_id, well_name, *volume_ul);
            }
            StateChange::PipetteMoved {
                pipette_id,
                position,
            } => {
                self.pipettes.record_move(pipette_id, *position);
            }
            StateChange::HomeCompleted => {
                self.pipettes.clear_positions();
            }
            StateChange::FixtureConfigured {
                cutout_id,
                cutout_fixture_id,
            } => {
                self.deck.set_fixture(cutout_id, cutout_fixture_id);
            }
            StateChange::AreaResolved { area } => {
                self.deck.cache_area(area.clone());
            }
        }
    }

    /// Apply a batch of changes in order.
    pub(crate) fn apply_all(&mut self, changes: &[StateChange]) {
        for change in changes {
            self.apply(change);
        }
    }
}
