//! Shared fixtures for unit tests: a small Flex-style deck definition,
//! generated labware definitions, and pre-populated engine states.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::EngineSettings;
use crate::deck::DeckDefinition;
use crate::hardware::Mount;
use crate::labware::{
    DefinitionCatalog, LabwareDefinition, LabwareMetadata, LabwareParameters, WellDefinition,
};
use crate::state::{
    EngineState, LabwareLocation, Liquid, LoadedLabware, LoadedPipette, PipetteConfig,
    StateChange, TipAttachment,
};

pub(crate) const PLATE_ID: &str = "plate-1";
pub(crate) const TIP_RACK_ID: &str = "rack-1";
pub(crate) const PIPETTE_ID: &str = "pipette-1";
pub(crate) const TRASH_AREA: &str = "movableTrashD2";

/// Four-cutout deck: slots C1/D1/D3, trash bin on D2, and a staging-area
/// fixture on D3 that is declared but not installed.
pub(crate) fn sample_deck() -> Arc<DeckDefinition> {
    let json = serde_json::json!({
        "schemaVersion": 4,
        "robot": { "model": "OT-3 Standard" },
        "locations": {
            "cutouts": [
                { "id": "cutoutC1", "position": [0.0, 107.0, 0.0] },
                { "id": "cutoutD1", "position": [0.0, 0.0, 0.0] },
                { "id": "cutoutD2", "position": [164.0, 0.0, 0.0] },
                { "id": "cutoutD3", "position": [328.0, 0.0, 0.0] }
            ],
            "addressableAreas": [
                {
                    "id": "C1",
                    "displayName": "Slot C1",
                    "offsetFromCutoutFixture": [0.0, 0.0, 0.0],
                    "boundingBox": { "xDimension": 128.0, "yDimension": 86.0, "zDimension": 0.0 }
                },
                {
                    "id": "D1",
                    "displayName": "Slot D1",
                    "offsetFromCutoutFixture": [0.0, 0.0, 0.0],
                    "boundingBox": { "xDimension": 128.0, "yDimension": 86.0, "zDimension": 0.0 }
                },
                {
                    "id": "D2",
                    "displayName": "Slot D2",
                    "offsetFromCutoutFixture": [0.0, 0.0, 0.0],
                    "boundingBox": { "xDimension": 128.0, "yDimension": 86.0, "zDimension": 0.0 }
                },
                {
                    "id": "D3",
                    "displayName": "Slot D3",
                    "offsetFromCutoutFixture": [0.0, 0.0, 0.0],
                    "boundingBox": { "xDimension": 128.0, "yDimension": 86.0, "zDimension": 0.0 }
                },
                {
                    "id": "D4",
                    "displayName": "Staging Area Slot D4",
                    "offsetFromCutoutFixture": [164.0, 0.0, 0.0],
                    "boundingBox": { "xDimension": 128.0, "yDimension": 86.0, "zDimension": 0.0 }
                },
                {
                    "id": "movableTrashD2",
                    "displayName": "Trash Bin in D2",
                    "offsetFromCutoutFixture": [-5.25, 6.0, 0.0],
                    "boundingBox": { "xDimension": 225.0, "yDimension": 78.0, "zDimension": 40.0 },
                    "dropTipsOffset": [112.5, 40.0, 62.0]
                }
            ]
        },
        "cutoutFixtures": [
            {
                "id": "singleLeftSlot",
                "displayName": "Standard Slot Left",
                "providesAddressableAreas": {
                    "cutoutC1": ["C1"],
                    "cutoutD1": ["D1"]
                }
            },
            {
                "id": "singleRightSlot",
                "displayName": "Standard Slot Right",
                "providesAddressableAreas": {
                    "cutoutD2": ["D2"],
                    "cutoutD3": ["D3"]
                }
            },
            {
                "id": "stagingAreaRightSlot",
                "displayName": "Staging Area Slot",
                "providesAddressableAreas": { "cutoutD3": ["D3", "D4"] }
            },
            {
                "id": "trashBinAdapter",
                "displayName": "Trash Bin Adapter",
                "providesAddressableAreas": { "cutoutD2": ["movableTrashD2"] }
            }
        ]
    });
    Arc::new(DeckDefinition::from_slice(json.to_string().as_bytes()).unwrap())
}

pub(crate) fn installed_fixtures() -> BTreeMap<String, String> {
    [
        ("cutoutC1", "singleLeftSlot"),
        ("cutoutD1", "singleLeftSlot"),
        ("cutoutD2", "trashBinAdapter"),
        ("cutoutD3", "singleRightSlot"),
    ]
    .into_iter()
    .map(|(c, f)| (c.to_string(), f.to_string()))
    .collect()
}

/// Generate an 8-row by 12-column labware definition.
pub(crate) fn grid_definition(
    load_name: &str,
    well_volume_ul: f64,
    is_tiprack: bool,
    tip_length: Option<f64>,
) -> LabwareDefinition {
    let rows = 8usize;
    let columns = 12usize;
    let ordering: Vec<Vec<String>> = (1..=columns)
        .map(|c| {
            (0..rows)
                .map(|r| format!("{}{}", (b'A' + r as u8) as char, c))
                .collect()
        })
        .collect();
    let wells = ordering
        .iter()
        .enumerate()
        .flat_map(|(c, column)| {
            column.iter().enumerate().map(move |(r, name)| {
                (
                    name.clone(),
                    WellDefinition {
                        depth: 10.9,
                        total_liquid_volume: well_volume_ul,
                        x: 14.38 + 9.0 * c as f64,
                        y: 74.24 - 9.0 * r as f64,
                        z: 1.0,
                        diameter: Some(6.86),
                    },
                )
            })
        })
        .collect();

    LabwareDefinition {
        namespace: "opentrons".into(),
        version: 1,
        parameters: LabwareParameters {
            load_name: load_name.into(),
            is_tiprack,
            tip_length,
            quirks: vec![],
        },
        metadata: LabwareMetadata {
            display_name: load_name.replace('_', " "),
            display_category: None,
        },
        ordering,
        wells,
    }
}

pub(crate) fn plate_definition() -> LabwareDefinition {
    grid_definition("test_96_wellplate_200ul", 200.0, false, None)
}

pub(crate) fn tiprack_definition() -> LabwareDefinition {
    grid_definition("test_96_tiprack_50ul", 50.0, true, Some(57.9))
}

pub(crate) fn catalog() -> DefinitionCatalog {
    let mut catalog = DefinitionCatalog::new();
    catalog.insert(plate_definition());
    catalog.insert(tiprack_definition());
    catalog
}

pub(crate) fn settings() -> EngineSettings {
    EngineSettings::default()
}

pub(crate) fn empty_state() -> EngineState {
    EngineState::new(sample_deck(), installed_fixtures())
}

fn load_labware(state: &mut EngineState, id: &str, definition: LabwareDefinition, area: &str) {
    let definition = Arc::new(definition);
    state.apply(&StateChange::LabwareLoaded {
        labware: LoadedLabware {
            id: id.into(),
            definition_uri: definition.uri(),
            definition,
            location: LabwareLocation::AddressableArea {
                area_name: area.into(),
            },
            display_name: None,
            fixed_trash: false,
        },
    });
}

fn load_pipette(state: &mut EngineState, pipette_name: &str) {
    state.apply(&StateChange::PipetteLoaded {
        pipette: LoadedPipette {
            id: PIPETTE_ID.into(),
            mount: Mount::Left,
            config: PipetteConfig::for_name(pipette_name).unwrap(),
            attached_tip: None,
            aspirated_ul: 0.0,
            current_position: None,
        },
    });
}

fn attach_tip(state: &mut EngineState) {
    state.apply(&StateChange::TipAttached {
        pipette_id: PIPETTE_ID.into(),
        tip: TipAttachment {
            labware_id: TIP_RACK_ID.into(),
            well_name: "A1".into(),
            volume_ul: 50.0,
            length_mm: 57.9,
        },
    });
}

/// Plate at D1, water declared.
pub(crate) fn state_with_plate() -> EngineState {
    let mut state = empty_state();
    state.apply(&StateChange::LiquidAdded {
        liquid: Liquid {
            id: "water".into(),
            display_name: "Water".into(),
            description: None,
        },
    });
    load_labware(&mut state, PLATE_ID, plate_definition(), "D1");
    state
}

/// A single pipette on the left mount, nothing loaded on deck.
pub(crate) fn state_with_pipette() -> EngineState {
    let mut state = empty_state();
    load_pipette(&mut state, "p50_single_flex");
    state
}

/// Tip rack at D3 plus a pipette with the given channel count.
pub(crate) fn state_with_tip_rack(channels: u8) -> EngineState {
    let mut state = empty_state();
    load_labware(&mut state, TIP_RACK_ID, tiprack_definition(), "D3");
    let name = if channels > 1 {
        "p50_multi_flex"
    } else {
        "p50_single_flex"
    };
    load_pipette(&mut state, name);
    state
}

/// Tip rack + pipette with a 50 µL tip already attached.
pub(crate) fn state_with_attached_tip() -> EngineState {
    let mut state = state_with_tip_rack(1);
    attach_tip(&mut state);
    state
}

/// Plate at D1 with `volume_ul` of water in A1, plus a tipped pipette.
pub(crate) fn state_with_filled_plate(volume_ul: f64) -> EngineState {
    let mut state = state_with_plate();
    load_labware(&mut state, TIP_RACK_ID, tiprack_definition(), "D3");
    load_pipette(&mut state, "p50_single_flex");
    attach_tip(&mut state);
    state.apply(&StateChange::LiquidLoaded {
        labware_id: PLATE_ID.into(),
        volume_by_well: [("A1".to_string(), volume_ul)].into_iter().collect(),
    });
    state
}
