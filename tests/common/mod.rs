//! Shared harness for integration tests: a small Flex-style deck, generated
//! labware definitions, and an engine wired to a mock gantry.

// Each test binary compiles its own copy of this module and uses a subset
// of the helpers.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Once;
use std::sync::Arc;

use protocol_engine::commands::CommandParams;
use protocol_engine::config::EngineSettings;
use protocol_engine::deck::DeckDefinition;
use protocol_engine::labware::{
    DefinitionCatalog, LabwareDefinition, LabwareMetadata, LabwareParameters, WellDefinition,
};
use protocol_engine::{MockGantry, ProtocolEngine};

pub const TRASH_AREA: &str = "movableTrashD2";

pub fn sample_deck() -> Arc<DeckDefinition> {
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
                "id": "trashBinAdapter",
                "displayName": "Trash Bin Adapter",
                "providesAddressableAreas": { "cutoutD2": ["movableTrashD2"] }
            }
        ]
    });
    Arc::new(DeckDefinition::from_slice(json.to_string().as_bytes()).unwrap())
}

pub fn installed_fixtures() -> BTreeMap<String, String> {
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

pub fn grid_definition(
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

pub fn catalog() -> DefinitionCatalog {
    let mut catalog = DefinitionCatalog::new();
    catalog.insert(grid_definition("test_96_wellplate_200ul", 200.0, false, None));
    catalog.insert(grid_definition("test_96_tiprack_50ul", 50.0, true, Some(57.9)));
    catalog
}

/// Initialize test logging once per binary; `RUST_LOG` controls verbosity.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Engine wired to a shared mock gantry with default settings.
pub fn build_engine() -> (ProtocolEngine, Arc<MockGantry>) {
    build_engine_with_settings(EngineSettings::default())
}

pub fn build_engine_with_settings(settings: EngineSettings) -> (ProtocolEngine, Arc<MockGantry>) {
    init_tracing();
    let gantry = Arc::new(MockGantry::new());
    let engine = ProtocolEngine::new(
        settings,
        sample_deck(),
        installed_fixtures(),
        catalog(),
        Arc::clone(&gantry) as Arc<dyn protocol_engine::GantryController>,
    );
    (engine, gantry)
}

pub fn load_plate_params(area: &str) -> CommandParams {
    CommandParams::LoadLabware(protocol_engine::commands::LoadLabwareParams {
        location: protocol_engine::state::LabwareLocation::AddressableArea {
            area_name: area.into(),
        },
        namespace: "opentrons".into(),
        load_name: "test_96_wellplate_200ul".into(),
        version: 1,
        display_name: None,
    })
}

pub fn load_tiprack_params(area: &str) -> CommandParams {
    CommandParams::LoadLabware(protocol_engine::commands::LoadLabwareParams {
        location: protocol_engine::state::LabwareLocation::AddressableArea {
            area_name: area.into(),
        },
        namespace: "opentrons".into(),
        load_name: "test_96_tiprack_50ul".into(),
        version: 1,
        display_name: None,
    })
}
