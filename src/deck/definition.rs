//! Deck definition data model.
//!
//! Mirrors the JSON schema of the definition files: a `locations` block with
//! cutouts and addressable-area declarations, plus the list of cutout
//! fixtures with the areas each one provides per cutout. All structures are
//! immutable after load and shared via `Arc` for the duration of a run.

use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// An absolute point on the deck, in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DeckPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl DeckPoint {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Offset this point by a vector.
    pub fn offset_by(self, v: OffsetVector) -> Self {
        Self {
            x: self.x + v.x,
            y: self.y + v.y,
            z: self.z + v.z,
        }
    }
}

impl std::fmt::Display for DeckPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

/// A relative offset vector, in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OffsetVector {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl OffsetVector {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl From<[f64; 3]> for OffsetVector {
    fn from(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

/// Axis-aligned bounding dimensions, in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dimensions {
    pub x_dimension: f64,
    pub y_dimension: f64,
    pub z_dimension: f64,
}

/// Bounding box as declared in the definition JSON.
pub type BoundingBox = Dimensions;

/// A fixed physical slot location on the deck that can host fixtures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cutout {
    pub id: String,
    /// Base position of the cutout, `[x, y, z]`.
    pub position: [f64; 3],
}

impl Cutout {
    pub fn base_position(&self) -> DeckPoint {
        DeckPoint::new(self.position[0], self.position[1], self.position[2])
    }
}

/// Declaration of an addressable area, relative to its providing fixture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressableAreaSpec {
    pub id: String,
    pub display_name: String,
    /// Offset from the cutout base position, `[x, y, z]`.
    pub offset_from_cutout_fixture: [f64; 3],
    pub bounding_box: BoundingBox,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drop_tips_offset: Option<[f64; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drop_labware_offset: Option<[f64; 3]>,
}

/// A physical attachment that can occupy one or more cutouts, providing a
/// set of addressable areas on each.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CutoutFixture {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    /// Cutout id -> addressable area names this fixture provides there.
    pub provides_addressable_areas: std::collections::BTreeMap<String, Vec<String>>,
}

/// The `locations` block of a deck definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckLocations {
    pub cutouts: Vec<Cutout>,
    pub addressable_areas: Vec<AddressableAreaSpec>,
}

/// Robot block of a deck definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotSpec {
    pub model: String,
}

/// A versioned, immutable deck definition.
///
/// Owned by the process for the duration of one protocol run. Loading
/// validates JSON shape only; semantic problems (an area no fixture
/// provides, an area spanning cutouts) surface from the resolver as
/// configuration errors when first referenced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckDefinition {
    pub schema_version: u32,
    pub robot: RobotSpec,
    pub locations: DeckLocations,
    pub cutout_fixtures: Vec<CutoutFixture>,
}

impl DeckDefinition {
    /// Parse a definition from a JSON byte slice.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ConfigurationError> {
        serde_json::from_slice(bytes)
            .map_err(|e| ConfigurationError::InvalidDefinition(e.to_string()))
    }

    /// Parse a definition from a JSON reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ConfigurationError> {
        serde_json::from_reader(reader)
            .map_err(|e| ConfigurationError::InvalidDefinition(e.to_string()))
    }

    pub fn cutout(&self, cutout_id: &str) -> Option<&Cutout> {
        self.locations.cutouts.iter().find(|c| c.id == cutout_id)
    }

    pub fn area_spec(&self, area_name: &str) -> Option<&AddressableAreaSpec> {
        self.locations
            .addressable_areas
            .iter()
            .find(|a| a.id == area_name)
    }
}

/// A resolved, positioned region of the deck.
///
/// Computed by composing a cutout's base position with the fixture-relative
/// offset declared for the area. Immutable once resolved; cached per run by
/// the deck-configuration store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressableArea {
    pub area_name: String,
    pub display_name: String,
    /// Absolute position of the area origin.
    pub position: DeckPoint,
    pub bounding_box: Dimensions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drop_tip_offset: Option<OffsetVector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drop_labware_offset: Option<OffsetVector>,
}

impl AddressableArea {
    /// Center of the area's bounding box at deck height, the default move
    /// target for area-addressed motion.
    pub fn center(&self) -> DeckPoint {
        DeckPoint::new(
            self.position.x + self.bounding_box.x_dimension / 2.0,
            self.position.y + self.bounding_box.y_dimension / 2.0,
            self.position.z,
        )
    }

    /// Top of the area's bounding box, at its center.
    pub fn top(&self) -> DeckPoint {
        let mut p = self.center();
        p.z = self.position.z + self.bounding_box.z_dimension;
        p
    }
}
