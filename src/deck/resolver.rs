//! Pure deck-geometry resolution.
//!
//! Maps addressable-area names to owning cutouts and candidate fixtures, and
//! composes cutout base positions with fixture-relative offsets into
//! absolute [`AddressableArea`]s. No mutable state lives here; identical
//! inputs always produce identical outputs. The caller (the
//! deck-configuration store) decides which candidate fixture is actually
//! installed.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::definition::{
    AddressableArea, Cutout, CutoutFixture, DeckDefinition, DeckPoint, Dimensions, OffsetVector,
};
use crate::error::ConfigurationError;

/// A fixture that could provide a requested addressable area, together with
/// the cutout it would occupy.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PotentialCutoutFixture {
    pub cutout_id: String,
    pub cutout_fixture_id: String,
}

/// Look up a cutout fixture by id.
pub fn cutout_fixture_by_id<'a>(
    cutout_fixture_id: &str,
    deck: &'a DeckDefinition,
) -> Result<&'a CutoutFixture, ConfigurationError> {
    deck.cutout_fixtures
        .iter()
        .find(|f| f.id == cutout_fixture_id)
        .ok_or_else(|| ConfigurationError::FixtureDoesNotExist {
            cutout_fixture_id: cutout_fixture_id.to_string(),
        })
}

/// Given an addressable area name, get the cutout that owns it and the set
/// of fixtures that could provide it there.
///
/// Every addressable area belongs to exactly one cutout, even when several
/// fixtures could supply it on that cutout. A definition that violates this
/// is malformed and fails with
/// [`ConfigurationError::AreaOwnedByMultipleCutouts`].
pub fn potential_cutout_fixtures(
    addressable_area_name: &str,
    deck: &DeckDefinition,
) -> Result<(String, BTreeSet<PotentialCutoutFixture>), ConfigurationError> {
    let mut potential: BTreeSet<PotentialCutoutFixture> = BTreeSet::new();
    for fixture in &deck.cutout_fixtures {
        for (cutout_id, provided) in &fixture.provides_addressable_areas {
            if provided.iter().any(|a| a == addressable_area_name) {
                potential.insert(PotentialCutoutFixture {
                    cutout_id: cutout_id.clone(),
                    cutout_fixture_id: fixture.id.clone(),
                });
            }
        }
    }

    let first = potential.iter().next().cloned().ok_or_else(|| {
        ConfigurationError::AddressableAreaDoesNotExist {
            addressable_area_name: addressable_area_name.to_string(),
        }
    })?;
    if potential.iter().any(|p| p.cutout_id != first.cutout_id) {
        return Err(ConfigurationError::AreaOwnedByMultipleCutouts {
            addressable_area_name: addressable_area_name.to_string(),
        });
    }
    Ok((first.cutout_id, potential))
}

/// Get the base position of a cutout on the deck.
pub fn cutout_position(
    cutout_id: &str,
    deck: &DeckDefinition,
) -> Result<DeckPoint, ConfigurationError> {
    deck.cutout(cutout_id)
        .map(Cutout::base_position)
        .ok_or_else(|| ConfigurationError::CutoutDoesNotExist {
            cutout_id: cutout_id.to_string(),
        })
}

/// Compose an area declaration with a cutout base position into an absolute
/// [`AddressableArea`]. Bounding box and drop offsets are copied verbatim
/// from the declaration.
pub fn addressable_area_from_name(
    addressable_area_name: &str,
    cutout_position: DeckPoint,
    deck: &DeckDefinition,
) -> Result<AddressableArea, ConfigurationError> {
    let spec = deck.area_spec(addressable_area_name).ok_or_else(|| {
        ConfigurationError::AddressableAreaDoesNotExist {
            addressable_area_name: addressable_area_name.to_string(),
        }
    })?;

    let offset = spec.offset_from_cutout_fixture;
    Ok(AddressableArea {
        area_name: spec.id.clone(),
        display_name: spec.display_name.clone(),
        position: DeckPoint::new(
            cutout_position.x + offset[0],
            cutout_position.y + offset[1],
            cutout_position.z + offset[2],
        ),
        bounding_box: Dimensions {
            x_dimension: spec.bounding_box.x_dimension,
            y_dimension: spec.bounding_box.y_dimension,
            z_dimension: spec.bounding_box.z_dimension,
        },
        drop_tip_offset: spec.drop_tips_offset.map(OffsetVector::from),
        drop_labware_offset: spec.drop_labware_offset.map(OffsetVector::from),
    })
}

/// All addressable areas a fixture provides on a given cutout, resolved to
/// absolute positions.
pub fn addressable_areas_provided_by(
    cutout_id: &str,
    fixture: &CutoutFixture,
    deck: &DeckDefinition,
) -> Result<Vec<AddressableArea>, ConfigurationError> {
    let base = cutout_position(cutout_id, deck)?;
    let provided = fixture
        .provides_addressable_areas
        .get(cutout_id)
        .ok_or_else(|| ConfigurationError::FixtureDoesNotProvideAreas {
            cutout_fixture_id: fixture.id.clone(),
            cutout_id: cutout_id.to_string(),
        })?;

    provided
        .iter()
        .map(|name| addressable_area_from_name(name, base, deck))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_fixture_deck() -> DeckDefinition {
        let json = serde_json::json!({
            "schemaVersion": 4,
            "robot": { "model": "OT-3 Standard" },
            "locations": {
                "cutouts": [
                    { "id": "cutoutC3", "position": [265.0, 107.0, 0.0] },
                    { "id": "cutoutD3", "position": [265.0, 0.0, 0.0] }
                ],
                "addressableAreas": [
                    {
                        "id": "D3",
                        "displayName": "Slot D3",
                        "offsetFromCutoutFixture": [0.0, 0.0, 0.0],
                        "boundingBox": { "xDimension": 128.0, "yDimension": 86.0, "zDimension": 0.0 }
                    },
                    {
                        "id": "movableTrashD3",
                        "displayName": "Trash Bin in D3",
                        "offsetFromCutoutFixture": [-5.25, 6.0, 0.0],
                        "boundingBox": { "xDimension": 225.0, "yDimension": 78.0, "zDimension": 40.0 },
                        "dropTipsOffset": [112.5, 40.0, 62.0]
                    }
                ]
            },
            "cutoutFixtures": [
                {
                    "id": "singleRightSlot",
                    "displayName": "Standard Slot Right",
                    "providesAddressableAreas": {
                        "cutoutC3": ["C3"],
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
                    "providesAddressableAreas": { "cutoutD3": ["movableTrashD3"] }
                }
            ]
        });
        DeckDefinition::from_slice(json.to_string().as_bytes()).unwrap()
    }

    #[test]
    fn finds_all_candidate_fixtures_for_shared_area() {
        let deck = two_fixture_deck();
        let (cutout_id, candidates) = potential_cutout_fixtures("D3", &deck).unwrap();
        assert_eq!(cutout_id, "cutoutD3");
        let ids: Vec<&str> = candidates
            .iter()
            .map(|c| c.cutout_fixture_id.as_str())
            .collect();
        assert_eq!(ids, vec!["singleRightSlot", "stagingAreaRightSlot"]);
    }

    #[test]
    fn unknown_area_fails_resolution() {
        let deck = two_fixture_deck();
        let err = potential_cutout_fixtures("Z9", &deck).unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::AddressableAreaDoesNotExist { .. }
        ));
    }

    #[test]
    fn area_position_composes_cutout_and_offset() {
        let deck = two_fixture_deck();
        let base = cutout_position("cutoutD3", &deck).unwrap();
        let area = addressable_area_from_name("movableTrashD3", base, &deck).unwrap();
        assert_eq!(area.position, DeckPoint::new(259.75, 6.0, 0.0));
        assert_eq!(
            area.drop_tip_offset,
            Some(OffsetVector::new(112.5, 40.0, 62.0))
        );
        assert_eq!(area.drop_labware_offset, None);
    }

    #[test]
    fn resolution_is_idempotent() {
        let deck = two_fixture_deck();
        let base = cutout_position("cutoutD3", &deck).unwrap();
        let first = addressable_area_from_name("movableTrashD3", base, &deck).unwrap();
        let second = addressable_area_from_name("movableTrashD3", base, &deck).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn fixture_without_areas_for_cutout_fails() {
        let deck = two_fixture_deck();
        let fixture = cutout_fixture_by_id("trashBinAdapter", &deck).unwrap();
        let err = addressable_areas_provided_by("cutoutC3", fixture, &deck).unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::FixtureDoesNotProvideAreas { .. }
        ));
    }

    #[test]
    fn unknown_cutout_fails() {
        let deck = two_fixture_deck();
        assert!(matches!(
            cutout_position("cutoutZ9", &deck),
            Err(ConfigurationError::CutoutDoesNotExist { .. })
        ));
    }
}
