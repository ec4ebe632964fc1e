//! Deck configuration state slice.
//!
//! Owns the deck definition for the run, the installed-fixture map (which
//! cutout fixture actually occupies each cutout), and the run-lifetime cache
//! of resolved addressable areas.
//!
//! The geometry resolver reports every fixture that *could* provide an
//! area; this store disambiguates against what is installed. An area whose
//! owning cutout has no installed candidate fixture is a configuration
//! error, surfaced to whoever referenced the area.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::deck::{resolver, AddressableArea, DeckDefinition};
use crate::error::ConfigurationError;

#[derive(Debug, Clone)]
struct CachedArea {
    cutout_id: String,
    area: AddressableArea,
}

/// Deck definition + installed fixtures + resolved-area cache.
#[derive(Debug, Clone)]
pub struct DeckConfigStore {
    definition: Arc<DeckDefinition>,
    /// Cutout id -> installed cutout fixture id.
    installed_fixtures: BTreeMap<String, String>,
    resolved_areas: HashMap<String, CachedArea>,
}

impl DeckConfigStore {
    pub fn new(definition: Arc<DeckDefinition>, installed_fixtures: BTreeMap<String, String>) -> Self {
        Self {
            definition,
            installed_fixtures,
            resolved_areas: HashMap::new(),
        }
    }

    pub fn definition(&self) -> &Arc<DeckDefinition> {
        &self.definition
    }

    /// The fixture installed on a cutout, if the deck configuration names one.
    pub fn installed_fixture(&self, cutout_id: &str) -> Option<&str> {
        self.installed_fixtures.get(cutout_id).map(String::as_str)
    }

    /// A previously resolved area, if this run has referenced it before.
    pub fn cached_area(&self, area_name: &str) -> Option<&AddressableArea> {
        self.resolved_areas.get(area_name).map(|c| &c.area)
    }

    /// Resolve an addressable area against the deck definition and the
    /// installed-fixture map.
    ///
    /// Pure with respect to this store: a cache miss computes the area and
    /// returns it without inserting. The executor commits the resolution as
    /// a state change so the cache write stays inside the single writer.
    pub fn resolve_area(&self, area_name: &str) -> Result<AddressableArea, ConfigurationError> {
        if let Some(cached) = self.cached_area(area_name) {
            return Ok(cached.clone());
        }

        let (cutout_id, candidates) =
            resolver::potential_cutout_fixtures(area_name, &self.definition)?;

        let installed = self.installed_fixtures.get(&cutout_id).ok_or_else(|| {
            ConfigurationError::FixtureNotConfigured {
                addressable_area_name: area_name.to_string(),
                cutout_id: cutout_id.clone(),
            }
        })?;
        if !candidates
            .iter()
            .any(|c| c.cutout_fixture_id == *installed)
        {
            return Err(ConfigurationError::FixtureNotConfigured {
                addressable_area_name: area_name.to_string(),
                cutout_id,
            });
        }

        let base = resolver::cutout_position(&cutout_id, &self.definition)?;
        resolver::addressable_area_from_name(area_name, base, &self.definition)
    }

    /// All areas resolved so far this run.
    pub fn resolved_areas(&self) -> impl Iterator<Item = &AddressableArea> {
        self.resolved_areas.values().map(|c| &c.area)
    }

    pub(crate) fn set_fixture(&mut self, cutout_id: &str, cutout_fixture_id: &str) {
        self.installed_fixtures
            .insert(cutout_id.to_string(), cutout_fixture_id.to_string());
        // Cached areas are immutable only while the fixture under them is;
        // reconfiguring a cutout drops its areas so they re-resolve.
        self.resolved_areas
            .retain(|_, cached| cached.cutout_id != cutout_id);
    }

    pub(crate) fn cache_area(&mut self, area: AddressableArea) {
        if let Ok((cutout_id, _)) =
            resolver::potential_cutout_fixtures(&area.area_name, &self.definition)
        {
            self.resolved_areas.insert(
                area.area_name.clone(),
                CachedArea { cutout_id, area },
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::DeckPoint;

    fn deck() -> Arc<DeckDefinition> {
        let json = serde_json::json!({
            "schemaVersion": 4,
            "robot": { "model": "OT-3 Standard" },
            "locations": {
                "cutouts": [
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
                        "boundingBox": { "xDimension": 225.0, "yDimension": 78.0, "zDimension": 40.0 }
                    }
                ]
            },
            "cutoutFixtures": [
                {
                    "id": "singleRightSlot",
                    "displayName": "Standard Slot Right",
                    "providesAddressableAreas": { "cutoutD3": ["D3"] }
                },
                {
                    "id": "trashBinAdapter",
                    "displayName": "Trash Bin Adapter",
                    "providesAddressableAreas": { "cutoutD3": ["movableTrashD3"] }
                }
            ]
        });
        Arc::new(DeckDefinition::from_slice(json.to_string().as_bytes()).unwrap())
    }

    #[test]
    fn resolves_area_provided_by_installed_fixture() {
        let store = DeckConfigStore::new(
            deck(),
            [("cutoutD3".to_string(), "singleRightSlot".to_string())]
                .into_iter()
                .collect(),
        );
        let area = store.resolve_area("D3").unwrap();
        assert_eq!(area.position, DeckPoint::new(265.0, 0.0, 0.0));
    }

    #[test]
    fn area_of_uninstalled_fixture_is_a_configuration_error() {
        let store = DeckConfigStore::new(
            deck(),
            [("cutoutD3".to_string(), "singleRightSlot".to_string())]
                .into_iter()
                .collect(),
        );
        // The trash adapter is not installed, so its area is unreachable.
        assert!(matches!(
            store.resolve_area("movableTrashD3"),
            Err(ConfigurationError::FixtureNotConfigured { .. })
        ));
    }

    #[test]
    fn cache_round_trip_is_identical() {
        let mut store = DeckConfigStore::new(
            deck(),
            [("cutoutD3".to_string(), "singleRightSlot".to_string())]
                .into_iter()
                .collect(),
        );
        let first = store.resolve_area("D3").unwrap();
        store.cache_area(first.clone());
        assert_eq!(store.cached_area("D3"), Some(&first));
        assert_eq!(store.resolve_area("D3").unwrap(), first);
    }

    #[test]
    fn reconfiguring_a_cutout_drops_its_cached_areas() {
        let mut store = DeckConfigStore::new(
            deck(),
            [("cutoutD3".to_string(), "singleRightSlot".to_string())]
                .into_iter()
                .collect(),
        );
        let area = store.resolve_area("D3").unwrap();
        store.cache_area(area);
        assert!(store.cached_area("D3").is_some());

        store.set_fixture("cutoutD3", "trashBinAdapter");
        assert!(store.cached_area("D3").is_none());
        // With the trash adapter installed, D3 is no longer provided.
        assert!(store.resolve_area("D3").is_err());
        assert!(store.resolve_area("movableTrashD3").is_ok());
    }
}
