//! Liquid state slice: declared liquids and the per-well volume ledger.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A declared liquid identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Liquid {
    pub id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Declared liquids plus the committed volume ledger, keyed by labware id
/// and well name.
///
/// The ledger only ever reflects committed commands; validation against
/// well capacity happens in the `LoadLiquid` implementation BEFORE any
/// mutation, so a failed load leaves the ledger untouched.
#[derive(Debug, Clone, Default)]
pub struct LiquidStore {
    liquids: HashMap<String, Liquid>,
    volumes: HashMap<String, BTreeMap<String, f64>>,
}

impl LiquidStore {
    /// Fail unless `liquid_id` has been declared.
    pub fn validate_liquid_id(&self, liquid_id: &str) -> Result<(), ValidationError> {
        if self.liquids.contains_key(liquid_id) {
            Ok(())
        } else {
            Err(ValidationError::LiquidDoesNotExist {
                liquid_id: liquid_id.to_string(),
            })
        }
    }

    pub fn get_liquid(&self, liquid_id: &str) -> Result<&Liquid, ValidationError> {
        self.liquids
            .get(liquid_id)
            .ok_or_else(|| ValidationError::LiquidDoesNotExist {
                liquid_id: liquid_id.to_string(),
            })
    }

    pub fn is_declared(&self, liquid_id: &str) -> bool {
        self.liquids.contains_key(liquid_id)
    }

    /// Committed volume in a well, 0 if nothing has been loaded.
    pub fn well_volume(&self, labware_id: &str, well_name: &str) -> f64 {
        self.volumes
            .get(labware_id)
            .and_then(|wells| wells.get(well_name))
            .copied()
            .unwrap_or(0.0)
    }

    /// All declared liquids, unordered.
    pub fn iter(&self) -> impl Iterator<Item = &Liquid> {
        self.liquids.values()
    }

    pub(crate) fn add_liquid(&mut self, liquid: Liquid) {
        self.liquids.insert(liquid.id.clone(), liquid);
    }

    pub(crate) fn add_volumes(&mut self, labware_id: &str, volume_by_well: &BTreeMap<String, f64>) {
        let wells = self.volumes.entry(labware_id.to_string()).or_default();
        for (well_name, volume) in volume_by_well {
            *wells.entry(well_name.clone()).or_insert(0.0) += volume;
        }
    }

    pub(crate) fn add_volume(&mut self, labware_id: &str, well_name: &str, volume_ul: f64) {
        *self
            .volumes
            .entry(labware_id.to_string())
            .or_default()
            .entry(well_name.to_string())
            .or_insert(0.0) += volume_ul;
    }

    pub(crate) fn remove_volume(&mut self, labware_id: &str, well_name: &str, volume_ul: f64) {
        if let Some(volume) = self
            .volumes
            .get_mut(labware_id)
            .and_then(|wells| wells.get_mut(well_name))
        {
            *volume = (*volume - volume_ul).max(0.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn water() -> Liquid {
        Liquid {
            id: "water".into(),
            display_name: "Water".into(),
            description: None,
        }
    }

    #[test]
    fn undeclared_liquid_fails_validation() {
        let store = LiquidStore::default();
        assert_eq!(
            store.validate_liquid_id("water").unwrap_err(),
            ValidationError::LiquidDoesNotExist {
                liquid_id: "water".into()
            }
        );
    }

    #[test]
    fn ledger_accumulates_per_well() {
        let mut store = LiquidStore::default();
        store.add_liquid(water());

        store.add_volumes(
            "plate-1",
            &[("A1".to_string(), 150.0)].into_iter().collect(),
        );
        store.add_volumes(
            "plate-1",
            &[("A1".to_string(), 25.0), ("A2".to_string(), 50.0)]
                .into_iter()
                .collect(),
        );

        assert_eq!(store.well_volume("plate-1", "A1"), 175.0);
        assert_eq!(store.well_volume("plate-1", "A2"), 50.0);
        assert_eq!(store.well_volume("plate-1", "B1"), 0.0);
        assert_eq!(store.well_volume("plate-2", "A1"), 0.0);
    }

    #[test]
    fn removal_saturates_at_zero() {
        let mut store = LiquidStore::default();
        store.add_volume("plate-1", "A1", 30.0);
        store.remove_volume("plate-1", "A1", 50.0);
        assert_eq!(store.well_volume("plate-1", "A1"), 0.0);
    }
}
