//! Labware state slice.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use super::LabwareLocation;
use crate::error::ValidationError;
use crate::labware::{LabwareDefinition, WellDefinition};

/// An instance of a labware definition placed at a location.
///
/// Identity is engine-assigned and persists for the run even if the
/// physical position changes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadedLabware {
    pub id: String,
    #[serde(skip)]
    pub definition: Arc<LabwareDefinition>,
    pub definition_uri: String,
    pub location: LabwareLocation,
    /// User-supplied display name; falls back to the definition's.
    pub display_name: Option<String>,
    /// Whether this labware is the robot's fixed trash.
    pub fixed_trash: bool,
}

/// Authoritative model of which labware is loaded where.
#[derive(Debug, Clone, Default)]
pub struct LabwareStore {
    labware: HashMap<String, LoadedLabware>,
}

impl LabwareStore {
    pub fn get(&self, labware_id: &str) -> Result<&LoadedLabware, ValidationError> {
        self.labware
            .get(labware_id)
            .ok_or_else(|| ValidationError::LabwareDoesNotExist {
                labware_id: labware_id.to_string(),
            })
    }

    pub fn get_definition(
        &self,
        labware_id: &str,
    ) -> Result<&Arc<LabwareDefinition>, ValidationError> {
        Ok(&self.get(labware_id)?.definition)
    }

    pub fn get_definition_uri(&self, labware_id: &str) -> Result<&str, ValidationError> {
        Ok(&self.get(labware_id)?.definition_uri)
    }

    pub fn get_location(&self, labware_id: &str) -> Result<&LabwareLocation, ValidationError> {
        Ok(&self.get(labware_id)?.location)
    }

    /// Display name, falling back to the definition's display name.
    pub fn get_display_name(&self, labware_id: &str) -> Result<&str, ValidationError> {
        let labware = self.get(labware_id)?;
        Ok(labware
            .display_name
            .as_deref()
            .unwrap_or(&labware.definition.metadata.display_name))
    }

    pub fn get_well(
        &self,
        labware_id: &str,
        well_name: &str,
    ) -> Result<&WellDefinition, ValidationError> {
        let labware = self.get(labware_id)?;
        labware
            .definition
            .well(well_name)
            .ok_or_else(|| ValidationError::WellDoesNotExist {
                labware_id: labware_id.to_string(),
                well_name: well_name.to_string(),
            })
    }

    /// Declared maximum volume of a well, in microliters.
    pub fn get_well_max_volume(
        &self,
        labware_id: &str,
        well_name: &str,
    ) -> Result<f64, ValidationError> {
        Ok(self.get_well(labware_id, well_name)?.total_liquid_volume)
    }

    pub fn is_tip_rack(&self, labware_id: &str) -> Result<bool, ValidationError> {
        Ok(self.get(labware_id)?.definition.parameters.is_tiprack)
    }

    pub fn is_fixed_trash(&self, labware_id: &str) -> Result<bool, ValidationError> {
        Ok(self.get(labware_id)?.fixed_trash)
    }

    /// Check that liquid may be loaded into the named wells: the labware
    /// must not be a tip rack and every well must exist.
    pub fn validate_liquid_allowed<'a>(
        &self,
        labware_id: &str,
        wells: impl Iterator<Item = &'a str>,
    ) -> Result<(), ValidationError> {
        if self.is_tip_rack(labware_id)? {
            return Err(ValidationError::LiquidNotAllowedInLabware {
                labware_id: labware_id.to_string(),
            });
        }
        for well_name in wells {
            self.get_well(labware_id, well_name)?;
        }
        Ok(())
    }

    /// Whether any labware currently occupies `location`.
    pub fn occupant_at(&self, location: &LabwareLocation) -> Option<&LoadedLabware> {
        if *location == LabwareLocation::OffDeck {
            return None;
        }
        self.labware.values().find(|lw| lw.location == *location)
    }

    /// All loaded labware, unordered.
    pub fn iter(&self) -> impl Iterator<Item = &LoadedLabware> {
        self.labware.values()
    }

    pub(crate) fn add(&mut self, labware: LoadedLabware) {
        self.labware.insert(labware.id.clone(), labware);
    }

    pub(crate) fn relocate(&mut self, labware_id: &str, new_location: LabwareLocation) {
        if let Some(labware) = self.labware.get_mut(labware_id) {
            labware.location = new_location;
        }
    }
}
