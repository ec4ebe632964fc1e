//! Tip state slice: per-rack consumption tracking and next-tip selection.

use std::collections::{HashMap, HashSet};

use crate::error::ValidationError;
use crate::labware::LabwareDefinition;

#[derive(Debug, Clone)]
struct RackState {
    /// Well names column-major, copied from the definition ordering.
    columns: Vec<Vec<String>>,
    used: HashSet<String>,
}

/// Tracks which tip positions have been consumed in each loaded tip rack.
///
/// Selection scans column-major from a starting position. Exhaustion is a
/// recoverable condition: `get_next_tip` returns `None` without mutating
/// anything, and the caller decides whether to surface "replace the rack"
/// to an operator.
#[derive(Debug, Clone, Default)]
pub struct TipStore {
    racks: HashMap<String, RackState>,
}

impl TipStore {
    fn rack(&self, labware_id: &str) -> Result<&RackState, ValidationError> {
        self.racks
            .get(labware_id)
            .ok_or_else(|| ValidationError::NotATipRack {
                labware_id: labware_id.to_string(),
            })
    }

    /// Whether a tip position exists and has not been consumed.
    pub fn has_clean_tip(&self, labware_id: &str, well_name: &str) -> Result<bool, ValidationError> {
        let rack = self.rack(labware_id)?;
        let exists = rack
            .columns
            .iter()
            .any(|col| col.iter().any(|w| w == well_name));
        if !exists {
            return Err(ValidationError::WellDoesNotExist {
                labware_id: labware_id.to_string(),
                well_name: well_name.to_string(),
            });
        }
        Ok(!rack.used.contains(well_name))
    }

    /// Select the next available tip.
    ///
    /// With `num_tips == 1` this is the first clean tip at or after
    /// `starting_tip` in column order. With `num_tips > 1` (column-wise
    /// pickup) it is the top of the first fully clean column at or after the
    /// starting position; a partially used column is skipped. Returns
    /// `Ok(None)` when no suitable tip remains.
    pub fn get_next_tip(
        &self,
        labware_id: &str,
        num_tips: usize,
        starting_tip: Option<&str>,
    ) -> Result<Option<String>, ValidationError> {
        let rack = self.rack(labware_id)?;

        // Index of the starting tip in flattened column order, 0 if unset.
        let start_index = match starting_tip {
            Some(name) => rack
                .columns
                .iter()
                .flatten()
                .position(|w| w == name)
                .ok_or_else(|| ValidationError::WellDoesNotExist {
                    labware_id: labware_id.to_string(),
                    well_name: name.to_string(),
                })?,
            None => 0,
        };

        if num_tips <= 1 {
            let tip = rack
                .columns
                .iter()
                .flatten()
                .skip(start_index)
                .find(|w| !rack.used.contains(*w))
                .cloned();
            return Ok(tip);
        }

        let mut offset = 0usize;
        for column in &rack.columns {
            let column_start = offset;
            offset += column.len();
            if offset <= start_index {
                continue;
            }
            // A column entered mid-way by the starting tip counts only if
            // the scan starts at its top.
            if column_start < start_index {
                continue;
            }
            if column.len() >= num_tips && column.iter().all(|w| !rack.used.contains(w)) {
                return Ok(column.first().cloned());
            }
        }
        Ok(None)
    }

    /// Remaining clean tips in a rack.
    pub fn remaining_tips(&self, labware_id: &str) -> Result<usize, ValidationError> {
        let rack = self.rack(labware_id)?;
        let total: usize = rack.columns.iter().map(Vec::len).sum();
        Ok(total - rack.used.len())
    }

    pub fn is_tracked(&self, labware_id: &str) -> bool {
        self.racks.contains_key(labware_id)
    }

    pub(crate) fn register_rack(&mut self, labware_id: &str, definition: &LabwareDefinition) {
        self.racks.insert(
            labware_id.to_string(),
            RackState {
                columns: definition.ordering.clone(),
                used: HashSet::new(),
            },
        );
    }

    pub(crate) fn mark_used(&mut self, labware_id: &str, well_names: &[String]) {
        if let Some(rack) = self.racks.get_mut(labware_id) {
            rack.used.extend(well_names.iter().cloned());
        }
    }

    pub(crate) fn reset_rack(&mut self, labware_id: &str) {
        if let Some(rack) = self.racks.get_mut(labware_id) {
            rack.used.clear();
        }
    }
}
