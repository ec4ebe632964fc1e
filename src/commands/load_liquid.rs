//! Load liquid into labware wells.
//!
//! Validation is strict and atomic over the whole batch: the liquid id must
//! be declared, every named well must exist in a non-tip-rack labware, and
//! for every well the already-committed volume plus the requested volume
//! must stay within the well's declared maximum. A single violating well
//! fails the entire command and nothing is written.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{CommandOutcome, CommandResult};
use crate::error::{EngineResult, ValidationError};
use crate::state::{EngineState, StateChange};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadLiquidParams {
    /// Unique identifier of the liquid to load.
    pub liquid_id: String,
    /// Unique identifier of labware to load liquid into.
    pub labware_id: String,
    /// Volume of liquid, in µL, loaded into each well by name.
    pub volume_by_well: BTreeMap<String, f64>,
}

/// Empty result: the effect is the volume-ledger update.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadLiquidResult {}

pub(crate) fn execute(params: &LoadLiquidParams, state: &EngineState) -> EngineResult<CommandOutcome> {
    if params.volume_by_well.is_empty() {
        return Err(ValidationError::InvalidParameter {
            field: "volumeByWell".into(),
            reason: "at least one well is required".into(),
        }
        .into());
    }

    state.liquids.validate_liquid_id(&params.liquid_id)?;
    state.labware.validate_liquid_allowed(
        &params.labware_id,
        params.volume_by_well.keys().map(String::as_str),
    )?;

    for (well_name, volume) in &params.volume_by_well {
        if *volume <= 0.0 {
            return Err(ValidationError::InvalidVolume { volume_ul: *volume }.into());
        }
        let max_volume = state
            .labware
            .get_well_max_volume(&params.labware_id, well_name)?;
        let existing = state.liquids.well_volume(&params.labware_id, well_name);

        if existing + volume > max_volume {
            return Err(ValidationError::InvalidLoadVolume {
                well_name: well_name.clone(),
                max_volume_ul: max_volume,
                existing_volume_ul: existing,
                attempted_volume_ul: *volume,
            }
            .into());
        }
    }

    Ok(CommandOutcome::with_changes(
        CommandResult::LoadLiquid(LoadLiquidResult {}),
        vec![StateChange::LiquidLoaded {
            labware_id: params.labware_id.clone(),
            volume_by_well: params.volume_by_well.clone(),
        }],
    ))
}
