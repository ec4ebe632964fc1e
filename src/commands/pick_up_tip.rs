//! Pick up a tip from a tip rack.
//!
//! Multi-channel pipettes consume the whole column containing the named
//! well; single-channel pipettes consume just the one position.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{resolve_labware_origin, well_top, CommandOutcome, CommandResult};
use crate::config::EngineSettings;
use crate::deck::DeckPoint;
use crate::error::{EngineResult, ValidationError};
use crate::hardware::{with_timeout, GantryController};
use crate::state::{EngineState, StateChange, TipAttachment};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickUpTipParams {
    pub pipette_id: String,
    /// Tip rack to take the tip from.
    pub labware_id: String,
    pub well_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PickUpTipResult {
    pub tip_volume_ul: f64,
    pub tip_length_mm: f64,
    pub position: DeckPoint,
}

/// Wells consumed by this pickup: the single position for one channel, the
/// whole column for a column-wise pickup.
fn consumed_wells(
    state: &EngineState,
    labware_id: &str,
    well_name: &str,
    channels: u8,
) -> EngineResult<Vec<String>> {
    let definition = state.labware.get_definition(labware_id)?;
    if channels <= 1 {
        return Ok(vec![well_name.to_string()]);
    }
    let column = definition
        .ordering
        .iter()
        .find(|col| col.iter().any(|w| w == well_name))
        .ok_or_else(|| ValidationError::WellDoesNotExist {
            labware_id: labware_id.to_string(),
            well_name: well_name.to_string(),
        })?;
    Ok(column.clone())
}

pub(crate) async fn execute(
    params: &PickUpTipParams,
    state: &EngineState,
    hardware: &dyn GantryController,
    settings: &EngineSettings,
) -> EngineResult<CommandOutcome> {
    let pipette = state.pipettes.get(&params.pipette_id)?;
    state.pipettes.validate_no_tip_attached(&params.pipette_id)?;

    if !state.labware.is_tip_rack(&params.labware_id)? {
        return Err(ValidationError::NotATipRack {
            labware_id: params.labware_id.clone(),
        }
        .into());
    }
    let well = state.labware.get_well(&params.labware_id, &params.well_name)?;

    let wells = consumed_wells(
        state,
        &params.labware_id,
        &params.well_name,
        pipette.config.channels,
    )?;
    for well_name in &wells {
        if !state.tips.has_clean_tip(&params.labware_id, well_name)? {
            return Err(ValidationError::TipAlreadyUsed {
                labware_id: params.labware_id.clone(),
                well_name: well_name.clone(),
            }
            .into());
        }
    }

    let resolved = resolve_labware_origin(state, &params.labware_id)?;
    let target = well_top(resolved.origin, well);
    debug!(
        pipette_id = %params.pipette_id,
        rack = %params.labware_id,
        well = %params.well_name,
        "picking up tip at {target}"
    );

    let mount = pipette.mount;
    with_timeout(
        "moveTo",
        settings.hardware.move_timeout,
        hardware.move_to(mount, target),
    )
    .await?;
    with_timeout(
        "pickUpTip",
        settings.hardware.pick_up_tip_timeout,
        hardware.pick_up_tip(mount, target),
    )
    .await?;

    let tip = TipAttachment {
        labware_id: params.labware_id.clone(),
        well_name: params.well_name.clone(),
        volume_ul: well.total_liquid_volume,
        length_mm: state
            .labware
            .get_definition(&params.labware_id)?
            .parameters
            .tip_length
            .unwrap_or(well.depth),
    };
    let result = PickUpTipResult {
        tip_volume_ul: tip.volume_ul,
        tip_length_mm: tip.length_mm,
        position: target,
    };

    let mut changes = resolved.changes;
    changes.push(StateChange::TipsUsed {
        labware_id: params.labware_id.clone(),
        well_names: wells,
    });
    changes.push(StateChange::TipAttached {
        pipette_id: params.pipette_id.clone(),
        tip,
    });
    changes.push(StateChange::PipetteMoved {
        pipette_id: params.pipette_id.clone(),
        position: target,
    });

    Ok(CommandOutcome::with_changes(
        CommandResult::PickUpTip(result),
        changes,
    ))
}
