//! Move a pipette to a well position.

use serde::{Deserialize, Serialize};

use super::{resolve_labware_origin, well_top, CommandOutcome, CommandResult};
use crate::config::EngineSettings;
use crate::deck::{DeckPoint, OffsetVector};
use crate::error::EngineResult;
use crate::hardware::{with_timeout, GantryController};
use crate::state::{EngineState, StateChange};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveToWellParams {
    pub pipette_id: String,
    pub labware_id: String,
    pub well_name: String,
    /// Offset from the well top, defaults to none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<OffsetVector>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveToWellResult {
    pub position: DeckPoint,
}

pub(crate) async fn execute(
    params: &MoveToWellParams,
    state: &EngineState,
    hardware: &dyn GantryController,
    settings: &EngineSettings,
) -> EngineResult<CommandOutcome> {
    let pipette = state.pipettes.get(&params.pipette_id)?;
    let well = state.labware.get_well(&params.labware_id, &params.well_name)?;
    let resolved = resolve_labware_origin(state, &params.labware_id)?;

    let mut target = well_top(resolved.origin, well);
    if let Some(offset) = params.offset {
        target = target.offset_by(offset);
    }

    with_timeout(
        "moveTo",
        settings.hardware.move_timeout,
        hardware.move_to(pipette.mount, target),
    )
    .await?;

    let mut changes = resolved.changes;
    changes.push(StateChange::PipetteMoved {
        pipette_id: params.pipette_id.clone(),
        position: target,
    });

    Ok(CommandOutcome::with_changes(
        CommandResult::MoveToWell(MoveToWellResult { position: target }),
        changes,
    ))
}
