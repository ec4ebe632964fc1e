//! Move a pipette to an addressable area.

use serde::{Deserialize, Serialize};

use super::{CommandOutcome, CommandResult};
use crate::config::EngineSettings;
use crate::deck::DeckPoint;
use crate::error::EngineResult;
use crate::hardware::{with_timeout, GantryController};
use crate::state::{EngineState, StateChange};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveToAddressableAreaParams {
    pub pipette_id: String,
    pub area_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveToAddressableAreaResult {
    pub position: DeckPoint,
}

pub(crate) async fn execute(
    params: &MoveToAddressableAreaParams,
    state: &EngineState,
    hardware: &dyn GantryController,
    settings: &EngineSettings,
) -> EngineResult<CommandOutcome> {
    let pipette = state.pipettes.get(&params.pipette_id)?;

    let was_cached = state.deck.cached_area(&params.area_name).is_some();
    let area = state.deck.resolve_area(&params.area_name)?;
    let target = area.top();

    let mut changes = if was_cached {
        Vec::new()
    } else {
        vec![StateChange::AreaResolved { area }]
    };

    with_timeout(
        "moveTo",
        settings.hardware.move_timeout,
        hardware.move_to(pipette.mount, target),
    )
    .await?;

    changes.push(StateChange::PipetteMoved {
        pipette_id: params.pipette_id.clone(),
        position: target,
    });

    Ok(CommandOutcome::with_changes(
        CommandResult::MoveToAddressableArea(MoveToAddressableAreaResult { position: target }),
        changes,
    ))
}
