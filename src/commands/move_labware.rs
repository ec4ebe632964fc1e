//! Relocate loaded labware to a new location.
//!
//! Labware identity persists across moves; only the location changes.

use serde::{Deserialize, Serialize};

use super::{resolve_area_origin, resolve_labware_origin, CommandOutcome, CommandResult};
use crate::config::EngineSettings;
use crate::error::{EngineResult, ValidationError};
use crate::hardware::{with_timeout, GantryController, Mount};
use crate::state::{EngineState, LabwareLocation, StateChange};

/// How the labware physically gets to its new location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MoveLabwareStrategy {
    /// The gripper carries the labware.
    UsingGripper,
    /// An operator moves it by hand; no gantry motion.
    Manual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveLabwareParams {
    pub labware_id: String,
    pub new_location: LabwareLocation,
    pub strategy: MoveLabwareStrategy,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveLabwareResult {}

pub(crate) async fn execute(
    params: &MoveLabwareParams,
    state: &EngineState,
    hardware: &dyn GantryController,
    settings: &EngineSettings,
) -> EngineResult<CommandOutcome> {
    let labware = state.labware.get(&params.labware_id)?;
    if labware.fixed_trash {
        return Err(ValidationError::InvalidParameter {
            field: "labwareId".into(),
            reason: format!("fixed trash {} cannot be moved", params.labware_id),
        }
        .into());
    }

    let mut changes = Vec::new();
    let destination = match &params.new_location {
        LabwareLocation::AddressableArea { area_name } => {
            let resolved = resolve_area_origin(state, area_name)?;
            changes.extend(resolved.changes);
            Some(resolved.origin)
        }
        LabwareLocation::Module { module_id } => {
            let module = state.modules.get(module_id)?;
            let resolved = resolve_area_origin(state, &module.area_name)?;
            changes.extend(resolved.changes);
            Some(resolved.origin)
        }
        LabwareLocation::OffDeck => None,
    };
    if params.new_location != LabwareLocation::OffDeck
        && state.labware.occupant_at(&params.new_location).is_some()
    {
        return Err(ValidationError::LocationOccupied {
            location: params.new_location.to_string(),
        }
        .into());
    }

    if params.strategy == MoveLabwareStrategy::UsingGripper {
        let source = resolve_labware_origin(state, &params.labware_id)?;
        changes.extend(source.changes);
        with_timeout(
            "moveTo",
            settings.hardware.move_timeout,
            hardware.move_to(Mount::Extension, source.origin),
        )
        .await?;
        if let Some(destination) = destination {
            with_timeout(
                "moveTo",
                settings.hardware.move_timeout,
                hardware.move_to(Mount::Extension, destination),
            )
            .await?;
        }
    }

    changes.push(StateChange::LabwareMoved {
        labware_id: params.labware_id.clone(),
        new_location: params.new_location.clone(),
    });

    Ok(CommandOutcome::with_changes(
        CommandResult::MoveLabware(MoveLabwareResult {}),
        changes,
    ))
}
