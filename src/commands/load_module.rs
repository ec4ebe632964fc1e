//! Load a powered module at a deck slot.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{resolve_area_origin, CommandOutcome, CommandResult};
use crate::error::{EngineResult, ValidationError};
use crate::state::{EngineState, LabwareLocation, LoadedModule, ModuleModel, StateChange};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadModuleParams {
    pub model: ModuleModel,
    /// Slot addressable area the module occupies.
    pub area_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadModuleResult {
    pub module_id: String,
}

pub(crate) fn execute(params: &LoadModuleParams, state: &EngineState) -> EngineResult<CommandOutcome> {
    let mut changes = resolve_area_origin(state, &params.area_name)?.changes;

    if state.modules.get_by_location(&params.area_name).is_some() {
        return Err(ValidationError::LocationOccupied {
            location: params.area_name.clone(),
        }
        .into());
    }
    let slot = LabwareLocation::AddressableArea {
        area_name: params.area_name.clone(),
    };
    if state.labware.occupant_at(&slot).is_some() {
        return Err(ValidationError::LocationOccupied {
            location: params.area_name.clone(),
        }
        .into());
    }

    let module_id = Uuid::new_v4().to_string();
    changes.push(StateChange::ModuleLoaded {
        module: LoadedModule {
            id: module_id.clone(),
            model: params.model,
            area_name: params.area_name.clone(),
        },
    });

    Ok(CommandOutcome::with_changes(
        CommandResult::LoadModule(LoadModuleResult { module_id }),
        changes,
    ))
}
