//! Attach a pipette to a gantry mount.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{CommandOutcome, CommandResult};
use crate::error::{EngineResult, ValidationError};
use crate::hardware::Mount;
use crate::state::{EngineState, LoadedPipette, PipetteConfig, StateChange};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadPipetteParams {
    pub pipette_name: String,
    pub mount: Mount,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadPipetteResult {
    pub pipette_id: String,
}

pub(crate) fn execute(params: &LoadPipetteParams, state: &EngineState) -> EngineResult<CommandOutcome> {
    let config = PipetteConfig::for_name(&params.pipette_name).ok_or_else(|| {
        ValidationError::PipetteNameUnknown {
            pipette_name: params.pipette_name.clone(),
        }
    })?;

    if state.pipettes.get_by_mount(params.mount).is_some() {
        return Err(ValidationError::MountOccupied {
            mount: params.mount.to_string(),
        }
        .into());
    }

    let pipette_id = Uuid::new_v4().to_string();
    Ok(CommandOutcome::with_changes(
        CommandResult::LoadPipette(LoadPipetteResult {
            pipette_id: pipette_id.clone(),
        }),
        vec![StateChange::PipetteLoaded {
            pipette: LoadedPipette {
                id: pipette_id,
                mount: params.mount,
                config,
                attached_tip: None,
                aspirated_ul: 0.0,
                current_position: None,
            },
        }],
    ))
}
