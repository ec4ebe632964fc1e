//! Load a labware definition instance onto the deck.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{resolve_area_origin, CommandOutcome, CommandResult};
use crate::error::{EngineResult, ValidationError};
use crate::labware::DefinitionCatalog;
use crate::state::{EngineState, LabwareLocation, LoadedLabware, StateChange};

/// Labware carrying this quirk is the robot's fixed trash.
const FIXED_TRASH_QUIRK: &str = "fixedTrash";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadLabwareParams {
    pub location: LabwareLocation,
    pub namespace: String,
    pub load_name: String,
    pub version: u32,
    /// Optional user display name; queries fall back to the definition's.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadLabwareResult {
    pub labware_id: String,
    pub definition_uri: String,
}

pub(crate) fn execute(
    params: &LoadLabwareParams,
    state: &EngineState,
    catalog: &DefinitionCatalog,
) -> EngineResult<CommandOutcome> {
    let mut changes = Vec::new();

    match &params.location {
        LabwareLocation::AddressableArea { area_name } => {
            changes.extend(resolve_area_origin(state, area_name)?.changes);
        }
        LabwareLocation::Module { module_id } => {
            state.modules.get(module_id)?;
        }
        LabwareLocation::OffDeck => {}
    }
    if state.labware.occupant_at(&params.location).is_some() {
        return Err(ValidationError::LocationOccupied {
            location: params.location.to_string(),
        }
        .into());
    }

    let definition = catalog.get(&params.namespace, &params.load_name, params.version)?;
    let definition_uri = definition.uri();
    let labware_id = Uuid::new_v4().to_string();
    let fixed_trash = definition
        .parameters
        .quirks
        .iter()
        .any(|q| q == FIXED_TRASH_QUIRK);

    changes.push(StateChange::LabwareLoaded {
        labware: LoadedLabware {
            id: labware_id.clone(),
            definition_uri: definition_uri.clone(),
            definition,
            location: params.location.clone(),
            display_name: params.display_name.clone(),
            fixed_trash,
        },
    });

    Ok(CommandOutcome::with_changes(
        CommandResult::LoadLabware(LoadLabwareResult {
            labware_id,
            definition_uri,
        }),
        changes,
    ))
}
