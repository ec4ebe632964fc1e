//! Declare a liquid identity for later `loadLiquid` commands.

use serde::{Deserialize, Serialize};

use super::{CommandOutcome, CommandResult};
use crate::error::{EngineResult, ValidationError};
use crate::state::{EngineState, Liquid, StateChange};
use crate::validation;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddLiquidParams {
    /// Caller-chosen unique identifier for the liquid.
    pub liquid_id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddLiquidResult {
    pub liquid_id: String,
}

pub(crate) fn execute(params: &AddLiquidParams, state: &EngineState) -> EngineResult<CommandOutcome> {
    validation::require_nonempty_id(&params.liquid_id).map_err(|reason| {
        ValidationError::InvalidParameter {
            field: "liquidId".into(),
            reason: reason.to_string(),
        }
    })?;

    if state.liquids.is_declared(&params.liquid_id) {
        return Err(ValidationError::LiquidAlreadyDeclared {
            liquid_id: params.liquid_id.clone(),
        }
        .into());
    }

    let liquid = Liquid {
        id: params.liquid_id.clone(),
        display_name: params.display_name.clone(),
        description: params.description.clone(),
    };

    Ok(CommandOutcome::with_changes(
        CommandResult::AddLiquid(AddLiquidResult {
            liquid_id: params.liquid_id.clone(),
        }),
        vec![StateChange::LiquidAdded { liquid }],
    ))
}
