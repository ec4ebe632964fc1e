//! Install a cutout fixture on a deck cutout.

use serde::{Deserialize, Serialize};

use super::{CommandOutcome, CommandResult};
use crate::deck::resolver;
use crate::error::{ConfigurationError, EngineResult};
use crate::state::{EngineState, StateChange};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigureFixtureParams {
    pub cutout_id: String,
    pub cutout_fixture_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigureFixtureResult {}

pub(crate) fn execute(
    params: &ConfigureFixtureParams,
    state: &EngineState,
) -> EngineResult<CommandOutcome> {
    let deck = state.deck.definition();
    resolver::cutout_position(&params.cutout_id, deck)?;
    let fixture = resolver::cutout_fixture_by_id(&params.cutout_fixture_id, deck)?;

    if !fixture
        .provides_addressable_areas
        .contains_key(&params.cutout_id)
    {
        return Err(ConfigurationError::FixtureDoesNotProvideAreas {
            cutout_fixture_id: params.cutout_fixture_id.clone(),
            cutout_id: params.cutout_id.clone(),
        }
        .into());
    }

    Ok(CommandOutcome::with_changes(
        CommandResult::ConfigureFixture(ConfigureFixtureResult {}),
        vec![StateChange::FixtureConfigured {
            cutout_id: params.cutout_id.clone(),
            cutout_fixture_id: params.cutout_fixture_id.clone(),
        }],
    ))
}
