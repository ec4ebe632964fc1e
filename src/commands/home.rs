//! Home the gantry.

use serde::{Deserialize, Serialize};

use super::{CommandOutcome, CommandResult};
use crate::config::EngineSettings;
use crate::error::EngineResult;
use crate::hardware::{with_timeout, Axis, GantryController};
use crate::state::StateChange;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeParams {
    /// Axes to home; all axes when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axes: Option<Vec<Axis>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeResult {}

pub(crate) async fn execute(
    params: &HomeParams,
    hardware: &dyn GantryController,
    settings: &EngineSettings,
) -> EngineResult<CommandOutcome> {
    with_timeout(
        "home",
        settings.hardware.home_timeout,
        hardware.home(params.axes.as_deref()),
    )
    .await?;

    Ok(CommandOutcome::with_changes(
        CommandResult::Home(HomeResult {}),
        vec![StateChange::HomeCompleted],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::MockGantry;
    use crate::test_support::settings;

    #[tokio::test]
    async fn homes_requested_axes() {
        let gantry = MockGantry::new();
        let outcome = execute(
            &HomeParams {
                axes: Some(vec![Axis::X, Axis::Y]),
            },
            &gantry,
            &settings(),
        )
        .await
        .unwrap();

        assert_eq!(gantry.call_count("home"), 1);
        assert_eq!(outcome.changes, vec![StateChange::HomeCompleted]);
    }
}
