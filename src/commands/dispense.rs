//! Expel liquid from the attached tip into a well.

use serde::{Deserialize, Serialize};

use super::{resolve_labware_origin, well_top, CommandOutcome, CommandResult};
use crate::config::EngineSettings;
use crate::error::{EngineResult, ValidationError};
use crate::hardware::{with_timeout, GantryController};
use crate::state::{EngineState, StateChange};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispenseParams {
    pub pipette_id: String,
    pub labware_id: String,
    pub well_name: String,
    pub volume_ul: f64,
    /// Defaults to the pipette model's flow rate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_rate_ul_s: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispenseResult {
    pub volume_ul: f64,
}

pub(crate) async fn execute(
    params: &DispenseParams,
    state: &EngineState,
    hardware: &dyn GantryController,
    settings: &EngineSettings,
) -> EngineResult<CommandOutcome> {
    let pipette = state.pipettes.get(&params.pipette_id)?;
    state.pipettes.validate_tip_attached(&params.pipette_id)?;

    if params.volume_ul <= 0.0 {
        return Err(ValidationError::InvalidVolume {
            volume_ul: params.volume_ul,
        }
        .into());
    }
    let aspirated = state.pipettes.get_aspirated_volume(&params.pipette_id)?;
    if params.volume_ul > aspirated {
        return Err(ValidationError::VolumeExceedsAspirated {
            pipette_id: params.pipette_id.clone(),
            aspirated_ul: aspirated,
            requested_ul: params.volume_ul,
        }
        .into());
    }

    let well = state.labware.get_well(&params.labware_id, &params.well_name)?;
    let resolved = resolve_labware_origin(state, &params.labware_id)?;
    let target = well_top(resolved.origin, well);
    let flow_rate = params
        .flow_rate_ul_s
        .unwrap_or(pipette.config.default_flow_rate_ul_s);

    let mount = pipette.mount;
    with_timeout(
        "moveTo",
        settings.hardware.move_timeout,
        hardware.move_to(mount, target),
    )
    .await?;
    with_timeout(
        "dispense",
        settings.hardware.dispense_timeout,
        hardware.dispense(mount, params.volume_ul, flow_rate),
    )
    .await?;

    let mut changes = resolved.changes;
    changes.push(StateChange::PipetteDispensed {
        pipette_id: params.pipette_id.clone(),
        labware_id: params.labware_id.clone(),
        well_name: params.well_name.clone(),
        volume_ul: params.volume_ul,
    });
    changes.push(StateChange::PipetteMoved {
        pipette_id: params.pipette_id.clone(),
        position: target,
    });

    Ok(CommandOutcome::with_changes(
        CommandResult::Dispense(DispenseResult {
            volume_ul: params.volume_ul,
        }),
        changes,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::hardware::MockGantry;
    use crate::test_support::{settings, state_with_filled_plate, PLATE_ID};

    #[tokio::test]
    async fn cannot_dispense_more_than_held() {
        let state = state_with_filled_plate(150.0);
        let gantry = MockGantry::new();
        let err = execute(
            &DispenseParams {
                pipette_id: "pipette-1".into(),
                labware_id: PLATE_ID.into(),
                well_name: "A2".into(),
                volume_ul: 10.0,
                flow_rate_ul_s: None,
            },
            &state,
            &gantry,
            &settings(),
        )
        .await
        .unwrap_err();

        // Nothing has been aspirated yet.
        assert!(matches!(
            err,
            EngineError::Validation(ValidationError::VolumeExceedsAspirated { .. })
        ));
        assert!(gantry.calls().is_empty());
    }

    #[tokio::test]
    async fn dispenses_held_liquid() {
        let mut state = state_with_filled_plate(150.0);
        state.apply(&StateChange::PipetteAspirated {
            pipette_id: "pipette-1".into(),
            labware_id: PLATE_ID.into(),
            well_name: "A1".into(),
            volume_ul: 40.0,
        });

        let gantry = MockGantry::new();
        let outcome = execute(
            &DispenseParams {
                pipette_id: "pipette-1".into(),
                labware_id: PLATE_ID.into(),
                well_name: "A2".into(),
                volume_ul: 40.0,
                flow_rate_ul_s: Some(10.0),
            },
            &state,
            &gantry,
            &settings(),
        )
        .await
        .unwrap();

        assert_eq!(gantry.call_count("dispense"), 1);
        state.apply_all(&outcome.changes);
        assert_eq!(state.liquids.well_volume(PLATE_ID, "A2"), 40.0);
        assert_eq!(state.pipettes.get_aspirated_volume("pipette-1").unwrap(), 0.0);
    }
}
