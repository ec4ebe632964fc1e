//! Draw liquid from a well into the attached tip.

use serde::{Deserialize, Serialize};

use super::{resolve_labware_origin, well_bottom, CommandOutcome, CommandResult};
use crate::config::EngineSettings;
use crate::error::{EngineResult, ResourceError, ValidationError};
use crate::hardware::{with_timeout, GantryController, HardwareError};
use crate::state::{EngineState, StateChange};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AspirateParams {
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
pub struct AspirateResult {
    pub volume_ul: f64,
}

pub(crate) async fn execute(
    params: &AspirateParams,
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
    let available = state.pipettes.get_available_volume(&params.pipette_id)?;
    if params.volume_ul > available {
        return Err(ValidationError::VolumeExceedsPipette {
            pipette_id: params.pipette_id.clone(),
            available_ul: available,
            requested_ul: params.volume_ul,
        }
        .into());
    }

    let well = state.labware.get_well(&params.labware_id, &params.well_name)?;
    // Enforce the reservoir ledger only for wells the run has loaded; an
    // untracked well has no committed volume to check against.
    let tracked = state.liquids.well_volume(&params.labware_id, &params.well_name);
    if tracked > 0.0 && params.volume_ul > tracked {
        return Err(ResourceError::WellUnderfilled {
            labware_id: params.labware_id.clone(),
            well_name: params.well_name.clone(),
            available_ul: tracked,
            requested_ul: params.volume_ul,
        }
        .into());
    }

    let resolved = resolve_labware_origin(state, &params.labware_id)?;
    let target = well_bottom(resolved.origin, well);
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
        "aspirate",
        settings.hardware.aspirate_timeout,
        hardware.aspirate(mount, params.volume_ul, flow_rate),
    )
    .await?;

    // A clogged tip shows up as pressure above the limit after the plunger
    // move; surface it as the same overpressure fault the firmware raises.
    let pressure_kpa = with_timeout(
        "readPressure",
        settings.hardware.sensor_timeout,
        hardware.read_pressure(mount),
    )
    .await?;
    if pressure_kpa > settings.hardware.overpressure_limit_kpa {
        return Err(HardwareError::Overpressure {
            mount: mount.to_string(),
            pressure_kpa,
            limit_kpa: settings.hardware.overpressure_limit_kpa,
        }
        .into());
    }

    let mut changes = resolved.changes;
    changes.push(StateChange::PipetteAspirated {
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
        CommandResult::Aspirate(AspirateResult {
            volume_ul: params.volume_ul,
        }),
        changes,
    ))
}
