//! Drop the attached tip into a trash area or a labware well.
//!
//! Tip ejection is the one operation with a built-in recovery ladder:
//! repeated overpressure on the ejector is common enough on worn seals that
//! the implementation retries at reduced flow, homes the gantry, and retries
//! once more before giving up. Each escalation step is logged.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{resolve_area_origin, resolve_labware_origin, well_top, CommandOutcome, CommandResult};
use crate::config::EngineSettings;
use crate::deck::DeckPoint;
use crate::error::EngineResult;
use crate::hardware::{with_timeout, GantryController, HardwareError, Mount};
use crate::state::{EngineState, StateChange};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DropTipTarget {
    /// A trash-bin addressable area; the drop point honors the area's
    /// declared drop-tip offset when present.
    TrashBin { area_name: String },
    /// A well in loaded labware (e.g. returning a tip to its rack).
    Well {
        labware_id: String,
        well_name: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropTipParams {
    pub pipette_id: String,
    pub target: DropTipTarget,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DropTipResult {
    pub position: DeckPoint,
    /// How many ejection attempts the hardware needed.
    pub attempts: u32,
}

struct RecoveryReport {
    attempts: u32,
    homed: bool,
}

/// Eject with escalation: full speed, then reduced flow, then home the
/// gantry and try reduced flow once more. Non-retryable faults and
/// exhausted retries propagate the last hardware error.
async fn drop_tip_with_recovery(
    hardware: &dyn GantryController,
    mount: Mount,
    target: DeckPoint,
    settings: &EngineSettings,
) -> Result<RecoveryReport, HardwareError> {
    let max_retries = settings.recovery.drop_tip_max_retries;
    let mut attempts = 0u32;
    let mut homed = false;
    let mut flow_rate_scale = 1.0;

    loop {
        attempts += 1;
        let result = with_timeout(
            "dropTip",
            settings.hardware.drop_tip_timeout,
            hardware.drop_tip(mount, target, flow_rate_scale),
        )
        .await;

        match result {
            Ok(()) => return Ok(RecoveryReport { attempts, homed }),
            Err(err) if err.retryable() && attempts <= max_retries => {
                warn!(attempt = attempts, %err, "tip ejection failed, retrying at reduced flow");
                flow_rate_scale = settings.recovery.retry_flow_rate_scale;
                if attempts == 2 && !homed {
                    info!("homing gantry before final tip ejection attempt");
                    with_timeout(
                        "home",
                        settings.hardware.home_timeout,
                        hardware.home(None),
                    )
                    .await?;
                    homed = true;
                }
            }
            Err(err) => return Err(err),
        }
    }
}

pub(crate) async fn execute(
    params: &DropTipParams,
    state: &EngineState,
    hardware: &dyn GantryController,
    settings: &EngineSettings,
) -> EngineResult<CommandOutcome> {
    let pipette = state.pipettes.get(&params.pipette_id)?;
    state.pipettes.validate_tip_attached(&params.pipette_id)?;

    let (target, mut changes) = match &params.target {
        DropTipTarget::TrashBin { area_name } => {
            let was_cached = state.deck.cached_area(area_name).is_some();
            let area = state.deck.resolve_area(area_name)?;
            let point = match area.drop_tip_offset {
                Some(offset) => area.position.offset_by(offset),
                None => area.top(),
            };
            let changes = if was_cached {
                Vec::new()
            } else {
                vec![StateChange::AreaResolved { area }]
            };
            (point, changes)
        }
        DropTipTarget::Well {
            labware_id,
            well_name,
        } => {
            let well = state.labware.get_well(labware_id, well_name)?;
            let resolved = resolve_labware_origin(state, labware_id)?;
            (well_top(resolved.origin, well), resolved.changes)
        }
    };

    let mount = pipette.mount;
    with_timeout(
        "moveTo",
        settings.hardware.move_timeout,
        hardware.move_to(mount, target),
    )
    .await?;
    let report = drop_tip_with_recovery(hardware, mount, target, settings).await?;

    if report.homed {
        changes.push(StateChange::HomeCompleted);
    }
    changes.push(StateChange::TipDropped {
        pipette_id: params.pipette_id.clone(),
    });
    changes.push(StateChange::PipetteMoved {
        pipette_id: params.pipette_id.clone(),
        position: target,
    });

    Ok(CommandOutcome::with_changes(
        CommandResult::DropTip(DropTipResult {
            position: target,
            attempts: report.attempts,
        }),
        changes,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EngineError, ValidationError};
    use crate::hardware::{GantryCall, MockGantry};
    use crate::test_support::{settings, state_with_attached_tip, TRASH_AREA};

    fn overpressure() -> HardwareError {
        HardwareError::Overpressure {
            mount: "left".into(),
            pressure_kpa: 130.0,
            limit_kpa: 110.0,
        }
    }

    fn trash_params() -> DropTipParams {
        DropTipParams {
            pipette_id: "pipette-1".into(),
            target: DropTipTarget::TrashBin {
                area_name: TRASH_AREA.into(),
            },
        }
    }

    #[tokio::test]
    async fn drops_into_trash_using_drop_tip_offset() {
        let state = state_with_attached_tip();
        let gantry = MockGantry::new();
        let outcome = execute(&trash_params(), &state, &gantry, &settings())
            .await
            .unwrap();

        match &outcome.result {
            CommandResult::DropTip(r) => assert_eq!(r.attempts, 1),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(outcome
            .changes
            .iter()
            .any(|c| matches!(c, StateChange::TipDropped { .. })));
    }

    #[tokio::test]
    async fn overpressure_escalates_slow_retry_then_home_then_retry() {
        let state = state_with_attached_tip();
        let gantry = MockGantry::new();
        gantry.fail_next("dropTip", overpressure());
        gantry.fail_next("dropTip", overpressure());

        let outcome = execute(&trash_params(), &state, &gantry, &settings())
            .await
            .unwrap();
        match &outcome.result {
            CommandResult::DropTip(r) => assert_eq!(r.attempts, 3),
            other => panic!("unexpected result: {other:?}"),
        }

        // Second and third attempts run at reduced flow; a home happens
        // between them.
        let drop_calls: Vec<f64> = gantry
            .calls()
            .iter()
            .filter_map(|c| match c {
                GantryCall::DropTip { flow_rate_scale, .. } => Some(*flow_rate_scale),
                _ => None,
            })
            .collect();
        assert_eq!(drop_calls.len(), 3);
        assert_eq!(drop_calls[0], 1.0);
        assert!(drop_calls[1] < 1.0);
        assert!(drop_calls[2] < 1.0);
        assert_eq!(gantry.call_count("home"), 1);
        assert!(outcome
            .changes
            .iter()
            .any(|c| matches!(c, StateChange::HomeCompleted)));
    }

    #[tokio::test]
    async fn exhausted_retries_surface_the_hardware_error() {
        let state = state_with_attached_tip();
        let gantry = MockGantry::new();
        for _ in 0..4 {
            gantry.fail_next("dropTip", overpressure());
        }

        let err = execute(&trash_params(), &state, &gantry, &settings())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Hardware(HardwareError::Overpressure { .. })
        ));
    }

    #[tokio::test]
    async fn non_retryable_fault_fails_immediately() {
        let state = state_with_attached_tip();
        let gantry = MockGantry::new();
        gantry.fail_next(
            "dropTip",
            HardwareError::TipPresence {
                mount: "left".into(),
                expected: false,
                actual: true,
            },
        );

        let err = execute(&trash_params(), &state, &gantry, &settings())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Hardware(HardwareError::TipPresence { .. })
        ));
        assert_eq!(gantry.call_count("dropTip"), 1);
    }

    #[tokio::test]
    async fn missing_tip_is_rejected_before_hardware() {
        let mut state = state_with_attached_tip();
        state.apply(&StateChange::TipDropped {
            pipette_id: "pipette-1".into(),
        });

        let gantry = MockGantry::new();
        let err = execute(&trash_params(), &state, &gantry, &settings())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Validation(ValidationError::TipNotAttached { .. })
        ));
        assert!(gantry.calls().is_empty());
    }
}
