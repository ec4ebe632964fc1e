//! Pause execution for a fixed duration.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{CommandOutcome, CommandResult};
use crate::error::{EngineResult, ValidationError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitForDurationParams {
    pub seconds: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitForDurationResult {}

pub(crate) async fn execute(params: &WaitForDurationParams) -> EngineResult<CommandOutcome> {
    if !params.seconds.is_finite() || params.seconds < 0.0 {
        return Err(ValidationError::InvalidParameter {
            field: "seconds".into(),
            reason: format!("{} is not a valid wait duration", params.seconds),
        }
        .into());
    }

    if let Some(message) = &params.message {
        info!("waiting {}s: {message}", params.seconds);
    }
    tokio::time::sleep(std::time::Duration::from_secs_f64(params.seconds)).await;

    Ok(CommandOutcome::new(CommandResult::WaitForDuration(
        WaitForDurationResult {},
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    #[tokio::test(start_paused = true)]
    async fn waits_without_state_changes() {
        let outcome = execute(&WaitForDurationParams {
            seconds: 30.0,
            message: None,
        })
        .await
        .unwrap();
        assert!(outcome.changes.is_empty());
    }

    #[tokio::test]
    async fn rejects_negative_duration() {
        let err = execute(&WaitForDurationParams {
            seconds: -1.0,
            message: None,
        })
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Validation(ValidationError::InvalidParameter { .. })
        ));
    }
}
