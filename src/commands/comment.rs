//! Record a free-text note in the run log.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{CommandOutcome, CommandResult};
use crate::error::EngineResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentParams {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResult {}

pub(crate) fn execute(params: &CommentParams) -> EngineResult<CommandOutcome> {
    info!("[protocol] {}", params.message);
    Ok(CommandOutcome::new(CommandResult::Comment(CommentResult {})))
}
