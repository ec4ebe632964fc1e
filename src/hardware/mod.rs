//! Hardware collaborator seam.
//!
//! The engine drives physical hardware exclusively through the
//! [`GantryController`] trait: an async, thread-safe interface over the
//! motion/pipetting controller keyed by mount. Implementations live outside
//! the engine (firmware drivers, simulators); the in-tree [`mock::MockGantry`]
//! exists for tests and dry runs.
//!
//! Every operation can raise a typed [`HardwareError`]. The executor wraps
//! each call in [`with_timeout`] so a wedged controller surfaces as a
//! distinct timeout failure rather than a hung run.

pub mod mock;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::deck::DeckPoint;

pub use mock::{GantryCall, MockGantry};

/// A pipette or gripper mount on the gantry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Mount {
    Left,
    Right,
    /// The gripper mount.
    Extension,
}

impl std::fmt::Display for Mount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mount::Left => write!(f, "left"),
            Mount::Right => write!(f, "right"),
            Mount::Extension => write!(f, "extension"),
        }
    }
}

/// A motion axis of the gantry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Axis {
    X,
    Y,
    ZLeft,
    ZRight,
}

/// An error reported by the hardware layer.
///
/// `retryable` distinguishes transient physical faults (overpressure,
/// timeout) from faults that need intervention before any retry can work
/// (stall, tip-presence mismatch, lost connection).
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum HardwareError {
    #[error(
        "overpressure on {mount} mount: {pressure_kpa:.1} kPa exceeds limit {limit_kpa:.1} kPa"
    )]
    Overpressure {
        mount: String,
        pressure_kpa: f64,
        limit_kpa: f64,
    },

    #[error("motor stall or collision on axis {axis}")]
    Stall { axis: String },

    #[error("tip presence mismatch on {mount} mount: expected {expected}, sensed {actual}")]
    TipPresence {
        mount: String,
        expected: bool,
        actual: bool,
    },

    #[error("hardware operation {operation} timed out after {budget_ms} ms")]
    Timeout {
        operation: &'static str,
        budget_ms: u64,
    },

    #[error("hardware controller is not connected")]
    NotConnected,

    #[error("hardware I/O error: {0}")]
    Io(String),
}

impl HardwareError {
    /// Whether a retry of the same operation could plausibly succeed
    /// without operator intervention.
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            HardwareError::Overpressure { .. } | HardwareError::Timeout { .. }
        )
    }
}

/// Async interface to the motion/pipetting controller.
///
/// All methods take `&self`; implementations use interior mutability. The
/// engine never holds state locks across these awaits.
#[async_trait]
pub trait GantryController: Send + Sync {
    /// Home the given axes, or all axes when `None`.
    async fn home(&self, axes: Option<&[Axis]>) -> Result<(), HardwareError>;

    /// Move the critical point of `mount` to an absolute deck position.
    async fn move_to(&self, mount: Mount, target: DeckPoint) -> Result<(), HardwareError>;

    /// Draw liquid into the current tip.
    async fn aspirate(
        &self,
        mount: Mount,
        volume_ul: f64,
        flow_rate_ul_s: f64,
    ) -> Result<(), HardwareError>;

    /// Expel liquid from the current tip.
    async fn dispense(
        &self,
        mount: Mount,
        volume_ul: f64,
        flow_rate_ul_s: f64,
    ) -> Result<(), HardwareError>;

    /// Press onto a tip at `target` and verify presence.
    async fn pick_up_tip(&self, mount: Mount, target: DeckPoint) -> Result<(), HardwareError>;

    /// Eject the current tip at `target`. `flow_rate_scale` slows the
    /// ejector for recovery retries; 1.0 is full speed.
    async fn drop_tip(
        &self,
        mount: Mount,
        target: DeckPoint,
        flow_rate_scale: f64,
    ) -> Result<(), HardwareError>;

    /// Read the pipette pressure sensor, in kPa.
    async fn read_pressure(&self, mount: Mount) -> Result<f64, HardwareError>;
}

/// Await a hardware call under a timeout budget, mapping an elapsed budget
/// to [`HardwareError::Timeout`].
pub async fn with_timeout<T, F>(
    operation: &'static str,
    budget: Duration,
    call: F,
) -> Result<T, HardwareError>
where
    F: std::future::Future<Output = Result<T, HardwareError>>,
{
    match tokio::time::timeout(budget, call).await {
        Ok(result) => result,
        Err(_) => Err(HardwareError::Timeout {
            operation,
            budget_ms: budget.as_millis() as u64,
        }),
    }
}
