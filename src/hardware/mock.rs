//! Mock gantry controller.
//!
//! Simulates the motion/pipetting controller for tests and dry runs without
//! physical hardware. All operations are async-safe (tokio::time::sleep, not
//! std::thread::sleep).
//!
//! # Capabilities
//!
//! - Records every call in order for assertions (`calls()`)
//! - Scripted failure injection per operation (`fail_next`)
//! - Scripted per-operation delays to exercise timeout budgets (`delay_next`)
//! - Optional uniform motion delay for realistic pacing
//! - Simulated pressure sensor with noise around one atmosphere
//!
//! # Example
//!
//! ```rust,ignore
//! let gantry = MockGantry::new();
//! gantry.fail_next("dropTip", HardwareError::Overpressure {
//!     mount: "left".into(),
//!     pressure_kpa: 130.0,
//!     limit_kpa: 110.0,
//! });
//! // first dropTip fails, the retry succeeds
//! ```

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::Rng;
use tokio::time::sleep;
use tracing::debug;

use super::{Axis, GantryController, HardwareError, Mount};
use crate::deck::DeckPoint;

/// One recorded hardware interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum GantryCall {
    Home {
        axes: Option<Vec<Axis>>,
    },
    MoveTo {
        mount: Mount,
        target: DeckPoint,
    },
    Aspirate {
        mount: Mount,
        volume_ul: f64,
        flow_rate_ul_s: f64,
    },
    Dispense {
        mount: Mount,
        volume_ul: f64,
        flow_rate_ul_s: f64,
    },
    PickUpTip {
        mount: Mount,
        target: DeckPoint,
    },
    DropTip {
        mount: Mount,
        target: DeckPoint,
        flow_rate_scale: f64,
    },
    ReadPressure {
        mount: Mount,
    },
}

impl GantryCall {
    /// Operation name, matching the keys used by `fail_next`/`delay_next`.
    pub fn operation(&self) -> &'static str {
        match self {
            GantryCall::Home { .. } => "home",
            GantryCall::MoveTo { .. } => "moveTo",
            GantryCall::Aspirate { .. } => "aspirate",
            GantryCall::Dispense { .. } => "dispense",
            GantryCall::PickUpTip { .. } => "pickUpTip",
            GantryCall::DropTip { .. } => "dropTip",
            GantryCall::ReadPressure { .. } => "readPressure",
        }
    }
}

#[derive(Default)]
struct MockGantryState {
    calls: Vec<GantryCall>,
    positions: HashMap<Mount, DeckPoint>,
    injected_failures: HashMap<&'static str, VecDeque<HardwareError>>,
    injected_delays: HashMap<&'static str, VecDeque<Duration>>,
}

/// Simulated gantry controller.
pub struct MockGantry {
    state: Mutex<MockGantryState>,
    motion_delay: Duration,
    pressure_baseline_kpa: f64,
}

impl MockGantry {
    /// Create a mock with no artificial latency.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockGantryState::default()),
            motion_delay: Duration::ZERO,
            pressure_baseline_kpa: 101.3,
        }
    }

    /// Create a mock that sleeps `delay` on every motion operation.
    pub fn with_motion_delay(delay: Duration) -> Self {
        Self {
            motion_delay: delay,
            ..Self::new()
        }
    }

    /// Queue a failure for the next call of `operation` (keys match
    /// [`GantryCall::operation`]). Multiple queued failures are consumed in
    /// order; once drained, calls succeed again.
    pub fn fail_next(&self, operation: &'static str, error: HardwareError) {
        self.state
            .lock()
            .injected_failures
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    /// Queue an extra delay before the next call of `operation` completes.
    /// Useful to make a single call blow its timeout budget.
    pub fn delay_next(&self, operation: &'static str, delay: Duration) {
        self.state
            .lock()
            .injected_delays
            .entry(operation)
            .or_default()
            .push_back(delay);
    }

    /// All calls recorded so far, in order.
    pub fn calls(&self) -> Vec<GantryCall> {
        self.state.lock().calls.clone()
    }

    /// Number of calls of a given operation.
    pub fn call_count(&self, operation: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.operation() == operation)
            .count()
    }

    /// Last commanded position of a mount, if it has moved.
    pub fn position(&self, mount: Mount) -> Option<DeckPoint> {
        self.state.lock().positions.get(&mount).copied()
    }

    fn record(&self, call: GantryCall) -> (Option<HardwareError>, Option<Duration>) {
        let mut state = self.state.lock();
        let op = call.operation();
        debug!(operation = op, "mock gantry call");
        state.calls.push(call);
        let failure = state
            .injected_failures
            .get_mut(op)
            .and_then(VecDeque::pop_front);
        let delay = state
            .injected_delays
            .get_mut(op)
            .and_then(VecDeque::pop_front);
        (failure, delay)
    }

    async fn settle(&self, injected: Option<Duration>) {
        if let Some(delay) = injected {
            sleep(delay).await;
        }
        if !self.motion_delay.is_zero() {
            sleep(self.motion_delay).await;
        }
    }
}

impl Default for MockGantry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GantryController for MockGantry {
    async fn home(&self, axes: Option<&[Axis]>) -> Result<(), HardwareError> {
        let (failure, delay) = self.record(GantryCall::Home {
            axes: axes.map(<[Axis]>::to_vec),
        });
        self.settle(delay).await;
        if let Some(err) = failure {
            return Err(err);
        }
        self.state.lock().positions.clear();
        Ok(())
    }

    async fn move_to(&self, mount: Mount, target: DeckPoint) -> Result<(), HardwareError> {
        let (failure, delay) = self.record(GantryCall::MoveTo { mount, target });
        self.settle(delay).await;
        if let Some(err) = failure {
            return Err(err);
        }
        self.state.lock().positions.insert(mount, target);
        Ok(())
    }

    async fn aspirate(
        &self,
        mount: Mount,
        volume_ul: f64,
        flow_rate_ul_s: f64,
    ) -> Result<(), HardwareError> {
        let (failure, delay) = self.record(GantryCall::Aspirate {
            mount,
            volume_ul,
            flow_rate_ul_s,
        });
        self.settle(delay).await;
        failure.map_or(Ok(()), Err)
    }

    async fn dispense(
        &self,
        mount: Mount,
        volume_ul: f64,
        flow_rate_ul_s: f64,
    ) -> Result<(), HardwareError> {
        let (failure, delay) = self.record(GantryCall::Dispense {
            mount,
            volume_ul,
            flow_rate_ul_s,
        });
        self.settle(delay).await;
        failure.map_or(Ok(()), Err)
    }

    async fn pick_up_tip(&self, mount: Mount, target: DeckPoint) -> Result<(), HardwareError> {
        let (failure, delay) = self.record(GantryCall::PickUpTip { mount, target });
        self.settle(delay).await;
        if let Some(err) = failure {
            return Err(err);
        }
        self.state.lock().positions.insert(mount, target);
        Ok(())
    }

    async fn drop_tip(
        &self,
        mount: Mount,
        target: DeckPoint,
        flow_rate_scale: f64,
    ) -> Result<(), HardwareError> {
        let (failure, delay) = self.record(GantryCall::DropTip {
            mount,
            target,
            flow_rate_scale,
        });
        self.settle(delay).await;
        if let Some(err) = failure {
            return Err(err);
        }
        self.state.lock().positions.insert(mount, target);
        Ok(())
    }

    async fn read_pressure(&self, mount: Mount) -> Result<f64, HardwareError> {
        let (failure, delay) = self.record(GantryCall::ReadPressure { mount });
        self.settle(delay).await;
        if let Some(err) = failure {
            return Err(err);
        }
        let noise = rand::thread_rng().gen_range(-0.5..0.5);
        Ok(self.pressure_baseline_kpa + noise)
    }
}
