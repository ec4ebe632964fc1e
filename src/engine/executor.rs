//! The executor task: strict-FIFO command processing against the state
//! stores and the hardware.
//!
//! One executor task exists per run and is the only writer to the entity
//! stores. Per-command cycle: mark running → validate and execute against a
//! state snapshot (no lock held across hardware awaits) → on success commit
//! all state changes atomically and record the result → on failure record
//! the structured error and apply the run's recovery policy.
//!
//! Pause/stop/finish requests are observed only at command boundaries; an
//! in-flight hardware operation always runs to completion before the run
//! transitions.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use super::{EngineShared, RunStatus};
use crate::commands::{self, Command, FailurePolicy};
use crate::config::EngineSettings;
use crate::hardware::GantryController;
use crate::labware::DefinitionCatalog;

pub(crate) struct Executor {
    shared: Arc<EngineShared>,
    hardware: Arc<dyn GantryController>,
    catalog: DefinitionCatalog,
    settings: EngineSettings,
}

impl Executor {
    pub(crate) fn new(
        shared: Arc<EngineShared>,
        hardware: Arc<dyn GantryController>,
        catalog: DefinitionCatalog,
        settings: EngineSettings,
    ) -> Self {
        Self {
            shared,
            hardware,
            catalog,
            settings,
        }
    }

    fn status(&self) -> RunStatus {
        *self.shared.status_tx.borrow()
    }

    fn set_status(&self, status: RunStatus) {
        self.shared.status_tx.send_replace(status);
    }

    pub(crate) async fn run(self) {
        info!("command executor started");
        loop {
            // Arm the wakeup BEFORE checking state so a notify between the
            // check and the await is never lost.
            let wake = self.shared.wake.notified();

            let flags = *self.shared.control.lock();
            if flags.stop_requested {
                self.finalize(RunStatus::Stopped);
                break;
            }
            if flags.pause_requested {
                if self.status().can_pause() {
                    self.set_status(RunStatus::Paused);
                    info!("run paused");
                }
                wake.await;
                continue;
            }
            if self.status().can_resume() {
                self.set_status(RunStatus::Running);
                info!("run resumed");
            }

            let next = self.shared.log.write().start_next(Utc::now());
            match next {
                Some(command) => {
                    if self.status() == RunStatus::Idle {
                        self.set_status(RunStatus::Running);
                    }
                    if self.execute_command(command).await {
                        self.finalize(RunStatus::Failed);
                        break;
                    }
                }
                None => {
                    if flags.finish_requested {
                        self.finalize(RunStatus::Succeeded);
                        break;
                    }
                    wake.await;
                }
            }
        }
    }

    /// Execute one command. Returns `true` when the failure policy says the
    /// run must fail.
    async fn execute_command(&self, command: Command) -> bool {
        info!(
            command_id = %command.id,
            command_type = command.params.command_type(),
            "executing command"
        );

        // Snapshot the stores; the hardware phase runs without any lock.
        let snapshot = self.shared.state.read().clone();
        let outcome = commands::dispatch(
            &command.params,
            &snapshot,
            self.hardware.as_ref(),
            &self.catalog,
            &self.settings,
        )
        .await;

        match outcome {
            Ok(outcome) => {
                {
                    let mut state = self.shared.state.write();
                    state.apply_all(&outcome.changes);
                }
                self.shared
                    .log
                    .write()
                    .succeed(&command.id, outcome.result, Utc::now());
                self.shared.completion.notify_waiters();
                info!(command_id = %command.id, "command succeeded");
                false
            }
            Err(err) => {
                warn!(
                    command_id = %command.id,
                    kind = ?err.kind(),
                    %err,
                    "command failed"
                );
                self.shared.log.write().fail(&command.id, err, Utc::now());
                self.shared.completion.notify_waiters();

                match command.failure_policy {
                    FailurePolicy::ContinueRun => {
                        info!(command_id = %command.id, "continuing run past non-fatal failure");
                        false
                    }
                    FailurePolicy::FailRun => true,
                }
            }
        }
    }

    /// Transition the run to a terminal status, failing anything still
    /// queued. The stores keep their last successfully committed state.
    fn finalize(&self, status: RunStatus) {
        let remaining = {
            let mut log = self.shared.log.write();
            log.closed = true;
            log.fail_remaining(Utc::now())
        };
        if remaining > 0 {
            warn!(count = remaining, "run ended with commands still queued");
        }
        self.set_status(status);
        self.shared.completion.notify_waiters();
        match status {
            RunStatus::Failed => error!(%status, "run finished"),
            _ => info!(%status, "run finished"),
        }
    }
}
