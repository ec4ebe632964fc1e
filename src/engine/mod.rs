//! Protocol engine: command submission, the run state machine, and
//! read-only introspection.
//!
//! # Architecture
//!
//! ```text
//! Producers ──submit()──> CommandLog (append-only, creation order)
//!                              │
//!                              ▼
//!                      Executor task (single writer)
//!                              │  dispatch → hardware → commit changes
//!                              ▼
//!                        EngineState slices
//! ```
//!
//! The [`ProtocolEngine`] handle is the boundary for producers (the protocol
//! API surface) and for introspection (analysis, UI). Submission assigns an
//! id and creation timestamp under the log lock and returns synchronously;
//! execution is asynchronous and strictly FIFO in creation order. All state
//! writes happen on the executor task; introspection reads snapshots and is
//! safe to call concurrently with an active run.

mod executor;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

use crate::commands::{
    Command, CommandFailure, CommandParams, CommandResult, CommandStatus, FailurePolicy,
};
use crate::config::EngineSettings;
use crate::deck::DeckDefinition;
use crate::error::{
    EngineError, EngineResult, RunControlError, ValidationError,
};
use crate::hardware::GantryController;
use crate::labware::DefinitionCatalog;
use crate::state::EngineState;

use executor::Executor;

/// Lifecycle state of a run.
///
/// ```text
/// Idle ──first command──> Running ──finish + drained──> Succeeded
///                           │  ▲
///                      pause│  │resume
///                           ▼  │
///                          Paused
///                           │
///        stop ──────────────┴──> Stopped
///        unrecoverable error ──> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RunStatus {
    /// No command has started yet.
    Idle,
    /// Commands are executing.
    Running,
    /// Paused between commands; resumable.
    Paused,
    /// Queue drained after `finish()` with no fatal error.
    Succeeded,
    /// Explicit stop, or a recoverable-error policy ran out.
    Stopped,
    /// An unrecoverable command error ended the run.
    Failed,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Succeeded | RunStatus::Stopped | RunStatus::Failed
        )
    }

    pub fn can_pause(&self) -> bool {
        matches!(self, RunStatus::Running)
    }

    pub fn can_resume(&self) -> bool {
        matches!(self, RunStatus::Paused)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Idle => write!(f, "Idle"),
            RunStatus::Running => write!(f, "Running"),
            RunStatus::Paused => write!(f, "Paused"),
            RunStatus::Succeeded => write!(f, "Succeeded"),
            RunStatus::Stopped => write!(f, "Stopped"),
            RunStatus::Failed => write!(f, "Failed"),
        }
    }
}

/// Pending control requests, observed by the executor only at command
/// boundaries.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ControlFlags {
    pub(crate) pause_requested: bool,
    pub(crate) stop_requested: bool,
    pub(crate) finish_requested: bool,
}

/// The run's append-only command log.
///
/// Creation order is execution order; the cursor tracks the next command to
/// execute. Entries are never removed or reordered.
#[derive(Debug, Default)]
pub(crate) struct CommandLog {
    commands: Vec<Command>,
    index: HashMap<String, usize>,
    cursor: usize,
    pub(crate) closed: bool,
}

impl CommandLog {
    pub(crate) fn push(&mut self, command: Command) {
        self.index.insert(command.id.clone(), self.commands.len());
        self.commands.push(command);
    }

    pub(crate) fn get(&self, command_id: &str) -> Option<&Command> {
        self.index.get(command_id).map(|&i| &self.commands[i])
    }

    pub(crate) fn all(&self) -> &[Command] {
        &self.commands
    }

    /// Commands waiting to execute.
    pub(crate) fn queued_len(&self) -> usize {
        self.commands.len() - self.cursor
    }

    /// Mark the next queued command running and return a working copy.
    pub(crate) fn start_next(&mut self, now: DateTime<Utc>) -> Option<Command> {
        let command = self.commands.get_mut(self.cursor)?;
        command.status = CommandStatus::Running;
        command.started_at = Some(now);
        self.cursor += 1;
        Some(command.clone())
    }

    pub(crate) fn succeed(&mut self, command_id: &str, result: CommandResult, now: DateTime<Utc>) {
        if let Some(&i) = self.index.get(command_id) {
            let command = &mut self.commands[i];
            command.status = CommandStatus::Succeeded;
            command.result = Some(result);
            command.completed_at = Some(now);
        }
    }

    pub(crate) fn fail(&mut self, command_id: &str, error: EngineError, now: DateTime<Utc>) {
        if let Some(&i) = self.index.get(command_id) {
            let command = &mut self.commands[i];
            command.status = CommandStatus::Failed;
            command.error = Some(CommandFailure {
                kind: error.kind(),
                error,
                failed_at: now,
            });
            command.completed_at = Some(now);
        }
    }

    /// Fail every still-queued command because the run ended; returns how
    /// many were marked.
    pub(crate) fn fail_remaining(&mut self, now: DateTime<Utc>) -> usize {
        let mut failed = 0;
        while self.cursor < self.commands.len() {
            let command = &mut self.commands[self.cursor];
            command.status = CommandStatus::Failed;
            command.error = Some(CommandFailure {
                kind: crate::error::ErrorKind::RunControl,
                error: RunControlError::RunEnded.into(),
                failed_at: now,
            });
            command.completed_at = Some(now);
            self.cursor += 1;
            failed += 1;
        }
        failed
    }
}

/// State shared between the engine handle and the executor task.
pub(crate) struct EngineShared {
    pub(crate) state: RwLock<EngineState>,
    pub(crate) log: RwLock<CommandLog>,
    pub(crate) control: Mutex<ControlFlags>,
    pub(crate) status_tx: watch::Sender<RunStatus>,
    /// Wakes the executor on new commands or control changes.
    pub(crate) wake: Notify,
    /// Wakes `wait_for` callers when any command reaches a terminal status.
    pub(crate) completion: Notify,
}

/// Handle to one protocol run.
///
/// Owns the executor task; dropping the handle aborts the run.
pub struct ProtocolEngine {
    shared: Arc<EngineShared>,
    settings: EngineSettings,
    task: JoinHandle<()>,
}

impl ProtocolEngine {
    /// Construct an engine for one run and spawn its executor task.
    ///
    /// Must be called from within a tokio runtime. `installed_fixtures`
    /// maps each cutout id to the fixture currently installed on it, per
    /// the robot's deck configuration.
    pub fn new(
        settings: EngineSettings,
        deck_definition: Arc<DeckDefinition>,
        installed_fixtures: BTreeMap<String, String>,
        catalog: DefinitionCatalog,
        hardware: Arc<dyn GantryController>,
    ) -> Self {
        let shared = Arc::new(EngineShared {
            state: RwLock::new(EngineState::new(deck_definition, installed_fixtures)),
            log: RwLock::new(CommandLog::default()),
            control: Mutex::new(ControlFlags::default()),
            status_tx: watch::channel(RunStatus::Idle).0,
            wake: Notify::new(),
            completion: Notify::new(),
        });

        let executor = Executor::new(
            Arc::clone(&shared),
            hardware,
            catalog,
            settings.clone(),
        );
        let task = tokio::spawn(executor.run());

        Self {
            shared,
            settings,
            task,
        }
    }

    /// Queue a command with the default failure policy.
    ///
    /// Assigns an id and creation timestamp, appends to the run's command
    /// log, and returns the id synchronously; execution is asynchronous.
    /// Safe to call from multiple producers concurrently: log order under
    /// the submission lock is execution order.
    pub fn submit(&self, params: CommandParams) -> EngineResult<String> {
        self.submit_command(params, None, None)
    }

    /// Queue a command with an explicit per-command failure policy.
    pub fn submit_with_policy(
        &self,
        params: CommandParams,
        policy: FailurePolicy,
    ) -> EngineResult<String> {
        self.submit_command(params, None, Some(policy))
    }

    /// Queue a command, optionally carrying a client correlation key and a
    /// per-command failure policy.
    pub fn submit_command(
        &self,
        params: CommandParams,
        key: Option<String>,
        policy: Option<FailurePolicy>,
    ) -> EngineResult<String> {
        let mut log = self.shared.log.write();
        if log.closed || self.status().is_terminal() {
            return Err(RunControlError::QueueClosed.into());
        }
        if log.queued_len() >= self.settings.max_queued_commands {
            return Err(RunControlError::QueueFull {
                capacity: self.settings.max_queued_commands,
            }
            .into());
        }

        let id = Uuid::new_v4().to_string();
        debug!(command_id = %id, command_type = params.command_type(), "command queued");
        log.push(Command {
            id: id.clone(),
            key,
            status: CommandStatus::Queued,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            params,
            result: None,
            error: None,
            failure_policy: policy.unwrap_or(self.settings.default_failure_policy),
        });
        drop(log);

        self.shared.wake.notify_one();
        Ok(id)
    }

    /// Request a pause. The in-flight command finishes first; the pause
    /// takes effect at the next command boundary.
    pub fn pause(&self) {
        self.shared.control.lock().pause_requested = true;
        self.shared.wake.notify_one();
    }

    /// Resume a paused run.
    pub fn resume(&self) {
        self.shared.control.lock().pause_requested = false;
        self.shared.wake.notify_one();
    }

    /// Stop the run after the in-flight command completes. Remaining queued
    /// commands are failed with a run-ended error.
    pub fn stop(&self) {
        {
            let mut control = self.shared.control.lock();
            control.stop_requested = true;
            control.pause_requested = false;
        }
        self.shared.wake.notify_one();
    }

    /// Close command intake. Once the queue drains the run succeeds.
    pub fn finish(&self) {
        self.shared.log.write().closed = true;
        self.shared.control.lock().finish_requested = true;
        self.shared.wake.notify_one();
    }

    /// Current run status.
    pub fn status(&self) -> RunStatus {
        *self.shared.status_tx.borrow()
    }

    /// Subscribe to run status transitions.
    pub fn watch_status(&self) -> watch::Receiver<RunStatus> {
        self.shared.status_tx.subscribe()
    }

    /// One command by id, with its current status/result/error.
    pub fn command(&self, command_id: &str) -> Option<Command> {
        self.shared.log.read().get(command_id).cloned()
    }

    /// The full command log in creation order.
    pub fn commands(&self) -> Vec<Command> {
        self.shared.log.read().all().to_vec()
    }

    /// A point-in-time snapshot of every entity store.
    pub fn state_snapshot(&self) -> EngineState {
        self.shared.state.read().clone()
    }

    /// Next available tip in a rack under the given pickup width, without
    /// consuming it. `None` means the rack is exhausted.
    pub fn next_tip(
        &self,
        labware_id: &str,
        num_tips: usize,
        starting_tip: Option<&str>,
    ) -> EngineResult<Option<String>> {
        Ok(self
            .shared
            .state
            .read()
            .tips
            .get_next_tip(labware_id, num_tips, starting_tip)?)
    }

    /// Wait until the command reaches `succeeded` or `failed` and return
    /// its final record.
    pub async fn wait_for(&self, command_id: &str) -> EngineResult<Command> {
        loop {
            let notified = self.shared.completion.notified();
            {
                let log = self.shared.log.read();
                match log.get(command_id) {
                    None => {
                        return Err(ValidationError::InvalidParameter {
                            field: "commandId".into(),
                            reason: format!("unknown command {command_id}"),
                        }
                        .into())
                    }
                    Some(command) if command.status.is_terminal() => {
                        return Ok(command.clone());
                    }
                    Some(_) => {}
                }
            }
            notified.await;
        }
    }

    /// Wait for the run to reach a terminal status.
    pub async fn wait_until_complete(&self) -> RunStatus {
        let mut rx = self.shared.status_tx.subscribe();
        loop {
            let status = *rx.borrow_and_update();
            if status.is_terminal() {
                return status;
            }
            if rx.changed().await.is_err() {
                return *rx.borrow();
            }
        }
    }
}

impl Drop for ProtocolEngine {
    fn drop(&mut self) {
        self.task.abort();
    }
}
