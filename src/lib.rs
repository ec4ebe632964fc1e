//! # Protocol Engine
//!
//! A command-sourced execution engine for laboratory liquid-handling
//! robots. A run is an ordered, append-only log of declarative commands
//! (load labware, load liquid, aspirate, move, ...); each command is
//! validated against the current model of robot/deck/labware/liquid state,
//! executed against an async hardware abstraction, and its state changes
//! are committed atomically before the next command starts.
//!
//! ## Crate Structure
//!
//! - **`deck`**: deck definition model and the pure geometry resolver that
//!   maps addressable-area names to cutouts, candidate fixtures, and
//!   absolute positions.
//! - **`labware`**: labware definition model and the definition catalog
//!   (the narrow interface to the external definition loader).
//! - **`state`**: per-domain entity stores (labware, liquids, tips,
//!   pipettes, modules, deck configuration) behind a single-writer
//!   mutation discipline.
//! - **`commands`**: one module per command kind, each with its parameter
//!   and result schemas and a validate-then-execute implementation,
//!   dispatched through a closed sum type.
//! - **`engine`**: the [`engine::ProtocolEngine`] handle and the executor
//!   task: strict-FIFO execution, pause/resume/stop/finish, run history,
//!   and read-only introspection.
//! - **`hardware`**: the async [`hardware::GantryController`] seam, typed
//!   hardware errors, timeout wrapping, and a mock gantry for tests.
//! - **`config`**: explicit engine settings loaded from TOML; no ambient
//!   globals.
//! - **`error`**: the configuration/validation/hardware/resource error
//!   taxonomy the recovery policy dispatches on.
//! - **`validation`**: small reusable parameter checks.

pub mod commands;
pub mod config;
pub mod deck;
pub mod engine;
pub mod error;
pub mod hardware;
pub mod labware;
pub mod state;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_support;

pub use commands::{Command, CommandParams, CommandResult, CommandStatus, FailurePolicy};
pub use config::EngineSettings;
pub use engine::{ProtocolEngine, RunStatus};
pub use error::{EngineError, EngineResult, ErrorKind};
pub use hardware::{GantryController, HardwareError, MockGantry, Mount};
pub use labware::DefinitionCatalog;
