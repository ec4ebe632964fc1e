//! Error types for the protocol engine.
//!
//! The engine distinguishes four families of failure, because the run-level
//! recovery policy dispatches on them:
//!
//! - **`Configuration`**: the deck definition, labware catalog, or settings
//!   are wrong. Fatal at resolution time, never retryable, and surfaced to
//!   whoever triggered resolution.
//! - **`Validation`**: a command's parameters are inconsistent with current
//!   state (volume over capacity, undeclared liquid, unknown well). Fails
//!   the single command with the offending values; state is never partially
//!   mutated.
//! - **`Hardware`**: the gantry reported a physical fault (overpressure,
//!   stall, tip-presence mismatch) or a call timed out. May be retryable
//!   depending on policy; see [`crate::hardware::HardwareError`].
//! - **`ResourceExhausted`**: tips or liquid ran out. Recoverable with
//!   operator intervention, distinct from a bug-class error.
//!
//! All variants carry the offending ids and expected-vs-actual values so a
//! client can render an actionable message without inspecting engine
//! internals. Every error type here is `Clone + PartialEq + Serialize` so
//! failures can live in the append-only command log and in snapshots.

use serde::Serialize;
use thiserror::Error;

use crate::hardware::HardwareError;

/// Convenience alias for results using the engine error type.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Coarse error family, used by the executor's recovery policy to decide
/// what to do with a failed command without string matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    Configuration,
    Validation,
    Hardware,
    Timeout,
    ResourceExhausted,
    RunControl,
}

/// Top-level engine error.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
pub enum EngineError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Hardware(#[from] HardwareError),

    #[error(transparent)]
    ResourceExhausted(#[from] ResourceError),

    #[error(transparent)]
    RunControl(#[from] RunControlError),
}

impl EngineError {
    /// The error family, with hardware timeouts reported as their own kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Configuration(_) => ErrorKind::Configuration,
            EngineError::Validation(_) => ErrorKind::Validation,
            EngineError::Hardware(HardwareError::Timeout { .. }) => ErrorKind::Timeout,
            EngineError::Hardware(_) => ErrorKind::Hardware,
            EngineError::ResourceExhausted(_) => ErrorKind::ResourceExhausted,
            EngineError::RunControl(_) => ErrorKind::RunControl,
        }
    }
}

/// Deck, definition, and settings problems. Fatal at resolution time.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ConfigurationError {
    #[error("could not find cutout {cutout_id}")]
    CutoutDoesNotExist { cutout_id: String },

    #[error("could not find cutout fixture {cutout_fixture_id}")]
    FixtureDoesNotExist { cutout_fixture_id: String },

    #[error("could not find addressable area {addressable_area_name}")]
    AddressableAreaDoesNotExist { addressable_area_name: String },

    #[error("cutout fixture {cutout_fixture_id} does not provide addressable areas for {cutout_id}")]
    FixtureDoesNotProvideAreas {
        cutout_fixture_id: String,
        cutout_id: String,
    },

    #[error("addressable area {addressable_area_name} is provided on more than one cutout; the deck definition is malformed")]
    AreaOwnedByMultipleCutouts { addressable_area_name: String },

    #[error("no installed fixture on {cutout_id} provides addressable area {addressable_area_name}")]
    FixtureNotConfigured {
        addressable_area_name: String,
        cutout_id: String,
    },

    #[error("no labware definition for {uri} in the catalog")]
    LabwareDefinitionNotFound { uri: String },

    #[error("invalid deck or labware definition: {0}")]
    InvalidDefinition(String),

    #[error("invalid engine settings: {0}")]
    InvalidSettings(String),
}

/// Command-parameter problems detected against current state. Fail the one
/// command; never reach the hardware layer.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ValidationError {
    #[error("liquid {liquid_id} has not been declared")]
    LiquidDoesNotExist { liquid_id: String },

    #[error("liquid {liquid_id} is already declared")]
    LiquidAlreadyDeclared { liquid_id: String },

    #[error("labware {labware_id} does not exist")]
    LabwareDoesNotExist { labware_id: String },

    #[error("labware {labware_id} has no well named {well_name}")]
    WellDoesNotExist {
        labware_id: String,
        well_name: String,
    },

    #[error(
        "well {well_name} allows a max volume of {max_volume_ul}\u{b5}L but it already holds \
         {existing_volume_ul}\u{b5}L and {attempted_volume_ul}\u{b5}L was loaded"
    )]
    InvalidLoadVolume {
        well_name: String,
        max_volume_ul: f64,
        existing_volume_ul: f64,
        attempted_volume_ul: f64,
    },

    #[error("labware {labware_id} is a tip rack and cannot hold liquid")]
    LiquidNotAllowedInLabware { labware_id: String },

    #[error("location {location} is already occupied")]
    LocationOccupied { location: String },

    #[error("mount {mount} already has a pipette attached")]
    MountOccupied { mount: String },

    #[error("pipette {pipette_id} does not exist")]
    PipetteDoesNotExist { pipette_id: String },

    #[error("{pipette_name} is not a known pipette model")]
    PipetteNameUnknown { pipette_name: String },

    #[error("module {module_id} does not exist")]
    ModuleDoesNotExist { module_id: String },

    #[error("labware {labware_id} is not a tip rack")]
    NotATipRack { labware_id: String },

    #[error("tip {well_name} in rack {labware_id} has already been used")]
    TipAlreadyUsed {
        labware_id: String,
        well_name: String,
    },

    #[error("pipette {pipette_id} has no tip attached")]
    TipNotAttached { pipette_id: String },

    #[error("pipette {pipette_id} already has a tip attached")]
    TipAlreadyAttached { pipette_id: String },

    #[error("volume must be greater than zero, got {volume_ul}\u{b5}L")]
    InvalidVolume { volume_ul: f64 },

    #[error(
        "pipette {pipette_id} can take up {available_ul}\u{b5}L more but {requested_ul}\u{b5}L was requested"
    )]
    VolumeExceedsPipette {
        pipette_id: String,
        available_ul: f64,
        requested_ul: f64,
    },

    #[error(
        "pipette {pipette_id} holds {aspirated_ul}\u{b5}L but {requested_ul}\u{b5}L was requested to dispense"
    )]
    VolumeExceedsAspirated {
        pipette_id: String,
        aspirated_ul: f64,
        requested_ul: f64,
    },

    #[error("invalid {field}: {reason}")]
    InvalidParameter { field: String, reason: String },
}

/// A consumable ran out. Requires operator intervention, then the command
/// can be retried.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceError {
    #[error("tip rack {labware_id} has no tips remaining")]
    NoTipsAvailable { labware_id: String },

    #[error(
        "well {well_name} in {labware_id} holds {available_ul}\u{b5}L but {requested_ul}\u{b5}L was requested"
    )]
    WellUnderfilled {
        labware_id: String,
        well_name: String,
        available_ul: f64,
        requested_ul: f64,
    },
}

/// Run-lifecycle failures that are not a property of the command itself.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RunControlError {
    #[error("the run is no longer accepting commands")]
    QueueClosed,

    #[error("the command queue is full ({capacity} commands waiting)")]
    QueueFull { capacity: usize },

    #[error("the run ended before this command executed")]
    RunEnded,
}
