//! Command definitions and implementations.
//!
//! Every command kind is a variant of the closed [`CommandParams`] /
//! [`CommandResult`] sum types, dispatched through one exhaustive match in
//! [`dispatch`]. Adding a command kind without an implementation is a
//! compile error; there is no runtime registration.
//!
//! # Execution contract
//!
//! `execute(params, state, hardware, ...) -> Result<CommandOutcome, EngineError>`
//!
//! Implementations validate against a read-only state snapshot BEFORE any
//! hardware call, drive the gantry through the async trait, and return the
//! result together with the [`StateChange`]s describing their effect. They
//! never mutate the stores; the executor commits the changes atomically
//! after the command succeeds. A failed command therefore leaves no partial
//! mutation behind.

pub mod add_liquid;
pub mod aspirate;
pub mod comment;
pub mod configure_fixture;
pub mod dispense;
pub mod drop_tip;
pub mod home;
pub mod load_labware;
pub mod load_liquid;
pub mod load_module;
pub mod load_pipette;
pub mod move_labware;
pub mod move_to_area;
pub mod move_to_well;
pub mod pick_up_tip;
pub mod wait_for_duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::EngineSettings;
use crate::deck::DeckPoint;
use crate::error::{EngineError, EngineResult, ErrorKind, ValidationError};
use crate::hardware::GantryController;
use crate::labware::{DefinitionCatalog, WellDefinition};
use crate::state::{EngineState, LabwareLocation, StateChange};

pub use add_liquid::{AddLiquidParams, AddLiquidResult};
pub use aspirate::{AspirateParams, AspirateResult};
pub use comment::{CommentParams, CommentResult};
pub use configure_fixture::{ConfigureFixtureParams, ConfigureFixtureResult};
pub use dispense::{DispenseParams, DispenseResult};
pub use drop_tip::{DropTipParams, DropTipResult, DropTipTarget};
pub use home::{HomeParams, HomeResult};
pub use load_labware::{LoadLabwareParams, LoadLabwareResult};
pub use load_liquid::{LoadLiquidParams, LoadLiquidResult};
pub use load_module::{LoadModuleParams, LoadModuleResult};
pub use load_pipette::{LoadPipetteParams, LoadPipetteResult};
pub use move_labware::{MoveLabwareParams, MoveLabwareResult, MoveLabwareStrategy};
pub use move_to_area::{MoveToAddressableAreaParams, MoveToAddressableAreaResult};
pub use move_to_well::{MoveToWellParams, MoveToWellResult};
pub use pick_up_tip::{PickUpTipParams, PickUpTipResult};
pub use wait_for_duration::{WaitForDurationParams, WaitForDurationResult};

/// Lifecycle status of a command in the run log.
///
/// The vocabulary and its serialized form are contractual; boundary layers
/// may serialize the log but must preserve these states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommandStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl CommandStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CommandStatus::Succeeded | CommandStatus::Failed)
    }
}

impl std::fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandStatus::Queued => write!(f, "queued"),
            CommandStatus::Running => write!(f, "running"),
            CommandStatus::Succeeded => write!(f, "succeeded"),
            CommandStatus::Failed => write!(f, "failed"),
        }
    }
}

/// What the run should do when this command fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailurePolicy {
    /// Fail the whole run (default).
    #[default]
    FailRun,
    /// Record the failure and keep executing subsequent commands.
    ContinueRun,
}

/// Parameters of every known command kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "commandType", content = "params", rename_all = "camelCase")]
pub enum CommandParams {
    AddLiquid(AddLiquidParams),
    ConfigureFixture(ConfigureFixtureParams),
    LoadLabware(LoadLabwareParams),
    MoveLabware(MoveLabwareParams),
    LoadPipette(LoadPipetteParams),
    LoadModule(LoadModuleParams),
    LoadLiquid(LoadLiquidParams),
    PickUpTip(PickUpTipParams),
    DropTip(DropTipParams),
    Aspirate(AspirateParams),
    Dispense(DispenseParams),
    MoveToWell(MoveToWellParams),
    MoveToAddressableArea(MoveToAddressableAreaParams),
    Home(HomeParams),
    WaitForDuration(WaitForDurationParams),
    Comment(CommentParams),
}

impl CommandParams {
    /// The wire name of the command kind.
    pub fn command_type(&self) -> &'static str {
        match self {
            CommandParams::AddLiquid(_) => "addLiquid",
            CommandParams::ConfigureFixture(_) => "configureFixture",
            CommandParams::LoadLabware(_) => "loadLabware",
            CommandParams::MoveLabware(_) => "moveLabware",
            CommandParams::LoadPipette(_) => "loadPipette",
            CommandParams::LoadModule(_) => "loadModule",
            CommandParams::LoadLiquid(_) => "loadLiquid",
            CommandParams::PickUpTip(_) => "pickUpTip",
            CommandParams::DropTip(_) => "dropTip",
            CommandParams::Aspirate(_) => "aspirate",
            CommandParams::Dispense(_) => "dispense",
            CommandParams::MoveToWell(_) => "moveToWell",
            CommandParams::MoveToAddressableArea(_) => "moveToAddressableArea",
            CommandParams::Home(_) => "home",
            CommandParams::WaitForDuration(_) => "waitForDuration",
            CommandParams::Comment(_) => "comment",
        }
    }
}

/// Result payload of every known command kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CommandResult {
    AddLiquid(AddLiquidResult),
    ConfigureFixture(ConfigureFixtureResult),
    LoadLabware(LoadLabwareResult),
    MoveLabware(MoveLabwareResult),
    LoadPipette(LoadPipetteResult),
    LoadModule(LoadModuleResult),
    LoadLiquid(LoadLiquidResult),
    PickUpTip(PickUpTipResult),
    DropTip(DropTipResult),
    Aspirate(AspirateResult),
    Dispense(DispenseResult),
    MoveToWell(MoveToWellResult),
    MoveToAddressableArea(MoveToAddressableAreaResult),
    Home(HomeResult),
    WaitForDuration(WaitForDurationResult),
    Comment(CommentResult),
}

/// Structured record of a command failure, kept in the log.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandFailure {
    pub kind: ErrorKind,
    pub error: EngineError,
    pub failed_at: DateTime<Utc>,
}

/// An immutable record in the run's append-only command log.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    pub id: String,
    /// Optional client-supplied correlation key, carried opaquely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub status: CommandStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub params: CommandParams,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<CommandResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CommandFailure>,
    pub failure_policy: FailurePolicy,
}

/// A successful execution: the result plus the state changes to commit.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutcome {
    pub result: CommandResult,
    pub changes: Vec<StateChange>,
}

impl CommandOutcome {
    pub fn new(result: CommandResult) -> Self {
        Self {
            result,
            changes: Vec::new(),
        }
    }

    pub fn with_changes(result: CommandResult, changes: Vec<StateChange>) -> Self {
        Self { result, changes }
    }
}

/// Execute a command against a state snapshot and the hardware.
///
/// The single dispatch point: exhaustive over every command kind.
pub(crate) async fn dispatch(
    params: &CommandParams,
    state: &EngineState,
    hardware: &dyn GantryController,
    catalog: &DefinitionCatalog,
    settings: &EngineSettings,
) -> EngineResult<CommandOutcome> {
    match params {
        CommandParams::AddLiquid(p) => add_liquid::execute(p, state),
        CommandParams::ConfigureFixture(p) => configure_fixture::execute(p, state),
        CommandParams::LoadLabware(p) => load_labware::execute(p, state, catalog),
        CommandParams::MoveLabware(p) => move_labware::execute(p, state, hardware, settings).await,
        CommandParams::LoadPipette(p) => load_pipette::execute(p, state),
        CommandParams::LoadModule(p) => load_module::execute(p, state),
        CommandParams::LoadLiquid(p) => load_liquid::execute(p, state),
        CommandParams::PickUpTip(p) => pick_up_tip::execute(p, state, hardware, settings).await,
        CommandParams::DropTip(p) => drop_tip::execute(p, state, hardware, settings).await,
        CommandParams::Aspirate(p) => aspirate::execute(p, state, hardware, settings).await,
        CommandParams::Dispense(p) => dispense::execute(p, state, hardware, settings).await,
        CommandParams::MoveToWell(p) => move_to_well::execute(p, state, hardware, settings).await,
        CommandParams::MoveToAddressableArea(p) => {
            move_to_area::execute(p, state, hardware, settings).await
        }
        CommandParams::Home(p) => home::execute(p, hardware, settings).await,
        CommandParams::WaitForDuration(p) => wait_for_duration::execute(p).await,
        CommandParams::Comment(p) => comment::execute(p),
    }
}

/// An addressable-area resolution: the origin point plus any cache-insert
/// change the resolution produced.
pub(crate) struct ResolvedOrigin {
    pub origin: DeckPoint,
    pub changes: Vec<StateChange>,
}

/// Resolve an addressable area to its origin, recording a cache insert when
/// this is the run's first reference to the area.
pub(crate) fn resolve_area_origin(
    state: &EngineState,
    area_name: &str,
) -> EngineResult<ResolvedOrigin> {
    let was_cached = state.deck.cached_area(area_name).is_some();
    let area = state.deck.resolve_area(area_name)?;
    let origin = area.position;
    let changes = if was_cached {
        Vec::new()
    } else {
        vec![StateChange::AreaResolved { area }]
    };
    Ok(ResolvedOrigin { origin, changes })
}

/// Resolve a loaded labware's origin on the deck, following a module
/// location to the module's slot.
pub(crate) fn resolve_labware_origin(
    state: &EngineState,
    labware_id: &str,
) -> EngineResult<ResolvedOrigin> {
    let labware = state.labware.get(labware_id)?;
    match &labware.location {
        LabwareLocation::AddressableArea { area_name } => resolve_area_origin(state, area_name),
        LabwareLocation::Module { module_id } => {
            let module = state.modules.get(module_id)?;
            resolve_area_origin(state, &module.area_name)
        }
        LabwareLocation::OffDeck => Err(ValidationError::InvalidParameter {
            field: "labwareId".into(),
            reason: format!("labware {labware_id} is off-deck"),
        }
        .into()),
    }
}

/// Absolute position of a well's top center.
pub(crate) fn well_top(origin: DeckPoint, well: &WellDefinition) -> DeckPoint {
    DeckPoint::new(
        origin.x + well.x,
        origin.y + well.y,
        origin.z + well.z + well.depth,
    )
}

/// Absolute position of a well's bottom center.
pub(crate) fn well_bottom(origin: DeckPoint, well: &WellDefinition) -> DeckPoint {
    DeckPoint::new(origin.x + well.x, origin.y + well.y, origin.z + well.z)
}
