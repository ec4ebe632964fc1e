//! Labware definition model and catalog.
//!
//! Labware definitions are versioned JSON documents (namespace + load name +
//! version) describing a container's well layout and geometry. The engine
//! consumes them as validated input through a [`DefinitionCatalog`], the
//! narrow interface to the external definition loader: definitions are
//! registered up front and looked up by URI when a `LoadLabware` command
//! executes.

use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Parameters block of a labware definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabwareParameters {
    pub load_name: String,
    #[serde(default)]
    pub is_tiprack: bool,
    /// Nominal tip length for tip racks, in millimeters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tip_length: Option<f64>,
    #[serde(default)]
    pub quirks: Vec<String>,
}

/// Metadata block of a labware definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabwareMetadata {
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_category: Option<String>,
}

/// Geometry of a single well, positioned relative to the labware origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WellDefinition {
    pub depth: f64,
    /// Declared maximum volume, in microliters.
    pub total_liquid_volume: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diameter: Option<f64>,
}

/// A versioned, immutable labware definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabwareDefinition {
    pub namespace: String,
    pub version: u32,
    pub parameters: LabwareParameters,
    pub metadata: LabwareMetadata,
    /// Well names in column order: `ordering[c]` is column `c`, top row
    /// first. Drives tip selection and any well iteration.
    pub ordering: Vec<Vec<String>>,
    pub wells: HashMap<String, WellDefinition>,
}

impl LabwareDefinition {
    /// Parse a definition from a JSON byte slice.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ConfigurationError> {
        serde_json::from_slice(bytes)
            .map_err(|e| ConfigurationError::InvalidDefinition(e.to_string()))
    }

    /// Parse a definition from a JSON reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ConfigurationError> {
        serde_json::from_reader(reader)
            .map_err(|e| ConfigurationError::InvalidDefinition(e.to_string()))
    }

    /// The definition URI, unique for a namespace, load name, and version.
    pub fn uri(&self) -> String {
        uri_from_parts(&self.namespace, &self.parameters.load_name, self.version)
    }

    pub fn well(&self, well_name: &str) -> Option<&WellDefinition> {
        self.wells.get(well_name)
    }

    /// All well names in definition column order (column-major).
    pub fn ordered_wells(&self) -> impl Iterator<Item = &str> {
        self.ordering
            .iter()
            .flat_map(|column| column.iter().map(String::as_str))
    }

    /// Number of wells per column, 0 for a labware with no wells.
    pub fn column_height(&self) -> usize {
        self.ordering.first().map_or(0, Vec::len)
    }
}

/// Format a labware definition URI from its parts.
pub fn uri_from_parts(namespace: &str, load_name: &str, version: u32) -> String {
    format!("{namespace}/{load_name}/{version}")
}

/// Parse a labware definition URI into (namespace, load name, version).
pub fn parse_uri(uri: &str) -> Result<(String, String, u32), ConfigurationError> {
    let mut parts = uri.split('/');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(ns), Some(name), Some(version), None) if !ns.is_empty() && !name.is_empty() => {
            let version = version.parse::<u32>().map_err(|_| {
                ConfigurationError::InvalidDefinition(format!(
                    "labware URI {uri} has a non-numeric version"
                ))
            })?;
            Ok((ns.to_string(), name.to_string(), version))
        }
        _ => Err(ConfigurationError::InvalidDefinition(format!(
            "labware URI {uri} is not namespace/loadName/version"
        ))),
    }
}

/// In-memory registry of labware definitions, keyed by URI.
///
/// This is the engine's view of the external definition loader. Missing
/// definitions are a configuration error, not a runtime-recoverable one.
#[derive(Debug, Clone, Default)]
pub struct DefinitionCatalog {
    definitions: HashMap<String, Arc<LabwareDefinition>>,
}

impl DefinitionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition, returning the shared handle. Re-registering
    /// the same URI replaces the previous entry.
    pub fn insert(&mut self, definition: LabwareDefinition) -> Arc<LabwareDefinition> {
        let handle = Arc::new(definition);
        self.definitions.insert(handle.uri(), Arc::clone(&handle));
        handle
    }

    /// Look up a definition by its parts.
    pub fn get(
        &self,
        namespace: &str,
        load_name: &str,
        version: u32,
    ) -> Result<Arc<LabwareDefinition>, ConfigurationError> {
        let uri = uri_from_parts(namespace, load_name, version);
        self.definitions.get(&uri).cloned().ok_or(
            ConfigurationError::LabwareDefinitionNotFound { uri },
        )
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
