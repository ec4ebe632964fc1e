//! Module state slice: powered deck fixtures (temperature modules,
//! heater-shakers, and the like) loaded for the run.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Known module hardware models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ModuleModel {
    TemperatureModuleV2,
    MagneticBlockV1,
    HeaterShakerModuleV1,
    ThermocyclerModuleV2,
}

impl std::fmt::Display for ModuleModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModuleModel::TemperatureModuleV2 => write!(f, "temperatureModuleV2"),
            ModuleModel::MagneticBlockV1 => write!(f, "magneticBlockV1"),
            ModuleModel::HeaterShakerModuleV1 => write!(f, "heaterShakerModuleV1"),
            ModuleModel::ThermocyclerModuleV2 => write!(f, "thermocyclerModuleV2"),
        }
    }
}

/// A module loaded at a deck location.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadedModule {
    pub id: String,
    pub model: ModuleModel,
    /// Addressable area name of the slot the module occupies.
    pub area_name: String,
}

/// Authoritative model of loaded modules.
#[derive(Debug, Clone, Default)]
pub struct ModuleStore {
    modules: HashMap<String, LoadedModule>,
}

impl ModuleStore {
    pub fn get(&self, module_id: &str) -> Result<&LoadedModule, ValidationError> {
        self.modules
            .get(module_id)
            .ok_or_else(|| ValidationError::ModuleDoesNotExist {
                module_id: module_id.to_string(),
            })
    }

    pub fn get_by_location(&self, area_name: &str) -> Option<&LoadedModule> {
        self.modules.values().find(|m| m.area_name == area_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LoadedModule> {
        self.modules.values()
    }

    pub(crate) fn add(&mut self, module: LoadedModule) {
        self.modules.insert(module.id.clone(), module);
    }
}
