//! Pipette state slice: loaded instruments, attached tips, and the
//! aspirated-volume ledger.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::deck::DeckPoint;
use crate::error::ValidationError;
use crate::hardware::Mount;

/// Static configuration of a pipette model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipetteConfig {
    pub pipette_name: String,
    pub channels: u8,
    pub min_volume_ul: f64,
    pub max_volume_ul: f64,
    pub default_flow_rate_ul_s: f64,
}

impl PipetteConfig {
    /// Look up a known pipette model by load name.
    pub fn for_name(pipette_name: &str) -> Option<Self> {
        let (channels, min_volume_ul, max_volume_ul, default_flow_rate_ul_s) = match pipette_name {
            "p50_single_flex" => (1, 1.0, 50.0, 35.0),
            "p50_multi_flex" => (8, 1.0, 50.0, 35.0),
            "p1000_single_flex" => (1, 5.0, 1000.0, 160.0),
            "p1000_multi_flex" => (8, 5.0, 1000.0, 160.0),
            "p300_single_gen2" => (1, 20.0, 300.0, 92.86),
            "p20_single_gen2" => (1, 1.0, 20.0, 7.56),
            _ => return None,
        };
        Some(Self {
            pipette_name: pipette_name.to_string(),
            channels,
            min_volume_ul,
            max_volume_ul,
            default_flow_rate_ul_s,
        })
    }
}

/// The tip currently attached to a pipette.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TipAttachment {
    /// Tip rack the tip came from.
    pub labware_id: String,
    pub well_name: String,
    /// Working volume of the tip, in microliters.
    pub volume_ul: f64,
    pub length_mm: f64,
}

/// A pipette loaded on a mount.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadedPipette {
    pub id: String,
    pub mount: Mount,
    pub config: PipetteConfig,
    pub attached_tip: Option<TipAttachment>,
    /// Liquid currently held, in microliters.
    pub aspirated_ul: f64,
    /// Last commanded position, cleared by a home.
    pub current_position: Option<DeckPoint>,
}

/// Authoritative model of loaded pipettes.
#[derive(Debug, Clone, Default)]
pub struct PipetteStore {
    pipettes: HashMap<String, LoadedPipette>,
}

impl PipetteStore {
    pub fn get(&self, pipette_id: &str) -> Result<&LoadedPipette, ValidationError> {
        self.pipettes
            .get(pipette_id)
            .ok_or_else(|| ValidationError::PipetteDoesNotExist {
                pipette_id: pipette_id.to_string(),
            })
    }

    pub fn get_by_mount(&self, mount: Mount) -> Option<&LoadedPipette> {
        self.pipettes.values().find(|p| p.mount == mount)
    }

    pub fn get_attached_tip(
        &self,
        pipette_id: &str,
    ) -> Result<Option<&TipAttachment>, ValidationError> {
        Ok(self.get(pipette_id)?.attached_tip.as_ref())
    }

    /// Fail unless the pipette has a tip attached; returns the tip.
    pub fn validate_tip_attached(
        &self,
        pipette_id: &str,
    ) -> Result<&TipAttachment, ValidationError> {
        self.get(pipette_id)?
            .attached_tip
            .as_ref()
            .ok_or_else(|| ValidationError::TipNotAttached {
                pipette_id: pipette_id.to_string(),
            })
    }

    /// Fail if the pipette already carries a tip.
    pub fn validate_no_tip_attached(&self, pipette_id: &str) -> Result<(), ValidationError> {
        if self.get(pipette_id)?.attached_tip.is_some() {
            Err(ValidationError::TipAlreadyAttached {
                pipette_id: pipette_id.to_string(),
            })
        } else {
            Ok(())
        }
    }

    pub fn get_aspirated_volume(&self, pipette_id: &str) -> Result<f64, ValidationError> {
        Ok(self.get(pipette_id)?.aspirated_ul)
    }

    /// Headroom for a further aspirate: bounded by both the pipette's max
    /// volume and the attached tip's working volume.
    pub fn get_available_volume(&self, pipette_id: &str) -> Result<f64, ValidationError> {
        let pipette = self.get(pipette_id)?;
        let tip = self
            .validate_tip_attached(pipette_id)?;
        let capacity = pipette.config.max_volume_ul.min(tip.volume_ul);
        Ok((capacity - pipette.aspirated_ul).max(0.0))
    }

    /// All loaded pipettes, unordered.
    pub fn iter(&self) -> impl Iterator<Item = &LoadedPipette> {
        self.pipettes.values()
    }

    pub(crate) fn add(&mut self, pipette: LoadedPipette) {
        self.pipettes.insert(pipette.id.clone(), pipette);
    }

    pub(crate) fn attach_tip(&mut self, pipette_id: &str, tip: TipAttachment) {
        if let Some(pipette) = self.pipettes.get_mut(pipette_id) {
            pipette.attached_tip = Some(tip);
        }
    }

    pub(crate) fn drop_tip(&mut self, pipette_id: &str) {
        if let Some(pipette) = self.pipettes.get_mut(pipette_id) {
            pipette.attached_tip = None;
            pipette.aspirated_ul = 0.0;
        }
    }

    pub(crate) fn record_aspirate(&mut self, pipette_id: &str, volume_ul: f64) {
        if let Some(pipette) = self.pipettes.get_mut(pipette_id) {
            pipette.aspirated_ul += volume_ul;
        }
    }

    pub(crate) fn record_dispense(&mut self, pipette_id: &str, volume_ul: f64) {
        if let Some(pipette) = self.pipettes.get_mut(pipette_id) {
            pipette.aspirated_ul = (pipette.aspirated_ul - volume_ul).max(0.0);
        }
    }

    pub(crate) fn record_move(&mut self, pipette_id: &str, position: DeckPoint) {
        if let Some(pipette) = self.pipettes.get_mut(pipette_id) {
            pipette.current_position = Some(position);
        }
    }

    pub(crate) fn clear_positions(&mut self) {
        for pipette in self.pipettes.values_mut() {
            pipette.current_position = None;
        }
    }
}
