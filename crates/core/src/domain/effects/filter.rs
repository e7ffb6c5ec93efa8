//! Multi-band filter unit
//!
//! The unit keeps an ordered list of bands. Band `i` is rendered by slot `i`
//! of the filter node; slots past the end of the list are bypassed.

use super::preset::{impl_effects_unit_preset, PresetStore};
use super::state::EffectsUnitState;
use super::{EffectsUnit, EffectsUnitKind, PresetUnit};
use crate::domain::audio::{AudioError, Result};
use crate::domain::node::{FilterNode, FilterSlot, FilterSlotType};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Audible range a band must fall within (Hz)
pub const AUDIBLE_RANGE_MIN: f32 = 20.0;
pub const AUDIBLE_RANGE_MAX: f32 = 20000.0;

/// Number of band slots in the filter node
pub const MAX_FILTER_BANDS: usize = 31;

/// Gain of the parametric slot that renders a band-stop band (dB)
pub const BAND_STOP_GAIN: f32 = -90.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterBandType {
    LowPass,
    HighPass,
    BandPass,
    BandStop,
}

impl fmt::Display for FilterBandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FilterBandType::LowPass => "Low pass",
            FilterBandType::HighPass => "High pass",
            FilterBandType::BandPass => "Band pass",
            FilterBandType::BandStop => "Band stop",
        };
        f.write_str(name)
    }
}

/// One band of the filter
///
/// Low-pass bands only use `max_freq`, high-pass bands only `min_freq`;
/// band-pass and band-stop bands need both.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterBand {
    pub band_type: FilterBandType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_freq: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_freq: Option<f32>,
}

impl FilterBand {
    pub fn low_pass(cutoff: f32) -> Self {
        Self {
            band_type: FilterBandType::LowPass,
            min_freq: None,
            max_freq: Some(cutoff),
        }
    }

    pub fn high_pass(cutoff: f32) -> Self {
        Self {
            band_type: FilterBandType::HighPass,
            min_freq: Some(cutoff),
            max_freq: None,
        }
    }

    pub fn band_pass(min_freq: f32, max_freq: f32) -> Self {
        Self {
            band_type: FilterBandType::BandPass,
            min_freq: Some(min_freq),
            max_freq: Some(max_freq),
        }
    }

    pub fn band_stop(min_freq: f32, max_freq: f32) -> Self {
        Self {
            band_type: FilterBandType::BandStop,
            min_freq: Some(min_freq),
            max_freq: Some(max_freq),
        }
    }

    /// Check that the band has the bounds its type needs, inside the
    /// audible range. The unit itself never calls this.
    pub fn validate(&self) -> Result<()> {
        let in_range = |freq: f32| (AUDIBLE_RANGE_MIN..=AUDIBLE_RANGE_MAX).contains(&freq);
        let invalid = |reason: &str| -> Result<()> {
            Err(AudioError::InvalidConfiguration(format!(
                "{} band: {}",
                self.band_type, reason
            )))
        };

        match (self.band_type, self.min_freq, self.max_freq) {
            (FilterBandType::LowPass, _, Some(max)) if in_range(max) => Ok(()),
            (FilterBandType::LowPass, _, _) => invalid("needs a max frequency in the audible range"),
            (FilterBandType::HighPass, Some(min), _) if in_range(min) => Ok(()),
            (FilterBandType::HighPass, _, _) => invalid("needs a min frequency in the audible range"),
            (FilterBandType::BandPass | FilterBandType::BandStop, Some(min), Some(max)) => {
                if !in_range(min) || !in_range(max) {
                    invalid("frequencies outside the audible range")
                } else if min >= max {
                    invalid("min frequency must be below max frequency")
                } else {
                    Ok(())
                }
            }
            (FilterBandType::BandPass | FilterBandType::BandStop, _, _) => {
                invalid("needs both min and max frequencies")
            }
        }
    }

    /// Write this band into a node slot
    fn render_into(&self, slot: &FilterSlot) {
        let min = self.min_freq.unwrap_or(AUDIBLE_RANGE_MIN);
        let max = self.max_freq.unwrap_or(AUDIBLE_RANGE_MAX);

        match self.band_type {
            FilterBandType::LowPass => {
                slot.filter_type.set(FilterSlotType::LowPass as u8);
                slot.frequency.set(max);
                slot.gain.set(0.0);
            }
            FilterBandType::HighPass => {
                slot.filter_type.set(FilterSlotType::HighPass as u8);
                slot.frequency.set(min);
                slot.gain.set(0.0);
            }
            FilterBandType::BandPass => {
                slot.filter_type.set(FilterSlotType::BandPass as u8);
                slot.frequency.set((min * max).sqrt());
                slot.bandwidth.set((max / min).log2());
                slot.gain.set(0.0);
            }
            FilterBandType::BandStop => {
                slot.filter_type.set(FilterSlotType::Parametric as u8);
                slot.frequency.set((min * max).sqrt());
                slot.bandwidth.set((max / min).log2());
                slot.gain.set(BAND_STOP_GAIN);
            }
        }
        slot.bypass.set(false);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterPreset {
    pub name: String,
    #[serde(default)]
    pub state: EffectsUnitState,
    #[serde(default)]
    pub user_defined: bool,
    pub bands: Vec<FilterBand>,
}

impl_effects_unit_preset!(FilterPreset);

impl Default for FilterPreset {
    fn default() -> Self {
        Self {
            name: EffectsUnitKind::Filter.settings_preset_name(),
            state: EffectsUnitState::default(),
            user_defined: false,
            bands: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct FilterUnit {
    state: EffectsUnitState,
    bands: Vec<FilterBand>,
    node: Arc<FilterNode>,
    presets: PresetStore<FilterPreset>,
}

impl Default for FilterUnit {
    fn default() -> Self {
        Self::with_settings(EffectsUnitState::Bypassed, Vec::new(), Vec::new())
    }
}

impl FilterUnit {
    pub fn with_settings(
        state: EffectsUnitState,
        bands: Vec<FilterBand>,
        user_presets: Vec<FilterPreset>,
    ) -> Self {
        let node = Arc::new(FilterNode::new(MAX_FILTER_BANDS));
        node.bypass.set(state.node_bypass());

        let mut unit = Self {
            state,
            bands: Vec::new(),
            node,
            presets: PresetStore::with_user_presets(user_presets),
        };
        unit.set_bands(bands);
        unit
    }

    pub fn node(&self) -> &Arc<FilterNode> {
        &self.node
    }

    pub fn bands(&self) -> &[FilterBand] {
        &self.bands
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    pub fn band(&self, index: usize) -> Option<&FilterBand> {
        self.bands.get(index)
    }

    /// Append a band; returns its index
    pub fn add_band(&mut self, band: FilterBand) -> usize {
        let index = self.bands.len();
        self.bands.push(band);
        self.render_from(index);
        debug!("Filter band {} added: {}", index, band.band_type);
        index
    }

    /// Remove the band at `index`; later bands shift down by one
    pub fn remove_band(&mut self, index: usize) -> Option<FilterBand> {
        if index >= self.bands.len() {
            return None;
        }
        let removed = self.bands.remove(index);
        self.render_from(index);
        debug!("Filter band {} removed", index);
        Some(removed)
    }

    /// Replace the band at `index`. Returns false when out of range.
    pub fn update_band(&mut self, index: usize, band: FilterBand) -> bool {
        match self.bands.get_mut(index) {
            Some(slot) => {
                *slot = band;
                if let Some(node_slot) = self.node.slot(index) {
                    band.render_into(node_slot);
                }
                true
            }
            None => false,
        }
    }

    pub fn set_bands(&mut self, bands: Vec<FilterBand>) {
        self.bands = bands;
        self.render_from(0);
    }

    /// Re-render slots from `start` to the end of the pool
    fn render_from(&self, start: usize) {
        if self.bands.len() > MAX_FILTER_BANDS {
            warn!(
                "Filter has {} bands, only the first {} are rendered",
                self.bands.len(),
                MAX_FILTER_BANDS
            );
        }

        for (index, slot) in self.node.slots().iter().enumerate().skip(start) {
            match self.bands.get(index) {
                Some(band) => band.render_into(slot),
                None => slot.bypass.set(true),
            }
        }
        self.node.set_active_bands(self.bands.len());
    }
}

impl EffectsUnit for FilterUnit {
    fn kind(&self) -> EffectsUnitKind {
        EffectsUnitKind::Filter
    }

    fn state(&self) -> EffectsUnitState {
        self.state
    }

    fn set_state(&mut self, state: EffectsUnitState) {
        self.state = state;
        self.node.bypass.set(state.node_bypass());
    }
}

impl PresetUnit for FilterUnit {
    type Preset = FilterPreset;

    fn presets(&self) -> &PresetStore<FilterPreset> {
        &self.presets
    }

    fn presets_mut(&mut self) -> &mut PresetStore<FilterPreset> {
        &mut self.presets
    }

    fn settings_as_preset(&self) -> FilterPreset {
        FilterPreset {
            name: self.kind().settings_preset_name(),
            state: self.state,
            user_defined: false,
            bands: self.bands.clone(),
        }
    }

    fn apply_preset(&mut self, preset: &FilterPreset) {
        self.set_bands(preset.bands.clone());
    }
}
