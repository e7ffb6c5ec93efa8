//! Graphic equalizer unit
//!
//! A 10- or 15-band graphic equalizer with a global gain stage. The band
//! layout is chosen when the unit is built and never changes afterwards;
//! presets saved with the other layout are resampled on apply.

use super::preset::{impl_effects_unit_preset, PresetStore};
use super::state::EffectsUnitState;
use super::{EffectsUnit, EffectsUnitKind, PresetUnit};
use crate::domain::node::EqNode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Gain limits for bands and the global gain (dB)
pub const GAIN_MIN: f32 = -20.0;
pub const GAIN_MAX: f32 = 20.0;

/// Upper edge of the bass region (Hz, exclusive)
const BASS_MAX_FREQ: f32 = 250.0;
/// Upper edge of the mids region (Hz, exclusive); treble starts here
const MIDS_MAX_FREQ: f32 = 4000.0;

const TEN_BAND_FREQUENCIES: [f32; 10] = [
    32.0, 64.0, 125.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0, 8000.0, 16000.0,
];

const FIFTEEN_BAND_FREQUENCIES: [f32; 15] = [
    25.0, 40.0, 63.0, 100.0, 160.0, 250.0, 400.0, 630.0, 1000.0, 1600.0, 2500.0, 4000.0, 6300.0,
    10000.0, 16000.0,
];

/// Band layout of the equalizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EqType {
    TenBand,
    #[default]
    FifteenBand,
}

impl EqType {
    pub fn band_count(self) -> usize {
        self.frequencies().len()
    }

    /// ISO center frequencies of the bands, in Hz
    pub fn frequencies(self) -> &'static [f32] {
        match self {
            EqType::TenBand => &TEN_BAND_FREQUENCIES,
            EqType::FifteenBand => &FIFTEEN_BAND_FREQUENCIES,
        }
    }
}

impl fmt::Display for EqType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EqType::TenBand => f.write_str("10-band"),
            EqType::FifteenBand => f.write_str("15-band"),
        }
    }
}

/// Equalizer preset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EqPreset {
    pub name: String,
    #[serde(default)]
    pub state: EffectsUnitState,
    #[serde(default)]
    pub user_defined: bool,
    pub bands: Vec<f32>,
    #[serde(default)]
    pub global_gain: f32,
}

impl_effects_unit_preset!(EqPreset);

/// Flat settings for the default layout
impl Default for EqPreset {
    fn default() -> Self {
        Self::new(
            EffectsUnitKind::Eq.settings_preset_name(),
            EffectsUnitState::default(),
            vec![0.0; EqType::default().band_count()],
            0.0,
        )
    }
}

impl EqPreset {
    pub fn new(name: impl Into<String>, state: EffectsUnitState, bands: Vec<f32>, global_gain: f32) -> Self {
        Self {
            name: name.into(),
            state,
            user_defined: false,
            bands,
            global_gain,
        }
    }
}

/// Factory presets: name, 10-band gains, 15-band gains
const SYSTEM_PRESETS: &[(&str, [f32; 10], [f32; 15])] = &[
    ("Flat", [0.0; 10], [0.0; 15]),
    (
        "High bass and treble",
        [15.0, 12.5, 10.0, 0.0, 0.0, 0.0, 0.0, 10.0, 12.5, 15.0],
        [15.0, 15.0, 12.5, 10.0, 10.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 10.0, 12.5, 12.5, 15.0],
    ),
    (
        "Dance",
        [0.0, 7.0, 4.0, 0.0, -1.0, -2.0, -4.0, 0.0, 4.0, 5.0],
        [0.0, 3.5, 7.0, 4.0, 4.0, 0.0, -1.0, -1.0, -2.0, -4.0, -4.0, 0.0, 4.0, 4.0, 5.0],
    ),
    (
        "Electronic",
        [7.0, 6.5, 0.0, -2.0, -5.0, 0.0, 0.0, 0.0, 6.5, 7.0],
        [7.0, 7.0, 6.5, 0.0, 0.0, -2.0, -5.0, -5.0, 0.0, 0.0, 0.0, 0.0, 6.5, 6.5, 7.0],
    ),
    (
        "Hip Hop",
        [7.0, 7.0, 0.0, 0.0, -3.0, -3.0, -2.0, 1.0, 1.0, 7.0],
        [7.0, 7.0, 7.0, 0.0, 0.0, 0.0, -3.0, -3.0, -3.0, -2.0, -2.0, 1.0, 1.0, 1.0, 7.0],
    ),
    (
        "Jazz",
        [0.0, 3.0, 0.0, 0.0, -3.0, -3.0, 0.0, 0.0, 3.0, 5.0],
        [0.0, 0.0, 3.0, 0.0, 0.0, 0.0, -3.0, -3.0, -3.0, 0.0, 0.0, 0.0, 3.0, 3.0, 5.0],
    ),
    (
        "Latin",
        [8.0, 5.0, 0.0, 0.0, -4.0, -4.0, -4.0, 0.0, 6.0, 8.0],
        [8.0, 8.0, 5.0, 0.0, 0.0, 0.0, -4.0, -4.0, -4.0, -4.0, -4.0, 0.0, 6.0, 6.0, 8.0],
    ),
    (
        "Lounge",
        [-5.0, -2.0, 0.0, 2.0, 4.0, 3.0, 0.0, 0.0, 3.0, 0.0],
        [-5.0, -5.0, -2.0, 0.0, 0.0, 2.0, 4.0, 4.0, 3.0, 0.0, 0.0, 0.0, 3.0, 3.0, 0.0],
    ),
    (
        "Piano",
        [1.0, -1.0, -3.0, 0.0, 1.0, -1.0, 2.0, 3.0, 1.0, 2.0],
        [1.0, 1.0, -1.0, -3.0, -3.0, 0.0, 1.0, 1.0, -1.0, 2.0, 2.0, 3.0, 1.0, 1.0, 2.0],
    ),
    (
        "Pop",
        [-2.0, -1.5, 0.0, 3.0, 7.0, 7.0, 3.5, 0.0, -2.0, -3.0],
        [-2.0, -2.0, -1.5, 0.0, 0.0, 3.0, 7.0, 7.0, 7.0, 3.5, 3.5, 0.0, -2.0, -2.0, -3.0],
    ),
    (
        "R&B",
        [0.0, 7.0, 4.0, -3.0, -5.0, -4.5, -2.0, -1.5, 0.0, 1.5],
        [0.0, 0.0, 7.0, 4.0, 4.0, -3.0, -5.0, -5.0, -4.5, -2.0, -2.0, -1.5, 0.0, 0.0, 1.5],
    ),
    (
        "Rock",
        [5.0, 3.0, 1.5, 0.0, -5.0, -6.0, -2.5, 0.0, 2.5, 4.0],
        [5.0, 5.0, 3.0, 1.5, 1.5, 0.0, -5.0, -5.0, -6.0, -2.5, -2.5, 0.0, 2.5, 2.5, 4.0],
    ),
    (
        "Soft",
        [0.0, 1.0, 2.0, 6.0, 8.0, 10.0, 12.0, 12.0, 13.0, 14.0],
        [0.0, 0.0, 1.0, 2.0, 2.0, 6.0, 8.0, 8.0, 10.0, 12.0, 12.0, 12.0, 13.0, 13.0, 14.0],
    ),
    (
        "Karaoke",
        [8.0, 6.0, 4.0, -20.0, -20.0, -20.0, -20.0, 4.0, 6.0, 8.0],
        [8.0, 8.0, 6.0, 4.0, 4.0, -20.0, -20.0, -20.0, -20.0, -20.0, -20.0, 4.0, 6.0, 6.0, 8.0],
    ),
    (
        "Vocal",
        [-20.0, -20.0, -20.0, 12.0, 14.0, 14.0, 12.0, -20.0, -20.0, -20.0],
        [
            -20.0, -20.0, -20.0, -20.0, -20.0, 12.0, 14.0, 14.0, 14.0, 12.0, 12.0, -20.0, -20.0,
            -20.0, -20.0,
        ],
    ),
];

/// Factory presets laid out for `eq_type`; "Flat" comes first
pub fn system_presets(eq_type: EqType) -> Vec<EqPreset> {
    SYSTEM_PRESETS
        .iter()
        .map(|(name, ten, fifteen)| {
            let bands = match eq_type {
                EqType::TenBand => ten.to_vec(),
                EqType::FifteenBand => fifteen.to_vec(),
            };
            EqPreset::new(*name, EffectsUnitState::Active, bands, 0.0)
        })
        .collect()
}

/// Map `source` gains onto `target_len` bands by proportional position
fn resample_bands(source: &[f32], target_len: usize) -> Vec<f32> {
    if source.len() == target_len {
        return source.to_vec();
    }
    if source.is_empty() || target_len == 0 {
        return vec![0.0; target_len];
    }
    if target_len == 1 {
        return vec![source[0]];
    }

    let scale = (source.len() - 1) as f32 / (target_len - 1) as f32;
    (0..target_len)
        .map(|i| {
            let index = (i as f32 * scale).round() as usize;
            source[index.min(source.len() - 1)]
        })
        .collect()
}

fn clamp_gain(gain: f32) -> f32 {
    gain.clamp(GAIN_MIN, GAIN_MAX)
}

/// Graphic equalizer
#[derive(Debug)]
pub struct EqUnit {
    eq_type: EqType,
    state: EffectsUnitState,
    global_gain: f32,
    bands: Vec<f32>,
    node: Arc<EqNode>,
    presets: PresetStore<EqPreset>,
}

impl Default for EqUnit {
    fn default() -> Self {
        Self::new(EqType::default())
    }
}

impl EqUnit {
    /// Flat, bypassed equalizer with no user presets
    pub fn new(eq_type: EqType) -> Self {
        Self::with_settings(
            eq_type,
            EffectsUnitState::Bypassed,
            0.0,
            &[],
            Vec::new(),
        )
    }

    /// Restore an equalizer from saved settings
    ///
    /// Bands are resampled to `eq_type` when the count differs; an empty
    /// slice means flat.
    pub fn with_settings(
        eq_type: EqType,
        state: EffectsUnitState,
        global_gain: f32,
        bands: &[f32],
        user_presets: Vec<EqPreset>,
    ) -> Self {
        let node = Arc::new(EqNode::new(eq_type.band_count()));
        let mut unit = Self {
            eq_type,
            state,
            global_gain: 0.0,
            bands: vec![0.0; eq_type.band_count()],
            node,
            presets: PresetStore::new(system_presets(eq_type), user_presets),
        };

        unit.set_global_gain(global_gain);
        if !bands.is_empty() {
            unit.set_bands(bands);
        }
        unit.node.bypass.set(state.node_bypass());
        unit
    }

    pub fn eq_type(&self) -> EqType {
        self.eq_type
    }

    pub fn node(&self) -> &Arc<EqNode> {
        &self.node
    }

    pub fn global_gain(&self) -> f32 {
        self.global_gain
    }

    pub fn set_global_gain(&mut self, gain: f32) {
        self.global_gain = clamp_gain(gain);
        self.node.global_gain.set(self.global_gain);
        trace!("EQ global gain set to {} dB", self.global_gain);
    }

    pub fn bands(&self) -> &[f32] {
        &self.bands
    }

    pub fn band(&self, index: usize) -> Option<f32> {
        self.bands.get(index).copied()
    }

    /// Set every band gain at once, resampling when the count differs
    pub fn set_bands(&mut self, bands: &[f32]) {
        let resampled = resample_bands(bands, self.eq_type.band_count());
        for (index, gain) in resampled.into_iter().enumerate() {
            self.write_band(index, gain);
        }
        trace!("EQ bands set: {:?}", self.bands);
    }

    /// Set one band. Out-of-range indices are ignored.
    pub fn set_band(&mut self, index: usize, gain: f32) {
        if index < self.bands.len() {
            self.write_band(index, gain);
            trace!("EQ band {} set to {} dB", index, self.bands[index]);
        }
    }

    pub fn increase_bass(&mut self, step: f32) -> &[f32] {
        self.nudge_region(0.0, BASS_MAX_FREQ, step)
    }

    pub fn decrease_bass(&mut self, step: f32) -> &[f32] {
        self.nudge_region(0.0, BASS_MAX_FREQ, -step)
    }

    pub fn increase_mids(&mut self, step: f32) -> &[f32] {
        self.nudge_region(BASS_MAX_FREQ, MIDS_MAX_FREQ, step)
    }

    pub fn decrease_mids(&mut self, step: f32) -> &[f32] {
        self.nudge_region(BASS_MAX_FREQ, MIDS_MAX_FREQ, -step)
    }

    pub fn increase_treble(&mut self, step: f32) -> &[f32] {
        self.nudge_region(MIDS_MAX_FREQ, f32::INFINITY, step)
    }

    pub fn decrease_treble(&mut self, step: f32) -> &[f32] {
        self.nudge_region(MIDS_MAX_FREQ, f32::INFINITY, -step)
    }

    /// Add `delta` to every band whose center lies in `[low, high)`
    fn nudge_region(&mut self, low: f32, high: f32, delta: f32) -> &[f32] {
        let frequencies = self.eq_type.frequencies();
        for (index, &frequency) in frequencies.iter().enumerate() {
            if frequency >= low && frequency < high {
                let gain = self.bands[index] + delta;
                self.write_band(index, gain);
            }
        }
        debug!("EQ bands nudged by {} dB in {}..{} Hz", delta, low, high);
        &self.bands
    }

    fn write_band(&mut self, index: usize, gain: f32) {
        let gain = clamp_gain(gain);
        self.bands[index] = gain;
        self.node.set_band_gain(index, gain);
    }
}

impl EffectsUnit for EqUnit {
    fn kind(&self) -> EffectsUnitKind {
        EffectsUnitKind::Eq
    }

    fn state(&self) -> EffectsUnitState {
        self.state
    }

    fn set_state(&mut self, state: EffectsUnitState) {
        self.state = state;
        self.node.bypass.set(state.node_bypass());
    }
}

impl PresetUnit for EqUnit {
    type Preset = EqPreset;

    fn presets(&self) -> &PresetStore<EqPreset> {
        &self.presets
    }

    fn presets_mut(&mut self) -> &mut PresetStore<EqPreset> {
        &mut self.presets
    }

    fn settings_as_preset(&self) -> EqPreset {
        EqPreset::new(
            self.kind().settings_preset_name(),
            self.state,
            self.bands.clone(),
            self.global_gain,
        )
    }

    fn apply_preset(&mut self, preset: &EqPreset) {
        self.set_bands(&preset.bands);
        self.set_global_gain(preset.global_gain);
    }
}
