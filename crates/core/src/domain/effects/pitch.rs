//! Pitch shift unit

use super::preset::{impl_effects_unit_preset, PresetStore};
use super::state::EffectsUnitState;
use super::{EffectsUnit, EffectsUnitKind, PresetUnit};
use crate::domain::node::PitchShiftNode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::trace;

/// Pitch range in cents (two octaves either way)
pub const PITCH_MIN: f32 = -2400.0;
pub const PITCH_MAX: f32 = 2400.0;

/// Overlap range of the analysis windows
pub const OVERLAP_MIN: f32 = 3.0;
pub const OVERLAP_MAX: f32 = 32.0;

pub const DEFAULT_PITCH: f32 = 0.0;
pub const DEFAULT_OVERLAP: f32 = 8.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PitchShiftPreset {
    pub name: String,
    #[serde(default)]
    pub state: EffectsUnitState,
    #[serde(default)]
    pub user_defined: bool,
    #[serde(default = "default_pitch")]
    pub pitch: f32,
    #[serde(default = "default_overlap")]
    pub overlap: f32,
}

impl_effects_unit_preset!(PitchShiftPreset);

fn default_pitch() -> f32 {
    DEFAULT_PITCH
}

fn default_overlap() -> f32 {
    DEFAULT_OVERLAP
}

impl Default for PitchShiftPreset {
    fn default() -> Self {
        Self {
            name: EffectsUnitKind::PitchShift.settings_preset_name(),
            state: EffectsUnitState::default(),
            user_defined: false,
            pitch: DEFAULT_PITCH,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

#[derive(Debug)]
pub struct PitchShiftUnit {
    state: EffectsUnitState,
    pitch: f32,
    overlap: f32,
    node: Arc<PitchShiftNode>,
    presets: PresetStore<PitchShiftPreset>,
}

impl Default for PitchShiftUnit {
    fn default() -> Self {
        Self::with_settings(
            EffectsUnitState::Bypassed,
            DEFAULT_PITCH,
            DEFAULT_OVERLAP,
            Vec::new(),
        )
    }
}

impl PitchShiftUnit {
    pub fn with_settings(
        state: EffectsUnitState,
        pitch: f32,
        overlap: f32,
        user_presets: Vec<PitchShiftPreset>,
    ) -> Self {
        let pitch = pitch.clamp(PITCH_MIN, PITCH_MAX);
        let overlap = overlap.clamp(OVERLAP_MIN, OVERLAP_MAX);
        let node = Arc::new(PitchShiftNode::new(pitch, overlap));
        node.bypass.set(state.node_bypass());

        Self {
            state,
            pitch,
            overlap,
            node,
            presets: PresetStore::with_user_presets(user_presets),
        }
    }

    pub fn node(&self) -> &Arc<PitchShiftNode> {
        &self.node
    }

    /// Pitch shift in cents
    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn set_pitch(&mut self, pitch: f32) {
        self.pitch = pitch.clamp(PITCH_MIN, PITCH_MAX);
        self.node.pitch.set(self.pitch);
        trace!("Pitch set to {} cents", self.pitch);
    }

    pub fn overlap(&self) -> f32 {
        self.overlap
    }

    pub fn set_overlap(&mut self, overlap: f32) {
        self.overlap = overlap.clamp(OVERLAP_MIN, OVERLAP_MAX);
        self.node.overlap.set(self.overlap);
        trace!("Pitch overlap set to {}", self.overlap);
    }

    /// Raise the pitch by `step` cents; returns the new pitch
    pub fn increase_pitch(&mut self, step: f32) -> f32 {
        self.set_pitch(self.pitch + step);
        self.pitch
    }

    /// Lower the pitch by `step` cents; returns the new pitch
    pub fn decrease_pitch(&mut self, step: f32) -> f32 {
        self.set_pitch(self.pitch - step);
        self.pitch
    }
}

impl EffectsUnit for PitchShiftUnit {
    fn kind(&self) -> EffectsUnitKind {
        EffectsUnitKind::PitchShift
    }

    fn state(&self) -> EffectsUnitState {
        self.state
    }

    fn set_state(&mut self, state: EffectsUnitState) {
        self.state = state;
        self.node.bypass.set(state.node_bypass());
    }
}

impl PresetUnit for PitchShiftUnit {
    type Preset = PitchShiftPreset;

    fn presets(&self) -> &PresetStore<PitchShiftPreset> {
        &self.presets
    }

    fn presets_mut(&mut self) -> &mut PresetStore<PitchShiftPreset> {
        &mut self.presets
    }

    fn settings_as_preset(&self) -> PitchShiftPreset {
        PitchShiftPreset {
            name: self.kind().settings_preset_name(),
            state: self.state,
            user_defined: false,
            pitch: self.pitch,
            overlap: self.overlap,
        }
    }

    fn apply_preset(&mut self, preset: &PitchShiftPreset) {
        self.set_pitch(preset.pitch);
        self.set_overlap(preset.overlap);
    }
}
