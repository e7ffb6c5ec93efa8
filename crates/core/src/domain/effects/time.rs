//! Time stretch unit
//!
//! Playback rate is changed by one of two nodes. With `shift_pitch` off the
//! time-pitch node stretches time and keeps the pitch; with it on the
//! varispeed node resamples, so pitch follows the rate like a tape machine.
//! Both nodes always carry the current rate; only the bypass flags select
//! which one is heard.

use super::preset::{impl_effects_unit_preset, PresetStore};
use super::state::EffectsUnitState;
use super::{EffectsUnit, EffectsUnitKind, PresetUnit};
use crate::domain::node::TimeStretchNode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, trace};

pub const RATE_MIN: f32 = 0.25;
pub const RATE_MAX: f32 = 4.0;

pub const OVERLAP_MIN: f32 = 3.0;
pub const OVERLAP_MAX: f32 = 32.0;

pub const DEFAULT_RATE: f32 = 1.0;
pub const DEFAULT_OVERLAP: f32 = 8.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeStretchPreset {
    pub name: String,
    #[serde(default)]
    pub state: EffectsUnitState,
    #[serde(default)]
    pub user_defined: bool,
    #[serde(default = "default_rate")]
    pub rate: f32,
    #[serde(default = "default_overlap")]
    pub overlap: f32,
    #[serde(default)]
    pub shift_pitch: bool,
}

impl_effects_unit_preset!(TimeStretchPreset);

fn default_rate() -> f32 {
    DEFAULT_RATE
}

fn default_overlap() -> f32 {
    DEFAULT_OVERLAP
}

impl Default for TimeStretchPreset {
    fn default() -> Self {
        Self {
            name: EffectsUnitKind::TimeStretch.settings_preset_name(),
            state: EffectsUnitState::default(),
            user_defined: false,
            rate: DEFAULT_RATE,
            overlap: DEFAULT_OVERLAP,
            shift_pitch: false,
        }
    }
}

#[derive(Debug)]
pub struct TimeStretchUnit {
    state: EffectsUnitState,
    rate: f32,
    overlap: f32,
    shift_pitch: bool,
    node: Arc<TimeStretchNode>,
    presets: PresetStore<TimeStretchPreset>,
}

impl Default for TimeStretchUnit {
    fn default() -> Self {
        Self::with_settings(
            EffectsUnitState::Bypassed,
            DEFAULT_RATE,
            DEFAULT_OVERLAP,
            false,
            Vec::new(),
        )
    }
}

impl TimeStretchUnit {
    pub fn with_settings(
        state: EffectsUnitState,
        rate: f32,
        overlap: f32,
        shift_pitch: bool,
        user_presets: Vec<TimeStretchPreset>,
    ) -> Self {
        let rate = rate.clamp(RATE_MIN, RATE_MAX);
        let overlap = overlap.clamp(OVERLAP_MIN, OVERLAP_MAX);

        let unit = Self {
            state,
            rate,
            overlap,
            shift_pitch,
            node: Arc::new(TimeStretchNode::new(rate, overlap)),
            presets: PresetStore::with_user_presets(user_presets),
        };
        unit.sync_bypass();
        unit
    }

    pub fn node(&self) -> &Arc<TimeStretchNode> {
        &self.node
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn set_rate(&mut self, rate: f32) {
        self.rate = rate.clamp(RATE_MIN, RATE_MAX);
        self.node.varispeed.rate.set(self.rate);
        self.node.time_pitch.rate.set(self.rate);
        trace!("Time stretch rate set to {}", self.rate);
    }

    pub fn increase_rate(&mut self, step: f32) -> f32 {
        self.set_rate(self.rate + step);
        self.rate
    }

    pub fn decrease_rate(&mut self, step: f32) -> f32 {
        self.set_rate(self.rate - step);
        self.rate
    }

    /// Rate the listener actually hears: 1.0 unless the unit is active
    pub fn effective_rate(&self) -> f32 {
        if self.is_active() {
            self.rate
        } else {
            1.0
        }
    }

    pub fn overlap(&self) -> f32 {
        self.overlap
    }

    pub fn set_overlap(&mut self, overlap: f32) {
        self.overlap = overlap.clamp(OVERLAP_MIN, OVERLAP_MAX);
        self.node.time_pitch.overlap.set(self.overlap);
        trace!("Time stretch overlap set to {}", self.overlap);
    }

    pub fn shift_pitch(&self) -> bool {
        self.shift_pitch
    }

    pub fn set_shift_pitch(&mut self, shift_pitch: bool) {
        self.shift_pitch = shift_pitch;
        self.sync_bypass();
        debug!("Time stretch shift pitch: {}", shift_pitch);
    }

    /// Pitch change caused by the rate, in cents
    ///
    /// Non-zero only when the varispeed path is selected.
    pub fn pitch(&self) -> f32 {
        if self.shift_pitch {
            1200.0 * self.rate.log2()
        } else {
            0.0
        }
    }

    fn sync_bypass(&self) {
        let active = self.state.is_active();
        self.node.varispeed.bypass.set(!(active && self.shift_pitch));
        self.node.time_pitch.bypass.set(!active || self.shift_pitch);
    }
}

impl EffectsUnit for TimeStretchUnit {
    fn kind(&self) -> EffectsUnitKind {
        EffectsUnitKind::TimeStretch
    }

    fn state(&self) -> EffectsUnitState {
        self.state
    }

    fn set_state(&mut self, state: EffectsUnitState) {
        self.state = state;
        self.sync_bypass();
    }
}

impl PresetUnit for TimeStretchUnit {
    type Preset = TimeStretchPreset;

    fn presets(&self) -> &PresetStore<TimeStretchPreset> {
        &self.presets
    }

    fn presets_mut(&mut self) -> &mut PresetStore<TimeStretchPreset> {
        &mut self.presets
    }

    fn settings_as_preset(&self) -> TimeStretchPreset {
        TimeStretchPreset {
            name: self.kind().settings_preset_name(),
            state: self.state,
            user_defined: false,
            rate: self.rate,
            overlap: self.overlap,
            shift_pitch: self.shift_pitch,
        }
    }

    fn apply_preset(&mut self, preset: &TimeStretchPreset) {
        self.set_rate(preset.rate);
        self.set_overlap(preset.overlap);
        self.set_shift_pitch(preset.shift_pitch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_bypass_rule(unit: &TimeStretchUnit) {
        let active = unit.is_active();
        assert_eq!(
            unit.node().varispeed.bypass.get(),
            !(active && unit.shift_pitch())
        );
        assert_eq!(
            unit.node().time_pitch.bypass.get(),
            !active || unit.shift_pitch()
        );
    }

    #[test]
    fn test_bypass_rule_across_transitions() {
        for shift_pitch in [false, true] {
            let mut unit = TimeStretchUnit::default();
            unit.set_shift_pitch(shift_pitch);
            assert_bypass_rule(&unit);

            unit.toggle_state();
            assert_bypass_rule(&unit);
            // Exactly one node is live while active
            assert_ne!(
                unit.node().varispeed.bypass.get(),
                unit.node().time_pitch.bypass.get()
            );

            unit.suppress();
            assert_bypass_rule(&unit);
            assert!(unit.node().bypass());

            unit.unsuppress();
            assert_bypass_rule(&unit);

            unit.set_shift_pitch(!shift_pitch);
            assert_bypass_rule(&unit);
        }
    }

    #[test]
    fn test_pitch_derivation() {
        let mut unit = TimeStretchUnit::default();
        unit.set_rate(2.0);
        assert_eq!(unit.pitch(), 0.0);

        unit.set_shift_pitch(true);
        assert!((unit.pitch() - 1200.0).abs() < 0.001);

        unit.set_rate(0.5);
        assert!((unit.pitch() + 1200.0).abs() < 0.001);
    }

    #[test]
    fn test_rate_reaches_both_nodes() {
        let mut unit = TimeStretchUnit::default();
        unit.set_rate(10.0);
        assert_eq!(unit.rate(), RATE_MAX);
        assert_eq!(unit.node().varispeed.rate.get(), RATE_MAX);
        assert_eq!(unit.node().time_pitch.rate.get(), RATE_MAX);

        assert_eq!(unit.decrease_rate(3.5), 0.5);
    }

    #[test]
    fn test_effective_rate() {
        let mut unit = TimeStretchUnit::default();
        unit.set_rate(1.5);
        assert_eq!(unit.effective_rate(), 1.0);

        unit.toggle_state();
        assert_eq!(unit.effective_rate(), 1.5);
    }

    #[test]
    fn test_preset_round_trip() {
        let mut unit = TimeStretchUnit::default();
        unit.set_rate(1.75);
        unit.set_overlap(12.0);
        unit.set_shift_pitch(true);
        unit.save_preset("Chipmunk");

        unit.set_rate(1.0);
        unit.set_shift_pitch(false);

        assert!(unit.apply_preset_named("Chipmunk"));
        assert!((unit.rate() - 1.75).abs() < 0.001);
        assert!((unit.overlap() - 12.0).abs() < 0.001);
        assert!(unit.shift_pitch());
        assert_eq!(unit.state(), EffectsUnitState::Bypassed);
        assert_bypass_rule(&unit);
    }
}
