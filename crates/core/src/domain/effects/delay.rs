//! Delay unit

use super::preset::{impl_effects_unit_preset, PresetStore};
use super::state::EffectsUnitState;
use super::{EffectsUnit, EffectsUnitKind, PresetUnit};
use crate::domain::node::DelayNode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::trace;

/// Parameter ranges accepted by the delay node
pub mod params {
    /// Wet/dry mix (%)
    pub const AMOUNT_MIN: f32 = 0.0;
    pub const AMOUNT_MAX: f32 = 100.0;

    /// Delay time (seconds)
    pub const TIME_MIN: f64 = 0.0;
    pub const TIME_MAX: f64 = 2.0;

    /// Feedback (%), negative values invert the repeats
    pub const FEEDBACK_MIN: f32 = -100.0;
    pub const FEEDBACK_MAX: f32 = 100.0;

    /// Low-pass cutoff of the feedback path (Hz)
    pub const CUTOFF_MIN: f32 = 10.0;
    pub const CUTOFF_MAX: f32 = 20000.0;

    pub const DEFAULT_AMOUNT: f32 = 100.0;
    pub const DEFAULT_TIME: f64 = 1.0;
    pub const DEFAULT_FEEDBACK: f32 = 50.0;
    pub const DEFAULT_CUTOFF: f32 = 15000.0;
}

use params::*;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelayPreset {
    pub name: String,
    #[serde(default)]
    pub state: EffectsUnitState,
    #[serde(default)]
    pub user_defined: bool,
    #[serde(default = "default_amount")]
    pub amount: f32,
    #[serde(default = "default_time")]
    pub time: f64,
    #[serde(default = "default_feedback")]
    pub feedback: f32,
    #[serde(default = "default_cutoff")]
    pub low_pass_cutoff: f32,
}

impl_effects_unit_preset!(DelayPreset);

fn default_amount() -> f32 {
    DEFAULT_AMOUNT
}

fn default_time() -> f64 {
    DEFAULT_TIME
}

fn default_feedback() -> f32 {
    DEFAULT_FEEDBACK
}

fn default_cutoff() -> f32 {
    DEFAULT_CUTOFF
}

impl Default for DelayPreset {
    fn default() -> Self {
        Self {
            name: EffectsUnitKind::Delay.settings_preset_name(),
            state: EffectsUnitState::default(),
            user_defined: false,
            amount: DEFAULT_AMOUNT,
            time: DEFAULT_TIME,
            feedback: DEFAULT_FEEDBACK,
            low_pass_cutoff: DEFAULT_CUTOFF,
        }
    }
}

#[derive(Debug)]
pub struct DelayUnit {
    state: EffectsUnitState,
    amount: f32,
    time: f64,
    feedback: f32,
    low_pass_cutoff: f32,
    node: Arc<DelayNode>,
    presets: PresetStore<DelayPreset>,
}

impl Default for DelayUnit {
    fn default() -> Self {
        Self::with_settings(
            EffectsUnitState::Bypassed,
            DEFAULT_AMOUNT,
            DEFAULT_TIME,
            DEFAULT_FEEDBACK,
            DEFAULT_CUTOFF,
            Vec::new(),
        )
    }
}

impl DelayUnit {
    pub fn with_settings(
        state: EffectsUnitState,
        amount: f32,
        time: f64,
        feedback: f32,
        low_pass_cutoff: f32,
        user_presets: Vec<DelayPreset>,
    ) -> Self {
        let amount = amount.clamp(AMOUNT_MIN, AMOUNT_MAX);
        let time = time.clamp(TIME_MIN, TIME_MAX);
        let feedback = feedback.clamp(FEEDBACK_MIN, FEEDBACK_MAX);
        let low_pass_cutoff = low_pass_cutoff.clamp(CUTOFF_MIN, CUTOFF_MAX);

        let node = Arc::new(DelayNode::new(amount, time, feedback, low_pass_cutoff));
        node.bypass.set(state.node_bypass());

        Self {
            state,
            amount,
            time,
            feedback,
            low_pass_cutoff,
            node,
            presets: PresetStore::with_user_presets(user_presets),
        }
    }

    pub fn node(&self) -> &Arc<DelayNode> {
        &self.node
    }

    pub fn amount(&self) -> f32 {
        self.amount
    }

    pub fn set_amount(&mut self, amount: f32) {
        self.amount = amount.clamp(AMOUNT_MIN, AMOUNT_MAX);
        self.node.wet_dry_mix.set(self.amount);
        trace!("Delay amount set to {}", self.amount);
    }

    /// Delay time in seconds
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn set_time(&mut self, time: f64) {
        self.time = time.clamp(TIME_MIN, TIME_MAX);
        self.node.delay_time.set(self.time);
        trace!("Delay time set to {} s", self.time);
    }

    pub fn feedback(&self) -> f32 {
        self.feedback
    }

    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback = feedback.clamp(FEEDBACK_MIN, FEEDBACK_MAX);
        self.node.feedback.set(self.feedback);
        trace!("Delay feedback set to {}", self.feedback);
    }

    pub fn low_pass_cutoff(&self) -> f32 {
        self.low_pass_cutoff
    }

    pub fn set_low_pass_cutoff(&mut self, cutoff: f32) {
        self.low_pass_cutoff = cutoff.clamp(CUTOFF_MIN, CUTOFF_MAX);
        self.node.low_pass_cutoff.set(self.low_pass_cutoff);
        trace!("Delay low-pass cutoff set to {} Hz", self.low_pass_cutoff);
    }
}

impl EffectsUnit for DelayUnit {
    fn kind(&self) -> EffectsUnitKind {
        EffectsUnitKind::Delay
    }

    fn state(&self) -> EffectsUnitState {
        self.state
    }

    fn set_state(&mut self, state: EffectsUnitState) {
        self.state = state;
        self.node.bypass.set(state.node_bypass());
    }
}

impl PresetUnit for DelayUnit {
    type Preset = DelayPreset;

    fn presets(&self) -> &PresetStore<DelayPreset> {
        &self.presets
    }

    fn presets_mut(&mut self) -> &mut PresetStore<DelayPreset> {
        &mut self.presets
    }

    fn settings_as_preset(&self) -> DelayPreset {
        DelayPreset {
            name: self.kind().settings_preset_name(),
            state: self.state,
            user_defined: false,
            amount: self.amount,
            time: self.time,
            feedback: self.feedback,
            low_pass_cutoff: self.low_pass_cutoff,
        }
    }

    fn apply_preset(&mut self, preset: &DelayPreset) {
        self.set_amount(preset.amount);
        self.set_time(preset.time);
        self.set_feedback(preset.feedback);
        self.set_low_pass_cutoff(preset.low_pass_cutoff);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::effects::transitions::walk_states;
    use proptest::prelude::*;

    #[test]
    fn test_state_transitions_sync_node() {
        walk_states(DelayUnit::default(), |unit| unit.node().bypass.get());
    }

    #[test]
    fn test_defaults_reach_node() {
        let unit = DelayUnit::default();
        let node = unit.node();
        assert!(node.bypass.get());
        assert_eq!(node.wet_dry_mix.get(), 100.0);
        assert_eq!(node.delay_time.get(), 1.0);
        assert_eq!(node.feedback.get(), 50.0);
        assert_eq!(node.low_pass_cutoff.get(), 15000.0);
    }

    #[test]
    fn test_clamping() {
        let mut unit = DelayUnit::default();
        unit.set_time(5.0);
        unit.set_feedback(-150.0);
        unit.set_low_pass_cutoff(1.0);
        unit.set_amount(-1.0);

        assert_eq!(unit.time(), TIME_MAX);
        assert_eq!(unit.feedback(), FEEDBACK_MIN);
        assert_eq!(unit.low_pass_cutoff(), CUTOFF_MIN);
        assert_eq!(unit.amount(), AMOUNT_MIN);
    }

    proptest! {
        #[test]
        fn prop_preset_round_trip(
            amount in AMOUNT_MIN..AMOUNT_MAX,
            time in TIME_MIN..TIME_MAX,
            feedback in FEEDBACK_MIN..FEEDBACK_MAX,
            cutoff in CUTOFF_MIN..CUTOFF_MAX,
        ) {
            let mut unit = DelayUnit::default();
            unit.set_amount(amount);
            unit.set_time(time);
            unit.set_feedback(feedback);
            unit.set_low_pass_cutoff(cutoff);
            unit.save_preset("X");

            let state = unit.toggle_state();
            unit.apply_preset(&DelayUnit::default().settings_as_preset());

            prop_assert!(unit.apply_preset_named("X"));
            prop_assert!((unit.amount() - amount).abs() < 0.001);
            prop_assert!((unit.time() - time).abs() < 0.001);
            prop_assert!((unit.feedback() - feedback).abs() < 0.001);
            prop_assert!((unit.low_pass_cutoff() - cutoff).abs() < 0.001);
            prop_assert_eq!(unit.state(), state);
        }
    }
}
