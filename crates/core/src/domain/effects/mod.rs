//! Effects units of the playback chain
//!
//! The chain is, in render order: equalizer, pitch shift, time stretch,
//! reverb, delay, filter, then any number of hosted audio units. Every unit
//! follows the same tri-state lifecycle ([`EffectsUnit`]) and keeps its own
//! named presets ([`PresetUnit`]). The [`MasterUnit`] owns them all.

pub mod delay;
pub mod eq;
pub mod filter;
pub mod hosted;
pub mod master;
pub mod pitch;
pub mod preset;
pub mod reverb;
pub mod state;
pub mod time;

#[cfg(test)]
pub(crate) mod transitions;

pub use delay::{DelayPreset, DelayUnit};
pub use eq::{EqPreset, EqType, EqUnit};
pub use filter::{FilterBand, FilterBandType, FilterPreset, FilterUnit};
pub use hosted::{
    AudioUnitComponent, AudioUnitHost, AudioUnitInstance, AudioUnitParameter, AudioUnitRegistry,
    FourCc, HostedAudioUnit, HostedUnitPreset,
};
pub use master::{MasterPreset, MasterUnit, NativeUnits};
pub use pitch::{PitchShiftPreset, PitchShiftUnit};
pub use preset::{EffectsUnitPreset, PresetStore};
pub use reverb::{ReverbPreset, ReverbSpace, ReverbUnit};
pub use state::EffectsUnitState;
pub use time::{TimeStretchPreset, TimeStretchUnit};

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Closed set of unit kinds in the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectsUnitKind {
    Master,
    Eq,
    PitchShift,
    TimeStretch,
    Reverb,
    Delay,
    Filter,
    Hosted,
}

impl EffectsUnitKind {
    /// Native units in render order
    pub const NATIVE: [EffectsUnitKind; 6] = [
        EffectsUnitKind::Eq,
        EffectsUnitKind::PitchShift,
        EffectsUnitKind::TimeStretch,
        EffectsUnitKind::Reverb,
        EffectsUnitKind::Delay,
        EffectsUnitKind::Filter,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EffectsUnitKind::Master => "Master",
            EffectsUnitKind::Eq => "Equalizer",
            EffectsUnitKind::PitchShift => "Pitch Shift",
            EffectsUnitKind::TimeStretch => "Time Stretch",
            EffectsUnitKind::Reverb => "Reverb",
            EffectsUnitKind::Delay => "Delay",
            EffectsUnitKind::Filter => "Filter",
            EffectsUnitKind::Hosted => "Audio Unit",
        }
    }

    /// Name given to the preset that captures a unit's live settings
    pub fn settings_preset_name(self) -> String {
        format!("{} settings", self.name())
    }
}

impl fmt::Display for EffectsUnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lifecycle contract shared by every unit
///
/// Implementors provide the state storage; the transitions are built on top.
/// `set_state` must update the unit's render node bypass flag(s) before it
/// returns.
pub trait EffectsUnit {
    fn kind(&self) -> EffectsUnitKind;

    fn state(&self) -> EffectsUnitState;

    /// Store the state and sync the render node
    fn set_state(&mut self, state: EffectsUnitState);

    fn is_active(&self) -> bool {
        self.state().is_active()
    }

    /// `Active <-> Bypassed`; no-op when suppressed. Returns the new state.
    fn toggle_state(&mut self) -> EffectsUnitState {
        let next = self.state().toggled();
        if next != self.state() {
            debug!("{} toggled to {}", self.kind(), next);
            self.set_state(next);
        }
        next
    }

    /// `Active -> Suppressed`; no-op otherwise
    fn suppress(&mut self) {
        let next = self.state().suppressed();
        if next != self.state() {
            debug!("{} suppressed", self.kind());
            self.set_state(next);
        }
    }

    /// `Suppressed -> Active`; no-op otherwise
    fn unsuppress(&mut self) {
        let next = self.state().unsuppressed();
        if next != self.state() {
            debug!("{} unsuppressed", self.kind());
            self.set_state(next);
        }
    }
}

/// Preset contract shared by every unit
pub trait PresetUnit: EffectsUnit {
    type Preset: EffectsUnitPreset;

    fn presets(&self) -> &PresetStore<Self::Preset>;

    fn presets_mut(&mut self) -> &mut PresetStore<Self::Preset>;

    /// Snapshot of the current parameters and state
    fn settings_as_preset(&self) -> Self::Preset;

    /// Copy the preset's parameters onto the unit. Never changes the state.
    fn apply_preset(&mut self, preset: &Self::Preset);

    /// Capture the current settings as a user preset called `name`
    fn save_preset(&mut self, name: &str) {
        let mut preset = self.settings_as_preset();
        preset.set_name(name.to_string());
        preset.set_user_defined(true);
        debug!("{} saving preset '{}'", self.kind(), name);
        self.presets_mut().add(preset);
    }

    /// Apply the preset called `name`. Returns false when no such preset exists.
    fn apply_preset_named(&mut self, name: &str) -> bool {
        match self.presets().preset(name).cloned() {
            Some(preset) => {
                debug!("{} applying preset '{}'", self.kind(), name);
                self.apply_preset(&preset);
                true
            }
            None => false,
        }
    }
}
