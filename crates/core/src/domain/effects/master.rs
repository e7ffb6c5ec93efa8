//! Master unit: owner of every effects unit in the chain
//!
//! The master has its own state, separate from its children. Toggling the
//! master bypasses the whole chain on the render side without touching any
//! child's state; when it is re-enabled each child resumes exactly as it was.
//! Cascading a suppression over the children is a separate, explicit call
//! ([`MasterUnit::suppress_native_units`]).

use super::delay::{DelayPreset, DelayUnit};
use super::eq::{EqPreset, EqUnit};
use super::filter::{FilterPreset, FilterUnit};
use super::hosted::{AudioUnitHost, FourCc, HostedAudioUnit};
use super::pitch::{PitchShiftPreset, PitchShiftUnit};
use super::preset::{impl_effects_unit_preset, PresetStore};
use super::reverb::{ReverbPreset, ReverbUnit};
use super::state::EffectsUnitState;
use super::time::{TimeStretchPreset, TimeStretchUnit};
use super::{EffectsUnit, EffectsUnitKind, PresetUnit};
use crate::domain::audio::AudioError;
use crate::domain::node::MasterNode;
use crate::domain::sound_profile::SoundProfiles;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Snapshot of all six native units
///
/// A sub-preset missing from a saved master preset reads back as that
/// unit's default settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterPreset {
    pub name: String,
    #[serde(default = "default_master_state")]
    pub state: EffectsUnitState,
    #[serde(default)]
    pub user_defined: bool,
    #[serde(default)]
    pub eq: EqPreset,
    #[serde(default)]
    pub pitch: PitchShiftPreset,
    #[serde(default)]
    pub time: TimeStretchPreset,
    #[serde(default)]
    pub reverb: ReverbPreset,
    #[serde(default)]
    pub delay: DelayPreset,
    #[serde(default)]
    pub filter: FilterPreset,
}

fn default_master_state() -> EffectsUnitState {
    EffectsUnitState::Active
}

impl Default for MasterPreset {
    fn default() -> Self {
        Self {
            name: EffectsUnitKind::Master.settings_preset_name(),
            state: default_master_state(),
            user_defined: false,
            eq: EqPreset::default(),
            pitch: PitchShiftPreset::default(),
            time: TimeStretchPreset::default(),
            reverb: ReverbPreset::default(),
            delay: DelayPreset::default(),
            filter: FilterPreset::default(),
        }
    }
}

impl_effects_unit_preset!(MasterPreset);

/// The six native units, in render order
#[derive(Debug, Default)]
pub struct NativeUnits {
    pub eq: EqUnit,
    pub pitch: PitchShiftUnit,
    pub time: TimeStretchUnit,
    pub reverb: ReverbUnit,
    pub delay: DelayUnit,
    pub filter: FilterUnit,
}

#[derive(Debug)]
pub struct MasterUnit {
    state: EffectsUnitState,
    node: Arc<MasterNode>,
    units: NativeUnits,
    hosted_units: Vec<HostedAudioUnit>,
    presets: PresetStore<MasterPreset>,
    sound_profiles: SoundProfiles,
}

impl Default for MasterUnit {
    fn default() -> Self {
        Self::new(
            EffectsUnitState::Active,
            NativeUnits::default(),
            Vec::new(),
            SoundProfiles::default(),
        )
    }
}

impl MasterUnit {
    pub fn new(
        state: EffectsUnitState,
        units: NativeUnits,
        user_presets: Vec<MasterPreset>,
        sound_profiles: SoundProfiles,
    ) -> Self {
        Self {
            state,
            node: Arc::new(MasterNode::new(state.node_bypass())),
            units,
            hosted_units: Vec::new(),
            presets: PresetStore::with_user_presets(user_presets),
            sound_profiles,
        }
    }

    pub fn node(&self) -> &Arc<MasterNode> {
        &self.node
    }

    pub fn eq(&self) -> &EqUnit {
        &self.units.eq
    }

    pub fn eq_mut(&mut self) -> &mut EqUnit {
        &mut self.units.eq
    }

    pub fn pitch(&self) -> &PitchShiftUnit {
        &self.units.pitch
    }

    pub fn pitch_mut(&mut self) -> &mut PitchShiftUnit {
        &mut self.units.pitch
    }

    pub fn time(&self) -> &TimeStretchUnit {
        &self.units.time
    }

    pub fn time_mut(&mut self) -> &mut TimeStretchUnit {
        &mut self.units.time
    }

    pub fn reverb(&self) -> &ReverbUnit {
        &self.units.reverb
    }

    pub fn reverb_mut(&mut self) -> &mut ReverbUnit {
        &mut self.units.reverb
    }

    pub fn delay(&self) -> &DelayUnit {
        &self.units.delay
    }

    pub fn delay_mut(&mut self) -> &mut DelayUnit {
        &mut self.units.delay
    }

    pub fn filter(&self) -> &FilterUnit {
        &self.units.filter
    }

    pub fn filter_mut(&mut self) -> &mut FilterUnit {
        &mut self.units.filter
    }

    pub fn sound_profiles(&self) -> &SoundProfiles {
        &self.sound_profiles
    }

    pub fn sound_profiles_mut(&mut self) -> &mut SoundProfiles {
        &mut self.sound_profiles
    }

    // ------------------------------------------------------------------------
    // Hosted units
    // ------------------------------------------------------------------------

    pub fn hosted_units(&self) -> &[HostedAudioUnit] {
        &self.hosted_units
    }

    pub fn hosted_unit(&self, index: usize) -> Option<&HostedAudioUnit> {
        self.hosted_units.get(index)
    }

    pub fn hosted_unit_mut(&mut self, index: usize) -> Option<&mut HostedAudioUnit> {
        self.hosted_units.get_mut(index)
    }

    /// Instantiate a plugin and append it to the chain, active
    ///
    /// Returns `None` when the host has no such component or cannot create
    /// an instance.
    pub fn add_audio_unit(
        &mut self,
        host: &dyn AudioUnitHost,
        component_type: FourCc,
        component_sub_type: FourCc,
    ) -> Option<(&HostedAudioUnit, usize)> {
        let component = match host.component(component_type, component_sub_type) {
            Some(component) => component,
            None => {
                let err = AudioError::ComponentNotFound {
                    component_type,
                    component_sub_type,
                };
                warn!("Cannot add audio unit: {}", err);
                return None;
            }
        };

        let instance = match host.instantiate(&component) {
            Ok(instance) => instance,
            Err(e) => {
                warn!("Cannot add audio unit: {}", e);
                return None;
            }
        };

        let unit = HostedAudioUnit::new(
            component,
            instance,
            EffectsUnitState::Active,
            &[],
            Vec::new(),
        );
        let index = self.push_hosted_unit(unit);
        self.hosted_units.get(index).map(|unit| (unit, index))
    }

    /// Append an already built hosted unit; returns its index
    pub fn push_hosted_unit(&mut self, unit: HostedAudioUnit) -> usize {
        info!(
            "Audio unit '{}' added at index {}",
            unit.name(),
            self.hosted_units.len()
        );
        self.hosted_units.push(unit);
        self.hosted_units.len() - 1
    }

    /// Remove hosted units by index
    ///
    /// Indices are processed in descending order; the survivors keep their
    /// relative order at indices `0..len`. Unknown and duplicate indices are
    /// ignored. Returns the removed units in descending index order.
    pub fn remove_audio_units(&mut self, indices: &[usize]) -> Vec<HostedAudioUnit> {
        let mut sorted: Vec<usize> = indices
            .iter()
            .copied()
            .filter(|&index| index < self.hosted_units.len())
            .collect();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        sorted.dedup();

        let removed: Vec<HostedAudioUnit> = sorted
            .into_iter()
            .map(|index| self.hosted_units.remove(index))
            .collect();

        for unit in &removed {
            unit.instance().set_bypass(true);
        }
        if !removed.is_empty() {
            info!("Removed {} audio units", removed.len());
        }
        removed
    }

    // ------------------------------------------------------------------------
    // Aggregate state
    // ------------------------------------------------------------------------

    /// Suppress every active child unit, native and hosted
    pub fn suppress_native_units(&mut self) {
        self.for_each_child(|unit| unit.suppress());
        debug!("Child units suppressed");
    }

    /// Restore every suppressed child unit to active
    pub fn unsuppress_native_units(&mut self) {
        self.for_each_child(|unit| unit.unsuppress());
        debug!("Child units unsuppressed");
    }

    fn for_each_child(&mut self, mut f: impl FnMut(&mut dyn EffectsUnit)) {
        f(&mut self.units.eq);
        f(&mut self.units.pitch);
        f(&mut self.units.time);
        f(&mut self.units.reverb);
        f(&mut self.units.delay);
        f(&mut self.units.filter);
        for unit in &mut self.hosted_units {
            f(unit);
        }
    }

    /// Kind and state of every child, in chain order
    pub fn unit_states(&self) -> Vec<(EffectsUnitKind, EffectsUnitState)> {
        let mut states = vec![
            (EffectsUnitKind::Eq, self.units.eq.state()),
            (EffectsUnitKind::PitchShift, self.units.pitch.state()),
            (EffectsUnitKind::TimeStretch, self.units.time.state()),
            (EffectsUnitKind::Reverb, self.units.reverb.state()),
            (EffectsUnitKind::Delay, self.units.delay.state()),
            (EffectsUnitKind::Filter, self.units.filter.state()),
        ];
        states.extend(
            self.hosted_units
                .iter()
                .map(|unit| (EffectsUnitKind::Hosted, unit.state())),
        );
        states
    }

    /// Whether a unit of `kind` is heard: both the master and the unit must be
    /// active. For `Hosted`, true when any hosted unit is active.
    pub fn is_unit_audible(&self, kind: EffectsUnitKind) -> bool {
        if !self.is_active() {
            return false;
        }

        match kind {
            EffectsUnitKind::Master => true,
            EffectsUnitKind::Eq => self.units.eq.is_active(),
            EffectsUnitKind::PitchShift => self.units.pitch.is_active(),
            EffectsUnitKind::TimeStretch => self.units.time.is_active(),
            EffectsUnitKind::Reverb => self.units.reverb.is_active(),
            EffectsUnitKind::Delay => self.units.delay.is_active(),
            EffectsUnitKind::Filter => self.units.filter.is_active(),
            EffectsUnitKind::Hosted => self.hosted_units.iter().any(|u| u.is_active()),
        }
    }
}

impl EffectsUnit for MasterUnit {
    fn kind(&self) -> EffectsUnitKind {
        EffectsUnitKind::Master
    }

    fn state(&self) -> EffectsUnitState {
        self.state
    }

    fn set_state(&mut self, state: EffectsUnitState) {
        self.state = state;
        self.node.bypass.set(state.node_bypass());
    }
}

impl PresetUnit for MasterUnit {
    type Preset = MasterPreset;

    fn presets(&self) -> &PresetStore<MasterPreset> {
        &self.presets
    }

    fn presets_mut(&mut self) -> &mut PresetStore<MasterPreset> {
        &mut self.presets
    }

    fn settings_as_preset(&self) -> MasterPreset {
        MasterPreset {
            name: self.kind().settings_preset_name(),
            state: self.state,
            user_defined: false,
            eq: self.units.eq.settings_as_preset(),
            pitch: self.units.pitch.settings_as_preset(),
            time: self.units.time.settings_as_preset(),
            reverb: self.units.reverb.settings_as_preset(),
            delay: self.units.delay.settings_as_preset(),
            filter: self.units.filter.settings_as_preset(),
        }
    }

    fn apply_preset(&mut self, preset: &MasterPreset) {
        self.units.eq.apply_preset(&preset.eq);
        self.units.pitch.apply_preset(&preset.pitch);
        self.units.time.apply_preset(&preset.time);
        self.units.reverb.apply_preset(&preset.reverb);
        self.units.delay.apply_preset(&preset.delay);
        self.units.filter.apply_preset(&preset.filter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::effects::{AudioUnitComponent, AudioUnitRegistry, FilterBand};

    fn registry(count: usize) -> AudioUnitRegistry {
        let mut registry = AudioUnitRegistry::new();
        for i in 0..count {
            registry.register(
                AudioUnitComponent {
                    component_type: "aufx".parse().unwrap(),
                    component_sub_type: format!("fx{:02}", i).parse().unwrap(),
                    name: format!("Effect {}", i),
                    version: "1".to_string(),
                    manufacturer_name: "Test".to_string(),
                },
                Vec::new(),
            );
        }
        registry
    }

    fn sub_type(i: usize) -> FourCc {
        format!("fx{:02}", i).parse().unwrap()
    }

    #[test]
    fn test_master_toggle_keeps_children() {
        let mut master = MasterUnit::default();
        master.eq_mut().toggle_state();
        assert!(master.is_unit_audible(EffectsUnitKind::Eq));

        master.toggle_state();
        assert!(master.node().bypass.get());
        assert_eq!(master.eq().state(), EffectsUnitState::Active);
        assert!(!master.eq().node().bypass.get());
        assert!(!master.is_unit_audible(EffectsUnitKind::Eq));

        master.toggle_state();
        assert!(master.is_unit_audible(EffectsUnitKind::Eq));
        assert!(!master.is_unit_audible(EffectsUnitKind::Delay));
    }

    #[test]
    fn test_suppress_cascade() {
        let host = registry(1);
        let mut master = MasterUnit::default();
        master.reverb_mut().toggle_state();
        master.add_audio_unit(&host, "aufx".parse().unwrap(), sub_type(0));

        master.suppress_native_units();
        assert_eq!(master.reverb().state(), EffectsUnitState::Suppressed);
        assert_eq!(master.hosted_units()[0].state(), EffectsUnitState::Suppressed);
        // Bypassed units stay bypassed
        assert_eq!(master.delay().state(), EffectsUnitState::Bypassed);

        master.unsuppress_native_units();
        assert!(master.reverb().is_active());
        assert!(master.hosted_units()[0].is_active());
    }

    #[test]
    fn test_hosted_index_compaction() {
        let host = registry(5);
        let aufx: FourCc = "aufx".parse().unwrap();
        let mut master = MasterUnit::default();

        for i in 0..5 {
            let (_, index) = master.add_audio_unit(&host, aufx, sub_type(i)).unwrap();
            assert_eq!(index, i);
        }

        let removed = master.remove_audio_units(&[1, 3]);
        assert_eq!(removed.len(), 2);
        assert!(removed.iter().all(|u| u.instance().is_bypassed()));

        let names: Vec<&str> = master.hosted_units().iter().map(|u| u.name()).collect();
        assert_eq!(names, vec!["Effect 0", "Effect 2", "Effect 4"]);
    }

    #[test]
    fn test_add_unknown_component() {
        let host = registry(0);
        let mut master = MasterUnit::default();
        assert!(master
            .add_audio_unit(&host, "aufx".parse().unwrap(), sub_type(9))
            .is_none());
        assert!(master.hosted_units().is_empty());
    }

    #[test]
    fn test_unit_states_order() {
        let host = registry(1);
        let mut master = MasterUnit::default();
        master.add_audio_unit(&host, "aufx".parse().unwrap(), sub_type(0));

        let kinds: Vec<EffectsUnitKind> = master.unit_states().into_iter().map(|(k, _)| k).collect();
        let mut expected = EffectsUnitKind::NATIVE.to_vec();
        expected.push(EffectsUnitKind::Hosted);
        assert_eq!(kinds, expected);
    }

    #[test]
    fn test_master_preset_parameters_only() {
        let mut master = MasterUnit::default();
        master.eq_mut().set_band(2, 6.0);
        master.pitch_mut().set_pitch(300.0);
        master.time_mut().set_rate(1.5);
        master.reverb_mut().set_amount(20.0);
        master.delay_mut().set_time(0.25);
        master.filter_mut().add_band(FilterBand::low_pass(2000.0));
        master.save_preset("Everything");

        master.eq_mut().set_band(2, 0.0);
        master.pitch_mut().set_pitch(0.0);
        master.time_mut().set_rate(1.0);
        master.reverb_mut().set_amount(50.0);
        master.delay_mut().set_time(1.0);
        master.filter_mut().set_bands(Vec::new());
        master.pitch_mut().toggle_state();

        assert!(master.apply_preset_named("Everything"));
        assert!((master.eq().band(2).unwrap() - 6.0).abs() < 0.001);
        assert!((master.pitch().pitch() - 300.0).abs() < 0.001);
        assert!((master.time().rate() - 1.5).abs() < 0.001);
        assert!((master.reverb().amount() - 20.0).abs() < 0.001);
        assert!((master.delay().time() - 0.25).abs() < 0.001);
        assert_eq!(master.filter().band_count(), 1);
        assert!(master.pitch().is_active());
    }
}
