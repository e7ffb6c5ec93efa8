//! Audio graph: the top-level owner of the effects chain
//!
//! Holds the player output stage (volume, pan, mute, output device) and the
//! [`MasterUnit`]. Built from an [`AudioGraphState`] at startup and turned
//! back into one at shutdown.

use crate::domain::audio::DeviceId;
use crate::domain::effects::{
    AudioUnitHost, AudioUnitInstance, DelayUnit, EffectsUnit, EffectsUnitState, EqType, EqUnit,
    FilterUnit, FourCc, HostedAudioUnit, MasterUnit, NativeUnits, PitchShiftUnit, PresetUnit,
    ReverbUnit, TimeStretchUnit,
};
use crate::domain::node::{
    DelayNode, EqNode, FilterNode, MasterNode, OutputNode, PitchShiftNode, ReverbNode,
    TimeStretchNode,
};
use crate::domain::persistence::{
    AudioGraphState, AudioUnitState, DelayUnitState, EqUnitState, FilterUnitState,
    MasterUnitState, PitchShiftUnitState, ReverbUnitState, TimeStretchUnitState,
};
use crate::domain::sound_profile::SoundProfiles;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

pub const VOLUME_MIN: f32 = 0.0;
pub const VOLUME_MAX: f32 = 1.0;
pub const PAN_MIN: f32 = -1.0;
pub const PAN_MAX: f32 = 1.0;

pub const DEFAULT_VOLUME: f32 = 0.5;
pub const DEFAULT_PAN: f32 = 0.0;

/// Node handles read by the render thread
#[derive(Clone)]
pub struct RenderHandles {
    pub output: Arc<OutputNode>,
    pub master: Arc<MasterNode>,
    pub eq: Arc<EqNode>,
    pub pitch: Arc<PitchShiftNode>,
    pub time: Arc<TimeStretchNode>,
    pub reverb: Arc<ReverbNode>,
    pub delay: Arc<DelayNode>,
    pub filter: Arc<FilterNode>,
    /// Hosted instances at the time the handles were taken, in chain order
    pub hosted: Vec<Arc<dyn AudioUnitInstance>>,
}

impl fmt::Debug for RenderHandles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderHandles")
            .field("output", &self.output)
            .field("master", &self.master)
            .field("hosted", &self.hosted.len())
            .finish_non_exhaustive()
    }
}

pub struct AudioGraph {
    host: Arc<dyn AudioUnitHost>,
    output: Arc<OutputNode>,
    output_device: Option<DeviceId>,
    master: MasterUnit,
}

impl fmt::Debug for AudioGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioGraph")
            .field("output", &self.output)
            .field("output_device", &self.output_device)
            .field("master", &self.master)
            .finish_non_exhaustive()
    }
}

impl AudioGraph {
    /// Graph with factory defaults
    pub fn new(host: Arc<dyn AudioUnitHost>) -> Self {
        Self::from_state(AudioGraphState::default(), host)
    }

    /// Build the live chain from persisted state
    ///
    /// Missing fields fall back to defaults. Hosted units whose component is
    /// unknown to `host` or cannot be instantiated are skipped.
    pub fn from_state(state: AudioGraphState, host: Arc<dyn AudioUnitHost>) -> Self {
        let volume = state
            .volume
            .unwrap_or(DEFAULT_VOLUME)
            .clamp(VOLUME_MIN, VOLUME_MAX);
        let pan = state.pan.unwrap_or(DEFAULT_PAN).clamp(PAN_MIN, PAN_MAX);
        let muted = state.muted.unwrap_or(false);

        let units = NativeUnits {
            eq: eq_from_state(state.eq_unit.unwrap_or_default()),
            pitch: pitch_from_state(state.pitch_unit.unwrap_or_default()),
            time: time_from_state(state.time_unit.unwrap_or_default()),
            reverb: reverb_from_state(state.reverb_unit.unwrap_or_default()),
            delay: delay_from_state(state.delay_unit.unwrap_or_default()),
            filter: filter_from_state(state.filter_unit.unwrap_or_default()),
        };

        let master_state = state.master_unit.unwrap_or_default();
        let mut master = MasterUnit::new(
            master_state.state.unwrap_or(EffectsUnitState::Active),
            units,
            master_state.user_presets.unwrap_or_default(),
            SoundProfiles::new(state.sound_profiles.unwrap_or_default()),
        );

        for unit_state in state.audio_units.unwrap_or_default() {
            if let Some(unit) = hosted_from_state(host.as_ref(), unit_state) {
                master.push_hosted_unit(unit);
            }
        }

        info!(
            "Audio graph built: volume {}, pan {}, muted {}, {} hosted units",
            volume,
            pan,
            muted,
            master.hosted_units().len()
        );

        Self {
            host,
            output: Arc::new(OutputNode::new(volume, pan, muted)),
            output_device: state.output_device,
            master,
        }
    }

    /// Capture the live chain for persistence
    pub fn persistent_state(&self) -> AudioGraphState {
        let master = &self.master;
        let eq = master.eq();
        let pitch = master.pitch();
        let time = master.time();
        let reverb = master.reverb();
        let delay = master.delay();
        let filter = master.filter();

        AudioGraphState {
            output_device: self.output_device.clone(),
            volume: Some(self.volume()),
            muted: Some(self.muted()),
            pan: Some(self.pan()),
            master_unit: Some(MasterUnitState {
                state: Some(master.state()),
                user_presets: Some(master.presets().user_defined().to_vec()),
            }),
            eq_unit: Some(EqUnitState {
                state: Some(eq.state()),
                user_presets: Some(eq.presets().user_defined().to_vec()),
                eq_type: Some(eq.eq_type()),
                global_gain: Some(eq.global_gain()),
                bands: Some(eq.bands().to_vec()),
            }),
            pitch_unit: Some(PitchShiftUnitState {
                state: Some(pitch.state()),
                user_presets: Some(pitch.presets().user_defined().to_vec()),
                pitch: Some(pitch.pitch()),
                overlap: Some(pitch.overlap()),
            }),
            time_unit: Some(TimeStretchUnitState {
                state: Some(time.state()),
                user_presets: Some(time.presets().user_defined().to_vec()),
                rate: Some(time.rate()),
                shift_pitch: Some(time.shift_pitch()),
                overlap: Some(time.overlap()),
            }),
            reverb_unit: Some(ReverbUnitState {
                state: Some(reverb.state()),
                user_presets: Some(reverb.presets().user_defined().to_vec()),
                space: Some(reverb.space()),
                amount: Some(reverb.amount()),
            }),
            delay_unit: Some(DelayUnitState {
                state: Some(delay.state()),
                user_presets: Some(delay.presets().user_defined().to_vec()),
                amount: Some(delay.amount()),
                time: Some(delay.time()),
                feedback: Some(delay.feedback()),
                low_pass_cutoff: Some(delay.low_pass_cutoff()),
            }),
            filter_unit: Some(FilterUnitState {
                state: Some(filter.state()),
                user_presets: Some(filter.presets().user_defined().to_vec()),
                bands: Some(filter.bands().to_vec()),
            }),
            audio_units: Some(
                master
                    .hosted_units()
                    .iter()
                    .map(|unit| AudioUnitState {
                        state: Some(unit.state()),
                        user_presets: Some(unit.presets().user_defined().to_vec()),
                        component_type: Some(unit.component_type()),
                        component_sub_type: Some(unit.component_sub_type()),
                        params: Some(unit.parameters()),
                    })
                    .collect(),
            ),
            sound_profiles: Some(master.sound_profiles().iter().cloned().collect()),
        }
    }

    pub fn host(&self) -> &Arc<dyn AudioUnitHost> {
        &self.host
    }

    pub fn master(&self) -> &MasterUnit {
        &self.master
    }

    pub fn master_mut(&mut self) -> &mut MasterUnit {
        &mut self.master
    }

    // ------------------------------------------------------------------------
    // Output stage
    // ------------------------------------------------------------------------

    pub fn volume(&self) -> f32 {
        self.output.volume()
    }

    pub fn set_volume(&mut self, volume: f32) {
        let volume = volume.clamp(VOLUME_MIN, VOLUME_MAX);
        self.output.set_volume(volume);
        trace!("Volume set to {}", volume);
    }

    pub fn increase_volume(&mut self, step: f32) -> f32 {
        self.set_volume(self.volume() + step);
        self.volume()
    }

    pub fn decrease_volume(&mut self, step: f32) -> f32 {
        self.set_volume(self.volume() - step);
        self.volume()
    }

    pub fn pan(&self) -> f32 {
        self.output.pan()
    }

    pub fn set_pan(&mut self, pan: f32) {
        let pan = pan.clamp(PAN_MIN, PAN_MAX);
        self.output.set_pan(pan);
        trace!("Pan set to {}", pan);
    }

    pub fn pan_left(&mut self, step: f32) -> f32 {
        self.set_pan(self.pan() - step);
        self.pan()
    }

    pub fn pan_right(&mut self, step: f32) -> f32 {
        self.set_pan(self.pan() + step);
        self.pan()
    }

    pub fn muted(&self) -> bool {
        self.output.muted()
    }

    /// Silence the output without touching the stored volume
    pub fn set_muted(&mut self, muted: bool) {
        self.output.set_muted(muted);
        debug!("Muted: {}", muted);
    }

    pub fn toggle_mute(&mut self) -> bool {
        let muted = !self.muted();
        self.set_muted(muted);
        muted
    }

    /// Gain actually applied to the signal: 0 while muted, else the volume
    pub fn audible_gain(&self) -> f32 {
        self.output.gain()
    }

    /// Selected output device; `None` follows the system default
    pub fn output_device(&self) -> Option<&DeviceId> {
        self.output_device.as_ref()
    }

    pub fn set_output_device(&mut self, device: Option<DeviceId>) {
        match &device {
            Some(id) => info!("Output device set to {}", id),
            None => info!("Output device set to system default"),
        }
        self.output_device = device;
    }

    // ------------------------------------------------------------------------
    // Hosted units
    // ------------------------------------------------------------------------

    pub fn add_audio_unit(
        &mut self,
        component_type: FourCc,
        component_sub_type: FourCc,
    ) -> Option<(&HostedAudioUnit, usize)> {
        self.master
            .add_audio_unit(self.host.as_ref(), component_type, component_sub_type)
    }

    pub fn remove_audio_units(&mut self, indices: &[usize]) -> Vec<HostedAudioUnit> {
        self.master.remove_audio_units(indices)
    }

    // ------------------------------------------------------------------------
    // Sound profiles
    // ------------------------------------------------------------------------

    /// Remember the current volume, pan and effects for `file`
    pub fn remember_sound_profile(&mut self, file: &Path) {
        let effects = self.master.settings_as_preset();
        let (volume, pan) = (self.volume(), self.pan());
        self.master
            .sound_profiles_mut()
            .save(file, volume, pan, effects);
    }

    /// Restore the profile saved for `file`. Returns false when there is none.
    pub fn apply_sound_profile(&mut self, file: &Path) -> bool {
        let Some(profile) = self.master.sound_profiles().get(file).cloned() else {
            return false;
        };

        self.set_volume(profile.volume);
        self.set_pan(profile.pan);
        self.master.apply_preset(&profile.effects);
        debug!("Applied sound profile for {}", file.display());
        true
    }

    pub fn forget_sound_profile(&mut self, file: &Path) -> bool {
        self.master.sound_profiles_mut().delete(file).is_some()
    }

    /// Handles for the render thread. Hosted instances added or removed
    /// later need a fresh call.
    pub fn render_handles(&self) -> RenderHandles {
        RenderHandles {
            output: Arc::clone(&self.output),
            master: Arc::clone(self.master.node()),
            eq: Arc::clone(self.master.eq().node()),
            pitch: Arc::clone(self.master.pitch().node()),
            time: Arc::clone(self.master.time().node()),
            reverb: Arc::clone(self.master.reverb().node()),
            delay: Arc::clone(self.master.delay().node()),
            filter: Arc::clone(self.master.filter().node()),
            hosted: self
                .master
                .hosted_units()
                .iter()
                .map(|unit| Arc::clone(unit.instance()))
                .collect(),
        }
    }
}

// ============================================================================
// STATE -> UNITS
// ============================================================================

fn eq_from_state(state: EqUnitState) -> EqUnit {
    EqUnit::with_settings(
        state.eq_type.unwrap_or(EqType::default()),
        state.state.unwrap_or_default(),
        state.global_gain.unwrap_or(0.0),
        state.bands.as_deref().unwrap_or(&[]),
        state.user_presets.unwrap_or_default(),
    )
}

fn pitch_from_state(state: PitchShiftUnitState) -> PitchShiftUnit {
    PitchShiftUnit::with_settings(
        state.state.unwrap_or_default(),
        state.pitch.unwrap_or(crate::domain::effects::pitch::DEFAULT_PITCH),
        state.overlap.unwrap_or(crate::domain::effects::pitch::DEFAULT_OVERLAP),
        state.user_presets.unwrap_or_default(),
    )
}

fn time_from_state(state: TimeStretchUnitState) -> TimeStretchUnit {
    use crate::domain::effects::time::{DEFAULT_OVERLAP, DEFAULT_RATE};

    TimeStretchUnit::with_settings(
        state.state.unwrap_or_default(),
        state.rate.unwrap_or(DEFAULT_RATE),
        state.overlap.unwrap_or(DEFAULT_OVERLAP),
        state.shift_pitch.unwrap_or(false),
        state.user_presets.unwrap_or_default(),
    )
}

fn reverb_from_state(state: ReverbUnitState) -> ReverbUnit {
    ReverbUnit::with_settings(
        state.state.unwrap_or_default(),
        state.space.unwrap_or_default(),
        state
            .amount
            .unwrap_or(crate::domain::effects::reverb::DEFAULT_AMOUNT),
        state.user_presets.unwrap_or_default(),
    )
}

fn delay_from_state(state: DelayUnitState) -> DelayUnit {
    use crate::domain::effects::delay::params::*;

    DelayUnit::with_settings(
        state.state.unwrap_or_default(),
        state.amount.unwrap_or(DEFAULT_AMOUNT),
        state.time.unwrap_or(DEFAULT_TIME),
        state.feedback.unwrap_or(DEFAULT_FEEDBACK),
        state.low_pass_cutoff.unwrap_or(DEFAULT_CUTOFF),
        state.user_presets.unwrap_or_default(),
    )
}

fn filter_from_state(state: FilterUnitState) -> FilterUnit {
    FilterUnit::with_settings(
        state.state.unwrap_or_default(),
        state.bands.unwrap_or_default(),
        state.user_presets.unwrap_or_default(),
    )
}

fn hosted_from_state(host: &dyn AudioUnitHost, state: AudioUnitState) -> Option<HostedAudioUnit> {
    let (Some(component_type), Some(component_sub_type)) =
        (state.component_type, state.component_sub_type)
    else {
        warn!("Skipping saved audio unit without component codes");
        return None;
    };

    let Some(component) = host.component(component_type, component_sub_type) else {
        warn!(
            "Skipping saved audio unit {}/{}: component not installed",
            component_type, component_sub_type
        );
        return None;
    };

    let instance = match host.instantiate(&component) {
        Ok(instance) => instance,
        Err(e) => {
            warn!("Skipping saved audio unit {}: {}", component.name, e);
            return None;
        }
    };

    Some(HostedAudioUnit::new(
        component,
        instance,
        state.state.unwrap_or(EffectsUnitState::Active),
        state.params.as_deref().unwrap_or(&[]),
        state.user_presets.unwrap_or_default(),
    ))
}
