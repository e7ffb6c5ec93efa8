//! Domain entities and business rules

pub mod audio;
pub mod config;
pub mod effects;
pub mod graph;
pub mod node;
pub mod persistence;
pub mod sound_profile;

// Re-export specific items to avoid ambiguous glob imports
pub use audio::{AudioEnumerator, AudioError, DeviceId, DeviceInfo};
pub use config::{AppConfig, ConfigError, StateStore};
pub use effects::{
    DelayPreset, DelayUnit, EffectsUnit, EffectsUnitKind, EffectsUnitPreset, EffectsUnitState,
    EqPreset, EqType, EqUnit, FilterBand, FilterBandType, FilterPreset, FilterUnit, FourCc,
    HostedAudioUnit, MasterPreset, MasterUnit, PitchShiftPreset, PitchShiftUnit, PresetStore,
    PresetUnit, ReverbPreset, ReverbSpace, ReverbUnit, TimeStretchPreset, TimeStretchUnit,
};
pub use graph::AudioGraph;
pub use persistence::AudioGraphState;
pub use sound_profile::{SoundProfile, SoundProfiles};
