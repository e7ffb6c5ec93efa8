//! Persistent state of the effects chain
//!
//! Written at shutdown and read at startup. Every field is optional: a
//! missing field means "use the built-in default", never an error, so state
//! files written by older or newer versions still load. A field that is
//! present but unreadable is treated as missing, and a saved preset, profile
//! or hosted unit that cannot be read is dropped on its own.

use crate::domain::audio::DeviceId;
use crate::domain::effects::{
    AudioUnitParameter, DelayPreset, EffectsUnitState, EqPreset, EqType, FilterBand,
    FilterPreset, FourCc, HostedUnitPreset, MasterPreset, PitchShiftPreset, ReverbPreset,
    ReverbSpace, TimeStretchPreset,
};
use crate::domain::sound_profile::SoundProfile;
use serde::{Deserialize, Serialize};

mod lenient {
    use serde::de::{DeserializeOwned, Deserializer};
    use serde::Deserialize;
    use serde_json::Value;
    use tracing::warn;

    pub fn value<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let raw = Option::<Value>::deserialize(deserializer)?;
        Ok(raw.and_then(|raw| match serde_json::from_value(raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring unreadable saved field: {}", e);
                None
            }
        }))
    }

    /// Keeps the entries that parse and drops the rest
    pub fn entries<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let entries = match Option::<Value>::deserialize(deserializer)? {
            Some(Value::Array(entries)) => entries,
            Some(_) => {
                warn!("Ignoring saved list that is not an array");
                return Ok(None);
            }
            None => return Ok(None),
        };

        let total = entries.len();
        let kept: Vec<T> = entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value(entry) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Dropping unreadable saved entry: {}", e);
                    None
                }
            })
            .collect();

        if kept.len() < total {
            warn!("Kept {} of {} saved entries", kept.len(), total);
        }
        Ok(Some(kept))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioGraphState {
    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub output_device: Option<DeviceId>,
    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub volume: Option<f32>,
    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub muted: Option<bool>,
    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub pan: Option<f32>,
    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub master_unit: Option<MasterUnitState>,
    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub eq_unit: Option<EqUnitState>,
    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub pitch_unit: Option<PitchShiftUnitState>,
    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub time_unit: Option<TimeStretchUnitState>,
    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub reverb_unit: Option<ReverbUnitState>,
    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub delay_unit: Option<DelayUnitState>,
    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub filter_unit: Option<FilterUnitState>,
    #[serde(default, deserialize_with = "lenient::entries", skip_serializing_if = "Option::is_none")]
    pub audio_units: Option<Vec<AudioUnitState>>,
    #[serde(default, deserialize_with = "lenient::entries", skip_serializing_if = "Option::is_none")]
    pub sound_profiles: Option<Vec<SoundProfile>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MasterUnitState {
    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub state: Option<EffectsUnitState>,
    #[serde(default, deserialize_with = "lenient::entries", skip_serializing_if = "Option::is_none")]
    pub user_presets: Option<Vec<MasterPreset>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EqUnitState {
    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub state: Option<EffectsUnitState>,
    #[serde(default, deserialize_with = "lenient::entries", skip_serializing_if = "Option::is_none")]
    pub user_presets: Option<Vec<EqPreset>>,
    #[serde(rename = "type", default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub eq_type: Option<EqType>,
    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub global_gain: Option<f32>,
    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub bands: Option<Vec<f32>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PitchShiftUnitState {
    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub state: Option<EffectsUnitState>,
    #[serde(default, deserialize_with = "lenient::entries", skip_serializing_if = "Option::is_none")]
    pub user_presets: Option<Vec<PitchShiftPreset>>,
    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub pitch: Option<f32>,
    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub overlap: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeStretchUnitState {
    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub state: Option<EffectsUnitState>,
    #[serde(default, deserialize_with = "lenient::entries", skip_serializing_if = "Option::is_none")]
    pub user_presets: Option<Vec<TimeStretchPreset>>,
    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub rate: Option<f32>,
    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub shift_pitch: Option<bool>,
    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub overlap: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReverbUnitState {
    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub state: Option<EffectsUnitState>,
    #[serde(default, deserialize_with = "lenient::entries", skip_serializing_if = "Option::is_none")]
    pub user_presets: Option<Vec<ReverbPreset>>,
    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub space: Option<ReverbSpace>,
    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub amount: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DelayUnitState {
    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub state: Option<EffectsUnitState>,
    #[serde(default, deserialize_with = "lenient::entries", skip_serializing_if = "Option::is_none")]
    pub user_presets: Option<Vec<DelayPreset>>,
    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub amount: Option<f32>,
    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub feedback: Option<f32>,
    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub low_pass_cutoff: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterUnitState {
    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub state: Option<EffectsUnitState>,
    #[serde(default, deserialize_with = "lenient::entries", skip_serializing_if = "Option::is_none")]
    pub user_presets: Option<Vec<FilterPreset>>,
    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub bands: Option<Vec<FilterBand>>,
}

/// Saved hosted unit. Entries without both component codes are skipped on
/// restore.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioUnitState {
    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub state: Option<EffectsUnitState>,
    #[serde(default, deserialize_with = "lenient::entries", skip_serializing_if = "Option::is_none")]
    pub user_presets: Option<Vec<HostedUnitPreset>>,
    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub component_type: Option<FourCc>,
    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub component_sub_type: Option<FourCc>,
    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<AudioUnitParameter>>,
}
