//! Per-file sound profiles
//!
//! A sound profile remembers the volume, pan and effects settings the user
//! had while listening to one file, so they can be recalled the next time
//! that file plays.

use crate::domain::effects::MasterPreset;
use crate::domain::graph::DEFAULT_VOLUME;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Saved settings for one file. Only `file` is required when reading one
/// back; the rest fall back to the player defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundProfile {
    pub file: PathBuf,
    #[serde(default = "default_volume")]
    pub volume: f32,
    #[serde(default)]
    pub pan: f32,
    #[serde(default)]
    pub effects: MasterPreset,
}

fn default_volume() -> f32 {
    DEFAULT_VOLUME
}

/// Sound profiles keyed by file path
#[derive(Debug, Clone, Default)]
pub struct SoundProfiles {
    profiles: BTreeMap<PathBuf, SoundProfile>,
}

impl SoundProfiles {
    pub fn new(profiles: Vec<SoundProfile>) -> Self {
        Self {
            profiles: profiles
                .into_iter()
                .map(|profile| (profile.file.clone(), profile))
                .collect(),
        }
    }

    /// Create or overwrite the profile for `file`
    pub fn save(&mut self, file: impl Into<PathBuf>, volume: f32, pan: f32, effects: MasterPreset) {
        let file = file.into();
        debug!("Saving sound profile for {}", file.display());
        self.profiles.insert(
            file.clone(),
            SoundProfile {
                file,
                volume,
                pan,
                effects,
            },
        );
    }

    pub fn get(&self, file: &Path) -> Option<&SoundProfile> {
        self.profiles.get(file)
    }

    pub fn delete(&mut self, file: &Path) -> Option<SoundProfile> {
        let removed = self.profiles.remove(file);
        if removed.is_some() {
            debug!("Deleted sound profile for {}", file.display());
        }
        removed
    }

    pub fn contains(&self, file: &Path) -> bool {
        self.profiles.contains_key(file)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Profiles in path order
    pub fn iter(&self) -> impl Iterator<Item = &SoundProfile> {
        self.profiles.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::effects::{MasterUnit, PresetUnit};

    #[test]
    fn test_save_overwrites() {
        let effects = MasterUnit::default().settings_as_preset();
        let mut profiles = SoundProfiles::default();

        profiles.save("/music/a.flac", 0.5, 0.0, effects.clone());
        profiles.save("/music/a.flac", 0.8, -0.2, effects.clone());
        profiles.save("/music/b.flac", 0.3, 0.1, effects);

        assert_eq!(profiles.len(), 2);
        let a = profiles.get(Path::new("/music/a.flac")).unwrap();
        assert_eq!(a.volume, 0.8);
        assert_eq!(a.pan, -0.2);
    }

    #[test]
    fn test_delete_and_order() {
        let effects = MasterUnit::default().settings_as_preset();
        let mut profiles = SoundProfiles::default();
        profiles.save("/z.mp3", 1.0, 0.0, effects.clone());
        profiles.save("/a.mp3", 1.0, 0.0, effects);

        let files: Vec<&Path> = profiles.iter().map(|p| p.file.as_path()).collect();
        assert_eq!(files, vec![Path::new("/a.mp3"), Path::new("/z.mp3")]);

        assert!(profiles.delete(Path::new("/a.mp3")).is_some());
        assert!(profiles.delete(Path::new("/a.mp3")).is_none());
        assert!(!profiles.contains(Path::new("/a.mp3")));
        assert!(profiles.get(Path::new("/missing.mp3")).is_none());
    }
}
