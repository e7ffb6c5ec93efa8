//! Named presets and the per-unit preset store
//!
//! Every unit keeps two collections of presets: a fixed set of
//! system-defined presets shipped with the player and a mutable set created
//! by the user. Names are the keys. Lookups consult the system-defined
//! collection first, so a user preset can never shadow a factory one.

use super::state::EffectsUnitState;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Contract shared by every preset type
pub trait EffectsUnitPreset: Clone {
    fn name(&self) -> &str;

    fn set_name(&mut self, name: String);

    /// Unit state captured when the preset was saved
    fn state(&self) -> EffectsUnitState;

    fn is_user_defined(&self) -> bool;

    fn set_user_defined(&mut self, user_defined: bool);
}

/// Implements [`EffectsUnitPreset`] for a struct with `name`, `state` and
/// `user_defined` fields.
macro_rules! impl_effects_unit_preset {
    ($($preset:ty),+ $(,)?) => {
        $(
            impl $crate::domain::effects::preset::EffectsUnitPreset for $preset {
                fn name(&self) -> &str {
                    &self.name
                }

                fn set_name(&mut self, name: String) {
                    self.name = name;
                }

                fn state(&self) -> $crate::domain::effects::state::EffectsUnitState {
                    self.state
                }

                fn is_user_defined(&self) -> bool {
                    self.user_defined
                }

                fn set_user_defined(&mut self, user_defined: bool) {
                    self.user_defined = user_defined;
                }
            }
        )+
    };
}

pub(crate) use impl_effects_unit_preset;

/// Keyed registry of system-defined and user-defined presets
#[derive(Debug, Clone)]
pub struct PresetStore<P> {
    system_defined: Vec<P>,
    system_index: HashMap<String, usize>,
    user_defined: Vec<P>,
    user_index: HashMap<String, usize>,
}

impl<P: EffectsUnitPreset> Default for PresetStore<P> {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}

impl<P: EffectsUnitPreset> PresetStore<P> {
    /// Build a store from the factory presets and previously saved user
    /// presets. User presets without a name are dropped.
    pub fn new(system_defined: Vec<P>, user_defined: Vec<P>) -> Self {
        let system_defined: Vec<P> = system_defined
            .into_iter()
            .map(|mut preset| {
                preset.set_user_defined(false);
                preset
            })
            .collect();

        let mut system_index = HashMap::with_capacity(system_defined.len());
        for (index, preset) in system_defined.iter().enumerate() {
            system_index.entry(preset.name().to_string()).or_insert(index);
        }

        let mut store = Self {
            system_defined,
            system_index,
            user_defined: Vec::with_capacity(user_defined.len()),
            user_index: HashMap::with_capacity(user_defined.len()),
        };

        for preset in user_defined {
            if preset.name().is_empty() {
                warn!("Dropping user preset with an empty name");
                continue;
            }
            store.add(preset);
        }

        store
    }

    /// Store with no factory presets
    pub fn with_user_presets(user_defined: Vec<P>) -> Self {
        Self::new(Vec::new(), user_defined)
    }

    /// Add a user-defined preset
    ///
    /// A user preset with the same name is replaced in place, so names stay
    /// unique within the user-defined collection.
    pub fn add(&mut self, mut preset: P) {
        preset.set_user_defined(true);
        let name = preset.name().to_string();

        if let Some(&index) = self.user_index.get(&name) {
            debug!("Replacing user preset '{}'", name);
            self.user_defined[index] = preset;
            return;
        }

        if self.system_index.contains_key(&name) {
            warn!(
                "User preset '{}' shares its name with a system preset and will be shadowed",
                name
            );
        }

        debug!("Adding user preset '{}'", name);
        self.user_index.insert(name, self.user_defined.len());
        self.user_defined.push(preset);
    }

    /// Look up a preset by name, system-defined first
    pub fn preset(&self, name: &str) -> Option<&P> {
        self.system_index
            .get(name)
            .map(|&index| &self.system_defined[index])
            .or_else(|| self.user_index.get(name).map(|&index| &self.user_defined[index]))
    }

    /// Delete the user preset at `index`
    pub fn delete_at(&mut self, index: usize) -> Option<P> {
        if index >= self.user_defined.len() {
            return None;
        }

        let removed = self.user_defined.remove(index);
        self.reindex();
        debug!("Deleted user preset '{}'", removed.name());
        Some(removed)
    }

    /// Delete several user presets by index
    ///
    /// Indices are removed in descending order so earlier removals do not
    /// shift later ones. Out-of-range and duplicate indices are ignored.
    /// Returns the removed presets in that same descending order.
    pub fn delete_indices(&mut self, indices: &[usize]) -> Vec<P> {
        let mut sorted: Vec<usize> = indices
            .iter()
            .copied()
            .filter(|&index| index < self.user_defined.len())
            .collect();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        sorted.dedup();

        let removed: Vec<P> = sorted
            .into_iter()
            .map(|index| self.user_defined.remove(index))
            .collect();

        if !removed.is_empty() {
            self.reindex();
            debug!("Deleted {} user presets", removed.len());
        }

        removed
    }

    /// Delete the user preset called `name`
    pub fn delete_named(&mut self, name: &str) -> Option<P> {
        let index = *self.user_index.get(name)?;
        self.delete_at(index)
    }

    /// Rename a user preset
    ///
    /// Fails when `from` is not a user preset or when another user preset is
    /// already called `to`. Renaming onto a system preset name is allowed but
    /// the renamed preset will be shadowed by the factory one on lookup.
    pub fn rename(&mut self, from: &str, to: &str) -> bool {
        let Some(&index) = self.user_index.get(from) else {
            return false;
        };

        if from == to {
            return true;
        }

        if self.user_index.contains_key(to) {
            warn!("Cannot rename preset '{}': '{}' already exists", from, to);
            return false;
        }

        if self.system_index.contains_key(to) {
            warn!("Renamed preset '{}' is shadowed by a system preset", to);
        }

        self.user_index.remove(from);
        self.user_index.insert(to.to_string(), index);
        self.user_defined[index].set_name(to.to_string());
        debug!("Renamed user preset '{}' to '{}'", from, to);
        true
    }

    /// True when either collection holds a preset called `name`
    pub fn exists(&self, name: &str) -> bool {
        self.is_system_defined(name) || self.is_user_defined(name)
    }

    pub fn is_system_defined(&self, name: &str) -> bool {
        self.system_index.contains_key(name)
    }

    pub fn is_user_defined(&self, name: &str) -> bool {
        self.user_index.contains_key(name)
    }

    pub fn user_defined_count(&self) -> usize {
        self.user_defined.len()
    }

    pub fn user_defined(&self) -> &[P] {
        &self.user_defined
    }

    pub fn user_defined_at(&self, index: usize) -> Option<&P> {
        self.user_defined.get(index)
    }

    pub fn system_defined(&self) -> &[P] {
        &self.system_defined
    }

    /// The factory default preset, when the unit ships any
    pub fn default_preset(&self) -> Option<&P> {
        self.system_defined.first()
    }

    fn reindex(&mut self) {
        self.user_index.clear();
        for (index, preset) in self.user_defined.iter().enumerate() {
            self.user_index.insert(preset.name().to_string(), index);
        }
    }
}
