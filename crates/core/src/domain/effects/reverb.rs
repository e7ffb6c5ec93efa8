//! Reverb unit

use super::preset::{impl_effects_unit_preset, PresetStore};
use super::state::EffectsUnitState;
use super::{EffectsUnit, EffectsUnitKind, PresetUnit};
use crate::domain::node::ReverbNode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Wet/dry mix range, in percent
pub const AMOUNT_MIN: f32 = 0.0;
pub const AMOUNT_MAX: f32 = 100.0;

pub const DEFAULT_AMOUNT: f32 = 50.0;

/// Factory room models of the reverb node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReverbSpace {
    SmallRoom,
    MediumRoom,
    LargeRoom,
    #[default]
    MediumHall,
    LargeHall,
    Plate,
    MediumChamber,
    LargeChamber,
    Cathedral,
    LargeRoom2,
    MediumHall2,
    MediumHall3,
    LargeHall2,
}

impl ReverbSpace {
    pub const ALL: [ReverbSpace; 13] = [
        ReverbSpace::SmallRoom,
        ReverbSpace::MediumRoom,
        ReverbSpace::LargeRoom,
        ReverbSpace::MediumHall,
        ReverbSpace::LargeHall,
        ReverbSpace::Plate,
        ReverbSpace::MediumChamber,
        ReverbSpace::LargeChamber,
        ReverbSpace::Cathedral,
        ReverbSpace::LargeRoom2,
        ReverbSpace::MediumHall2,
        ReverbSpace::MediumHall3,
        ReverbSpace::LargeHall2,
    ];

    /// Index of the factory preset loaded into the node
    pub fn node_preset(self) -> u8 {
        self as u8
    }

    pub fn from_node_preset(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    pub fn description(self) -> &'static str {
        match self {
            ReverbSpace::SmallRoom => "Small room",
            ReverbSpace::MediumRoom => "Medium room",
            ReverbSpace::LargeRoom => "Large room",
            ReverbSpace::MediumHall => "Medium hall",
            ReverbSpace::LargeHall => "Large hall",
            ReverbSpace::Plate => "Plate",
            ReverbSpace::MediumChamber => "Medium chamber",
            ReverbSpace::LargeChamber => "Large chamber",
            ReverbSpace::Cathedral => "Cathedral",
            ReverbSpace::LargeRoom2 => "Large room 2",
            ReverbSpace::MediumHall2 => "Medium hall 2",
            ReverbSpace::MediumHall3 => "Medium hall 3",
            ReverbSpace::LargeHall2 => "Large hall 2",
        }
    }
}

impl fmt::Display for ReverbSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReverbPreset {
    pub name: String,
    #[serde(default)]
    pub state: EffectsUnitState,
    #[serde(default)]
    pub user_defined: bool,
    #[serde(default)]
    pub space: ReverbSpace,
    #[serde(default = "default_amount")]
    pub amount: f32,
}

impl_effects_unit_preset!(ReverbPreset);

fn default_amount() -> f32 {
    DEFAULT_AMOUNT
}

impl Default for ReverbPreset {
    fn default() -> Self {
        Self {
            name: EffectsUnitKind::Reverb.settings_preset_name(),
            state: EffectsUnitState::default(),
            user_defined: false,
            space: ReverbSpace::default(),
            amount: DEFAULT_AMOUNT,
        }
    }
}

#[derive(Debug)]
pub struct ReverbUnit {
    state: EffectsUnitState,
    space: ReverbSpace,
    amount: f32,
    node: Arc<ReverbNode>,
    presets: PresetStore<ReverbPreset>,
}

impl Default for ReverbUnit {
    fn default() -> Self {
        Self::with_settings(
            EffectsUnitState::Bypassed,
            ReverbSpace::default(),
            DEFAULT_AMOUNT,
            Vec::new(),
        )
    }
}

impl ReverbUnit {
    pub fn with_settings(
        state: EffectsUnitState,
        space: ReverbSpace,
        amount: f32,
        user_presets: Vec<ReverbPreset>,
    ) -> Self {
        let amount = amount.clamp(AMOUNT_MIN, AMOUNT_MAX);
        let node = Arc::new(ReverbNode::new(space.node_preset(), amount));
        node.bypass.set(state.node_bypass());

        Self {
            state,
            space,
            amount,
            node,
            presets: PresetStore::with_user_presets(user_presets),
        }
    }

    pub fn node(&self) -> &Arc<ReverbNode> {
        &self.node
    }

    pub fn space(&self) -> ReverbSpace {
        self.space
    }

    pub fn set_space(&mut self, space: ReverbSpace) {
        self.space = space;
        self.node.space.set(space.node_preset());
        debug!("Reverb space set to {}", space);
    }

    /// Wet/dry mix in percent
    pub fn amount(&self) -> f32 {
        self.amount
    }

    pub fn set_amount(&mut self, amount: f32) {
        self.amount = amount.clamp(AMOUNT_MIN, AMOUNT_MAX);
        self.node.wet_dry_mix.set(self.amount);
        trace!("Reverb amount set to {}", self.amount);
    }
}

impl EffectsUnit for ReverbUnit {
    fn kind(&self) -> EffectsUnitKind {
        EffectsUnitKind::Reverb
    }

    fn state(&self) -> EffectsUnitState {
        self.state
    }

    fn set_state(&mut self, state: EffectsUnitState) {
        self.state = state;
        self.node.bypass.set(state.node_bypass());
    }
}

impl PresetUnit for ReverbUnit {
    type Preset = ReverbPreset;

    fn presets(&self) -> &PresetStore<ReverbPreset> {
        &self.presets
    }

    fn presets_mut(&mut self) -> &mut PresetStore<ReverbPreset> {
        &mut self.presets
    }

    fn settings_as_preset(&self) -> ReverbPreset {
        ReverbPreset {
            name: self.kind().settings_preset_name(),
            state: self.state,
            user_defined: false,
            space: self.space,
            amount: self.amount,
        }
    }

    fn apply_preset(&mut self, preset: &ReverbPreset) {
        self.set_space(preset.space);
        self.set_amount(preset.amount);
    }
}
