//! Tri-state lifecycle shared by every effects unit

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of an effects unit
///
/// - `Active`: the unit processes audio.
/// - `Bypassed`: the user switched the unit off.
/// - `Suppressed`: the unit was active but is temporarily held off by the
///   system; `unsuppress` restores it to `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectsUnitState {
    Active,
    #[default]
    Bypassed,
    Suppressed,
}

impl EffectsUnitState {
    pub fn is_active(self) -> bool {
        self == EffectsUnitState::Active
    }

    /// State after a user toggle. `Suppressed` is left alone.
    pub fn toggled(self) -> Self {
        match self {
            EffectsUnitState::Active => EffectsUnitState::Bypassed,
            EffectsUnitState::Bypassed => EffectsUnitState::Active,
            EffectsUnitState::Suppressed => EffectsUnitState::Suppressed,
        }
    }

    /// State after a suppress request. Only `Active` is affected.
    pub fn suppressed(self) -> Self {
        match self {
            EffectsUnitState::Active => EffectsUnitState::Suppressed,
            other => other,
        }
    }

    /// State after an unsuppress request. Only `Suppressed` is affected.
    pub fn unsuppressed(self) -> Self {
        match self {
            EffectsUnitState::Suppressed => EffectsUnitState::Active,
            other => other,
        }
    }

    /// Bypass flag a single render node must carry in this state
    pub fn node_bypass(self) -> bool {
        !self.is_active()
    }
}

impl fmt::Display for EffectsUnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EffectsUnitState::Active => "active",
            EffectsUnitState::Bypassed => "bypassed",
            EffectsUnitState::Suppressed => "suppressed",
        };
        f.write_str(name)
    }
}
