//! Lifecycle walk shared by the unit tests

use super::{EffectsUnit, EffectsUnitState};

#[derive(Debug, Clone, Copy)]
enum Step {
    Toggle,
    Suppress,
    Unsuppress,
}

/// Each step and the state the unit must be in afterwards, starting from
/// bypassed.
const WALK: &[(Step, EffectsUnitState)] = &[
    (Step::Suppress, EffectsUnitState::Bypassed),
    (Step::Unsuppress, EffectsUnitState::Bypassed),
    (Step::Toggle, EffectsUnitState::Active),
    (Step::Toggle, EffectsUnitState::Bypassed),
    (Step::Toggle, EffectsUnitState::Active),
    (Step::Suppress, EffectsUnitState::Suppressed),
    (Step::Suppress, EffectsUnitState::Suppressed),
    (Step::Toggle, EffectsUnitState::Suppressed),
    (Step::Unsuppress, EffectsUnitState::Active),
    (Step::Unsuppress, EffectsUnitState::Active),
    (Step::Toggle, EffectsUnitState::Bypassed),
];

/// Walks a fresh unit through every transition, checking after each step
/// that the render node's bypass flag is the inverse of `is_active`.
pub(crate) fn walk_states<U: EffectsUnit>(mut unit: U, node_bypassed: impl Fn(&U) -> bool) {
    assert_eq!(unit.state(), EffectsUnitState::Bypassed);
    assert!(node_bypassed(&unit));

    for (index, &(step, expected)) in WALK.iter().enumerate() {
        let returned = match step {
            Step::Toggle => Some(unit.toggle_state()),
            Step::Suppress => {
                unit.suppress();
                None
            }
            Step::Unsuppress => {
                unit.unsuppress();
                None
            }
        };

        assert_eq!(unit.state(), expected, "{} after step {} ({:?})", unit.kind(), index, step);
        if let Some(returned) = returned {
            assert_eq!(returned, expected, "{} toggle result at step {}", unit.kind(), index);
        }
        assert_eq!(
            node_bypassed(&unit),
            !unit.is_active(),
            "{} node bypass out of sync after step {} ({:?})",
            unit.kind(),
            index,
            step
        );
    }
}
