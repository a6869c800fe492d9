//! Move Planner
//!
//! Turns a requested relocation into shift steps plus the element's own
//! relocation. The same plan is executed as SQL by the server and applied to
//! in-memory views by the client, so both sides agree on the end state.

use crate::position::{Position, Positioned, ShiftRange};

/// Upper bound used for "every sibling above" windows
pub const OPEN_END: Position = Position::MAX;

/// Shift every sibling of `scope` with `above < position < below` by `delta`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShiftStep {
    pub scope: String,
    pub above: Position,
    pub below: Position,
    pub delta: Position,
    /// Element excluded from the shift (the one being moved)
    pub except: Option<String>,
}

impl ShiftStep {
    /// Close the slot left behind at `vacated`: everything above moves down.
    pub fn closing(scope: &str, vacated: Position) -> Self {
        Self {
            scope: scope.to_string(),
            above: vacated,
            below: OPEN_END,
            delta: -1,
            except: None,
        }
    }

    /// Open a slot at `at`: everything at or above moves up.
    pub fn opening(scope: &str, at: Position) -> Self {
        Self {
            scope: scope.to_string(),
            above: at - 1,
            below: OPEN_END,
            delta: 1,
            except: None,
        }
    }

    fn within(scope: &str, range: ShiftRange) -> Self {
        Self {
            scope: scope.to_string(),
            above: range.min_index,
            below: range.max_index,
            delta: range.delta(),
            except: None,
        }
    }

    fn except(mut self, key: &str) -> Self {
        self.except = Some(key.to_string());
        self
    }

    pub fn applies_to<T: Positioned + ?Sized>(&self, item: &T) -> bool {
        item.scope() == self.scope
            && self.above < item.position()
            && item.position() < self.below
            && self.except.as_deref() != Some(item.key())
    }

    /// Apply this step alone (used for delete compaction and insert opening).
    pub fn apply<'a, T, I>(&self, items: I) -> usize
    where
        T: Positioned + 'a,
        I: IntoIterator<Item = &'a mut T>,
    {
        let mut shifted = 0;
        for item in items {
            if self.applies_to(item) {
                item.set_position(item.position() + self.delta);
                shifted += 1;
            }
        }
        shifted
    }
}

/// Final placement of the moved element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relocation {
    pub key: String,
    pub scope: String,
    pub position: Position,
}

/// Everything needed to carry out one move atomically
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovePlan {
    pub shifts: Vec<ShiftStep>,
    pub relocation: Relocation,
}

impl MovePlan {
    /// True when the element changes scope
    pub fn crosses_scope(&self, from_scope: &str) -> bool {
        self.relocation.scope != from_scope
    }

    /// Apply the plan to a set of items spanning every scope it touches.
    ///
    /// Returns false when the relocated element is not among `items`; the
    /// sibling shifts have still been applied in that case.
    pub fn apply<'a, T, I>(&self, items: I) -> bool
    where
        T: Positioned + 'a,
        I: IntoIterator<Item = &'a mut T>,
    {
        let mut relocated = false;
        for item in items {
            // Steps touch disjoint scopes, so at most one matches an item.
            if let Some(step) = self.shifts.iter().find(|s| s.applies_to(item)) {
                item.set_position(item.position() + step.delta);
            }
            if item.key() == self.relocation.key {
                item.set_scope(&self.relocation.scope);
                item.set_position(self.relocation.position);
                relocated = true;
            }
        }
        relocated
    }
}

/// Plan a move inside one scope. `None` when nothing moves.
pub fn plan_reposition(
    key: &str,
    scope: &str,
    old_index: Position,
    new_index: Position,
) -> Option<MovePlan> {
    if old_index == new_index {
        return None;
    }

    let range = ShiftRange::between(old_index, new_index);
    Some(MovePlan {
        shifts: vec![ShiftStep::within(scope, range).except(key)],
        relocation: Relocation {
            key: key.to_string(),
            scope: scope.to_string(),
            position: new_index,
        },
    })
}

/// Plan a move between two different scopes.
///
/// Opens a slot at `to_index` in the destination, closes the slot at
/// `from_index` in the source, then places the element.
pub fn plan_cross_scope(
    key: &str,
    from_scope: &str,
    from_index: Position,
    to_scope: &str,
    to_index: Position,
) -> MovePlan {
    debug_assert_ne!(from_scope, to_scope);
    MovePlan {
        shifts: vec![
            ShiftStep::opening(to_scope, to_index).except(key),
            ShiftStep::closing(from_scope, from_index).except(key),
        ],
        relocation: Relocation {
            key: key.to_string(),
            scope: to_scope.to_string(),
            position: to_index,
        },
    }
}

/// Plan any move, dispatching on whether the scope changes.
pub fn plan_move(
    key: &str,
    from_scope: &str,
    from_index: Position,
    to_scope: &str,
    to_index: Position,
) -> Option<MovePlan> {
    if from_scope == to_scope {
        plan_reposition(key, from_scope, from_index, to_index)
    } else {
        Some(plan_cross_scope(key, from_scope, from_index, to_scope, to_index))
    }
}
