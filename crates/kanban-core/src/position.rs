//! Position Model
//!
//! A scope (a board for its lists, a list for its cards) keeps its children's
//! positions dense: exactly `{0, 1, ..., n-1}`.

/// Zero-based rank of an item inside its scope.
pub type Position = i32;

/// Anything that occupies a slot in an ordered scope.
pub trait Positioned {
    /// Stable identifier of the item
    fn key(&self) -> &str;

    /// Identifier of the parent scope
    fn scope(&self) -> &str;

    fn position(&self) -> Position;

    fn set_position(&mut self, position: Position);

    /// Reassign the item to another scope (cross-scope moves)
    fn set_scope(&mut self, scope: &str);
}

/// Sibling window that shifts by one slot when an element moves inside its scope.
///
/// Both bounds are exclusive: a sibling at `p` shifts iff `min_index < p < max_index`.
/// The moved element itself always sits on one of the bounds and is never shifted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftRange {
    /// Siblings move toward the front (the element moved forward)
    pub decrement: bool,
    pub min_index: Position,
    pub max_index: Position,
}

impl ShiftRange {
    /// Compute the shift window for a move from `old_index` to `new_index`.
    ///
    /// Forward moves shift `(old, new]` down; backward moves shift `[new, old)` up.
    pub fn between(old_index: Position, new_index: Position) -> Self {
        let decrement = old_index < new_index;
        let (mut min_index, mut max_index) = if decrement {
            (old_index, new_index)
        } else {
            (new_index, old_index)
        };

        if decrement {
            // 0 -> 1 must pull the occupant of 1 down to 0
            max_index += 1;
        } else {
            // 1 -> 0 must push the occupant of 0 up to 1
            min_index -= 1;
        }

        Self {
            decrement,
            min_index,
            max_index,
        }
    }

    /// Signed amount applied to every sibling inside the window
    pub fn delta(&self) -> Position {
        if self.decrement {
            -1
        } else {
            1
        }
    }

    pub fn contains(&self, position: Position) -> bool {
        self.min_index < position && position < self.max_index
    }
}

/// True when the positions are exactly `0..n` with no gaps or duplicates.
pub fn is_dense<I>(positions: I) -> bool
where
    I: IntoIterator<Item = Position>,
{
    let mut sorted: Vec<Position> = positions.into_iter().collect();
    sorted.sort_unstable();
    sorted
        .iter()
        .enumerate()
        .all(|(expected, actual)| *actual == expected as Position)
}
