//! Optimistic Client Reducer
//!
//! Drives one drag gesture: `Idle -> Dragging -> Previewing* -> Committing -> Idle`.
//! Every hover splices the dragged element into its candidate slot in the
//! local view immediately. The drop issues a single command describing the
//! net effect of the gesture, from the slot recorded at grab time to the slot
//! the element occupies at drop time.

use crate::command::{CardMoveValues, MoveCommand};
use crate::model::ListWithCards;
use crate::position::Position;
use crate::view::BoardView;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragSubject {
    List(String),
    Card(String),
}

impl DragSubject {
    pub fn id(&self) -> &str {
        match self {
            DragSubject::List(id) | DragSubject::Card(id) => id,
        }
    }
}

/// What the pointer is over
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoverTarget {
    List(String),
    /// `below` is true when the pointer is past the card's vertical middle
    Card { card_id: String, below: bool },
    /// Placeholder rendered inside a list with no cards
    EmptyList(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragPhase {
    #[default]
    Idle,
    Dragging,
    Previewing,
    Committing,
}

/// A committed drop waiting for the server's answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMove {
    pub command: MoveCommand,
    snapshot: Vec<ListWithCards>,
}

impl PendingMove {
    /// Put the board back the way it was before the gesture.
    pub fn restore(self, view: &mut BoardView) {
        view.lists = self.snapshot;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    /// No gesture in progress
    Ignored,
    /// Dropped on the original slot; no command
    NoOp,
    Commit(PendingMove),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Origin {
    subject: DragSubject,
    /// Source list for cards, the board for lists
    scope: String,
    index: Position,
}

#[derive(Debug, Default)]
pub struct DragReducer {
    phase: DragPhase,
    origin: Option<Origin>,
    snapshot: Option<Vec<ListWithCards>>,
}

impl DragReducer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> DragPhase {
        self.phase
    }

    pub fn subject(&self) -> Option<&DragSubject> {
        self.origin.as_ref().map(|o| &o.subject)
    }

    /// True between grab and drop
    pub fn is_active(&self) -> bool {
        matches!(self.phase, DragPhase::Dragging | DragPhase::Previewing)
    }

    /// `Idle -> Dragging`. Records the subject's slot and a snapshot of the
    /// board for cancel and rollback.
    pub fn begin(&mut self, view: &BoardView, subject: DragSubject) -> bool {
        if self.phase != DragPhase::Idle {
            return false;
        }

        let origin = match &subject {
            DragSubject::List(list_id) => view.list_index(list_id).map(|i| Origin {
                subject: subject.clone(),
                scope: view.board_id().to_string(),
                index: i as Position,
            }),
            DragSubject::Card(card_id) => view.locate_card(card_id).map(|(li, ci)| Origin {
                subject: subject.clone(),
                scope: view.lists[li].list.id.clone(),
                index: ci as Position,
            }),
        };

        let Some(origin) = origin else {
            log::debug!("drag start on unknown element {}", subject.id());
            return false;
        };

        self.origin = Some(origin);
        self.snapshot = Some(view.lists.clone());
        self.phase = DragPhase::Dragging;
        true
    }

    /// `Dragging | Previewing -> Previewing`. Returns true when the preview
    /// changed.
    pub fn hover(&mut self, view: &mut BoardView, target: &HoverTarget) -> bool {
        if !self.is_active() {
            return false;
        }
        let Some(origin) = &self.origin else {
            return false;
        };

        let changed = match &origin.subject {
            DragSubject::List(list_id) => preview_list(view, list_id, target),
            DragSubject::Card(card_id) => preview_card(view, card_id, target),
        };

        if changed {
            view.renumber();
            self.phase = DragPhase::Previewing;
        }
        changed
    }

    /// `Dragging | Previewing -> Committing`.
    ///
    /// Applies the final hover, if any, then compares the element's slot with
    /// the one recorded at grab time.
    pub fn drop(&mut self, view: &mut BoardView, target: Option<&HoverTarget>) -> DropOutcome {
        if !self.is_active() {
            return DropOutcome::Ignored;
        }
        if let Some(target) = target {
            self.hover(view, target);
        }

        let (Some(origin), Some(snapshot)) = (self.origin.clone(), self.snapshot.take()) else {
            self.reset();
            return DropOutcome::Ignored;
        };
        self.phase = DragPhase::Committing;

        let command = match &origin.subject {
            DragSubject::List(list_id) => {
                let Some(new_index) = view.list_index(list_id) else {
                    view.lists = snapshot;
                    return DropOutcome::NoOp;
                };
                let new_index = new_index as Position;
                if new_index == origin.index {
                    None
                } else {
                    Some(MoveCommand::List {
                        old_index: origin.index,
                        new_index,
                        board_id: view.board_id().to_string(),
                        list_id: list_id.clone(),
                    })
                }
            }
            DragSubject::Card(card_id) => {
                let Some((li, ci)) = view.locate_card(card_id) else {
                    view.lists = snapshot;
                    return DropOutcome::NoOp;
                };
                let list_id = view.lists[li].list.id.clone();
                let moved_in_same_list = list_id == origin.scope;
                if moved_in_same_list && ci as Position == origin.index {
                    None
                } else {
                    Some(MoveCommand::Card {
                        values: CardMoveValues {
                            card_id: card_id.clone(),
                            list_id,
                            final_list_index: li as Position,
                            final_card_index: ci as Position,
                        },
                        board_id: view.board_id().to_string(),
                        moved_in_same_list,
                        initial_index: origin.index,
                        initial_list_id: origin.scope.clone(),
                    })
                }
            }
        };

        match command {
            Some(command) => DropOutcome::Commit(PendingMove { command, snapshot }),
            None => {
                // Hovering out and back may have renumbered; keep positions untouched.
                view.lists = snapshot;
                DropOutcome::NoOp
            }
        }
    }

    /// `Committing -> Idle`, whether or not the server has answered.
    pub fn finish(&mut self) {
        if self.phase == DragPhase::Committing {
            self.reset();
        }
    }

    /// Abandon the gesture and restore the pre-gesture order. No command is sent.
    pub fn cancel(&mut self, view: &mut BoardView) -> bool {
        if !self.is_active() {
            return false;
        }
        if let Some(snapshot) = self.snapshot.take() {
            view.lists = snapshot;
        }
        self.reset();
        true
    }

    fn reset(&mut self) {
        self.phase = DragPhase::Idle;
        self.origin = None;
        self.snapshot = None;
    }
}

fn preview_list(view: &mut BoardView, list_id: &str, target: &HoverTarget) -> bool {
    let over_list = match target {
        HoverTarget::List(id) | HoverTarget::EmptyList(id) => Some(id.clone()),
        HoverTarget::Card { card_id, .. } => view
            .locate_card(card_id)
            .map(|(li, _)| view.lists[li].list.id.clone()),
    };
    let Some(over_list) = over_list else {
        return false;
    };
    if over_list == list_id {
        return false;
    }

    let (Some(from), Some(to)) = (view.list_index(list_id), view.list_index(&over_list)) else {
        return false;
    };
    let moved = view.lists.remove(from);
    view.lists.insert(to, moved);
    true
}

fn preview_card(view: &mut BoardView, card_id: &str, target: &HoverTarget) -> bool {
    let Some((from_list, from_index)) = view.locate_card(card_id) else {
        return false;
    };

    match target {
        HoverTarget::Card {
            card_id: over_id,
            below,
        } => {
            if over_id == card_id {
                return false;
            }
            let Some((to_list, over_index)) = view.locate_card(over_id) else {
                return false;
            };

            let mut insert_at = over_index + usize::from(*below);
            if to_list == from_list && from_index < insert_at {
                insert_at -= 1;
            }
            if to_list == from_list && insert_at == from_index {
                return false;
            }

            let card = view.lists[from_list].cards.remove(from_index);
            let cards = &mut view.lists[to_list].cards;
            let insert_at = insert_at.min(cards.len());
            cards.insert(insert_at, card);
            true
        }
        HoverTarget::EmptyList(list_id) => {
            let Some(to_list) = view.list_index(list_id) else {
                return false;
            };
            // Re-entrant hover events: only move while the list is still empty.
            if !view.lists[to_list].cards.is_empty() {
                return false;
            }
            let card = view.lists[from_list].cards.remove(from_index);
            view.lists[to_list].cards.push(card);
            true
        }
        HoverTarget::List(list_id) => {
            let Some(to_list) = view.list_index(list_id) else {
                return false;
            };
            if to_list == from_list {
                return false;
            }
            let card = view.lists[from_list].cards.remove(from_index);
            view.lists[to_list].cards.push(card);
            true
        }
    }
}
