//! Remote Change Merger
//!
//! Folds broadcast messages from other users into the local caches. Elements
//! are located by id and moved from wherever they currently sit locally; the
//! indices in a message are only used as the destination slot, clamped to the
//! local scope. This keeps the merger correct after intervening messages and
//! makes redelivery of the same message harmless.

use crate::change::ChangeMessage;
use crate::model::{Invitation, ListWithCards};
use crate::planner::{plan_cross_scope, plan_reposition, ShiftStep};
use crate::position::{Position, Positioned};
use crate::view::{BoardView, CardDetailView};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Local state changed
    Applied,
    /// Sent by the local user, already reflected locally
    Echo,
    /// Not relevant here, or already applied
    Ignored,
    /// Local state cannot represent the change; fetch the board again
    ReloadRequired,
}

#[derive(Debug, Clone)]
pub struct RemoteMerger {
    local_user_id: String,
}

impl RemoteMerger {
    pub fn new(local_user_id: impl Into<String>) -> Self {
        Self {
            local_user_id: local_user_id.into(),
        }
    }

    pub fn local_user_id(&self) -> &str {
        &self.local_user_id
    }

    pub fn is_echo(&self, msg: &ChangeMessage) -> bool {
        msg.actor_id() == Some(self.local_user_id.as_str())
    }

    pub fn merge_board(&self, view: &mut BoardView, msg: &ChangeMessage) -> MergeOutcome {
        if self.is_echo(msg) {
            return MergeOutcome::Echo;
        }

        match msg {
            ChangeMessage::AddList {
                board_id, new_list, ..
            } => {
                if board_id != view.board_id() || view.list_index(new_list.id()).is_some() {
                    return MergeOutcome::Ignored;
                }
                insert_list(view, new_list.clone());
                MergeOutcome::Applied
            }
            ChangeMessage::DeleteList {
                board_id, list_id, ..
            } => {
                if board_id != view.board_id() {
                    return MergeOutcome::Ignored;
                }
                let Some(index) = view.list_index(list_id) else {
                    return MergeOutcome::Ignored;
                };
                let removed = view.lists.remove(index);
                ShiftStep::closing(&removed.list.board_id, removed.list.position)
                    .apply(view.lists.iter_mut().map(|l| &mut l.list));
                MergeOutcome::Applied
            }
            ChangeMessage::UpdateListPositions {
                board_id,
                list_id,
                position,
                ..
            } => {
                if board_id != view.board_id() {
                    return MergeOutcome::Ignored;
                }
                let Some(index) = view.list_index(list_id) else {
                    return MergeOutcome::ReloadRequired;
                };
                let from = view.lists[index].list.position;
                let to = clamp(*position, view.lists.len() as Position - 1);
                let Some(plan) = plan_reposition(list_id, view.board_id(), from, to) else {
                    return MergeOutcome::Ignored;
                };
                view.apply_list_plan(&plan);
                MergeOutcome::Applied
            }
            ChangeMessage::AddCard {
                board_id, new_card, ..
            } => {
                if board_id != view.board_id() || view.locate_card(&new_card.id).is_some() {
                    return MergeOutcome::Ignored;
                }
                let Some(li) = view.list_index(&new_card.list_id) else {
                    return MergeOutcome::ReloadRequired;
                };
                let cards = &mut view.lists[li].cards;
                let mut card = new_card.clone();
                card.position = clamp(card.position, cards.len() as Position);
                ShiftStep::opening(&card.list_id, card.position).apply(cards.iter_mut());
                cards.push(card);
                view.lists[li].sort_cards();
                MergeOutcome::Applied
            }
            ChangeMessage::DeleteCard {
                board_id, card_id, ..
            } => {
                if board_id != view.board_id() {
                    return MergeOutcome::Ignored;
                }
                let Some((li, ci)) = view.locate_card(card_id) else {
                    return MergeOutcome::Ignored;
                };
                let cards = &mut view.lists[li].cards;
                let removed = cards.remove(ci);
                ShiftStep::closing(&removed.list_id, removed.position).apply(cards.iter_mut());
                MergeOutcome::Applied
            }
            ChangeMessage::UpdateCardPositions {
                board_id,
                card_id,
                list_id,
                position,
                ..
            } => {
                if board_id != view.board_id() {
                    return MergeOutcome::Ignored;
                }
                let (Some(card), Some(dest)) = (view.card(card_id), view.list_index(list_id))
                else {
                    return MergeOutcome::ReloadRequired;
                };
                let from_scope = card.scope().to_string();
                let from = card.position();
                let dest_len = view.lists[dest].cards.len() as Position;

                let plan = if from_scope == *list_id {
                    plan_reposition(card_id, list_id, from, clamp(*position, dest_len - 1))
                } else {
                    Some(plan_cross_scope(
                        card_id,
                        &from_scope,
                        from,
                        list_id,
                        clamp(*position, dest_len),
                    ))
                };
                match plan {
                    Some(plan) if view.apply_card_plan(&plan) => MergeOutcome::Applied,
                    Some(_) => MergeOutcome::ReloadRequired,
                    None => MergeOutcome::Ignored,
                }
            }
            ChangeMessage::AddAttachment {
                card_id,
                attachment,
                ..
            } => match view.card_mut(card_id) {
                Some(card) if card.attachment.as_ref() != Some(attachment) => {
                    card.attachment = Some(attachment.clone());
                    MergeOutcome::Applied
                }
                _ => MergeOutcome::Ignored,
            },
            ChangeMessage::DeleteAttachment {
                card_id,
                attachment_id,
                latest,
                ..
            } => match view.card_mut(card_id) {
                // only if the removed one is what the slot shows
                Some(card)
                    if card.attachment.as_ref().map(|a| a.id.as_str())
                        == Some(attachment_id.as_str()) =>
                {
                    card.attachment = latest.clone();
                    MergeOutcome::Applied
                }
                _ => MergeOutcome::Ignored,
            },
            ChangeMessage::UpdateListName { list_id, name, .. } => {
                match view.list_index(list_id) {
                    Some(i) => {
                        view.lists[i].list.name = name.clone();
                        MergeOutcome::Applied
                    }
                    None => MergeOutcome::Ignored,
                }
            }
            ChangeMessage::UpdateBoardName { board_id, name, .. } => {
                if board_id != view.board_id() {
                    return MergeOutcome::Ignored;
                }
                view.board.name = name.clone();
                MergeOutcome::Applied
            }
            ChangeMessage::UpdateCardDescription {
                card_id,
                description,
                ..
            } => match view.card_mut(card_id) {
                Some(card) => {
                    card.description = Some(description.clone());
                    MergeOutcome::Applied
                }
                None => MergeOutcome::Ignored,
            },
            ChangeMessage::Invitation { .. } => MergeOutcome::Ignored,
            ChangeMessage::Unknown => {
                log::warn!("ignoring broadcast of unknown kind on board {}", view.board_id());
                MergeOutcome::Ignored
            }
        }
    }

    pub fn merge_card_detail(&self, detail: &mut CardDetailView, msg: &ChangeMessage) -> MergeOutcome {
        if self.is_echo(msg) {
            return MergeOutcome::Echo;
        }

        match msg {
            ChangeMessage::AddAttachment {
                card_id,
                attachment,
                activity,
                ..
            } if card_id == detail.card_id() => {
                detail.add_attachment(attachment.clone());
                detail.push_activity(activity.clone());
                MergeOutcome::Applied
            }
            ChangeMessage::DeleteAttachment {
                card_id,
                attachment_id,
                ..
            } if card_id == detail.card_id() => {
                detail.remove_attachment(attachment_id);
                MergeOutcome::Applied
            }
            ChangeMessage::UpdateCardDescription {
                card_id,
                description,
                activity,
                ..
            } if card_id == detail.card_id() => {
                detail.card.description = Some(description.clone());
                detail.push_activity(activity.clone());
                MergeOutcome::Applied
            }
            ChangeMessage::Unknown => {
                log::warn!("ignoring broadcast of unknown kind on card {}", detail.card_id());
                MergeOutcome::Ignored
            }
            _ => MergeOutcome::Ignored,
        }
    }

    pub fn merge_invitations(&self, invitations: &mut Vec<Invitation>, msg: &ChangeMessage) -> MergeOutcome {
        if self.is_echo(msg) {
            return MergeOutcome::Echo;
        }

        match msg {
            ChangeMessage::Invitation { invitation, .. }
                if invitation.requestee_id == self.local_user_id =>
            {
                if invitations.iter().any(|i| i.id == invitation.id) {
                    return MergeOutcome::Ignored;
                }
                invitations.push(invitation.clone());
                MergeOutcome::Applied
            }
            ChangeMessage::Unknown => {
                log::warn!("ignoring broadcast of unknown kind on user channel");
                MergeOutcome::Ignored
            }
            _ => MergeOutcome::Ignored,
        }
    }
}

fn clamp(position: Position, max: Position) -> Position {
    position.clamp(0, max.max(0))
}

fn insert_list(view: &mut BoardView, mut list: ListWithCards) {
    list.list.position = clamp(list.list.position, view.lists.len() as Position);
    ShiftStep::opening(view.board_id(), list.list.position)
        .apply(view.lists.iter_mut().map(|l| &mut l.list));
    list.sort_cards();
    view.lists.push(list);
    view.lists.sort_by_key(|l| l.list.position);
}
