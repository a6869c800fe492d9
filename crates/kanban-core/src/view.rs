//! Client-side caches of authoritative state.
//!
//! Both views are rebuilt from the server on load and kept live by the drag
//! reducer and the remote merger. They are never a source of truth.

use serde::{Deserialize, Serialize};

use crate::model::{Activity, Attachment, Board, Card, ListWithCards};
use crate::planner::MovePlan;
use crate::position::{is_dense, Position};

/// A board with its lists and cards, each ordered by position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardView {
    pub board: Board,
    pub lists: Vec<ListWithCards>,
    pub is_member: bool,
}

impl BoardView {
    pub fn new(board: Board, mut lists: Vec<ListWithCards>, is_member: bool) -> Self {
        lists.sort_by_key(|l| l.list.position);
        for list in &mut lists {
            list.sort_cards();
        }
        Self {
            board,
            lists,
            is_member,
        }
    }

    pub fn board_id(&self) -> &str {
        &self.board.id
    }

    pub fn list_index(&self, list_id: &str) -> Option<usize> {
        self.lists.iter().position(|l| l.list.id == list_id)
    }

    /// (list index, card index) of a card
    pub fn locate_card(&self, card_id: &str) -> Option<(usize, usize)> {
        self.lists.iter().enumerate().find_map(|(li, list)| {
            list.cards
                .iter()
                .position(|c| c.id == card_id)
                .map(|ci| (li, ci))
        })
    }

    pub fn card(&self, card_id: &str) -> Option<&Card> {
        self.locate_card(card_id)
            .map(|(li, ci)| &self.lists[li].cards[ci])
    }

    pub fn card_mut(&mut self, card_id: &str) -> Option<&mut Card> {
        let (li, ci) = self.locate_card(card_id)?;
        Some(&mut self.lists[li].cards[ci])
    }

    pub fn card_count(&self, list_id: &str) -> Option<usize> {
        self.list_index(list_id).map(|i| self.lists[i].cards.len())
    }

    /// Apply a plan whose scope is this board. False if the list is unknown.
    pub fn apply_list_plan(&mut self, plan: &MovePlan) -> bool {
        let relocated = plan.apply(self.lists.iter_mut().map(|l| &mut l.list));
        self.lists.sort_by_key(|l| l.list.position);
        relocated
    }

    /// Apply a plan whose scopes are lists of this board.
    ///
    /// False if the card or its destination list is unknown; nothing changes
    /// in that case.
    pub fn apply_card_plan(&mut self, plan: &MovePlan) -> bool {
        if self.list_index(&plan.relocation.scope).is_none()
            || self.locate_card(&plan.relocation.key).is_none()
        {
            return false;
        }

        let relocated = plan.apply(self.lists.iter_mut().flat_map(|l| l.cards.iter_mut()));
        self.regroup_cards();
        relocated
    }

    /// Move cards whose `list_id` changed into their list, then sort.
    fn regroup_cards(&mut self) {
        let mut strays = Vec::new();
        for list in &mut self.lists {
            let list_id = list.list.id.clone();
            let (stay, moved): (Vec<Card>, Vec<Card>) =
                list.cards.drain(..).partition(|c| c.list_id == list_id);
            list.cards = stay;
            strays.extend(moved);
        }
        for card in strays {
            if let Some(i) = self.list_index(&card.list_id) {
                self.lists[i].cards.push(card);
            }
        }
        for list in &mut self.lists {
            list.sort_cards();
        }
    }

    /// Rewrite every position to match the current vector order.
    pub fn renumber(&mut self) {
        for (i, list) in self.lists.iter_mut().enumerate() {
            list.list.position = i as Position;
            let list_id = list.list.id.clone();
            for (j, card) in list.cards.iter_mut().enumerate() {
                card.position = j as Position;
                card.list_id = list_id.clone();
            }
        }
    }

    /// Dense invariant over the lists and every list's cards
    pub fn is_dense(&self) -> bool {
        is_dense(self.lists.iter().map(|l| l.list.position))
            && self
                .lists
                .iter()
                .all(|l| is_dense(l.cards.iter().map(|c| c.position)))
    }

    /// Card ids per list, in rendered order
    pub fn card_order(&self) -> Vec<(String, Vec<String>)> {
        self.lists
            .iter()
            .map(|l| {
                (
                    l.list.id.clone(),
                    l.cards.iter().map(|c| c.id.clone()).collect(),
                )
            })
            .collect()
    }
}

/// Everything shown in the card dialog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardDetailView {
    pub card: Card,
    pub board_id: String,
    /// Newest first
    pub activities: Vec<Activity>,
    /// Oldest first
    pub attachments: Vec<Attachment>,
}

impl CardDetailView {
    pub fn card_id(&self) -> &str {
        &self.card.id
    }

    pub fn push_activity(&mut self, activity: Activity) {
        if self.activities.iter().any(|a| a.id == activity.id) {
            return;
        }
        self.activities.insert(0, activity);
    }

    pub fn add_attachment(&mut self, attachment: Attachment) {
        if self.attachments.iter().any(|a| a.id == attachment.id) {
            return;
        }
        self.card.attachment = Some(attachment.clone());
        self.attachments.push(attachment);
    }

    pub fn remove_attachment(&mut self, attachment_id: &str) {
        self.attachments.retain(|a| a.id != attachment_id);
        self.card.attachment = self.attachments.last().cloned();
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::model::{Board, List, Visibility};

    pub fn board(lists: &[(&str, &[&str])]) -> BoardView {
        let lists = lists
            .iter()
            .enumerate()
            .map(|(i, (list_id, cards))| ListWithCards {
                list: List {
                    id: list_id.to_string(),
                    name: list_id.to_string(),
                    board_id: "b1".into(),
                    position: i as Position,
                    created_by: "owner".into(),
                    created_at: 0,
                },
                cards: cards
                    .iter()
                    .enumerate()
                    .map(|(j, card_id)| card(card_id, list_id, j as Position))
                    .collect(),
            })
            .collect();

        BoardView::new(
            Board {
                id: "b1".into(),
                name: "Board".into(),
                description: None,
                visibility: Visibility::Private,
                created_by: "owner".into(),
                created_at: 0,
            },
            lists,
            true,
        )
    }

    pub fn card(id: &str, list_id: &str, position: Position) -> Card {
        Card {
            id: id.to_string(),
            name: id.to_string(),
            description: None,
            list_id: list_id.to_string(),
            position,
            attachment: None,
        }
    }

    pub fn order(view: &BoardView) -> Vec<(String, Vec<String>)> {
        view.card_order()
    }

    pub fn expect(lists: &[(&str, &[&str])]) -> Vec<(String, Vec<String>)> {
        lists
            .iter()
            .map(|(l, cards)| (l.to_string(), cards.iter().map(|c| c.to_string()).collect()))
            .collect()
    }
}
