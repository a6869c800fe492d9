//! Board Session
//!
//! Per-board UI state: created when a board page mounts and dropped when it
//! unmounts. Owns the board cache, the drag reducer, the merger, the open
//! card dialog, the invitation inbox and every move still waiting for the
//! server.

use std::collections::VecDeque;

use crate::change::{ChangeMessage, Channel};
use crate::command::{CommandResponse, MoveCommand};
use crate::drag::{DragReducer, DragSubject, DropOutcome, HoverTarget, PendingMove};
use crate::merge::{MergeOutcome, RemoteMerger};
use crate::model::Invitation;
use crate::view::{BoardView, CardDetailView};

/// What happened to a pending move once the server answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Confirmed,
    /// Pre-gesture order restored
    RolledBack,
    /// Rolled back, but remote changes merged meanwhile were lost; reload
    ReloadRequired,
    /// No pending move with that id
    Unknown,
}

#[derive(Debug)]
struct InFlight {
    id: u64,
    pending: PendingMove,
    /// Remote changes applied since the drop
    merged_since: usize,
}

#[derive(Debug)]
pub struct BoardSession {
    pub view: BoardView,
    pub card_detail: Option<CardDetailView>,
    pub invitations: Vec<Invitation>,
    drag: DragReducer,
    merger: RemoteMerger,
    in_flight: VecDeque<InFlight>,
    /// Board messages received mid-gesture, merged once it ends
    deferred: Vec<ChangeMessage>,
    next_move_id: u64,
    reload_requested: bool,
    /// Channels the server has confirmed since the socket last opened
    live: Vec<Channel>,
}

impl BoardSession {
    pub fn new(view: BoardView, local_user_id: impl Into<String>) -> Self {
        Self {
            view,
            card_detail: None,
            invitations: Vec::new(),
            drag: DragReducer::new(),
            merger: RemoteMerger::new(local_user_id),
            in_flight: VecDeque::new(),
            deferred: Vec::new(),
            next_move_id: 0,
            reload_requested: false,
            live: Vec::new(),
        }
    }

    pub fn board_id(&self) -> &str {
        self.view.board_id()
    }

    pub fn local_user_id(&self) -> &str {
        self.merger.local_user_id()
    }

    pub fn drag(&self) -> &DragReducer {
        &self.drag
    }

    /// Channels this session listens on
    pub fn channels(&self) -> Vec<Channel> {
        let mut channels = vec![
            Channel::Board(self.board_id().to_string()),
            Channel::User(self.local_user_id().to_string()),
        ];
        if let Some(detail) = &self.card_detail {
            channels.push(Channel::Card(detail.card_id().to_string()));
        }
        channels
    }

    /// Record that the server now delivers `channel` to us.
    ///
    /// Returns true when this completes the channel set. Whatever was loaded
    /// before that point may have missed changes published while a channel
    /// had no receiver, so the caller reloads once.
    pub fn confirm_subscription(&mut self, channel: &Channel) -> bool {
        let wanted = self.channels();
        if !wanted.contains(channel) || self.live.contains(channel) {
            return false;
        }
        self.live.push(channel.clone());
        wanted.iter().all(|c| self.live.contains(c))
    }

    /// The socket (re)opened; nothing is confirmed until the server says so.
    pub fn reset_subscriptions(&mut self) {
        self.live.clear();
    }

    /// Set when local state can no longer be trusted; cleared by `replace_view`.
    pub fn needs_reload(&self) -> bool {
        self.reload_requested
    }

    pub fn request_reload(&mut self) {
        self.reload_requested = true;
    }

    /// Swap in freshly loaded state. Any gesture or pending move is dropped.
    pub fn replace_view(&mut self, view: BoardView) {
        self.drag.cancel(&mut self.view);
        self.view = view;
        self.in_flight.clear();
        self.deferred.clear();
        self.reload_requested = false;
    }

    pub fn begin_drag(&mut self, subject: DragSubject) -> bool {
        if !self.view.is_member {
            return false;
        }
        self.drag.begin(&self.view, subject)
    }

    pub fn hover(&mut self, target: &HoverTarget) -> bool {
        self.drag.hover(&mut self.view, target)
    }

    /// End the gesture. Returns the command to send, tagged with the id to
    /// pass back to `resolve`.
    pub fn drop(&mut self, target: Option<&HoverTarget>) -> Option<(u64, MoveCommand)> {
        let outcome = self.drag.drop(&mut self.view, target);
        self.drag.finish();

        let sent = match outcome {
            DropOutcome::Commit(pending) => {
                let id = self.next_move_id;
                self.next_move_id += 1;
                let command = pending.command.clone();
                self.in_flight.push_back(InFlight {
                    id,
                    pending,
                    merged_since: 0,
                });
                Some((id, command))
            }
            DropOutcome::NoOp | DropOutcome::Ignored => None,
        };

        self.flush_deferred();
        sent
    }

    pub fn cancel_drag(&mut self) -> bool {
        let cancelled = self.drag.cancel(&mut self.view);
        self.flush_deferred();
        cancelled
    }

    /// Apply the server's answer to move `id`.
    ///
    /// A failure restores the order from before that gesture. Later moves
    /// were built on top of the failed one, so they are abandoned too.
    pub fn resolve(&mut self, id: u64, response: &CommandResponse) -> Resolution {
        let Some(index) = self.in_flight.iter().position(|f| f.id == id) else {
            return Resolution::Unknown;
        };

        if response.ok {
            self.in_flight.remove(index);
            return Resolution::Confirmed;
        }

        log::warn!("move {id} rejected: {}", response.message);
        let mut abandoned = self.in_flight.split_off(index);
        let Some(failed) = abandoned.pop_front() else {
            return Resolution::Unknown;
        };
        let merged_since = failed.merged_since;
        failed.pending.restore(&mut self.view);

        if merged_since > 0 || !abandoned.is_empty() {
            self.reload_requested = true;
            Resolution::ReloadRequired
        } else {
            Resolution::RolledBack
        }
    }

    /// Route a broadcast message by the channel it arrived on.
    pub fn receive(&mut self, channel: &Channel, msg: &ChangeMessage) -> MergeOutcome {
        match channel {
            Channel::Board(id) if id == self.board_id() => {
                if self.drag.is_active() {
                    if self.merger.is_echo(msg) {
                        return MergeOutcome::Echo;
                    }
                    self.deferred.push(msg.clone());
                    return MergeOutcome::Ignored;
                }
                self.merge_board(msg)
            }
            Channel::Card(id) => match &mut self.card_detail {
                Some(detail) if detail.card_id() == id => {
                    self.merger.merge_card_detail(detail, msg)
                }
                _ => MergeOutcome::Ignored,
            },
            Channel::User(id) if id == self.local_user_id() => {
                self.merger.merge_invitations(&mut self.invitations, msg)
            }
            _ => MergeOutcome::Ignored,
        }
    }

    fn merge_board(&mut self, msg: &ChangeMessage) -> MergeOutcome {
        let outcome = self.merger.merge_board(&mut self.view, msg);
        match outcome {
            MergeOutcome::Applied => {
                for flight in &mut self.in_flight {
                    flight.merged_since += 1;
                }
                self.follow_open_card(msg);
            }
            MergeOutcome::ReloadRequired => self.reload_requested = true,
            MergeOutcome::Echo | MergeOutcome::Ignored => {}
        }
        outcome
    }

    fn flush_deferred(&mut self) {
        for msg in std::mem::take(&mut self.deferred) {
            self.merge_board(&msg);
        }
    }

    /// Keep the open dialog consistent with structural board changes.
    fn follow_open_card(&mut self, msg: &ChangeMessage) {
        let Some(detail) = &mut self.card_detail else {
            return;
        };
        match msg {
            ChangeMessage::DeleteCard { card_id, .. } if card_id == detail.card_id() => {
                self.close_card();
            }
            ChangeMessage::DeleteList { list_id, .. } if *list_id == detail.card.list_id => {
                self.close_card();
            }
            ChangeMessage::UpdateCardPositions {
                card_id, list_id, ..
            } if card_id == detail.card_id() => {
                detail.card.list_id = list_id.clone();
            }
            _ => {}
        }
    }

    pub fn open_card(&mut self, detail: CardDetailView) {
        self.card_detail = Some(detail);
    }

    /// Close the dialog, returning the channel to unsubscribe from.
    pub fn close_card(&mut self) -> Option<Channel> {
        let channel = Channel::Card(self.card_detail.take()?.card_id().to_string());
        self.live.retain(|c| *c != channel);
        Some(channel)
    }

    pub fn set_invitations(&mut self, invitations: Vec<Invitation>) {
        self.invitations = invitations;
    }

    pub fn remove_invitation(&mut self, invitation_id: &str) {
        self.invitations.retain(|i| i.id != invitation_id);
    }

    pub fn pending_moves(&self) -> usize {
        self.in_flight.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::{plan_move, plan_reposition};
    use crate::position::Position;
    use crate::view::fixtures::{board, expect, order};
    use proptest::prelude::*;

    const LISTS: [&str; 3] = ["l0", "l1", "l2"];
    const CARDS: [&str; 5] = ["a", "b", "c", "d", "e"];

    fn over(card_id: &str, below: bool) -> HoverTarget {
        HoverTarget::Card {
            card_id: card_id.into(),
            below,
        }
    }

    fn echo_of(command: &MoveCommand, actor: &str) -> ChangeMessage {
        match command {
            MoveCommand::Card {
                values,
                board_id,
                moved_in_same_list,
                initial_index,
                initial_list_id,
            } => ChangeMessage::UpdateCardPositions {
                actor_id: actor.into(),
                board_id: board_id.clone(),
                card_id: values.card_id.clone(),
                original_list_id: initial_list_id.clone(),
                list_id: values.list_id.clone(),
                old_position: *initial_index,
                position: values.final_card_index,
                moved_lists: !moved_in_same_list,
            },
            MoveCommand::List {
                old_index,
                new_index,
                board_id,
                list_id,
            } => ChangeMessage::UpdateListPositions {
                actor_id: actor.into(),
                board_id: board_id.clone(),
                list_id: list_id.clone(),
                old_position: *old_index,
                position: *new_index,
            },
        }
    }

    fn session(lists: &[(&str, &[&str])]) -> BoardSession {
        BoardSession::new(board(lists), "me")
    }

    fn detail_of(s: &BoardSession, card_id: &str) -> CardDetailView {
        CardDetailView {
            card: s.view.card(card_id).cloned().unwrap(),
            board_id: "b1".into(),
            activities: Vec::new(),
            attachments: Vec::new(),
        }
    }

    #[test]
    fn test_own_echo_leaves_optimistic_state() {
        let mut s = session(&[("l1", &["x", "y"]), ("l2", &["z"])]);
        assert!(s.begin_drag(DragSubject::Card("y".into())));
        let (id, command) = s.drop(Some(&over("z", false))).unwrap();
        let after_commit = s.view.clone();

        let outcome = s.receive(&Channel::Board("b1".into()), &echo_of(&command, "me"));
        assert_eq!(outcome, MergeOutcome::Echo);
        assert_eq!(s.view, after_commit);

        assert_eq!(s.resolve(id, &CommandResponse::success("ok")), Resolution::Confirmed);
        assert_eq!(s.pending_moves(), 0);
        assert_eq!(s.view, after_commit);
    }

    #[test]
    fn test_other_client_converges_on_same_order() {
        let mut origin = session(&[("l1", &["x", "y"]), ("l2", &["z"])]);
        let mut observer = BoardSession::new(board(&[("l1", &["x", "y"]), ("l2", &["z"])]), "you");

        origin.begin_drag(DragSubject::Card("y".into()));
        let (_, command) = origin.drop(Some(&over("z", false))).unwrap();

        let outcome = observer.receive(&Channel::Board("b1".into()), &echo_of(&command, "me"));
        assert_eq!(outcome, MergeOutcome::Applied);
        assert_eq!(order(&observer.view), order(&origin.view));
        assert!(observer.view.is_dense());
    }

    #[test]
    fn test_noop_drop_sends_nothing() {
        let mut s = session(&[("l1", &["x", "y"])]);
        let before = s.view.clone();
        s.begin_drag(DragSubject::Card("x".into()));
        assert!(s.drop(Some(&over("x", false))).is_none());
        assert_eq!(s.view, before);
        assert_eq!(s.pending_moves(), 0);
    }

    #[test]
    fn test_failure_rolls_back() {
        let mut s = session(&[("A", &[]), ("B", &[]), ("C", &[])]);
        let before = s.view.clone();
        s.begin_drag(DragSubject::List("A".into()));
        let (id, _) = s.drop(Some(&HoverTarget::List("C".into()))).unwrap();
        assert_ne!(s.view, before);

        let failure = CommandResponse {
            message: "Database error".into(),
            ok: false,
            id: None,
        };
        assert_eq!(s.resolve(id, &failure), Resolution::RolledBack);
        assert_eq!(s.view, before);
        assert_eq!(s.resolve(id, &failure), Resolution::Unknown);
    }

    #[test]
    fn test_failure_after_remote_merge_asks_for_reload() {
        let mut s = session(&[("l1", &["x", "y"]), ("l2", &["z"])]);
        s.begin_drag(DragSubject::Card("x".into()));
        let (id, _) = s.drop(Some(&over("y", true))).unwrap();

        let rename = ChangeMessage::UpdateListName {
            actor_id: "other".into(),
            list_id: "l2".into(),
            name: "Done".into(),
        };
        assert_eq!(s.receive(&Channel::Board("b1".into()), &rename), MergeOutcome::Applied);

        let failure = CommandResponse {
            message: "Database error".into(),
            ok: false,
            id: None,
        };
        assert_eq!(s.resolve(id, &failure), Resolution::ReloadRequired);
        assert!(s.needs_reload());
    }

    #[test]
    fn test_remote_changes_wait_for_gesture() {
        let mut s = session(&[("l1", &["x", "y"]), ("l2", &["z"])]);
        s.begin_drag(DragSubject::Card("x".into()));
        s.hover(&over("y", true));

        let remote = ChangeMessage::DeleteCard {
            actor_id: "other".into(),
            board_id: "b1".into(),
            list_id: "l2".into(),
            card_id: "z".into(),
            deleted_position: 0,
        };
        assert_eq!(s.receive(&Channel::Board("b1".into()), &remote), MergeOutcome::Ignored);
        assert_eq!(s.view.card_count("l2"), Some(1));

        assert!(s.cancel_drag());
        assert_eq!(order(&s.view), expect(&[("l1", &["x", "y"]), ("l2", &[])]));
    }

    #[test]
    fn test_non_member_cannot_drag() {
        let mut view = board(&[("l1", &["x"])]);
        view.is_member = false;
        let mut s = BoardSession::new(view, "me");
        assert!(!s.begin_drag(DragSubject::Card("x".into())));
    }

    #[test]
    fn test_channels_follow_open_card() {
        let mut s = session(&[("l1", &["x"])]);
        assert_eq!(
            s.channels(),
            vec![Channel::Board("b1".into()), Channel::User("me".into())]
        );

        s.open_card(detail_of(&s, "x"));
        assert!(s.channels().contains(&Channel::Card("x".into())));

        let delete = ChangeMessage::DeleteCard {
            actor_id: "other".into(),
            board_id: "b1".into(),
            list_id: "l1".into(),
            card_id: "x".into(),
            deleted_position: 0 as Position,
        };
        s.receive(&Channel::Board("b1".into()), &delete);
        assert!(s.card_detail.is_none());
    }

    #[test]
    fn test_reload_once_all_channels_are_live() {
        let mut s = session(&[("l1", &["x"])]);
        let board_channel = Channel::Board("b1".into());
        let user_channel = Channel::User("me".into());

        // Loaded before anything was live: the last confirmation asks for a reload
        assert!(!s.confirm_subscription(&board_channel));
        assert!(s.confirm_subscription(&user_channel));
        assert!(!s.confirm_subscription(&board_channel));
        assert!(!s.confirm_subscription(&Channel::Card("x".into())));

        s.open_card(detail_of(&s, "x"));
        assert!(s.confirm_subscription(&Channel::Card("x".into())));

        s.reset_subscriptions();
        assert!(!s.confirm_subscription(&board_channel));
        assert!(!s.confirm_subscription(&user_channel));
        assert!(s.confirm_subscription(&Channel::Card("x".into())));
    }

    #[test]
    fn test_reopened_card_is_confirmed_again() {
        let mut s = session(&[("l1", &["x", "y"])]);
        s.confirm_subscription(&Channel::Board("b1".into()));
        s.confirm_subscription(&Channel::User("me".into()));

        s.open_card(detail_of(&s, "x"));
        assert!(s.confirm_subscription(&Channel::Card("x".into())));
        assert_eq!(s.close_card(), Some(Channel::Card("x".into())));

        // A late confirmation for a closed card changes nothing
        assert!(!s.confirm_subscription(&Channel::Card("x".into())));

        s.open_card(detail_of(&s, "x"));
        assert!(s.confirm_subscription(&Channel::Card("x".into())));
    }

    #[test]
    fn test_remote_delete_closes_card_subscription() {
        let mut s = session(&[("l1", &["x", "y"])]);
        s.confirm_subscription(&Channel::Board("b1".into()));
        s.confirm_subscription(&Channel::User("me".into()));
        s.open_card(detail_of(&s, "x"));
        assert!(s.confirm_subscription(&Channel::Card("x".into())));

        let delete = ChangeMessage::DeleteCard {
            actor_id: "other".into(),
            board_id: "b1".into(),
            list_id: "l1".into(),
            card_id: "x".into(),
            deleted_position: 0,
        };
        s.receive(&Channel::Board("b1".into()), &delete);
        assert!(s.card_detail.is_none());

        s.open_card(detail_of(&s, "y"));
        assert!(s.confirm_subscription(&Channel::Card("y".into())));
    }

    fn start() -> BoardView {
        board(&[("l0", &["a", "b", "c"]), ("l1", &["d", "e"]), ("l2", &[])])
    }

    fn subject_strategy() -> impl Strategy<Value = DragSubject> {
        prop_oneof![
            (0..LISTS.len()).prop_map(|i| DragSubject::List(LISTS[i].into())),
            (0..CARDS.len()).prop_map(|i| DragSubject::Card(CARDS[i].into())),
        ]
    }

    fn hover_strategy() -> impl Strategy<Value = HoverTarget> {
        prop_oneof![
            (0..LISTS.len()).prop_map(|i| HoverTarget::List(LISTS[i].into())),
            (0..CARDS.len(), any::<bool>()).prop_map(|(i, below)| over(CARDS[i], below)),
            (0..LISTS.len()).prop_map(|i| HoverTarget::EmptyList(LISTS[i].into())),
        ]
    }

    /// Carry out a move the way the server plans it: from the indices the
    /// client sent, not from the client's view.
    fn apply_on_server(server: &mut BoardView, command: &MoveCommand) {
        match command {
            MoveCommand::List {
                old_index,
                new_index,
                board_id,
                list_id,
            } => {
                if let Some(plan) = plan_reposition(list_id, board_id, *old_index, *new_index) {
                    assert!(server.apply_list_plan(&plan));
                }
            }
            MoveCommand::Card {
                values,
                initial_index,
                initial_list_id,
                ..
            } => {
                if let Some(plan) = plan_move(
                    &values.card_id,
                    initial_list_id,
                    *initial_index,
                    &values.list_id,
                    values.final_card_index,
                ) {
                    assert!(server.apply_card_plan(&plan));
                }
            }
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(2000))]

        #[test]
        fn prop_drag_converges_on_every_client(
            subject in subject_strategy(),
            hovers in proptest::collection::vec(hover_strategy(), 0..8),
        ) {
            let mut server = start();
            let mut origin = BoardSession::new(start(), "me");
            let mut observer = BoardSession::new(start(), "you");
            let board_channel = Channel::Board("b1".into());

            prop_assert!(origin.begin_drag(subject));
            for target in &hovers {
                origin.hover(target);
            }
            let Some((id, command)) = origin.drop(hovers.last()) else {
                prop_assert_eq!(order(&origin.view), order(&server));
                prop_assert_eq!(origin.pending_moves(), 0);
                return Ok(());
            };

            apply_on_server(&mut server, &command);
            let echo = echo_of(&command, "me");
            prop_assert_eq!(origin.receive(&board_channel, &echo), MergeOutcome::Echo);
            prop_assert_eq!(observer.receive(&board_channel, &echo), MergeOutcome::Applied);
            prop_assert_eq!(
                origin.resolve(id, &CommandResponse::success("ok")),
                Resolution::Confirmed
            );

            prop_assert!(server.is_dense());
            prop_assert!(origin.view.is_dense());
            prop_assert!(observer.view.is_dense());
            prop_assert_eq!(order(&origin.view), order(&server));
            prop_assert_eq!(order(&observer.view), order(&server));
        }
    }
}
