//! Authoritative Mutator
//!
//! Every state change goes through here: validate, check membership, run the
//! repository transaction, then publish what changed. A failed step returns
//! before anything is broadcast.

use std::sync::Arc;

use base64::Engine;
use kanban_core::command::{
    AddAttachment, AddCard, AddList, CreateBoard, DeleteAttachment, DeleteCard, DeleteList,
    InviteUser, RenameBoard, RenameList, UpdateDescription,
};
use kanban_core::{ChangeMessage, Channel, CommandResponse, MoveCommand};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::broadcast::ChangeBroadcaster;
use crate::domain::{
    new_id, now_millis, Activity, Attachment, Board, Card, DomainError, DomainResult, List,
    ListWithCards, User, Visibility,
};
use crate::repository::{
    CardDetailOperations, CardPositioningOperations, ListPositioningOperations, Repositories,
    Repository,
};
use crate::storage::BlobStore;

const ALLOWED_ATTACHMENT_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];

/// Characters escaped in asset urls; `/` is kept as the key separator
const ASSET_PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

pub struct Mutator {
    repos: Arc<Repositories>,
    broadcaster: Arc<ChangeBroadcaster>,
    blobs: Arc<dyn BlobStore>,
    max_attachment_bytes: usize,
}

impl Mutator {
    pub fn new(
        repos: Arc<Repositories>,
        broadcaster: Arc<ChangeBroadcaster>,
        blobs: Arc<dyn BlobStore>,
        max_attachment_bytes: usize,
    ) -> Self {
        Self {
            repos,
            broadcaster,
            blobs,
            max_attachment_bytes,
        }
    }

    /// Members only. An unknown board is treated the same as a foreign one.
    async fn authorize(&self, board_id: &str, actor: &User) -> DomainResult<()> {
        if self.repos.boards.is_member(board_id, &actor.id).await? {
            Ok(())
        } else {
            tracing::warn!(board_id, user_id = %actor.id, "rejected non-member command");
            Err(DomainError::NotAuthorized)
        }
    }

    async fn list_on_board(&self, board_id: &str, list_id: &str) -> DomainResult<()> {
        match self.repos.lists.board_of(list_id).await? {
            Some(owner) if owner == board_id => Ok(()),
            Some(_) => Err(DomainError::validation(DomainError::GENERIC_MESSAGE)),
            None => Err(DomainError::not_found("List not found")),
        }
    }

    /// List id of a card on `board_id`
    async fn card_on_board(&self, board_id: &str, card_id: &str) -> DomainResult<String> {
        match self.repos.cards.card_location(card_id).await? {
            Some((owner, list_id)) if owner == board_id => Ok(list_id),
            Some(_) => Err(DomainError::validation(DomainError::GENERIC_MESSAGE)),
            None => Err(DomainError::not_found("Card not found")),
        }
    }

    pub async fn apply_move(&self, actor: &User, command: &MoveCommand) -> DomainResult<CommandResponse> {
        command.validate_shape()?;
        self.authorize(command.board_id(), actor).await?;

        match command {
            MoveCommand::List {
                old_index,
                new_index,
                board_id,
                list_id,
            } => {
                let moved = self
                    .repos
                    .lists
                    .move_list(board_id, list_id, *old_index, *new_index)
                    .await?;
                if moved {
                    tracing::info!(%board_id, %list_id, old_index, new_index, "list moved");
                    self.broadcaster.publish(
                        &Channel::Board(board_id.clone()),
                        ChangeMessage::UpdateListPositions {
                            actor_id: actor.id.clone(),
                            board_id: board_id.clone(),
                            list_id: list_id.clone(),
                            old_position: *old_index,
                            position: *new_index,
                        },
                    );
                }
                Ok(CommandResponse::success("List positions successfully updated!"))
            }
            MoveCommand::Card {
                values,
                board_id,
                moved_in_same_list,
                initial_index,
                initial_list_id,
            } => {
                let moved = self
                    .repos
                    .cards
                    .move_card(board_id, values, initial_list_id, *initial_index)
                    .await?;
                if moved {
                    tracing::info!(
                        %board_id,
                        card_id = %values.card_id,
                        from = %initial_list_id,
                        to = %values.list_id,
                        "card moved"
                    );
                    self.broadcaster.publish(
                        &Channel::Board(board_id.clone()),
                        ChangeMessage::UpdateCardPositions {
                            actor_id: actor.id.clone(),
                            board_id: board_id.clone(),
                            card_id: values.card_id.clone(),
                            original_list_id: initial_list_id.clone(),
                            list_id: values.list_id.clone(),
                            old_position: *initial_index,
                            position: values.final_card_index,
                            moved_lists: !moved_in_same_list,
                        },
                    );
                }
                Ok(CommandResponse::success("Card positions successfully updated!"))
            }
        }
    }

    pub async fn create_board(&self, actor: &User, command: &CreateBoard) -> DomainResult<CommandResponse> {
        command.validate()?;
        let board = Board {
            id: new_id(),
            name: command.name.trim().to_string(),
            description: command.description.clone().filter(|d| !d.trim().is_empty()),
            visibility: Visibility::from_public_flag(command.is_public),
            created_by: actor.id.clone(),
            created_at: now_millis(),
        };
        let board = self.repos.boards.create(&board).await?;
        tracing::info!(board_id = %board.id, user_id = %actor.id, "board created");
        Ok(CommandResponse::created("Board successfully created!", board.id))
    }

    pub async fn rename_board(
        &self,
        actor: &User,
        board_id: &str,
        command: &RenameBoard,
    ) -> DomainResult<CommandResponse> {
        command.validate()?;
        self.authorize(board_id, actor).await?;

        let mut board = self
            .repos
            .boards
            .find_by_id(&board_id.to_string())
            .await?
            .ok_or_else(|| DomainError::not_found("Board not found"))?;
        board.name = command.name.trim().to_string();
        let board = self.repos.boards.update(&board).await?;

        self.broadcaster.publish(
            &Channel::Board(board.id.clone()),
            ChangeMessage::UpdateBoardName {
                actor_id: actor.id.clone(),
                board_id: board.id.clone(),
                name: board.name.clone(),
            },
        );
        Ok(CommandResponse::success("Board name successfully changed!"))
    }

    pub async fn delete_board(&self, actor: &User, board_id: &str) -> DomainResult<CommandResponse> {
        self.authorize(board_id, actor).await?;
        let blob_keys = self.repos.boards.delete_with_blobs(board_id).await?;
        self.blobs.delete_all(&blob_keys).await;
        tracing::info!(board_id, blobs = blob_keys.len(), "board deleted");
        Ok(CommandResponse::success("Board successfully deleted"))
    }

    /// Repair positions after a lost race. Nothing is broadcast; clients
    /// pick the result up on their next reload.
    pub async fn reindex_board(&self, actor: &User, board_id: &str) -> DomainResult<CommandResponse> {
        self.authorize(board_id, actor).await?;
        let changed = self.repos.boards.reindex(board_id).await?;
        tracing::info!(board_id, changed, "board reindexed");
        Ok(CommandResponse::success("Board successfully reindexed"))
    }

    pub async fn add_list(&self, actor: &User, command: &AddList) -> DomainResult<CommandResponse> {
        command.validate()?;
        self.authorize(&command.board_id, actor).await?;

        let list = List {
            id: new_id(),
            name: command.name.trim().to_string(),
            board_id: command.board_id.clone(),
            position: 0,
            created_by: actor.id.clone(),
            created_at: now_millis(),
        };
        let list = self.repos.lists.create(&list).await?;
        tracing::info!(board_id = %list.board_id, list_id = %list.id, position = list.position, "list added");

        let id = list.id.clone();
        self.broadcaster.publish(
            &Channel::Board(command.board_id.clone()),
            ChangeMessage::AddList {
                actor_id: actor.id.clone(),
                board_id: command.board_id.clone(),
                new_list: ListWithCards::new(list),
            },
        );
        Ok(CommandResponse::created("List successfully created!", id))
    }

    pub async fn rename_list(&self, actor: &User, command: &RenameList) -> DomainResult<CommandResponse> {
        command.validate()?;
        self.authorize(&command.board_id, actor).await?;
        self.list_on_board(&command.board_id, &command.list_id).await?;

        let mut list = self
            .repos
            .lists
            .find_by_id(&command.list_id)
            .await?
            .ok_or_else(|| DomainError::not_found("List not found"))?;
        list.name = command.name.trim().to_string();
        let list = self.repos.lists.update(&list).await?;

        self.broadcaster.publish(
            &Channel::Board(command.board_id.clone()),
            ChangeMessage::UpdateListName {
                actor_id: actor.id.clone(),
                list_id: list.id,
                name: list.name,
            },
        );
        Ok(CommandResponse::success("List title successfully changed!"))
    }

    pub async fn delete_list(&self, actor: &User, command: &DeleteList) -> DomainResult<CommandResponse> {
        command.validate()?;
        self.authorize(&command.board_id, actor).await?;

        let deleted = self
            .repos
            .lists
            .delete_list_and_compact(&command.board_id, &command.list_id)
            .await?;
        self.blobs.delete_all(&deleted.blob_keys).await;
        tracing::info!(list_id = %command.list_id, position = deleted.position, "list deleted");

        self.broadcaster.publish(
            &Channel::Board(command.board_id.clone()),
            ChangeMessage::DeleteList {
                actor_id: actor.id.clone(),
                board_id: command.board_id.clone(),
                list_id: command.list_id.clone(),
                deleted_position: deleted.position,
            },
        );
        Ok(CommandResponse::success("List successfully deleted"))
    }

    pub async fn add_card(&self, actor: &User, command: &AddCard) -> DomainResult<CommandResponse> {
        command.validate()?;
        self.authorize(&command.board_id, actor).await?;
        self.list_on_board(&command.board_id, &command.list_id).await?;

        let card = Card {
            id: new_id(),
            name: command.name.trim().to_string(),
            description: command.description.clone().filter(|d| !d.trim().is_empty()),
            list_id: command.list_id.clone(),
            position: 0,
            attachment: None,
        };
        let card = self.repos.cards.create(&card).await?;
        tracing::info!(list_id = %card.list_id, card_id = %card.id, position = card.position, "card added");

        let id = card.id.clone();
        self.broadcaster.publish(
            &Channel::Board(command.board_id.clone()),
            ChangeMessage::AddCard {
                actor_id: actor.id.clone(),
                board_id: command.board_id.clone(),
                new_card: card,
            },
        );
        Ok(CommandResponse::created("Card successfully added!", id))
    }

    pub async fn delete_card(&self, actor: &User, command: &DeleteCard) -> DomainResult<CommandResponse> {
        command.validate()?;
        self.authorize(&command.board_id, actor).await?;

        let deleted = self
            .repos
            .cards
            .delete_card_and_compact(&command.board_id, &command.card_id)
            .await?;
        self.blobs.delete_all(&deleted.blob_keys).await;
        tracing::info!(card_id = %command.card_id, position = deleted.position, "card deleted");

        self.broadcaster.publish(
            &Channel::Board(command.board_id.clone()),
            ChangeMessage::DeleteCard {
                actor_id: actor.id.clone(),
                board_id: command.board_id.clone(),
                list_id: deleted.list_id,
                card_id: command.card_id.clone(),
                deleted_position: deleted.position,
            },
        );
        Ok(CommandResponse::success("Card successfully deleted"))
    }

    pub async fn update_description(
        &self,
        actor: &User,
        command: &UpdateDescription,
    ) -> DomainResult<CommandResponse> {
        command.validate()?;
        self.authorize(&command.board_id, actor).await?;
        let list_id = self.card_on_board(&command.board_id, &command.card_id).await?;

        let activity = activity(actor, &command.card_id, "updated the description".to_string());
        let card = self
            .repos
            .cards
            .update_description(&command.card_id, &command.description, &activity)
            .await?;

        let message = ChangeMessage::UpdateCardDescription {
            actor_id: actor.id.clone(),
            card_id: card.id.clone(),
            list_id,
            description: card.description.unwrap_or_default(),
            activity,
        };
        self.publish_card_change(&command.board_id, &command.card_id, message);
        Ok(CommandResponse::success("Description successfully changed!"))
    }

    pub async fn add_attachment(
        &self,
        actor: &User,
        command: &AddAttachment,
    ) -> DomainResult<CommandResponse> {
        command.validate()?;
        self.authorize(&command.board_id, actor).await?;
        let list_id = self.card_on_board(&command.board_id, &command.card_id).await?;

        let mime = mime_guess::from_path(&command.name).first_or_octet_stream();
        if !ALLOWED_ATTACHMENT_TYPES.contains(&mime.essence_str()) {
            return Err(DomainError::validation(
                "Only jpg, jpeg, png and webp files are allowed",
            ));
        }
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(command.data_base64.trim())
            .map_err(|_| DomainError::validation("Invalid file data"))?;
        if bytes.is_empty() {
            return Err(DomainError::validation("File is empty"));
        }
        if bytes.len() > self.max_attachment_bytes {
            return Err(DomainError::validation(format!(
                "File must be at most {} bytes",
                self.max_attachment_bytes
            )));
        }

        let id = new_id();
        let blob_key = format!("cardId/{}/{}/{}", command.card_id, id, command.name);
        self.blobs.put(&blob_key, &bytes).await.map_err(|e| {
            tracing::error!("failed to store blob {}: {}", blob_key, e);
            DomainError::store(e.to_string())
        })?;

        let attachment = Attachment {
            id,
            card_id: command.card_id.clone(),
            name: command.name.clone(),
            url: asset_url(&blob_key),
            created_at: now_millis(),
        };
        let activity = activity(
            actor,
            &command.card_id,
            format!("attached {} to this card", command.name),
        );
        if let Err(e) = self
            .repos
            .cards
            .add_attachment(&attachment, &blob_key, &activity)
            .await
        {
            self.blobs.delete_all(&[blob_key]).await;
            return Err(e);
        }
        tracing::info!(card_id = %command.card_id, bytes = bytes.len(), "attachment added");

        let id = attachment.id.clone();
        let message = ChangeMessage::AddAttachment {
            actor_id: actor.id.clone(),
            card_id: command.card_id.clone(),
            list_id,
            attachment,
            activity,
        };
        self.publish_card_change(&command.board_id, &command.card_id, message);
        Ok(CommandResponse::created("Attachment successfully uploaded!", id))
    }

    pub async fn delete_attachment(
        &self,
        actor: &User,
        command: &DeleteAttachment,
    ) -> DomainResult<CommandResponse> {
        command.validate()?;
        self.authorize(&command.board_id, actor).await?;
        match self
            .repos
            .cards
            .attachment_location(&command.attachment_id)
            .await?
        {
            Some((board_id, _)) if board_id == command.board_id => {}
            Some(_) => return Err(DomainError::validation(DomainError::GENERIC_MESSAGE)),
            None => return Err(DomainError::not_found("Attachment not found")),
        }

        let removed = self
            .repos
            .cards
            .delete_attachment(&command.attachment_id)
            .await?;
        self.blobs.delete_all(&[removed.blob_key.clone()]).await;

        let card_id = removed.attachment.card_id.clone();
        let message = ChangeMessage::DeleteAttachment {
            actor_id: actor.id.clone(),
            card_id: card_id.clone(),
            list_id: removed.list_id,
            attachment_id: removed.attachment.id,
            latest: removed.latest,
        };
        self.publish_card_change(&removed.board_id, &card_id, message);
        Ok(CommandResponse::success("Attachment successfully deleted!"))
    }

    pub async fn invite(&self, actor: &User, command: &InviteUser) -> DomainResult<CommandResponse> {
        command.validate()?;
        self.authorize(&command.board_id, actor).await?;

        let requestee = self
            .repos
            .users
            .find_by_email(&command.email)
            .await?
            .ok_or_else(|| DomainError::not_found("User does not exist"))?;
        let invitation = self
            .repos
            .invitations
            .create(&new_id(), &command.board_id, &actor.id, &requestee.id)
            .await?;
        tracing::info!(board_id = %command.board_id, requestee = %requestee.id, "invitation sent");

        let id = invitation.id.clone();
        self.broadcaster.publish(
            &Channel::User(requestee.id),
            ChangeMessage::Invitation {
                actor_id: actor.id.clone(),
                invitation,
            },
        );
        Ok(CommandResponse::created("Request successfully sent!", id))
    }

    pub async fn accept_invitation(&self, actor: &User, id: &str) -> DomainResult<CommandResponse> {
        let invitation = self.repos.invitations.accept(id, &actor.id).await?;
        tracing::info!(board_id = %invitation.board_id, user_id = %actor.id, "invitation accepted");
        Ok(CommandResponse::created(
            "Invitation accepted!",
            invitation.board_id,
        ))
    }

    pub async fn decline_invitation(&self, actor: &User, id: &str) -> DomainResult<CommandResponse> {
        self.repos.invitations.decline(id, &actor.id).await?;
        Ok(CommandResponse::success("Invitation declined"))
    }

    /// Detail changes go to the card's dialog and to the board's tiles
    fn publish_card_change(&self, board_id: &str, card_id: &str, message: ChangeMessage) {
        self.broadcaster
            .publish(&Channel::Card(card_id.to_string()), message.clone());
        self.broadcaster
            .publish(&Channel::Board(board_id.to_string()), message);
    }
}

fn activity(actor: &User, card_id: &str, description: String) -> Activity {
    Activity {
        id: new_id(),
        card_id: card_id.to_string(),
        user_id: actor.id.clone(),
        user_name: actor.display_name().to_string(),
        description,
        created_at: now_millis(),
    }
}

pub fn asset_url(blob_key: &str) -> String {
    format!("/assets/{}", utf8_percent_encode(blob_key, ASSET_PATH))
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use kanban_core::CardMoveValues;
    use tokio::sync::broadcast::Receiver;

    use super::*;
    use crate::repository::init_db;
    use crate::storage::LocalBlobStore;

    struct Harness {
        mutator: Mutator,
        repos: Arc<Repositories>,
        broadcaster: Arc<ChangeBroadcaster>,
        _blob_dir: tempfile::TempDir,
    }

    async fn harness() -> Harness {
        let conn = init_db(Path::new(":memory:")).await.unwrap();
        let repos = Arc::new(Repositories::new(conn));
        let broadcaster = Arc::new(ChangeBroadcaster::new(16));
        let blob_dir = tempfile::tempdir().unwrap();
        let blobs: Arc<dyn BlobStore> = Arc::new(LocalBlobStore::new(blob_dir.path()));
        Harness {
            mutator: Mutator::new(repos.clone(), broadcaster.clone(), blobs, 1024),
            repos,
            broadcaster,
            _blob_dir: blob_dir,
        }
    }

    fn user(id: &str) -> User {
        User {
            id: id.to_string(),
            name: Some(id.to_uppercase()),
            email: Some(format!("{id}@example.com")),
        }
    }

    async fn new_board(h: &Harness, owner: &User) -> String {
        h.mutator
            .create_board(
                owner,
                &CreateBoard {
                    name: "Board".to_string(),
                    description: None,
                    is_public: false,
                },
            )
            .await
            .unwrap()
            .id
            .unwrap()
    }

    async fn new_list(h: &Harness, owner: &User, board_id: &str, name: &str) -> String {
        h.mutator
            .add_list(
                owner,
                &AddList {
                    board_id: board_id.to_string(),
                    name: name.to_string(),
                },
            )
            .await
            .unwrap()
            .id
            .unwrap()
    }

    async fn new_card(h: &Harness, owner: &User, board_id: &str, list_id: &str, name: &str) -> String {
        h.mutator
            .add_card(
                owner,
                &AddCard {
                    board_id: board_id.to_string(),
                    list_id: list_id.to_string(),
                    name: name.to_string(),
                    description: None,
                },
            )
            .await
            .unwrap()
            .id
            .unwrap()
    }

    fn drain(rx: &mut Receiver<ChangeMessage>) -> Vec<ChangeMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    #[tokio::test]
    async fn test_list_move_broadcasts_once() {
        let h = harness().await;
        let owner = user("owner");
        let board_id = new_board(&h, &owner).await;
        let a = new_list(&h, &owner, &board_id, "A").await;
        new_list(&h, &owner, &board_id, "B").await;
        let mut rx = h.broadcaster.subscribe(&Channel::Board(board_id.clone()));

        let response = h
            .mutator
            .apply_move(
                &owner,
                &MoveCommand::List {
                    old_index: 0,
                    new_index: 1,
                    board_id: board_id.clone(),
                    list_id: a.clone(),
                },
            )
            .await
            .unwrap();
        assert!(response.ok);
        assert_eq!(response.message, "List positions successfully updated!");

        let messages = drain(&mut rx);
        assert_eq!(
            messages,
            vec![ChangeMessage::UpdateListPositions {
                actor_id: "owner".to_string(),
                board_id,
                list_id: a,
                old_position: 0,
                position: 1,
            }]
        );
    }

    #[tokio::test]
    async fn test_noop_move_succeeds_silently() {
        let h = harness().await;
        let owner = user("owner");
        let board_id = new_board(&h, &owner).await;
        let a = new_list(&h, &owner, &board_id, "A").await;
        let mut rx = h.broadcaster.subscribe(&Channel::Board(board_id.clone()));

        let response = h
            .mutator
            .apply_move(
                &owner,
                &MoveCommand::List {
                    old_index: 0,
                    new_index: 0,
                    board_id,
                    list_id: a,
                },
            )
            .await
            .unwrap();
        assert!(response.ok);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_non_member_is_rejected_without_change() {
        let h = harness().await;
        let owner = user("owner");
        let board_id = new_board(&h, &owner).await;
        let a = new_list(&h, &owner, &board_id, "A").await;
        new_list(&h, &owner, &board_id, "B").await;
        let mut rx = h.broadcaster.subscribe(&Channel::Board(board_id.clone()));

        let err = h
            .mutator
            .apply_move(
                &user("stranger"),
                &MoveCommand::List {
                    old_index: 0,
                    new_index: 1,
                    board_id: board_id.clone(),
                    list_id: a.clone(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err, DomainError::NotAuthorized);
        assert!(drain(&mut rx).is_empty());

        let view = h.repos.boards.load_view(&board_id, "owner").await.unwrap();
        assert_eq!(view.lists[0].list.id, a);
    }

    #[tokio::test]
    async fn test_cross_list_card_move_scenario() {
        let h = harness().await;
        let owner = user("owner");
        let board_id = new_board(&h, &owner).await;
        let list1 = new_list(&h, &owner, &board_id, "List1").await;
        let list2 = new_list(&h, &owner, &board_id, "List2").await;
        let x = new_card(&h, &owner, &board_id, &list1, "X").await;
        let y = new_card(&h, &owner, &board_id, &list1, "Y").await;
        let z = new_card(&h, &owner, &board_id, &list2, "Z").await;
        let mut rx = h.broadcaster.subscribe(&Channel::Board(board_id.clone()));

        h.mutator
            .apply_move(
                &owner,
                &MoveCommand::Card {
                    values: CardMoveValues {
                        card_id: y.clone(),
                        list_id: list2.clone(),
                        final_list_index: 1,
                        final_card_index: 0,
                    },
                    board_id: board_id.clone(),
                    moved_in_same_list: false,
                    initial_index: 1,
                    initial_list_id: list1.clone(),
                },
            )
            .await
            .unwrap();

        let view = h.repos.boards.load_view(&board_id, "owner").await.unwrap();
        let order = view.card_order();
        assert_eq!(order[0], (list1.clone(), vec![x]));
        assert_eq!(order[1], (list2.clone(), vec![y.clone(), z]));
        assert!(view.is_dense());

        match drain(&mut rx).as_slice() {
            [ChangeMessage::UpdateCardPositions {
                card_id,
                moved_lists,
                old_position,
                position,
                ..
            }] => {
                assert_eq!(card_id, &y);
                assert!(*moved_lists);
                assert_eq!((*old_position, *position), (1, 0));
            }
            other => panic!("unexpected broadcast {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_delete_card_broadcasts_vacated_position() {
        let h = harness().await;
        let owner = user("owner");
        let board_id = new_board(&h, &owner).await;
        let list = new_list(&h, &owner, &board_id, "L").await;
        new_card(&h, &owner, &board_id, &list, "p0").await;
        let p1 = new_card(&h, &owner, &board_id, &list, "p1").await;
        new_card(&h, &owner, &board_id, &list, "p2").await;
        let mut rx = h.broadcaster.subscribe(&Channel::Board(board_id.clone()));

        h.mutator
            .delete_card(
                &owner,
                &DeleteCard {
                    board_id: board_id.clone(),
                    card_id: p1.clone(),
                },
            )
            .await
            .unwrap();

        assert_eq!(
            drain(&mut rx),
            vec![ChangeMessage::DeleteCard {
                actor_id: "owner".to_string(),
                board_id: board_id.clone(),
                list_id: list,
                card_id: p1,
                deleted_position: 1,
            }]
        );
        let view = h.repos.boards.load_view(&board_id, "owner").await.unwrap();
        assert!(view.is_dense());
    }

    #[tokio::test]
    async fn test_attachment_round_trip_publishes_to_card_and_board() {
        let h = harness().await;
        let owner = user("owner");
        let board_id = new_board(&h, &owner).await;
        let list = new_list(&h, &owner, &board_id, "L").await;
        let card = new_card(&h, &owner, &board_id, &list, "C").await;
        let mut board_rx = h.broadcaster.subscribe(&Channel::Board(board_id.clone()));
        let mut card_rx = h.broadcaster.subscribe(&Channel::Card(card.clone()));

        let data = base64::engine::general_purpose::STANDARD.encode(b"fake png bytes");
        let response = h
            .mutator
            .add_attachment(
                &owner,
                &AddAttachment {
                    board_id: board_id.clone(),
                    card_id: card.clone(),
                    name: "my shot.png".to_string(),
                    data_base64: data,
                },
            )
            .await
            .unwrap();
        assert_eq!(response.message, "Attachment successfully uploaded!");

        let detail = h.repos.cards.load_detail(&card).await.unwrap();
        assert_eq!(detail.attachments.len(), 1);
        assert!(detail.attachments[0].url.ends_with("/my%20shot.png"));
        assert_eq!(detail.activities[0].description, "attached my shot.png to this card");
        assert_eq!(drain(&mut board_rx).len(), 1);
        assert_eq!(drain(&mut card_rx).len(), 1);

        h.mutator
            .delete_attachment(
                &owner,
                &DeleteAttachment {
                    board_id: board_id.clone(),
                    attachment_id: response.id.unwrap(),
                },
            )
            .await
            .unwrap();
        match drain(&mut card_rx).as_slice() {
            [ChangeMessage::DeleteAttachment { latest, .. }] => assert!(latest.is_none()),
            other => panic!("unexpected broadcast {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_attachment_type_and_size_checked() {
        let h = harness().await;
        let owner = user("owner");
        let board_id = new_board(&h, &owner).await;
        let list = new_list(&h, &owner, &board_id, "L").await;
        let card = new_card(&h, &owner, &board_id, &list, "C").await;
        let engine = base64::engine::general_purpose::STANDARD;

        let wrong_type = h
            .mutator
            .add_attachment(
                &owner,
                &AddAttachment {
                    board_id: board_id.clone(),
                    card_id: card.clone(),
                    name: "notes.txt".to_string(),
                    data_base64: engine.encode(b"hello"),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(wrong_type, DomainError::Validation(_)));

        let too_big = h
            .mutator
            .add_attachment(
                &owner,
                &AddAttachment {
                    board_id,
                    card_id: card,
                    name: "big.jpg".to_string(),
                    data_base64: engine.encode(vec![0u8; 2048]),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(too_big, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn test_description_goes_to_card_channel() {
        let h = harness().await;
        let owner = user("owner");
        let board_id = new_board(&h, &owner).await;
        let list = new_list(&h, &owner, &board_id, "L").await;
        let card = new_card(&h, &owner, &board_id, &list, "C").await;
        let mut card_rx = h.broadcaster.subscribe(&Channel::Card(card.clone()));

        h.mutator
            .update_description(
                &owner,
                &UpdateDescription {
                    board_id,
                    card_id: card.clone(),
                    description: "details".to_string(),
                },
            )
            .await
            .unwrap();

        match drain(&mut card_rx).as_slice() {
            [ChangeMessage::UpdateCardDescription {
                description,
                activity,
                ..
            }] => {
                assert_eq!(description, "details");
                assert_eq!(activity.user_name, "OWNER");
            }
            other => panic!("unexpected broadcast {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invitation_reaches_requestee_and_grants_membership() {
        let h = harness().await;
        let owner = user("owner");
        let guest = user("guest");
        h.repos.users.upsert(&owner).await.unwrap();
        h.repos.users.upsert(&guest).await.unwrap();
        let board_id = new_board(&h, &owner).await;
        let mut guest_rx = h.broadcaster.subscribe(&Channel::User("guest".to_string()));

        let missing = h
            .mutator
            .invite(
                &owner,
                &InviteUser {
                    board_id: board_id.clone(),
                    email: "nobody@example.com".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(missing, DomainError::not_found("User does not exist"));

        let response = h
            .mutator
            .invite(
                &owner,
                &InviteUser {
                    board_id: board_id.clone(),
                    email: "GUEST@example.com".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(response.message, "Request successfully sent!");
        assert_eq!(drain(&mut guest_rx).len(), 1);

        h.mutator
            .accept_invitation(&guest, &response.id.unwrap())
            .await
            .unwrap();
        assert!(h.repos.boards.is_member(&board_id, "guest").await.unwrap());
    }

    #[test]
    fn test_asset_url_escapes_spaces() {
        assert_eq!(
            asset_url("cardId/c1/u1/my file.png"),
            "/assets/cardId/c1/u1/my%20file.png"
        );
    }
}
