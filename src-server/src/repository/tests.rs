//! Repository Integration Tests
//!
//! Run against an in-memory SQLite database.

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use kanban_core::{is_dense, CardMoveValues, CommandError};

    use crate::domain::{new_id, now_millis, Activity, Attachment, Board, Card, List, User, Visibility};
    use crate::repository::{
        init_db, BoardRepository, CardDetailOperations, CardPositioningOperations,
        CardRepository, InvitationRepository, ListPositioningOperations, ListRepository,
        Repository, UserRepository,
    };

    struct Repos {
        boards: BoardRepository,
        lists: ListRepository,
        cards: CardRepository,
        invitations: InvitationRepository,
        users: UserRepository,
    }

    async fn setup_test_db() -> Repos {
        let db_path = PathBuf::from(":memory:");
        let conn = init_db(&db_path).await.expect("Failed to init test DB");
        Repos {
            boards: BoardRepository::new(conn.clone()),
            lists: ListRepository::new(conn.clone()),
            cards: CardRepository::new(conn.clone()),
            invitations: InvitationRepository::new(conn.clone()),
            users: UserRepository::new(conn),
        }
    }

    async fn board(repos: &Repos, owner: &str) -> Board {
        repos
            .boards
            .create(&Board {
                id: new_id(),
                name: "Roadmap".to_string(),
                description: None,
                visibility: Visibility::Private,
                created_by: owner.to_string(),
                created_at: now_millis(),
            })
            .await
            .unwrap()
    }

    async fn list(repos: &Repos, board_id: &str, name: &str) -> List {
        repos
            .lists
            .create(&List {
                id: new_id(),
                name: name.to_string(),
                board_id: board_id.to_string(),
                position: -1,
                created_by: "owner".to_string(),
                created_at: now_millis(),
            })
            .await
            .unwrap()
    }

    async fn card(repos: &Repos, list_id: &str, name: &str) -> Card {
        repos
            .cards
            .create(&Card {
                id: new_id(),
                name: name.to_string(),
                description: None,
                list_id: list_id.to_string(),
                position: -1,
                attachment: None,
            })
            .await
            .unwrap()
    }

    fn activity(card_id: &str, text: &str) -> Activity {
        Activity {
            id: new_id(),
            card_id: card_id.to_string(),
            user_id: "owner".to_string(),
            user_name: "Owner".to_string(),
            description: text.to_string(),
            created_at: now_millis(),
        }
    }

    /// List names in board order
    async fn list_names(repos: &Repos, board_id: &str) -> Vec<String> {
        let view = repos.boards.load_view(board_id, "owner").await.unwrap();
        view.lists.iter().map(|l| l.list.name.clone()).collect()
    }

    async fn card_names(repos: &Repos, board_id: &str, list_id: &str) -> Vec<String> {
        let view = repos.boards.load_view(board_id, "owner").await.unwrap();
        let idx = view.list_index(list_id).unwrap();
        view.lists[idx].cards.iter().map(|c| c.name.clone()).collect()
    }

    fn move_values(card: &Card, list_id: &str, to: i32) -> CardMoveValues {
        CardMoveValues {
            card_id: card.id.clone(),
            list_id: list_id.to_string(),
            final_list_index: 0,
            final_card_index: to,
        }
    }

    #[tokio::test]
    async fn test_create_board_makes_owner_member() {
        let repos = setup_test_db().await;
        let b = board(&repos, "owner").await;

        assert!(repos.boards.is_member(&b.id, "owner").await.unwrap());
        assert!(!repos.boards.is_member(&b.id, "stranger").await.unwrap());
        assert!(!repos.boards.can_read(&b.id, "stranger").await.unwrap());

        let mine = repos.boards.list_for_member("owner").await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, b.id);
    }

    #[tokio::test]
    async fn test_public_board_is_readable_by_anyone() {
        let repos = setup_test_db().await;
        let mut b = board(&repos, "owner").await;
        b.visibility = Visibility::Public;
        repos.boards.update(&b).await.unwrap();

        assert!(repos.boards.can_read(&b.id, "stranger").await.unwrap());
        let view = repos.boards.load_view(&b.id, "stranger").await.unwrap();
        assert!(!view.is_member);
    }

    #[tokio::test]
    async fn test_lists_append_at_end() {
        let repos = setup_test_db().await;
        let b = board(&repos, "owner").await;

        let a = list(&repos, &b.id, "A").await;
        let c = list(&repos, &b.id, "B").await;
        assert_eq!(a.position, 0);
        assert_eq!(c.position, 1);
        let d = list(&repos, &b.id, "C").await;
        assert_eq!(d.position, 2);
    }

    #[tokio::test]
    async fn test_move_list_forward_and_back() {
        let repos = setup_test_db().await;
        let b = board(&repos, "owner").await;
        let a = list(&repos, &b.id, "A").await;
        list(&repos, &b.id, "B").await;
        list(&repos, &b.id, "C").await;

        assert!(repos.lists.move_list(&b.id, &a.id, 0, 2).await.unwrap());
        assert_eq!(list_names(&repos, &b.id).await, ["B", "C", "A"]);

        assert!(repos.lists.move_list(&b.id, &a.id, 2, 0).await.unwrap());
        assert_eq!(list_names(&repos, &b.id).await, ["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_move_list_to_same_index_writes_nothing() {
        let repos = setup_test_db().await;
        let b = board(&repos, "owner").await;
        let a = list(&repos, &b.id, "A").await;

        assert!(!repos.lists.move_list(&b.id, &a.id, 0, 0).await.unwrap());
    }

    #[tokio::test]
    async fn test_move_list_out_of_bounds_rejected() {
        let repos = setup_test_db().await;
        let b = board(&repos, "owner").await;
        let a = list(&repos, &b.id, "A").await;
        list(&repos, &b.id, "B").await;

        let err = repos.lists.move_list(&b.id, &a.id, 0, 2).await.unwrap_err();
        assert!(matches!(err, CommandError::Validation(_)));
        assert_eq!(list_names(&repos, &b.id).await, ["A", "B"]);
    }

    #[tokio::test]
    async fn test_move_list_from_other_board_rejected() {
        let repos = setup_test_db().await;
        let b1 = board(&repos, "owner").await;
        let b2 = board(&repos, "owner").await;
        let foreign = list(&repos, &b2.id, "X").await;
        list(&repos, &b1.id, "A").await;

        let err = repos
            .lists
            .move_list(&b1.id, &foreign.id, 0, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Validation(_)));
    }

    #[tokio::test]
    async fn test_delete_list_compacts_board() {
        let repos = setup_test_db().await;
        let b = board(&repos, "owner").await;
        list(&repos, &b.id, "A").await;
        let mid = list(&repos, &b.id, "B").await;
        list(&repos, &b.id, "C").await;
        let gone = card(&repos, &mid.id, "gone").await;
        let attachment = Attachment {
            id: new_id(),
            card_id: gone.id.clone(),
            name: "a.png".to_string(),
            url: "/assets/a.png".to_string(),
            created_at: now_millis(),
        };
        repos
            .cards
            .add_attachment(&attachment, "key/a.png", &activity(&gone.id, "attached"))
            .await
            .unwrap();

        let deleted = repos
            .lists
            .delete_list_and_compact(&b.id, &mid.id)
            .await
            .unwrap();
        assert_eq!(deleted.position, 1);
        assert_eq!(deleted.blob_keys, ["key/a.png"]);

        let view = repos.boards.load_view(&b.id, "owner").await.unwrap();
        assert!(view.is_dense());
        assert_eq!(list_names(&repos, &b.id).await, ["A", "C"]);
        assert_eq!(view.lists.iter().map(|l| l.cards.len()).sum::<usize>(), 0);
    }

    #[tokio::test]
    async fn test_move_card_within_list() {
        let repos = setup_test_db().await;
        let b = board(&repos, "owner").await;
        let l = list(&repos, &b.id, "Todo").await;
        let first = card(&repos, &l.id, "1").await;
        card(&repos, &l.id, "2").await;
        card(&repos, &l.id, "3").await;

        let moved = repos
            .cards
            .move_card(&b.id, &move_values(&first, &l.id, 2), &l.id, 0)
            .await
            .unwrap();
        assert!(moved);
        assert_eq!(card_names(&repos, &b.id, &l.id).await, ["2", "3", "1"]);
    }

    #[tokio::test]
    async fn test_move_card_across_lists() {
        let repos = setup_test_db().await;
        let b = board(&repos, "owner").await;
        let todo = list(&repos, &b.id, "Todo").await;
        let done = list(&repos, &b.id, "Done").await;
        card(&repos, &todo.id, "1").await;
        let second = card(&repos, &todo.id, "2").await;
        card(&repos, &todo.id, "3").await;
        card(&repos, &done.id, "x").await;

        repos
            .cards
            .move_card(&b.id, &move_values(&second, &done.id, 0), &todo.id, 1)
            .await
            .unwrap();

        assert_eq!(card_names(&repos, &b.id, &todo.id).await, ["1", "3"]);
        assert_eq!(card_names(&repos, &b.id, &done.id).await, ["2", "x"]);
        let view = repos.boards.load_view(&b.id, "owner").await.unwrap();
        assert!(view.is_dense());
    }

    #[tokio::test]
    async fn test_move_card_into_empty_list() {
        let repos = setup_test_db().await;
        let b = board(&repos, "owner").await;
        let todo = list(&repos, &b.id, "Todo").await;
        let empty = list(&repos, &b.id, "Empty").await;
        let only = card(&repos, &todo.id, "1").await;

        repos
            .cards
            .move_card(&b.id, &move_values(&only, &empty.id, 0), &todo.id, 0)
            .await
            .unwrap();

        assert!(card_names(&repos, &b.id, &todo.id).await.is_empty());
        assert_eq!(card_names(&repos, &b.id, &empty.id).await, ["1"]);
    }

    #[tokio::test]
    async fn test_move_card_past_end_of_target_rejected() {
        let repos = setup_test_db().await;
        let b = board(&repos, "owner").await;
        let todo = list(&repos, &b.id, "Todo").await;
        let done = list(&repos, &b.id, "Done").await;
        let c = card(&repos, &todo.id, "1").await;

        let err = repos
            .cards
            .move_card(&b.id, &move_values(&c, &done.id, 1), &todo.id, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Validation(_)));
        assert_eq!(card_names(&repos, &b.id, &todo.id).await, ["1"]);
    }

    #[tokio::test]
    async fn test_move_card_from_stale_list_conflicts() {
        let repos = setup_test_db().await;
        let b = board(&repos, "owner").await;
        let todo = list(&repos, &b.id, "Todo").await;
        let done = list(&repos, &b.id, "Done").await;
        let c = card(&repos, &todo.id, "1").await;

        repos
            .cards
            .move_card(&b.id, &move_values(&c, &done.id, 0), &todo.id, 0)
            .await
            .unwrap();
        // Second client still thinks the card is in Todo
        let err = repos
            .cards
            .move_card(&b.id, &move_values(&c, &done.id, 0), &todo.id, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_stale_list_move_breaks_density_until_reindex() {
        let repos = setup_test_db().await;
        let b = board(&repos, "owner").await;
        let a = list(&repos, &b.id, "A").await;
        list(&repos, &b.id, "B").await;
        list(&repos, &b.id, "C").await;

        repos.lists.move_list(&b.id, &a.id, 0, 2).await.unwrap();
        // Issued against the old order, where A was still at 0
        repos.lists.move_list(&b.id, &a.id, 0, 1).await.unwrap();

        let view = repos.boards.load_view(&b.id, "owner").await.unwrap();
        let positions: Vec<i32> = view.lists.iter().map(|l| l.list.position).collect();
        assert!(!is_dense(positions.iter().copied()), "positions {positions:?}");

        repos.boards.reindex(&b.id).await.unwrap();
        let view = repos.boards.load_view(&b.id, "owner").await.unwrap();
        assert!(view.is_dense());
        assert_eq!(view.lists.len(), 3);
        // Three lists, no cards
        assert_eq!(repos.boards.reindex(&b.id).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_stale_card_move_breaks_density_until_reindex() {
        let repos = setup_test_db().await;
        let b = board(&repos, "owner").await;
        let l = list(&repos, &b.id, "Todo").await;
        let first = card(&repos, &l.id, "1").await;
        card(&repos, &l.id, "2").await;
        card(&repos, &l.id, "3").await;

        repos
            .cards
            .move_card(&b.id, &move_values(&first, &l.id, 2), &l.id, 0)
            .await
            .unwrap();
        repos
            .cards
            .move_card(&b.id, &move_values(&first, &l.id, 1), &l.id, 0)
            .await
            .unwrap();

        let view = repos.boards.load_view(&b.id, "owner").await.unwrap();
        assert!(!view.is_dense());

        assert!(repos.boards.reindex(&b.id).await.unwrap() > 0);
        let view = repos.boards.load_view(&b.id, "owner").await.unwrap();
        assert!(view.is_dense());
        assert_eq!(card_names(&repos, &b.id, &l.id).await.len(), 3);
    }

    #[tokio::test]
    async fn test_delete_card_compacts_list() {
        let repos = setup_test_db().await;
        let b = board(&repos, "owner").await;
        let l = list(&repos, &b.id, "Todo").await;
        let first = card(&repos, &l.id, "1").await;
        card(&repos, &l.id, "2").await;

        let deleted = repos
            .cards
            .delete_card_and_compact(&b.id, &first.id)
            .await
            .unwrap();
        assert_eq!(deleted.list_id, l.id);
        assert_eq!(deleted.position, 0);

        let view = repos.boards.load_view(&b.id, "owner").await.unwrap();
        assert!(view.is_dense());
        assert_eq!(card_names(&repos, &b.id, &l.id).await, ["2"]);
    }

    #[tokio::test]
    async fn test_description_change_logs_activity() {
        let repos = setup_test_db().await;
        let b = board(&repos, "owner").await;
        let l = list(&repos, &b.id, "Todo").await;
        let c = card(&repos, &l.id, "1").await;

        let updated = repos
            .cards
            .update_description(&c.id, "new text", &activity(&c.id, "updated the description"))
            .await
            .unwrap();
        assert_eq!(updated.description.as_deref(), Some("new text"));

        let detail = repos.cards.load_detail(&c.id).await.unwrap();
        assert_eq!(detail.board_id, b.id);
        assert_eq!(detail.activities.len(), 1);
        assert_eq!(detail.activities[0].description, "updated the description");
    }

    #[tokio::test]
    async fn test_attachments_track_latest() {
        let repos = setup_test_db().await;
        let b = board(&repos, "owner").await;
        let l = list(&repos, &b.id, "Todo").await;
        let c = card(&repos, &l.id, "1").await;

        let mut ids = Vec::new();
        for (i, name) in ["a.png", "b.png"].iter().enumerate() {
            let attachment = Attachment {
                id: new_id(),
                card_id: c.id.clone(),
                name: name.to_string(),
                url: format!("/assets/{name}"),
                created_at: now_millis() + i as i64,
            };
            repos
                .cards
                .add_attachment(&attachment, &format!("key/{name}"), &activity(&c.id, "attached"))
                .await
                .unwrap();
            ids.push(attachment.id);
        }

        let view = repos.boards.load_view(&b.id, "owner").await.unwrap();
        let shown = view.card(&c.id).unwrap().attachment.clone().unwrap();
        assert_eq!(shown.name, "b.png");
        assert_eq!(repos.cards.blob_board("key/a.png").await.unwrap(), Some(b.id.clone()));

        let removed = repos.cards.delete_attachment(&ids[1]).await.unwrap();
        assert_eq!(removed.blob_key, "key/b.png");
        assert_eq!(removed.list_id, l.id);
        assert_eq!(removed.latest.map(|a| a.name), Some("a.png".to_string()));

        let detail = repos.cards.load_detail(&c.id).await.unwrap();
        assert_eq!(detail.attachments.len(), 1);
        assert_eq!(detail.activities.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_board_returns_blob_keys() {
        let repos = setup_test_db().await;
        let b = board(&repos, "owner").await;
        let l = list(&repos, &b.id, "Todo").await;
        let c = card(&repos, &l.id, "1").await;
        let attachment = Attachment {
            id: new_id(),
            card_id: c.id.clone(),
            name: "a.png".to_string(),
            url: "/assets/a.png".to_string(),
            created_at: now_millis(),
        };
        repos
            .cards
            .add_attachment(&attachment, "key/a.png", &activity(&c.id, "attached"))
            .await
            .unwrap();

        let keys = repos.boards.delete_with_blobs(&b.id).await.unwrap();
        assert_eq!(keys, ["key/a.png"]);
        assert!(repos.boards.find_by_id(&b.id).await.unwrap().is_none());
        assert!(repos.cards.card_location(&c.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invitation_flow() {
        let repos = setup_test_db().await;
        repos
            .users
            .upsert(&User {
                id: "owner".to_string(),
                name: Some("Owner".to_string()),
                email: Some("owner@example.com".to_string()),
            })
            .await
            .unwrap();
        let b = board(&repos, "owner").await;

        let invitation = repos
            .invitations
            .create(&new_id(), &b.id, "owner", "guest")
            .await
            .unwrap();
        assert_eq!(invitation.board_name, "Roadmap");
        assert_eq!(invitation.requester_name.as_deref(), Some("Owner"));

        let again = repos
            .invitations
            .create(&new_id(), &b.id, "owner", "guest")
            .await
            .unwrap_err();
        assert_eq!(
            again,
            CommandError::conflict("User has already been invited to this board!")
        );

        let err = repos
            .invitations
            .accept(&invitation.id, "someone-else")
            .await
            .unwrap_err();
        assert_eq!(err, CommandError::NotAuthorized);

        assert_eq!(repos.invitations.list_for_user("guest").await.unwrap().len(), 1);
        repos.invitations.accept(&invitation.id, "guest").await.unwrap();
        assert!(repos.boards.is_member(&b.id, "guest").await.unwrap());
        assert!(repos.invitations.list_for_user("guest").await.unwrap().is_empty());

        let member = repos
            .invitations
            .create(&new_id(), &b.id, "owner", "guest")
            .await
            .unwrap_err();
        assert_eq!(
            member,
            CommandError::conflict("User is already a member of this board!")
        );
    }

    #[tokio::test]
    async fn test_user_upsert_keeps_known_fields() {
        let repos = setup_test_db().await;
        repos
            .users
            .upsert(&User {
                id: "u1".to_string(),
                name: Some("Ada".to_string()),
                email: Some("Ada@Example.com".to_string()),
            })
            .await
            .unwrap();
        let refreshed = repos
            .users
            .upsert(&User {
                id: "u1".to_string(),
                name: None,
                email: None,
            })
            .await
            .unwrap();
        assert_eq!(refreshed.name.as_deref(), Some("Ada"));

        let found = repos.users.find_by_email("ada@example.com").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some("u1".to_string()));
    }
}
