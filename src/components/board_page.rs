//! Board Page Component
//!
//! Owns the board session for as long as it is mounted: loads the board,
//! opens the socket, and renders the lists in position order.

use kanban_core::command::{AddList, InviteUser};
use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::commands;
use crate::components::{CardDetail, DeleteConfirmButton, InvitationInbox, ListColumn, NameForm};
use crate::context::{use_app_context, BoardContext};
use crate::store::{read_session, show_notice, use_ui_store, with_session, UiStateStoreFields};
use crate::sync::load_board;

#[component]
pub fn BoardPage(board_id: String) -> impl IntoView {
    let store = use_ui_store();
    let ctx = use_app_context();
    let board = BoardContext {
        board_id: board_id.clone(),
        socket: StoredValue::new_local(None),
    };
    provide_context(board.clone());

    {
        let board = board.clone();
        Effect::new(move |_| {
            let _ = ctx.reload_trigger.get();
            spawn_local(load_board(store, ctx, board.clone()));
        });
    }

    {
        let socket = board.socket;
        on_cleanup(move || {
            socket.set_value(None);
            store.session().set(None);
        });
    }

    let loaded = move || read_session(&store, |_| ()).is_some();
    let board_name = move || read_session(&store, |s| s.view.board.name.clone()).unwrap_or_default();
    let is_member = move || read_session(&store, |s| s.view.is_member).unwrap_or(false);
    let list_ids = move || {
        read_session(&store, |s| {
            s.view
                .lists
                .iter()
                .map(|l| l.list.id.clone())
                .collect::<Vec<_>>()
        })
        .unwrap_or_default()
    };
    let invitations =
        Signal::derive(move || read_session(&store, |s| s.invitations.clone()).unwrap_or_default());
    let has_card_open = move || read_session(&store, |s| s.card_detail.is_some()).unwrap_or(false);

    let rename = {
        let board_id = board_id.clone();
        move |name: String| {
            let board_id = board_id.clone();
            spawn_local(async move {
                match commands::rename_board(&board_id, &name).await {
                    Ok(response) if response.ok => ctx.reload(),
                    Ok(response) => show_notice(&store, response.message),
                    Err(e) => show_notice(&store, e),
                }
            });
        }
    };

    let add_list = {
        let board_id = board_id.clone();
        move |name: String| {
            let args = AddList {
                board_id: board_id.clone(),
                name,
            };
            spawn_local(async move {
                match commands::add_list(&args).await {
                    Ok(response) if response.ok => ctx.reload(),
                    Ok(response) => show_notice(&store, response.message),
                    Err(e) => show_notice(&store, e),
                }
            });
        }
    };

    let invite = {
        let board_id = board_id.clone();
        move |email: String| {
            let args = InviteUser {
                board_id: board_id.clone(),
                email,
            };
            spawn_local(async move {
                match commands::invite_user(&args).await {
                    Ok(response) => show_notice(&store, response.message),
                    Err(e) => show_notice(&store, e),
                }
            });
        }
    };

    let reindex = {
        let board_id = board_id.clone();
        move |_: web_sys::MouseEvent| {
            let board_id = board_id.clone();
            spawn_local(async move {
                match commands::reindex_board(&board_id).await {
                    Ok(response) if response.ok => ctx.reload(),
                    Ok(response) => show_notice(&store, response.message),
                    Err(e) => show_notice(&store, e),
                }
            });
        }
    };

    let delete_board = {
        let board_id = board_id.clone();
        move |_: ()| {
            let board_id = board_id.clone();
            spawn_local(async move {
                match commands::delete_board(&board_id).await {
                    Ok(response) if response.ok => go_home(),
                    Ok(response) => show_notice(&store, response.message),
                    Err(e) => show_notice(&store, e),
                }
            });
        }
    };

    let on_invitation = move |(invitation_id, accepted): (String, bool)| {
        with_session(&store, |s| s.remove_invitation(&invitation_id));
        if accepted {
            ctx.reload();
        }
    };

    view! {
        <Show when=loaded fallback=|| view! { <p class="loading">"Loading board..."</p> }>
            <header class="board-header">
                <a class="home-link" href="?">"← Boards"</a>
                <h1 class="board-name">{board_name}</h1>
                {
                    let rename = rename.clone();
                    let invite = invite.clone();
                    let reindex = reindex.clone();
                    let delete_board = delete_board.clone();
                    view! {
                <Show when=is_member>
                    <NameForm
                        class="rename-board-form"
                        placeholder="Rename board..."
                        button_label="Rename"
                        on_submit=rename.clone()
                    />
                    <NameForm
                        class="invite-form"
                        placeholder="Invite by email..."
                        button_label="Invite"
                        on_submit=invite.clone()
                    />
                    <button class="reindex-btn" title="Repair list and card order" on:click=reindex.clone()>
                        "Repair order"
                    </button>
                    <DeleteConfirmButton button_class="delete-board-btn" on_confirm=delete_board.clone() />
                </Show>
                    }
                }
            </header>
            <InvitationInbox invitations=invitations on_resolved=on_invitation />
            <div class="board-lists">
                <For each=list_ids key=|id| id.clone() let:list_id>
                    <ListColumn list_id=list_id />
                </For>
                {
                    let add_list = add_list.clone();
                    view! {
                <Show when=is_member>
                    <NameForm
                        class="add-list-form"
                        placeholder="Add a list..."
                        button_label="Add list"
                        on_submit=add_list.clone()
                    />
                </Show>
                    }
                }
            </div>
            <Show when=has_card_open>
                <CardDetail />
            </Show>
        </Show>
    }
}

fn go_home() {
    if let Some(window) = web_sys::window() {
        let _ = window.location().set_search("");
    }
}
