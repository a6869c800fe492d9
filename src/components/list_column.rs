//! List Column Component
//!
//! One list: a draggable header, its cards in position order, and an
//! add-card form. An empty list renders a drop zone instead of cards.

use kanban_core::command::{AddCard, DeleteList, RenameList};
use kanban_core::{Card, DragSubject, HoverTarget};
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_dragdrop::{make_on_hover, make_on_mousedown};

use crate::commands;
use crate::components::{CardTile, DeleteConfirmButton, NameForm};
use crate::context::{use_app_context, use_board_context};
use crate::store::{read_session, show_notice, use_ui_store};

#[component]
pub fn ListColumn(list_id: String) -> impl IntoView {
    let store = use_ui_store();
    let ctx = use_app_context();
    let board = use_board_context();
    let dnd = ctx.dnd;
    let (renaming, set_renaming) = signal(false);

    let name = {
        let list_id = list_id.clone();
        move || {
            read_session(&store, |s| {
                s.view
                    .lists
                    .iter()
                    .find(|l| l.list.id == list_id)
                    .map(|l| l.list.name.clone())
            })
            .flatten()
            .unwrap_or_default()
        }
    };
    let cards = {
        let list_id = list_id.clone();
        move || -> Vec<Card> {
            read_session(&store, |s| {
                s.view
                    .lists
                    .iter()
                    .find(|l| l.list.id == list_id)
                    .map(|l| l.cards.clone())
            })
            .flatten()
            .unwrap_or_default()
        }
    };
    let is_empty = {
        let cards = cards.clone();
        move || cards().is_empty()
    };
    let is_member = move || read_session(&store, |s| s.view.is_member).unwrap_or(false);
    let is_dragged = {
        let subject = DragSubject::List(list_id.clone());
        move || dnd.dragging_read.with(|d| d.as_ref() == Some(&subject))
    };

    let on_mousedown = make_on_mousedown(dnd, DragSubject::List(list_id.clone()));
    let on_hover = {
        let list_id = list_id.clone();
        make_on_hover(dnd, move |_| HoverTarget::List(list_id.clone()))
    };
    let on_empty_hover = {
        let list_id = list_id.clone();
        make_on_hover(dnd, move |_| HoverTarget::EmptyList(list_id.clone()))
    };

    let rename = {
        let board_id = board.board_id.clone();
        let list_id = list_id.clone();
        move |name: String| {
            set_renaming.set(false);
            let args = RenameList {
                board_id: board_id.clone(),
                list_id: list_id.clone(),
                name,
            };
            spawn_local(async move {
                match commands::rename_list(&args).await {
                    Ok(response) if response.ok => ctx.reload(),
                    Ok(response) => show_notice(&store, response.message),
                    Err(e) => show_notice(&store, e),
                }
            });
        }
    };

    let delete = {
        let args = DeleteList {
            board_id: board.board_id.clone(),
            list_id: list_id.clone(),
        };
        move |_: ()| {
            let args = args.clone();
            spawn_local(async move {
                match commands::delete_list(&args).await {
                    Ok(response) if response.ok => ctx.reload(),
                    Ok(response) => show_notice(&store, response.message),
                    Err(e) => show_notice(&store, e),
                }
            });
        }
    };

    let add_card = {
        let board_id = board.board_id.clone();
        let list_id = list_id.clone();
        move |name: String| {
            let args = AddCard {
                board_id: board_id.clone(),
                list_id: list_id.clone(),
                name,
                description: None,
            };
            spawn_local(async move {
                match commands::add_card(&args).await {
                    Ok(response) if response.ok => ctx.reload(),
                    Ok(response) => show_notice(&store, response.message),
                    Err(e) => show_notice(&store, e),
                }
            });
        }
    };

    view! {
        <section
            class=move || if is_dragged() { "list-column dragging" } else { "list-column" }
            on:mousemove=on_hover
        >
            <header class="list-header" on:mousedown=on_mousedown>
                <Show
                    when=move || renaming.get()
                    fallback={
                        let name = name.clone();
                        move || {
                            let name = name.clone();
                            view! {
                                <h2
                                    class="list-name"
                                    on:dblclick=move |_| {
                                        if is_member() {
                                            set_renaming.set(true);
                                        }
                                    }
                                >
                                    {name}
                                </h2>
                            }
                        }
                    }
                >
                    <NameForm
                        class="rename-list-form"
                        placeholder="List name..."
                        button_label="Save"
                        on_submit=rename.clone()
                    />
                </Show>
                <Show when=is_member>
                    <DeleteConfirmButton button_class="delete-btn" on_confirm=delete.clone() />
                </Show>
            </header>
            <div class="list-cards">
                <For
                    each=cards.clone()
                    key=|card| {
                        (
                            card.id.clone(),
                            card.name.clone(),
                            card.attachment.as_ref().map(|a| a.id.clone()),
                        )
                    }
                    let:card
                >
                    <CardTile card=card />
                </For>
                <Show when=is_empty.clone()>
                    <div class="empty-list-zone" on:mousemove=on_empty_hover.clone()>
                        "Drop cards here"
                    </div>
                </Show>
            </div>
            <Show when=is_member>
                <NameForm
                    class="add-card-form"
                    placeholder="Add a card..."
                    button_label="Add"
                    on_submit=add_card.clone()
                />
            </Show>
        </section>
    }
}
