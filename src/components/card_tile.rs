//! Card Tile Component

use kanban_core::command::DeleteCard;
use kanban_core::{Card, DragSubject, HoverTarget};
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_dragdrop::{make_on_hover, make_on_mousedown, pointer_in_lower_half};

use crate::commands;
use crate::components::DeleteConfirmButton;
use crate::context::{use_app_context, use_board_context};
use crate::store::{read_session, show_notice, use_ui_store, with_session};

/// A card inside a list. Click opens the detail dialog; press and move drags.
#[component]
pub fn CardTile(card: Card) -> impl IntoView {
    let store = use_ui_store();
    let ctx = use_app_context();
    let board = use_board_context();
    let dnd = ctx.dnd;

    let card_id = card.id.clone();
    let is_member = move || read_session(&store, |s| s.view.is_member).unwrap_or(false);
    let is_dragged = {
        let subject = DragSubject::Card(card_id.clone());
        move || dnd.dragging_read.with(|d| d.as_ref() == Some(&subject))
    };

    let on_mousedown = make_on_mousedown(dnd, DragSubject::Card(card_id.clone()));
    let on_hover = {
        let card_id = card_id.clone();
        make_on_hover(dnd, move |ev| HoverTarget::Card {
            card_id: card_id.clone(),
            below: pointer_in_lower_half(ev),
        })
    };

    let open = {
        let card_id = card_id.clone();
        let board = board.clone();
        move |_: web_sys::MouseEvent| {
            // The click that ends a drag is not an open
            if dnd.drag_just_ended_read.get_untracked() {
                return;
            }
            let card_id = card_id.clone();
            let board = board.clone();
            spawn_local(async move {
                match commands::get_card(&card_id).await {
                    Ok(detail) => {
                        let previous = with_session(&store, |s| {
                            let previous = s.close_card();
                            s.open_card(detail);
                            previous
                        })
                        .flatten();
                        if let Some(previous) = previous {
                            board.unsubscribe(&previous);
                        }
                        board.subscribe(kanban_core::Channel::Card(card_id));
                    }
                    Err(e) => show_notice(&store, e),
                }
            });
        }
    };

    let delete = {
        let args = DeleteCard {
            board_id: board.board_id.clone(),
            card_id: card_id.clone(),
        };
        move |_: ()| {
            let args = args.clone();
            spawn_local(async move {
                match commands::delete_card(&args).await {
                    Ok(response) if response.ok => ctx.reload(),
                    Ok(response) => show_notice(&store, response.message),
                    Err(e) => show_notice(&store, e),
                }
            });
        }
    };

    let thumbnail = card.attachment.clone().map(|attachment| {
        view! { <img class="card-thumbnail" src=attachment.url alt=attachment.name /> }
    });
    let has_description = card.description.as_deref().is_some_and(|d| !d.is_empty());

    view! {
        <div
            class=move || if is_dragged() { "card-tile dragging" } else { "card-tile" }
            on:mousedown=on_mousedown
            on:mousemove=on_hover
            on:click=open
        >
            {thumbnail}
            <span class="card-name">{card.name.clone()}</span>
            {has_description.then(|| view! { <span class="card-has-description" title="Has description">"≡"</span> })}
            <Show when=is_member>
                <DeleteConfirmButton button_class="delete-btn" on_confirm=delete.clone() />
            </Show>
        </div>
    }
}
