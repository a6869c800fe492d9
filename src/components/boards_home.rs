//! Boards Home Component
//!
//! Landing page: the user's boards, a create form and pending invitations.

use kanban_core::command::CreateBoard;
use kanban_core::Visibility;
use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::commands;
use crate::components::{InvitationInbox, NameForm};
use crate::context::use_app_context;
use crate::store::{show_notice, use_ui_store, UiStateStoreFields};

#[component]
pub fn BoardsHome() -> impl IntoView {
    let store = use_ui_store();
    let ctx = use_app_context();
    let (make_public, set_make_public) = signal(false);

    Effect::new(move |_| {
        let _ = ctx.reload_trigger.get();
        spawn_local(async move {
            match commands::list_boards().await {
                Ok(boards) => store.boards().set(boards),
                Err(e) => show_notice(&store, e),
            }
            match commands::list_invitations().await {
                Ok(invitations) => store.invitations().set(invitations),
                Err(e) => show_notice(&store, e),
            }
        });
    });

    let create = move |name: String| {
        let args = CreateBoard {
            name,
            description: None,
            is_public: make_public.get_untracked(),
        };
        spawn_local(async move {
            match commands::create_board(&args).await {
                Ok(response) if response.ok => ctx.reload(),
                Ok(response) => show_notice(&store, response.message),
                Err(e) => show_notice(&store, e),
            }
        });
    };

    let invitations = Signal::derive(move || store.invitations().get());
    let on_resolved = move |(invitation_id, _accepted): (String, bool)| {
        store.invitations().write().retain(|i| i.id != invitation_id);
        ctx.reload();
    };

    view! {
        <main class="boards-home">
            <h1>"Boards"</h1>
            <InvitationInbox invitations=invitations on_resolved=on_resolved />
            <ul class="board-list">
                <For
                    each=move || store.boards().get()
                    key=|board| (board.id.clone(), board.name.clone())
                    let:board
                >
                    <li class="board-link">
                        <a href=format!("?board={}", board.id)>{board.name.clone()}</a>
                        {(board.visibility == Visibility::Public).then(|| view! { <span class="badge">"public"</span> })}
                    </li>
                </For>
            </ul>
            <div class="create-board">
                <NameForm placeholder="New board name..." button_label="Create" on_submit=create />
                <label class="public-toggle">
                    <input
                        type="checkbox"
                        prop:checked=move || make_public.get()
                        on:change=move |_| set_make_public.update(|v| *v = !*v)
                    />
                    "Public"
                </label>
            </div>
        </main>
    }
}
