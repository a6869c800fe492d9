//! Invitation Inbox Component

use kanban_core::Invitation;
use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::commands;
use crate::store::{show_notice, use_ui_store};

/// Pending invitations with accept and decline buttons. `on_resolved` gets
/// the invitation id and whether it was accepted, once the server agreed.
#[component]
pub fn InvitationInbox(
    #[prop(into)] invitations: Signal<Vec<Invitation>>,
    #[prop(into)] on_resolved: Callback<(String, bool)>,
) -> impl IntoView {
    let store = use_ui_store();

    let respond = move |invitation_id: String, accept: bool| {
        spawn_local(async move {
            let result = if accept {
                commands::accept_invitation(&invitation_id).await
            } else {
                commands::decline_invitation(&invitation_id).await
            };
            match result {
                Ok(response) if response.ok => on_resolved.run((invitation_id, accept)),
                Ok(response) => show_notice(&store, response.message),
                Err(e) => show_notice(&store, e),
            }
        });
    };

    view! {
        <Show when=move || !invitations.get().is_empty()>
            <section class="invitation-inbox">
                <h3>"Invitations"</h3>
                <For
                    each=move || invitations.get()
                    key=|inv| inv.id.clone()
                    let:inv
                >
                    {
                        let accept_id = inv.id.clone();
                        let decline_id = inv.id.clone();
                        let from = inv
                            .requester_name
                            .clone()
                            .unwrap_or_else(|| inv.requester_id.clone());
                        view! {
                            <div class="invitation-row">
                                <span class="invitation-text">
                                    {from} " invited you to " <strong>{inv.board_name.clone()}</strong>
                                </span>
                                <button
                                    class="accept-btn"
                                    on:click=move |_| respond(accept_id.clone(), true)
                                >
                                    "Accept"
                                </button>
                                <button
                                    class="decline-btn"
                                    on:click=move |_| respond(decline_id.clone(), false)
                                >
                                    "Decline"
                                </button>
                            </div>
                        }
                    }
                </For>
            </section>
        </Show>
    }
}
