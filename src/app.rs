//! Kanban Frontend App
//!
//! Resolves the current user, then shows either the board named by the
//! `?board=` query or the boards home page.

use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_dragdrop::create_dnd_signals;
use reactive_stores::Store;

use crate::commands;
use crate::components::{BoardPage, BoardsHome};
use crate::context::AppContext;
use crate::store::{show_notice, UiState, UiStateStoreFields, UiStore};
use crate::sync::bind_drag_gestures;

#[component]
pub fn App() -> impl IntoView {
    let store: UiStore = Store::new(UiState::default());
    provide_context(store);

    let reload_trigger = signal(0u32);
    let ctx = AppContext::new(reload_trigger, create_dnd_signals());
    provide_context(ctx);
    bind_drag_gestures(store, ctx);

    spawn_local(async move {
        match commands::current_user().await {
            Ok(user) => {
                web_sys::console::log_1(&format!("[APP] Signed in as {}", user.display_name()).into());
                store.user().set(Some(user));
            }
            Err(e) => show_notice(&store, e),
        }
    });

    let board_id = board_from_query();
    let signed_in = move || store.user().read().is_some();

    view! {
        <div class="app-layout">
            {move || store.notice().get().map(|message| view! {
                <div class="notice" on:click=move |_| store.notice().set(None)>{message}</div>
            })}
            <Show when=signed_in fallback=|| view! { <p class="loading">"Signing in..."</p> }>
                {
                    let board_id = board_id.clone();
                    move || match board_id.clone() {
                        Some(id) => view! { <BoardPage board_id=id /> }.into_any(),
                        None => view! { <BoardsHome /> }.into_any(),
                    }
                }
            </Show>
        </div>
    }
}

/// `?board=<id>` from the page URL
fn board_from_query() -> Option<String> {
    let search = web_sys::window()?.location().search().ok()?;
    search
        .trim_start_matches('?')
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "board")
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}
