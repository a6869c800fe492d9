//! Application State Store
//!
//! Uses Leptos reactive_stores for field-level reactivity. The board session
//! only exists while a board page is mounted.

use kanban_core::{Board, BoardSession, Invitation, User};
use leptos::prelude::*;
use reactive_stores::Store;

#[derive(Debug, Default, Store)]
pub struct UiState {
    /// Who the server says we are
    pub user: Option<User>,
    /// Boards the user belongs to, for the home page
    pub boards: Vec<Board>,
    /// Pending invitations shown on the home page
    pub invitations: Vec<Invitation>,
    /// State of the mounted board page
    pub session: Option<BoardSession>,
    /// Last error worth showing
    pub notice: Option<String>,
}

pub type UiStore = Store<UiState>;

/// Get the store from context
pub fn use_ui_store() -> UiStore {
    expect_context::<UiStore>()
}

// ========================
// Store Helper Functions
// ========================

/// Read from the board session, tracking the read
pub fn read_session<R>(store: &UiStore, f: impl FnOnce(&BoardSession) -> R) -> Option<R> {
    store.session().read().as_ref().map(f)
}

/// Mutate the board session and notify readers
pub fn with_session<R>(store: &UiStore, f: impl FnOnce(&mut BoardSession) -> R) -> Option<R> {
    store.session().write().as_mut().map(f)
}

pub fn current_user_id(store: &UiStore) -> Option<String> {
    store.user().read_untracked().as_ref().map(|u| u.id.clone())
}

pub fn show_notice(store: &UiStore, message: impl Into<String>) {
    let message = message.into();
    web_sys::console::warn_1(&format!("[APP] {message}").into());
    store.notice().set(Some(message));
}
