//! Board Synchronisation
//!
//! Glue between the board session and the outside world: loading, socket
//! frames, and the drag gesture listeners.

use kanban_core::{
    BoardSession, ChangeMessage, Channel, CommandResponse, DragSubject, HoverTarget, MergeOutcome,
    Resolution, ServerFrame,
};
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_dragdrop::{bind_escape_cancel, bind_global_mouseup, end_drag};

use crate::commands;
use crate::context::{AppContext, BoardContext};
use crate::socket::BoardSocket;
use crate::store::{current_user_id, show_notice, with_session, UiStore, UiStateStoreFields};

/// Fetch the board and everything the page shows alongside it, then make
/// sure the socket is open.
pub async fn load_board(store: UiStore, ctx: AppContext, board: BoardContext) {
    let Some(user_id) = current_user_id(&store) else {
        return;
    };
    let view = match commands::get_board(&board.board_id).await {
        Ok(view) => view,
        Err(e) => {
            show_notice(&store, e);
            return;
        }
    };
    web_sys::console::log_1(
        &format!("[APP] Loaded board {} with {} lists", board.board_id, view.lists.len()).into(),
    );

    {
        let session_field = store.session();
        let mut session = session_field.write();
        match session.as_mut() {
            Some(s) if s.board_id() == board.board_id => s.replace_view(view),
            _ => *session = Some(BoardSession::new(view, user_id)),
        }
    }

    match commands::list_invitations().await {
        Ok(invitations) => {
            with_session(&store, |s| s.set_invitations(invitations));
        }
        Err(e) => show_notice(&store, e),
    }

    let open_card = store
        .session()
        .read_untracked()
        .as_ref()
        .and_then(|s| s.card_detail.as_ref().map(|d| d.card_id().to_string()));
    if let Some(card_id) = open_card {
        match commands::get_card(&card_id).await {
            Ok(detail) => {
                with_session(&store, |s| s.open_card(detail));
            }
            Err(_) => {
                if let Some(channel) = with_session(&store, |s| s.close_card()).flatten() {
                    board.unsubscribe(&channel);
                }
            }
        }
    }

    if board.socket.with_value(Option::is_none) {
        connect_socket(store, ctx, &board);
    }
}

fn connect_socket(store: UiStore, ctx: AppContext, board: &BoardContext) {
    let channels = store
        .session()
        .read_untracked()
        .as_ref()
        .map(BoardSession::channels)
        .unwrap_or_default();

    let on_frame = move |frame: ServerFrame| handle_frame(store, ctx, frame);
    let on_connect = move || {
        with_session(&store, |s| s.reset_subscriptions());
    };
    match BoardSocket::connect(channels, on_frame, on_connect) {
        Ok(socket) => board.socket.set_value(Some(socket)),
        Err(e) => show_notice(&store, format!("Live updates unavailable: {e}")),
    }
}

fn handle_frame(store: UiStore, ctx: AppContext, frame: ServerFrame) {
    match frame {
        ServerFrame::Subscribed { channel } => {
            web_sys::console::log_1(&format!("[SOCKET] subscribed to {channel}").into());
            // Changes published before this point never reached us
            if with_session(&store, |s| s.confirm_subscription(&channel)).unwrap_or(false) {
                ctx.reload();
            }
        }
        ServerFrame::Change { channel, message } => receive_change(store, ctx, &channel, &message),
        ServerFrame::Lagged { channel, skipped } => {
            web_sys::console::warn_1(
                &format!("[SOCKET] missed {skipped} messages on {channel}, reloading").into(),
            );
            ctx.reload();
        }
        ServerFrame::Error { message } => {
            web_sys::console::warn_1(&format!("[SOCKET] {message}").into());
        }
    }
}

fn receive_change(store: UiStore, ctx: AppContext, channel: &Channel, message: &ChangeMessage) {
    let Some((outcome, needs_reload)) =
        with_session(&store, |s| (s.receive(channel, message), s.needs_reload()))
    else {
        return;
    };
    if outcome == MergeOutcome::ReloadRequired || needs_reload {
        ctx.reload();
    }
}

/// Bind the document-level drag listeners once for the whole app, and the
/// effects that feed pointer state into the session's reducer.
pub fn bind_drag_gestures(store: UiStore, ctx: AppContext) {
    let dnd = ctx.dnd;

    Effect::new(move |_| {
        let Some(subject) = dnd.dragging_read.get() else {
            return;
        };
        let started = with_session(&store, |s| s.begin_drag(subject.clone())).unwrap_or(false);
        if started {
            web_sys::console::log_1(&format!("[DND] grabbed {}", subject.id()).into());
        } else {
            end_drag(&dnd);
        }
    });

    Effect::new(move |_| {
        let Some(target) = dnd.drop_target_read.get() else {
            return;
        };
        with_session(&store, |s| s.hover(&target));
    });

    bind_global_mouseup(dnd, move |subject: DragSubject, target: Option<HoverTarget>| {
        let Some((move_id, command)) = with_session(&store, |s| s.drop(target.as_ref())).flatten()
        else {
            web_sys::console::log_1(&format!("[DND] {} dropped in place", subject.id()).into());
            return;
        };
        web_sys::console::log_1(&format!("[DND] {} dropped, sending move {move_id}", subject.id()).into());

        spawn_local(async move {
            let response = commands::apply_move(&command)
                .await
                .unwrap_or_else(|e| CommandResponse {
                    message: e,
                    ok: false,
                    id: None,
                });
            if !response.ok {
                show_notice(&store, response.message.clone());
            }
            let resolution = with_session(&store, |s| s.resolve(move_id, &response));
            if resolution == Some(Resolution::ReloadRequired) {
                ctx.reload();
            }
        });
    });

    bind_escape_cancel(dnd, move |subject: DragSubject| {
        with_session(&store, |s| s.cancel_drag());
        web_sys::console::log_1(&format!("[DND] {} cancelled", subject.id()).into());
    });
}
