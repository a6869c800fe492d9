//! Application Context
//!
//! Shared handles provided via Leptos Context API.

use kanban_core::{DragSubject, HoverTarget};
use leptos::prelude::*;
use leptos_dragdrop::DndSignals;

use crate::socket::BoardSocket;

/// App-wide signals provided via context
#[derive(Clone, Copy)]
pub struct AppContext {
    /// Trigger to reload from the server - read
    pub reload_trigger: ReadSignal<u32>,
    /// Trigger to reload from the server - write
    set_reload_trigger: WriteSignal<u32>,
    /// Pointer state of the current drag gesture
    pub dnd: DndSignals<DragSubject, HoverTarget>,
}

impl AppContext {
    pub fn new(
        reload_trigger: (ReadSignal<u32>, WriteSignal<u32>),
        dnd: DndSignals<DragSubject, HoverTarget>,
    ) -> Self {
        Self {
            reload_trigger: reload_trigger.0,
            set_reload_trigger: reload_trigger.1,
            dnd,
        }
    }

    /// Trigger a reload from the server
    pub fn reload(&self) {
        self.set_reload_trigger.update(|v| *v += 1);
    }
}

pub fn use_app_context() -> AppContext {
    expect_context::<AppContext>()
}

/// Handles scoped to the mounted board page
#[derive(Clone)]
pub struct BoardContext {
    pub board_id: String,
    pub socket: StoredValue<Option<BoardSocket>, LocalStorage>,
}

impl BoardContext {
    pub fn subscribe(&self, channel: kanban_core::Channel) {
        self.socket.with_value(|socket| {
            if let Some(socket) = socket {
                socket.subscribe(channel);
            }
        });
    }

    pub fn unsubscribe(&self, channel: &kanban_core::Channel) {
        self.socket.with_value(|socket| {
            if let Some(socket) = socket {
                socket.unsubscribe(channel);
            }
        });
    }
}

pub fn use_board_context() -> BoardContext {
    expect_context::<BoardContext>()
}
