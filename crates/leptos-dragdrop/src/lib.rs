//! Leptos DragDrop Utilities
//!
//! Mouse-event drag-and-drop for Leptos.
//! Uses a movement threshold to tell a click from a drag.
//!
//! The crate only tracks pointer state. `S` is whatever identifies the grabbed
//! element and `T` whatever the pointer is over; the caller decides what a
//! grab, a hover and a drop mean.

use leptos::prelude::*;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;

/// DnD state signals
pub struct DndSignals<S: 'static, T: 'static> {
    pub dragging_read: ReadSignal<Option<S>>,
    pub dragging_write: WriteSignal<Option<S>>,
    pub drop_target_read: ReadSignal<Option<T>>,
    pub drop_target_write: WriteSignal<Option<T>>,
    /// Set for a moment after a drag so the trailing click can be swallowed
    pub drag_just_ended_read: ReadSignal<bool>,
    pub drag_just_ended_write: WriteSignal<bool>,
    /// Grabbed with mousedown but not moved past the threshold yet
    pub pending_read: ReadSignal<Option<S>>,
    pub pending_write: WriteSignal<Option<S>>,
    /// Start position for movement detection
    pub start_read: ReadSignal<(i32, i32)>,
    pub start_write: WriteSignal<(i32, i32)>,
}

impl<S: 'static, T: 'static> Clone for DndSignals<S, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: 'static, T: 'static> Copy for DndSignals<S, T> {}

/// Movement threshold in pixels to start dragging
pub const DRAG_THRESHOLD_PX: i32 = 5;

/// How long `drag_just_ended` stays set
const JUST_ENDED_MS: i32 = 100;

pub fn create_dnd_signals<S, T>() -> DndSignals<S, T>
where
    S: Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    let (dragging_read, dragging_write) = signal(None::<S>);
    let (drop_target_read, drop_target_write) = signal(None::<T>);
    let (drag_just_ended_read, drag_just_ended_write) = signal(false);
    let (pending_read, pending_write) = signal(None::<S>);
    let (start_read, start_write) = signal((0i32, 0i32));
    DndSignals {
        dragging_read,
        dragging_write,
        drop_target_read,
        drop_target_write,
        drag_just_ended_read,
        drag_just_ended_write,
        pending_read,
        pending_write,
        start_read,
        start_write,
    }
}

impl<S, T> DndSignals<S, T>
where
    S: Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub fn is_dragging(&self) -> bool {
        self.dragging_read.with_untracked(Option::is_some)
    }
}

/// End drag operation
pub fn end_drag<S, T>(dnd: &DndSignals<S, T>)
where
    S: Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    let was_dragging = dnd.is_dragging();
    dnd.dragging_write.set(None);
    dnd.drop_target_write.set(None);
    dnd.pending_write.set(None);
    if !was_dragging {
        return;
    }
    dnd.drag_just_ended_write.set(true);

    if let Some(win) = web_sys::window() {
        let clear = dnd.drag_just_ended_write;
        let cb = Closure::<dyn FnMut()>::new(move || {
            clear.set(false);
        });
        let _ = win.set_timeout_with_callback_and_timeout_and_arguments_0(
            cb.as_ref().unchecked_ref(),
            JUST_ENDED_MS,
        );
        cb.forget();
    }
}

/// Create mousedown handler for a draggable element.
/// Records a pending drag with the start position.
pub fn make_on_mousedown<S, T>(
    dnd: DndSignals<S, T>,
    subject: S,
) -> impl Fn(web_sys::MouseEvent) + Clone + 'static
where
    S: Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    move |ev: web_sys::MouseEvent| {
        if ev.button() != 0 || is_form_control(&ev) {
            return;
        }
        // Nested draggables (a card inside a list) claim the grab first
        ev.stop_propagation();
        dnd.pending_write.set(Some(subject.clone()));
        dnd.start_write.set((ev.client_x(), ev.client_y()));
    }
}

fn is_form_control(ev: &web_sys::MouseEvent) -> bool {
    let Some(target) = ev.target() else {
        return false;
    };
    target.dyn_ref::<web_sys::HtmlInputElement>().is_some()
        || target.dyn_ref::<web_sys::HtmlTextAreaElement>().is_some()
        || target.dyn_ref::<web_sys::HtmlButtonElement>().is_some()
}

/// Create a mousemove handler for a drop target. `target_of` maps the event
/// to what the pointer is over; the signal only changes when that differs.
pub fn make_on_hover<S, T, F>(
    dnd: DndSignals<S, T>,
    target_of: F,
) -> impl Fn(web_sys::MouseEvent) + Clone + 'static
where
    S: Clone + Send + Sync + 'static,
    T: Clone + PartialEq + Send + Sync + 'static,
    F: Fn(&web_sys::MouseEvent) -> T + Clone + 'static,
{
    move |ev: web_sys::MouseEvent| {
        if !dnd.is_dragging() {
            return;
        }
        // Inner targets win over the container they sit in
        ev.stop_propagation();
        let target = target_of(&ev);
        if dnd.drop_target_read.with_untracked(|t| t.as_ref() != Some(&target)) {
            dnd.drop_target_write.set(Some(target));
        }
    }
}

/// True when the pointer is past the vertical middle of the element the
/// handler is attached to.
pub fn pointer_in_lower_half(ev: &web_sys::MouseEvent) -> bool {
    let Some(element) = ev
        .current_target()
        .and_then(|t| t.dyn_into::<web_sys::Element>().ok())
    else {
        return false;
    };
    let rect = element.get_bounding_client_rect();
    f64::from(ev.client_y()) > rect.top() + rect.height() / 2.0
}

/// Bind document mousemove: promotes a pending grab to a drag once the
/// pointer moves far enough.
pub fn bind_global_mousemove<S, T>(dnd: DndSignals<S, T>)
where
    S: Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    let on_mousemove =
        Closure::<dyn FnMut(web_sys::MouseEvent)>::new(move |ev: web_sys::MouseEvent| {
            if dnd.is_dragging() {
                return;
            }
            let Some(pending) = dnd.pending_read.get_untracked() else {
                return;
            };
            let (start_x, start_y) = dnd.start_read.get_untracked();
            let dx = (ev.client_x() - start_x).abs();
            let dy = (ev.client_y() - start_y).abs();
            if dx > DRAG_THRESHOLD_PX || dy > DRAG_THRESHOLD_PX {
                dnd.dragging_write.set(Some(pending));
            }
        });

    listen_on_document("mousemove", on_mousemove.as_ref().unchecked_ref());
    on_mousemove.forget();
}

/// Bind document mouseup for drop detection. `on_drop` receives the dragged
/// subject and the last target hovered, if any. Also binds the mousemove
/// threshold handler.
pub fn bind_global_mouseup<S, T, F>(dnd: DndSignals<S, T>, on_drop: F)
where
    S: Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
    F: Fn(S, Option<T>) + 'static,
{
    let on_mouseup =
        Closure::<dyn FnMut(web_sys::MouseEvent)>::new(move |_ev: web_sys::MouseEvent| {
            let dragging = dnd.dragging_read.get_untracked();
            let target = dnd.drop_target_read.get_untracked();
            end_drag(&dnd);
            // Without a drag this was a click; it fires on the element as usual
            if let Some(dragged) = dragging {
                on_drop(dragged, target);
            }
        });

    listen_on_document("mouseup", on_mouseup.as_ref().unchecked_ref());
    on_mouseup.forget();

    bind_global_mousemove(dnd);
}

/// Bind document keydown: Escape abandons a drag in progress.
pub fn bind_escape_cancel<S, T, F>(dnd: DndSignals<S, T>, on_cancel: F)
where
    S: Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
    F: Fn(S) + 'static,
{
    let on_keydown =
        Closure::<dyn FnMut(web_sys::KeyboardEvent)>::new(move |ev: web_sys::KeyboardEvent| {
            if ev.key() != "Escape" {
                return;
            }
            let dragging = dnd.dragging_read.get_untracked();
            end_drag(&dnd);
            if let Some(dragged) = dragging {
                on_cancel(dragged);
            }
        });

    listen_on_document("keydown", on_keydown.as_ref().unchecked_ref());
    on_keydown.forget();
}

fn listen_on_document(event: &str, callback: &js_sys::Function) {
    if let Some(doc) = web_sys::window().and_then(|w| w.document()) {
        let _ = doc.add_event_listener_with_callback(event, callback);
    }
}
