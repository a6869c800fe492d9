//! Board Socket
//!
//! One WebSocket per board page. Keeps the wanted channel set and
//! re-subscribes after every reconnect. The server does not replay messages
//! missed while disconnected; callers learn a channel is live from its
//! `Subscribed` frame.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use gloo_timers::future::TimeoutFuture;
use kanban_core::{Channel, ClientFrame, ServerFrame};
use leptos::task::spawn_local;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::{CloseEvent, MessageEvent, WebSocket};

const RETRY_BASE_MS: u32 = 500;
const RETRY_MAX_MS: u32 = 10_000;

type FrameHandler = Rc<dyn Fn(ServerFrame)>;
type ConnectHandler = Rc<dyn Fn()>;

struct Handlers {
    _on_open: Closure<dyn FnMut()>,
    _on_message: Closure<dyn FnMut(MessageEvent)>,
    _on_close: Closure<dyn FnMut(CloseEvent)>,
}

struct SocketInner {
    url: String,
    ws: Option<WebSocket>,
    handlers: Option<Handlers>,
    channels: Vec<Channel>,
    on_frame: FrameHandler,
    on_connect: ConnectHandler,
    retries: u32,
    closed: bool,
}

pub struct BoardSocket {
    inner: Rc<RefCell<SocketInner>>,
}

impl BoardSocket {
    /// Open the socket. `on_frame` sees every server frame; `on_connect`
    /// runs each time the socket opens, before the channels are subscribed.
    pub fn connect(
        channels: Vec<Channel>,
        on_frame: impl Fn(ServerFrame) + 'static,
        on_connect: impl Fn() + 'static,
    ) -> Result<Self, String> {
        let inner = Rc::new(RefCell::new(SocketInner {
            url: socket_url()?,
            ws: None,
            handlers: None,
            channels,
            on_frame: Rc::new(on_frame),
            on_connect: Rc::new(on_connect),
            retries: 0,
            closed: false,
        }));
        open(&inner)?;
        Ok(Self { inner })
    }

    pub fn subscribe(&self, channel: Channel) {
        let mut inner = self.inner.borrow_mut();
        if inner.channels.contains(&channel) {
            return;
        }
        send_frame(inner.ws.as_ref(), &ClientFrame::Subscribe {
            channel: channel.clone(),
        });
        inner.channels.push(channel);
    }

    pub fn unsubscribe(&self, channel: &Channel) {
        let mut inner = self.inner.borrow_mut();
        inner.channels.retain(|c| c != channel);
        send_frame(inner.ws.as_ref(), &ClientFrame::Unsubscribe {
            channel: channel.clone(),
        });
    }

    pub fn close(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.closed = true;
        if let Some(ws) = inner.ws.take() {
            ws.set_onopen(None);
            ws.set_onmessage(None);
            ws.set_onclose(None);
            let _ = ws.close();
        }
        inner.handlers = None;
    }
}

impl Drop for BoardSocket {
    fn drop(&mut self) {
        self.close();
    }
}

fn socket_url() -> Result<String, String> {
    let location = web_sys::window()
        .ok_or("no window")?
        .location();
    let protocol = location.protocol().map_err(|_| "no location")?;
    let host = location.host().map_err(|_| "no location")?;
    let scheme = if protocol == "https:" { "wss" } else { "ws" };
    Ok(format!("{scheme}://{host}/ws"))
}

fn open(inner: &Rc<RefCell<SocketInner>>) -> Result<(), String> {
    let url = inner.borrow().url.clone();
    let ws = WebSocket::new(&url).map_err(|e| format!("{e:?}"))?;
    let weak = Rc::downgrade(inner);

    let on_open = {
        let weak = weak.clone();
        Closure::<dyn FnMut()>::new(move || {
            let Some(inner) = weak.upgrade() else { return };
            web_sys::console::log_1(&"[SOCKET] connected".into());
            let on_connect = inner.borrow().on_connect.clone();
            on_connect();

            let mut state = inner.borrow_mut();
            for channel in &state.channels {
                send_frame(state.ws.as_ref(), &ClientFrame::Subscribe {
                    channel: channel.clone(),
                });
            }
            state.retries = 0;
        })
    };

    let on_message = {
        let weak = weak.clone();
        Closure::<dyn FnMut(MessageEvent)>::new(move |ev: MessageEvent| {
            let Some(inner) = weak.upgrade() else { return };
            let Some(text) = ev.data().as_string() else { return };
            match serde_json::from_str::<ServerFrame>(&text) {
                Ok(frame) => {
                    let handler = inner.borrow().on_frame.clone();
                    handler(frame);
                }
                Err(e) => {
                    web_sys::console::warn_1(&format!("[SOCKET] unreadable frame: {e}").into());
                }
            }
        })
    };

    let on_close = Closure::<dyn FnMut(CloseEvent)>::new(move |ev: CloseEvent| {
        web_sys::console::log_1(&format!("[SOCKET] closed ({})", ev.code()).into());
        schedule_reconnect(weak.clone());
    });

    ws.set_onopen(Some(on_open.as_ref().unchecked_ref()));
    ws.set_onmessage(Some(on_message.as_ref().unchecked_ref()));
    ws.set_onclose(Some(on_close.as_ref().unchecked_ref()));

    let mut state = inner.borrow_mut();
    state.ws = Some(ws);
    state.handlers = Some(Handlers {
        _on_open: on_open,
        _on_message: on_message,
        _on_close: on_close,
    });
    Ok(())
}

fn schedule_reconnect(weak: Weak<RefCell<SocketInner>>) {
    let delay = {
        let Some(inner) = weak.upgrade() else { return };
        let mut state = inner.borrow_mut();
        if state.closed {
            return;
        }
        state.ws = None;
        let delay = RETRY_BASE_MS.saturating_mul(1 << state.retries.min(5)).min(RETRY_MAX_MS);
        state.retries += 1;
        delay
    };

    spawn_local(async move {
        TimeoutFuture::new(delay).await;
        let Some(inner) = weak.upgrade() else { return };
        if inner.borrow().closed {
            return;
        }
        if let Err(e) = open(&inner) {
            web_sys::console::warn_1(&format!("[SOCKET] reconnect failed: {e}").into());
            schedule_reconnect(weak);
        }
    });
}

fn send_frame(ws: Option<&WebSocket>, frame: &ClientFrame) {
    let Some(ws) = ws else { return };
    if ws.ready_state() != WebSocket::OPEN {
        return;
    }
    match serde_json::to_string(frame) {
        Ok(text) => {
            let _ = ws.send_with_str(&text);
        }
        Err(e) => {
            web_sys::console::warn_1(&format!("[SOCKET] failed to encode frame: {e}").into());
        }
    }
}
