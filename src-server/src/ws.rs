//! WebSocket subscriptions
//!
//! A socket subscribes to channel keys; each subscription gets a forwarding
//! task that moves broadcast messages into the socket's outgoing queue.

use std::collections::HashMap;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use kanban_core::{Channel, ClientFrame, ServerFrame};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::{DomainError, DomainResult, User};
use crate::session::Actor;
use crate::AppState;

const OUTGOING_QUEUE: usize = 64;

/// `GET /ws`
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Actor(actor): Actor,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, actor))
}

async fn handle_socket(socket: WebSocket, state: AppState, user: User) {
    info!(user_id = %user.id, "socket connected");
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::channel::<ServerFrame>(OUTGOING_QUEUE);
    let mut subscriptions: HashMap<Channel, JoinHandle<()>> = HashMap::new();

    loop {
        tokio::select! {
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    let reply = handle_client_frame(&state, &user, &text, &tx, &mut subscriptions).await;
                    if let Some(frame) = reply {
                        if send_frame(&mut sink, &frame).await.is_err() {
                            break;
                        }
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!(user_id = %user.id, "socket closed: {:?}", frame);
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(user_id = %user.id, "socket error: {}", e);
                    break;
                }
                None => break,
            },
            Some(frame) = rx.recv() => {
                if send_frame(&mut sink, &frame).await.is_err() {
                    break;
                }
            }
        }
    }

    for (_, task) in subscriptions.drain() {
        task.abort();
    }
    info!(user_id = %user.id, "socket disconnected");
}

async fn handle_client_frame(
    state: &AppState,
    user: &User,
    text: &str,
    tx: &mpsc::Sender<ServerFrame>,
    subscriptions: &mut HashMap<Channel, JoinHandle<()>>,
) -> Option<ServerFrame> {
    let frame: ClientFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            warn!(user_id = %user.id, "unreadable client frame: {}", e);
            return Some(ServerFrame::Error {
                message: DomainError::GENERIC_MESSAGE.to_string(),
            });
        }
    };

    match frame {
        ClientFrame::Subscribe { channel } => {
            match can_subscribe(state, user, &channel).await {
                Ok(true) => {}
                Ok(false) => {
                    return Some(ServerFrame::Error {
                        message: DomainError::NotAuthorized.public_message(),
                    })
                }
                Err(e) => {
                    return Some(ServerFrame::Error {
                        message: e.public_message(),
                    })
                }
            }
            if !subscriptions.contains_key(&channel) {
                let task = forward(state, channel.clone(), tx.clone());
                subscriptions.insert(channel.clone(), task);
                debug!(user_id = %user.id, %channel, "subscribed");
            }
            Some(ServerFrame::Subscribed { channel })
        }
        ClientFrame::Unsubscribe { channel } => {
            if let Some(task) = subscriptions.remove(&channel) {
                task.abort();
                debug!(user_id = %user.id, %channel, "unsubscribed");
            }
            None
        }
    }
}

/// Board and card channels follow board read access; user channels are private
async fn can_subscribe(state: &AppState, user: &User, channel: &Channel) -> DomainResult<bool> {
    match channel {
        Channel::Board(board_id) => state.repos.boards.can_read(board_id, &user.id).await,
        Channel::Card(card_id) => match state.repos.cards.card_location(card_id).await? {
            Some((board_id, _)) => state.repos.boards.can_read(&board_id, &user.id).await,
            None => Ok(false),
        },
        Channel::User(user_id) => Ok(*user_id == user.id),
    }
}

fn forward(state: &AppState, channel: Channel, tx: mpsc::Sender<ServerFrame>) -> JoinHandle<()> {
    let mut receiver = state.broadcaster.subscribe(&channel);
    tokio::spawn(async move {
        loop {
            let frame = match receiver.recv().await {
                Ok(message) => ServerFrame::Change {
                    channel: channel.clone(),
                    message,
                },
                Err(RecvError::Lagged(skipped)) => {
                    warn!(%channel, skipped, "subscriber lagged");
                    ServerFrame::Lagged {
                        channel: channel.clone(),
                        skipped,
                    }
                }
                Err(RecvError::Closed) => break,
            };
            if tx.send(frame).await.is_err() {
                break;
            }
        }
    })
}

async fn send_frame<S>(sink: &mut S, frame: &ServerFrame) -> Result<(), ()>
where
    S: futures::Sink<Message> + Unpin,
{
    let text = match serde_json::to_string(frame) {
        Ok(text) => text,
        Err(e) => {
            warn!("failed to encode frame: {}", e);
            return Ok(());
        }
    };
    sink.send(Message::Text(text.into())).await.map_err(|_| ())
}
