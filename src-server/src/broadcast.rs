//! Change Broadcaster
//!
//! One tokio broadcast channel per channel key, created on first use.
//! Publishing is fire-and-forget: nobody listening is not an error.

use std::collections::HashMap;
use std::sync::Mutex;

use kanban_core::{ChangeMessage, Channel};
use thiserror::Error;
use tokio::sync::broadcast;

/// A message that reached nobody
#[derive(Debug, Error)]
pub enum DeliveryFailure {
    #[error("no subscribers on {0}")]
    NoSubscribers(Channel),
}

pub struct ChangeBroadcaster {
    capacity: usize,
    senders: Mutex<HashMap<Channel, broadcast::Sender<ChangeMessage>>>,
}

impl ChangeBroadcaster {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            senders: Mutex::new(HashMap::new()),
        }
    }

    pub fn subscribe(&self, channel: &Channel) -> broadcast::Receiver<ChangeMessage> {
        let mut senders = match self.senders.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        senders
            .entry(channel.clone())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Deliver to every current subscriber of `channel`; returns how many.
    pub fn publish(&self, channel: &Channel, message: ChangeMessage) -> usize {
        match self.try_publish(channel, message) {
            Ok(delivered) => {
                tracing::debug!(%channel, delivered, "broadcast");
                delivered
            }
            Err(e) => {
                tracing::debug!("dropped broadcast: {}", e);
                0
            }
        }
    }

    fn try_publish(&self, channel: &Channel, message: ChangeMessage) -> Result<usize, DeliveryFailure> {
        let mut senders = match self.senders.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let Some(sender) = senders.get(channel) else {
            return Err(DeliveryFailure::NoSubscribers(channel.clone()));
        };
        match sender.send(message) {
            Ok(delivered) => Ok(delivered),
            Err(_) => {
                // Everyone unsubscribed; forget the channel
                senders.remove(channel);
                Err(DeliveryFailure::NoSubscribers(channel.clone()))
            }
        }
    }

    /// Channels that currently hold a sender
    pub fn channel_count(&self) -> usize {
        match self.senders.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}
