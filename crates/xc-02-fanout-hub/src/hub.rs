//! # Hub Actor
//!
//! The subscriber set is owned by one task. Everything else talks to it
//! through [`HubHandle`]:
//!
//! ```text
//! HubHandle ──register / broadcast / stats──→ ┌──────────┐ ──try_send──→ Subscription A
//!                                             │ Hub task │ ──try_send──→ Subscription B
//! Subscription::drop ──unregister───────────→ └──────────┘     (full → dropped)
//! ```
//!
//! Unregistrations are drained before commands so a disconnected client is
//! never offered another message once its drop has been observed.

use crate::config::HubConfig;
use crate::subscription::{SubscriberId, Subscription};
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HubError {
    #[error("fan-out hub has shut down")]
    Closed,
}

/// Counters reported by the hub task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HubStats {
    /// Currently registered subscribers.
    pub subscribers: usize,
    pub registered_total: u64,
    pub unregistered_total: u64,
    /// Subscribers dropped because their buffer was full.
    pub dropped_slow: u64,
    pub broadcasts: u64,
    pub delivered: u64,
}

enum Command<T> {
    Register(oneshot::Sender<Subscription<T>>),
    Unregister(SubscriberId),
    Broadcast(T),
    Stats(oneshot::Sender<HubStats>),
}

/// Cloneable front door to the hub task.
pub struct HubHandle<T> {
    commands: mpsc::Sender<Command<T>>,
}

impl<T> Clone for HubHandle<T> {
    fn clone(&self) -> Self {
        Self {
            commands: self.commands.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> HubHandle<T> {
    /// Add a subscriber. It receives every broadcast issued after this returns.
    pub async fn register(&self) -> Result<Subscription<T>, HubError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Register(reply))
            .await
            .map_err(|_| HubError::Closed)?;
        response.await.map_err(|_| HubError::Closed)
    }

    /// Remove a subscriber. Unknown or already-removed ids are ignored.
    pub async fn unregister(&self, id: SubscriberId) -> Result<(), HubError> {
        self.commands
            .send(Command::Unregister(id))
            .await
            .map_err(|_| HubError::Closed)
    }

    /// Queue a message for every current subscriber.
    pub async fn broadcast(&self, message: T) -> Result<(), HubError> {
        self.commands
            .send(Command::Broadcast(message))
            .await
            .map_err(|_| HubError::Closed)
    }

    pub async fn stats(&self) -> Result<HubStats, HubError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Stats(reply))
            .await
            .map_err(|_| HubError::Closed)?;
        response.await.map_err(|_| HubError::Closed)
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

/// Hub actor state. Construct with [`Hub::new`], drive with [`Hub::run`].
pub struct Hub<T> {
    config: HubConfig,
    commands: mpsc::Receiver<Command<T>>,
    unregister_tx: mpsc::UnboundedSender<SubscriberId>,
    unregister_rx: mpsc::UnboundedReceiver<SubscriberId>,
    subscribers: HashMap<SubscriberId, mpsc::Sender<T>>,
    stats: HubStats,
}

impl<T: Clone + Send + 'static> Hub<T> {
    pub fn new(config: HubConfig) -> (Self, HubHandle<T>) {
        let (commands_tx, commands) = mpsc::channel(config.intake_capacity.max(1));
        let (unregister_tx, unregister_rx) = mpsc::unbounded_channel();
        let hub = Self {
            config,
            commands,
            unregister_tx,
            unregister_rx,
            subscribers: HashMap::new(),
            stats: HubStats::default(),
        };
        (
            hub,
            HubHandle {
                commands: commands_tx,
            },
        )
    }

    /// Spawn the actor on the current runtime.
    pub fn spawn(config: HubConfig) -> (HubHandle<T>, JoinHandle<HubStats>) {
        let (hub, handle) = Self::new(config);
        (handle, tokio::spawn(hub.run()))
    }

    /// Serve until every [`HubHandle`] is dropped; returns final counters.
    pub async fn run(mut self) -> HubStats {
        info!(
            subscriber_capacity = self.config.subscriber_capacity,
            "Fan-out hub started"
        );
        loop {
            tokio::select! {
                biased;
                Some(id) = self.unregister_rx.recv() => self.remove(id),
                command = self.commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
            }
        }

        let remaining = self.subscribers.len();
        self.subscribers.clear();
        self.stats.subscribers = 0;
        info!(remaining, "Fan-out hub stopped");
        self.stats
    }

    fn handle(&mut self, command: Command<T>) {
        match command {
            Command::Register(reply) => self.add(reply),
            Command::Unregister(id) => self.remove(id),
            Command::Broadcast(message) => self.fan_out(message),
            Command::Stats(reply) => {
                self.stats.subscribers = self.subscribers.len();
                let _ = reply.send(self.stats);
            }
        }
    }

    fn add(&mut self, reply: oneshot::Sender<Subscription<T>>) {
        let id = SubscriberId::new();
        let (tx, rx) = mpsc::channel(self.config.subscriber_capacity.max(1));
        let subscription = Subscription::new(id, rx, self.unregister_tx.clone());

        // Caller gave up waiting; its subscription unregisters on drop.
        if reply.send(subscription).is_err() {
            return;
        }

        self.subscribers.insert(id, tx);
        self.stats.registered_total += 1;
        debug!(
            subscriber_id = %id,
            subscribers = self.subscribers.len(),
            "Subscriber registered"
        );
    }

    fn remove(&mut self, id: SubscriberId) {
        if self.subscribers.remove(&id).is_some() {
            self.stats.unregistered_total += 1;
            debug!(
                subscriber_id = %id,
                subscribers = self.subscribers.len(),
                "Subscriber unregistered"
            );
        }
    }

    fn fan_out(&mut self, message: T) {
        self.stats.broadcasts += 1;
        let mut dropped = Vec::new();

        for (id, tx) in &self.subscribers {
            match tx.try_send(message.clone()) {
                Ok(()) => self.stats.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(subscriber_id = %id, "Subscriber too slow, dropping");
                    self.stats.dropped_slow += 1;
                    dropped.push(*id);
                }
                Err(TrySendError::Closed(_)) => dropped.push(*id),
            }
        }

        for id in dropped {
            self.remove(id);
        }
    }
}
