//! In-process per-user event hub.
//!
//! Tracks subscriptions per user and fans events out over bounded
//! `tokio::sync::mpsc` channels. A transport layer (socket handler, SSE
//! stream) subscribes on connect and forwards what it receives.

use super::notifier::{Event, Notifier};
use crate::error::Result;
use crate::roles::UserId;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::warn;

/// Default buffered events per subscription.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// A live subscription for one user.
pub struct Subscription {
    id: u64,
    user_id: UserId,
    receiver: mpsc::Receiver<Event>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Wait for the next event. Returns `None` once unsubscribed.
    pub async fn recv(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }

    /// Take an already buffered event without waiting.
    pub fn try_recv(&mut self) -> Option<Event> {
        self.receiver.try_recv().ok()
    }
}

/// Per-user event hub.
///
/// Cloning shares the same registry.
///
/// # Example
///
/// ```rust,ignore
/// let hub = UserHub::new();
/// let workspace = Workspace::new(store, platform_admins, hub.clone());
///
/// let mut sub = hub.subscribe(user_id);
/// while let Some(event) = sub.recv().await {
///     socket.send_json(&event).await?;
/// }
/// ```
#[derive(Clone)]
pub struct UserHub {
    /// Map of user ID to that user's subscriptions
    subscribers: Arc<DashMap<UserId, HashMap<u64, mpsc::Sender<Event>>>>,
    capacity: usize,
    next_id: Arc<AtomicU64>,
    /// Total subscriptions ever created (for metrics)
    total_subscriptions: Arc<AtomicU64>,
    /// Total events delivered (for metrics)
    total_delivered: Arc<AtomicU64>,
    /// Events dropped because a subscriber was full (for metrics)
    total_dropped: Arc<AtomicU64>,
}

impl UserHub {
    /// Create a hub with the default channel capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a hub buffering up to `capacity` events per subscription
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            subscribers: Arc::new(DashMap::new()),
            capacity: capacity.max(1),
            next_id: Arc::new(AtomicU64::new(1)),
            total_subscriptions: Arc::new(AtomicU64::new(0)),
            total_delivered: Arc::new(AtomicU64::new(0)),
            total_dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Subscribe to events for a user
    pub fn subscribe(&self, user_id: UserId) -> Subscription {
        let (sender, receiver) = mpsc::channel(self.capacity);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        self.subscribers
            .entry(user_id)
            .or_default()
            .insert(id, sender);
        self.total_subscriptions.fetch_add(1, Ordering::Relaxed);

        Subscription {
            id,
            user_id,
            receiver,
        }
    }

    /// Drop a subscription
    pub fn unsubscribe(&self, subscription: &Subscription) {
        self.remove(subscription.user_id, subscription.id);
    }

    fn remove(&self, user_id: UserId, subscription_id: u64) {
        if let Some(mut subs) = self.subscribers.get_mut(&user_id) {
            subs.remove(&subscription_id);
            if subs.is_empty() {
                drop(subs);
                self.subscribers.remove(&user_id);
            }
        }
    }

    /// Deliver an event to every subscription of one user
    fn send_to_user(&self, user_id: UserId, event: &Event) {
        // Clone senders first to minimize lock time
        let senders: Vec<(u64, mpsc::Sender<Event>)> = self
            .subscribers
            .get(&user_id)
            .map(|entry| entry.iter().map(|(id, tx)| (*id, tx.clone())).collect())
            .unwrap_or_default();

        let mut closed = Vec::new();
        for (id, sender) in senders {
            match sender.try_send(event.clone()) {
                Ok(()) => {
                    self.total_delivered.fetch_add(1, Ordering::Relaxed);
                }
                Err(TrySendError::Full(_)) => {
                    self.total_dropped.fetch_add(1, Ordering::Relaxed);
                    warn!(user_id, subscription_id = id, event = %event.name, "Subscriber full, event dropped");
                }
                Err(TrySendError::Closed(_)) => closed.push(id),
            }
        }

        // Clean up closed subscriptions
        for id in closed {
            self.remove(user_id, id);
        }
    }

    /// Whether the user has at least one live subscription
    pub fn is_subscribed(&self, user_id: UserId) -> bool {
        self.subscribers.contains_key(&user_id)
    }

    /// Get hub metrics
    pub fn metrics(&self) -> HubMetrics {
        HubMetrics {
            active_users: self.subscribers.len(),
            active_subscriptions: self.subscribers.iter().map(|entry| entry.len()).sum(),
            total_subscriptions: self.total_subscriptions.load(Ordering::Relaxed),
            total_delivered: self.total_delivered.load(Ordering::Relaxed),
            total_dropped: self.total_dropped.load(Ordering::Relaxed),
        }
    }
}

impl Default for UserHub {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for UserHub {
    async fn notify(&self, user_ids: &[UserId], event: &str, payload: &Value) -> Result<()> {
        let event = Event::new(event, payload.clone());
        for user_id in user_ids {
            self.send_to_user(*user_id, &event);
        }
        Ok(())
    }
}

/// Hub metrics for monitoring
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubMetrics {
    /// Users with at least one subscription
    pub active_users: usize,
    /// Live subscriptions across all users
    pub active_subscriptions: usize,
    /// Total subscriptions ever created
    pub total_subscriptions: u64,
    /// Total events delivered
    pub total_delivered: u64,
    /// Events dropped because a subscriber was full
    pub total_dropped: u64,
}
