//! Real-time transport contract.

use super::audience::Audience;
use crate::error::Result;
use crate::roles::UserId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// An event delivered to a user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    pub payload: Value,
}

impl Event {
    #[must_use]
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }
}

/// Delivers an event to a set of users.
///
/// The engine only ever supplies resolved user ids and an opaque payload.
/// How the event reaches the user (socket, queue, push) is up to the
/// implementation.
///
/// # Example
///
/// ```rust,ignore
/// struct SocketNotifier { sockets: SocketRegistry }
///
/// #[async_trait]
/// impl Notifier for SocketNotifier {
///     async fn notify(&self, user_ids: &[UserId], event: &str, payload: &Value) -> Result<()> {
///         for user_id in user_ids {
///             self.sockets.emit(*user_id, event, payload).await?;
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user_ids: &[UserId], event: &str, payload: &Value) -> Result<()>;
}

#[async_trait]
impl<N: Notifier + ?Sized> Notifier for Arc<N> {
    async fn notify(&self, user_ids: &[UserId], event: &str, payload: &Value) -> Result<()> {
        (**self).notify(user_ids, event, payload).await
    }
}

/// Notifier that drops every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, _user_ids: &[UserId], _event: &str, _payload: &Value) -> Result<()> {
        Ok(())
    }
}

/// Sends events to audiences through a [`Notifier`].
///
/// Delivery happens after the mutation has been committed, so a transport
/// failure is logged and counted but never fails the operation.
#[derive(Clone)]
pub struct Broadcaster<N: Notifier> {
    notifier: N,
    total_broadcasts: Arc<AtomicU64>,
    failed_broadcasts: Arc<AtomicU64>,
}

impl<N: Notifier> Broadcaster<N> {
    #[must_use]
    pub fn new(notifier: N) -> Self {
        Self {
            notifier,
            total_broadcasts: Arc::new(AtomicU64::new(0)),
            failed_broadcasts: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Get a reference to the underlying notifier.
    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Notify every user in the audience once. Empty audiences are skipped.
    pub async fn notify(&self, audience: &Audience, event: &str, payload: &Value) {
        if audience.is_empty() {
            debug!(event, "Empty audience, nothing to broadcast");
            return;
        }

        self.total_broadcasts.fetch_add(1, Ordering::Relaxed);
        let user_ids = audience.to_vec();

        match self.notifier.notify(&user_ids, event, payload).await {
            Ok(()) => debug!(event, recipients = user_ids.len(), "Event broadcast"),
            Err(e) => {
                self.failed_broadcasts.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, event, recipients = user_ids.len(), "Failed to broadcast event");
            }
        }
    }

    /// Get the total number of broadcasts attempted
    pub fn total_broadcasts(&self) -> u64 {
        self.total_broadcasts.load(Ordering::Relaxed)
    }

    /// Get the number of broadcasts the notifier rejected
    pub fn failed_broadcasts(&self) -> u64 {
        self.failed_broadcasts.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AccessError;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        calls: Mutex<Vec<(Vec<UserId>, String)>>,
    }

    #[async_trait]
    impl Notifier for Recording {
        async fn notify(&self, user_ids: &[UserId], event: &str, _payload: &Value) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push((user_ids.to_vec(), event.to_string()));
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl Notifier for Failing {
        async fn notify(&self, _user_ids: &[UserId], _event: &str, _payload: &Value) -> Result<()> {
            Err(AccessError::storage("transport down"))
        }
    }

    #[tokio::test]
    async fn test_broadcast_sends_sorted_ids_once() {
        let recording = Arc::new(Recording::default());
        let broadcaster = Broadcaster::new(recording.clone());

        let audience = Audience::from(vec![3, 1, 3]);
        broadcaster.notify(&audience, "chatroom:updated", &json!({})).await;

        let calls = recording.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], (vec![1, 3], "chatroom:updated".to_string()));
    }

    #[tokio::test]
    async fn test_empty_audience_skipped() {
        let recording = Arc::new(Recording::default());
        let broadcaster = Broadcaster::new(recording.clone());

        broadcaster.notify(&Audience::new(), "x", &json!(null)).await;

        assert!(recording.calls.lock().unwrap().is_empty());
        assert_eq!(broadcaster.total_broadcasts(), 0);
    }

    #[tokio::test]
    async fn test_failure_is_counted_not_propagated() {
        let broadcaster = Broadcaster::new(Failing);

        broadcaster.notify(&Audience::from(vec![1]), "x", &json!(null)).await;

        assert_eq!(broadcaster.total_broadcasts(), 1);
        assert_eq!(broadcaster.failed_broadcasts(), 1);
    }
}
