//! Notification broadcaster - renders notifications and pushes them to
//! registered connections.

use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;

use super::ConnectionRegistry;
use crate::domain::foundation::{ConnectionId, Timestamp, UserId};
use crate::domain::notification::{render, Notification};

/// Result of [`NotificationBroadcaster::notify`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyReport {
    pub tag: &'static str,
    pub delivered: usize,
    /// Deliveries of the follow-up critical alert, when one was owed.
    pub escalated: Option<usize>,
}

pub struct NotificationBroadcaster {
    registry: Arc<ConnectionRegistry>,
}

impl NotificationBroadcaster {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    fn render_logged(notification: &Notification) -> Option<String> {
        match render(notification, Timestamp::now()) {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::error!(tag = notification.tag(), error = %e, "Failed to render notification");
                None
            }
        }
    }

    /// Sends to every connection registered at call time, concurrently.
    ///
    /// Returns how many sends succeeded. Connections whose send fails are
    /// unregistered and not counted.
    pub async fn broadcast(&self, notification: &Notification) -> usize {
        let Some(text) = Self::render_logged(notification) else {
            return 0;
        };

        let connections = self.registry.handles().await;
        let attempted = connections.len();

        let sends = connections.iter().map(|connection| {
            self.registry.send_or_evict(connection, text.clone())
        });
        let delivered = join_all(sends).await.into_iter().filter(|ok| *ok).count();

        tracing::info!(
            tag = notification.tag(),
            delivered,
            attempted,
            "Broadcast notification"
        );
        delivered
    }

    /// Sends to one connection. A failed send unregisters it.
    pub async fn unicast(&self, id: ConnectionId, notification: &Notification) -> bool {
        let Some(text) = Self::render_logged(notification) else {
            return false;
        };
        self.registry.send_to(id, text).await
    }

    /// Sends to the first open connection bound to `user`.
    pub async fn send_to_user(&self, user: &UserId, notification: &Notification) -> bool {
        match self.registry.first_open_for_user(user).await {
            Some(id) => self.unicast(id, notification).await,
            None => {
                tracing::debug!(user_id = %user, "No open connection for user");
                false
            }
        }
    }

    /// Broadcasts, then broadcasts the critical alert the notification
    /// escalates to, if any. The two broadcasts are separate and ordered.
    pub async fn notify(&self, notification: Notification) -> NotifyReport {
        let delivered = self.broadcast(&notification).await;

        let escalated = match notification.escalation() {
            Some(alert) => {
                tracing::warn!(tag = notification.tag(), "Escalating critical notification");
                Some(self.broadcast(&alert).await)
            }
            None => None,
        };

        NotifyReport {
            tag: notification.tag(),
            delivered,
            escalated,
        }
    }
}
