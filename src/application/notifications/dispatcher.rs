//! Command dispatcher - replies to inbound client commands.

use std::sync::Arc;

use super::{ConnectionRegistry, NotificationBroadcaster};
use crate::domain::command::{ClientCommand, ConnectionState};
use crate::domain::foundation::{ConnectionId, Timestamp};
use crate::domain::notification::Notification;

/// Parses client frames and answers them on the originating connection.
///
/// Malformed or unknown input is logged at debug and ignored; it never
/// produces an error reply or closes the connection.
pub struct CommandDispatcher {
    registry: Arc<ConnectionRegistry>,
    broadcaster: Arc<NotificationBroadcaster>,
}

impl CommandDispatcher {
    pub fn new(registry: Arc<ConnectionRegistry>, broadcaster: Arc<NotificationBroadcaster>) -> Self {
        Self {
            registry,
            broadcaster,
        }
    }

    /// Handles one inbound text frame. Returns whether a reply was sent.
    pub async fn dispatch(&self, id: ConnectionId, state: &mut ConnectionState, raw: &str) -> bool {
        match self.reply_for(id, state, raw).await {
            Some(reply) => self.broadcaster.unicast(id, &reply).await,
            None => false,
        }
    }

    /// Applies the command's effects and builds its reply.
    pub async fn reply_for(
        &self,
        id: ConnectionId,
        state: &mut ConnectionState,
        raw: &str,
    ) -> Option<Notification> {
        let command = match ClientCommand::parse(raw) {
            Ok(command) => command,
            Err(e) => {
                tracing::debug!(connection_id = %id, error = %e, "Ignoring client frame");
                return None;
            }
        };
        tracing::debug!(connection_id = %id, command = command.name(), "Client command");

        let reply = match command {
            ClientCommand::Ping => Notification::pong(Timestamp::now()),
            ClientCommand::Stats => {
                let stats = self.registry.stats().await;
                Notification::stats(
                    stats.active_connections,
                    stats.total_connections,
                    stats.identified_users,
                    Timestamp::now(),
                )
            }
            ClientCommand::Help => Notification::help(),
            ClientCommand::Identify { user_id } => {
                if !self.registry.bind_user(id, user_id.clone()).await {
                    return None;
                }
                if let Some(previous) = state.identify(user_id.clone()) {
                    tracing::info!(connection_id = %id, previous = %previous, user_id = %user_id, "Connection re-identified");
                }
                Notification::system(format!("Identified as {}", user_id), "success")
            }
        };
        Some(reply)
    }

    /// Greeting sent right after a connection is registered.
    pub async fn welcome(&self, id: ConnectionId) -> bool {
        let greeting = Notification::system(
            "Connected to medication notifications. Send \"help\" for commands.",
            "info",
        );
        self.broadcaster.unicast(id, &greeting).await
    }
}
