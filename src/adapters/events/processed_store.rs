//! In-memory ProcessedEventStore.
//!
//! Records live for the lifetime of the process, which matches the
//! in-process queues of the in-memory broker.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, EventId, Timestamp};
use crate::ports::ProcessedEventStore;

#[derive(Debug, Default)]
pub struct InMemoryProcessedEventStore {
    processed: RwLock<HashMap<(String, String), Timestamp>>,
}

impl InMemoryProcessedEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.processed.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.processed.read().await.is_empty()
    }
}

fn key(event_id: &EventId, handler_name: &str) -> (String, String) {
    (event_id.as_str().to_string(), handler_name.to_string())
}

#[async_trait]
impl ProcessedEventStore for InMemoryProcessedEventStore {
    async fn contains(&self, event_id: &EventId, handler_name: &str) -> Result<bool, DomainError> {
        Ok(self
            .processed
            .read()
            .await
            .contains_key(&key(event_id, handler_name)))
    }

    async fn mark_processed(
        &self,
        event_id: &EventId,
        handler_name: &str,
    ) -> Result<(), DomainError> {
        self.processed
            .write()
            .await
            .entry(key(event_id, handler_name))
            .or_insert_with(Timestamp::now);
        Ok(())
    }

    async fn delete_before(&self, timestamp: Timestamp) -> Result<u64, DomainError> {
        let mut processed = self.processed.write().await;
        let before = processed.len();
        processed.retain(|_, recorded_at| *recorded_at >= timestamp);
        Ok((before - processed.len()) as u64)
    }
}
