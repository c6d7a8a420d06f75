//! QueueWorker - Background consumer for one durable queue.
//!
//! Polls the broker for deliveries, hands each envelope to a
//! `QueueHandler`, and settles it:
//!
//! - success: ack
//! - retryable error: requeue, until the event has been redelivered
//!   `max_redeliveries` times, then ack and drop
//! - any other error (undecodable or unknown event): ack and drop at once
//!
//! ## Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `poll_interval` | 100ms | How often to check the queue |
//! | `batch_size` | 100 | Max deliveries handled per poll cycle |
//! | `max_redeliveries` | 5 | Retries of a failing event before it is dropped |
//!
//! ## Graceful Shutdown
//!
//! The worker listens for a shutdown signal and drains one final batch
//! before stopping.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::time;

use crate::domain::foundation::{DomainError, EventId};
use crate::domain::routing::Delivery;
use crate::ports::{BrokerError, MessageBroker, QueueHandler};

#[derive(Debug, Clone)]
pub struct QueueWorkerConfig {
    /// How often to poll the queue.
    pub poll_interval: Duration,

    /// Maximum deliveries to handle per poll cycle.
    pub batch_size: u32,

    /// Requeues of one event before it is dropped.
    pub max_redeliveries: u32,
}

impl Default for QueueWorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            batch_size: 100,
            max_redeliveries: 5,
        }
    }
}

impl QueueWorkerConfig {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_batch_size(mut self, size: u32) -> Self {
        self.batch_size = size;
        self
    }

    pub fn with_max_redeliveries(mut self, max: u32) -> Self {
        self.max_redeliveries = max;
        self
    }
}

/// Outcome of one poll cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub acked: usize,
    pub requeued: usize,
    /// Acked without being handled.
    pub dropped: usize,
}

pub struct QueueWorker {
    broker: Arc<dyn MessageBroker>,
    queue: String,
    handler: Arc<dyn QueueHandler>,
    config: QueueWorkerConfig,
    /// Failed attempts per event still in circulation.
    failures: Mutex<HashMap<EventId, u32>>,
}

impl QueueWorker {
    pub fn new(
        broker: Arc<dyn MessageBroker>,
        queue: impl Into<String>,
        handler: Arc<dyn QueueHandler>,
    ) -> Self {
        Self::with_config(broker, queue, handler, QueueWorkerConfig::default())
    }

    pub fn with_config(
        broker: Arc<dyn MessageBroker>,
        queue: impl Into<String>,
        handler: Arc<dyn QueueHandler>,
        config: QueueWorkerConfig,
    ) -> Self {
        Self {
            broker,
            queue: queue.into(),
            handler,
            config,
            failures: Mutex::new(HashMap::new()),
        }
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Run the consume loop until the shutdown signal flips to `true`.
    ///
    /// Broker errors are logged and the loop keeps polling.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval(self.config.poll_interval);
        tracing::info!(
            queue = %self.queue,
            handler = self.handler.name(),
            "Queue worker started"
        );

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        self.poll_logged().await;
                        tracing::info!(queue = %self.queue, "Queue worker stopped");
                        return;
                    }
                }

                _ = interval.tick() => {
                    self.poll_logged().await;
                }
            }
        }
    }

    async fn poll_logged(&self) {
        if let Err(e) = self.process_batch().await {
            tracing::warn!(queue = %self.queue, error = %e, "Queue poll failed");
        }
    }

    /// Handle up to `batch_size` deliveries.
    ///
    /// A requeue ends the batch, so a failing message is retried on the
    /// next tick rather than in a tight loop.
    pub async fn process_batch(&self) -> Result<BatchReport, BrokerError> {
        let mut report = BatchReport::default();

        for _ in 0..self.config.batch_size {
            let Some(delivery) = self.broker.fetch(&self.queue).await? else {
                break;
            };

            match self.handler.handle(delivery.envelope.clone()).await {
                Ok(()) => {
                    self.broker.ack(&delivery).await?;
                    self.failures.lock().await.remove(&delivery.envelope.event_id);
                    report.acked += 1;
                }
                Err(e) => {
                    if e.is_retryable() && self.record_failure(&delivery).await {
                        tracing::warn!(
                            queue = %self.queue,
                            handler = self.handler.name(),
                            event_id = %delivery.envelope.event_id,
                            redelivered = delivery.redelivered,
                            error = %e,
                            "Handler failed, requeueing delivery"
                        );
                        self.broker.requeue(&delivery).await?;
                        report.requeued += 1;
                        break;
                    }
                    self.drop_delivery(&delivery, &e).await?;
                    report.dropped += 1;
                }
            }
        }

        if report.acked + report.requeued + report.dropped > 0 {
            tracing::debug!(
                queue = %self.queue,
                acked = report.acked,
                requeued = report.requeued,
                dropped = report.dropped,
                "Processed batch"
            );
        }

        Ok(report)
    }

    /// Counts a failed attempt. Returns `false` once the event has used up
    /// its redeliveries.
    async fn record_failure(&self, delivery: &Delivery) -> bool {
        let mut failures = self.failures.lock().await;
        let attempts = failures
            .entry(delivery.envelope.event_id.clone())
            .or_insert(0);
        *attempts += 1;
        *attempts <= self.config.max_redeliveries
    }

    async fn drop_delivery(
        &self,
        delivery: &Delivery,
        error: &DomainError,
    ) -> Result<(), BrokerError> {
        tracing::error!(
            queue = %self.queue,
            handler = self.handler.name(),
            event_id = %delivery.envelope.event_id,
            routing_key = %delivery.envelope.routing_key,
            retryable = error.is_retryable(),
            error = %error,
            "Dropping delivery that cannot be handled"
        );
        self.broker.ack(delivery).await?;
        self.failures.lock().await.remove(&delivery.envelope.event_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::broker::InMemoryBroker;
    use crate::domain::foundation::{DomainError, ErrorCode};
    use crate::domain::routing::{Binding, EventEnvelope, ExchangeSpec, QueueSpec};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailFirst {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl QueueHandler for FailFirst {
        async fn handle(&self, _event: EventEnvelope) -> Result<(), DomainError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(DomainError::new(ErrorCode::InternalError, "first try fails"));
            }
            Ok(())
        }

        fn name(&self) -> &'static str {
            "FailFirst"
        }
    }

    async fn broker_with_queue() -> Arc<InMemoryBroker> {
        let broker = Arc::new(InMemoryBroker::new());
        broker.declare_exchange(ExchangeSpec::fanout("ex")).await.unwrap();
        broker.declare_queue(QueueSpec::durable("q")).await.unwrap();
        broker.bind(Binding::fanout("ex", "q")).await.unwrap();
        broker
    }

    #[tokio::test]
    async fn acks_successful_deliveries() {
        let broker = broker_with_queue().await;
        for _ in 0..3 {
            broker.publish("ex", EventEnvelope::new("k", json!({}))).await;
        }
        let handler = Arc::new(FailFirst { calls: AtomicUsize::new(1) });
        let worker = QueueWorker::new(broker.clone(), "q", handler);

        let report = worker.process_batch().await.unwrap();

        assert_eq!(report, BatchReport { acked: 3, ..Default::default() });
        assert_eq!(broker.queue_depth("q").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn failed_delivery_is_requeued_and_redelivered() {
        let broker = broker_with_queue().await;
        broker.publish("ex", EventEnvelope::new("k", json!({}))).await;
        let handler = Arc::new(FailFirst { calls: AtomicUsize::new(0) });
        let worker = QueueWorker::new(broker.clone(), "q", handler.clone());

        let first = worker.process_batch().await.unwrap();
        assert_eq!(first.requeued, 1);
        assert_eq!(broker.queue_depth("q").await.unwrap(), 1);

        let second = worker.process_batch().await.unwrap();
        assert_eq!(second.acked, 1);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 2);
    }

    struct AlwaysFail(ErrorCode);

    #[async_trait]
    impl QueueHandler for AlwaysFail {
        async fn handle(&self, _event: EventEnvelope) -> Result<(), DomainError> {
            Err(DomainError::new(self.0, "always fails"))
        }

        fn name(&self) -> &'static str {
            "AlwaysFail"
        }
    }

    #[tokio::test]
    async fn undecodable_delivery_is_dropped_without_retry() {
        let broker = broker_with_queue().await;
        broker.publish("ex", EventEnvelope::new("k", json!({}))).await;
        broker.publish("ex", EventEnvelope::new("k", json!({}))).await;
        let handler = Arc::new(AlwaysFail(ErrorCode::InvalidPayload));
        let worker = QueueWorker::new(broker.clone(), "q", handler);

        let report = worker.process_batch().await.unwrap();

        assert_eq!(report, BatchReport { dropped: 2, ..Default::default() });
        assert_eq!(broker.queue_depth("q").await.unwrap(), 0);
        assert_eq!(broker.unacked_count("q").await, 0);
    }

    #[tokio::test]
    async fn unknown_event_type_is_dropped() {
        let broker = broker_with_queue().await;
        broker.publish("ex", EventEnvelope::new("k", json!({}))).await;
        let handler = Arc::new(AlwaysFail(ErrorCode::UnknownEventType));
        let worker = QueueWorker::new(broker.clone(), "q", handler);

        assert_eq!(worker.process_batch().await.unwrap().dropped, 1);
        assert_eq!(broker.queue_depth("q").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn retryable_failure_is_dropped_after_max_redeliveries() {
        let broker = broker_with_queue().await;
        broker.publish("ex", EventEnvelope::new("k", json!({}))).await;
        let handler = Arc::new(AlwaysFail(ErrorCode::InternalError));
        let config = QueueWorkerConfig::default().with_max_redeliveries(2);
        let worker = QueueWorker::with_config(broker.clone(), "q", handler, config);

        assert_eq!(worker.process_batch().await.unwrap().requeued, 1);
        assert_eq!(worker.process_batch().await.unwrap().requeued, 1);
        assert_eq!(broker.queue_depth("q").await.unwrap(), 1);

        let last = worker.process_batch().await.unwrap();
        assert_eq!(last, BatchReport { dropped: 1, ..Default::default() });
        assert_eq!(broker.queue_depth("q").await.unwrap(), 0);
        assert!(worker.failures.lock().await.is_empty());
    }

    #[tokio::test]
    async fn batch_size_limits_work_per_cycle() {
        let broker = broker_with_queue().await;
        for _ in 0..5 {
            broker.publish("ex", EventEnvelope::new("k", json!({}))).await;
        }
        let handler = Arc::new(FailFirst { calls: AtomicUsize::new(1) });
        let config = QueueWorkerConfig::default().with_batch_size(2);
        let worker = QueueWorker::with_config(broker.clone(), "q", handler, config);

        assert_eq!(worker.process_batch().await.unwrap().acked, 2);
        assert_eq!(broker.queue_depth("q").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn run_drains_final_batch_on_shutdown() {
        let broker = broker_with_queue().await;
        let handler = Arc::new(FailFirst { calls: AtomicUsize::new(1) });
        let config = QueueWorkerConfig::default().with_poll_interval(Duration::from_secs(3600));
        let worker = QueueWorker::with_config(broker.clone(), "q", handler, config);
        let (tx, rx) = watch::channel(false);

        let task = tokio::spawn(async move { worker.run(rx).await });
        tokio::task::yield_now().await;
        broker.publish("ex", EventEnvelope::new("k", json!({}))).await;
        tx.send(true).unwrap();
        task.await.unwrap();

        assert_eq!(broker.queue_depth("q").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn missing_queue_surfaces_broker_error() {
        let broker = Arc::new(InMemoryBroker::new());
        let handler = Arc::new(FailFirst { calls: AtomicUsize::new(1) });
        let worker = QueueWorker::new(broker, "nope", handler);
        assert!(worker.process_batch().await.is_err());
    }
}
