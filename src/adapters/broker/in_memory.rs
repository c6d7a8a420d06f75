//! In-memory broker for single-process deployments and testing.
//!
//! One async mutex guards topology and queues, so a publish stores all of
//! its copies before any consumer can observe the first one.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use crate::domain::routing::{
    Binding, Delivery, DeliveryOutcome, EventEnvelope, ExchangeSpec, QueueSpec, RejectReason,
    Topology, TopologyError,
};
use crate::ports::{BrokerError, MessageBroker};

#[derive(Debug)]
struct Ready {
    envelope: EventEnvelope,
    redelivered: bool,
}

#[derive(Debug, Default)]
struct QueueState {
    ready: VecDeque<Ready>,
    unacked: HashMap<u64, EventEnvelope>,
}

#[derive(Debug, Default)]
struct BrokerState {
    topology: Topology,
    queues: HashMap<String, QueueState>,
    next_tag: u64,
}

impl BrokerState {
    fn queue_mut(&mut self, name: &str) -> Result<&mut QueueState, BrokerError> {
        self.queues
            .get_mut(name)
            .ok_or_else(|| TopologyError::QueueNotFound(name.to_string()).into())
    }
}

/// In-memory message broker.
///
/// Use `set_available(false)` to simulate an outage; every operation then
/// fails with `BrokerUnavailable`.
#[derive(Debug)]
pub struct InMemoryBroker {
    state: Mutex<BrokerState>,
    available: AtomicBool,
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self {
            state: Mutex::new(BrokerState::default()),
            available: AtomicBool::new(true),
        }
    }
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<(), BrokerError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BrokerError::Unavailable("in-memory broker is offline".to_string()))
        }
    }

    /// Fetched but not yet settled deliveries on a queue.
    pub async fn unacked_count(&self, queue: &str) -> usize {
        self.state
            .lock()
            .await
            .queues
            .get(queue)
            .map(|q| q.unacked.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl MessageBroker for InMemoryBroker {
    async fn declare_exchange(&self, spec: ExchangeSpec) -> Result<(), BrokerError> {
        self.ensure_available()?;
        let mut state = self.state.lock().await;
        if state.topology.declare_exchange(spec.clone())? {
            tracing::debug!(exchange = %spec.name, kind = %spec.kind, "Declared exchange");
        }
        Ok(())
    }

    async fn declare_queue(&self, spec: QueueSpec) -> Result<(), BrokerError> {
        self.ensure_available()?;
        let mut state = self.state.lock().await;
        if state.topology.declare_queue(spec.clone())? {
            state.queues.entry(spec.name.clone()).or_default();
            tracing::debug!(queue = %spec.name, durable = spec.durable, "Declared queue");
        }
        Ok(())
    }

    async fn bind(&self, binding: Binding) -> Result<(), BrokerError> {
        self.ensure_available()?;
        let mut state = self.state.lock().await;
        if state.topology.bind(binding.clone())? {
            tracing::debug!(
                exchange = %binding.exchange,
                queue = %binding.queue,
                pattern = %binding.pattern,
                "Bound queue"
            );
        }
        Ok(())
    }

    async fn publish(&self, exchange: &str, envelope: EventEnvelope) -> DeliveryOutcome {
        if let Err(e) = self.ensure_available() {
            return DeliveryOutcome::Rejected(RejectReason::BrokerUnavailable(e.to_string()));
        }

        let mut state = self.state.lock().await;
        let targets = match state.topology.route(exchange, &envelope.routing_key) {
            Ok(targets) => targets,
            Err(_) => {
                return DeliveryOutcome::Rejected(RejectReason::UnknownExchange(
                    exchange.to_string(),
                ))
            }
        };

        for queue in &targets {
            state.queues.entry(queue.clone()).or_default().ready.push_back(Ready {
                envelope: envelope.clone(),
                redelivered: false,
            });
        }

        DeliveryOutcome::Confirmed {
            routed: targets.len(),
        }
    }

    async fn fetch(&self, queue: &str) -> Result<Option<Delivery>, BrokerError> {
        self.ensure_available()?;
        let mut state = self.state.lock().await;
        let delivery_tag = state.next_tag + 1;

        let queue_state = state.queue_mut(queue)?;
        let Some(ready) = queue_state.ready.pop_front() else {
            return Ok(None);
        };
        queue_state.unacked.insert(delivery_tag, ready.envelope.clone());
        state.next_tag = delivery_tag;

        Ok(Some(Delivery {
            queue: queue.to_string(),
            delivery_tag,
            envelope: ready.envelope,
            redelivered: ready.redelivered,
        }))
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), BrokerError> {
        self.ensure_available()?;
        let mut state = self.state.lock().await;
        state
            .queue_mut(&delivery.queue)?
            .unacked
            .remove(&delivery.delivery_tag)
            .map(|_| ())
            .ok_or_else(|| BrokerError::UnknownDelivery {
                queue: delivery.queue.clone(),
                tag: delivery.delivery_tag,
            })
    }

    async fn requeue(&self, delivery: &Delivery) -> Result<(), BrokerError> {
        self.ensure_available()?;
        let mut state = self.state.lock().await;
        let queue_state = state.queue_mut(&delivery.queue)?;
        let envelope = queue_state
            .unacked
            .remove(&delivery.delivery_tag)
            .ok_or_else(|| BrokerError::UnknownDelivery {
                queue: delivery.queue.clone(),
                tag: delivery.delivery_tag,
            })?;
        queue_state.ready.push_back(Ready {
            envelope,
            redelivered: true,
        });
        Ok(())
    }

    async fn queue_depth(&self, queue: &str) -> Result<usize, BrokerError> {
        self.ensure_available()?;
        let mut state = self.state.lock().await;
        Ok(state.queue_mut(queue)?.ready.len())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
