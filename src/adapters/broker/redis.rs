//! Redis-backed broker for multi-process deployments.
//!
//! Topology lives in-process (each process declares the same canonical
//! topology at startup); queue contents live in Redis lists so they survive
//! restarts:
//!
//! - `{prefix}:queue:{name}` - ready messages (LPUSH in, RPOP out)
//! - `{prefix}:queue:{name}:processing` - fetched, not yet settled
//!
//! A publish pushes every copy in one `MULTI/EXEC`, so consumers never see a
//! partially routed event. Fetch is `RPOPLPUSH` into the processing list;
//! ack is `LREM`; requeue moves the message back to the ready list with its
//! redelivered flag set.
//!
//! A publish that matches no queue still round-trips a `PING`, so an
//! unreachable server is reported the same way whether or not the event
//! routes anywhere.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, RwLock};

use crate::domain::routing::{
    Binding, Delivery, DeliveryOutcome, EventEnvelope, ExchangeSpec, QueueSpec, RejectReason,
    Topology, TopologyError,
};
use crate::ports::{BrokerError, MessageBroker};

#[derive(Debug, Serialize, Deserialize)]
struct StoredMessage {
    envelope: EventEnvelope,
    #[serde(default)]
    redelivered: bool,
}

#[derive(Debug, Clone)]
struct InFlight {
    queue: String,
    raw: String,
    envelope: EventEnvelope,
}

/// Deliveries handed out by this process and not yet settled.
///
/// An entry is only forgotten after Redis confirmed the settle, so a failed
/// ack or requeue can be retried with the same delivery.
#[derive(Debug, Default)]
struct InFlightTable {
    entries: Mutex<HashMap<u64, InFlight>>,
}

impl InFlightTable {
    async fn insert(&self, tag: u64, entry: InFlight) {
        self.entries.lock().await.insert(tag, entry);
    }

    async fn lookup(&self, delivery: &Delivery) -> Result<InFlight, BrokerError> {
        self.entries
            .lock()
            .await
            .get(&delivery.delivery_tag)
            .filter(|entry| entry.queue == delivery.queue)
            .cloned()
            .ok_or_else(|| BrokerError::UnknownDelivery {
                queue: delivery.queue.clone(),
                tag: delivery.delivery_tag,
            })
    }

    async fn settle(&self, delivery: &Delivery) {
        self.entries.lock().await.remove(&delivery.delivery_tag);
    }
}

fn unavailable(e: redis::RedisError) -> BrokerError {
    BrokerError::Unavailable(e.to_string())
}

fn encode(envelope: &EventEnvelope, redelivered: bool) -> Result<String, BrokerError> {
    serde_json::to_string(&StoredMessage {
        envelope: envelope.clone(),
        redelivered,
    })
    .map_err(|e| BrokerError::CorruptMessage(e.to_string()))
}

pub struct RedisBroker {
    conn: MultiplexedConnection,
    key_prefix: String,
    topology: RwLock<Topology>,
    in_flight: InFlightTable,
    next_tag: AtomicU64,
}

impl RedisBroker {
    pub fn new(conn: MultiplexedConnection, key_prefix: impl Into<String>) -> Self {
        Self {
            conn,
            key_prefix: key_prefix.into(),
            topology: RwLock::new(Topology::new()),
            in_flight: InFlightTable::default(),
            next_tag: AtomicU64::new(1),
        }
    }

    /// Opens a multiplexed connection to `url`.
    pub async fn connect(url: &str, key_prefix: impl Into<String>) -> Result<Self, BrokerError> {
        let client = redis::Client::open(url).map_err(unavailable)?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(unavailable)?;
        Ok(Self::new(conn, key_prefix))
    }

    fn ready_key(&self, queue: &str) -> String {
        format!("{}:queue:{}", self.key_prefix, queue)
    }

    fn processing_key(&self, queue: &str) -> String {
        format!("{}:queue:{}:processing", self.key_prefix, queue)
    }

    async fn ensure_queue(&self, queue: &str) -> Result<(), BrokerError> {
        if self.topology.read().await.has_queue(queue) {
            Ok(())
        } else {
            Err(TopologyError::QueueNotFound(queue.to_string()).into())
        }
    }

    /// Moves messages left in the processing list by a previous process
    /// back to the ready list.
    async fn recover_processing(&self, queue: &str) -> Result<usize, BrokerError> {
        let mut conn = self.conn.clone();
        let processing = self.processing_key(queue);
        let ready = self.ready_key(queue);
        let mut recovered = 0;

        loop {
            let moved: Option<String> = conn
                .rpoplpush(&processing, &ready)
                .await
                .map_err(unavailable)?;
            if moved.is_none() {
                break;
            }
            recovered += 1;
        }

        if recovered > 0 {
            tracing::warn!(queue, recovered, "Recovered unsettled messages");
        }
        Ok(recovered)
    }
}

#[async_trait]
impl MessageBroker for RedisBroker {
    async fn declare_exchange(&self, spec: ExchangeSpec) -> Result<(), BrokerError> {
        let name = spec.name.clone();
        if self.topology.write().await.declare_exchange(spec)? {
            tracing::debug!(exchange = %name, "Declared exchange");
        }
        Ok(())
    }

    async fn declare_queue(&self, spec: QueueSpec) -> Result<(), BrokerError> {
        let name = spec.name.clone();
        let created = self.topology.write().await.declare_queue(spec)?;
        if created {
            self.recover_processing(&name).await?;
            tracing::debug!(queue = %name, "Declared queue");
        }
        Ok(())
    }

    async fn bind(&self, binding: Binding) -> Result<(), BrokerError> {
        self.topology.write().await.bind(binding)?;
        Ok(())
    }

    async fn publish(&self, exchange: &str, envelope: EventEnvelope) -> DeliveryOutcome {
        let targets = match self.topology.read().await.route(exchange, &envelope.routing_key) {
            Ok(targets) => targets,
            Err(_) => {
                return DeliveryOutcome::Rejected(RejectReason::UnknownExchange(
                    exchange.to_string(),
                ))
            }
        };
        let mut conn = self.conn.clone();
        if targets.is_empty() {
            return match redis::cmd("PING").query_async::<_, String>(&mut conn).await {
                Ok(_) => DeliveryOutcome::Confirmed { routed: 0 },
                Err(e) => {
                    tracing::error!(exchange, error = %e, "Broker unreachable");
                    DeliveryOutcome::Rejected(RejectReason::BrokerUnavailable(e.to_string()))
                }
            };
        }

        let raw = match encode(&envelope, false) {
            Ok(raw) => raw,
            Err(e) => return DeliveryOutcome::Rejected(RejectReason::BrokerUnavailable(e.to_string())),
        };

        let mut pipe = redis::pipe();
        pipe.atomic();
        for queue in &targets {
            pipe.lpush(self.ready_key(queue), &raw).ignore();
        }

        match pipe.query_async::<_, ()>(&mut conn).await {
            Ok(()) => DeliveryOutcome::Confirmed {
                routed: targets.len(),
            },
            Err(e) => {
                tracing::error!(exchange, routing_key = %envelope.routing_key, error = %e, "Publish failed");
                DeliveryOutcome::Rejected(RejectReason::BrokerUnavailable(e.to_string()))
            }
        }
    }

    async fn fetch(&self, queue: &str) -> Result<Option<Delivery>, BrokerError> {
        self.ensure_queue(queue).await?;

        let mut conn = self.conn.clone();
        let raw: Option<String> = conn
            .rpoplpush(self.ready_key(queue), self.processing_key(queue))
            .await
            .map_err(unavailable)?;
        let Some(raw) = raw else {
            return Ok(None);
        };

        let stored: StoredMessage = match serde_json::from_str(&raw) {
            Ok(stored) => stored,
            Err(e) => {
                // Unreadable entries would block the queue forever; drop them.
                let _: i64 = conn
                    .lrem(self.processing_key(queue), 1, &raw)
                    .await
                    .map_err(unavailable)?;
                tracing::error!(queue, error = %e, "Discarded corrupt message");
                return Err(BrokerError::CorruptMessage(e.to_string()));
            }
        };

        let delivery_tag = self.next_tag.fetch_add(1, Ordering::SeqCst);
        self.in_flight
            .insert(
                delivery_tag,
                InFlight {
                    queue: queue.to_string(),
                    raw,
                    envelope: stored.envelope.clone(),
                },
            )
            .await;

        Ok(Some(Delivery {
            queue: queue.to_string(),
            delivery_tag,
            envelope: stored.envelope,
            redelivered: stored.redelivered,
        }))
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), BrokerError> {
        let entry = self.in_flight.lookup(delivery).await?;
        let mut conn = self.conn.clone();
        let _: i64 = conn
            .lrem(self.processing_key(&entry.queue), 1, &entry.raw)
            .await
            .map_err(unavailable)?;
        self.in_flight.settle(delivery).await;
        Ok(())
    }

    async fn requeue(&self, delivery: &Delivery) -> Result<(), BrokerError> {
        let entry = self.in_flight.lookup(delivery).await?;
        let redelivered = encode(&entry.envelope, true)?;

        let mut conn = self.conn.clone();
        redis::pipe()
            .atomic()
            .lrem(self.processing_key(&entry.queue), 1, &entry.raw)
            .ignore()
            .lpush(self.ready_key(&entry.queue), &redelivered)
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(unavailable)?;
        self.in_flight.settle(delivery).await;
        Ok(())
    }

    async fn queue_depth(&self, queue: &str) -> Result<usize, BrokerError> {
        self.ensure_queue(queue).await?;
        let mut conn = self.conn.clone();
        conn.llen(self.ready_key(queue)).await.map_err(unavailable)
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
