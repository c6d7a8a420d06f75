use crate::domain::routing::CanonicalTopology;
use crate::ports::{BrokerError, MessageBroker};

/// Declares every exchange, queue and binding of `topology` on the broker.
///
/// Safe to call on every startup; declarations are idempotent.
pub async fn declare_topology(
    broker: &dyn MessageBroker,
    topology: &CanonicalTopology,
) -> Result<(), BrokerError> {
    for exchange in &topology.exchanges {
        broker.declare_exchange(exchange.clone()).await?;
    }
    for queue in &topology.queues {
        broker.declare_queue(queue.clone()).await?;
    }
    for binding in &topology.bindings {
        broker.bind(binding.clone()).await?;
    }

    tracing::info!(
        broker = broker.name(),
        exchanges = topology.exchanges.len(),
        queues = topology.queues.len(),
        bindings = topology.bindings.len(),
        "Topology declared"
    );
    Ok(())
}
