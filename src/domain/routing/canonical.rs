//! The process-wide topology declared at startup.

use super::{Binding, ExchangeSpec, QueueSpec, Topology, TopologyError};

pub mod exchanges {
    pub const MEDICATIONS: &str = "medications-exchange";
    pub const INTERACTIONS: &str = "interactions-exchange";
    pub const MEDICATIONS_FANOUT: &str = "medications-fanout";
    pub const ANALYTICS_FANOUT: &str = "analytics-fanout";
}

pub mod queues {
    pub const MEDICATION_AUDIT: &str = "medication-audit-queue";
    pub const INTERACTION_AUDIT: &str = "interaction-audit-queue";
    pub const AUDIT_MEDICATIONS: &str = "q.audit.medications";
    pub const NOTIFICATION_MEDICATIONS: &str = "q.notification.medications";
    pub const ANALYTICS_MEDICATIONS: &str = "q.analytics.medications";
    pub const ANALYTICS_RATINGS: &str = "q.analytics.ratings";
}

pub mod routing_keys {
    pub const MEDICATION_CREATED: &str = "medication.created";
    pub const MEDICATION_UPDATED: &str = "medication.updated";
    pub const MEDICATION_DELETED: &str = "medication.deleted";
    pub const MEDICATION_EXPIRING: &str = "medication.expiring";
    pub const MEDICATION_LOW_STOCK: &str = "medication.low-stock";
    pub const INTERACTION_CHECKED: &str = "interaction.checked";
    pub const RATING_SUBMITTED: &str = "rating.submitted";
}

/// Declarations in the order they must be applied: exchanges, queues,
/// then bindings.
#[derive(Debug, Clone)]
pub struct CanonicalTopology {
    pub exchanges: Vec<ExchangeSpec>,
    pub queues: Vec<QueueSpec>,
    pub bindings: Vec<Binding>,
}

impl CanonicalTopology {
    pub fn standard() -> Self {
        use exchanges::*;
        use queues::*;

        Self {
            exchanges: vec![
                ExchangeSpec::topic(MEDICATIONS),
                ExchangeSpec::topic(INTERACTIONS),
                ExchangeSpec::fanout(MEDICATIONS_FANOUT),
                ExchangeSpec::fanout(ANALYTICS_FANOUT),
            ],
            queues: [
                MEDICATION_AUDIT,
                INTERACTION_AUDIT,
                AUDIT_MEDICATIONS,
                NOTIFICATION_MEDICATIONS,
                ANALYTICS_MEDICATIONS,
                ANALYTICS_RATINGS,
            ]
            .into_iter()
            .map(QueueSpec::durable)
            .collect(),
            bindings: vec![
                Binding::new(MEDICATIONS, MEDICATION_AUDIT, "medication.#"),
                Binding::new(INTERACTIONS, INTERACTION_AUDIT, routing_keys::INTERACTION_CHECKED),
                Binding::fanout(MEDICATIONS_FANOUT, AUDIT_MEDICATIONS),
                Binding::new(MEDICATIONS, NOTIFICATION_MEDICATIONS, "medication.#"),
                Binding::new(INTERACTIONS, NOTIFICATION_MEDICATIONS, "interaction.#"),
                Binding::new(MEDICATIONS, ANALYTICS_MEDICATIONS, routing_keys::MEDICATION_CREATED),
                Binding::new(
                    INTERACTIONS,
                    ANALYTICS_MEDICATIONS,
                    routing_keys::INTERACTION_CHECKED,
                ),
                Binding::fanout(ANALYTICS_FANOUT, ANALYTICS_RATINGS),
            ],
        }
    }

    /// Applies every declaration to an in-process topology.
    pub fn apply(&self, topology: &mut Topology) -> Result<(), TopologyError> {
        for exchange in &self.exchanges {
            topology.declare_exchange(exchange.clone())?;
        }
        for queue in &self.queues {
            topology.declare_queue(queue.clone())?;
        }
        for binding in &self.bindings {
            topology.bind(binding.clone())?;
        }
        Ok(())
    }
}
