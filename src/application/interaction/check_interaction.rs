//! InteractionChecker - scores a medication and publishes the result.

use std::sync::Arc;
use thiserror::Error;

use crate::application::routing::EventPublisher;
use crate::domain::foundation::ValidationError;
use crate::domain::medication::DrugInteractionChecked;
use crate::domain::routing::{DeliveryOutcome, RejectReason};
use crate::ports::RiskScorer;

#[derive(Debug, Clone)]
pub struct CheckInteractionCommand {
    pub medication_id: i64,
    pub medication_name: String,
}

#[derive(Debug, Clone)]
pub struct CheckInteractionResult {
    pub event: DrugInteractionChecked,
    pub routed: usize,
}

#[derive(Debug, Error)]
pub enum CheckInteractionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("failed to encode event: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("publish rejected: {0}")]
    Rejected(RejectReason),
}

pub struct InteractionChecker {
    scorer: Arc<dyn RiskScorer>,
    publisher: Arc<EventPublisher>,
}

impl InteractionChecker {
    pub fn new(scorer: Arc<dyn RiskScorer>, publisher: Arc<EventPublisher>) -> Self {
        Self { scorer, publisher }
    }

    pub async fn handle(
        &self,
        cmd: CheckInteractionCommand,
    ) -> Result<CheckInteractionResult, CheckInteractionError> {
        let name = cmd.medication_name.trim();
        if name.is_empty() {
            return Err(ValidationError::empty_field("medication_name").into());
        }

        let assessment = self.scorer.score(name);
        let event = DrugInteractionChecked {
            medication_id: cmd.medication_id,
            medication_name: name.to_string(),
            risk_level: assessment.risk_level,
            severity: assessment.severity,
            recommendation: assessment.recommendation().to_string(),
            contraindications: assessment.contraindications,
        };

        match self.publisher.publish_event(&event).await? {
            DeliveryOutcome::Confirmed { routed } => Ok(CheckInteractionResult { event, routed }),
            DeliveryOutcome::Rejected(reason) => Err(CheckInteractionError::Rejected(reason)),
        }
    }
}
