//! RiskScorer port - Interaction risk assessment.

use crate::domain::medication::RiskAssessment;

/// Scores a medication for interaction risk.
///
/// Implementations return a level in 1..=10 with the matching severity tier
/// and any known contraindications.
pub trait RiskScorer: Send + Sync {
    fn score(&self, medication_name: &str) -> RiskAssessment;
}
