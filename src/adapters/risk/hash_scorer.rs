//! Deterministic scorer backed by a small contraindication table.
//!
//! The level is derived from a stable hash of the lowercased name, so the
//! same medication always scores the same across processes and restarts.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::domain::medication::{RiskAssessment, Severity};
use crate::ports::RiskScorer;

static CONTRAINDICATIONS: Lazy<HashMap<&'static str, &'static [&'static str]>> = Lazy::new(|| {
    let mut table: HashMap<&'static str, &'static [&'static str]> = HashMap::new();
    table.insert("warfarin", &["aspirin", "ibuprofen", "naproxen"]);
    table.insert("simvastatin", &["clarithromycin", "itraconazole", "cyclosporine"]);
    table.insert("digoxin", &["quinidine", "verapamil", "amiodarone"]);
    table.insert("levothyroxine", &["calcium", "iron", "omeprazole"]);
    table
});

#[derive(Debug, Clone, Copy, Default)]
pub struct HashRiskScorer;

impl HashRiskScorer {
    pub fn new() -> Self {
        Self
    }

    /// 31-multiplier string hash over UTF-16 code units with i32 wrapping.
    fn stable_hash(name: &str) -> i32 {
        name.encode_utf16()
            .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(i32::from(unit)))
    }

    fn level_for(name: &str) -> u8 {
        // |h % 10| is 0..=9
        (Self::stable_hash(name) % 10).unsigned_abs() as u8 + 1
    }

    pub fn contraindications_for(name: &str) -> Vec<String> {
        CONTRAINDICATIONS
            .get(name)
            .map(|drugs| drugs.iter().map(|d| d.to_string()).collect())
            .unwrap_or_default()
    }
}

impl RiskScorer for HashRiskScorer {
    fn score(&self, medication_name: &str) -> RiskAssessment {
        let name = medication_name.trim().to_lowercase();
        let risk_level = Self::level_for(&name);

        RiskAssessment {
            risk_level,
            severity: Severity::from_risk_level(risk_level),
            contraindications: Self::contraindications_for(&name),
        }
    }
}
