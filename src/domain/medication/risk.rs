use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Interaction severity tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Tier for a 1-10 risk level: above 7 is high, above 4 medium.
    pub fn from_risk_level(level: u8) -> Self {
        if level > 7 {
            Severity::High
        } else if level > 4 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(Severity::Low),
            "MEDIUM" => Ok(Severity::Medium),
            "HIGH" => Ok(Severity::High),
            _ => Err(ValidationError::invalid_format(
                "severity",
                "expected LOW, MEDIUM or HIGH",
            )),
        }
    }
}

/// Result of scoring a medication for interaction risk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub risk_level: u8,
    pub severity: Severity,
    pub contraindications: Vec<String>,
}

impl RiskAssessment {
    pub const MIN_LEVEL: u8 = 1;
    pub const MAX_LEVEL: u8 = 10;

    /// Builds an assessment whose severity follows from the level.
    pub fn new(risk_level: u8, contraindications: Vec<String>) -> Result<Self, ValidationError> {
        if !(Self::MIN_LEVEL..=Self::MAX_LEVEL).contains(&risk_level) {
            return Err(ValidationError::out_of_range(
                "risk_level",
                Self::MIN_LEVEL as i32,
                Self::MAX_LEVEL as i32,
                risk_level as i32,
            ));
        }
        Ok(Self {
            risk_level,
            severity: Severity::from_risk_level(risk_level),
            contraindications,
        })
    }

    pub fn recommendation(&self) -> &'static str {
        recommendation_for(self.risk_level, &self.contraindications)
    }
}

/// Advice text shown alongside an interaction check.
pub fn recommendation_for(risk_level: u8, contraindications: &[String]) -> &'static str {
    if risk_level > 7 {
        "CRITICAL INTERACTION: consult a physician before use."
    } else if risk_level > 4 {
        "MODERATE RISK: monitor when used together."
    } else if !contraindications.is_empty() {
        "LOW RISK: avoid combining with the listed medications."
    } else {
        "SAFE: no known critical interactions."
    }
}
