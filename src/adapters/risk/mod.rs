//! RiskScorer adapters.

mod hash_scorer;

pub use hash_scorer::HashRiskScorer;
