//! Queue consumers for the audit and analytics queues.

mod analytics;
mod audit;

pub use analytics::{AnalyticsConsumer, AnalyticsSnapshot};
pub use audit::AuditConsumer;
