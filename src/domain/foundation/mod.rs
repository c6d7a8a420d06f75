//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, timestamps and error types used across the
//! routing and notification halves of the crate.

mod errors;
mod ids;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{ConnectionId, EventId, UserId};
pub use timestamp::Timestamp;
