//! Domain layer containing routing, notification and command types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (identifiers, timestamps, errors)
//! - `routing` - Exchange/queue/binding topology and topic matching
//! - `medication` - Domain events produced by the medication catalog
//! - `notification` - Client push notifications and their wire rendering
//! - `command` - Inbound client commands and per-connection state

pub mod command;
pub mod foundation;
pub mod medication;
pub mod notification;
pub mod routing;
