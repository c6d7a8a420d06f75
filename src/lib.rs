//! Pharma Relay - event routing and real-time notifications for the
//! medication catalog.
//!
//! Catalog producers publish domain events to named exchanges; the router
//! copies each event into every queue whose binding matches its routing
//! key. Queue consumers audit, aggregate, or push the events to connected
//! WebSocket clients.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
