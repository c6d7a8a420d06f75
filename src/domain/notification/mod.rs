//! Client-facing notifications and their JSON wire form.

mod message;
mod wire;

pub use message::{
    ExpirationNotice, HelpNotice, InteractionNotice, MedicationNotice, Notification, PongNotice,
    Priority, StatsNotice, StockNotice, SystemKind, SystemNotice,
};
pub use wire::{render, RenderError};
