//! Inbound client commands and per-connection identification state.

mod parse;
mod state;

pub use parse::{ClientCommand, CommandError};
pub use state::ConnectionState;
