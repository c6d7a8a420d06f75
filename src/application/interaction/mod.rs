//! Interaction risk checks published to the interactions exchange.

mod check_interaction;

pub use check_interaction::{
    CheckInteractionCommand, CheckInteractionError, CheckInteractionResult, InteractionChecker,
};
