//! Medication catalog events and interaction risk vocabulary.

mod events;
mod risk;

pub use events::{
    CatalogEvent, DrugInteractionChecked, MedicationCreated, MedicationDeleted, MedicationExpiring,
    MedicationUpdated, RoutedEvent, StockLevelLow, UserRated,
};
pub use risk::{recommendation_for, RiskAssessment, Severity};
