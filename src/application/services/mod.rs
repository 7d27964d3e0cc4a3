pub mod document;
pub mod reconciliation;
