//! Domain layer: entities, value types, and ports (traits) with zero
//! infrastructure dependencies beyond `serde`/`chrono`/`uuid`.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult, OrchestratorError};
