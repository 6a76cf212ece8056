//! Core domain types and pure calculation logic

pub mod config;
pub mod instrument;
pub mod log;
pub mod metrics;
pub mod series;

// Re-export main types for cleaner imports
pub use instrument::{InstrumentKind, InstrumentSpec};
pub use series::Point;
