//! Built-in scenarios.

pub mod race_based_med;

pub use race_based_med::{RaceBasedMedRow, RaceBasedMedScenario};
