//! Built-in metrics and their registry.

pub mod basic;
pub mod classification;
pub mod language_modeling;
pub mod ranking;
pub mod registry;

pub use basic::BasicGenerationMetric;
pub use classification::ClassificationMetric;
pub use language_modeling::LanguageModelingMetric;
pub use ranking::ReferenceRankingMetric;
pub use registry::{METRIC_NAMES, MetricSpec, create_metric};
