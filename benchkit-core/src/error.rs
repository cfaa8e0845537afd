//! Error types for the benchkit core library.
//!
//! Uses `thiserror` for structured variants covering metric evaluation,
//! the metric registry, model loading, and configuration.

use std::path::PathBuf;

/// Top-level error type for the benchkit core library.
#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    #[error("Metric error: {0}")]
    Metric(#[from] MetricError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised while evaluating metrics over a scenario state.
///
/// The invariant variants (`MultipleGenerationRequests`, `DuplicateIdentity`,
/// `DuplicatePerturbation`, `MissingPerturbation`) mean the upstream request
/// states are malformed. They abort the evaluation; no partial result is kept.
#[derive(Debug, thiserror::Error)]
pub enum MetricError {
    #[error(
        "Instance '{instance_id}' has {count} generation request states in trial {trial}, expected at most one"
    )]
    MultipleGenerationRequests {
        instance_id: String,
        trial: usize,
        count: usize,
    },

    #[error("Metric '{metric}' has more than one identity stat for instance '{instance_id}'")]
    DuplicateIdentity { metric: String, instance_id: String },

    #[error(
        "Metric '{metric}' has perturbation '{perturbation}' more than once for instance '{instance_id}'"
    )]
    DuplicatePerturbation {
        metric: String,
        instance_id: String,
        perturbation: String,
    },

    #[error("Stat '{metric}' has no perturbation")]
    MissingPerturbation { metric: String },

    #[error("Expected a unique stat named '{name}', found {count}")]
    NonUniqueStat { name: String, count: usize },

    #[error("Unknown metric: {name}")]
    UnknownMetric { name: String },

    #[error("Unknown model: {model}")]
    UnknownModel { model: String },

    #[error("Failed to load model '{model}': {message}")]
    ModelLoad { model: String, message: String },

    #[error("Invalid metric spec: {message}")]
    InvalidSpec { message: String },
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Configuration parse error: {0}")]
    Parse(#[from] Box<figment::Error>),
}

pub type Result<T> = std::result::Result<T, BenchError>;
