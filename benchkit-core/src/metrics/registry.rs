//! Explicit registration of the built-in metrics.

use serde::{Deserialize, Serialize};

use crate::error::MetricError;
use crate::metric::Metric;
use crate::metrics::basic::{BasicGenerationArgs, BasicGenerationMetric};
use crate::metrics::classification::ClassificationMetric;
use crate::metrics::language_modeling::LanguageModelingMetric;
use crate::metrics::ranking::ReferenceRankingMetric;

/// Names accepted by [`create_metric`].
pub const METRIC_NAMES: &[&str] = &[
    "basic_generation",
    "language_modeling",
    "classification",
    "reference_ranking",
];

/// Specifies how to create a metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSpec {
    pub class_name: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub args: serde_json::Value,
}

impl MetricSpec {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            args: serde_json::Value::Null,
        }
    }

    pub fn with_args(mut self, args: serde_json::Value) -> Self {
        self.args = args;
        self
    }
}

fn parse_args<T: Default + for<'de> Deserialize<'de>>(spec: &MetricSpec) -> Result<T, MetricError> {
    if spec.args.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(spec.args.clone()).map_err(|e| MetricError::InvalidSpec {
        message: format!("{}: {e}", spec.class_name),
    })
}

/// Build the metric named by `spec`.
pub fn create_metric(spec: &MetricSpec) -> Result<Box<dyn Metric>, MetricError> {
    let metric: Box<dyn Metric> = match spec.class_name.as_str() {
        "basic_generation" => Box::new(BasicGenerationMetric::with_args(parse_args::<
            BasicGenerationArgs,
        >(spec)?)),
        "language_modeling" => Box::new(LanguageModelingMetric::new()),
        "classification" => Box::new(ClassificationMetric::new()),
        "reference_ranking" => Box::new(ReferenceRankingMetric::new()),
        other => {
            return Err(MetricError::UnknownMetric {
                name: other.to_string(),
            });
        }
    };
    tracing::debug!(metric = metric.name(), "Created metric");
    Ok(metric)
}
