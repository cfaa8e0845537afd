//! # benchkit-core — metric aggregation for model benchmarks
//!
//! Takes the resolved model requests of a benchmark run and reduces them to
//! statistics:
//!
//! - [`stat`]: running accumulators and the `merge_stat` reduction primitive
//! - [`metric_name`] / [`perturbation`]: names qualified by split, sub-split and perturbation
//! - [`adapter`]: request states indexed by trial, instance and reference
//! - [`metric`]: the scorer trait and the evaluation engine
//! - [`worst_case`]: worst-case robustness and fairness statistics
//! - [`metrics`]: built-in scorers and the metric registry

pub mod adapter;
pub mod config;
pub mod error;
pub mod grouping;
pub mod metric;
pub mod metric_name;
pub mod metrics;
pub mod model_cache;
pub mod perturbation;
pub mod request;
pub mod scenario;
pub mod scenarios;
pub mod stat;
pub mod worst_case;

// Re-exports
pub use adapter::{AdaptationMethod, AdapterSpec, RequestState, ScenarioState};
pub use config::{BenchConfig, load_config};
pub use error::{BenchError, ConfigError, MetricError};
pub use metric::{Metric, MetricResult, PerInstanceStats, PerInstanceStatsKey};
pub use metric_name::{MetricContext, MetricName};
pub use metrics::{MetricSpec, create_metric};
pub use model_cache::ModelCache;
pub use perturbation::PerturbationDescription;
pub use scenario::{Instance, InstanceKey, Reference, Scenario};
pub use stat::{Stat, StatMap, add_context, merge_stat};
