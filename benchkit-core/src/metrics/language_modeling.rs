//! Log-likelihood based language modeling metrics.

use std::f64::consts::LN_2;

use crate::adapter::{AdapterSpec, RequestState};
use crate::error::MetricError;
use crate::metric::{Metric, get_unique_stat_by_name};
use crate::metric_name::MetricName;
use crate::stat::{Stat, StatMap};

pub const LOGPROB: &str = "logprob";
pub const NUM_TOKENS: &str = "num_tokens";
pub const NUM_BYTES: &str = "num_bytes";
pub const PERPLEXITY: &str = "perplexity";
pub const LOGPROB_PER_BYTE: &str = "logprob_per_byte";
pub const BITS_PER_BYTE: &str = "bits_per_byte";

/// Scores echoed prompt tokens and derives perplexity and bits-per-byte.
#[derive(Debug, Clone, Default)]
pub struct LanguageModelingMetric;

impl LanguageModelingMetric {
    pub fn new() -> Self {
        Self
    }
}

fn sum_of(stats: &StatMap, name: &str) -> Option<f64> {
    get_unique_stat_by_name(stats.values(), name)
        .ok()
        .flatten()
        .filter(|s| s.count > 0)
        .map(|s| s.sum)
}

impl Metric for LanguageModelingMetric {
    fn name(&self) -> &str {
        "language_modeling"
    }

    fn evaluate_generation(
        &self,
        _adapter_spec: &AdapterSpec,
        request_state: &RequestState,
    ) -> Result<Vec<Stat>, MetricError> {
        let Some(completion) = request_state
            .result
            .as_ref()
            .and_then(|r| r.first_completion())
        else {
            tracing::warn!(
                instance = %request_state.instance.id,
                "Skipping language modeling request without a successful result"
            );
            return Ok(Vec::new());
        };

        let logprob: f64 = completion.tokens.iter().map(|t| t.logprob).sum();
        Ok(vec![
            Stat::from_value(MetricName::new(LOGPROB), logprob),
            Stat::from_value(MetricName::new(NUM_TOKENS), completion.tokens.len() as f64),
            Stat::from_value(
                MetricName::new(NUM_BYTES),
                request_state.request.prompt.len() as f64,
            ),
        ])
    }

    fn derive_stats(&self, stats: &StatMap) -> Vec<Stat> {
        let mut derived = Vec::new();
        let Some(logprob) = sum_of(stats, LOGPROB) else {
            return derived;
        };
        if let Some(num_tokens) = sum_of(stats, NUM_TOKENS).filter(|&n| n > 0.0) {
            derived.push(Stat::from_value(
                MetricName::new(PERPLEXITY),
                (-logprob / num_tokens).exp(),
            ));
        }
        if let Some(num_bytes) = sum_of(stats, NUM_BYTES).filter(|&n| n > 0.0) {
            derived.push(Stat::from_value(
                MetricName::new(LOGPROB_PER_BYTE),
                logprob / num_bytes,
            ));
            derived.push(Stat::from_value(
                MetricName::new(BITS_PER_BYTE),
                -logprob / num_bytes / LN_2,
            ));
        }
        derived
    }
}
