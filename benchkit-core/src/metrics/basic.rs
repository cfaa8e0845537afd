//! Exact-match style scoring of free-form generations.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::adapter::{AdapterSpec, RequestState};
use crate::error::MetricError;
use crate::metric::Metric;
use crate::metric_name::MetricName;
use crate::stat::Stat;

pub const EXACT_MATCH: &str = "exact_match";
pub const QUASI_EXACT_MATCH: &str = "quasi_exact_match";
pub const PREFIX_EXACT_MATCH: &str = "prefix_exact_match";
pub const NUM_OUTPUT_TOKENS: &str = "num_output_tokens";
pub const NUM_COMPLETIONS: &str = "num_completions";

static PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[[:punct:]]").expect("valid punctuation regex"));
static ARTICLES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(a|an|the)\b").expect("valid article regex"));

/// Lower-case, drop punctuation and articles, collapse whitespace.
pub fn normalize_text(text: &str) -> String {
    let lowered = text.to_lowercase();
    let no_punct = PUNCTUATION.replace_all(&lowered, "");
    let no_articles = ARTICLES.replace_all(&no_punct, " ");
    no_articles.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn exact_match(gold: &str, pred: &str) -> f64 {
    if gold.trim() == pred.trim() { 1.0 } else { 0.0 }
}

fn quasi_exact_match(gold: &str, pred: &str) -> f64 {
    if normalize_text(gold) == normalize_text(pred) {
        1.0
    } else {
        0.0
    }
}

fn prefix_exact_match(gold: &str, pred: &str) -> f64 {
    if pred.trim().starts_with(gold.trim()) {
        1.0
    } else {
        0.0
    }
}

/// Arguments accepted through a metric spec.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BasicGenerationArgs {
    /// Restrict output to these stat names; empty means all.
    #[serde(default)]
    pub names: Vec<String>,
}

/// Compares the first completion against the instance's correct references.
#[derive(Debug, Clone, Default)]
pub struct BasicGenerationMetric {
    args: BasicGenerationArgs,
}

impl BasicGenerationMetric {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_args(args: BasicGenerationArgs) -> Self {
        Self { args }
    }

    fn wanted(&self, name: &str) -> bool {
        self.args.names.is_empty() || self.args.names.iter().any(|n| n == name)
    }
}

impl Metric for BasicGenerationMetric {
    fn name(&self) -> &str {
        "basic_generation"
    }

    fn evaluate_generation(
        &self,
        _adapter_spec: &AdapterSpec,
        request_state: &RequestState,
    ) -> Result<Vec<Stat>, MetricError> {
        let instance = &request_state.instance;
        let Some(result) = request_state.result.as_ref().filter(|r| r.success) else {
            tracing::warn!(instance = %instance.id, "Skipping failed or missing request result");
            return Ok(Vec::new());
        };
        let Some(completion) = result.completions.first() else {
            return Ok(Vec::new());
        };

        let golds: Vec<&str> = instance
            .references
            .iter()
            .filter(|r| r.is_correct())
            .map(|r| r.output.text.as_str())
            .collect();

        let mut stats = Vec::new();
        if !golds.is_empty() {
            let scorers: [(&str, fn(&str, &str) -> f64); 3] = [
                (EXACT_MATCH, exact_match),
                (QUASI_EXACT_MATCH, quasi_exact_match),
                (PREFIX_EXACT_MATCH, prefix_exact_match),
            ];
            for (name, score) in scorers {
                // best score over all correct references
                let best = golds
                    .iter()
                    .map(|gold| score(gold, &completion.text))
                    .fold(0.0, f64::max);
                stats.push(Stat::from_value(MetricName::new(name), best));
            }
        }
        stats.push(Stat::from_value(
            MetricName::new(NUM_OUTPUT_TOKENS),
            completion.tokens.len() as f64,
        ));
        stats.push(Stat::from_value(
            MetricName::new(NUM_COMPLETIONS),
            result.completions.len() as f64,
        ));

        stats.retain(|s| self.wanted(&s.name.name));
        Ok(stats)
    }
}
