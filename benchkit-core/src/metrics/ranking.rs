//! Multiple-choice scoring by comparing per-reference log probabilities.

use crate::adapter::{AdapterSpec, RequestState};
use crate::error::MetricError;
use crate::metric::Metric;
use crate::metric_name::MetricName;
use crate::request::GeneratedOutput;
use crate::stat::Stat;

pub const EXACT_MATCH: &str = "exact_match";
pub const CORRECT_RANK: &str = "correct_rank";

fn score(completion: &GeneratedOutput) -> f64 {
    if completion.tokens.is_empty() {
        completion.logprob
    } else {
        completion.tokens.iter().map(|t| t.logprob).sum()
    }
}

/// Ranks an instance's references by the log probability the model assigned
/// to each one (one request per reference).
#[derive(Debug, Clone, Default)]
pub struct ReferenceRankingMetric;

impl ReferenceRankingMetric {
    pub fn new() -> Self {
        Self
    }
}

impl Metric for ReferenceRankingMetric {
    fn name(&self) -> &str {
        "reference_ranking"
    }

    fn evaluate_references(
        &self,
        _adapter_spec: &AdapterSpec,
        reference_request_states: &[&RequestState],
    ) -> Result<Vec<Stat>, MetricError> {
        let mut scored: Vec<(f64, bool)> = Vec::with_capacity(reference_request_states.len());
        for rs in reference_request_states {
            let completion = rs.result.as_ref().and_then(|r| r.first_completion());
            let (Some(completion), Some(index)) = (completion, rs.reference_index) else {
                tracing::warn!(
                    instance = %rs.instance.id,
                    "Skipping instance with a failed reference request"
                );
                return Ok(Vec::new());
            };
            let is_correct = rs
                .instance
                .references
                .get(index)
                .is_some_and(|r| r.is_correct());
            scored.push((score(completion), is_correct));
        }

        // Highest log probability first; ties keep reference order.
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        let Some(&(_, top_is_correct)) = scored.first() else {
            return Ok(Vec::new());
        };

        let mut stats = vec![Stat::from_value(
            MetricName::new(EXACT_MATCH),
            if top_is_correct { 1.0 } else { 0.0 },
        )];
        if let Some(rank) = scored.iter().position(|&(_, correct)| correct) {
            stats.push(Stat::from_value(
                MetricName::new(CORRECT_RANK),
                (rank + 1) as f64,
            ));
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::AdaptationMethod;
    use crate::request::{Request, RequestResult};
    use crate::scenario::{Instance, Reference, TEST_SPLIT};

    fn reference_states(logprobs: &[f64]) -> Vec<RequestState> {
        let instance = Instance::new("id0", "2 + 2 =", TEST_SPLIT).with_references(vec![
            Reference::new("3"),
            Reference::correct("4"),
            Reference::new("5"),
        ]);
        logprobs
            .iter()
            .enumerate()
            .map(|(i, &lp)| {
                let mut completion = GeneratedOutput::new(instance.references[i].output.text.clone());
                completion.logprob = lp;
                RequestState::new(instance.clone(), Request::new("m", "2 + 2 ="))
                    .with_reference_index(i)
                    .with_result(RequestResult::success(vec![completion]))
            })
            .collect()
    }

    fn run(states: &[RequestState]) -> Vec<Stat> {
        let refs: Vec<&RequestState> = states.iter().collect();
        ReferenceRankingMetric
            .evaluate_references(&AdapterSpec::new(AdaptationMethod::MultipleChoiceSeparateOriginal), &refs)
            .unwrap()
    }

    #[test]
    fn test_correct_reference_ranked_first() {
        let stats = run(&reference_states(&[-3.0, -0.5, -2.0]));
        assert_eq!(stats[0].sum, 1.0);
        assert_eq!(stats[1].name.name, CORRECT_RANK);
        assert_eq!(stats[1].sum, 1.0);
    }

    #[test]
    fn test_correct_reference_ranked_last() {
        let stats = run(&reference_states(&[-0.1, -4.0, -2.0]));
        assert_eq!(stats[0].sum, 0.0);
        assert_eq!(stats[1].sum, 3.0);
    }

    #[test]
    fn test_failed_reference_skips_instance() {
        let mut states = reference_states(&[-0.1, -4.0, -2.0]);
        states[1].result = Some(RequestResult::failure("overloaded"));
        assert!(run(&states).is_empty());
    }
}
