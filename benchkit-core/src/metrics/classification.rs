//! Micro and macro F1 over the predictions of a whole context group.

use std::collections::{BTreeSet, HashMap};

use crate::adapter::RequestState;
use crate::error::MetricError;
use crate::metric::Metric;
use crate::metric_name::MetricName;
use crate::metrics::basic::normalize_text;
use crate::stat::Stat;

pub const MICRO_F1: &str = "classification_micro_f1";
pub const MACRO_F1: &str = "classification_macro_f1";

#[derive(Debug, Default, Clone, Copy)]
struct LabelCounts {
    true_positives: usize,
    false_positives: usize,
    false_negatives: usize,
}

impl LabelCounts {
    fn f1(&self) -> f64 {
        let denom = 2 * self.true_positives + self.false_positives + self.false_negatives;
        if denom == 0 {
            0.0
        } else {
            2.0 * self.true_positives as f64 / denom as f64
        }
    }
}

/// Single-label classification: the first completion is the predicted label
/// and the first correct reference is the gold label.
#[derive(Debug, Clone, Default)]
pub struct ClassificationMetric;

impl ClassificationMetric {
    pub fn new() -> Self {
        Self
    }
}

impl Metric for ClassificationMetric {
    fn name(&self) -> &str {
        "classification"
    }

    fn evaluate_instances(
        &self,
        request_states: &[&RequestState],
    ) -> Result<Vec<Stat>, MetricError> {
        let pairs: Vec<(String, String)> = request_states
            .iter()
            .filter_map(|rs| {
                let pred = rs.result.as_ref()?.first_completion()?;
                let gold = rs.instance.correct_reference()?;
                Some((normalize_text(&gold.output.text), normalize_text(&pred.text)))
            })
            .collect();
        if pairs.is_empty() {
            return Ok(Vec::new());
        }

        let labels: BTreeSet<&str> = pairs
            .iter()
            .flat_map(|(g, p)| [g.as_str(), p.as_str()])
            .collect();
        let mut counts: HashMap<&str, LabelCounts> = HashMap::new();
        let mut correct = 0usize;
        for (gold, pred) in &pairs {
            if gold == pred {
                correct += 1;
                counts.entry(gold).or_default().true_positives += 1;
            } else {
                counts.entry(gold).or_default().false_negatives += 1;
                counts.entry(pred).or_default().false_positives += 1;
            }
        }

        // With one label per instance, micro F1 equals accuracy.
        let micro = correct as f64 / pairs.len() as f64;
        let macro_f1 = labels
            .iter()
            .map(|label| counts.get(label).copied().unwrap_or_default().f1())
            .sum::<f64>()
            / labels.len() as f64;

        tracing::debug!(
            predictions = pairs.len(),
            labels = labels.len(),
            "Computed classification F1"
        );
        Ok(vec![
            Stat::from_value(MetricName::new(MICRO_F1), micro),
            Stat::from_value(MetricName::new(MACRO_F1), macro_f1),
        ])
    }
}
