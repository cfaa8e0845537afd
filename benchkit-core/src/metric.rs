//! Metric evaluation engine.
//!
//! A [`Metric`] turns the request states of a [`ScenarioState`] into
//! statistics. Implementors override a subset of the scoring hooks; the
//! provided [`Metric::evaluate`] does the grouping by trial, instance and
//! context, runs the derivation hooks, adds worst-case perturbation stats,
//! and averages trial-level results into the final aggregate.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::adapter::{AdaptationMethod, AdapterSpec, RequestState, ScenarioState};
use crate::error::MetricError;
use crate::grouping::OrderedGroups;
use crate::metric_name::{MetricContext, MetricName};
use crate::perturbation::PerturbationDescription;
use crate::scenario::InstanceKey;
use crate::stat::{Stat, StatMap, add_context};
use crate::worst_case::{PerInstanceGroup, compute_worst_case_metrics};

/// Groups keyed by context, iterated in first-seen order.
pub type ContextGroups<V> = OrderedGroups<MetricContext, V>;

/// Key for per-instance statistics: (instance, trial index).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PerInstanceStatsKey {
    pub instance_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perturbation: Option<PerturbationDescription>,
    pub train_trial_index: usize,
}

impl PerInstanceStatsKey {
    pub fn new(instance: &InstanceKey, train_trial_index: usize) -> Self {
        Self {
            instance_id: instance.id.clone(),
            perturbation: instance.perturbation.clone(),
            train_trial_index,
        }
    }
}

/// Statistics produced for one instance in one trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerInstanceStats {
    #[serde(flatten)]
    pub key: PerInstanceStatsKey,
    pub stats: Vec<Stat>,
}

/// Aggregated statistics (averaged over instances, then over trials) plus
/// per-(instance, trial) statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricResult {
    pub aggregated_stats: Vec<Stat>,
    pub per_instance_stats: Vec<PerInstanceStats>,
}

impl MetricResult {
    pub fn get_per_instance_stats(&self, key: &PerInstanceStatsKey) -> Option<&[Stat]> {
        self.per_instance_stats
            .iter()
            .find(|p| &p.key == key)
            .map(|p| p.stats.as_slice())
    }

    /// Append another metric's results to this one.
    pub fn merge(&mut self, other: MetricResult) {
        self.aggregated_stats.extend(other.aggregated_stats);
        self.per_instance_stats.extend(other.per_instance_stats);
    }
}

/// A benchmark-specific scorer.
///
/// Every hook defaults to producing nothing; a scorer overrides the ones it
/// needs. Hooks must not set split, sub-split or perturbation on the names
/// they return: the engine overwrites them with the group's context.
pub trait Metric: Send + Sync {
    /// Name used in logs and the registry.
    fn name(&self) -> &str;

    /// Score the single generation request of an instance.
    fn evaluate_generation(
        &self,
        _adapter_spec: &AdapterSpec,
        _request_state: &RequestState,
    ) -> Result<Vec<Stat>, MetricError> {
        Ok(Vec::new())
    }

    /// Score all reference requests of an instance together.
    fn evaluate_references(
        &self,
        _adapter_spec: &AdapterSpec,
        _reference_request_states: &[&RequestState],
    ) -> Result<Vec<Stat>, MetricError> {
        Ok(Vec::new())
    }

    /// Score all generation requests of one context at once. Use only when
    /// the metric does not decompose per instance.
    fn evaluate_instances(
        &self,
        _request_states: &[&RequestState],
    ) -> Result<Vec<Stat>, MetricError> {
        Ok(Vec::new())
    }

    /// Derive statistics from the trial-level statistics of one context.
    fn derive_stats(&self, _stats: &StatMap) -> Vec<Stat> {
        Vec::new()
    }

    /// Derive statistics from the per-instance statistics of one context.
    fn derive_per_instance_stats(&self, _per_instance_stats: &PerInstanceGroup) -> Vec<Stat> {
        Vec::new()
    }

    /// Main entry point: evaluate every request state of the scenario.
    fn evaluate(&self, scenario_state: &ScenarioState) -> Result<MetricResult, MetricError> {
        if scenario_state.adapter_spec.method == AdaptationMethod::LanguageModeling {
            evaluate_language_modeling(self, scenario_state)
        } else {
            evaluate_trials(self, scenario_state)
        }
    }
}

fn group_by_context(stats: &StatMap) -> ContextGroups<StatMap> {
    let mut grouped: ContextGroups<StatMap> = OrderedGroups::new();
    for stat in stats.values() {
        grouped
            .entry(&MetricContext::from_metric_name(&stat.name))
            .merge_stat(stat);
    }
    grouped
}

fn num_instances_stat(count: usize, context: &MetricContext) -> Stat {
    add_context(
        &Stat::from_value(MetricName::new("num_instances"), count as f64),
        context,
    )
}

fn evaluate_trials<M: Metric + ?Sized>(
    metric: &M,
    scenario_state: &ScenarioState,
) -> Result<MetricResult, MetricError> {
    let adapter_spec = &scenario_state.adapter_spec;
    let mut global_stats = StatMap::new();
    let mut all_per_instance_stats = Vec::new();

    for trial in 0..adapter_spec.num_train_trials {
        tracing::debug!(
            metric = metric.name(),
            trial,
            instances = scenario_state.instances.len(),
            "Evaluating trial"
        );
        let mut trial_stats = StatMap::new();
        let mut per_instance_stats = PerInstanceGroup::new();

        for instance in &scenario_state.instances {
            let mut instance_stats = Vec::new();

            let generation = scenario_state.get_request_states(trial, instance, None);
            match generation.as_slice() {
                [] => {}
                [request_state] => {
                    instance_stats.extend(metric.evaluate_generation(adapter_spec, request_state)?)
                }
                many => {
                    return Err(MetricError::MultipleGenerationRequests {
                        instance_id: instance.id.clone(),
                        trial,
                        count: many.len(),
                    });
                }
            }

            let references: Vec<&RequestState> = (0..instance.references.len())
                .flat_map(|i| scenario_state.get_request_states(trial, instance, Some(i)))
                .collect();
            if !references.is_empty() {
                instance_stats.extend(metric.evaluate_references(adapter_spec, &references)?);
            }

            let context = MetricContext::from_instance(instance);
            let instance_stats: Vec<Stat> = instance_stats
                .iter()
                .map(|stat| add_context(stat, &context))
                .collect();
            for stat in &instance_stats {
                trial_stats.merge_stat(stat);
            }
            *per_instance_stats.entry(&instance.key()) = instance_stats;
        }

        for (context, stats) in group_by_context(&trial_stats) {
            for stat in metric.derive_stats(&stats) {
                trial_stats.merge_stat(&add_context(&stat, &context));
            }
        }

        // Group by the context carried in each stat's name.
        let mut grouped_per_instance: ContextGroups<PerInstanceGroup> = OrderedGroups::new();
        for (key, stats) in per_instance_stats.iter() {
            for stat in stats {
                grouped_per_instance
                    .entry(&MetricContext::from_metric_name(&stat.name))
                    .entry(key)
                    .push(stat.clone());
            }
        }
        for (context, instance_group) in grouped_per_instance.iter() {
            for stat in metric.derive_per_instance_stats(instance_group) {
                trial_stats.merge_stat(&add_context(&stat, context));
            }
            trial_stats.merge_stat(&num_instances_stat(instance_group.len(), context));
        }

        let mut grouped_request_states: ContextGroups<Vec<&RequestState>> = OrderedGroups::new();
        for instance in &scenario_state.instances {
            grouped_request_states
                .entry(&MetricContext::from_instance(instance))
                .extend(scenario_state.get_request_states(trial, instance, None));
        }
        for (context, request_states) in grouped_request_states.iter() {
            for stat in metric.evaluate_instances(request_states)? {
                trial_stats.merge_stat(&add_context(&stat, context));
            }
        }

        // Worst-case stats span perturbation contexts, so they are not regrouped.
        for stat in compute_worst_case_metrics(&per_instance_stats)? {
            trial_stats.merge_stat(&stat);
        }

        // Each trial contributes one mean-valued observation per name.
        for stat in trial_stats.values() {
            if let Some(mean) = stat.take_mean() {
                global_stats.merge_stat(&mean);
            }
        }

        all_per_instance_stats.extend(per_instance_stats.into_iter().map(|(key, stats)| {
            PerInstanceStats {
                key: PerInstanceStatsKey::new(&key, trial),
                stats,
            }
        }));
    }

    tracing::info!(
        metric = metric.name(),
        trials = adapter_spec.num_train_trials,
        stats = global_stats.len(),
        "Metric evaluation complete"
    );
    Ok(MetricResult {
        aggregated_stats: global_stats.into_stats(),
        per_instance_stats: all_per_instance_stats,
    })
}

/// Language modeling runs a single implicit trial over every request state.
///
/// A long document is split over several request states of one instance;
/// their stats are appended to the same `(instance, 0)` record rather than
/// each replacing the previous one.
fn evaluate_language_modeling<M: Metric + ?Sized>(
    metric: &M,
    scenario_state: &ScenarioState,
) -> Result<MetricResult, MetricError> {
    let adapter_spec = &scenario_state.adapter_spec;
    let mut global_stats = StatMap::new();
    let mut trial_stats = StatMap::new();
    let mut per_instance_stats = PerInstanceGroup::new();
    let mut instance_ids_per_context: ContextGroups<HashSet<String>> = OrderedGroups::new();

    for request_state in &scenario_state.request_states {
        let instance = &request_state.instance;
        let context = MetricContext::from_instance(instance);
        let request_stats: Vec<Stat> = metric
            .evaluate_generation(adapter_spec, request_state)?
            .iter()
            .map(|stat| add_context(stat, &context))
            .collect();

        if !request_stats.is_empty() {
            instance_ids_per_context
                .entry(&context)
                .insert(instance.id.clone());
        }
        for stat in &request_stats {
            trial_stats.merge_stat(stat);
        }
        // Long documents span several request states of the same instance.
        per_instance_stats
            .entry(&instance.key())
            .extend(request_stats);
    }

    for (context, stats) in group_by_context(&trial_stats) {
        for stat in metric.derive_stats(&stats) {
            trial_stats.merge_stat(&add_context(&stat, &context));
        }
        let num_instances = instance_ids_per_context
            .get(&context)
            .map_or(0, HashSet::len);
        trial_stats.merge_stat(&num_instances_stat(num_instances, &context));
    }

    for stat in trial_stats.values() {
        if let Some(mean) = stat.take_mean() {
            global_stats.merge_stat(&mean);
        }
    }

    tracing::info!(
        metric = metric.name(),
        request_states = scenario_state.request_states.len(),
        stats = global_stats.len(),
        "Language modeling evaluation complete"
    );
    Ok(MetricResult {
        aggregated_stats: global_stats.into_stats(),
        per_instance_stats: per_instance_stats
            .into_iter()
            .map(|(key, stats)| PerInstanceStats {
                key: PerInstanceStatsKey::new(&key, 0),
                stats,
            })
            .collect(),
    })
}

/// All stats whose base name is `name`.
pub fn get_all_stats_by_name<'a>(
    stats: impl IntoIterator<Item = &'a Stat>,
    name: &str,
) -> Vec<&'a Stat> {
    stats.into_iter().filter(|s| s.name.name == name).collect()
}

/// The only stat whose base name is `name`, or `None` if there is none.
pub fn get_unique_stat_by_name<'a>(
    stats: impl IntoIterator<Item = &'a Stat>,
    name: &str,
) -> Result<Option<&'a Stat>, MetricError> {
    let matching = get_all_stats_by_name(stats, name);
    match matching.as_slice() {
        [] => Ok(None),
        [stat] => Ok(Some(stat)),
        many => Err(MetricError::NonUniqueStat {
            name: name.to_string(),
            count: many.len(),
        }),
    }
}
