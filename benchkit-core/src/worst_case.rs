//! Worst-case robustness and fairness statistics.
//!
//! For each instance and base metric, the identity (unperturbed) value
//! competes against every perturbed value. The minimum is kept per instance
//! and the per-instance minima are merged across instances, so taking the
//! mean later yields an average worst-case score.

use crate::error::MetricError;
use crate::grouping::OrderedGroups;
use crate::metric_name::MetricName;
use crate::perturbation::PerturbationDescription;
use crate::scenario::InstanceKey;
use crate::stat::{Stat, StatMap};

/// Per-instance statistics of one trial, keyed by instance.
pub type PerInstanceGroup = OrderedGroups<InstanceKey, Vec<Stat>>;

/// Compute `worst_robustness`, `worst_fairness` and `worst_<perturbation>`
/// statistics from one trial's per-instance statistics.
///
/// Statistics without a perturbation are ignored.
pub fn compute_worst_case_metrics(
    per_instance_stats: &PerInstanceGroup,
) -> Result<Vec<Stat>, MetricError> {
    // (metric name without perturbation, instance id) -> stats across perturbations
    let mut grouped: OrderedGroups<(MetricName, String), Vec<&Stat>> = OrderedGroups::new();
    for (key, stats) in per_instance_stats.iter() {
        for stat in stats.iter().filter(|s| s.name.perturbation.is_some()) {
            grouped
                .entry(&(stat.name.replace_perturbation(None), key.id.clone()))
                .push(stat);
        }
    }

    let mut derived = StatMap::new();
    for ((metric_name, instance_id), stats) in grouped.iter() {
        let mut identity: Option<&Stat> = None;
        let mut robustness = Stat::new(
            metric_name.replace_perturbation(Some(PerturbationDescription::robustness("robustness"))),
        );
        let mut fairness = Stat::new(
            metric_name.replace_perturbation(Some(PerturbationDescription::fairness("fairness"))),
        );
        let mut individual: OrderedGroups<PerturbationDescription, Stat> = OrderedGroups::new();

        for &stat in stats {
            let perturbation =
                stat.name
                    .perturbation
                    .as_ref()
                    .ok_or_else(|| MetricError::MissingPerturbation {
                        metric: stat.name.to_string(),
                    })?;

            if perturbation.is_identity() {
                if identity.is_some() {
                    return Err(MetricError::DuplicateIdentity {
                        metric: metric_name.to_string(),
                        instance_id: instance_id.clone(),
                    });
                }
                identity = Some(stat);
                continue;
            }

            if perturbation.robustness {
                robustness.merge(stat);
            }
            if perturbation.fairness {
                fairness.merge(stat);
            }
            if individual.contains_key(perturbation) {
                return Err(MetricError::DuplicatePerturbation {
                    metric: metric_name.to_string(),
                    instance_id: instance_id.clone(),
                    perturbation: perturbation.name.clone(),
                });
            }
            individual
                .get_or_insert_with(perturbation, || Stat::new(stat.name.clone()))
                .merge(stat);
        }

        let candidates = [robustness, fairness]
            .into_iter()
            .chain(individual.into_values());
        for mut stat in candidates {
            if let Some(identity) = identity {
                stat.merge(identity);
            }
            let Some(min) = stat.min else {
                continue;
            };
            let perturbation = stat.name.perturbation.as_ref().map(|p| p.worst_case());
            derived.merge_stat(&Stat::from_value(
                stat.name.replace_perturbation(perturbation),
                min,
            ));
        }
    }

    Ok(derived.into_stats())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn stat(name: &str, perturbation: Option<PerturbationDescription>, value: f64) -> Stat {
        let mut metric_name = MetricName::new(name).with_split("test");
        metric_name.perturbation = perturbation;
        Stat::from_value(metric_name, value)
    }

    fn key(id: &str, perturbation: Option<PerturbationDescription>) -> InstanceKey {
        InstanceKey {
            id: id.to_string(),
            perturbation,
        }
    }

    fn find<'a>(stats: &'a [Stat], perturbation: &str) -> &'a Stat {
        stats
            .iter()
            .find(|s| s.name.perturbation.as_ref().map(|p| p.name.as_str()) == Some(perturbation))
            .unwrap_or_else(|| panic!("missing {perturbation}"))
    }

    fn single_instance_group() -> PerInstanceGroup {
        let identity = PerturbationDescription::identity();
        let a = PerturbationDescription::robustness("a");
        let b = PerturbationDescription::robustness("b");
        let mut group = PerInstanceGroup::new();
        for (perturbation, value) in [(identity, 0.8), (a, 0.9), (b, 0.6)] {
            let instance = key("id0", Some(perturbation.clone()));
            *group.entry(&instance) = vec![stat("exact_match", Some(perturbation), value)];
        }
        group
    }

    #[test]
    fn test_worst_case_single_instance() {
        let stats = compute_worst_case_metrics(&single_instance_group()).unwrap();

        assert_eq!(find(&stats, "worst_robustness").sum, 0.6);
        assert_eq!(find(&stats, "worst_a").sum, 0.8);
        assert_eq!(find(&stats, "worst_b").sum, 0.6);
        // identity alone still competes in the fairness family
        assert_eq!(find(&stats, "worst_fairness").sum, 0.8);
        for s in &stats {
            assert_eq!(s.count, 1);
            assert_eq!(s.name.name, "exact_match");
            assert_eq!(s.name.split.as_deref(), Some("test"));
        }
    }

    #[test]
    fn test_worst_case_keeps_family_flags() {
        let stats = compute_worst_case_metrics(&single_instance_group()).unwrap();
        let worst = find(&stats, "worst_robustness");
        let perturbation = worst.name.perturbation.as_ref().unwrap();
        assert!(perturbation.robustness);
        assert!(!perturbation.fairness);
    }

    #[test]
    fn test_worst_case_merges_across_instances() {
        let identity = PerturbationDescription::identity();
        let dialect = PerturbationDescription::fairness("dialect");
        let mut group = PerInstanceGroup::new();
        for (id, base, perturbed) in [("id0", 1.0, 0.0), ("id1", 1.0, 1.0)] {
            *group.entry(&key(id, Some(identity.clone()))) =
                vec![stat("exact_match", Some(identity.clone()), base)];
            *group.entry(&key(id, Some(dialect.clone()))) =
                vec![stat("exact_match", Some(dialect.clone()), perturbed)];
        }

        let stats = compute_worst_case_metrics(&group).unwrap();
        let fairness = find(&stats, "worst_fairness");
        assert_eq!(fairness.count, 2);
        assert_eq!(fairness.mean(), Some(0.5));
        assert_eq!(find(&stats, "worst_dialect").mean(), Some(0.5));
    }

    #[test]
    fn test_unperturbed_stats_are_ignored() {
        let mut group = PerInstanceGroup::new();
        *group.entry(&key("id0", None)) = vec![stat("exact_match", None, 1.0)];
        assert!(compute_worst_case_metrics(&group).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_identity_is_an_error() {
        let identity = PerturbationDescription::identity();
        let instance = key("id0", Some(identity.clone()));
        let mut group = PerInstanceGroup::new();
        *group.entry(&instance) = vec![
            stat("exact_match", Some(identity.clone()), 1.0),
            stat("exact_match", Some(identity), 0.0),
        ];
        let err = compute_worst_case_metrics(&group).unwrap_err();
        assert!(matches!(err, MetricError::DuplicateIdentity { .. }));
    }

    #[test]
    fn test_duplicate_perturbation_is_an_error() {
        let typo = PerturbationDescription::robustness("typo");
        let instance = key("a", Some(typo.clone()));
        let mut group = PerInstanceGroup::new();
        *group.entry(&instance) = vec![
            stat("v", Some(typo.clone()), 1.0),
            stat("v", Some(typo), 0.0),
        ];
        let err = compute_worst_case_metrics(&group).unwrap_err();
        assert!(matches!(
            err,
            MetricError::DuplicatePerturbation { ref instance_id, ref perturbation, .. }
                if instance_id == "a" && perturbation == "typo"
        ));
    }
}
