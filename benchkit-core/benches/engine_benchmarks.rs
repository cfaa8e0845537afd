use criterion::{Criterion, black_box, criterion_group, criterion_main};
use benchkit_core::adapter::{AdaptationMethod, AdapterSpec, RequestState, ScenarioState};
use benchkit_core::metric::Metric;
use benchkit_core::metric_name::MetricName;
use benchkit_core::metrics::{BasicGenerationMetric, ClassificationMetric};
use benchkit_core::perturbation::PerturbationDescription;
use benchkit_core::request::{GeneratedOutput, Request, RequestResult};
use benchkit_core::scenario::{Instance, Reference, TEST_SPLIT};
use benchkit_core::stat::{Stat, StatMap};

fn scenario_state(num_instances: usize, num_trials: usize) -> ScenarioState {
    let perturbations = [
        PerturbationDescription::identity(),
        PerturbationDescription::robustness("typo"),
        PerturbationDescription::fairness("dialect"),
    ];
    let mut states = Vec::new();
    for trial in 0..num_trials {
        for i in 0..num_instances {
            for perturbation in &perturbations {
                let instance = Instance::new(format!("id{i}"), format!("Question {i}?"), TEST_SPLIT)
                    .with_references(vec![Reference::correct("yes"), Reference::new("no")])
                    .with_perturbation(perturbation.clone());
                let answer = if (i + trial) % 3 == 0 { "no" } else { "yes" };
                states.push(
                    RequestState::new(instance.clone(), Request::new("bench-model", &instance.input))
                        .with_trial(trial)
                        .with_result(RequestResult::success(vec![GeneratedOutput::new(answer)])),
                );
            }
        }
    }
    let spec = AdapterSpec::new(AdaptationMethod::Generation).with_num_train_trials(num_trials);
    ScenarioState::new(spec, states)
}

fn bench_stats(c: &mut Criterion) {
    c.bench_function("stat_add_1000", |b| {
        b.iter(|| {
            let mut stat = Stat::new(MetricName::new("exact_match"));
            for i in 0..1000 {
                stat.add(black_box(i as f64 / 1000.0));
            }
            stat
        })
    });

    let stats: Vec<Stat> = (0..1000)
        .map(|i| {
            Stat::from_value(
                MetricName::new(format!("metric_{}", i % 20)).with_split(TEST_SPLIT),
                i as f64,
            )
        })
        .collect();
    c.bench_function("stat_map_merge_1000", |b| {
        b.iter(|| {
            let mut map = StatMap::new();
            for stat in &stats {
                map.merge_stat(black_box(stat));
            }
            map
        })
    });
}

fn bench_evaluate(c: &mut Criterion) {
    let small = scenario_state(100, 1);
    let large = scenario_state(1000, 3);
    let basic = BasicGenerationMetric::new();
    let classification = ClassificationMetric::new();

    c.bench_function("evaluate_basic_100x1", |b| {
        b.iter(|| basic.evaluate(black_box(&small)))
    });

    c.bench_function("evaluate_basic_1000x3", |b| {
        b.iter(|| basic.evaluate(black_box(&large)))
    });

    c.bench_function("evaluate_classification_1000x3", |b| {
        b.iter(|| classification.evaluate(black_box(&large)))
    });

    c.bench_function("scenario_state_index_1000x3", |b| {
        let spec = large.adapter_spec.clone();
        let states = large.request_states.clone();
        b.iter(|| ScenarioState::new(spec.clone(), black_box(states.clone())))
    });
}

criterion_group!(benches, bench_stats, bench_evaluate);
criterion_main!(benches);
