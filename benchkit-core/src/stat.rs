//! Running statistics accumulators.

use serde::{Deserialize, Serialize};

use crate::grouping::OrderedGroups;
use crate::metric_name::{MetricContext, MetricName};

/// A running aggregate (count, sum, sum of squares, min, max) for one
/// named, context-qualified quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stat {
    pub name: MetricName,
    pub count: usize,
    pub sum: f64,
    pub sum_squared: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Stat {
    /// An empty accumulator.
    pub fn new(name: MetricName) -> Self {
        Self {
            name,
            count: 0,
            sum: 0.0,
            sum_squared: 0.0,
            min: None,
            max: None,
        }
    }

    /// An accumulator holding a single observation.
    pub fn from_value(name: MetricName, value: f64) -> Self {
        let mut stat = Self::new(name);
        stat.add(value);
        stat
    }

    /// Record one observation.
    pub fn add(&mut self, value: f64) -> &mut Self {
        self.count += 1;
        self.sum += value;
        self.sum_squared += value * value;
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
        self
    }

    /// Fold another accumulator into this one. Names are not checked.
    pub fn merge(&mut self, other: &Stat) -> &mut Self {
        if other.count == 0 {
            return self;
        }
        self.count += other.count;
        self.sum += other.sum;
        self.sum_squared += other.sum_squared;
        self.min = match (self.min, other.min) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.max = match (self.max, other.max) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        self
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }

    /// Population variance.
    pub fn variance(&self) -> Option<f64> {
        let mean = self.mean()?;
        let variance = self.sum_squared / self.count as f64 - mean * mean;
        Some(variance.max(0.0))
    }

    pub fn stddev(&self) -> Option<f64> {
        self.variance().map(f64::sqrt)
    }

    /// Collapse into a single observation equal to the mean.
    ///
    /// Returns `None` for an empty accumulator.
    pub fn take_mean(&self) -> Option<Stat> {
        self.mean()
            .map(|mean| Stat::from_value(self.name.clone(), mean))
    }
}

/// Copy of `stat` with split, sub-split and perturbation replaced from `context`.
pub fn add_context(stat: &Stat, context: &MetricContext) -> Stat {
    let mut out = Stat::new(stat.name.in_context(context));
    out.merge(stat);
    out
}

/// Insertion-ordered `MetricName -> Stat` map.
#[derive(Debug, Clone, Default)]
pub struct StatMap {
    stats: OrderedGroups<MetricName, Stat>,
}

impl StatMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `stat` into the entry with the same name, creating it if absent.
    pub fn merge_stat(&mut self, stat: &Stat) {
        self.stats
            .get_or_insert_with(&stat.name, || Stat::new(stat.name.clone()))
            .merge(stat);
    }

    pub fn get(&self, name: &MetricName) -> Option<&Stat> {
        self.stats.get(name)
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &MetricName> {
        self.stats.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &Stat> {
        self.stats.values()
    }

    pub fn into_stats(self) -> Vec<Stat> {
        self.stats.into_values().collect()
    }
}

impl<'a> FromIterator<&'a Stat> for StatMap {
    fn from_iter<I: IntoIterator<Item = &'a Stat>>(iter: I) -> Self {
        let mut map = StatMap::new();
        for stat in iter {
            map.merge_stat(stat);
        }
        map
    }
}

/// Free-function form of [`StatMap::merge_stat`].
pub fn merge_stat(map: &mut StatMap, stat: &Stat) {
    map.merge_stat(stat);
}
