//! Metric identifiers and the context dimensions that qualify them.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::perturbation::PerturbationDescription;
use crate::scenario::Instance;

/// Identifies a statistic: a base name plus the context it was computed in.
///
/// Two names are equal only when every field matches, so `exact_match` on the
/// `test` split and `exact_match` on `valid` are distinct statistics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetricName {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_split: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perturbation: Option<PerturbationDescription>,
}

impl MetricName {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            split: None,
            sub_split: None,
            perturbation: None,
        }
    }

    pub fn with_split(mut self, split: impl Into<String>) -> Self {
        self.split = Some(split.into());
        self
    }

    pub fn with_sub_split(mut self, sub_split: impl Into<String>) -> Self {
        self.sub_split = Some(sub_split.into());
        self
    }

    pub fn with_perturbation(mut self, perturbation: PerturbationDescription) -> Self {
        self.perturbation = Some(perturbation);
        self
    }

    /// Same name with the perturbation replaced (or cleared with `None`).
    pub fn replace_perturbation(&self, perturbation: Option<PerturbationDescription>) -> Self {
        Self {
            perturbation,
            ..self.clone()
        }
    }

    /// Same name with split, sub-split and perturbation taken from `context`.
    pub fn in_context(&self, context: &MetricContext) -> Self {
        Self {
            name: self.name.clone(),
            split: context.split.clone(),
            sub_split: context.sub_split.clone(),
            perturbation: context.perturbation.clone(),
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(split) = &self.split {
            write!(f, "[{split}")?;
            if let Some(sub_split) = &self.sub_split {
                write!(f, "/{sub_split}")?;
            }
            write!(f, "]")?;
        }
        if let Some(perturbation) = &self.perturbation {
            write!(f, "<{perturbation}>")?;
        }
        Ok(())
    }
}

/// The non-name part of a [`MetricName`], used as a grouping key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetricContext {
    pub split: Option<String>,
    pub sub_split: Option<String>,
    pub perturbation: Option<PerturbationDescription>,
}

impl MetricContext {
    pub fn from_instance(instance: &Instance) -> Self {
        Self {
            split: Some(instance.split.clone()),
            sub_split: instance.sub_split.clone(),
            perturbation: instance.perturbation.clone(),
        }
    }

    pub fn from_metric_name(name: &MetricName) -> Self {
        Self {
            split: name.split.clone(),
            sub_split: name.sub_split.clone(),
            perturbation: name.perturbation.clone(),
        }
    }
}
