//! Benchmark instances and the scenario trait that produces them.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::perturbation::PerturbationDescription;

pub const TRAIN_SPLIT: &str = "train";
pub const VALID_SPLIT: &str = "valid";
pub const TEST_SPLIT: &str = "test";

/// Tag marking a reference as a correct answer.
pub const CORRECT_TAG: &str = "correct";

/// Text output of a reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Output {
    pub text: String,
}

/// A candidate answer for an instance, optionally tagged (e.g. `correct`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    pub output: Output,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Reference {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            output: Output { text: text.into() },
            tags: Vec::new(),
        }
    }

    pub fn correct(text: impl Into<String>) -> Self {
        Self {
            tags: vec![CORRECT_TAG.to_string()],
            ..Self::new(text)
        }
    }

    pub fn is_correct(&self) -> bool {
        self.tags.iter().any(|t| t == CORRECT_TAG)
    }
}

/// One benchmark item.
///
/// `id` is mandatory. Perturbed variants of the same item share the id and
/// differ in `perturbation`; see [`InstanceKey`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub id: String,
    pub input: String,
    #[serde(default)]
    pub references: Vec<Reference>,
    pub split: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_split: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perturbation: Option<PerturbationDescription>,
}

impl Instance {
    pub fn new(id: impl Into<String>, input: impl Into<String>, split: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            input: input.into(),
            references: Vec::new(),
            split: split.into(),
            sub_split: None,
            perturbation: None,
        }
    }

    pub fn with_references(mut self, references: Vec<Reference>) -> Self {
        self.references = references;
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

    /// First reference tagged [`CORRECT_TAG`], if any.
    pub fn correct_reference(&self) -> Option<&Reference> {
        self.references.iter().find(|r| r.is_correct())
    }

    pub fn key(&self) -> InstanceKey {
        InstanceKey {
            id: self.id.clone(),
            perturbation: self.perturbation.clone(),
        }
    }
}

/// Hashable identity of an instance: its id plus its perturbation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceKey {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perturbation: Option<PerturbationDescription>,
}

/// A source of benchmark instances.
pub trait Scenario {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn tags(&self) -> &[&str];
    fn get_instances(&self) -> Result<Vec<Instance>>;
}
