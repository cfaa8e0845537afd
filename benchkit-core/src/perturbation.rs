//! Perturbation descriptors attached to instances and metric names.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reserved perturbation name for the unperturbed input.
pub const IDENTITY: &str = "identity";

/// Describes how an instance's input was transformed.
///
/// `robustness` and `fairness` select which worst-case family the
/// perturbation competes in; a perturbation may belong to both or neither.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PerturbationDescription {
    pub name: String,
    #[serde(default)]
    pub robustness: bool,
    #[serde(default)]
    pub fairness: bool,
}

impl PerturbationDescription {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            robustness: false,
            fairness: false,
        }
    }

    /// The unperturbed variant of an instance.
    pub fn identity() -> Self {
        Self::new(IDENTITY)
    }

    pub fn robustness(name: impl Into<String>) -> Self {
        Self {
            robustness: true,
            ..Self::new(name)
        }
    }

    pub fn fairness(name: impl Into<String>) -> Self {
        Self {
            fairness: true,
            ..Self::new(name)
        }
    }

    pub fn is_identity(&self) -> bool {
        self.name == IDENTITY
    }

    /// Copy of this description renamed to `worst_<name>`, flags unchanged.
    pub fn worst_case(&self) -> Self {
        Self {
            name: format!("worst_{}", self.name),
            ..self.clone()
        }
    }
}

impl fmt::Display for PerturbationDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
