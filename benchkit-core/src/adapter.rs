//! Adapter specs, request states and the scenario state the engine consumes.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::request::{Request, RequestResult};
use crate::scenario::{Instance, InstanceKey};

/// How instances were turned into model requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdaptationMethod {
    Generation,
    LanguageModeling,
    MultipleChoiceJoint,
    MultipleChoiceSeparateOriginal,
    MultipleChoiceSeparateCalibrated,
}

impl fmt::Display for AdaptationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Generation => "generation",
            Self::LanguageModeling => "language_modeling",
            Self::MultipleChoiceJoint => "multiple_choice_joint",
            Self::MultipleChoiceSeparateOriginal => "multiple_choice_separate_original",
            Self::MultipleChoiceSeparateCalibrated => "multiple_choice_separate_calibrated",
        };
        write!(f, "{s}")
    }
}

/// Adaptation settings shared by every request of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterSpec {
    pub method: AdaptationMethod,
    #[serde(default = "default_num_train_trials")]
    pub num_train_trials: usize,
    #[serde(default)]
    pub max_train_instances: usize,
    #[serde(default)]
    pub model: String,
}

fn default_num_train_trials() -> usize {
    1
}

impl AdapterSpec {
    pub fn new(method: AdaptationMethod) -> Self {
        Self {
            method,
            num_train_trials: default_num_train_trials(),
            max_train_instances: 0,
            model: String::new(),
        }
    }

    pub fn with_num_train_trials(mut self, num_train_trials: usize) -> Self {
        self.num_train_trials = num_train_trials;
        self
    }
}

/// One resolved model request for an instance.
///
/// `reference_index` is `None` for the generation request and `Some(i)` for a
/// request scoring reference `i`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestState {
    pub instance: Instance,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_index: Option<usize>,
    #[serde(default)]
    pub train_trial_index: usize,
    pub request: Request,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<RequestResult>,
}

impl RequestState {
    pub fn new(instance: Instance, request: Request) -> Self {
        Self {
            instance,
            reference_index: None,
            train_trial_index: 0,
            request,
            result: None,
        }
    }

    pub fn with_trial(mut self, train_trial_index: usize) -> Self {
        self.train_trial_index = train_trial_index;
        self
    }

    pub fn with_reference_index(mut self, reference_index: usize) -> Self {
        self.reference_index = Some(reference_index);
        self
    }

    pub fn with_result(mut self, result: RequestResult) -> Self {
        self.result = Some(result);
        self
    }
}

type RequestKey = (usize, InstanceKey, Option<usize>);

/// Serialized form of a scenario state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioStateDocument {
    pub adapter_spec: AdapterSpec,
    pub request_states: Vec<RequestState>,
}

/// All request states of a run, indexed by (trial, instance, reference index).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "ScenarioStateDocument", into = "ScenarioStateDocument")]
pub struct ScenarioState {
    pub adapter_spec: AdapterSpec,
    pub request_states: Vec<RequestState>,
    /// Distinct instances in order of first appearance.
    pub instances: Vec<Instance>,
    index: HashMap<RequestKey, Vec<usize>>,
}

impl ScenarioState {
    pub fn new(adapter_spec: AdapterSpec, request_states: Vec<RequestState>) -> Self {
        let mut index: HashMap<RequestKey, Vec<usize>> = HashMap::new();
        let mut seen: HashSet<InstanceKey> = HashSet::new();
        let mut instances = Vec::new();

        for (i, rs) in request_states.iter().enumerate() {
            let key = rs.instance.key();
            if seen.insert(key.clone()) {
                instances.push(rs.instance.clone());
            }
            index
                .entry((rs.train_trial_index, key, rs.reference_index))
                .or_default()
                .push(i);
        }

        Self {
            adapter_spec,
            request_states,
            instances,
            index,
        }
    }

    /// Request states for one trial and instance, filtered by reference index
    /// (`None` selects the generation request).
    pub fn get_request_states(
        &self,
        train_trial_index: usize,
        instance: &Instance,
        reference_index: Option<usize>,
    ) -> Vec<&RequestState> {
        let key = (train_trial_index, instance.key(), reference_index);
        self.index
            .get(&key)
            .map(|indices| indices.iter().map(|&i| &self.request_states[i]).collect())
            .unwrap_or_default()
    }
}

impl From<ScenarioStateDocument> for ScenarioState {
    fn from(doc: ScenarioStateDocument) -> Self {
        Self::new(doc.adapter_spec, doc.request_states)
    }
}

impl From<ScenarioState> for ScenarioStateDocument {
    fn from(state: ScenarioState) -> Self {
        Self {
            adapter_spec: state.adapter_spec,
            request_states: state.request_states,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{Reference, TEST_SPLIT};

    fn instance(id: &str) -> Instance {
        Instance::new(id, format!("input {id}"), TEST_SPLIT)
            .with_references(vec![Reference::correct("yes"), Reference::new("no")])
    }

    #[test]
    fn test_get_request_states_filters_by_trial_instance_and_reference() {
        let a = instance("a");
        let b = instance("b");
        let states = vec![
            RequestState::new(a.clone(), Request::new("m", "pa")),
            RequestState::new(a.clone(), Request::new("m", "pa1")).with_trial(1),
            RequestState::new(a.clone(), Request::new("m", "ref0")).with_reference_index(0),
            RequestState::new(b.clone(), Request::new("m", "pb")),
        ];
        let state = ScenarioState::new(AdapterSpec::new(AdaptationMethod::Generation), states);

        assert_eq!(state.instances.len(), 2);
        assert_eq!(state.get_request_states(0, &a, None).len(), 1);
        assert_eq!(state.get_request_states(0, &a, None)[0].request.prompt, "pa");
        assert_eq!(state.get_request_states(1, &a, None)[0].request.prompt, "pa1");
        assert_eq!(state.get_request_states(0, &a, Some(0))[0].request.prompt, "ref0");
        assert!(state.get_request_states(0, &a, Some(1)).is_empty());
        assert!(state.get_request_states(1, &b, None).is_empty());
    }

    #[test]
    fn test_deserialize_builds_index() {
        let json = r#"{
            "adapter_spec": {"method": "generation", "num_train_trials": 2},
            "request_states": [
                {
                    "instance": {"id": "id0", "input": "q", "split": "test"},
                    "request": {"model": "m", "prompt": "q"},
                    "result": {"success": true, "completions": [{"text": "a"}]}
                }
            ]
        }"#;
        let state: ScenarioState = serde_json::from_str(json).unwrap();
        assert_eq!(state.adapter_spec.num_train_trials, 2);
        assert_eq!(state.instances.len(), 1);
        let inst = state.instances[0].clone();
        assert_eq!(state.get_request_states(0, &inst, None).len(), 1);
    }
}
