//! Model request and response records.
//!
//! These are produced by model backends (outside this crate) and consumed
//! read-only by the metric engine.

use serde::{Deserialize, Serialize};

/// A request sent to a model backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub model: String,
    pub prompt: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    #[serde(default = "default_num_completions")]
    pub num_completions: usize,
    #[serde(default)]
    pub stop_sequences: Vec<String>,
    /// Score the prompt tokens themselves (language modeling, reference ranking).
    #[serde(default)]
    pub echo_prompt: bool,
}

fn default_temperature() -> f64 {
    1.0
}

fn default_max_tokens() -> usize {
    100
}

fn default_num_completions() -> usize {
    1
}

impl Request {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            num_completions: default_num_completions(),
            stop_sequences: Vec::new(),
            echo_prompt: false,
        }
    }
}

/// One token with its log probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub logprob: f64,
}

/// One completion returned by a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedOutput {
    pub text: String,
    #[serde(default)]
    pub logprob: f64,
    #[serde(default)]
    pub tokens: Vec<Token>,
}

impl GeneratedOutput {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            logprob: 0.0,
            tokens: Vec::new(),
        }
    }
}

/// The outcome of a request. Failed requests carry `success == false` and an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestResult {
    pub success: bool,
    #[serde(default)]
    pub completions: Vec<GeneratedOutput>,
    #[serde(default)]
    pub cached: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RequestResult {
    pub fn success(completions: Vec<GeneratedOutput>) -> Self {
        Self {
            success: true,
            completions,
            cached: false,
            request_time: None,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            completions: Vec::new(),
            cached: false,
            request_time: None,
            error: Some(error.into()),
        }
    }

    /// First completion of a successful result.
    pub fn first_completion(&self) -> Option<&GeneratedOutput> {
        if self.success {
            self.completions.first()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults_from_json() {
        let req: Request =
            serde_json::from_str(r#"{"model":"qwen-audio-chat","prompt":"hi"}"#).unwrap();
        assert_eq!(req, Request::new("qwen-audio-chat", "hi"));
    }

    #[test]
    fn test_failed_result_has_no_first_completion() {
        let mut result = RequestResult::failure("model error");
        result.completions.push(GeneratedOutput::new("partial"));
        assert!(result.first_completion().is_none());
    }
}
