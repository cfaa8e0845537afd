//! Configuration for benchkit.
//!
//! Uses `figment` for layered configuration: defaults -> user config ->
//! workspace config -> explicit config file -> environment.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::metrics::MetricSpec;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BenchConfig {
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which metrics to run and where results go.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Metrics evaluated when none are given on the command line.
    #[serde(default = "default_metrics")]
    pub metrics: Vec<MetricSpec>,
    /// Write results here instead of stdout.
    #[serde(default)]
    pub output_path: Option<PathBuf>,
    /// Pretty-print JSON output.
    #[serde(default = "default_true")]
    pub pretty: bool,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            metrics: default_metrics(),
            output_path: None,
            pretty: true,
        }
    }
}

fn default_metrics() -> Vec<MetricSpec> {
    vec![MetricSpec::new("basic_generation")]
}

fn default_true() -> bool {
    true
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Also write JSON logs to a daily rolling file.
    #[serde(default = "default_true")]
    pub json_logs: bool,
    /// Directory for JSON logs (platform data dir if not set).
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            json_logs: true,
            log_dir: None,
        }
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("dev", "benchkit", "benchkit")
}

/// Default directory for log files.
pub fn default_log_dir() -> PathBuf {
    project_dirs()
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Load configuration from all layers.
pub fn load_config(
    workspace: Option<&Path>,
    config_file: Option<&Path>,
) -> Result<BenchConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(BenchConfig::default()));

    // User-level config
    if let Some(dirs) = project_dirs() {
        let user_config = dirs.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    // Workspace-level config
    if let Some(ws) = workspace {
        let ws_config = ws.join(".benchkit").join("config.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // Explicit config file must exist
    if let Some(path) = config_file {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        figment = figment.merge(Toml::file(path));
    }

    // Environment variables (BENCHKIT_EVALUATION__PRETTY, BENCHKIT_LOGGING__JSON_LOGS, ...)
    figment = figment.merge(Env::prefixed("BENCHKIT_").split("__"));

    figment.extract().map_err(|e| ConfigError::Parse(Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BenchConfig::default();
        assert_eq!(config.evaluation.metrics.len(), 1);
        assert_eq!(config.evaluation.metrics[0].class_name, "basic_generation");
        assert!(config.evaluation.pretty);
        assert!(config.logging.json_logs);
    }

    #[test]
    fn test_load_config_from_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let bench_dir = dir.path().join(".benchkit");
        std::fs::create_dir_all(&bench_dir).unwrap();
        std::fs::write(
            bench_dir.join("config.toml"),
            r#"
[evaluation]
pretty = false

[[evaluation.metrics]]
class_name = "classification"

[[evaluation.metrics]]
class_name = "basic_generation"
args = { names = ["exact_match"] }
"#,
        )
        .unwrap();

        let config = load_config(Some(dir.path()), None).unwrap();
        assert!(!config.evaluation.pretty);
        assert_eq!(config.evaluation.metrics.len(), 2);
        assert_eq!(config.evaluation.metrics[0].class_name, "classification");
        assert_eq!(
            config.evaluation.metrics[1].args["names"][0].as_str(),
            Some("exact_match")
        );
    }

    #[test]
    fn test_explicit_file_overrides_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let bench_dir = dir.path().join(".benchkit");
        std::fs::create_dir_all(&bench_dir).unwrap();
        std::fs::write(bench_dir.join("config.toml"), "[logging]\njson_logs = true\n").unwrap();
        let explicit = dir.path().join("run.toml");
        std::fs::write(&explicit, "[logging]\njson_logs = false\n").unwrap();

        let config = load_config(Some(dir.path()), Some(&explicit)).unwrap();
        assert!(!config.logging.json_logs);
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = load_config(None, Some(Path::new("/nonexistent/benchkit.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }
}
