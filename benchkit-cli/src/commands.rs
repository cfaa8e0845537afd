//! CLI subcommand handlers.

use crate::Commands;
use crate::ConfigAction;
use benchkit_core::config::BenchConfig;
use benchkit_core::metrics::{METRIC_NAMES, MetricSpec, create_metric};
use benchkit_core::{MetricResult, ScenarioState};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// JSON document written by `benchkit evaluate`.
#[derive(Debug, Serialize)]
pub struct EvaluationReport {
    pub generated_at: DateTime<Utc>,
    pub scenario_state: PathBuf,
    pub metrics: Vec<String>,
    #[serde(flatten)]
    pub result: MetricResult,
}

/// Handle a CLI subcommand.
pub async fn handle_command(
    command: Commands,
    config: &BenchConfig,
    workspace: &Path,
) -> anyhow::Result<()> {
    match command {
        Commands::Evaluate {
            scenario_state,
            metrics,
            output,
        } => {
            let report = evaluate(&scenario_state, &metrics, config).await?;
            let json = if config.evaluation.pretty {
                serde_json::to_string_pretty(&report)?
            } else {
                serde_json::to_string(&report)?
            };
            match output.or_else(|| config.evaluation.output_path.clone()) {
                Some(path) => {
                    tokio::fs::write(&path, json).await?;
                    tracing::info!(path = %path.display(), "Wrote metric results");
                }
                None => println!("{}", json),
            }
            Ok(())
        }
        Commands::Metrics => {
            for name in METRIC_NAMES {
                println!("{}", name);
            }
            Ok(())
        }
        Commands::Config { action } => handle_config(action, config, workspace).await,
    }
}

/// Run the requested metrics (or the configured ones) over a scenario state file.
pub async fn evaluate(
    scenario_state_path: &Path,
    metric_names: &[String],
    config: &BenchConfig,
) -> anyhow::Result<EvaluationReport> {
    let content = tokio::fs::read_to_string(scenario_state_path)
        .await
        .map_err(|e| {
            anyhow::anyhow!(
                "Failed to read scenario state {}: {}",
                scenario_state_path.display(),
                e
            )
        })?;
    let scenario_state: ScenarioState = serde_json::from_str(&content)?;
    tracing::info!(
        path = %scenario_state_path.display(),
        request_states = scenario_state.request_states.len(),
        instances = scenario_state.instances.len(),
        method = %scenario_state.adapter_spec.method,
        "Loaded scenario state"
    );

    let specs: Vec<MetricSpec> = if metric_names.is_empty() {
        config.evaluation.metrics.clone()
    } else {
        metric_names.iter().map(MetricSpec::new).collect()
    };

    let mut result = MetricResult::default();
    let mut names = Vec::with_capacity(specs.len());
    for spec in &specs {
        let metric = create_metric(spec)?;
        result.merge(metric.evaluate(&scenario_state)?);
        names.push(metric.name().to_string());
    }

    Ok(EvaluationReport {
        generated_at: Utc::now(),
        scenario_state: scenario_state_path.to_path_buf(),
        metrics: names,
        result,
    })
}

async fn handle_config(
    action: ConfigAction,
    config: &BenchConfig,
    workspace: &Path,
) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_dir = workspace.join(".benchkit");
            tokio::fs::create_dir_all(&config_dir).await?;

            let config_path = config_dir.join("config.toml");
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }

            let toml_str = toml::to_string_pretty(&BenchConfig::default())?;
            tokio::fs::write(&config_path, &toml_str).await?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            println!("{}", toml::to_string_pretty(config)?);
            Ok(())
        }
    }
}
