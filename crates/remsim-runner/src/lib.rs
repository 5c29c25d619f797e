//! # remsim-runner
//!
//! Batch runner for radio environment map generation: loads a YAML
//! scenario describing the deployment and the map to build, drives the
//! engine through its install/tick lifecycle and reports summary stats.

use remsim_engine::{NetworkDeployment, RemConfig, RemEngine, RemError, RemReport};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

// ============================================================================
// Errors
// ============================================================================

/// Errors that can occur while running a scenario.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Engine error.
    #[error("engine error: {0}")]
    Engine(#[from] RemError),

    /// Scenario file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Scenario file could not be parsed.
    #[error("scenario error: {0}")]
    Scenario(#[from] serde_yaml::Error),

    /// Stats could not be serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Scenario
// ============================================================================

/// A complete scenario file: the map to build plus the deployment it is
/// built against. The deployment fields live at the top level of the
/// YAML document, next to the `rem` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Map configuration.
    pub rem: RemConfig,
    /// The deployment to map.
    #[serde(flatten)]
    pub deployment: NetworkDeployment,
}

/// Load and validate a scenario from a YAML file.
pub fn load_scenario(path: impl AsRef<Path>) -> Result<Scenario, RunnerError> {
    let text = std::fs::read_to_string(path.as_ref())?;
    let scenario: Scenario = serde_yaml::from_str(&text)?;
    scenario.rem.validate()?;
    debug!(
        path = %path.as_ref().display(),
        transmitters = scenario.deployment.transmitters.len(),
        "loaded scenario"
    );
    Ok(scenario)
}

// ============================================================================
// Run
// ============================================================================

/// Summary statistics of one runner invocation.
#[derive(Debug, Clone, Serialize)]
pub struct RunStats {
    /// Master seed the map was built with.
    pub seed: u64,
    /// Engine build report.
    #[serde(flatten)]
    pub report: RemReport,
}

/// Build the scenario's map into `output_dir`.
///
/// The runner is a batch frontend without a host simulation, so the
/// settle delay returned by install has nothing to wait for and the
/// engine is ticked immediately.
pub fn run_scenario(
    scenario: Scenario,
    seed: u64,
    output_dir: impl AsRef<Path>,
) -> Result<RunStats, RunnerError> {
    std::fs::create_dir_all(output_dir.as_ref())?;
    let mut engine = RemEngine::new(scenario.rem, output_dir.as_ref(), seed)?;
    let delay_s = engine.install(Arc::new(scenario.deployment))?;
    debug!(delay_s, "skipping settle delay in batch mode");
    let report = engine.tick()?;
    Ok(RunStats { seed, report })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r#"
rem:
  mode: coverage-area
  x_min: -50
  x_max: 50
  x_res: 3
  y_min: -50
  y_max: 50
  y_res: 3
  z: 1.5
  sim_tag: unit
channel:
  propagation: three-gpp-uma
transmitters:
  - name: gnb-0
    position: { x: 0, y: 0, z: 25 }
    tx_power_dbm: 40
    bandwidth_parts:
      - center_frequency_hz: 3.5e9
        bandwidth_hz: 20e6
        numerology: 1
receiver:
  position: { x: 10, y: 10, z: 1.5 }
  bandwidth_parts:
    - center_frequency_hz: 3.5e9
      bandwidth_hz: 20e6
      numerology: 1
"#;

    #[test]
    fn test_scenario_parses_with_flattened_deployment() {
        let scenario: Scenario = serde_yaml::from_str(SCENARIO).unwrap();
        assert_eq!(scenario.rem.sim_tag, "unit");
        assert_eq!(scenario.deployment.transmitters.len(), 1);
        assert_eq!(scenario.deployment.receiver.noise_figure_db, 5.0);
        assert!(scenario.rem.validate().is_ok());
    }

    #[test]
    fn test_load_scenario_rejects_bad_grid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        let text = SCENARIO.replace("x_res: 3", "x_res: 0");
        std::fs::write(&path, text).unwrap();
        assert!(load_scenario(&path).is_err());
    }

    #[test]
    fn test_run_scenario_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let scenario: Scenario = serde_yaml::from_str(SCENARIO).unwrap();
        let stats = run_scenario(scenario, 11, dir.path()).unwrap();
        assert_eq!(stats.report.num_points, 9);
        assert!(dir.path().join("rem-unit.out").exists());

        // Stats serialize with the report fields flattened in.
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["seed"], 11);
        assert_eq!(json["num_points"], 9);
    }
}
