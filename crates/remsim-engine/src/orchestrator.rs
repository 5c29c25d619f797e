//! One-shot map build orchestration.
//!
//! The engine walks a fixed state machine: `Configured` at construction,
//! `AwaitingSettleDelay` after [`RemEngine::install`], `Building` while a
//! single [`RemEngine::tick`] computes the whole map, then `Finalized`.
//! Install returns the settle delay the host should wait before ticking,
//! so attach procedures in the surrounding simulation can complete first.
//! A finalized engine refuses further entry; a second map needs a fresh
//! instance.

use crate::beamforming::Beamformer;
use crate::calculator::SignalCalculator;
use crate::config::{RemConfig, RemMode};
use crate::device::{NetworkDeployment, ProbeDeviceRegistry};
use crate::grid::build_points;
use crate::realizer::ScenarioRealizer;
use crate::writer::MapWriter;
use remsim_common::RemError;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Lifecycle state of a [`RemEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EngineState {
    /// Constructed and validated, waiting for installation.
    Configured,
    /// Installed; the host owes the engine one tick after the settle
    /// delay has elapsed.
    AwaitingSettleDelay,
    /// The single map build is in progress.
    Building,
    /// The map has been built and written; no further entry allowed.
    Finalized,
}

/// Summary of one finished map build.
#[derive(Debug, Clone, Serialize)]
pub struct RemReport {
    /// Map mode that was built.
    pub mode: RemMode,
    /// Number of sample points computed.
    pub num_points: usize,
    /// Number of probe transmitters considered.
    pub num_transmitters: usize,
    /// Channel realizations averaged per point.
    pub iterations: u16,
    /// Lowest averaged SNR across the map, in dB.
    pub min_snr_db: f64,
    /// Highest averaged SNR across the map, in dB.
    pub max_snr_db: f64,
    /// Lowest averaged SINR across the map, in dB.
    pub min_sinr_db: f64,
    /// Highest averaged SINR across the map, in dB.
    pub max_sinr_db: f64,
    /// Path of the written map file.
    pub map_path: PathBuf,
    /// Wall-clock build time in milliseconds.
    pub elapsed_ms: u64,
}

/// One-shot radio environment map engine.
pub struct RemEngine {
    config: RemConfig,
    output_dir: PathBuf,
    master_seed: u64,
    deployment: Option<Arc<NetworkDeployment>>,
    state: EngineState,
}

impl RemEngine {
    /// Engine for the given map configuration, writing outputs into
    /// `output_dir`. Fails fast on an invalid grid.
    pub fn new(
        config: RemConfig,
        output_dir: impl Into<PathBuf>,
        master_seed: u64,
    ) -> Result<Self, RemError> {
        config.validate()?;
        Ok(RemEngine {
            config,
            output_dir: output_dir.into(),
            master_seed,
            deployment: None,
            state: EngineState::Configured,
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Arm the engine against a deployment.
    ///
    /// Returns the settle delay in seconds the host should let pass
    /// before calling [`tick`](Self::tick). The deployment itself is
    /// snapshotted at tick time, not here, so device configuration
    /// applied during the delay is still captured.
    pub fn install(&mut self, deployment: Arc<NetworkDeployment>) -> Result<f64, RemError> {
        if self.state != EngineState::Configured {
            return Err(RemError::Configuration(format!(
                "install rejected in state {:?}",
                self.state
            )));
        }
        self.deployment = Some(deployment);
        self.state = EngineState::AwaitingSettleDelay;
        info!(
            delay_s = self.config.installation_delay_s,
            "map build scheduled"
        );
        Ok(self.config.installation_delay_s)
    }

    /// Build the whole map and write all output files.
    ///
    /// Valid exactly once, after [`install`](Self::install). Snapshots
    /// the deployment into probe devices, computes every point
    /// sequentially and finalizes the engine.
    pub fn tick(&mut self) -> Result<RemReport, RemError> {
        if self.state != EngineState::AwaitingSettleDelay {
            return Err(RemError::Configuration(format!(
                "tick rejected in state {:?}",
                self.state
            )));
        }
        self.state = EngineState::Building;
        // The deployment is present whenever the state says installed.
        let deployment = self.deployment.take().ok_or_else(|| {
            RemError::Configuration("engine installed without a deployment".to_string())
        })?;

        let started = Instant::now();
        let mut registry =
            ProbeDeviceRegistry::build(&deployment, self.config.bwp_index, self.config.sector)?;
        let mut points = build_points(&self.config)?;

        info!(
            mode = ?self.config.mode,
            points = points.len(),
            transmitters = registry.transmitters.len(),
            iterations = self.config.iterations,
            "building map"
        );

        let beamformer = Beamformer::new(self.config.mode);
        let calculator = SignalCalculator::new(self.config.iterations, self.config.bin_reduction);
        let mut realizer = ScenarioRealizer::new(deployment.channel, self.master_seed);

        let row_len = self.config.x_res as usize;
        for (index, point) in points.iter_mut().enumerate() {
            if index % row_len == 0 {
                debug!(
                    row = index / row_len,
                    rows = self.config.y_res,
                    "computing row"
                );
            }
            calculator.compute_point(&mut registry, &mut realizer, &beamformer, index, point)?;
        }

        let writer = MapWriter::new(&self.output_dir, self.config.sim_tag.clone());
        let map_path = writer.write_map(&points)?;
        writer.write_deployment_listings(&deployment)?;
        writer.write_gnuplot_script(&self.config)?;

        let report = RemReport {
            mode: self.config.mode,
            num_points: points.len(),
            num_transmitters: registry.transmitters.len(),
            iterations: self.config.iterations,
            min_snr_db: fold_points(&points, |p| p.avg_snr_db, f64::min),
            max_snr_db: fold_points(&points, |p| p.avg_snr_db, f64::max),
            min_sinr_db: fold_points(&points, |p| p.avg_sinr_db, f64::min),
            max_sinr_db: fold_points(&points, |p| p.avg_sinr_db, f64::max),
            map_path,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        self.state = EngineState::Finalized;
        info!(
            elapsed_ms = report.elapsed_ms,
            max_snr_db = report.max_snr_db,
            "map finished"
        );
        Ok(report)
    }
}

fn fold_points<F, G>(points: &[crate::grid::RemPoint], value: F, fold: G) -> f64
where
    F: Fn(&crate::grid::RemPoint) -> f64,
    G: Fn(f64, f64) -> f64,
{
    points
        .iter()
        .map(value)
        .reduce(fold)
        .unwrap_or(remsim_common::SENTINEL_DB)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BinReduction;
    use crate::device::{BandwidthPart, ReceiverConfig, TransmitterConfig};
    use remsim_channel::{AntennaConfig, ChannelConfig, PropagationKind};
    use remsim_common::{Position, SENTINEL_DB};

    fn config() -> RemConfig {
        RemConfig {
            mode: RemMode::BeamShape,
            x_min: -20.0,
            x_max: 20.0,
            x_res: 3,
            y_min: -20.0,
            y_max: 20.0,
            y_res: 3,
            z: 1.5,
            iterations: 2,
            installation_delay_s: 0.5,
            bwp_index: 0,
            sector: None,
            sim_tag: "test".to_string(),
            bin_reduction: BinReduction::Max,
        }
    }

    fn deployment() -> Arc<NetworkDeployment> {
        let bwp = BandwidthPart {
            center_frequency_hz: 3.5e9,
            bandwidth_hz: 20e6,
            numerology: 1,
        };
        Arc::new(NetworkDeployment {
            channel: ChannelConfig {
                propagation: PropagationKind::FreeSpace,
                shadowing_sigma_db: 0.0,
                fading_sigma_db: 0.0,
                path_loss_exponent: 3.0,
            },
            transmitters: vec![TransmitterConfig {
                name: "gnb-0".to_string(),
                position: Position::new(0.0, 0.0, 25.0),
                tx_power_dbm: 40.0,
                sector: 0,
                antenna: AntennaConfig::default(),
                bandwidth_parts: vec![bwp],
            }],
            receiver: ReceiverConfig {
                position: Position::new(0.0, 0.0, 1.5),
                noise_figure_db: 5.0,
                antenna: AntennaConfig::default(),
                bandwidth_parts: vec![bwp],
            },
            obstacles: vec![],
        })
    }

    #[test]
    fn test_state_machine_happy_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = RemEngine::new(config(), dir.path(), 7).unwrap();
        assert_eq!(engine.state(), EngineState::Configured);

        let delay = engine.install(deployment()).unwrap();
        assert_eq!(delay, 0.5);
        assert_eq!(engine.state(), EngineState::AwaitingSettleDelay);

        let report = engine.tick().unwrap();
        assert_eq!(engine.state(), EngineState::Finalized);
        assert_eq!(report.num_points, 9);
        assert_eq!(report.num_transmitters, 1);
        assert!(report.map_path.exists());
        // Single transmitter, loss-only channel: real values everywhere.
        assert!(report.min_snr_db > SENTINEL_DB);
        assert!(report.max_snr_db >= report.min_snr_db);
    }

    #[test]
    fn test_reentry_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = RemEngine::new(config(), dir.path(), 7).unwrap();

        // Tick before install.
        assert!(engine.tick().is_err());

        engine.install(deployment()).unwrap();
        // Second install while armed.
        assert!(engine.install(deployment()).is_err());

        engine.tick().unwrap();
        // Any entry after finalization.
        assert!(engine.install(deployment()).is_err());
        assert!(engine.tick().is_err());
    }

    #[test]
    fn test_invalid_grid_rejected_at_construction() {
        let mut bad = config();
        bad.x_res = 0;
        assert!(RemEngine::new(bad, "/tmp", 0).is_err());
    }

    #[test]
    fn test_all_output_files_written() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = RemEngine::new(config(), dir.path(), 7).unwrap();
        engine.install(deployment()).unwrap();
        engine.tick().unwrap();

        for name in [
            "rem-test.out",
            "gnbs-test.txt",
            "ues-test.txt",
            "buildings-test.txt",
            "rem-plot-test.gnuplot",
        ] {
            assert!(dir.path().join(name).exists(), "missing {}", name);
        }
    }

    #[test]
    fn test_same_seed_reproduces_the_map() {
        let dir_a = tempfile::tempdir().unwrap();
        let dir_b = tempfile::tempdir().unwrap();
        let mut cfg = config();
        cfg.iterations = 3;
        let shadowed = Arc::new(NetworkDeployment {
            channel: ChannelConfig {
                propagation: PropagationKind::ThreeGppUma,
                shadowing_sigma_db: 6.0,
                fading_sigma_db: 2.0,
                path_loss_exponent: 3.0,
            },
            ..(*deployment()).clone()
        });

        let run = |dir: &std::path::Path| {
            let mut engine = RemEngine::new(cfg.clone(), dir, 99).unwrap();
            engine.install(shadowed.clone()).unwrap();
            engine.tick().unwrap();
            std::fs::read_to_string(dir.join("rem-test.out")).unwrap()
        };
        assert_eq!(run(dir_a.path()), run(dir_b.path()));
    }
}
