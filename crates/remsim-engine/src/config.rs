//! Map configuration: mode, bounding box, averaging and output naming.

use remsim_common::RemError;
use serde::{Deserialize, Serialize};

/// Kind of map to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RemMode {
    /// Keep the antenna bearings configured by the scenario and map the
    /// footprint of that fixed beam configuration.
    BeamShape,
    /// Re-aim every transmitter at each sample point (and the receiver at
    /// each transmitter in turn) to map the best achievable coverage.
    CoverageArea,
}

/// Policy for reducing per-bin SNR/SINR values to one wideband number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BinReduction {
    /// Peak bin: optimistic best-current-condition reporting.
    Max,
    /// Average across the band.
    Mean,
}

impl Default for BinReduction {
    fn default() -> Self {
        BinReduction::Max
    }
}

/// Immutable map build configuration.
///
/// The grid covers `[x_min, x_max] x [y_min, y_max]` at fixed height `z`.
/// An axis with resolution 1 collapses to its minimum value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemConfig {
    /// Map mode.
    pub mode: RemMode,
    /// Minimum x coordinate in meters.
    pub x_min: f64,
    /// Maximum x coordinate in meters.
    pub x_max: f64,
    /// Number of sample points along x.
    pub x_res: u16,
    /// Minimum y coordinate in meters.
    pub y_min: f64,
    /// Maximum y coordinate in meters.
    pub y_max: f64,
    /// Number of sample points along y.
    pub y_res: u16,
    /// Height of all sample points in meters.
    pub z: f64,
    /// Independent channel realizations averaged per point.
    #[serde(default = "default_iterations")]
    pub iterations: u16,
    /// Delay between installation and the map build, in seconds, so RRC
    /// attach procedures in the host simulation can settle first.
    #[serde(default = "default_installation_delay")]
    pub installation_delay_s: f64,
    /// Index of the bandwidth part to map.
    #[serde(default)]
    pub bwp_index: usize,
    /// Restrict the map to transmitters of this sector. `None` maps all.
    #[serde(default)]
    pub sector: Option<u32>,
    /// Tag appended to output filenames to distinguish campaign runs.
    #[serde(default)]
    pub sim_tag: String,
    /// Wideband reduction policy.
    #[serde(default)]
    pub bin_reduction: BinReduction,
}

fn default_iterations() -> u16 {
    1
}

fn default_installation_delay() -> f64 {
    1.0
}

impl RemConfig {
    /// Step between adjacent points along x, zero for a collapsed axis.
    pub fn x_step(&self) -> f64 {
        axis_step(self.x_min, self.x_max, self.x_res)
    }

    /// Step between adjacent points along y, zero for a collapsed axis.
    pub fn y_step(&self) -> f64 {
        axis_step(self.y_min, self.y_max, self.y_res)
    }

    /// Total number of grid points.
    pub fn num_points(&self) -> usize {
        self.x_res as usize * self.y_res as usize
    }

    /// Reject impossible grids before any computation starts.
    pub fn validate(&self) -> Result<(), RemError> {
        if self.x_res == 0 || self.y_res == 0 {
            return Err(RemError::Configuration(format!(
                "grid resolution must be at least 1, got {}x{}",
                self.x_res, self.y_res
            )));
        }
        if self.x_min > self.x_max || self.y_min > self.y_max {
            return Err(RemError::Configuration(format!(
                "bounding box is inverted: x [{}, {}], y [{}, {}]",
                self.x_min, self.x_max, self.y_min, self.y_max
            )));
        }
        if self.iterations == 0 {
            return Err(RemError::Configuration(
                "iterations must be at least 1".to_string(),
            ));
        }
        if self.installation_delay_s < 0.0 {
            return Err(RemError::Configuration(format!(
                "installation delay must be non-negative, got {}",
                self.installation_delay_s
            )));
        }
        Ok(())
    }
}

fn axis_step(min: f64, max: f64, res: u16) -> f64 {
    if res > 1 {
        (max - min) / (res as f64 - 1.0)
    } else {
        0.0
    }
}
