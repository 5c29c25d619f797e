//! Sample grid construction.

use crate::config::RemConfig;
use remsim_common::{Position, RemError, SENTINEL_DB};
use serde::Serialize;

/// One sample point of the map with its accumulated result.
///
/// Created by [`build_points`], written exactly once by the signal
/// calculator, then consumed in order by the map writer.
#[derive(Debug, Clone, Serialize)]
pub struct RemPoint {
    /// Sample position.
    pub position: Position,
    /// Averaged SNR in dB.
    pub avg_snr_db: f64,
    /// Averaged SINR in dB.
    pub avg_sinr_db: f64,
}

impl RemPoint {
    fn new(position: Position) -> Self {
        RemPoint {
            position,
            avg_snr_db: SENTINEL_DB,
            avg_sinr_db: SENTINEL_DB,
        }
    }
}

/// Build the ordered list of sample points for the configured grid.
///
/// Each axis with resolution R > 1 carries R evenly spaced values
/// including both endpoints; resolution 1 collapses the axis to its
/// minimum. Points are emitted row-major: y varies in the outer loop,
/// x in the inner one. This order defines the output file order.
pub fn build_points(config: &RemConfig) -> Result<Vec<RemPoint>, RemError> {
    config.validate()?;

    let xs = axis_values(config.x_min, config.x_max, config.x_res);
    let ys = axis_values(config.y_min, config.y_max, config.y_res);

    let mut points = Vec::with_capacity(xs.len() * ys.len());
    for &y in &ys {
        for &x in &xs {
            points.push(RemPoint::new(Position::new(x, y, config.z)));
        }
    }
    Ok(points)
}

fn axis_values(min: f64, max: f64, res: u16) -> Vec<f64> {
    if res <= 1 {
        return vec![min];
    }
    let step = (max - min) / (res as f64 - 1.0);
    (0..res)
        .map(|i| {
            if i == res - 1 {
                // Exact endpoint, independent of step rounding.
                max
            } else {
                min + step * i as f64
            }
        })
        .collect()
}
