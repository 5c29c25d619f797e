//! # remsim-common
//!
//! Common types for the remsim radio environment map generator.
//!
//! This crate provides:
//! - Cartesian positions and antenna bearings ([`Position`], [`Bearing`])
//! - Power unit conversions ([`db_to_linear`], [`dbm_to_watts`], ...)
//! - Spectrum description of a bandwidth part ([`SpectrumModel`])
//! - Per-bin power spectral density values ([`SpectrumValue`])
//! - The shared error taxonomy ([`RemError`])

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors shared by the map generation pipeline.
#[derive(Debug, Error)]
pub enum RemError {
    /// Invalid configuration (grid resolution, device index, band mismatch).
    /// Fatal, detected before any computation starts.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A requested channel model has no probe-safe copy.
    /// Fatal, detected at probe registry build time.
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// A computed value is not representable in the output file.
    #[error("Degenerate output value: {0}")]
    DegenerateValue(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// Power Conversions
// ============================================================================

/// Thermal noise power spectral density at 290 K, in dBm/Hz.
pub const THERMAL_NOISE_DBM_PER_HZ: f64 = -174.0;

/// Sentinel dB value reported when a point receives zero total power.
/// Kept finite so output files never carry NaN or infinities.
pub const SENTINEL_DB: f64 = -300.0;

/// Convert a dB ratio to a linear ratio.
pub fn db_to_linear(db: f64) -> f64 {
    10.0_f64.powf(db / 10.0)
}

/// Convert a linear ratio to dB. Values at or below zero map to
/// [`SENTINEL_DB`] instead of producing -inf/NaN.
pub fn linear_to_db(linear: f64) -> f64 {
    if linear > 0.0 {
        10.0 * linear.log10()
    } else {
        SENTINEL_DB
    }
}

/// Convert a power in dBm to watts.
pub fn dbm_to_watts(dbm: f64) -> f64 {
    db_to_linear(dbm - 30.0)
}

/// Convert a power in watts to dBm.
pub fn watts_to_dbm(watts: f64) -> f64 {
    linear_to_db(watts) + 30.0
}

// ============================================================================
// Geometry
// ============================================================================

/// Cartesian position in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// X coordinate in meters.
    pub x: f64,
    /// Y coordinate in meters.
    pub y: f64,
    /// Z coordinate (height) in meters.
    #[serde(default)]
    pub z: f64,
}

impl Position {
    /// Create a new position.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Position { x, y, z }
    }

    /// Euclidean distance to another position in meters.
    pub fn distance_to(&self, other: &Position) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2) + (self.z - other.z).powi(2))
            .sqrt()
    }

    /// Horizontal (2-D) distance to another position in meters.
    pub fn horizontal_distance_to(&self, other: &Position) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Unit bearing vector pointing from this position toward another.
    /// Colocated positions yield the neutral bearing.
    pub fn bearing_to(&self, other: &Position) -> Bearing {
        Bearing::between(self, other)
    }
}

/// Unit direction vector used as an antenna pointing vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bearing {
    /// X component of the unit vector.
    pub x: f64,
    /// Y component of the unit vector.
    pub y: f64,
    /// Z component of the unit vector.
    pub z: f64,
}

impl Bearing {
    /// Bearing from an azimuth angle in degrees (horizontal pointing,
    /// 0 degrees along +x, counterclockwise).
    pub fn from_azimuth_deg(azimuth_deg: f64) -> Self {
        let rad = azimuth_deg.to_radians();
        Bearing {
            x: rad.cos(),
            y: rad.sin(),
            z: 0.0,
        }
    }

    /// Unit bearing pointing from `from` toward `to`.
    /// Colocated positions yield the +x bearing.
    pub fn between(from: &Position, to: &Position) -> Self {
        let dx = to.x - from.x;
        let dy = to.y - from.y;
        let dz = to.z - from.z;
        let norm = (dx * dx + dy * dy + dz * dz).sqrt();
        if norm == 0.0 {
            return Bearing::from_azimuth_deg(0.0);
        }
        Bearing {
            x: dx / norm,
            y: dy / norm,
            z: dz / norm,
        }
    }

    /// Angle in radians between two bearings, in [0, pi].
    pub fn angle_to(&self, other: &Bearing) -> f64 {
        let dot = self.x * other.x + self.y * other.y + self.z * other.z;
        dot.clamp(-1.0, 1.0).acos()
    }
}

// ============================================================================
// Spectrum Model
// ============================================================================

/// Frequency-domain description of a bandwidth part: carrier frequency,
/// bandwidth and numerology (subcarrier spacing exponent).
///
/// The band is divided into resource-block-wide frequency bins; received
/// power is tracked per bin as a [`SpectrumValue`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectrumModel {
    /// Carrier center frequency in Hz.
    pub center_frequency_hz: f64,
    /// Occupied bandwidth in Hz.
    pub bandwidth_hz: f64,
    /// Numerology mu: subcarrier spacing is 15 kHz * 2^mu.
    pub numerology: u8,
}

impl SpectrumModel {
    /// Subcarrier spacing in Hz for this numerology.
    pub fn subcarrier_spacing_hz(&self) -> f64 {
        15_000.0 * 2.0_f64.powi(self.numerology as i32)
    }

    /// Width of one frequency bin (one resource block) in Hz.
    pub fn bin_width_hz(&self) -> f64 {
        12.0 * self.subcarrier_spacing_hz()
    }

    /// Number of frequency bins that fit in the bandwidth. At least one.
    pub fn num_bins(&self) -> usize {
        ((self.bandwidth_hz / self.bin_width_hz()) as usize).max(1)
    }

    /// Lowest occupied frequency in Hz.
    pub fn low_edge_hz(&self) -> f64 {
        self.center_frequency_hz - self.bandwidth_hz / 2.0
    }

    /// Highest occupied frequency in Hz.
    pub fn high_edge_hz(&self) -> f64 {
        self.center_frequency_hz + self.bandwidth_hz / 2.0
    }

    /// Center frequencies of all bins, low to high.
    pub fn bin_centers(&self) -> Vec<f64> {
        let width = self.bin_width_hz();
        let low = self.low_edge_hz();
        (0..self.num_bins())
            .map(|i| low + (i as f64 + 0.5) * width)
            .collect()
    }

    /// Whether a frequency falls inside this band.
    pub fn contains(&self, frequency_hz: f64) -> bool {
        frequency_hz >= self.low_edge_hz() && frequency_hz <= self.high_edge_hz()
    }

    /// Whether the two bands share any spectrum.
    pub fn overlaps(&self, other: &SpectrumModel) -> bool {
        self.low_edge_hz() < other.high_edge_hz() && other.low_edge_hz() < self.high_edge_hz()
    }

    /// Check the band description is physically meaningful.
    pub fn validate(&self) -> Result<(), RemError> {
        if self.bandwidth_hz <= 0.0 {
            return Err(RemError::Configuration(format!(
                "bandwidth must be positive, got {} Hz",
                self.bandwidth_hz
            )));
        }
        if self.center_frequency_hz <= self.bandwidth_hz / 2.0 {
            return Err(RemError::Configuration(format!(
                "center frequency {} Hz too low for bandwidth {} Hz",
                self.center_frequency_hz, self.bandwidth_hz
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Spectrum Value
// ============================================================================

/// Received power per frequency bin, in watts, aligned to the bin grid
/// of some reference [`SpectrumModel`].
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumValue {
    bins: Vec<f64>,
}

impl SpectrumValue {
    /// All-zero value with the given number of bins.
    pub fn zeros(num_bins: usize) -> Self {
        SpectrumValue {
            bins: vec![0.0; num_bins],
        }
    }

    /// Build from per-bin powers in watts.
    pub fn from_bins(bins: Vec<f64>) -> Self {
        SpectrumValue { bins }
    }

    /// Number of bins.
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    /// Whether the value has no bins.
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Per-bin powers in watts.
    pub fn bins(&self) -> &[f64] {
        &self.bins
    }

    /// Mutable per-bin powers.
    pub fn bins_mut(&mut self) -> &mut [f64] {
        &mut self.bins
    }

    /// Total power integrated across all bins, in watts.
    pub fn total_power(&self) -> f64 {
        self.bins.iter().sum()
    }

    /// Add another value bin-by-bin. Panics on bin-count mismatch,
    /// which indicates mixed spectrum grids and is a programming error.
    pub fn add_assign(&mut self, other: &SpectrumValue) {
        assert_eq!(self.bins.len(), other.bins.len(), "spectrum grid mismatch");
        for (a, b) in self.bins.iter_mut().zip(other.bins.iter()) {
            *a += b;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_round_trip() {
        assert!((db_to_linear(3.0) - 1.9952623).abs() < 1e-6);
        assert!((linear_to_db(100.0) - 20.0).abs() < 1e-12);
        assert!((dbm_to_watts(30.0) - 1.0).abs() < 1e-12);
        assert!((watts_to_dbm(0.001) - 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_linear_to_db_zero_is_sentinel() {
        assert_eq!(linear_to_db(0.0), SENTINEL_DB);
        assert_eq!(linear_to_db(-1.0), SENTINEL_DB);
    }

    #[test]
    fn test_position_distance() {
        let a = Position::new(0.0, 0.0, 0.0);
        let b = Position::new(3.0, 4.0, 0.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-12);
        let c = Position::new(3.0, 4.0, 12.0);
        assert!((a.distance_to(&c) - 13.0).abs() < 1e-12);
        assert!((a.horizontal_distance_to(&c) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_bearing_between_is_unit() {
        let a = Position::new(0.0, 0.0, 1.5);
        let b = Position::new(10.0, 10.0, 1.5);
        let bearing = a.bearing_to(&b);
        let norm = (bearing.x.powi(2) + bearing.y.powi(2) + bearing.z.powi(2)).sqrt();
        assert!((norm - 1.0).abs() < 1e-12);
        assert!((bearing.x - bearing.y).abs() < 1e-12);
    }

    #[test]
    fn test_bearing_angle() {
        let east = Bearing::from_azimuth_deg(0.0);
        let north = Bearing::from_azimuth_deg(90.0);
        assert!((east.angle_to(&north) - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert!(east.angle_to(&east).abs() < 1e-6);
    }

    #[test]
    fn test_colocated_bearing_is_neutral() {
        let a = Position::new(1.0, 2.0, 3.0);
        let bearing = a.bearing_to(&a);
        assert_eq!(bearing, Bearing::from_azimuth_deg(0.0));
    }

    #[test]
    fn test_spectrum_bins() {
        // 20 MHz at numerology 1: 30 kHz SCS, 360 kHz bins -> 55 bins.
        let model = SpectrumModel {
            center_frequency_hz: 3.5e9,
            bandwidth_hz: 20e6,
            numerology: 1,
        };
        assert_eq!(model.subcarrier_spacing_hz(), 30_000.0);
        assert_eq!(model.bin_width_hz(), 360_000.0);
        assert_eq!(model.num_bins(), 55);
        let centers = model.bin_centers();
        assert_eq!(centers.len(), 55);
        assert!(centers[0] > model.low_edge_hz());
        assert!(*centers.last().unwrap() < model.high_edge_hz());
    }

    #[test]
    fn test_spectrum_overlap() {
        let a = SpectrumModel {
            center_frequency_hz: 3.5e9,
            bandwidth_hz: 20e6,
            numerology: 1,
        };
        let b = SpectrumModel {
            center_frequency_hz: 3.51e9,
            bandwidth_hz: 20e6,
            numerology: 1,
        };
        let c = SpectrumModel {
            center_frequency_hz: 28e9,
            bandwidth_hz: 100e6,
            numerology: 3,
        };
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn test_spectrum_validate() {
        let bad = SpectrumModel {
            center_frequency_hz: 3.5e9,
            bandwidth_hz: 0.0,
            numerology: 1,
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_spectrum_value_total() {
        let mut v = SpectrumValue::zeros(4);
        v.bins_mut()[1] = 2.0;
        v.bins_mut()[3] = 3.0;
        assert_eq!(v.total_power(), 5.0);
        let mut w = SpectrumValue::zeros(4);
        w.bins_mut()[0] = 1.0;
        v.add_assign(&w);
        assert_eq!(v.total_power(), 6.0);
    }
}
