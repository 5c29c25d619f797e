//! # remsim-channel
//!
//! Channel, propagation and antenna models for remsim.
//!
//! This crate provides:
//! - Line-of-sight determination with per-pair caching ([`ChannelConditionModel`])
//! - Distance-based path loss with shadowing ([`PropagationLossModel`])
//! - Per-bin spectrum fading ([`SpectrumFadingModel`])
//! - A steerable antenna array ([`AntennaArray`])
//!
//! Model instances carry per-device-pair caches (shadowing values, LOS
//! decisions) that are only valid within one temporal simulation. Map
//! generation therefore copy-constructs fresh instances from a
//! [`ChannelConfig`] for every independent sample instead of sharing them.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use remsim_common::{db_to_linear, Bearing, Position, RemError, SpectrumValue};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// Channel Condition
// ============================================================================

/// Propagation condition between a transmitter/receiver pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelCondition {
    /// Line of sight.
    Los,
    /// Non line of sight.
    Nlos,
}

// ============================================================================
// Configuration
// ============================================================================

/// Propagation loss model family, selected by name in the scenario file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PropagationKind {
    /// Free-space path loss, always line of sight.
    FreeSpace,
    /// Log-distance path loss with a configurable exponent.
    LogDistance,
    /// 3GPP TR 38.901 urban macro, probabilistic line of sight.
    ThreeGppUma,
    /// 3GPP TR 38.901 urban micro street canyon, probabilistic line of sight.
    ThreeGppUmi,
}

impl PropagationKind {
    /// All selectable model families.
    pub const ALL: [PropagationKind; 4] = [
        PropagationKind::FreeSpace,
        PropagationKind::LogDistance,
        PropagationKind::ThreeGppUma,
        PropagationKind::ThreeGppUmi,
    ];

    /// Scenario-file name of the model family.
    pub fn name(&self) -> &'static str {
        match self {
            PropagationKind::FreeSpace => "free-space",
            PropagationKind::LogDistance => "log-distance",
            PropagationKind::ThreeGppUma => "three-gpp-uma",
            PropagationKind::ThreeGppUmi => "three-gpp-umi",
        }
    }

    /// One-line description for the CLI model listing.
    pub fn description(&self) -> &'static str {
        match self {
            PropagationKind::FreeSpace => "Free-space path loss (Friis), always LOS",
            PropagationKind::LogDistance => {
                "Log-distance path loss, configurable exponent, always LOS"
            }
            PropagationKind::ThreeGppUma => "3GPP TR 38.901 UMa with probabilistic LOS/NLOS",
            PropagationKind::ThreeGppUmi => {
                "3GPP TR 38.901 UMi street canyon with probabilistic LOS/NLOS"
            }
        }
    }
}

/// Channel model configuration, copied by value into fresh model
/// instances for every independent sample.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelConfig {
    /// Path loss model family.
    pub propagation: PropagationKind,
    /// Log-normal shadowing standard deviation in dB. Zero disables shadowing.
    #[serde(default = "default_shadowing_sigma")]
    pub shadowing_sigma_db: f64,
    /// Per-bin fast fading standard deviation in dB. Zero disables fading.
    #[serde(default = "default_fading_sigma")]
    pub fading_sigma_db: f64,
    /// Path loss exponent, used by the log-distance model only.
    #[serde(default = "default_path_loss_exponent")]
    pub path_loss_exponent: f64,
}

fn default_shadowing_sigma() -> f64 {
    4.0
}

fn default_fading_sigma() -> f64 {
    0.0
}

fn default_path_loss_exponent() -> f64 {
    3.0
}

impl Default for ChannelConfig {
    fn default() -> Self {
        ChannelConfig {
            propagation: PropagationKind::ThreeGppUma,
            shadowing_sigma_db: default_shadowing_sigma(),
            fading_sigma_db: default_fading_sigma(),
            path_loss_exponent: default_path_loss_exponent(),
        }
    }
}

impl ChannelConfig {
    /// Reject parameters the models cannot represent. Model constructors
    /// rely on this running first.
    pub fn validate(&self) -> Result<(), RemError> {
        if self.shadowing_sigma_db < 0.0 || self.fading_sigma_db < 0.0 {
            return Err(RemError::Configuration(format!(
                "sigma must be non-negative, got shadowing {} dB, fading {} dB",
                self.shadowing_sigma_db, self.fading_sigma_db
            )));
        }
        if self.path_loss_exponent <= 0.0 {
            return Err(RemError::Configuration(format!(
                "path loss exponent must be positive, got {}",
                self.path_loss_exponent
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Pair Keys
// ============================================================================

/// Cache key identifying a transmitter/receiver placement pair.
///
/// Derived from the raw position bits: two queries for the same pair of
/// positions hit the same cache slot within one model instance.
fn pair_key(tx: &Position, rx: &Position) -> u64 {
    let mut key: u64 = 0xcbf2_9ce4_8422_2325;
    for v in [tx.x, tx.y, tx.z, rx.x, rx.y, rx.z] {
        key ^= v.to_bits();
        key = key.wrapping_mul(0x0000_0100_0000_01b3);
    }
    key
}

// ============================================================================
// Channel Condition Model
// ============================================================================

/// Determines LOS/NLOS state between device pairs.
///
/// The decision is drawn once per pair and cached, mirroring the condition
/// persistence of a temporal simulation. The cache must not outlive one
/// sample evaluation.
#[derive(Debug, Clone)]
pub struct ChannelConditionModel {
    kind: PropagationKind,
    rng: ChaCha8Rng,
    cache: HashMap<u64, ChannelCondition>,
}

impl ChannelConditionModel {
    /// Fresh condition model for the given family.
    pub fn new(kind: PropagationKind, seed: u64) -> Self {
        ChannelConditionModel {
            kind,
            rng: ChaCha8Rng::seed_from_u64(seed),
            cache: HashMap::new(),
        }
    }

    /// Condition model that always reports line of sight.
    pub fn always_los() -> Self {
        Self::new(PropagationKind::FreeSpace, 0)
    }

    /// LOS/NLOS state for the pair, drawn once and cached.
    pub fn condition(&mut self, tx: &Position, rx: &Position) -> ChannelCondition {
        let key = pair_key(tx, rx);
        if let Some(cached) = self.cache.get(&key) {
            return *cached;
        }
        let p_los = self.los_probability(tx, rx);
        let draw: f64 = rand::Rng::gen(&mut self.rng);
        let condition = if draw <= p_los {
            ChannelCondition::Los
        } else {
            ChannelCondition::Nlos
        };
        self.cache.insert(key, condition);
        condition
    }

    /// LOS probability per TR 38.901 table 7.4.2-1 (outdoor terminals).
    fn los_probability(&self, tx: &Position, rx: &Position) -> f64 {
        let d2d = tx.horizontal_distance_to(rx);
        match self.kind {
            PropagationKind::FreeSpace | PropagationKind::LogDistance => 1.0,
            PropagationKind::ThreeGppUma => {
                if d2d <= 18.0 {
                    1.0
                } else {
                    18.0 / d2d + (-d2d / 63.0).exp() * (1.0 - 18.0 / d2d)
                }
            }
            PropagationKind::ThreeGppUmi => {
                if d2d <= 18.0 {
                    1.0
                } else {
                    18.0 / d2d + (-d2d / 36.0).exp() * (1.0 - 18.0 / d2d)
                }
            }
        }
    }
}

// ============================================================================
// Propagation Loss
// ============================================================================

/// Capability to compute received power between two positions.
///
/// Implementations may cache per-pair state (shadowing draws), so an
/// instance is only valid for one sample evaluation.
pub trait PropagationLoss {
    /// Received power in dBm at `rx` for a transmission of `tx_power_dbm`
    /// from `tx` under the given channel condition. Antenna gains are not
    /// included.
    fn rx_power_dbm(
        &mut self,
        tx_power_dbm: f64,
        tx: &Position,
        rx: &Position,
        condition: ChannelCondition,
    ) -> f64;
}

/// Distance-based path loss with cached log-normal shadowing.
#[derive(Debug, Clone)]
pub struct PropagationLossModel {
    kind: PropagationKind,
    frequency_hz: f64,
    path_loss_exponent: f64,
    shadowing_sigma_db: f64,
    rng: ChaCha8Rng,
    shadowing_cache: HashMap<u64, f64>,
}

impl PropagationLossModel {
    /// Fresh model instance, value-copied from the configuration.
    pub fn new(config: &ChannelConfig, frequency_hz: f64, seed: u64) -> Self {
        PropagationLossModel {
            kind: config.propagation,
            frequency_hz,
            path_loss_exponent: config.path_loss_exponent,
            shadowing_sigma_db: config.shadowing_sigma_db,
            rng: ChaCha8Rng::seed_from_u64(seed),
            shadowing_cache: HashMap::new(),
        }
    }

    /// Deterministic path loss in dB, before shadowing.
    fn path_loss_db(&self, tx: &Position, rx: &Position, condition: ChannelCondition) -> f64 {
        // Clamp to 1 m so colocated probes stay finite.
        let d3d = tx.distance_to(rx).max(1.0);
        let f_ghz = self.frequency_hz / 1e9;
        let rx_height = rx.z;
        match self.kind {
            PropagationKind::FreeSpace => free_space_loss_db(d3d, self.frequency_hz),
            PropagationKind::LogDistance => {
                // Reference loss at 1 m is the free-space value.
                free_space_loss_db(1.0, self.frequency_hz)
                    + 10.0 * self.path_loss_exponent * d3d.log10()
            }
            PropagationKind::ThreeGppUma => {
                let los = 28.0 + 22.0 * d3d.log10() + 20.0 * f_ghz.log10();
                match condition {
                    ChannelCondition::Los => los,
                    ChannelCondition::Nlos => {
                        let nlos = 13.54 + 39.08 * d3d.log10() + 20.0 * f_ghz.log10()
                            - 0.6 * (rx_height - 1.5);
                        los.max(nlos)
                    }
                }
            }
            PropagationKind::ThreeGppUmi => {
                let los = 32.4 + 21.0 * d3d.log10() + 20.0 * f_ghz.log10();
                match condition {
                    ChannelCondition::Los => los,
                    ChannelCondition::Nlos => {
                        let nlos = 22.4 + 35.3 * d3d.log10() + 21.3 * f_ghz.log10()
                            - 0.3 * (rx_height - 1.5);
                        los.max(nlos)
                    }
                }
            }
        }
    }

    /// Shadowing term in dB, drawn once per pair and cached.
    fn shadowing_db(&mut self, tx: &Position, rx: &Position) -> f64 {
        if self.shadowing_sigma_db == 0.0 {
            return 0.0;
        }
        let key = pair_key(tx, rx);
        if let Some(cached) = self.shadowing_cache.get(&key) {
            return *cached;
        }
        let normal = Normal::new(0.0, self.shadowing_sigma_db)
            .expect("shadowing sigma is validated non-negative");
        let value = normal.sample(&mut self.rng);
        self.shadowing_cache.insert(key, value);
        value
    }
}

impl PropagationLoss for PropagationLossModel {
    fn rx_power_dbm(
        &mut self,
        tx_power_dbm: f64,
        tx: &Position,
        rx: &Position,
        condition: ChannelCondition,
    ) -> f64 {
        let loss_db = self.path_loss_db(tx, rx, condition) + self.shadowing_db(tx, rx);
        tx_power_dbm - loss_db
    }
}

/// Friis free-space path loss in dB.
fn free_space_loss_db(distance_m: f64, frequency_hz: f64) -> f64 {
    const C: f64 = 299_792_458.0;
    let d = distance_m.max(1.0);
    20.0 * d.log10() + 20.0 * frequency_hz.log10() + 20.0 * (4.0 * std::f64::consts::PI / C).log10()
}

// ============================================================================
// Spectrum Fading
// ============================================================================

/// Capability to apply frequency-selective fading to a received PSD.
pub trait SpectrumFading {
    /// Scale each bin of `psd` by an independent fading realization.
    fn apply(&mut self, psd: &mut SpectrumValue, condition: ChannelCondition);
}

/// Per-bin log-normal fast fading. A sigma of zero leaves the PSD intact.
#[derive(Debug, Clone)]
pub struct SpectrumFadingModel {
    sigma_db: f64,
    rng: ChaCha8Rng,
}

impl SpectrumFadingModel {
    /// Fresh fading model, value-copied from the configuration.
    pub fn new(config: &ChannelConfig, seed: u64) -> Self {
        SpectrumFadingModel {
            sigma_db: config.fading_sigma_db,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl SpectrumFading for SpectrumFadingModel {
    fn apply(&mut self, psd: &mut SpectrumValue, condition: ChannelCondition) {
        if self.sigma_db == 0.0 {
            return;
        }
        // NLOS links fade harder than LOS links.
        let sigma = match condition {
            ChannelCondition::Los => self.sigma_db,
            ChannelCondition::Nlos => self.sigma_db * 1.5,
        };
        let normal = Normal::new(0.0, sigma).expect("fading sigma is validated non-negative");
        for bin in psd.bins_mut() {
            *bin *= db_to_linear(normal.sample(&mut self.rng));
        }
    }
}

// ============================================================================
// Antenna Array
// ============================================================================

/// Scenario description of an antenna array.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AntennaConfig {
    /// Vertical element count.
    #[serde(default = "default_antenna_rows")]
    pub rows: u16,
    /// Horizontal element count.
    #[serde(default = "default_antenna_columns")]
    pub columns: u16,
    /// Boresight azimuth in degrees (0 along +x, counterclockwise).
    #[serde(default)]
    pub bearing_deg: f64,
    /// Single-element gain in dBi.
    #[serde(default = "default_element_gain")]
    pub element_gain_db: f64,
    /// Start quasi-omni instead of pointed at `bearing_deg`.
    #[serde(default)]
    pub omni: bool,
}

fn default_antenna_rows() -> u16 {
    4
}

fn default_antenna_columns() -> u16 {
    8
}

fn default_element_gain() -> f64 {
    5.0
}

impl Default for AntennaConfig {
    fn default() -> Self {
        AntennaConfig {
            rows: default_antenna_rows(),
            columns: default_antenna_columns(),
            bearing_deg: 0.0,
            element_gain_db: default_element_gain(),
            omni: false,
        }
    }
}

/// Steerable antenna array: reports a directional gain for a bearing and
/// can be re-pointed. A quasi-omni array (no pointing vector) has 0 dB
/// gain in every direction.
#[derive(Debug, Clone)]
pub struct AntennaArray {
    rows: u16,
    columns: u16,
    element_gain_db: f64,
    bearing: Option<Bearing>,
}

/// Off-boresight attenuation ceiling in dB.
const MAX_ATTENUATION_DB: f64 = 30.0;
/// 3 dB beamwidth of the element pattern in degrees.
const BEAMWIDTH_3DB_DEG: f64 = 65.0;

impl AntennaArray {
    /// Build an array from its scenario description, pointed at the
    /// configured boresight azimuth, or quasi-omni when so declared.
    pub fn from_config(config: &AntennaConfig) -> Self {
        AntennaArray {
            rows: config.rows.max(1),
            columns: config.columns.max(1),
            element_gain_db: config.element_gain_db,
            bearing: if config.omni {
                None
            } else {
                Some(Bearing::from_azimuth_deg(config.bearing_deg))
            },
        }
    }

    /// Current pointing vector, `None` when quasi-omni.
    pub fn bearing(&self) -> Option<Bearing> {
        self.bearing
    }

    /// Re-point the array along the given bearing.
    pub fn set_bearing(&mut self, bearing: Option<Bearing>) {
        self.bearing = bearing;
    }

    /// Point the array from `from` directly toward `to`.
    pub fn point_between(&mut self, from: &Position, to: &Position) {
        self.bearing = Some(Bearing::between(from, to));
    }

    /// Reset to the neutral quasi-omni state (0 dB everywhere).
    pub fn set_quasi_omni(&mut self) {
        self.bearing = None;
    }

    /// Maximum achievable gain on boresight, in dBi.
    pub fn boresight_gain_db(&self) -> f64 {
        let elements = (self.rows as f64) * (self.columns as f64);
        self.element_gain_db + 10.0 * elements.log10()
    }

    /// Directional gain in dBi toward the given bearing.
    pub fn gain_db(&self, toward: &Bearing) -> f64 {
        let Some(bearing) = self.bearing else {
            return 0.0;
        };
        let theta_deg = bearing.angle_to(toward).to_degrees();
        let attenuation = (12.0 * (theta_deg / BEAMWIDTH_3DB_DEG).powi(2)).min(MAX_ATTENUATION_DB);
        self.boresight_gain_db() - attenuation
    }
}


#[cfg(test)]
mod serde_tests {
    use super::*;

    #[test]
    fn test_channel_config_defaults_from_yaml() {
        let config: ChannelConfig = serde_yaml::from_str("propagation: three-gpp-uma").unwrap();
        assert_eq!(config.propagation, PropagationKind::ThreeGppUma);
        assert_eq!(config.shadowing_sigma_db, 4.0);
        assert_eq!(config.fading_sigma_db, 0.0);
    }

    #[test]
    fn test_channel_config_rejects_negative_sigma() {
        let config = ChannelConfig {
            shadowing_sigma_db: -1.0,
            ..ChannelConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(ChannelConfig::default().validate().is_ok());
    }

    #[test]
    fn test_channel_config_rejects_unknown_fields() {
        let result: Result<ChannelConfig, _> =
            serde_yaml::from_str("propagation: free-space\nbogus: 1");
        assert!(result.is_err());
    }
}
