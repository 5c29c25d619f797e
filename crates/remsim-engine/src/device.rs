//! Probe device registry: synthetic transmitter/receiver stand-ins built
//! by snapshotting the real deployment's configuration.

use remsim_channel::{AntennaArray, AntennaConfig, ChannelConfig};
use remsim_common::{Bearing, Position, RemError, SpectrumModel};
use serde::{Deserialize, Serialize};

// ============================================================================
// Deployment Description
// ============================================================================

/// One operating band of a device: a frequency-domain slice of spectrum
/// plus its subcarrier spacing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BandwidthPart {
    /// Carrier center frequency in Hz.
    pub center_frequency_hz: f64,
    /// Occupied bandwidth in Hz.
    pub bandwidth_hz: f64,
    /// Numerology mu (subcarrier spacing is 15 kHz * 2^mu).
    #[serde(default)]
    pub numerology: u8,
}

impl BandwidthPart {
    /// Spectrum description of this bandwidth part.
    pub fn spectrum_model(&self) -> SpectrumModel {
        SpectrumModel {
            center_frequency_hz: self.center_frequency_hz,
            bandwidth_hz: self.bandwidth_hz,
            numerology: self.numerology,
        }
    }
}

/// A real transmitting device (base station sector) of the deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransmitterConfig {
    /// Display name used in logs and plot listings.
    pub name: String,
    /// Fixed position.
    pub position: Position,
    /// Transmit power in dBm.
    pub tx_power_dbm: f64,
    /// Sector index this transmitter belongs to.
    #[serde(default)]
    pub sector: u32,
    /// Antenna array description.
    #[serde(default)]
    pub antenna: AntennaConfig,
    /// Configured bandwidth parts.
    pub bandwidth_parts: Vec<BandwidthPart>,
}

/// The real receiving device whose PHY configuration the probe receiver
/// copies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReceiverConfig {
    /// Position in the real deployment. Only used for the plot listing;
    /// the probe receiver is repositioned to every sample point.
    pub position: Position,
    /// Receiver noise figure in dB.
    #[serde(default = "default_noise_figure")]
    pub noise_figure_db: f64,
    /// Antenna array description.
    #[serde(default)]
    pub antenna: AntennaConfig,
    /// Configured bandwidth parts.
    pub bandwidth_parts: Vec<BandwidthPart>,
}

fn default_noise_figure() -> f64 {
    5.0
}

/// Axis-aligned obstacle, consumed purely for plotting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Obstacle {
    /// Minimum x corner in meters.
    pub x_min: f64,
    /// Maximum x corner in meters.
    pub x_max: f64,
    /// Minimum y corner in meters.
    pub y_min: f64,
    /// Maximum y corner in meters.
    pub y_max: f64,
    /// Obstacle height in meters.
    #[serde(default)]
    pub height: f64,
}

/// The real deployment to map: transmitters, the reference receiver,
/// obstacles and the channel configuration shared by all of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkDeployment {
    /// Channel model configuration.
    pub channel: ChannelConfig,
    /// Transmitting devices.
    pub transmitters: Vec<TransmitterConfig>,
    /// The reference receiving device.
    pub receiver: ReceiverConfig,
    /// Obstacles, for plotting only.
    #[serde(default)]
    pub obstacles: Vec<Obstacle>,
}

// ============================================================================
// Probe Devices
// ============================================================================

/// Probe transmitting device: a synthetic stand-in for one real
/// transmitter, decoupled from real traffic-carrying devices.
///
/// Only the antenna bearing is ever mutated (by the beamforming
/// configurator, per point, in coverage-area mode); `home_bearing` holds
/// the scenario bearing it must be restored to afterward.
#[derive(Debug, Clone)]
pub struct ProbeTransmitter {
    /// Name inherited from the real transmitter.
    pub name: String,
    /// Position inherited from the real transmitter.
    pub position: Position,
    /// Transmit power in dBm.
    pub tx_power_dbm: f64,
    /// Steerable antenna array (cloned, never aliased with the real one).
    pub antenna: AntennaArray,
    /// Bearing configured by the scenario, restored between points.
    pub home_bearing: Option<Bearing>,
    /// Spectrum of the mapped bandwidth part.
    pub spectrum: SpectrumModel,
}

/// The single probe receiving device, repositioned to each sample point.
#[derive(Debug, Clone)]
pub struct ProbeReceiver {
    /// Current position; the only field mutated per point.
    pub position: Position,
    /// Steerable antenna array.
    pub antenna: AntennaArray,
    /// Receiver noise figure in dB.
    pub noise_figure_db: f64,
    /// Spectrum of the mapped bandwidth part.
    pub spectrum: SpectrumModel,
}

/// The probe devices for one map build: the PTD list and the single PRD.
#[derive(Debug, Clone)]
pub struct ProbeDeviceRegistry {
    /// Probe transmitters, in deployment order.
    pub transmitters: Vec<ProbeTransmitter>,
    /// The probe receiver.
    pub receiver: ProbeReceiver,
}

impl ProbeDeviceRegistry {
    /// Snapshot the deployment into probe devices.
    ///
    /// Reads the real device configuration only; the real deployment is
    /// never mutated. Fails if the receiver exposes no bandwidth part at
    /// `bwp_index`, if a selected transmitter lacks that bandwidth part,
    /// or if the sector filter matches no transmitter.
    pub fn build(
        deployment: &NetworkDeployment,
        bwp_index: usize,
        sector: Option<u32>,
    ) -> Result<Self, RemError> {
        deployment.channel.validate()?;

        let receiver_cfg = &deployment.receiver;
        if receiver_cfg.bandwidth_parts.is_empty() {
            return Err(RemError::Configuration(
                "receiver exposes zero bandwidth parts".to_string(),
            ));
        }
        let rx_bwp = receiver_cfg.bandwidth_parts.get(bwp_index).ok_or_else(|| {
            RemError::Configuration(format!(
                "receiver has no bandwidth part at index {} ({} configured)",
                bwp_index,
                receiver_cfg.bandwidth_parts.len()
            ))
        })?;
        let rx_spectrum = rx_bwp.spectrum_model();
        rx_spectrum.validate()?;

        let mut transmitters = Vec::new();
        for tx_cfg in &deployment.transmitters {
            if let Some(wanted) = sector {
                if tx_cfg.sector != wanted {
                    continue;
                }
            }
            let tx_bwp = tx_cfg.bandwidth_parts.get(bwp_index).ok_or_else(|| {
                RemError::Configuration(format!(
                    "transmitter '{}' has no bandwidth part at index {}",
                    tx_cfg.name, bwp_index
                ))
            })?;
            let spectrum = tx_bwp.spectrum_model();
            spectrum.validate()?;
            check_model_applies(&deployment.channel, &tx_cfg.name, &spectrum)?;

            let antenna = AntennaArray::from_config(&tx_cfg.antenna);
            let home_bearing = antenna.bearing();
            transmitters.push(ProbeTransmitter {
                name: tx_cfg.name.clone(),
                position: tx_cfg.position,
                tx_power_dbm: tx_cfg.tx_power_dbm,
                antenna,
                home_bearing,
                spectrum,
            });
        }

        if transmitters.is_empty() {
            return Err(RemError::Configuration(match sector {
                Some(s) => format!("sector {} selects no transmitter", s),
                None => "deployment has no transmitters".to_string(),
            }));
        }

        let receiver = ProbeReceiver {
            position: receiver_cfg.position,
            antenna: AntennaArray::from_config(&receiver_cfg.antenna),
            noise_figure_db: receiver_cfg.noise_figure_db,
            spectrum: rx_spectrum,
        };

        Ok(ProbeDeviceRegistry {
            transmitters,
            receiver,
        })
    }
}

/// TR 38.901 models are defined for 0.5-100 GHz carriers. Outside that
/// range no probe-safe model copy exists, so the build fails up front
/// instead of producing out-of-domain path losses point by point.
fn check_model_applies(
    channel: &ChannelConfig,
    name: &str,
    spectrum: &SpectrumModel,
) -> Result<(), RemError> {
    use remsim_channel::PropagationKind;
    let three_gpp = matches!(
        channel.propagation,
        PropagationKind::ThreeGppUma | PropagationKind::ThreeGppUmi
    );
    if three_gpp && !(0.5e9..=100e9).contains(&spectrum.center_frequency_hz) {
        return Err(RemError::ModelUnavailable(format!(
            "{} is not defined at {} GHz (transmitter '{}')",
            channel.propagation.name(),
            spectrum.center_frequency_hz / 1e9,
            name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_deployment() -> NetworkDeployment {
        let bwp = BandwidthPart {
            center_frequency_hz: 3.5e9,
            bandwidth_hz: 20e6,
            numerology: 1,
        };
        NetworkDeployment {
            channel: ChannelConfig::default(),
            transmitters: vec![
                TransmitterConfig {
                    name: "gnb-0".to_string(),
                    position: Position::new(0.0, 0.0, 25.0),
                    tx_power_dbm: 40.0,
                    sector: 0,
                    antenna: AntennaConfig::default(),
                    bandwidth_parts: vec![bwp],
                },
                TransmitterConfig {
                    name: "gnb-1".to_string(),
                    position: Position::new(200.0, 0.0, 25.0),
                    tx_power_dbm: 40.0,
                    sector: 1,
                    antenna: AntennaConfig::default(),
                    bandwidth_parts: vec![bwp],
                },
            ],
            receiver: ReceiverConfig {
                position: Position::new(50.0, 50.0, 1.5),
                noise_figure_db: 5.0,
                antenna: AntennaConfig::default(),
                bandwidth_parts: vec![bwp],
            },
            obstacles: vec![],
        }
    }

    #[test]
    fn test_registry_snapshots_all_transmitters() {
        let deployment = test_deployment();
        let registry = ProbeDeviceRegistry::build(&deployment, 0, None).unwrap();
        assert_eq!(registry.transmitters.len(), 2);
        assert_eq!(registry.transmitters[0].name, "gnb-0");
        assert_eq!(registry.receiver.noise_figure_db, 5.0);
        assert_eq!(registry.receiver.spectrum.num_bins(), 55);
    }

    #[test]
    fn test_sector_filter() {
        let deployment = test_deployment();
        let registry = ProbeDeviceRegistry::build(&deployment, 0, Some(1)).unwrap();
        assert_eq!(registry.transmitters.len(), 1);
        assert_eq!(registry.transmitters[0].name, "gnb-1");

        assert!(ProbeDeviceRegistry::build(&deployment, 0, Some(9)).is_err());
    }

    #[test]
    fn test_zero_bandwidth_parts_rejected() {
        let mut deployment = test_deployment();
        deployment.receiver.bandwidth_parts.clear();
        assert!(ProbeDeviceRegistry::build(&deployment, 0, None).is_err());
    }

    #[test]
    fn test_out_of_range_bwp_index_rejected() {
        let deployment = test_deployment();
        assert!(ProbeDeviceRegistry::build(&deployment, 3, None).is_err());
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let deployment = test_deployment();
        let mut registry = ProbeDeviceRegistry::build(&deployment, 0, None).unwrap();
        // Mutating the probe antenna must not leak into the deployment.
        registry.transmitters[0].antenna.set_quasi_omni();
        assert_eq!(deployment.transmitters[0].antenna.bearing_deg, 0.0);
        assert!(registry.transmitters[0].antenna.bearing().is_none());
    }

    #[test]
    fn test_model_frequency_range_enforced() {
        let mut deployment = test_deployment();
        deployment.channel.propagation = remsim_channel::PropagationKind::ThreeGppUma;
        deployment.transmitters[0].bandwidth_parts[0].center_frequency_hz = 0.4e9;
        let err = ProbeDeviceRegistry::build(&deployment, 0, None).unwrap_err();
        assert!(matches!(err, RemError::ModelUnavailable(_)));

        // Free space carries no frequency restriction.
        deployment.channel.propagation = remsim_channel::PropagationKind::FreeSpace;
        assert!(ProbeDeviceRegistry::build(&deployment, 0, None).is_ok());
    }

    #[test]
    fn test_home_bearing_recorded() {
        let mut deployment = test_deployment();
        deployment.transmitters[0].antenna.bearing_deg = 120.0;
        let registry = ProbeDeviceRegistry::build(&deployment, 0, None).unwrap();
        let home = registry.transmitters[0].home_bearing.unwrap();
        let expected = remsim_common::Bearing::from_azimuth_deg(120.0);
        assert!((home.x - expected.x).abs() < 1e-12);
        assert!((home.y - expected.y).abs() < 1e-12);
    }
}
