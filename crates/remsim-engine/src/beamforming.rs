//! Beamforming configuration per sample point.
//!
//! The probe transmitters are shared across all points, so any bearing
//! change made for one point is transient and is rolled back before the
//! next point starts. Point processing is strictly sequential; no two
//! points are ever in flight at once.

use crate::config::RemMode;
use crate::device::ProbeDeviceRegistry;
use remsim_common::Position;

/// Applies the antenna pointing policy of the selected map mode.
#[derive(Debug, Clone, Copy)]
pub struct Beamformer {
    mode: RemMode,
}

impl Beamformer {
    /// Beamformer for the given map mode.
    pub fn new(mode: RemMode) -> Self {
        Beamformer { mode }
    }

    /// The configured map mode.
    pub fn mode(&self) -> RemMode {
        self.mode
    }

    /// Aim the transmit antennas for the given sample point.
    ///
    /// Beam-shape mode keeps the scenario bearings untouched; coverage-area
    /// mode points every transmitter directly at the point.
    pub fn configure_for_point(&self, registry: &mut ProbeDeviceRegistry, point: &Position) {
        if self.mode == RemMode::BeamShape {
            return;
        }
        for ptd in &mut registry.transmitters {
            let position = ptd.position;
            ptd.antenna.point_between(&position, point);
        }
    }

    /// Aim the receiver at the transmitter currently under computation.
    ///
    /// Only coverage-area mode re-aims; beam-shape mode keeps the
    /// scenario's receiver bearing.
    pub fn aim_receiver_at(&self, registry: &mut ProbeDeviceRegistry, ptd_index: usize) {
        if self.mode == RemMode::BeamShape {
            return;
        }
        let target = registry.transmitters[ptd_index].position;
        let from = registry.receiver.position;
        registry.receiver.antenna.point_between(&from, &target);
    }

    /// Undo transient pointing after a point is done: transmitters return
    /// to their home bearings and the receiver to the neutral quasi-omni
    /// state.
    pub fn restore_after_point(&self, registry: &mut ProbeDeviceRegistry) {
        if self.mode == RemMode::BeamShape {
            return;
        }
        for ptd in &mut registry.transmitters {
            ptd.antenna.set_bearing(ptd.home_bearing);
        }
        registry.receiver.antenna.set_quasi_omni();
    }
}
