//! Per-point channel realization.
//!
//! Propagation and spectrum models cache per-device-pair state (shadowing
//! draws, LOS decisions) that is only valid within one temporal
//! simulation. Reusing one instance across independent spatial samples
//! would silently correlate unrelated points and bias the map, so the
//! realizer hands the calculator a freshly constructed set of models for
//! every (point, iteration, transmitter) evaluation and the calculator
//! drops them immediately after use.

use crate::device::{ProbeReceiver, ProbeTransmitter};
use remsim_channel::{
    ChannelConditionModel, ChannelConfig, PropagationLoss, PropagationLossModel, SpectrumFading,
    SpectrumFadingModel,
};
use remsim_common::RemError;

/// Freshly constructed channel models for a single evaluation.
///
/// Owned exclusively by the computation of one sample; never aliased
/// with any other point's or iteration's models.
pub struct ChannelRealization {
    /// Path loss + shadowing.
    pub propagation: Box<dyn PropagationLoss>,
    /// Per-bin fading.
    pub fading: Box<dyn SpectrumFading>,
    /// LOS/NLOS decisions.
    pub condition: ChannelConditionModel,
}

/// Capability to produce fresh channel models for one evaluation.
///
/// The engine calls this once per (point, iteration, transmitter) and
/// discards the result afterward. Tests inject stub implementations to
/// prove the engine never reuses a realization.
pub trait ChannelRealizer {
    /// Fresh models for evaluating `ptd` against `prd` at the given
    /// sample indices.
    fn realize(
        &mut self,
        ptd: &ProbeTransmitter,
        prd: &ProbeReceiver,
        point_index: usize,
        iteration: u16,
        ptd_index: usize,
    ) -> Result<ChannelRealization, RemError>;
}

/// Default realizer: value-copies the scenario's [`ChannelConfig`] into
/// fresh model instances, parameterized identically to the models of the
/// real simulation.
///
/// Sub-seeds are derived from the master seed and the sample indices, so
/// every sample sees an independent, reproducible random stream
/// regardless of evaluation order.
pub struct ScenarioRealizer {
    config: ChannelConfig,
    master_seed: u64,
}

impl ScenarioRealizer {
    /// Create a realizer for the given channel configuration.
    pub fn new(config: ChannelConfig, master_seed: u64) -> Self {
        ScenarioRealizer {
            config,
            master_seed,
        }
    }

    fn sub_seed(&self, point_index: usize, iteration: u16, ptd_index: usize, salt: u64) -> u64 {
        // SplitMix64-style mixing of the sample coordinates.
        let mut z = self
            .master_seed
            .wrapping_add(0x9e37_79b9_7f4a_7c15_u64.wrapping_mul(point_index as u64 + 1))
            .wrapping_add(0xbf58_476d_1ce4_e5b9_u64.wrapping_mul(iteration as u64 + 1))
            .wrapping_add(0x94d0_49bb_1331_11eb_u64.wrapping_mul(ptd_index as u64 + 1))
            .wrapping_add(salt);
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }
}

impl ChannelRealizer for ScenarioRealizer {
    fn realize(
        &mut self,
        ptd: &ProbeTransmitter,
        _prd: &ProbeReceiver,
        point_index: usize,
        iteration: u16,
        ptd_index: usize,
    ) -> Result<ChannelRealization, RemError> {
        let frequency_hz = ptd.spectrum.center_frequency_hz;
        let propagation = PropagationLossModel::new(
            &self.config,
            frequency_hz,
            self.sub_seed(point_index, iteration, ptd_index, 1),
        );
        let fading = SpectrumFadingModel::new(
            &self.config,
            self.sub_seed(point_index, iteration, ptd_index, 2),
        );
        let condition = ChannelConditionModel::new(
            self.config.propagation,
            self.sub_seed(point_index, iteration, ptd_index, 3),
        );
        Ok(ChannelRealization {
            propagation: Box::new(propagation),
            fading: Box::new(fading),
            condition,
        })
    }
}
