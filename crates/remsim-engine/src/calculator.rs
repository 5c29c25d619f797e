//! SNR/SINR computation and averaging.
//!
//! For one point and one iteration the calculator receives, per probe
//! transmitter, a fresh channel realization, computes the received PSD
//! at the probe receiver, splits the transmitters into the best server
//! and interferers, reduces per-bin SNR/SINR to wideband values, and
//! accumulates them in the linear power domain. The decibel conversion
//! happens exactly once, on the final linear average: averaging dB
//! values would understate variance and bias the mean.

use crate::beamforming::Beamformer;
use crate::config::BinReduction;
use crate::device::{ProbeDeviceRegistry, ProbeReceiver, ProbeTransmitter};
use crate::grid::RemPoint;
use crate::realizer::{ChannelRealization, ChannelRealizer};
use remsim_common::{
    dbm_to_watts, linear_to_db, RemError, SpectrumValue, THERMAL_NOISE_DBM_PER_HZ,
};

/// Computes the averaged SNR/SINR of sample points.
#[derive(Debug, Clone, Copy)]
pub struct SignalCalculator {
    iterations: u16,
    reduction: BinReduction,
}

impl SignalCalculator {
    /// Calculator averaging `iterations` realizations per point, reducing
    /// bins with the given policy.
    pub fn new(iterations: u16, reduction: BinReduction) -> Self {
        SignalCalculator {
            iterations: iterations.max(1),
            reduction,
        }
    }

    /// Compute and store the averaged SNR/SINR of one point.
    ///
    /// Moves the probe receiver to the point, runs the configured number
    /// of independent realizations, and writes the final dB averages into
    /// the point. This is the single mutation the point ever receives.
    pub fn compute_point(
        &self,
        registry: &mut ProbeDeviceRegistry,
        realizer: &mut dyn ChannelRealizer,
        beamformer: &Beamformer,
        point_index: usize,
        point: &mut RemPoint,
    ) -> Result<(), RemError> {
        registry.receiver.position = point.position;
        let noise_per_bin = noise_bin_power_watts(&registry.receiver);
        let num_bins = registry.receiver.spectrum.num_bins();

        let mut snr_linear_sum = 0.0;
        let mut sinr_linear_sum = 0.0;

        for iteration in 0..self.iterations {
            beamformer.configure_for_point(registry, &point.position);

            let mut received = Vec::with_capacity(registry.transmitters.len());
            for ptd_index in 0..registry.transmitters.len() {
                beamformer.aim_receiver_at(registry, ptd_index);
                let realization = realizer.realize(
                    &registry.transmitters[ptd_index],
                    &registry.receiver,
                    point_index,
                    iteration,
                    ptd_index,
                )?;
                received.push(rx_psd(
                    &registry.transmitters[ptd_index],
                    &registry.receiver,
                    realization,
                ));
                // The realization is dropped here; nothing survives into
                // the next transmitter, iteration or point.
            }

            beamformer.restore_after_point(registry);

            let Some(best) = best_server(&received) else {
                // No transmitter delivered any power; this iteration
                // contributes zero to the linear sums.
                continue;
            };

            let mut interference = SpectrumValue::zeros(num_bins);
            for (index, psd) in received.iter().enumerate() {
                if index != best {
                    interference.add_assign(psd);
                }
            }
            let useful = &received[best];

            snr_linear_sum += self.reduce_bins(useful, |bin, _| bin / noise_per_bin);
            sinr_linear_sum += self.reduce_bins(useful, |bin, i| {
                bin / (noise_per_bin + interference.bins()[i])
            });
        }

        let n = self.iterations as f64;
        point.avg_snr_db = linear_to_db(snr_linear_sum / n);
        point.avg_sinr_db = linear_to_db(sinr_linear_sum / n);
        Ok(())
    }

    /// Reduce a per-bin ratio to one wideband linear value.
    fn reduce_bins<F>(&self, useful: &SpectrumValue, ratio: F) -> f64
    where
        F: Fn(f64, usize) -> f64,
    {
        let values = useful
            .bins()
            .iter()
            .enumerate()
            .map(|(i, &bin)| ratio(bin, i));
        match self.reduction {
            BinReduction::Max => values.fold(0.0, f64::max),
            BinReduction::Mean => {
                let len = useful.len().max(1) as f64;
                values.sum::<f64>() / len
            }
        }
    }
}

/// Index of the transmitter with the highest total received power, or
/// `None` when every PSD is zero (no reachable transmitter).
fn best_server(received: &[SpectrumValue]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (index, psd) in received.iter().enumerate() {
        let total = psd.total_power();
        if total <= 0.0 {
            continue;
        }
        match best {
            Some((_, power)) if power >= total => {}
            _ => best = Some((index, total)),
        }
    }
    best.map(|(index, _)| index)
}

/// Received PSD of one transmitter at the probe receiver, on the
/// receiver's bin grid, consuming the realization.
///
/// Combination is multiplicative in linear power: transmit PSD, path
/// gain, both antenna gains, then per-bin fading. Bands that do not
/// overlap the receiver's spectrum contribute zero power.
fn rx_psd(
    ptd: &ProbeTransmitter,
    prd: &ProbeReceiver,
    mut realization: ChannelRealization,
) -> SpectrumValue {
    let rx_spectrum = &prd.spectrum;
    let mut psd = SpectrumValue::zeros(rx_spectrum.num_bins());

    if !ptd.spectrum.overlaps(rx_spectrum) {
        return psd;
    }

    let condition = realization
        .condition
        .condition(&ptd.position, &prd.position);
    let rx_power_dbm =
        realization
            .propagation
            .rx_power_dbm(ptd.tx_power_dbm, &ptd.position, &prd.position, condition);

    let toward_rx = ptd.position.bearing_to(&prd.position);
    let toward_tx = prd.position.bearing_to(&ptd.position);
    let tx_gain_db = ptd.antenna.gain_db(&toward_rx);
    let rx_gain_db = prd.antenna.gain_db(&toward_tx);

    let total_rx_watts = dbm_to_watts(rx_power_dbm + tx_gain_db + rx_gain_db);
    // Flat transmit PSD: each overlapping receiver bin carries the share
    // of power proportional to its width within the transmitter's band.
    let share = rx_spectrum.bin_width_hz() / ptd.spectrum.bandwidth_hz;
    for (bin, center) in psd.bins_mut().iter_mut().zip(rx_spectrum.bin_centers()) {
        if ptd.spectrum.contains(center) {
            *bin = total_rx_watts * share;
        }
    }

    realization.fading.apply(&mut psd, condition);
    psd
}

/// Noise floor power per receiver bin, in watts: thermal noise density
/// plus the receiver noise figure, integrated over one bin width.
fn noise_bin_power_watts(prd: &ProbeReceiver) -> f64 {
    dbm_to_watts(THERMAL_NOISE_DBM_PER_HZ + prd.noise_figure_db) * prd.spectrum.bin_width_hz()
}
