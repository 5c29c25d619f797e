//! Plain-text map output and gnuplot companions.
//!
//! The map file carries one whitespace-separated record per sample point
//! in grid order. The companion files locate the deployment's devices and
//! obstacles for plotting, and a generated gnuplot script renders the map
//! without any manual axis bookkeeping.

use crate::config::RemConfig;
use crate::device::NetworkDeployment;
use crate::grid::RemPoint;
use remsim_common::RemError;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Writes the finished map and its plot companions.
#[derive(Debug, Clone)]
pub struct MapWriter {
    output_dir: PathBuf,
    sim_tag: String,
}

impl MapWriter {
    /// Writer placing files into `output_dir`, tagging names with
    /// `sim_tag` when it is non-empty.
    pub fn new(output_dir: impl Into<PathBuf>, sim_tag: impl Into<String>) -> Self {
        MapWriter {
            output_dir: output_dir.into(),
            sim_tag: sim_tag.into(),
        }
    }

    fn tagged(&self, stem: &str, extension: &str) -> PathBuf {
        let name = if self.sim_tag.is_empty() {
            format!("{}.{}", stem, extension)
        } else {
            format!("{}-{}.{}", stem, self.sim_tag, extension)
        };
        self.output_dir.join(name)
    }

    /// Path of the map data file.
    pub fn map_path(&self) -> PathBuf {
        self.tagged("rem", "out")
    }

    /// Write the map records in point order.
    ///
    /// Every value must be finite; a NaN or infinity means an upstream
    /// computation bug and aborts the write instead of producing a file
    /// that silently breaks downstream tooling.
    pub fn write_map(&self, points: &[RemPoint]) -> Result<PathBuf, RemError> {
        for point in points {
            for (label, value) in [
                ("x", point.position.x),
                ("y", point.position.y),
                ("z", point.position.z),
                ("avg_snr_db", point.avg_snr_db),
                ("avg_sinr_db", point.avg_sinr_db),
            ] {
                if !value.is_finite() {
                    return Err(RemError::DegenerateValue(format!(
                        "non-finite {} at ({}, {})",
                        label, point.position.x, point.position.y
                    )));
                }
            }
        }

        let path = self.map_path();
        let mut out = BufWriter::new(File::create(&path)?);
        for point in points {
            writeln!(
                out,
                "{:.3} {:.3} {:.3} {:.4} {:.4}",
                point.position.x,
                point.position.y,
                point.position.z,
                point.avg_snr_db,
                point.avg_sinr_db
            )?;
        }
        out.flush()?;
        info!(path = %path.display(), points = points.len(), "wrote map");
        Ok(path)
    }

    /// Write gnuplot label listings of the deployment's transmitters,
    /// the reference receiver and the obstacles.
    pub fn write_deployment_listings(
        &self,
        deployment: &NetworkDeployment,
    ) -> Result<(), RemError> {
        self.write_transmitter_listing(deployment)?;
        self.write_receiver_listing(deployment)?;
        self.write_obstacle_listing(deployment)?;
        Ok(())
    }

    fn write_transmitter_listing(&self, deployment: &NetworkDeployment) -> Result<(), RemError> {
        let path = self.tagged("gnbs", "txt");
        let mut out = BufWriter::new(File::create(&path)?);
        for tx in &deployment.transmitters {
            writeln!(
                out,
                "set label \"{}\" at {:.3},{:.3} left font \"Helvetica,4\" \
                 textcolor rgb \"white\" front point pt 2 ps 0.3 lc rgb \"white\" offset 0,0",
                tx.name, tx.position.x, tx.position.y
            )?;
        }
        out.flush()?;
        Ok(())
    }

    fn write_receiver_listing(&self, deployment: &NetworkDeployment) -> Result<(), RemError> {
        let path = self.tagged("ues", "txt");
        let mut out = BufWriter::new(File::create(&path)?);
        let rx = &deployment.receiver;
        writeln!(
            out,
            "set label \"ue\" at {:.3},{:.3} left font \"Helvetica,4\" \
             textcolor rgb \"grey\" front point pt 1 ps 0.3 lc rgb \"grey\" offset 0,0",
            rx.position.x, rx.position.y
        )?;
        out.flush()?;
        Ok(())
    }

    fn write_obstacle_listing(&self, deployment: &NetworkDeployment) -> Result<(), RemError> {
        let path = self.tagged("buildings", "txt");
        let mut out = BufWriter::new(File::create(&path)?);
        for (index, obstacle) in deployment.obstacles.iter().enumerate() {
            writeln!(
                out,
                "set object {} rect from {:.3},{:.3} to {:.3},{:.3} front fs empty border 3",
                index + 1,
                obstacle.x_min,
                obstacle.y_min,
                obstacle.x_max,
                obstacle.y_max
            )?;
        }
        out.flush()?;
        Ok(())
    }

    /// Write a gnuplot script rendering SNR and SINR heatmaps from the
    /// map file, with axis ranges taken from the grid configuration.
    pub fn write_gnuplot_script(&self, config: &RemConfig) -> Result<PathBuf, RemError> {
        let path = self.tagged("rem-plot", "gnuplot");
        let map = self.map_path();
        let map_name = file_name(&map);
        let mut out = BufWriter::new(File::create(&path)?);

        writeln!(out, "set xrange [{}:{}]", config.x_min, config.x_max)?;
        writeln!(out, "set yrange [{}:{}]", config.y_min, config.y_max)?;
        writeln!(out, "set xlabel \"x (m)\"")?;
        writeln!(out, "set ylabel \"y (m)\"")?;
        writeln!(out, "set view map")?;
        writeln!(out, "set size square")?;
        writeln!(out, "unset key")?;
        writeln!(out)?;
        for (column, quantity) in [(4, "snr"), (5, "sinr")] {
            writeln!(out, "set cblabel \"{} (dB)\"", quantity.to_uppercase())?;
            writeln!(
                out,
                "set output \"rem-{}{}.png\"",
                quantity,
                if self.sim_tag.is_empty() {
                    String::new()
                } else {
                    format!("-{}", self.sim_tag)
                }
            )?;
            writeln!(out, "set terminal pngcairo size 800,600")?;
            writeln!(
                out,
                "plot \"{}\" using 1:2:{} with image",
                map_name, column
            )?;
            writeln!(out)?;
        }
        out.flush()?;
        info!(path = %path.display(), "wrote gnuplot script");
        Ok(path)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
