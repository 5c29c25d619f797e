//! # remsim-engine
//!
//! Radio environment map (REM) generation engine.
//!
//! For each point of a configured grid the engine computes averaged
//! SNR/SINR values as seen by a synthetic probe receiver, considering
//! every probe transmitter of the deployment. Channel models are
//! re-created for every independent sample so that the per-pair state
//! they cache (shadowing, LOS decisions) never correlates unrelated
//! points. Results are written as plain-text records plus a generated
//! gnuplot script.
//!
//! The engine is a one-shot batch: [`orchestrator::RemEngine::install`]
//! arms it, a single deferred [`orchestrator::RemEngine::tick`] builds
//! the whole map, and the instance is finished.

pub mod beamforming;
pub mod calculator;
pub mod config;
pub mod device;
pub mod grid;
pub mod orchestrator;
pub mod realizer;
pub mod writer;

pub use beamforming::Beamformer;
pub use calculator::SignalCalculator;
pub use config::{BinReduction, RemConfig, RemMode};
pub use device::{
    BandwidthPart, NetworkDeployment, Obstacle, ProbeDeviceRegistry, ProbeReceiver,
    ProbeTransmitter, ReceiverConfig, TransmitterConfig,
};
pub use grid::{build_points, RemPoint};
pub use orchestrator::{EngineState, RemEngine, RemReport};
pub use realizer::{ChannelRealization, ChannelRealizer, ScenarioRealizer};
pub use remsim_common::RemError;
pub use writer::MapWriter;
