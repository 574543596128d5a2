//! Binary formats for generated synaptic blocks
//!
//! This crate defines the device-facing contract of the neuromap connectivity
//! front end: connection records with fixed field widths, per slice-pair
//! block headers with CRC32 integrity checks, and block files collecting the
//! blocks of one or more projections.

#![deny(missing_docs)]
#![warn(clippy::all)]

/// Time representation (nanoseconds since simulation start)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Time(pub u64);

impl Time {
    /// Create time from nanoseconds
    pub const fn from_nanos(ns: u64) -> Self {
        Self(ns)
    }

    /// Create time from milliseconds
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms * 1_000_000)
    }

    /// Create time from a whole number of machine time steps
    pub const fn from_steps(steps: u64, machine_time_step_us: u32) -> Self {
        Self(steps * machine_time_step_us as u64 * 1_000)
    }

    /// Get nanoseconds since simulation start
    pub const fn nanos(&self) -> u64 {
        self.0
    }

    /// Milliseconds as a float, the unit recorded results are reported in
    pub fn as_millis_f64(&self) -> f64 {
        self.0 as f64 / 1_000_000.0
    }

    /// Zero time constant
    pub const ZERO: Self = Self(0);
}

/// Spike event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Spike {
    /// Neuron that spiked
    pub neuron_id: NeuronId,
    /// Time of spike
    pub time: Time,
}

impl Spike {
    /// Create a new spike
    pub fn new(neuron_id: NeuronId, time: Time) -> Self {
        Self { neuron_id, time }
    }
}

pub mod block;
pub mod error;
pub mod file;
pub mod ids;
pub mod schemas;

pub use block::{layout, AtomRange, ConnectionRecord, SynapticBlock, SynapticBlockHeader};
pub use error::{Result, StorageError};
pub use file::{decode_block_file, encode_block_file, read_block_file, BlockFileWriter};
pub use ids::{NeuronId, PopulationId, ProjectionId};

/// Storage crate version for compatibility checking
pub const STORAGE_VERSION: u32 = 1;

/// Magic numbers for all binary formats
pub mod magic {
    /// Synaptic block magic number: "SYNB"
    pub const SYNB: [u8; 4] = [0x53, 0x59, 0x4E, 0x42];
    /// Block file magic number: "SYNF"
    pub const SYNF: [u8; 4] = [0x53, 0x59, 0x4E, 0x46];
}
