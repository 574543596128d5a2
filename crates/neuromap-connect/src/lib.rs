//! Distance-dependent probabilistic connectors for partitioned spiking networks
//!
//! This crate turns a user expression over neuron distances into concrete
//! synaptic connectivity, one (pre-slice, post-slice) block at a time:
//!
//! - [`expr`] parses and evaluates the restricted distance expression
//! - [`estimator`] bounds fan-out, fan-in and total connection counts
//! - [`sampler`] draws the connected pairs of one block
//! - [`generators`] produce weights and delays in device units
//! - [`packer`] emits fixed-width connection records
//!
//! [`DistanceDependentProbabilityConnector`] ties these together behind the
//! [`Connector`] trait, and [`Projection`] drives it across a partitioning.

#![deny(missing_docs)]
#![warn(clippy::all)]

// Re-export essential types from storage
pub use neuromap_storage::{
    ConnectionRecord, NeuronId, PopulationId, ProjectionId, Spike, SynapticBlock, Time,
    Result as StorageResult, StorageError,
};

// Core modules
pub mod connector;
pub mod error;
pub mod estimator;
pub mod expr;
pub mod fixed_point;
pub mod generators;
pub mod packer;
pub mod population;
pub mod projection;
pub mod recording;
pub mod rng;
pub mod sampler;
pub mod slice;
pub mod space;
pub mod structure;
pub mod synapse_types;

// Re-export essential types
pub use connector::{Connector, DistanceDependentProbabilityConnector, FieldPolicy};
pub use error::{ConnectError, Result};
pub use estimator::{probable_maximum_selected, CapacityBound, DelayWindow, DEFAULT_CHANCE};
pub use expr::Expression;
pub use fixed_point::{S1615, U032};
pub use generators::{ParameterSource, RandomDistribution, MAX_DELAY_STEPS};
pub use population::{Population, PopulationView};
pub use projection::{FixedAtomsPartitioner, Projection, SliceBound, SlicePartitioner, SlicePlan};
pub use recording::{Capabilities, Recordable, RecordedVertex, Sample, SimulationStatus};
pub use rng::ProjectionRng;
pub use slice::Slice;
pub use space::{DistanceField, Position, Space};
pub use structure::{Boundary, FillOrder, Structure};
pub use synapse_types::{Receptor, SynapseTypeHt};

/// Connect crate version for compatibility checking
pub const CONNECT_VERSION: u32 = 1;

/// Default machine time step (1 ms in microseconds)
pub const DEFAULT_MACHINE_TIME_STEP_US: u32 = 1000;
