//! Recording capabilities and retrieval of recorded results
//!
//! What a population can record is fixed when it is built, so asking a
//! model for data it cannot produce fails at the `record*` call rather than
//! after a run.

use crate::error::{ConnectError, Result};
use crate::slice::Slice;
use neuromap_storage::{NeuronId, Spike, Time};
use std::collections::BTreeMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// What a neuron model supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Capabilities {
    /// Spike recording
    pub spikes: bool,
    /// Membrane voltage recording
    pub v: bool,
    /// Synaptic conductance recording
    pub gsyn: bool,
    /// Model-specific atoms-per-core limit
    pub atoms_per_core: bool,
}

impl Capabilities {
    /// Everything supported
    pub const ALL: Self = Self {
        spikes: true,
        v: true,
        gsyn: true,
        atoms_per_core: true,
    };

    /// Nothing supported
    pub const NONE: Self = Self {
        spikes: false,
        v: false,
        gsyn: false,
        atoms_per_core: false,
    };

    /// Whether a recordable is supported
    pub fn supports(&self, what: Recordable) -> bool {
        match what {
            Recordable::Spikes => self.spikes,
            Recordable::V => self.v,
            Recordable::Gsyn => self.gsyn,
        }
    }
}

/// Recordable quantities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Recordable {
    /// Spike times
    Spikes,
    /// Membrane voltage
    V,
    /// Synaptic conductance
    Gsyn,
}

impl Recordable {
    /// Capability name used in errors
    pub fn capability(self) -> &'static str {
        match self {
            Self::Spikes => "spike recording",
            Self::V => "voltage recording",
            Self::Gsyn => "gsyn recording",
        }
    }
}

impl fmt::Display for Recordable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Spikes => "spikes",
            Self::V => "v",
            Self::Gsyn => "gsyn",
        })
    }
}

/// State of the simulation the results come from
pub trait SimulationStatus {
    /// Whether a run has completed
    fn has_run(&self) -> bool;

    /// Whether the run used a virtual board, which produces no data
    fn use_virtual_board(&self) -> bool;
}

/// One analogue sample
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Sample {
    /// Neuron sampled
    pub neuron_id: NeuronId,
    /// Sample time
    pub time: Time,
    /// Value
    pub value: f64,
}

/// A mapped machine vertex holding one slice of a population
pub trait RecordedVertex {
    /// Atoms held by the vertex
    fn vertex_slice(&self) -> Slice;

    /// Spikes recorded by the vertex, with population-global neuron ids
    fn spikes(&self) -> Result<Vec<Spike>>;

    /// Analogue samples recorded by the vertex
    fn samples(&self, what: Recordable) -> Result<Vec<Sample>>;
}

/// Recording flags of one population
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Recorder {
    capabilities: Capabilities,
    spikes: bool,
    v: bool,
    gsyn: bool,
}

impl Recorder {
    /// Create a recorder recording nothing
    pub fn new(capabilities: Capabilities) -> Self {
        Self {
            capabilities,
            ..Default::default()
        }
    }

    /// Declared capabilities
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Turn recording of `what` on
    pub fn record(&mut self, label: &str, what: Recordable) -> Result<()> {
        if !self.capabilities.supports(what) {
            return Err(ConnectError::missing_capability(label, what.capability()));
        }
        match what {
            Recordable::Spikes => self.spikes = true,
            Recordable::V => self.v = true,
            Recordable::Gsyn => self.gsyn = true,
        }
        Ok(())
    }

    /// Whether `what` is being recorded
    pub fn is_recording(&self, what: Recordable) -> bool {
        match what {
            Recordable::Spikes => self.spikes,
            Recordable::V => self.v,
            Recordable::Gsyn => self.gsyn,
        }
    }

    /// `Ok(true)` when data can be fetched, `Ok(false)` when the result is empty
    fn ready(&self, label: &str, what: Recordable, status: &dyn SimulationStatus) -> Result<bool> {
        if !self.capabilities.supports(what) {
            return Err(ConnectError::missing_capability(label, what.capability()));
        }
        if !self.is_recording(what) {
            return Err(ConnectError::invalid_config(format!(
                "population '{}' has not been set to record {}",
                label, what
            )));
        }
        if !status.has_run() {
            log::warn!("population '{}': the simulation has not yet run, no {} to return", label, what);
            return Ok(false);
        }
        if status.use_virtual_board() {
            log::warn!(
                "population '{}': the simulation ran on a virtual board, no {} were recorded",
                label,
                what
            );
            return Ok(false);
        }
        Ok(true)
    }

    /// Spikes of every mapped vertex, concatenated in vertex order
    pub fn get_spikes(
        &self,
        label: &str,
        status: &dyn SimulationStatus,
        vertices: &[&dyn RecordedVertex],
    ) -> Result<Vec<Spike>> {
        if !self.ready(label, Recordable::Spikes, status)? {
            return Ok(Vec::new());
        }
        let mut spikes = Vec::new();
        for vertex in vertices {
            spikes.extend(vertex.spikes()?);
        }
        log::debug!("population '{}': {} spikes from {} vertices", label, spikes.len(), vertices.len());
        Ok(spikes)
    }

    /// Analogue samples of every mapped vertex, concatenated in vertex order
    pub fn get_samples(
        &self,
        label: &str,
        what: Recordable,
        status: &dyn SimulationStatus,
        vertices: &[&dyn RecordedVertex],
    ) -> Result<Vec<Sample>> {
        if what == Recordable::Spikes {
            return Err(ConnectError::invalid_parameter("recordable", "spikes", "v or gsyn"));
        }
        if !self.ready(label, what, status)? {
            return Ok(Vec::new());
        }
        let mut samples = Vec::new();
        for vertex in vertices {
            samples.extend(vertex.samples(what)?);
        }
        Ok(samples)
    }

    /// Spike count for every neuron index in `0..size`, zero for silent neurons
    pub fn get_spike_counts(
        &self,
        label: &str,
        size: usize,
        status: &dyn SimulationStatus,
        vertices: &[&dyn RecordedVertex],
    ) -> Result<BTreeMap<usize, u64>> {
        let mut counts: BTreeMap<usize, u64> = (0..size).map(|i| (i, 0)).collect();
        for spike in self.get_spikes(label, status, vertices)? {
            if let Some(c) = counts.get_mut(&spike.neuron_id.index()) {
                *c += 1;
            }
        }
        Ok(counts)
    }

    /// Mean spikes per neuron
    pub fn mean_spike_count(
        &self,
        label: &str,
        size: usize,
        status: &dyn SimulationStatus,
        vertices: &[&dyn RecordedVertex],
    ) -> Result<f64> {
        if size == 0 {
            return Ok(0.0);
        }
        let counts = self.get_spike_counts(label, size, status, vertices)?;
        Ok(counts.values().sum::<u64>() as f64 / size as f64)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub struct Status {
        pub has_run: bool,
        pub virtual_board: bool,
    }

    impl SimulationStatus for Status {
        fn has_run(&self) -> bool {
            self.has_run
        }

        fn use_virtual_board(&self) -> bool {
            self.virtual_board
        }
    }

    pub struct Vertex {
        pub slice: Slice,
        pub spikes: Vec<Spike>,
    }

    impl RecordedVertex for Vertex {
        fn vertex_slice(&self) -> Slice {
            self.slice
        }

        fn spikes(&self) -> Result<Vec<Spike>> {
            Ok(self.spikes.clone())
        }

        fn samples(&self, _what: Recordable) -> Result<Vec<Sample>> {
            Ok(self
                .slice
                .range()
                .map(|i| Sample {
                    neuron_id: NeuronId::new(i as u32),
                    time: Time::ZERO,
                    value: -65.0,
                })
                .collect())
        }
    }

    pub fn spike(id: u32, ms: u64) -> Spike {
        Spike::new(NeuronId::new(id), Time::from_millis(ms))
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    const RAN: Status = Status {
        has_run: true,
        virtual_board: false,
    };

    #[test]
    fn test_record_requires_capability() {
        let mut recorder = Recorder::new(Capabilities {
            spikes: true,
            ..Capabilities::NONE
        });
        assert!(recorder.record("pop", Recordable::Spikes).is_ok());
        let err = recorder.record("pop", Recordable::V).unwrap_err();
        assert!(matches!(err, ConnectError::MissingCapability { .. }));
        assert!(recorder.is_recording(Recordable::Spikes));
        assert!(!recorder.is_recording(Recordable::V));
    }

    #[test]
    fn test_not_recording_is_an_error() {
        let recorder = Recorder::new(Capabilities::ALL);
        assert!(recorder.get_spikes("pop", &RAN, &[]).unwrap_err().is_configuration());
    }

    #[test]
    fn test_not_run_and_virtual_board_are_empty() {
        let mut recorder = Recorder::new(Capabilities::ALL);
        recorder.record("pop", Recordable::Spikes).unwrap();
        let vertex = Vertex {
            slice: Slice::whole(2),
            spikes: vec![spike(0, 1)],
        };
        let not_run = Status {
            has_run: false,
            virtual_board: false,
        };
        let virtual_board = Status {
            has_run: true,
            virtual_board: true,
        };
        assert!(recorder.get_spikes("pop", &not_run, &[&vertex]).unwrap().is_empty());
        assert!(recorder.get_spikes("pop", &virtual_board, &[&vertex]).unwrap().is_empty());
        assert_eq!(recorder.get_spikes("pop", &RAN, &[&vertex]).unwrap().len(), 1);
    }

    #[test]
    fn test_spikes_concatenate_all_vertices() {
        let mut recorder = Recorder::new(Capabilities::ALL);
        recorder.record("pop", Recordable::Spikes).unwrap();
        let a = Vertex {
            slice: Slice::new(0, 2).unwrap(),
            spikes: vec![spike(0, 1), spike(1, 3)],
        };
        let b = Vertex {
            slice: Slice::new(2, 4).unwrap(),
            spikes: vec![spike(3, 2)],
        };
        let spikes = recorder.get_spikes("pop", &RAN, &[&a, &b]).unwrap();
        assert_eq!(spikes, vec![spike(0, 1), spike(1, 3), spike(3, 2)]);

        let counts = recorder.get_spike_counts("pop", 4, &RAN, &[&a, &b]).unwrap();
        assert_eq!(counts.len(), 4);
        assert_eq!(counts[&2], 0);
        assert_eq!(counts[&3], 1);
        assert!((recorder.mean_spike_count("pop", 4, &RAN, &[&a, &b]).unwrap() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_samples() {
        let mut recorder = Recorder::new(Capabilities::ALL);
        recorder.record("pop", Recordable::V).unwrap();
        let a = Vertex {
            slice: Slice::new(0, 3).unwrap(),
            spikes: vec![],
        };
        let v = recorder.get_samples("pop", Recordable::V, &RAN, &[&a]).unwrap();
        assert_eq!(v.len(), 3);
        assert!(recorder.get_samples("pop", Recordable::Gsyn, &RAN, &[&a]).is_err());
        assert!(recorder.get_samples("pop", Recordable::Spikes, &RAN, &[&a]).is_err());
    }
}
