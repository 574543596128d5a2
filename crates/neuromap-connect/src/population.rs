//! Neuron populations and views onto them

use crate::error::{ConnectError, Result};
use crate::recording::{Capabilities, Recordable, RecordedVertex, Recorder, Sample, SimulationStatus};
use crate::space::Position;
use crate::structure::Structure;
use neuromap_storage::{NeuronId, PopulationId, Spike};
use once_cell::sync::OnceCell;
use rand::Rng;
use std::collections::BTreeMap;

/// A group of neurons sharing a model, optionally placed in space
#[derive(Debug)]
pub struct Population {
    id: PopulationId,
    label: String,
    size: usize,
    structure: Option<Structure>,
    positions: OnceCell<Vec<Position>>,
    recorder: Recorder,
    requires_mapping: bool,
    max_atoms_per_core: Option<usize>,
}

impl Population {
    /// Create a population of `size` neurons
    pub fn new(id: PopulationId, label: impl Into<String>, size: usize) -> Result<Self> {
        let label = label.into();
        if size == 0 {
            return Err(ConnectError::invalid_config(format!(
                "population '{}' must have a size greater than zero",
                label
            )));
        }
        Ok(Self {
            id,
            label,
            size,
            structure: None,
            positions: OnceCell::new(),
            recorder: Recorder::new(Capabilities::NONE),
            requires_mapping: true,
            max_atoms_per_core: None,
        })
    }

    /// Place neurons with a structure
    pub fn with_structure(mut self, structure: Structure) -> Self {
        self.structure = Some(structure);
        self.positions = OnceCell::new();
        self
    }

    /// Declare what the neuron model supports
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.recorder = Recorder::new(capabilities);
        self
    }

    /// Population id
    pub fn id(&self) -> PopulationId {
        self.id
    }

    /// Label
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Number of neurons
    pub fn size(&self) -> usize {
        self.size
    }

    /// Structure, if any
    pub fn structure(&self) -> Option<&Structure> {
        self.structure.as_ref()
    }

    /// Declared capabilities
    pub fn capabilities(&self) -> Capabilities {
        self.recorder.capabilities()
    }

    /// Neuron positions, generated from the structure on first access
    pub fn positions(&self) -> Result<&[Position]> {
        self.positions
            .get_or_try_init(|| {
                let structure = self.structure.as_ref().ok_or_else(|| {
                    ConnectError::invalid_config(format!(
                        "population '{}' has no structure, so its neurons have no positions",
                        self.label
                    ))
                })?;
                log::debug!("generating {} positions for '{}' ({})", self.size, self.label, structure.name());
                structure.generate_positions(self.size)
            })
            .map(Vec::as_slice)
    }

    /// Override the positions; marks the population for remapping
    pub fn set_positions(&mut self, positions: Vec<Position>) -> Result<()> {
        if positions.len() != self.size {
            return Err(ConnectError::invalid_config(format!(
                "{} positions given for population '{}' of size {}",
                positions.len(),
                self.label,
                self.size
            )));
        }
        self.positions = OnceCell::from(positions);
        self.requires_mapping = true;
        Ok(())
    }

    /// Position of one neuron
    pub fn position(&self, index: usize) -> Result<Position> {
        let index = self.check_index(index)?;
        Ok(self.positions()?[index])
    }

    /// Index of the neuron nearest to `position`
    pub fn nearest(&self, position: &Position) -> Result<usize> {
        let positions = self.positions()?;
        let distance2 = |p: &Position| -> f64 { (0..3).map(|k| (p[k] - position[k]).powi(2)).sum() };
        positions
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| distance2(a).total_cmp(&distance2(b)))
            .map(|(i, _)| i)
            .ok_or_else(|| ConnectError::invalid_config("population has no positions"))
    }

    /// Population-local index of a neuron id
    pub fn id_to_index(&self, id: NeuronId) -> Result<usize> {
        self.check_index(id.index())
    }

    fn check_index(&self, index: usize) -> Result<usize> {
        if index >= self.size {
            return Err(ConnectError::invalid_parameter(
                "neuron index",
                index.to_string(),
                format!("< {} (size of '{}')", self.size, self.label),
            ));
        }
        Ok(index)
    }

    /// Random subset of `n` distinct neurons
    pub fn sample<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Result<PopulationView> {
        if n > self.size {
            return Err(ConnectError::invalid_config(format!(
                "cannot sample {} neurons from population '{}' of size {}",
                n, self.label, self.size
            )));
        }
        let indices = rand::seq::index::sample(rng, self.size, n).into_vec();
        Ok(PopulationView {
            parent: self.id,
            label: format!("view of {}", self.label),
            indices,
        })
    }

    /// Whether a change since the last mapping needs a new one
    pub fn requires_mapping(&self) -> bool {
        self.requires_mapping
    }

    /// Mark the current state as mapped
    pub fn mark_no_changes_made(&mut self) {
        self.requires_mapping = false;
    }

    /// Model-based limit on atoms per core, if set
    pub fn max_atoms_per_core(&self) -> Option<usize> {
        self.max_atoms_per_core
    }

    /// Cap atoms per core for this population's model
    pub fn set_model_based_max_atoms_per_core(&mut self, max_atoms_per_core: usize) -> Result<()> {
        if !self.capabilities().atoms_per_core {
            return Err(ConnectError::missing_capability(&self.label, "a model-based max atoms per core"));
        }
        if max_atoms_per_core == 0 {
            return Err(ConnectError::invalid_parameter("max_atoms_per_core", "0", "> 0"));
        }
        self.max_atoms_per_core = Some(max_atoms_per_core);
        self.requires_mapping = true;
        Ok(())
    }

    /// Record spikes
    pub fn record(&mut self) -> Result<()> {
        self.record_quantity(Recordable::Spikes)
    }

    /// Record membrane voltage
    pub fn record_v(&mut self) -> Result<()> {
        self.record_quantity(Recordable::V)
    }

    /// Record synaptic conductance
    pub fn record_gsyn(&mut self) -> Result<()> {
        self.record_quantity(Recordable::Gsyn)
    }

    fn record_quantity(&mut self, what: Recordable) -> Result<()> {
        self.recorder.record(&self.label, what)?;
        self.requires_mapping = true;
        Ok(())
    }

    /// Recorded spikes of all mapped vertices
    pub fn get_spikes(
        &self,
        status: &dyn SimulationStatus,
        vertices: &[&dyn RecordedVertex],
    ) -> Result<Vec<Spike>> {
        self.recorder.get_spikes(&self.label, status, vertices)
    }

    /// Recorded membrane voltages
    pub fn get_v(&self, status: &dyn SimulationStatus, vertices: &[&dyn RecordedVertex]) -> Result<Vec<Sample>> {
        self.recorder.get_samples(&self.label, Recordable::V, status, vertices)
    }

    /// Recorded synaptic conductances
    pub fn get_gsyn(&self, status: &dyn SimulationStatus, vertices: &[&dyn RecordedVertex]) -> Result<Vec<Sample>> {
        self.recorder.get_samples(&self.label, Recordable::Gsyn, status, vertices)
    }

    /// Spike count per neuron
    pub fn get_spike_counts(
        &self,
        status: &dyn SimulationStatus,
        vertices: &[&dyn RecordedVertex],
    ) -> Result<BTreeMap<usize, u64>> {
        self.recorder.get_spike_counts(&self.label, self.size, status, vertices)
    }

    /// Mean spikes per neuron
    pub fn mean_spike_count(&self, status: &dyn SimulationStatus, vertices: &[&dyn RecordedVertex]) -> Result<f64> {
        self.recorder.mean_spike_count(&self.label, self.size, status, vertices)
    }
}

/// A subset of a population's neurons
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopulationView {
    parent: PopulationId,
    label: String,
    indices: Vec<usize>,
}

impl PopulationView {
    /// Parent population
    pub fn parent(&self) -> PopulationId {
        self.parent
    }

    /// Label
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Parent-local indices, in selection order
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Number of neurons
    pub fn size(&self) -> usize {
        self.indices.len()
    }
}
