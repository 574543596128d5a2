//! Projections: a connector applied between two partitioned populations

use crate::connector::Connector;
use crate::error::{ConnectError, Result};
use crate::estimator::CapacityBound;
use crate::packer::into_block;
use crate::population::Population;
use crate::rng::ProjectionRng;
use crate::slice::Slice;
use neuromap_storage::{ConnectionRecord, ProjectionId, SynapticBlock};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Slices of both sides of a projection and the pairs to generate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlicePlan {
    /// Pre-synaptic slices
    pub pre_slices: Vec<Slice>,
    /// Post-synaptic slices
    pub post_slices: Vec<Slice>,
    /// `(pre_slice_index, post_slice_index)` in generation order
    pub pairs: Vec<(usize, usize)>,
}

/// Splits populations into per-core slices
pub trait SlicePartitioner {
    /// Slices covering the whole population, in index order
    fn partition(&self, population: &Population) -> Result<Vec<Slice>>;

    /// Every (pre-slice, post-slice) pair of a projection, pre-major
    fn slice_pairs(&self, pre: &Population, post: &Population) -> Result<SlicePlan> {
        let pre_slices = self.partition(pre)?;
        let post_slices = self.partition(post)?;
        let pairs = (0..pre_slices.len())
            .flat_map(|i| (0..post_slices.len()).map(move |j| (i, j)))
            .collect();
        Ok(SlicePlan {
            pre_slices,
            post_slices,
            pairs,
        })
    }
}

/// Fixed number of atoms per core, lowered by any model-based limit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedAtomsPartitioner {
    max_atoms_per_core: usize,
}

impl FixedAtomsPartitioner {
    /// Create a partitioner
    pub fn new(max_atoms_per_core: usize) -> Result<Self> {
        if max_atoms_per_core == 0 {
            return Err(ConnectError::invalid_parameter("max_atoms_per_core", "0", "> 0"));
        }
        Ok(Self { max_atoms_per_core })
    }

    /// Atoms per core before model limits
    pub fn max_atoms_per_core(&self) -> usize {
        self.max_atoms_per_core
    }
}

impl SlicePartitioner for FixedAtomsPartitioner {
    fn partition(&self, population: &Population) -> Result<Vec<Slice>> {
        let per_core = population
            .max_atoms_per_core()
            .map_or(self.max_atoms_per_core, |m| m.min(self.max_atoms_per_core));
        (0..population.size())
            .step_by(per_core)
            .map(|lo| Slice::new(lo, (lo + per_core).min(population.size())))
            .collect()
    }
}

/// Bounds for one post slice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceBound {
    /// Post slice
    pub post_slice: Slice,
    /// Bounds
    pub bound: CapacityBound,
}

/// A connector bound to its pre and post populations
pub struct Projection<'a, C> {
    id: ProjectionId,
    pre: &'a Population,
    post: &'a Population,
    connector: C,
    synapse_type: u8,
    seed: u64,
}

impl<'a, C: Connector> Projection<'a, C> {
    /// Bind `connector` to `pre` and `post` and set up its random source from `seed`
    pub fn new(
        id: ProjectionId,
        pre: &'a Population,
        post: &'a Population,
        mut connector: C,
        synapse_type: u8,
        seed: u64,
        machine_time_step_us: u32,
    ) -> Result<Self> {
        connector.set_projection_information(pre, post, ProjectionRng::new(seed), machine_time_step_us)?;
        Ok(Self {
            id,
            pre,
            post,
            connector,
            synapse_type,
            seed,
        })
    }

    /// Projection id
    pub fn id(&self) -> ProjectionId {
        self.id
    }

    /// Connector
    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Pre-synaptic population
    pub fn pre(&self) -> &Population {
        self.pre
    }

    /// Post-synaptic population
    pub fn post(&self) -> &Population {
        self.post
    }

    /// Slice plan for this projection
    pub fn plan(&self, partitioner: &dyn SlicePartitioner) -> Result<SlicePlan> {
        partitioner.slice_pairs(self.pre, self.post)
    }

    /// Bounds per post slice
    pub fn bounds(&self, plan: &SlicePlan) -> Result<Vec<SliceBound>> {
        plan.post_slices
            .iter()
            .map(|post_slice| {
                Ok(SliceBound {
                    post_slice: *post_slice,
                    bound: CapacityBound {
                        max_from_one_pre: self
                            .connector
                            .get_n_connections_from_pre_vertex_maximum(post_slice, None)?,
                        max_to_one_post: self.connector.get_n_connections_to_post_vertex_maximum()?,
                        max_total: self.connector.get_n_connections_maximum()?,
                    },
                })
            })
            .collect()
    }

    fn block(&self, plan: &SlicePlan, pair: (usize, usize), records: Vec<ConnectionRecord>) -> Result<SynapticBlock> {
        into_block(self.id, &plan.pre_slices[pair.0], &plan.post_slices[pair.1], records)
    }

    /// Generate every pair's block in plan order from the projection's single random cursor
    pub fn generate(&mut self, plan: &SlicePlan) -> Result<Vec<SynapticBlock>> {
        let mut blocks = Vec::with_capacity(plan.pairs.len());
        for &(i, j) in &plan.pairs {
            let records = self
                .connector
                .create_synaptic_block(&plan.pre_slices, i, &plan.post_slices, j, self.synapse_type)?;
            blocks.push(self.block(plan, (i, j), records)?);
        }
        log::info!("{}: generated {} blocks", self.connector, blocks.len());
        Ok(blocks)
    }

    fn generate_pair(&self, plan: &SlicePlan, (i, j): (usize, usize)) -> Result<SynapticBlock> {
        let mut rng = ProjectionRng::for_slice_pair(self.seed, i, j);
        let records = self.connector.create_synaptic_block_with_rng(
            &plan.pre_slices,
            i,
            &plan.post_slices,
            j,
            self.synapse_type,
            &mut rng,
        )?;
        self.block(plan, (i, j), records)
    }
}

impl<'a, C: Connector + Sync> Projection<'a, C> {
    /// Generate every pair's block from per-pair random streams
    ///
    /// Output depends only on the seed and the plan, not on how pairs are
    /// scheduled across threads.
    pub fn generate_independent(&self, plan: &SlicePlan) -> Result<Vec<SynapticBlock>> {
        #[cfg(feature = "parallel")]
        let blocks: Result<Vec<_>> = plan.pairs.par_iter().map(|&pair| self.generate_pair(plan, pair)).collect();

        #[cfg(not(feature = "parallel"))]
        let blocks: Result<Vec<_>> = plan.pairs.iter().map(|&pair| self.generate_pair(plan, pair)).collect();

        let blocks = blocks?;
        log::info!("{}: generated {} blocks from independent streams", self.connector, blocks.len());
        Ok(blocks)
    }
}
