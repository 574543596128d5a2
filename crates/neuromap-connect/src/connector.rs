//! Connectors and the distance-dependent probability connector
//!
//! A connector is configured once per projection with
//! [`Connector::set_projection_information`]. After that it answers bound
//! queries used for memory pre-allocation and generates one block of
//! connection records per (pre-slice, post-slice) pair.

use crate::error::{ConnectError, Result};
use crate::estimator::{
    clamp_probability, connections_in_delay_window, probable_maximum_selected, CapacityBound, DelayWindow,
    PairCounts, DEFAULT_CHANCE,
};
use crate::expr::Expression;
use crate::generators::{delay_ms_to_steps, delays_to_steps, weights_to_fixed, ParameterSource};
use crate::packer::pack_records;
use crate::population::Population;
use crate::rng::ProjectionRng;
use crate::sampler::{sample_block, SampleRequest};
use crate::slice::Slice;
use crate::space::{Position, Space};
use ndarray::{s, Array2, Axis};
use neuromap_storage::ConnectionRecord;
use std::fmt;
use std::ops::Range;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Pre-synaptic rows evaluated at a time when the field is not kept
const ROW_CHUNK: usize = 256;

/// Interface between a projection and its connectivity rule
pub trait Connector: fmt::Display {
    /// Bind the connector to its populations and random source
    fn set_projection_information(
        &mut self,
        pre: &Population,
        post: &Population,
        rng: ProjectionRng,
        machine_time_step_us: u32,
    ) -> Result<()>;

    /// Largest delay in time steps any generated connection is expected to have
    fn get_delay_maximum(&self) -> Result<u32>;

    /// Bound on connections from one pre-synaptic neuron into `post_slice`,
    /// optionally counting only delays inside `delay_window`
    fn get_n_connections_from_pre_vertex_maximum(
        &self,
        post_slice: &Slice,
        delay_window: Option<DelayWindow>,
    ) -> Result<u32>;

    /// Bound on connections into one post-synaptic neuron
    fn get_n_connections_to_post_vertex_maximum(&self) -> Result<u32>;

    /// Bound on connections in the whole projection
    fn get_n_connections_maximum(&self) -> Result<u32>;

    /// Largest weight magnitude any generated connection is expected to have
    fn get_weight_maximum(&self) -> Result<f64>;

    /// Generate the block of one slice pair, advancing the projection's random cursor
    fn create_synaptic_block(
        &mut self,
        pre_slices: &[Slice],
        pre_slice_index: usize,
        post_slices: &[Slice],
        post_slice_index: usize,
        synapse_type: u8,
    ) -> Result<Vec<ConnectionRecord>>;

    /// Generate the block of one slice pair from an explicit random source
    fn create_synaptic_block_with_rng(
        &self,
        pre_slices: &[Slice],
        pre_slice_index: usize,
        post_slices: &[Slice],
        post_slice_index: usize,
        synapse_type: u8,
        rng: &mut ProjectionRng,
    ) -> Result<Vec<ConnectionRecord>>;
}

/// How the probability field is held between calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FieldPolicy {
    /// Keep the whole `(n_pre, n_post)` field
    #[default]
    Dense,
    /// Keep per-column maxima only and re-evaluate each slice pair's block
    PerSlice,
}

/// State bound by `set_projection_information`
#[derive(Debug, Clone)]
struct ProjectionSetup {
    pre_positions: Vec<Position>,
    post_positions: Vec<Position>,
    same_population: bool,
    machine_time_step_us: u32,
    rng: ProjectionRng,
    field: Option<Array2<f64>>,
    /// Largest clamped probability in each post column
    column_max: Vec<f64>,
}

impl ProjectionSetup {
    fn n_pre(&self) -> usize {
        self.pre_positions.len()
    }

    fn n_post(&self) -> usize {
        self.post_positions.len()
    }

    fn n_total(&self) -> u64 {
        self.n_pre() as u64 * self.n_post() as u64
    }

    fn max_probability(&self, columns: Range<usize>) -> f64 {
        self.column_max[columns].iter().copied().fold(0.0, f64::max)
    }
}

/// Connects each pair with a probability given by an expression of their distance
#[derive(Debug, Clone)]
pub struct DistanceDependentProbabilityConnector {
    d_expression: Expression,
    allow_self_connections: bool,
    space: Space,
    weights: ParameterSource,
    delays: Option<ParameterSource>,
    field_policy: FieldPolicy,
    chance: f64,
    setup: Option<ProjectionSetup>,
}

impl DistanceDependentProbabilityConnector {
    /// Create a connector
    ///
    /// `n_connections` is accepted for interface compatibility only; any
    /// value is rejected because a fixed connection count cannot be combined
    /// with independent per-pair probabilities.
    pub fn new(d_expression: &str, allow_self_connections: bool, n_connections: Option<u32>) -> Result<Self> {
        if let Some(n) = n_connections {
            return Err(ConnectError::invalid_config(format!(
                "n_connections ({}) is not supported by DistanceDependentProbabilityConnector",
                n
            )));
        }
        Ok(Self {
            d_expression: Expression::parse(d_expression)?,
            allow_self_connections,
            space: Space::default(),
            weights: ParameterSource::Fixed(0.0),
            delays: None,
            field_policy: FieldPolicy::Dense,
            chance: DEFAULT_CHANCE,
            setup: None,
        })
    }

    /// Set the weight source (default: fixed 0.0)
    pub fn with_weights(mut self, weights: ParameterSource) -> Self {
        self.weights = weights;
        self.setup = None;
        self
    }

    /// Set the delay source in milliseconds (default: one time step)
    pub fn with_delays(mut self, delays: ParameterSource) -> Self {
        self.delays = Some(delays);
        self.setup = None;
        self
    }

    /// Set the metric space
    pub fn with_space(mut self, space: Space) -> Result<Self> {
        space.validate()?;
        self.space = space;
        self.setup = None;
        Ok(self)
    }

    /// Set how the probability field is held
    pub fn with_field_policy(mut self, field_policy: FieldPolicy) -> Self {
        self.field_policy = field_policy;
        self.setup = None;
        self
    }

    /// Set the probability with which a bound may be exceeded
    pub fn with_chance(mut self, chance: f64) -> Result<Self> {
        if !(chance > 0.0 && chance < 1.0) {
            return Err(ConnectError::invalid_parameter("chance", chance.to_string(), "within (0, 1)"));
        }
        self.chance = chance;
        Ok(self)
    }

    /// Distance expression
    pub fn d_expression(&self) -> &Expression {
        &self.d_expression
    }

    /// Replace the distance expression; the projection must be set up again
    pub fn set_d_expression(&mut self, d_expression: &str) -> Result<()> {
        self.d_expression = Expression::parse(d_expression)?;
        self.invalidate();
        Ok(())
    }

    /// Whether a neuron may connect to itself
    pub fn allow_self_connections(&self) -> bool {
        self.allow_self_connections
    }

    /// Change self-connection handling; the projection must be set up again
    pub fn set_allow_self_connections(&mut self, allow_self_connections: bool) {
        self.allow_self_connections = allow_self_connections;
        self.invalidate();
    }

    fn invalidate(&mut self) {
        if self.setup.take().is_some() {
            log::debug!("{} changed, projection information cleared", self);
        }
    }

    /// Metric space
    pub fn space(&self) -> &Space {
        &self.space
    }

    /// Weight source
    pub fn weights(&self) -> &ParameterSource {
        &self.weights
    }

    /// Delay source, `None` for one time step
    pub fn delays(&self) -> Option<&ParameterSource> {
        self.delays.as_ref()
    }

    /// Field policy
    pub fn field_policy(&self) -> FieldPolicy {
        self.field_policy
    }

    /// Whether `set_projection_information` has been called since the last change
    pub fn is_configured(&self) -> bool {
        self.setup.is_some()
    }

    fn setup(&self, operation: &'static str) -> Result<&ProjectionSetup> {
        self.setup
            .as_ref()
            .ok_or(ConnectError::ProjectionNotSet { operation })
    }

    fn evaluate_block(
        &self,
        pre_positions: &[Position],
        post_positions: &[Position],
        rows: Range<usize>,
        columns: Range<usize>,
    ) -> Result<Array2<f64>> {
        let field = self.space.distances(
            &pre_positions[rows],
            &post_positions[columns],
            self.d_expression.is_expanded(),
        );
        match field.axis_views() {
            Some(axes) => self.d_expression.evaluate_expanded(field.total.view(), axes),
            None => self.d_expression.evaluate(field.total.view()),
        }
    }

    /// All three bounds for one post slice
    pub fn capacity_bound(&self, post_slice: &Slice) -> Result<CapacityBound> {
        Ok(CapacityBound {
            max_from_one_pre: self.get_n_connections_from_pre_vertex_maximum(post_slice, None)?,
            max_to_one_post: self.get_n_connections_to_post_vertex_maximum()?,
            max_total: self.get_n_connections_maximum()?,
        })
    }

    fn steps(&self, setup: &ProjectionSetup, delay_ms: f64) -> Result<u32> {
        let steps = delay_ms_to_steps(delay_ms, setup.machine_time_step_us)?;
        Ok(steps.clamp(1, u32::MAX as i64) as u32)
    }
}

fn column_maxima(block: &Array2<f64>, into: &mut [f64]) -> Result<()> {
    for (column, values) in into.iter_mut().zip(block.axis_iter(Axis(1))) {
        for &p in values.iter() {
            *column = column.max(clamp_probability(p)?);
        }
    }
    Ok(())
}

fn slice_at<'a>(slices: &'a [Slice], index: usize, what: &str) -> Result<&'a Slice> {
    slices.get(index).ok_or_else(|| {
        ConnectError::invalid_parameter(
            format!("{} slice index", what),
            index.to_string(),
            format!("< {}", slices.len()),
        )
    })
}

impl Connector for DistanceDependentProbabilityConnector {
    fn set_projection_information(
        &mut self,
        pre: &Population,
        post: &Population,
        rng: ProjectionRng,
        machine_time_step_us: u32,
    ) -> Result<()> {
        if machine_time_step_us == 0 {
            return Err(ConnectError::invalid_parameter("machine_time_step", "0", "> 0"));
        }
        let pre_positions = pre.positions()?.to_vec();
        let post_positions = post.positions()?.to_vec();
        let (n_pre, n_post) = (pre_positions.len(), post_positions.len());

        self.weights.validate("weights", n_pre, n_post)?;
        let n_total = (n_pre as u64) * (n_post as u64);
        match &self.weights {
            ParameterSource::Fixed(w) => {
                weights_to_fixed(&[*w])?;
            }
            ParameterSource::PerPair(values) => {
                weights_to_fixed(&values.iter().copied().collect::<Vec<_>>())?;
            }
            ParameterSource::Random(_) => {
                weights_to_fixed(&[self.weights.maximum_magnitude(n_total, self.chance)?])?;
            }
        }
        if let Some(delays) = &self.delays {
            delays.validate("delays", n_pre, n_post)?;
            match delays {
                ParameterSource::Fixed(ms) => {
                    delays_to_steps(&[*ms], machine_time_step_us)?;
                }
                ParameterSource::PerPair(values) => {
                    delays_to_steps(&values.iter().copied().collect::<Vec<_>>(), machine_time_step_us)?;
                }
                // the probable maximum is what get_delay_maximum reports
                ParameterSource::Random(dist) => {
                    delays_to_steps(&[dist.maximum_probable_value(n_total, self.chance)?], machine_time_step_us)?;
                }
            }
        }

        let mut column_max = vec![0.0; n_post];
        let field = match self.field_policy {
            FieldPolicy::Dense => {
                let field = self.evaluate_block(&pre_positions, &post_positions, 0..n_pre, 0..n_post)?;
                column_maxima(&field, &mut column_max)?;
                Some(field)
            }
            FieldPolicy::PerSlice => {
                for start in (0..n_pre).step_by(ROW_CHUNK) {
                    let rows = start..(start + ROW_CHUNK).min(n_pre);
                    let block = self.evaluate_block(&pre_positions, &post_positions, rows, 0..n_post)?;
                    column_maxima(&block, &mut column_max)?;
                }
                None
            }
        };

        log::info!(
            "{}: {} -> {} ({}x{}), {:?} field, rng seed {}",
            self,
            pre.label(),
            post.label(),
            n_pre,
            n_post,
            self.field_policy,
            rng.seed()
        );

        self.setup = Some(ProjectionSetup {
            pre_positions,
            post_positions,
            same_population: pre.id() == post.id(),
            machine_time_step_us,
            rng,
            field,
            column_max,
        });
        Ok(())
    }

    fn get_delay_maximum(&self) -> Result<u32> {
        let setup = self.setup("get_delay_maximum")?;
        let n = self.get_n_connections_maximum()?;
        if n == 0 {
            return Ok(0);
        }
        match &self.delays {
            None => Ok(1),
            Some(ParameterSource::Fixed(ms)) => self.steps(setup, *ms),
            Some(ParameterSource::PerPair(values)) => values
                .iter()
                .try_fold(1u32, |max, &ms| -> Result<u32> { Ok(max.max(self.steps(setup, ms)?)) }),
            Some(ParameterSource::Random(dist)) => {
                let ms = dist.maximum_probable_value(n as u64, self.chance)?;
                self.steps(setup, ms)
            }
        }
    }

    fn get_n_connections_from_pre_vertex_maximum(
        &self,
        post_slice: &Slice,
        delay_window: Option<DelayWindow>,
    ) -> Result<u32> {
        let setup = self.setup("get_n_connections_from_pre_vertex_maximum")?;
        post_slice.check_within(setup.n_post(), "post-synaptic")?;
        let p = setup.max_probability(post_slice.range());
        let n = probable_maximum_selected(setup.n_total(), post_slice.n_atoms() as u64, p, self.chance)?;
        match delay_window {
            None => Ok(n),
            Some(window) => connections_in_delay_window(
                setup.n_total(),
                n,
                self.delays.as_ref(),
                post_slice.range(),
                window,
                setup.machine_time_step_us,
                self.chance,
            ),
        }
    }

    fn get_n_connections_to_post_vertex_maximum(&self) -> Result<u32> {
        let setup = self.setup("get_n_connections_to_post_vertex_maximum")?;
        let p = setup.max_probability(0..setup.n_post());
        probable_maximum_selected(setup.n_total(), setup.n_pre() as u64, p, self.chance)
    }

    fn get_n_connections_maximum(&self) -> Result<u32> {
        let setup = self.setup("get_n_connections_maximum")?;
        let p = setup.max_probability(0..setup.n_post());
        probable_maximum_selected(setup.n_total(), setup.n_total(), p, self.chance)
    }

    fn get_weight_maximum(&self) -> Result<f64> {
        let n = self.get_n_connections_maximum()?;
        self.weights.maximum_magnitude(n as u64, self.chance)
    }

    fn create_synaptic_block(
        &mut self,
        pre_slices: &[Slice],
        pre_slice_index: usize,
        post_slices: &[Slice],
        post_slice_index: usize,
        synapse_type: u8,
    ) -> Result<Vec<ConnectionRecord>> {
        let mut rng = self.setup("create_synaptic_block")?.rng.clone();
        let records = self.create_synaptic_block_with_rng(
            pre_slices,
            pre_slice_index,
            post_slices,
            post_slice_index,
            synapse_type,
            &mut rng,
        )?;
        if let Some(setup) = self.setup.as_mut() {
            setup.rng = rng;
        }
        Ok(records)
    }

    fn create_synaptic_block_with_rng(
        &self,
        pre_slices: &[Slice],
        pre_slice_index: usize,
        post_slices: &[Slice],
        post_slice_index: usize,
        synapse_type: u8,
        rng: &mut ProjectionRng,
    ) -> Result<Vec<ConnectionRecord>> {
        let setup = self.setup("create_synaptic_block")?;
        let pre_slice = slice_at(pre_slices, pre_slice_index, "pre")?;
        let post_slice = slice_at(post_slices, post_slice_index, "post")?;
        pre_slice.check_within(setup.n_pre(), "pre-synaptic")?;
        post_slice.check_within(setup.n_post(), "post-synaptic")?;

        if pre_slice.is_empty() || post_slice.is_empty() {
            return Ok(Vec::new());
        }

        let evaluated;
        let probabilities = match &setup.field {
            Some(field) => field.slice(s![pre_slice.range(), post_slice.range()]),
            None => {
                evaluated = self.evaluate_block(
                    &setup.pre_positions,
                    &setup.post_positions,
                    pre_slice.range(),
                    post_slice.range(),
                )?;
                evaluated.view()
            }
        };

        let pairs = sample_block(
            &SampleRequest {
                pre_slice: *pre_slice,
                post_slice: *post_slice,
                probabilities,
                suppress_self: setup.same_population && !self.allow_self_connections,
            },
            rng,
        )?;

        let observed = PairCounts::from_pairs(&pairs, pre_slice.range(), post_slice.range());
        self.capacity_bound(post_slice)?.check(&observed)?;

        let weights = weights_to_fixed(&self.weights.generate(&pairs, rng)?)?;
        let delays = match &self.delays {
            Some(source) => delays_to_steps(&source.generate(&pairs, rng)?, setup.machine_time_step_us)?,
            None => vec![1; pairs.len()],
        };
        let records = pack_records(&pairs, &weights, &delays, synapse_type)?;

        log::debug!(
            "block pre {} x post {}: {} connections",
            pre_slice,
            post_slice,
            records.len()
        );
        Ok(records)
    }
}

impl fmt::Display for DistanceDependentProbabilityConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DistanceDependentProbabilityConnector({})", self.d_expression.source())
    }
}
