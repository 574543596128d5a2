//! Binomial-tail bounds on connection counts
//!
//! Memory for synaptic rows is allocated before any connection is drawn, so
//! every count the sampler can produce has to be bounded up front. Each bound
//! is the count a binomial process exceeds only with probability
//! `chance / n_total_selections`; over all selections that makes an overflow
//! roughly a `chance` event, and an overflow is caught and reported rather
//! than truncated.

use crate::error::{ConnectError, Result};
use crate::generators::{delay_ms_to_steps, ParameterSource};
use ndarray::s;
use statrs::distribution::{Binomial, DiscreteCDF};
use std::fmt;
use std::ops::Range;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default probability of a bound being exceeded
pub const DEFAULT_CHANCE: f64 = 1.0 / 100.0;

/// Clamp a probability-field value into `[0, 1]`; `+inf` means certain
pub fn clamp_probability(p: f64) -> Result<f64> {
    if p.is_nan() {
        return Err(ConnectError::invalid_parameter("probability", "NaN", "a number"));
    }
    Ok(p.clamp(0.0, 1.0))
}

/// Smallest `k` with `P[Binomial(n_selected, p) <= k] >= 1 - chance / n_total_selections`
///
/// Monotonic non-decreasing in both `p` and `n_selected`.
pub fn probable_maximum_selected(
    n_total_selections: u64,
    n_selected: u64,
    p: f64,
    chance: f64,
) -> Result<u32> {
    if !(chance > 0.0 && chance < 1.0) {
        return Err(ConnectError::invalid_parameter("chance", chance.to_string(), "within (0, 1)"));
    }
    let p = clamp_probability(p)?;
    if n_selected == 0 || n_total_selections == 0 || p == 0.0 {
        return Ok(0);
    }
    if p >= 1.0 {
        return to_u32(n_selected);
    }

    let binomial = Binomial::new(p, n_selected)
        .map_err(|e| ConnectError::invalid_parameter("probability", p.to_string(), e.to_string()))?;
    let target = 1.0 - chance / n_total_selections as f64;

    let (mut lo, mut hi) = (0u64, n_selected);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if binomial.cdf(mid) >= target {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    to_u32(lo)
}

fn to_u32(n: u64) -> Result<u32> {
    u32::try_from(n).map_err(|_| ConnectError::invalid_parameter("connection count", n.to_string(), "<= u32::MAX"))
}

/// Inclusive range of delays in time steps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DelayWindow {
    /// Shortest delay in the window
    pub min_steps: u32,
    /// Longest delay in the window
    pub max_steps: u32,
}

impl DelayWindow {
    /// Create a window, `min_steps <= max_steps`
    pub fn new(min_steps: u32, max_steps: u32) -> Result<Self> {
        if max_steps < min_steps {
            return Err(ConnectError::invalid_parameter(
                "delay window",
                format!("[{}, {}]", min_steps, max_steps),
                "min_steps <= max_steps",
            ));
        }
        Ok(Self { min_steps, max_steps })
    }

    /// Whether a delay in steps lies in the window
    pub fn contains(&self, steps: u32) -> bool {
        (self.min_steps..=self.max_steps).contains(&steps)
    }
}

impl fmt::Display for DelayWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}] steps", self.min_steps, self.max_steps)
    }
}

/// Delay of one connection in steps as the generator would emit it
fn emitted_steps(delay_ms: f64, machine_time_step_us: u32) -> Result<u32> {
    Ok(delay_ms_to_steps(delay_ms, machine_time_step_us)?.max(1) as u32)
}

/// Restrict a fan-out bound to the connections whose delay falls in `window`
///
/// `delays` is `None` when every connection gets the one-step default.
/// `post_columns` are the post neurons the fan-out is counted over; per-pair
/// delays are bounded by the busiest pre row within those columns.
#[allow(clippy::too_many_arguments)]
pub fn connections_in_delay_window(
    n_total_selections: u64,
    n_connections: u32,
    delays: Option<&ParameterSource>,
    post_columns: Range<usize>,
    window: DelayWindow,
    machine_time_step_us: u32,
    chance: f64,
) -> Result<u32> {
    let Some(delays) = delays else {
        return Ok(if window.contains(1) { n_connections } else { 0 });
    };
    match delays {
        ParameterSource::Fixed(ms) => {
            let steps = emitted_steps(*ms, machine_time_step_us)?;
            Ok(if window.contains(steps) { n_connections } else { 0 })
        }
        ParameterSource::PerPair(values) => {
            if post_columns.start > post_columns.end || post_columns.end > values.ncols() {
                return Err(ConnectError::invalid_parameter(
                    "post columns",
                    format!("{:?}", post_columns),
                    format!("within the {} columns of the delay matrix", values.ncols()),
                ));
            }
            let mut busiest = 0usize;
            for row in values.slice(s![.., post_columns]).rows() {
                let mut inside = 0usize;
                for &ms in row {
                    if window.contains(emitted_steps(ms, machine_time_step_us)?) {
                        inside += 1;
                    }
                }
                busiest = busiest.max(inside);
            }
            Ok(n_connections.min(to_u32(busiest as u64)?))
        }
        ParameterSource::Random(dist) => {
            let step_ms = machine_time_step_us as f64 / 1000.0;
            // Delays below one step are raised to one, so the window's first
            // step also collects everything beneath it.
            let lower = if window.min_steps <= 1 {
                f64::NEG_INFINITY
            } else {
                (window.min_steps as f64 - 0.5) * step_ms
            };
            let upper = (window.max_steps as f64 + 0.5) * step_ms;
            let p = dist.probability_within_range(lower, upper)?;
            probable_maximum_selected(n_total_selections, n_connections as u64, p, chance)
        }
    }
}

/// Precomputed upper bounds on connection counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CapacityBound {
    /// Connections from one pre-synaptic neuron
    pub max_from_one_pre: u32,
    /// Connections into one post-synaptic neuron
    pub max_to_one_post: u32,
    /// Connections in total
    pub max_total: u32,
}

impl CapacityBound {
    /// Fail if observed counts exceed the bound
    pub fn check(&self, observed: &PairCounts) -> Result<()> {
        if observed.max_from_one_pre > self.max_from_one_pre {
            return Err(ConnectError::capacity_violation(
                "fan-out",
                self.max_from_one_pre,
                observed.max_from_one_pre,
            ));
        }
        if observed.max_to_one_post > self.max_to_one_post {
            return Err(ConnectError::capacity_violation(
                "fan-in",
                self.max_to_one_post,
                observed.max_to_one_post,
            ));
        }
        if observed.total > self.max_total {
            return Err(ConnectError::capacity_violation("total", self.max_total, observed.total));
        }
        Ok(())
    }
}

impl fmt::Display for CapacityBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fan-out <= {}, fan-in <= {}, total <= {}",
            self.max_from_one_pre, self.max_to_one_post, self.max_total
        )
    }
}

/// Counts observed in one generated block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PairCounts {
    /// Largest number of pairs sharing a source
    pub max_from_one_pre: u32,
    /// Largest number of pairs sharing a target
    pub max_to_one_post: u32,
    /// Number of pairs
    pub total: u32,
}

impl PairCounts {
    /// Count `(source, target)` pairs whose indices lie in the given ranges
    pub fn from_pairs(
        pairs: &[(usize, usize)],
        source_range: std::ops::Range<usize>,
        target_range: std::ops::Range<usize>,
    ) -> Self {
        let mut from = vec![0u32; source_range.len()];
        let mut to = vec![0u32; target_range.len()];
        for &(s, t) in pairs {
            if let Some(c) = s.checked_sub(source_range.start).and_then(|i| from.get_mut(i)) {
                *c += 1;
            }
            if let Some(c) = t.checked_sub(target_range.start).and_then(|i| to.get_mut(i)) {
                *c += 1;
            }
        }
        Self {
            max_from_one_pre: from.into_iter().max().unwrap_or(0),
            max_to_one_post: to.into_iter().max().unwrap_or(0),
            total: pairs.len() as u32,
        }
    }
}
