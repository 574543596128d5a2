//! Weight and delay generation in the device numeric domain

use crate::error::{ConnectError, Result};
use crate::fixed_point::S1615;
use crate::rng::ProjectionRng;
use ndarray::Array2;
use rand::distributions::{Distribution, Uniform};
use rand::Rng;
use rand_distr::{Exp, Normal};
use statrs::distribution::{ContinuousCDF, Normal as NormalCdf};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Largest delay the synaptic row format and delay extensions can express, in time steps
pub const MAX_DELAY_STEPS: u16 = 144;

/// A random distribution of real values
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "distribution", rename_all = "snake_case"))]
pub enum RandomDistribution {
    /// Uniform on `[low, high)`
    Uniform {
        /// Lower bound
        low: f64,
        /// Upper bound
        high: f64,
    },
    /// Normal with mean `mu` and standard deviation `sigma`
    Normal {
        /// Mean
        mu: f64,
        /// Standard deviation
        sigma: f64,
    },
    /// Normal truncated to `[low, high]`
    NormalClipped {
        /// Mean
        mu: f64,
        /// Standard deviation
        sigma: f64,
        /// Lower bound
        low: f64,
        /// Upper bound
        high: f64,
    },
    /// Exponential with scale `beta` (mean `beta`)
    Exponential {
        /// Scale
        beta: f64,
    },
}

impl RandomDistribution {
    /// Validate the distribution parameters
    pub fn validate(&self) -> Result<()> {
        let finite = |name: &str, v: f64| -> Result<()> {
            if v.is_finite() {
                Ok(())
            } else {
                Err(ConnectError::invalid_parameter(name, v.to_string(), "finite"))
            }
        };
        match *self {
            Self::Uniform { low, high } => {
                finite("low", low)?;
                finite("high", high)?;
                if high <= low {
                    return Err(ConnectError::invalid_parameter(
                        "high",
                        high.to_string(),
                        format!("> low ({})", low),
                    ));
                }
            }
            Self::Normal { mu, sigma } => {
                finite("mu", mu)?;
                finite("sigma", sigma)?;
                if sigma <= 0.0 {
                    return Err(ConnectError::invalid_parameter("sigma", sigma.to_string(), "> 0"));
                }
            }
            Self::NormalClipped { mu, sigma, low, high } => {
                Self::Normal { mu, sigma }.validate()?;
                finite("low", low)?;
                finite("high", high)?;
                if high <= low {
                    return Err(ConnectError::invalid_parameter(
                        "high",
                        high.to_string(),
                        format!("> low ({})", low),
                    ));
                }
                let normal = self.normal_cdf()?;
                if normal.cdf(high) - normal.cdf(low) <= f64::EPSILON {
                    return Err(ConnectError::invalid_config(format!(
                        "normal_clipped range [{}, {}] has no probability mass around mu={}",
                        low, high, mu
                    )));
                }
            }
            Self::Exponential { beta } => {
                finite("beta", beta)?;
                if beta <= 0.0 {
                    return Err(ConnectError::invalid_parameter("beta", beta.to_string(), "> 0"));
                }
            }
        }
        Ok(())
    }

    fn normal_cdf(&self) -> Result<NormalCdf> {
        let (mu, sigma) = match *self {
            Self::Normal { mu, sigma } | Self::NormalClipped { mu, sigma, .. } => (mu, sigma),
            _ => return Err(ConnectError::invalid_config("not a normal distribution")),
        };
        NormalCdf::new(mu, sigma)
            .map_err(|e| ConnectError::invalid_parameter("sigma", sigma.to_string(), e.to_string()))
    }

    /// Support of the distribution
    pub fn bounds(&self) -> (f64, f64) {
        match *self {
            Self::Uniform { low, high } => (low, high),
            Self::Normal { .. } => (f64::NEG_INFINITY, f64::INFINITY),
            Self::NormalClipped { low, high, .. } => (low, high),
            Self::Exponential { .. } => (0.0, f64::INFINITY),
        }
    }

    /// Cumulative distribution function
    pub fn cdf(&self, x: f64) -> Result<f64> {
        Ok(match *self {
            Self::Uniform { low, high } => ((x - low) / (high - low)).clamp(0.0, 1.0),
            Self::Normal { .. } => self.normal_cdf()?.cdf(x),
            Self::NormalClipped { low, high, .. } => {
                if x < low {
                    0.0
                } else if x >= high {
                    1.0
                } else {
                    let n = self.normal_cdf()?;
                    let (c_low, c_high) = (n.cdf(low), n.cdf(high));
                    (n.cdf(x) - c_low) / (c_high - c_low)
                }
            }
            Self::Exponential { beta } => {
                if x <= 0.0 {
                    0.0
                } else {
                    1.0 - (-x / beta).exp()
                }
            }
        })
    }

    /// Inverse cumulative distribution function, `q` in `[0, 1]`
    pub fn ppf(&self, q: f64) -> Result<f64> {
        if !(0.0..=1.0).contains(&q) {
            return Err(ConnectError::invalid_parameter("quantile", q.to_string(), "within [0, 1]"));
        }
        Ok(match *self {
            Self::Uniform { low, high } => low + q * (high - low),
            Self::Normal { .. } => self.normal_cdf()?.inverse_cdf(q),
            Self::NormalClipped { low, high, .. } => {
                let n = self.normal_cdf()?;
                let (c_low, c_high) = (n.cdf(low), n.cdf(high));
                n.inverse_cdf(c_low + q * (c_high - c_low)).clamp(low, high)
            }
            Self::Exponential { beta } => {
                if q >= 1.0 {
                    f64::INFINITY
                } else {
                    -beta * (1.0 - q).ln()
                }
            }
        })
    }

    /// Draw one value
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<f64> {
        let bad = |e: String| ConnectError::invalid_config(format!("invalid distribution {:?}: {}", self, e));
        Ok(match *self {
            Self::Uniform { low, high } => {
                if high <= low {
                    return Err(bad("high must exceed low".into()));
                }
                Uniform::new(low, high).sample(rng)
            }
            Self::Normal { mu, sigma } => Normal::new(mu, sigma).map_err(|e| bad(e.to_string()))?.sample(rng),
            Self::NormalClipped { .. } => {
                // inverse-transform keeps exactly one draw per value
                let u: f64 = rng.gen();
                self.ppf(u)?
            }
            Self::Exponential { beta } => Exp::new(1.0 / beta).map_err(|e| bad(e.to_string()))?.sample(rng),
        })
    }

    /// Probability that a sample lies in `[lower, upper]`
    pub fn probability_within_range(&self, lower: f64, upper: f64) -> Result<f64> {
        if upper < lower {
            return Ok(0.0);
        }
        Ok((self.cdf(upper)? - self.cdf(lower)?).clamp(0.0, 1.0))
    }

    /// Value not exceeded by any of `n_items` samples except with probability `chance`
    pub fn maximum_probable_value(&self, n_items: u64, chance: f64) -> Result<f64> {
        if n_items == 0 {
            return Ok(self.bounds().0.max(0.0).min(self.bounds().1));
        }
        let q = 1.0 - chance / n_items as f64;
        let (low, high) = self.bounds();
        Ok(self.ppf(q.clamp(0.0, 1.0))?.clamp(low, high))
    }

    /// Value not undercut by any of `n_items` samples except with probability `chance`
    pub fn minimum_probable_value(&self, n_items: u64, chance: f64) -> Result<f64> {
        if n_items == 0 {
            return Ok(self.bounds().0.max(0.0).min(self.bounds().1));
        }
        let q = chance / n_items as f64;
        let (low, high) = self.bounds();
        Ok(self.ppf(q.clamp(0.0, 1.0))?.clamp(low, high))
    }
}

/// Where per-connection values come from
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterSource {
    /// Same value for every connection
    Fixed(f64),
    /// Dense `(n_pre, n_post)` array indexed by population-global pair
    PerPair(Array2<f64>),
    /// Independent draws from a distribution
    Random(RandomDistribution),
}

impl ParameterSource {
    /// Validate against the projection shape
    pub fn validate(&self, what: &str, n_pre: usize, n_post: usize) -> Result<()> {
        match self {
            Self::Fixed(v) if v.is_nan() => Err(ConnectError::invalid_parameter(what, "NaN", "a number")),
            Self::Fixed(_) => Ok(()),
            Self::PerPair(values) => {
                if values.dim() != (n_pre, n_post) {
                    return Err(ConnectError::invalid_config(format!(
                        "{} array has shape {:?}, projection is {}x{}",
                        what,
                        values.dim(),
                        n_pre,
                        n_post
                    )));
                }
                if values.iter().any(|v| v.is_nan()) {
                    return Err(ConnectError::invalid_parameter(what, "array containing NaN", "numbers"));
                }
                Ok(())
            }
            Self::Random(dist) => dist.validate(),
        }
    }

    /// Produce one real value per `(source, target)` pair, in pair order
    pub fn generate(&self, pairs: &[(usize, usize)], rng: &mut ProjectionRng) -> Result<Vec<f64>> {
        match self {
            Self::Fixed(v) => Ok(vec![*v; pairs.len()]),
            Self::PerPair(values) => pairs
                .iter()
                .map(|&(s, t)| {
                    values.get((s, t)).copied().ok_or_else(|| {
                        ConnectError::invalid_config(format!("no value for pair ({}, {})", s, t))
                    })
                })
                .collect(),
            Self::Random(dist) => pairs.iter().map(|_| dist.sample(rng)).collect(),
        }
    }

    /// Largest |value| expected across `n_connections` values
    pub fn maximum_magnitude(&self, n_connections: u64, chance: f64) -> Result<f64> {
        if n_connections == 0 {
            return Ok(0.0);
        }
        match self {
            Self::Fixed(v) => Ok(v.abs()),
            Self::PerPair(values) => Ok(values.iter().fold(0.0f64, |m, v| m.max(v.abs()))),
            Self::Random(dist) => {
                let hi = dist.maximum_probable_value(n_connections, chance)?;
                let lo = dist.minimum_probable_value(n_connections, chance)?;
                Ok(hi.abs().max(lo.abs()))
            }
        }
    }

    /// Largest value expected across `n_connections` values
    pub fn maximum_value(&self, n_connections: u64, chance: f64) -> Result<f64> {
        match self {
            Self::Fixed(v) => Ok(*v),
            Self::PerPair(values) => Ok(values.iter().copied().fold(f64::NEG_INFINITY, f64::max)),
            Self::Random(dist) => dist.maximum_probable_value(n_connections, chance),
        }
    }
}

/// Convert real weights to S16.15, rejecting NaN and out-of-range values
pub fn weights_to_fixed(values: &[f64]) -> Result<Vec<S1615>> {
    values
        .iter()
        .map(|&w| {
            S1615::try_from_f64(w).map_err(|_| {
                ConnectError::invalid_parameter(
                    "weight",
                    w.to_string(),
                    format!("a number within [{}, {}]", S1615::MIN_F64, S1615::MAX_F64),
                )
            })
        })
        .collect()
}

/// Convert one delay in milliseconds to whole time steps, without clamping
pub fn delay_ms_to_steps(delay_ms: f64, machine_time_step_us: u32) -> Result<i64> {
    if !delay_ms.is_finite() {
        return Err(ConnectError::invalid_parameter("delay", delay_ms.to_string(), "a finite number"));
    }
    if machine_time_step_us == 0 {
        return Err(ConnectError::invalid_parameter("machine_time_step", "0", "> 0"));
    }
    Ok((delay_ms * 1000.0 / machine_time_step_us as f64).round() as i64)
}

/// Convert delays in milliseconds to time steps
///
/// Delays round to the nearest step. Delays under one step are raised to one
/// step with a warning; delays over [`MAX_DELAY_STEPS`] are rejected.
pub fn delays_to_steps(values: &[f64], machine_time_step_us: u32) -> Result<Vec<u16>> {
    let mut clamped = 0usize;
    let steps = values
        .iter()
        .map(|&d| {
            let s = delay_ms_to_steps(d, machine_time_step_us)?;
            if s > MAX_DELAY_STEPS as i64 {
                return Err(ConnectError::invalid_parameter(
                    "delay",
                    format!("{} ms ({} steps)", d, s),
                    format!("<= {} steps of {} us", MAX_DELAY_STEPS, machine_time_step_us),
                ));
            }
            if s < 1 {
                clamped += 1;
                return Ok(1);
            }
            Ok(s as u16)
        })
        .collect::<Result<Vec<u16>>>()?;

    if clamped > 0 {
        log::warn!(
            "{} delay(s) shorter than one time step ({} us) were raised to one step",
            clamped,
            machine_time_step_us
        );
    }
    Ok(steps)
}
