//! Distance metrics between neuron positions

use crate::error::{ConnectError, Result};
use crate::slice::Slice;
use ndarray::{Array2, ArrayView2};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Cartesian position of one neuron
pub type Position = [f64; 3];

/// Axis names in index order
const AXIS_NAMES: [char; 3] = ['x', 'y', 'z'];

/// Metric space used to turn two position sets into a distance field
///
/// Distances are Euclidean over the selected axes, optionally wrapped at
/// periodic boundaries, then transformed as `scale_factor * (d + offset)`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Space {
    /// Axes contributing to the distance, e.g. `"xy"`
    pub axes: String,
    /// Multiplier applied after the offset
    pub scale_factor: f64,
    /// Added to raw distances before scaling
    pub offset: f64,
    /// Optional `(min, max)` wrap-around boundary per axis
    pub periodic_boundaries: [Option<(f64, f64)>; 3],
}

impl Default for Space {
    fn default() -> Self {
        Self {
            axes: "xyz".to_string(),
            scale_factor: 1.0,
            offset: 0.0,
            periodic_boundaries: [None; 3],
        }
    }
}

/// Distances between every (pre, post) pair of one block of neurons
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceField {
    /// Total distance, shape `(n_pre, n_post)`
    pub total: Array2<f64>,
    /// Per-axis distances, present in expanded mode
    pub axes: Option<[Array2<f64>; 3]>,
}

impl DistanceField {
    /// Shape `(n_pre, n_post)`
    pub fn shape(&self) -> (usize, usize) {
        self.total.dim()
    }

    /// Axis views, if expanded
    pub fn axis_views(&self) -> Option<[ArrayView2<'_, f64>; 3]> {
        self.axes
            .as_ref()
            .map(|[x, y, z]| [x.view(), y.view(), z.view()])
    }
}

impl Space {
    /// Create a space over the given axes
    pub fn new(axes: &str) -> Result<Self> {
        let space = Self {
            axes: axes.to_string(),
            ..Default::default()
        };
        space.validate()?;
        Ok(space)
    }

    /// Set the scale factor
    pub fn with_scale_factor(mut self, scale_factor: f64) -> Self {
        self.scale_factor = scale_factor;
        self
    }

    /// Set the offset
    pub fn with_offset(mut self, offset: f64) -> Self {
        self.offset = offset;
        self
    }

    /// Wrap distances along `axis` at `[min, max)`
    pub fn with_periodic_boundary(mut self, axis: usize, min: f64, max: f64) -> Result<Self> {
        if axis > 2 {
            return Err(ConnectError::invalid_parameter(
                "periodic_boundaries",
                format!("axis {}", axis),
                "axis in 0..=2",
            ));
        }
        self.periodic_boundaries[axis] = Some((min, max));
        self.validate()?;
        Ok(self)
    }

    /// Validate axes, scale and boundaries
    pub fn validate(&self) -> Result<()> {
        if self.axes.is_empty() {
            return Err(ConnectError::invalid_parameter("axes", "''", "one or more of 'x', 'y', 'z'"));
        }
        let mut seen = [false; 3];
        for c in self.axes.chars() {
            let i = AXIS_NAMES.iter().position(|&a| a == c).ok_or_else(|| {
                ConnectError::invalid_parameter("axes", &self.axes, "only 'x', 'y', 'z'")
            })?;
            if seen[i] {
                return Err(ConnectError::invalid_parameter("axes", &self.axes, "each axis at most once"));
            }
            seen[i] = true;
        }
        if !self.scale_factor.is_finite() || self.scale_factor < 0.0 {
            return Err(ConnectError::invalid_parameter(
                "scale_factor",
                self.scale_factor.to_string(),
                "finite and >= 0",
            ));
        }
        if !self.offset.is_finite() {
            return Err(ConnectError::invalid_parameter("offset", self.offset.to_string(), "finite"));
        }
        for (i, boundary) in self.periodic_boundaries.iter().enumerate() {
            if let Some((min, max)) = boundary {
                if !(min.is_finite() && max.is_finite() && max > min) {
                    return Err(ConnectError::invalid_parameter(
                        "periodic_boundaries",
                        format!("axis {}: ({}, {})", AXIS_NAMES[i], min, max),
                        "finite bounds with max > min",
                    ));
                }
            }
        }
        Ok(())
    }

    fn axis_mask(&self) -> [bool; 3] {
        let mut mask = [false; 3];
        for c in self.axes.chars() {
            if let Some(i) = AXIS_NAMES.iter().position(|&a| a == c) {
                mask[i] = true;
            }
        }
        mask
    }

    #[inline]
    fn axis_difference(&self, axis: usize, a: f64, b: f64) -> f64 {
        let diff = (a - b).abs();
        match self.periodic_boundaries[axis] {
            Some((min, max)) => {
                let period = max - min;
                let wrapped = diff % period;
                wrapped.min(period - wrapped)
            }
            None => diff,
        }
    }

    #[inline]
    fn transform(&self, d: f64) -> f64 {
        self.scale_factor * (d + self.offset)
    }

    /// Distance between two positions
    pub fn distance(&self, a: &Position, b: &Position) -> f64 {
        let mask = self.axis_mask();
        let sum: f64 = (0..3)
            .filter(|&i| mask[i])
            .map(|i| self.axis_difference(i, a[i], b[i]).powi(2))
            .sum();
        self.transform(sum.sqrt())
    }

    /// Distance matrix between two position sets
    pub fn distances(&self, pre: &[Position], post: &[Position], expand: bool) -> DistanceField {
        let mask = self.axis_mask();
        let shape = (pre.len(), post.len());
        let mut total = Array2::zeros(shape);
        let mut axes = if expand {
            Some([Array2::zeros(shape), Array2::zeros(shape), Array2::zeros(shape)])
        } else {
            None
        };

        for (i, a) in pre.iter().enumerate() {
            for (j, b) in post.iter().enumerate() {
                let mut sum = 0.0;
                for k in 0..3 {
                    if !mask[k] {
                        continue;
                    }
                    let diff = self.axis_difference(k, a[k], b[k]);
                    sum += diff * diff;
                    if let Some(axes) = axes.as_mut() {
                        axes[k][[i, j]] = self.transform(diff);
                    }
                }
                total[[i, j]] = self.transform(sum.sqrt());
            }
        }

        DistanceField { total, axes }
    }

    /// Distance matrix restricted to a (pre-slice, post-slice) block
    pub fn slice_distances(
        &self,
        pre: &[Position],
        post: &[Position],
        pre_slice: &Slice,
        post_slice: &Slice,
        expand: bool,
    ) -> Result<DistanceField> {
        pre_slice.check_within(pre.len(), "pre-synaptic")?;
        post_slice.check_within(post.len(), "post-synaptic")?;
        Ok(self.distances(&pre[pre_slice.range()], &post[post_slice.range()], expand))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_euclidean() {
        let space = Space::default();
        assert!((space.distance(&[0.0, 0.0, 0.0], &[3.0, 4.0, 0.0]) - 5.0).abs() < 1e-12);

        let xy = Space::new("xy").unwrap();
        assert!((xy.distance(&[0.0, 0.0, 0.0], &[3.0, 4.0, 12.0]) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_scale_and_offset() {
        let space = Space::new("x").unwrap().with_scale_factor(2.0).with_offset(1.0);
        assert!((space.distance(&[0.0; 3], &[3.0, 0.0, 0.0]) - 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_periodic_boundary() {
        let space = Space::new("x")
            .unwrap()
            .with_periodic_boundary(0, 0.0, 10.0)
            .unwrap();
        assert!((space.distance(&[1.0, 0.0, 0.0], &[9.0, 0.0, 0.0]) - 2.0).abs() < 1e-12);
        assert!((space.distance(&[1.0, 0.0, 0.0], &[4.0, 0.0, 0.0]) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_expanded_field() {
        let space = Space::default();
        let pre = [[0.0, 0.0, 0.0], [1.0, 1.0, 0.0]];
        let post = [[3.0, 4.0, 0.0]];
        let field = space.distances(&pre, &post, true);

        assert_eq!(field.shape(), (2, 1));
        assert!((field.total[[0, 0]] - 5.0).abs() < 1e-12);
        let axes = field.axes.as_ref().unwrap();
        assert_eq!(axes[0][[1, 0]], 2.0);
        assert_eq!(axes[1][[1, 0]], 3.0);
        assert_eq!(axes[2][[1, 0]], 0.0);

        assert!(space.distances(&pre, &post, false).axes.is_none());
    }

    #[test]
    fn test_slice_distances() {
        let space = Space::default();
        let line: Vec<Position> = (0..6).map(|i| [i as f64, 0.0, 0.0]).collect();
        let field = space
            .slice_distances(&line, &line, &Slice::new(2, 4).unwrap(), &Slice::new(0, 3).unwrap(), false)
            .unwrap();
        assert_eq!(field.shape(), (2, 3));
        assert_eq!(field.total[[0, 0]], 2.0);
        assert_eq!(field.total[[1, 2]], 1.0);

        assert!(space
            .slice_distances(&line, &line, &Slice::new(4, 8).unwrap(), &Slice::new(0, 3).unwrap(), false)
            .is_err());
    }

    #[test]
    fn test_invalid_spaces() {
        assert!(Space::new("").is_err());
        assert!(Space::new("xw").is_err());
        assert!(Space::new("xx").is_err());
        assert!(Space::default().with_periodic_boundary(0, 5.0, 5.0).is_err());
        assert!(Space::default().with_periodic_boundary(3, 0.0, 1.0).is_err());
    }
}
