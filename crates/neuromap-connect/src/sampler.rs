//! Bernoulli sampling of one (pre-slice, post-slice) block

use crate::error::{ConnectError, Result};
use crate::rng::ProjectionRng;
use crate::slice::Slice;
use ndarray::ArrayView2;

/// One block to sample
#[derive(Debug, Clone, Copy)]
pub struct SampleRequest<'a> {
    /// Pre-synaptic slice
    pub pre_slice: Slice,
    /// Post-synaptic slice
    pub post_slice: Slice,
    /// Probabilities for the block, shape `(pre_slice.n_atoms(), post_slice.n_atoms())`
    pub probabilities: ArrayView2<'a, f64>,
    /// Drop pairs whose global source and target indices are equal
    pub suppress_self: bool,
}

/// Draw the connected pairs of one block
///
/// One uniform draw is taken per cell in row-major (source, target) order
/// and a pair fires when the draw is below its probability. Suppressed cells
/// still consume their draw, so the random stream position after a call
/// depends only on the block shape. Empty slices draw nothing.
///
/// Returned pairs are population-global `(source, target)` indices.
pub fn sample_block(request: &SampleRequest<'_>, rng: &mut ProjectionRng) -> Result<Vec<(usize, usize)>> {
    let n_pre = request.pre_slice.n_atoms();
    let n_post = request.post_slice.n_atoms();
    if n_pre == 0 || n_post == 0 {
        return Ok(Vec::new());
    }
    if request.probabilities.dim() != (n_pre, n_post) {
        return Err(ConnectError::invalid_config(format!(
            "probability block has shape {:?}, slices {} x {} need ({}, {})",
            request.probabilities.dim(),
            request.pre_slice,
            request.post_slice,
            n_pre,
            n_post
        )));
    }

    let mut draws = vec![0.0; n_pre * n_post];
    rng.fill_uniform(&mut draws);

    let pre_lo = request.pre_slice.lo_atom();
    let post_lo = request.post_slice.lo_atom();
    let mut pairs = Vec::new();
    for ((i, j), &p) in request.probabilities.indexed_iter() {
        let (source, target) = (pre_lo + i, post_lo + j);
        let draw = if request.suppress_self && source == target {
            f64::INFINITY
        } else {
            draws[i * n_post + j]
        };
        if draw < p {
            pairs.push((source, target));
        }
    }
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn request(pre: Slice, post: Slice, probs: &Array2<f64>, suppress_self: bool) -> SampleRequest<'_> {
        SampleRequest {
            pre_slice: pre,
            post_slice: post,
            probabilities: probs.view(),
            suppress_self,
        }
    }

    #[test]
    fn test_all_and_nothing() {
        let mut rng = ProjectionRng::new(1);
        let ones = Array2::from_elem((4, 4), 1.0);
        let pairs = sample_block(&request(Slice::whole(4), Slice::whole(4), &ones, true), &mut rng).unwrap();
        assert_eq!(pairs.len(), 12);
        assert!(pairs.iter().all(|(s, t)| s != t));

        let pairs = sample_block(&request(Slice::whole(4), Slice::whole(4), &ones, false), &mut rng).unwrap();
        assert_eq!(pairs.len(), 16);

        let zeros = Array2::zeros((4, 4));
        let pairs = sample_block(&request(Slice::whole(4), Slice::whole(4), &zeros, false), &mut rng).unwrap();
        assert!(pairs.is_empty());
    }

    #[test]
    fn test_infinite_probability_always_fires() {
        let mut rng = ProjectionRng::new(1);
        let inf = Array2::from_elem((2, 3), f64::INFINITY);
        let pairs = sample_block(&request(Slice::whole(2), Slice::whole(3), &inf, false), &mut rng).unwrap();
        assert_eq!(pairs.len(), 6);
    }

    #[test]
    fn test_suppression_uses_global_indices() {
        let mut rng = ProjectionRng::new(1);
        let ones = Array2::from_elem((2, 2), 1.0);
        // Local diagonal (0,0),(1,1) is global (2,0),(3,1): nothing to drop
        let pairs = sample_block(
            &request(Slice::new(2, 4).unwrap(), Slice::new(0, 2).unwrap(), &ones, true),
            &mut rng,
        )
        .unwrap();
        assert_eq!(pairs.len(), 4);

        let pairs = sample_block(
            &request(Slice::new(2, 4).unwrap(), Slice::new(2, 4).unwrap(), &ones, true),
            &mut rng,
        )
        .unwrap();
        assert_eq!(pairs, vec![(2, 3), (3, 2)]);
    }

    #[test]
    fn test_draw_count_independent_of_suppression() {
        let probs = Array2::from_elem((3, 3), 0.5);
        let mut a = ProjectionRng::new(4);
        let mut b = ProjectionRng::new(4);
        sample_block(&request(Slice::whole(3), Slice::whole(3), &probs, true), &mut a).unwrap();
        sample_block(&request(Slice::whole(3), Slice::whole(3), &probs, false), &mut b).unwrap();
        assert_eq!(a.position(), b.position());
    }

    #[test]
    fn test_empty_slice_consumes_nothing() {
        let mut rng = ProjectionRng::new(4);
        let start = rng.position();
        let probs = Array2::zeros((3, 0));
        let pairs = sample_block(&request(Slice::whole(3), Slice::new(5, 5).unwrap(), &probs, false), &mut rng).unwrap();
        assert!(pairs.is_empty());
        assert_eq!(rng.position(), start);
    }

    #[test]
    fn test_shape_mismatch() {
        let mut rng = ProjectionRng::new(4);
        let probs = Array2::zeros((2, 2));
        assert!(sample_block(&request(Slice::whole(3), Slice::whole(2), &probs, false), &mut rng).is_err());
    }
}
