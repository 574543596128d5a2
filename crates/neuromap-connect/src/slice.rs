//! Contiguous neuron index ranges produced by partitioning

use crate::error::{ConnectError, Result};
use neuromap_storage::AtomRange;
use std::ops::Range;

/// Half-open neuron index range `[lo_atom, hi_atom)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Slice {
    lo_atom: usize,
    hi_atom: usize,
}

impl Slice {
    /// Create a slice; `lo_atom` may equal `hi_atom` for an empty slice
    pub fn new(lo_atom: usize, hi_atom: usize) -> Result<Self> {
        if hi_atom < lo_atom {
            return Err(ConnectError::invalid_parameter(
                "slice",
                format!("[{}, {})", lo_atom, hi_atom),
                "lo_atom <= hi_atom",
            ));
        }
        Ok(Self { lo_atom, hi_atom })
    }

    /// Slice covering `0..n`
    pub fn whole(n: usize) -> Self {
        Self {
            lo_atom: 0,
            hi_atom: n,
        }
    }

    /// First atom
    pub fn lo_atom(&self) -> usize {
        self.lo_atom
    }

    /// One past the last atom
    pub fn hi_atom(&self) -> usize {
        self.hi_atom
    }

    /// Atom count
    pub fn n_atoms(&self) -> usize {
        self.hi_atom - self.lo_atom
    }

    /// True when the slice has no atoms
    pub fn is_empty(&self) -> bool {
        self.hi_atom == self.lo_atom
    }

    /// Index range
    pub fn range(&self) -> Range<usize> {
        self.lo_atom..self.hi_atom
    }

    /// Whether a population-global index lies in the slice
    pub fn contains(&self, index: usize) -> bool {
        self.range().contains(&index)
    }

    /// Fail unless the slice fits in a population of `size` atoms
    pub fn check_within(&self, size: usize, what: &str) -> Result<()> {
        if self.hi_atom > size {
            return Err(ConnectError::invalid_config(format!(
                "{} slice [{}, {}) exceeds population size {}",
                what, self.lo_atom, self.hi_atom, size
            )));
        }
        Ok(())
    }

    /// Storage form of the slice
    pub fn to_atom_range(&self) -> Result<AtomRange> {
        let lo = u32::try_from(self.lo_atom)
            .map_err(|_| ConnectError::invalid_parameter("lo_atom", self.lo_atom.to_string(), "<= u32::MAX"))?;
        let hi = u32::try_from(self.hi_atom)
            .map_err(|_| ConnectError::invalid_parameter("hi_atom", self.hi_atom.to_string(), "<= u32::MAX"))?;
        Ok(AtomRange::new(lo, hi))
    }
}

impl std::fmt::Display for Slice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.lo_atom, self.hi_atom)
    }
}
