//! ID types for the storage layer

use core::fmt;

/// Population-global neuron index
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NeuronId(pub u32);

impl NeuronId {
    /// Create a new neuron ID
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub const fn raw(&self) -> u32 {
        self.0
    }

    /// Index form for array access
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NeuronId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Identifier of a neuron population
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PopulationId(pub u32);

impl PopulationId {
    /// Create a new population ID
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub const fn raw(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for PopulationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pop{}", self.0)
    }
}

/// Identifier of a projection between two populations
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProjectionId(pub u32);

impl ProjectionId {
    /// Create a new projection ID
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub const fn raw(&self) -> u32 {
        self.0
    }

    /// Placeholder for blocks not yet bound to a projection
    pub const UNASSIGNED: Self = Self(u32::MAX);

    /// Check if this ID refers to a real projection
    pub const fn is_assigned(&self) -> bool {
        self.0 != u32::MAX
    }
}

impl Default for ProjectionId {
    fn default() -> Self {
        Self::UNASSIGNED
    }
}

impl fmt::Display for ProjectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "proj{}", self.0)
    }
}

#[cfg(feature = "serde")]
mod serde_impls {
    use super::*;
    use serde::{Deserialize, Serialize};

    macro_rules! transparent_u32 {
        ($ty:ident) => {
            impl Serialize for $ty {
                fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
                where
                    S: serde::Serializer,
                {
                    self.0.serialize(serializer)
                }
            }

            impl<'de> Deserialize<'de> for $ty {
                fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
                where
                    D: serde::Deserializer<'de>,
                {
                    let id = u32::deserialize(deserializer)?;
                    Ok($ty::new(id))
                }
            }
        };
    }

    transparent_u32!(NeuronId);
    transparent_u32!(PopulationId);
    transparent_u32!(ProjectionId);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neuron_id() {
        let id = NeuronId::new(42);
        assert_eq!(id.raw(), 42);
        assert_eq!(id.index(), 42);
        assert_eq!(format!("{}", id), "n42");
    }

    #[test]
    fn test_projection_id() {
        let proj = ProjectionId::new(3);
        assert!(proj.is_assigned());
        assert_eq!(format!("{}", proj), "proj3");
        assert!(!ProjectionId::default().is_assigned());
    }

    #[test]
    fn test_ordering() {
        assert!(NeuronId::new(1) < NeuronId::new(2));
        assert!(PopulationId::new(1) < PopulationId::new(2));
        assert_eq!(format!("{}", PopulationId::new(7)), "pop7");
    }
}
