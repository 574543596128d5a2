//! Error types for connector setup and synaptic block generation

use thiserror::Error;

/// Result type for connector operations
pub type Result<T> = std::result::Result<T, ConnectError>;

/// Errors that can occur while configuring a projection or generating its blocks
#[derive(Error, Debug)]
pub enum ConnectError {
    /// Storage layer error
    #[error("Storage error: {source}")]
    Storage {
        #[from]
        /// Source storage error
        source: neuromap_storage::StorageError,
    },

    /// Invalid or unsupported user configuration
    #[error("Configuration error: {reason}")]
    Configuration {
        /// Reason for the rejected configuration
        reason: String,
    },

    /// Invalid parameter value
    #[error("Invalid parameter {parameter}: {value} (expected {constraint})")]
    InvalidParameter {
        /// Parameter name
        parameter: String,
        /// Invalid value
        value: String,
        /// Constraint description
        constraint: String,
    },

    /// Expression could not be parsed or evaluated
    #[error("Invalid expression '{expression}' at column {column}: {reason}")]
    Expression {
        /// Source text of the expression
        expression: String,
        /// One-based column of the offending token
        column: usize,
        /// What went wrong
        reason: String,
    },

    /// Generated connection count exceeded a precomputed bound
    #[error("Capacity violation: {what} produced {actual} connections, bound was {bound}")]
    CapacityViolation {
        /// Which bound was exceeded
        what: &'static str,
        /// Precomputed bound
        bound: u32,
        /// Observed count
        actual: u32,
    },

    /// A query was made before `set_projection_information`
    #[error("Projection information not set: call set_projection_information before {operation}")]
    ProjectionNotSet {
        /// Operation that was attempted
        operation: &'static str,
    },

    /// Population model lacks a capability
    #[error("Population '{population}' does not support {capability}")]
    MissingCapability {
        /// Population label
        population: String,
        /// Capability that was requested
        capability: &'static str,
    },
}

impl ConnectError {
    /// Create a configuration error
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(
        parameter: impl Into<String>,
        value: impl Into<String>,
        constraint: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            value: value.into(),
            constraint: constraint.into(),
        }
    }

    /// Create an expression error
    pub fn expression(expression: impl Into<String>, column: usize, reason: impl Into<String>) -> Self {
        Self::Expression {
            expression: expression.into(),
            column,
            reason: reason.into(),
        }
    }

    /// Create a capacity violation
    pub fn capacity_violation(what: &'static str, bound: u32, actual: u32) -> Self {
        Self::CapacityViolation { what, bound, actual }
    }

    /// Create a missing capability error
    pub fn missing_capability(population: impl Into<String>, capability: &'static str) -> Self {
        Self::MissingCapability {
            population: population.into(),
            capability,
        }
    }

    /// Whether this error reports invalid user input rather than an internal fault
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Configuration { .. }
                | Self::InvalidParameter { .. }
                | Self::Expression { .. }
                | Self::MissingCapability { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = ConnectError::invalid_config("n_connections is not supported");
        assert!(matches!(err, ConnectError::Configuration { .. }));
        assert!(err.is_configuration());

        let err = ConnectError::invalid_parameter("size", "0", "> 0");
        assert!(err.is_configuration());

        let err = ConnectError::capacity_violation("fan-out", 3, 4);
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_error_display() {
        let err = ConnectError::expression("exp(-x)", 6, "unknown identifier 'x'");
        let msg = format!("{}", err);
        assert!(msg.contains("column 6"));
        assert!(msg.contains("unknown identifier 'x'"));

        let err = ConnectError::capacity_violation("total", 10, 11);
        assert!(err.to_string().contains("produced 11 connections, bound was 10"));
    }
}
