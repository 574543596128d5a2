//! Restricted expression language for connection probability fields
//!
//! Expressions are parsed once into an [`ast::Expr`] over a closed set of
//! operators and allow-listed [`ast::Function`]s, then interpreted
//! element-wise over distance arrays of any shape. Identifiers outside the
//! allow-list are rejected at parse time.

pub mod ast;
pub mod lexer;
pub mod parser;

use crate::error::{ConnectError, Result};
use ndarray::{Array, ArrayView, Dimension, Zip};

pub use ast::{Constant, Expr, Function};
pub use parser::{MAX_DEPTH, MAX_EXPRESSION_LEN};

/// Conventional name of the bound distance variable
pub const DEFAULT_VARIABLE: &str = "d";

/// A parsed, validated expression
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    variable: String,
    root: Expr,
}

impl Expression {
    /// Parse an expression over the distance variable `d`
    pub fn parse(source: &str) -> Result<Self> {
        Self::parse_with_variable(source, DEFAULT_VARIABLE)
    }

    /// Parse an expression binding a custom variable name
    pub fn parse_with_variable(source: &str, variable: &str) -> Result<Self> {
        if Constant::lookup(variable).is_some() || Function::lookup(variable).is_some() {
            return Err(ConnectError::invalid_parameter(
                "variable",
                variable,
                "a name that is not a constant or function",
            ));
        }
        let root = parser::parse(source, variable)?;
        Ok(Self {
            source: source.to_string(),
            variable: variable.to_string(),
            root,
        })
    }

    /// Source text
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Bound variable name
    pub fn variable(&self) -> &str {
        &self.variable
    }

    /// Parsed tree
    pub fn root(&self) -> &Expr {
        &self.root
    }

    /// Whether the expression needs per-axis distances (`d[i]`)
    pub fn is_expanded(&self) -> bool {
        self.root.uses_axes()
    }

    /// Evaluate at a single point without validating the result
    #[inline]
    pub fn eval_point(&self, d: f64, axes: &[f64; 3]) -> f64 {
        self.root.eval(d, axes)
    }

    /// Evaluate element-wise over a total-distance array of any shape
    pub fn evaluate<D: Dimension>(&self, d: ArrayView<'_, f64, D>) -> Result<Array<f64, D>> {
        if self.is_expanded() {
            return Err(ConnectError::invalid_config(format!(
                "expression '{}' uses per-axis distances, evaluate it with axis arrays",
                self.source
            )));
        }
        let out = d.map(|&v| self.root.eval(v, &[0.0; 3]));
        self.check_values(&out)?;
        Ok(out)
    }

    /// Evaluate element-wise with per-axis distance arrays of the same shape
    pub fn evaluate_expanded<D: Dimension>(
        &self,
        d: ArrayView<'_, f64, D>,
        axes: [ArrayView<'_, f64, D>; 3],
    ) -> Result<Array<f64, D>> {
        for (i, axis) in axes.iter().enumerate() {
            if axis.shape() != d.shape() {
                return Err(ConnectError::invalid_config(format!(
                    "axis {} distances have shape {:?}, expected {:?}",
                    i,
                    axis.shape(),
                    d.shape()
                )));
            }
        }
        let [x, y, z] = axes;
        let mut out = Array::zeros(d.raw_dim());
        Zip::from(&mut out)
            .and(&d)
            .and(&x)
            .and(&y)
            .and(&z)
            .for_each(|o, &total, &ax, &ay, &az| {
                *o = self.root.eval(total, &[ax, ay, az]);
            });
        self.check_values(&out)?;
        Ok(out)
    }

    /// Reject NaN and negative infinity; `+inf` is a valid "always" value
    pub fn check_values<D: Dimension>(&self, values: &Array<f64, D>) -> Result<()> {
        if let Some((index, v)) = values
            .indexed_iter()
            .find(|(_, v)| v.is_nan() || **v == f64::NEG_INFINITY)
        {
            return Err(ConnectError::invalid_config(format!(
                "expression '{}' produced {} at index {:?}",
                self.source,
                if v.is_nan() { "NaN" } else { "-inf" },
                index
            )));
        }
        Ok(())
    }
}

impl std::str::FromStr for Expression {
    type Err = ConnectError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl std::fmt::Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array3};

    #[test]
    fn test_shape_preserved() {
        let expr = Expression::parse("exp(-d)").unwrap();

        let a1 = array![0.0, 1.0, 2.0];
        assert_eq!(expr.evaluate(a1.view()).unwrap().shape(), &[3]);

        let a3 = Array3::<f64>::from_elem((2, 3, 4), 0.5);
        let out = expr.evaluate(a3.view()).unwrap();
        assert_eq!(out.shape(), &[2, 3, 4]);
        assert!((out[[1, 2, 3]] - (-0.5f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn test_boolean_field() {
        let expr = Expression::parse("d < 1.5").unwrap();
        let out = expr.evaluate(array![[0.0, 1.0], [2.0, 3.0]].view()).unwrap();
        assert_eq!(out, array![[1.0, 1.0], [0.0, 0.0]]);
    }

    #[test]
    fn test_nan_rejected() {
        let expr = Expression::parse("sqrt(d - 1)").unwrap();
        let err = expr.evaluate(array![2.0, 0.0].view()).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("NaN"));
    }

    #[test]
    fn test_infinity_handling() {
        let expr = Expression::parse("1 / d").unwrap();
        let out = expr.evaluate(array![0.0, 2.0].view()).unwrap();
        assert_eq!(out[0], f64::INFINITY);

        let expr = Expression::parse("log(d)").unwrap();
        assert!(expr.evaluate(array![0.0].view()).is_err());
    }

    #[test]
    fn test_expanded_requires_axes() {
        let expr = Expression::parse("d[0] < 1").unwrap();
        assert!(expr.is_expanded());
        assert!(expr.evaluate(array![0.0].view()).is_err());

        let total = array![[1.0, 2.0]];
        let x = array![[0.5, 2.0]];
        let zero = array![[0.0, 0.0]];
        let out = expr
            .evaluate_expanded(total.view(), [x.view(), zero.view(), zero.view()])
            .unwrap();
        assert_eq!(out, array![[1.0, 0.0]]);

        let wrong = array![[0.0]];
        assert!(expr
            .evaluate_expanded(total.view(), [wrong.view(), zero.view(), zero.view()])
            .is_err());
    }

    #[test]
    fn test_reserved_variable_names() {
        assert!(Expression::parse_with_variable("pi", "pi").is_err());
        assert!(Expression::parse_with_variable("exp", "exp").is_err());
        let expr: Expression = "d * 2".parse().unwrap();
        assert_eq!(expr.to_string(), "d * 2");
        assert_eq!(expr.variable(), "d");
    }
}
