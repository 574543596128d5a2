//! Expression tree and the allow-listed function table

use core::fmt;

/// Largest axis index accepted in `d[i]`
pub const MAX_AXIS: usize = 2;

/// Named constants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constant {
    /// Euler's number
    E,
    /// Pi
    Pi,
    /// Positive infinity
    Inf,
}

impl Constant {
    /// Resolve a constant name
    pub fn lookup(name: &str) -> Option<Self> {
        match name {
            "e" => Some(Self::E),
            "pi" => Some(Self::Pi),
            "inf" => Some(Self::Inf),
            _ => None,
        }
    }

    /// Numeric value
    pub fn value(self) -> f64 {
        match self {
            Self::E => std::f64::consts::E,
            Self::Pi => std::f64::consts::PI,
            Self::Inf => f64::INFINITY,
        }
    }
}

/// The closed set of callable functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    /// Inverse cosine
    Arccos,
    /// Inverse sine
    Arcsin,
    /// Inverse tangent
    Arctan,
    /// Two-argument inverse tangent `arctan2(y, x)`
    Arctan2,
    /// Round up
    Ceil,
    /// Cosine
    Cos,
    /// Hyperbolic cosine
    Cosh,
    /// Exponential
    Exp,
    /// Absolute value
    Fabs,
    /// Round down
    Floor,
    /// C-style remainder with the sign of the dividend
    Fmod,
    /// Euclidean norm of two values
    Hypot,
    /// `x * 2**i` with `i` truncated to an integer
    Ldexp,
    /// Natural logarithm, or `log(x, base)`
    Log,
    /// Base-10 logarithm
    Log10,
    /// `power(x, y)`
    Power,
    /// Sine
    Sin,
    /// Hyperbolic sine
    Sinh,
    /// Square root
    Sqrt,
    /// Tangent
    Tan,
    /// Hyperbolic tangent
    Tanh,
    /// Element-wise maximum, NaN-propagating
    Maximum,
    /// Element-wise minimum, NaN-propagating
    Minimum,
}

impl Function {
    /// Every allow-listed function
    pub const ALL: [Function; 23] = [
        Self::Arccos,
        Self::Arcsin,
        Self::Arctan,
        Self::Arctan2,
        Self::Ceil,
        Self::Cos,
        Self::Cosh,
        Self::Exp,
        Self::Fabs,
        Self::Floor,
        Self::Fmod,
        Self::Hypot,
        Self::Ldexp,
        Self::Log,
        Self::Log10,
        Self::Power,
        Self::Sin,
        Self::Sinh,
        Self::Sqrt,
        Self::Tan,
        Self::Tanh,
        Self::Maximum,
        Self::Minimum,
    ];

    /// Resolve a function name, including the `math` module spellings
    pub fn lookup(name: &str) -> Option<Self> {
        let f = match name {
            "arccos" | "acos" => Self::Arccos,
            "arcsin" | "asin" => Self::Arcsin,
            "arctan" | "atan" => Self::Arctan,
            "arctan2" | "atan2" => Self::Arctan2,
            "ceil" => Self::Ceil,
            "cos" => Self::Cos,
            "cosh" => Self::Cosh,
            "exp" => Self::Exp,
            "fabs" | "abs" | "absolute" => Self::Fabs,
            "floor" => Self::Floor,
            "fmod" => Self::Fmod,
            "hypot" => Self::Hypot,
            "ldexp" => Self::Ldexp,
            "log" => Self::Log,
            "log10" => Self::Log10,
            "power" | "pow" => Self::Power,
            "sin" => Self::Sin,
            "sinh" => Self::Sinh,
            "sqrt" => Self::Sqrt,
            "tan" => Self::Tan,
            "tanh" => Self::Tanh,
            "maximum" => Self::Maximum,
            "minimum" => Self::Minimum,
            _ => return None,
        };
        Some(f)
    }

    /// Canonical name
    pub fn name(self) -> &'static str {
        match self {
            Self::Arccos => "arccos",
            Self::Arcsin => "arcsin",
            Self::Arctan => "arctan",
            Self::Arctan2 => "arctan2",
            Self::Ceil => "ceil",
            Self::Cos => "cos",
            Self::Cosh => "cosh",
            Self::Exp => "exp",
            Self::Fabs => "fabs",
            Self::Floor => "floor",
            Self::Fmod => "fmod",
            Self::Hypot => "hypot",
            Self::Ldexp => "ldexp",
            Self::Log => "log",
            Self::Log10 => "log10",
            Self::Power => "power",
            Self::Sin => "sin",
            Self::Sinh => "sinh",
            Self::Sqrt => "sqrt",
            Self::Tan => "tan",
            Self::Tanh => "tanh",
            Self::Maximum => "maximum",
            Self::Minimum => "minimum",
        }
    }

    /// Accepted argument counts as an inclusive range
    pub fn arity(self) -> (usize, usize) {
        match self {
            Self::Arctan2 | Self::Fmod | Self::Hypot | Self::Ldexp | Self::Power => (2, 2),
            Self::Maximum | Self::Minimum => (2, 2),
            Self::Log => (1, 2),
            _ => (1, 1),
        }
    }

    /// Apply to already-evaluated arguments; the arity has been checked at parse time
    pub fn apply(self, args: &[f64]) -> f64 {
        let x = args[0];
        let y = || args.get(1).copied().unwrap_or(f64::NAN);
        match self {
            Self::Arccos => x.acos(),
            Self::Arcsin => x.asin(),
            Self::Arctan => x.atan(),
            Self::Arctan2 => x.atan2(y()),
            Self::Ceil => x.ceil(),
            Self::Cos => x.cos(),
            Self::Cosh => x.cosh(),
            Self::Exp => x.exp(),
            Self::Fabs => x.abs(),
            Self::Floor => x.floor(),
            Self::Fmod => x % y(),
            Self::Hypot => x.hypot(y()),
            Self::Ldexp => x * 2f64.powi(y().trunc() as i32),
            Self::Log if args.len() == 2 => x.ln() / y().ln(),
            Self::Log => x.ln(),
            Self::Log10 => x.log10(),
            Self::Power => x.powf(y()),
            Self::Sin => x.sin(),
            Self::Sinh => x.sinh(),
            Self::Sqrt => x.sqrt(),
            Self::Tan => x.tan(),
            Self::Tanh => x.tanh(),
            Self::Maximum => {
                let y = y();
                if x.is_nan() || y.is_nan() {
                    f64::NAN
                } else {
                    x.max(y)
                }
            }
            Self::Minimum => {
                let y = y();
                if x.is_nan() || y.is_nan() {
                    f64::NAN
                } else {
                    x.min(y)
                }
            }
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `-x`
    Neg,
    /// `+x`
    Pos,
    /// `~x`, logical not
    Not,
}

/// Binary arithmetic and logical operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `//`, floor division
    FloorDiv,
    /// `%`, remainder with the sign of the divisor
    Mod,
    /// `**`
    Pow,
    /// `&`, logical and
    And,
    /// `|`, logical or
    Or,
}

/// Comparison operators, yielding 1.0 or 0.0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `==`
    Eq,
    /// `!=`
    Ne,
}

/// Expression tree node
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal
    Number(f64),
    /// Named constant
    Constant(Constant),
    /// The bound variable (total distance)
    Variable,
    /// Per-axis distance `d[i]`
    Axis(usize),
    /// Unary operation
    Unary(UnaryOp, Box<Expr>),
    /// Binary operation
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// Comparison
    Compare(CompareOp, Box<Expr>, Box<Expr>),
    /// Function call
    Call(Function, Vec<Expr>),
}

fn truthy(x: f64) -> bool {
    x != 0.0 && !x.is_nan()
}

fn bool_value(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

fn python_mod(a: f64, b: f64) -> f64 {
    let r = a % b;
    if r != 0.0 && (r < 0.0) != (b < 0.0) {
        r + b
    } else {
        r
    }
}

impl Expr {
    /// Evaluate at one point given the total distance and per-axis distances
    pub fn eval(&self, d: f64, axes: &[f64; 3]) -> f64 {
        match self {
            Expr::Number(v) => *v,
            Expr::Constant(c) => c.value(),
            Expr::Variable => d,
            Expr::Axis(i) => axes[*i],
            Expr::Unary(op, inner) => {
                let v = inner.eval(d, axes);
                match op {
                    UnaryOp::Neg => -v,
                    UnaryOp::Pos => v,
                    UnaryOp::Not => bool_value(!truthy(v)),
                }
            }
            Expr::Binary(op, lhs, rhs) => {
                let a = lhs.eval(d, axes);
                let b = rhs.eval(d, axes);
                match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div => a / b,
                    BinaryOp::FloorDiv => (a / b).floor(),
                    BinaryOp::Mod => python_mod(a, b),
                    BinaryOp::Pow => a.powf(b),
                    BinaryOp::And => bool_value(truthy(a) && truthy(b)),
                    BinaryOp::Or => bool_value(truthy(a) || truthy(b)),
                }
            }
            Expr::Compare(op, lhs, rhs) => {
                let a = lhs.eval(d, axes);
                let b = rhs.eval(d, axes);
                bool_value(match op {
                    CompareOp::Lt => a < b,
                    CompareOp::Le => a <= b,
                    CompareOp::Gt => a > b,
                    CompareOp::Ge => a >= b,
                    CompareOp::Eq => a == b,
                    CompareOp::Ne => a != b,
                })
            }
            Expr::Call(f, args) => {
                let mut values = [0.0f64; 2];
                for (slot, arg) in values.iter_mut().zip(args) {
                    *slot = arg.eval(d, axes);
                }
                f.apply(&values[..args.len()])
            }
        }
    }

    /// Whether any `d[i]` node occurs
    pub fn uses_axes(&self) -> bool {
        match self {
            Expr::Axis(_) => true,
            Expr::Number(_) | Expr::Constant(_) | Expr::Variable => false,
            Expr::Unary(_, inner) => inner.uses_axes(),
            Expr::Binary(_, a, b) | Expr::Compare(_, a, b) => a.uses_axes() || b.uses_axes(),
            Expr::Call(_, args) => args.iter().any(Expr::uses_axes),
        }
    }

    /// Whether the bound variable occurs in any form
    pub fn uses_variable(&self) -> bool {
        match self {
            Expr::Axis(_) | Expr::Variable => true,
            Expr::Number(_) | Expr::Constant(_) => false,
            Expr::Unary(_, inner) => inner.uses_variable(),
            Expr::Binary(_, a, b) | Expr::Compare(_, a, b) => {
                a.uses_variable() || b.uses_variable()
            }
            Expr::Call(_, args) => args.iter().any(Expr::uses_variable),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_covers_all() {
        for f in Function::ALL {
            assert_eq!(Function::lookup(f.name()), Some(f));
        }
        assert_eq!(Function::lookup("abs"), Some(Function::Fabs));
        assert_eq!(Function::lookup("eval"), None);
        assert_eq!(Function::lookup("modf"), None);
    }

    #[test]
    fn test_apply() {
        assert_eq!(Function::Fmod.apply(&[-7.0, 3.0]), -1.0);
        assert_eq!(Function::Ldexp.apply(&[3.0, 2.0]), 12.0);
        assert!((Function::Log.apply(&[8.0, 2.0]) - 3.0).abs() < 1e-12);
        assert!(Function::Maximum.apply(&[f64::NAN, 1.0]).is_nan());
        assert_eq!(Function::Minimum.apply(&[2.0, 1.0]), 1.0);
    }

    #[test]
    fn test_python_mod() {
        assert_eq!(python_mod(-7.0, 3.0), 2.0);
        assert_eq!(python_mod(7.0, -3.0), -2.0);
        assert_eq!(python_mod(6.0, 3.0), 0.0);
    }

    #[test]
    fn test_eval_tree() {
        // (d < 2) & (d[1] >= 1)
        let expr = Expr::Binary(
            BinaryOp::And,
            Box::new(Expr::Compare(
                CompareOp::Lt,
                Box::new(Expr::Variable),
                Box::new(Expr::Number(2.0)),
            )),
            Box::new(Expr::Compare(
                CompareOp::Ge,
                Box::new(Expr::Axis(1)),
                Box::new(Expr::Number(1.0)),
            )),
        );
        assert_eq!(expr.eval(1.5, &[0.0, 1.0, 0.0]), 1.0);
        assert_eq!(expr.eval(1.5, &[0.0, 0.5, 0.0]), 0.0);
        assert!(expr.uses_axes());
        assert!(expr.uses_variable());
        assert!(!Expr::Constant(Constant::Pi).uses_variable());
    }
}
