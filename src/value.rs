//! # value.rs
//!
//! Runtime values produced by evaluation, and the operators acting on them.
//!
//! Operators dispatch on the pair of operand kinds. Numbers are promoted to complex
//! numbers when the other operand is complex, and complex results with a zero
//! imaginary part collapse back into numbers. Unit-tagged quantities of one family
//! combine in the unit of the left operand. Any other combination is an
//! [`ExecutionError::UnsupportedOperands`].

pub mod functions;
pub mod matrix;
pub mod trig;

use crate::ast::{as_integer, BinaryKind, Expr};
use crate::errors::ExecutionError;
use crate::settings::Settings;
use crate::units::{Family, Quantity, Unit};
use num_complex::Complex;
use std::cmp::Ordering;
use std::ops::{BitAnd, BitOr, BitXor, Not};

pub use matrix::Matrix;

/// Result of evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Bool(bool),
    Complex(Complex<f64>),
    Quantity(Quantity),
    Vector(Vec<f64>),
    Matrix(Matrix),
    Str(String),

    /// Symbolic result, e.g. a derivative without an evaluation point.
    Expression(Box<Expr>),

    /// Result of loops, definitions and an `if` without a taken branch.
    Empty,
}

pub(crate) fn unsupported_operand(operation: &str, value: &Value) -> ExecutionError {
    ExecutionError::UnsupportedOperand {
        operation: operation.to_string(),
        kind: value.kind_name(),
    }
}

pub(crate) fn unsupported_operands(operation: &str, left: &Value, right: &Value) -> ExecutionError {
    ExecutionError::UnsupportedOperands {
        operation: operation.to_string(),
        left: left.kind_name(),
        right: right.kind_name(),
    }
}

fn integer_required(operation: &str) -> ExecutionError {
    ExecutionError::InvalidArgument {
        function: operation.to_string(),
        reason: "operands must be integers".into(),
    }
}

fn zip_vectors<F>(a: &[f64], b: &[f64], operation: &str, op: F) -> Result<Vec<f64>, ExecutionError>
where
    F: Fn(f64, f64) -> f64,
{
    if a.len() != b.len() {
        return Err(ExecutionError::DimensionMismatch { operation: operation.to_string() });
    }
    Ok(a.iter().zip(b).map(|(x, y)| op(*x, *y)).collect())
}

/// Applies a bitwise kind to booleans or integers alike.
fn bitwise_op<T>(kind: BinaryKind, a: T, b: T) -> Option<T>
where
    T: Copy + BitAnd<Output = T> + BitOr<Output = T> + BitXor<Output = T> + Not<Output = T>,
{
    match kind {
        BinaryKind::And => Some(a & b),
        BinaryKind::Or => Some(a | b),
        BinaryKind::Xor => Some(a ^ b),
        BinaryKind::Nand => Some(!(a & b)),
        BinaryKind::Nor => Some(!(a | b)),
        _ => None,
    }
}

impl Value {
    /// Returns the name of the value kind used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Number(_) => "number",
            Self::Bool(_) => "boolean",
            Self::Complex(_) => "complex",
            Self::Quantity(_) => "quantity",
            Self::Vector(_) => "vector",
            Self::Matrix(_) => "matrix",
            Self::Str(_) => "string",
            Self::Expression(_) => "expression",
            Self::Empty => "empty",
        }
    }

    /// Wraps a complex number, collapsing it into a number when its imaginary part is zero.
    pub fn complex(z: Complex<f64>) -> Self {
        if z.im == 0.0 { Self::Number(z.re) } else { Self::Complex(z) }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns numbers and complex numbers as complex numbers.
    pub(crate) fn as_complex(&self) -> Option<Complex<f64>> {
        match self {
            Self::Number(n) => Some(Complex::new(*n, 0.0)),
            Self::Complex(z) => Some(*z),
            _ => None,
        }
    }

    /// Reads the value as a condition: a boolean, or a number that is true when nonzero.
    pub fn is_truthy(&self, operation: &str) -> Result<bool, ExecutionError> {
        match self {
            Self::Bool(b) => Ok(*b),
            Self::Number(n) => Ok(*n != 0.0),
            other => Err(unsupported_operand(operation, other)),
        }
    }

    /// Applies `op` to two numeric operands of which at least one is complex.
    fn complex_op<F>(&self, rhs: &Self, operation: &str, op: F) -> Result<Self, ExecutionError>
    where
        F: Fn(Complex<f64>, Complex<f64>) -> Complex<f64>,
    {
        match (self.as_complex(), rhs.as_complex()) {
            (Some(a), Some(b)) => Ok(Self::complex(op(a, b))),
            _ => Err(unsupported_operands(operation, self, rhs)),
        }
    }

    pub fn add(&self, rhs: &Self) -> Result<Self, ExecutionError> {
        match (self, rhs) {
            (Self::Number(a), Self::Number(b)) => Ok(Self::Number(a + b)),
            (Self::Quantity(a), Self::Quantity(b)) => Ok(Self::Quantity(a.add(b)?)),
            (Self::Vector(a), Self::Vector(b)) => zip_vectors(a, b, "+", |x, y| x + y).map(Self::Vector),
            (Self::Matrix(a), Self::Matrix(b)) => matrix::elementwise(a, b, "+", |x, y| x + y).map(Self::Matrix),
            (Self::Str(a), Self::Str(b)) => Ok(Self::Str(format!("{}{}", a, b))),
            _ => self.complex_op(rhs, "+", |a, b| a + b),
        }
    }

    pub fn sub(&self, rhs: &Self) -> Result<Self, ExecutionError> {
        match (self, rhs) {
            (Self::Number(a), Self::Number(b)) => Ok(Self::Number(a - b)),
            (Self::Quantity(a), Self::Quantity(b)) => Ok(Self::Quantity(a.sub(b)?)),
            (Self::Vector(a), Self::Vector(b)) => zip_vectors(a, b, "-", |x, y| x - y).map(Self::Vector),
            (Self::Matrix(a), Self::Matrix(b)) => matrix::elementwise(a, b, "-", |x, y| x - y).map(Self::Matrix),
            _ => self.complex_op(rhs, "-", |a, b| a - b),
        }
    }

    pub fn mul(&self, rhs: &Self) -> Result<Self, ExecutionError> {
        match (self, rhs) {
            (Self::Number(a), Self::Number(b)) => Ok(Self::Number(a * b)),
            (Self::Number(k), Self::Quantity(q)) | (Self::Quantity(q), Self::Number(k)) => {
                Ok(Self::Quantity(q.with_magnitude(q.magnitude() * k)))
            },
            (Self::Quantity(a), Self::Quantity(b)) => a.product(b)
                .map(Self::Quantity)
                .ok_or_else(|| unsupported_operands("*", self, rhs)),
            (Self::Number(k), Self::Vector(v)) | (Self::Vector(v), Self::Number(k)) => {
                Ok(Self::Vector(v.iter().map(|x| x * k).collect()))
            },
            (Self::Number(k), Self::Matrix(m)) | (Self::Matrix(m), Self::Number(k)) => {
                Ok(Self::Matrix(matrix::map(m, |x| x * k)))
            },
            (Self::Matrix(a), Self::Matrix(b)) => matrix::multiply(a, b).map(Self::Matrix),
            (Self::Matrix(a), Self::Vector(v)) => matrix::mul_vector(a, v).map(Self::Vector),
            (Self::Vector(v), Self::Matrix(b)) => {
                let row = matrix::multiply(&vec![v.clone()], b)?;
                Ok(Self::Vector(row.into_iter().next().unwrap_or_default()))
            },
            _ => self.complex_op(rhs, "*", |a, b| a * b),
        }
    }

    pub fn div(&self, rhs: &Self) -> Result<Self, ExecutionError> {
        match (self, rhs) {
            (Self::Number(a), Self::Number(b)) => Ok(Self::Number(a / b)),
            (Self::Quantity(q), Self::Number(k)) => Ok(Self::Quantity(q.with_magnitude(q.magnitude() / k))),
            (Self::Quantity(a), Self::Quantity(b)) if a.family() == b.family() => {
                Ok(Self::Number(a.to_base() / b.to_base()))
            },
            (Self::Quantity(a), Self::Quantity(b)) => a.quotient(b)
                .map(Self::Quantity)
                .ok_or_else(|| unsupported_operands("/", self, rhs)),
            (Self::Vector(v), Self::Number(k)) => Ok(Self::Vector(v.iter().map(|x| x / k).collect())),
            (Self::Matrix(m), Self::Number(k)) => Ok(Self::Matrix(matrix::map(m, |x| x / k))),
            (Self::Matrix(a), Self::Matrix(b)) => matrix::multiply(a, &matrix::inverse(b)?).map(Self::Matrix),
            _ => self.complex_op(rhs, "/", |a, b| a / b),
        }
    }

    pub fn rem(&self, rhs: &Self) -> Result<Self, ExecutionError> {
        match (self, rhs) {
            (Self::Number(a), Self::Number(b)) => Ok(Self::Number(a % b)),
            (Self::Quantity(a), Self::Quantity(b)) => Ok(Self::Quantity(a.rem(b)?)),
            (Self::Quantity(q), Self::Number(k)) => Ok(Self::Quantity(q.with_magnitude(q.magnitude() % k))),
            _ => Err(unsupported_operands("%", self, rhs)),
        }
    }

    pub fn pow(&self, rhs: &Self) -> Result<Self, ExecutionError> {
        match (self, rhs) {
            // a negative base with a fractional exponent has no real result
            (Self::Number(a), Self::Number(b)) if *a < 0.0 && b.fract() != 0.0 => {
                Ok(Self::complex(Complex::new(*a, 0.0).powf(*b)))
            },
            (Self::Number(a), Self::Number(b)) => Ok(Self::Number(a.powf(*b))),
            (Self::Complex(z), Self::Number(b)) => match as_integer(*b).and_then(|n| i32::try_from(n).ok()) {
                Some(n) => Ok(Self::complex(z.powi(n))),
                None => Ok(Self::complex(z.powf(*b))),
            },
            (Self::Quantity(q), Self::Number(b)) => {
                let unit = match (q.family(), as_integer(*b)) {
                    (_, Some(1)) => return Ok(self.clone()),
                    (Family::Length, Some(2)) => Unit::SQUARE_METRE,
                    (Family::Length, Some(3)) => Unit::CUBIC_METRE,
                    _ => return Err(unsupported_operands("^", self, rhs)),
                };
                Ok(Self::Quantity(Quantity::new(q.to_base().powf(*b), unit)))
            },
            (Self::Matrix(m), Self::Number(b)) => match as_integer(*b) {
                Some(n) => matrix::power(m, n).map(Self::Matrix),
                None => Err(integer_required("^")),
            },
            _ => self.complex_op(rhs, "^", |a, b| a.powc(b)),
        }
    }

    pub fn neg(&self) -> Result<Self, ExecutionError> {
        match self {
            Self::Number(n) => Ok(Self::Number(-n)),
            Self::Complex(z) => Ok(Self::Complex(-z)),
            Self::Quantity(q) => Ok(Self::Quantity(q.with_magnitude(-q.magnitude()))),
            Self::Vector(v) => Ok(Self::Vector(v.iter().map(|x| -x).collect())),
            Self::Matrix(m) => Ok(Self::Matrix(matrix::map(m, |x| -x))),
            other => Err(unsupported_operand("-", other)),
        }
    }

    /// `r∠θ`: the complex number of modulus `r` and argument `θ`.
    ///
    /// A plain number angle is read in the angle mode of `settings`.
    pub fn polar(&self, rhs: &Self, settings: &Settings) -> Result<Self, ExecutionError> {
        let angle = match rhs {
            Self::Number(theta) => Quantity::angle(*theta, settings.angle_mode.unit()),
            Self::Quantity(q) if q.family() == Family::Angle => *q,
            _ => return Err(unsupported_operands("∠", self, rhs)),
        };
        let Self::Number(r) = self else {
            return Err(unsupported_operands("∠", self, rhs));
        };
        let (sin, cos) = match trig::exact_sin_cos(&angle) {
            Some(pair) => pair,
            None => angle.to_radians().map(f64::sin_cos).unwrap_or((f64::NAN, f64::NAN)),
        };
        Ok(Self::complex(Complex::new(r * cos, r * sin)))
    }

    /// Equality across kinds; values of different kinds are never equal.
    pub fn equals(&self, rhs: &Self) -> bool {
        match (self, rhs) {
            (Self::Quantity(a), Self::Quantity(b)) => {
                matches!(a.compare(b), Ok(Some(Ordering::Equal)))
            },
            (Self::Number(_) | Self::Complex(_), Self::Number(_) | Self::Complex(_)) => {
                self.as_complex() == rhs.as_complex()
            },
            _ => self == rhs,
        }
    }

    /// Orders numbers, quantities of one family and strings.
    pub fn compare(&self, rhs: &Self, operation: &str) -> Result<Option<Ordering>, ExecutionError> {
        match (self, rhs) {
            (Self::Number(a), Self::Number(b)) => Ok(a.partial_cmp(b)),
            (Self::Quantity(a), Self::Quantity(b)) => a.compare(b),
            (Self::Str(a), Self::Str(b)) => Ok(Some(a.cmp(b))),
            _ => Err(unsupported_operands(operation, self, rhs)),
        }
    }

    fn bitwise(&self, kind: BinaryKind, rhs: &Self) -> Result<Self, ExecutionError> {
        let unsupported = || unsupported_operands(kind.symbol(), self, rhs);
        match (self, rhs) {
            (Self::Bool(a), Self::Bool(b)) => bitwise_op(kind, *a, *b).map(Self::Bool).ok_or_else(unsupported),
            (Self::Number(a), Self::Number(b)) => match (as_integer(*a), as_integer(*b)) {
                (Some(a), Some(b)) => bitwise_op(kind, a, b)
                    .map(|n| Self::Number(n as f64))
                    .ok_or_else(unsupported),
                _ => Err(integer_required(kind.symbol())),
            },
            _ => Err(unsupported()),
        }
    }

    fn logical(&self, kind: BinaryKind, rhs: &Self) -> Result<Self, ExecutionError> {
        let (Self::Bool(a), Self::Bool(b)) = (self, rhs) else {
            return Err(unsupported_operands(kind.symbol(), self, rhs));
        };
        let result = match kind {
            BinaryKind::LogicalAnd => *a && *b,
            BinaryKind::LogicalOr => *a || *b,
            BinaryKind::Implies => !*a || *b,
            _ => a == b,
        };
        Ok(Self::Bool(result))
    }

    fn shift(&self, kind: BinaryKind, rhs: &Self) -> Result<Self, ExecutionError> {
        let (Self::Number(a), Self::Number(b)) = (self, rhs) else {
            return Err(unsupported_operands(kind.symbol(), self, rhs));
        };
        let (Some(a), Some(b)) = (as_integer(*a), as_integer(*b).and_then(|b| u32::try_from(b).ok())) else {
            return Err(integer_required(kind.symbol()));
        };
        let shifted = match kind {
            BinaryKind::ShiftLeft => a.checked_shl(b),
            _ => a.checked_shr(b),
        };
        shifted
            .map(|n| Self::Number(n as f64))
            .ok_or_else(|| ExecutionError::InvalidArgument {
                function: kind.symbol().to_string(),
                reason: format!("shift by {} is out of range", b),
            })
    }

    /// Applies a binary operator.
    ///
    /// # Arguments
    /// * `kind` - operator to apply
    /// * `rhs` - right operand
    /// * `settings` - angle mode for polar literals
    pub fn apply_binary(&self, kind: BinaryKind, rhs: &Self, settings: &Settings) -> Result<Self, ExecutionError> {
        use BinaryKind as B;
        match kind {
            B::Add => self.add(rhs),
            B::Sub => self.sub(rhs),
            B::Mul => self.mul(rhs),
            B::Div => self.div(rhs),
            B::Mod => self.rem(rhs),
            B::Pow => self.pow(rhs),
            B::Polar => self.polar(rhs, settings),
            B::Equal => Ok(Self::Bool(self.equals(rhs))),
            B::NotEqual => Ok(Self::Bool(!self.equals(rhs))),
            B::Less | B::LessEqual | B::Greater | B::GreaterEqual => {
                let ordering = self.compare(rhs, kind.symbol())?;
                let result = match kind {
                    B::Less => ordering == Some(Ordering::Less),
                    B::LessEqual => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
                    B::Greater => ordering == Some(Ordering::Greater),
                    _ => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
                };
                Ok(Self::Bool(result))
            },
            B::And | B::Or | B::Xor | B::Nand | B::Nor => self.bitwise(kind, rhs),
            B::LogicalAnd | B::LogicalOr | B::Implies | B::Equivalent => self.logical(kind, rhs),
            B::ShiftLeft | B::ShiftRight => self.shift(kind, rhs),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Complex<f64>> for Value {
    fn from(z: Complex<f64>) -> Self {
        Self::complex(z)
    }
}

impl From<Quantity> for Value {
    fn from(q: Quantity) -> Self {
        Self::Quantity(q)
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Self::Vector(v)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

fn write_row(f: &mut std::fmt::Formatter<'_>, row: &[f64]) -> std::fmt::Result {
    write!(f, "{{")?;
    for (i, x) in row.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", x)?;
    }
    write!(f, "}}")
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Complex(z) => write!(f, "{}", z),
            Self::Quantity(q) => write!(f, "{}", q),
            Self::Vector(v) => write_row(f, v),
            Self::Matrix(m) => {
                write!(f, "{{")?;
                for (i, row) in m.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write_row(f, row)?;
                }
                write!(f, "}}")
            },
            Self::Str(s) => write!(f, "{}", s),
            Self::Expression(expr) => write!(f, "{}", expr),
            Self::Empty => Ok(()),
        }
    }
}
