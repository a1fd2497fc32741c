//! # functions.rs
//!
//! Built-in functions applied to evaluated arguments.

use super::{matrix, trig, unsupported_operand, unsupported_operands, Value};
use crate::ast::{as_integer, FunctionKind, UnaryKind};
use crate::errors::ExecutionError;
use crate::settings::Settings;
use crate::units::{AngleUnit, Family, Quantity, Unit};
use num_complex::Complex;

fn invalid(function: &str, reason: impl Into<String>) -> ExecutionError {
    ExecutionError::InvalidArgument { function: function.to_string(), reason: reason.into() }
}

/// Complex counterpart of the kinds that extend to complex arguments.
///
/// Circular functions read the argument in radians.
fn complex_unary(kind: UnaryKind, z: Complex<f64>) -> Option<Complex<f64>> {
    use UnaryKind as K;
    let w = match kind {
        K::Negate => -z,
        K::Plus | K::ToNumber => z,
        K::Sqrt => z.sqrt(),
        K::Cbrt => z.cbrt(),
        K::Exp => z.exp(),
        K::Ln => z.ln(),
        K::Lg => z.log10(),
        K::Lb => z.log2(),
        K::Sin => z.sin(),
        K::Cos => z.cos(),
        K::Tan => z.tan(),
        K::Cot => z.tan().inv(),
        K::Sec => z.cos().inv(),
        K::Csc => z.sin().inv(),
        K::Asin => z.asin(),
        K::Acos => z.acos(),
        K::Atan => z.atan(),
        K::Sinh => z.sinh(),
        K::Cosh => z.cosh(),
        K::Tanh => z.tanh(),
        K::Coth => z.tanh().inv(),
        K::Sech => z.cosh().inv(),
        K::Csch => z.sinh().inv(),
        K::Asinh => z.asinh(),
        K::Acosh => z.acosh(),
        K::Atanh => z.atanh(),
        K::Conjugate => z.conj(),
        K::Reciprocal | K::Inverse => z.inv(),
        _ => return None,
    };
    Some(w)
}

fn target_angle(kind: UnaryKind) -> Option<AngleUnit> {
    match kind {
        UnaryKind::ToDegree => Some(AngleUnit::Degree),
        UnaryKind::ToRadian => Some(AngleUnit::Radian),
        UnaryKind::ToGradian => Some(AngleUnit::Gradian),
        _ => None,
    }
}

/// Applies a one-argument built-in.
///
/// # Arguments
/// * `kind` - function to apply
/// * `value` - evaluated argument
/// * `settings` - angle mode for plain-number angles
///
/// # Returns
/// * `Ok(Value)` - the result
/// * `Err(ExecutionError)` - the argument kind is not supported by the function
pub fn apply_unary(kind: UnaryKind, value: &Value, settings: &Settings) -> Result<Value, ExecutionError> {
    use UnaryKind as K;
    let mode = settings.angle_mode.unit();
    let unsupported = || unsupported_operand(kind.name(), value);

    match (kind, value) {
        (K::Negate, v) => v.neg(),
        (K::Plus, Value::Number(_) | Value::Complex(_) | Value::Quantity(_)
            | Value::Vector(_) | Value::Matrix(_)) => Ok(value.clone()),
        (K::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (K::Not, Value::Number(x)) => kind.apply(*x)
            .map(Value::Number)
            .ok_or_else(|| invalid(kind.name(), "the operand must be an integer")),

        (k, Value::Number(x)) if k.is_circular() => {
            trig::circular(k, &Quantity::angle(*x, mode)).map(Value::Number).ok_or_else(unsupported)
        },
        (k, Value::Quantity(q)) if k.is_circular() => {
            trig::circular(k, q).map(Value::Number).ok_or_else(unsupported)
        },
        (k, Value::Number(x)) if k.is_inverse_circular() => {
            trig::inverse(k, *x, mode).map(Value::Quantity).ok_or_else(unsupported)
        },

        (k, Value::Number(x)) if target_angle(k).is_some() => {
            convert_angle(Quantity::angle(*x, mode), k)
        },
        (k, Value::Quantity(q)) if target_angle(k).is_some() => convert_angle(*q, k),

        (K::ToNumber, Value::Quantity(q)) => Ok(Value::Number(q.magnitude())),
        (K::ToNumber, Value::Bool(b)) => Ok(Value::Number(if *b { 1.0 } else { 0.0 })),
        (K::ToNumber, Value::Str(s)) => s.trim().parse::<f64>()
            .map(Value::Number)
            .map_err(|_| invalid(kind.name(), format!("'{}' is not a number", s))),

        (K::Abs, Value::Complex(z)) => Ok(Value::Number(z.norm())),
        (K::Abs, Value::Vector(v)) => Ok(Value::Number(v.iter().map(|x| x * x).sum::<f64>().sqrt())),
        (K::Re, Value::Complex(z)) => Ok(Value::Number(z.re)),
        (K::Im, Value::Complex(z)) => Ok(Value::Number(z.im)),
        (K::Phase, Value::Complex(z)) => Ok(Value::Number(z.arg())),

        // the real results of these are NaN for negative arguments
        (K::Sqrt | K::Ln | K::Lg | K::Lb, Value::Number(x)) if *x < 0.0 => complex_unary(kind, Complex::new(*x, 0.0))
            .map(Value::complex)
            .ok_or_else(unsupported),
        (k, Value::Complex(z)) => complex_unary(k, *z).map(Value::complex).ok_or_else(unsupported),

        (K::Transpose, Value::Matrix(m)) => Ok(Value::Matrix(matrix::transpose(m))),
        (K::Transpose, Value::Vector(v)) => Ok(Value::Matrix(v.iter().map(|x| vec![*x]).collect())),
        (K::Determinant, Value::Matrix(m)) => matrix::determinant(m).map(Value::Number),
        (K::Inverse | K::Reciprocal, Value::Matrix(m)) => matrix::inverse(m).map(Value::Matrix),

        (K::Abs | K::Floor | K::Ceil | K::Trunc | K::Frac, Value::Quantity(q)) => kind.apply(q.magnitude())
            .map(|x| Value::Quantity(q.with_magnitude(x)))
            .ok_or_else(unsupported),

        (k, Value::Number(x)) => k.apply(*x).map(Value::Number).ok_or_else(unsupported),
        _ => Err(unsupported()),
    }
}

fn convert_angle(angle: Quantity, kind: UnaryKind) -> Result<Value, ExecutionError> {
    let unit = target_angle(kind).ok_or_else(|| unsupported_operand(kind.name(), &Value::Quantity(angle)))?;
    if angle.family() != Family::Angle {
        return Err(unsupported_operand(kind.name(), &Value::Quantity(angle)));
    }
    angle.to(Unit::Angle(unit)).map(Value::Quantity)
}

/// Applies a built-in taking more than one argument, or a variable number of them.
///
/// # Arguments
/// * `kind` - function to apply
/// * `args` - evaluated arguments
/// * `settings` - angle mode for `convert` of plain numbers
pub fn apply_function(kind: FunctionKind, args: &[Value], settings: &Settings) -> Result<Value, ExecutionError> {
    use FunctionKind as F;
    let name = kind.name();

    if !kind.arity().accepts(args.len()) {
        return Err(invalid(name, format!("expects {} argument(s) but got {}", kind.arity(), args.len())));
    }

    match (kind, args) {
        (F::Log, [base, x]) => log(base, x),
        (F::Root, [x, n]) => root(x, n),
        (F::Convert, [value, unit]) => convert(value, unit, settings),
        (F::DotProduct, [Value::Vector(a), Value::Vector(b)]) => {
            if a.len() != b.len() {
                return Err(ExecutionError::DimensionMismatch { operation: name.to_string() });
            }
            Ok(Value::Number(a.iter().zip(b).map(|(x, y)| x * y).sum()))
        },
        (F::CrossProduct, [Value::Vector(a), Value::Vector(b)]) => match (a.as_slice(), b.as_slice()) {
            ([a1, a2, a3], [b1, b2, b3]) => Ok(Value::Vector(vec![
                a2 * b3 - a3 * b2,
                a3 * b1 - a1 * b3,
                a1 * b2 - a2 * b1,
            ])),
            _ => Err(ExecutionError::DimensionMismatch { operation: name.to_string() }),
        },
        (F::DotProduct | F::CrossProduct, [a, b]) => Err(unsupported_operands(name, a, b)),
        (F::Round, [x]) => round(x, 0),
        (F::Round, [x, Value::Number(digits)]) => match as_integer(*digits).and_then(|d| i32::try_from(d).ok()) {
            Some(digits) => round(x, digits),
            None => Err(invalid(name, "the number of digits must be an integer")),
        },
        (F::Round, [x, digits]) => Err(unsupported_operands(name, x, digits)),
        (F::Gcd | F::Lcm, args) => {
            let integers = args.iter()
                .map(|arg| match arg {
                    Value::Number(x) => as_integer(*x).ok_or_else(|| invalid(name, "operands must be integers")),
                    other => Err(unsupported_operand(name, other)),
                })
                .collect::<Result<Vec<_>, _>>()?;
            let result = match kind {
                F::Gcd => integers.into_iter().fold(0, gcd),
                _ => integers.into_iter().fold(1, lcm),
            };
            Ok(Value::Number(result as f64))
        },
        (kind, args) => aggregate(kind, &samples(name, args)?),
    }
}

fn log(base: &Value, x: &Value) -> Result<Value, ExecutionError> {
    match (base, x) {
        (Value::Number(b), Value::Number(x)) if *b > 0.0 && *x > 0.0 => Ok(Value::Number(x.ln() / b.ln())),
        _ => match (base.as_complex(), x.as_complex()) {
            (Some(b), Some(z)) => Ok(Value::complex(z.ln() / b.ln())),
            _ => Err(unsupported_operands("log", base, x)),
        },
    }
}

fn root(x: &Value, n: &Value) -> Result<Value, ExecutionError> {
    let (Value::Number(x), Value::Number(n)) = (x, n) else {
        return Err(unsupported_operands("root", x, n));
    };
    let odd = as_integer(*n).is_some_and(|n| n % 2 != 0);
    let result = match (*n, *x) {
        (n, x) if n == 2.0 && x >= 0.0 => x.sqrt(),
        (n, x) if n == 3.0 => x.cbrt(),
        (n, x) if x < 0.0 && odd => -(-x).powf(1.0 / n),
        (n, x) if x < 0.0 => return Ok(Value::complex(Complex::new(x, 0.0).powf(1.0 / n))),
        (n, x) => x.powf(1.0 / n),
    };
    Ok(Value::Number(result))
}

/// `convert(value, 'unit')`.
///
/// A quantity is converted; a plain number is tagged with the unit, except angles,
/// which are read in the angle mode first.
fn convert(value: &Value, unit: &Value, settings: &Settings) -> Result<Value, ExecutionError> {
    let Value::Str(spelling) = unit else {
        return Err(unsupported_operands("convert", value, unit));
    };
    let unit = Unit::from_name(&spelling.to_lowercase())
        .ok_or_else(|| ExecutionError::UnknownUnit(spelling.clone()))?;

    match value {
        Value::Quantity(q) => q.to(unit).map(Value::Quantity),
        Value::Number(x) if unit.family() == Family::Angle => {
            Quantity::angle(*x, settings.angle_mode.unit()).to(unit).map(Value::Quantity)
        },
        Value::Number(x) => Ok(Value::Quantity(Quantity::new(*x, unit))),
        other => Err(unsupported_operand("convert", other)),
    }
}

fn round(x: &Value, digits: i32) -> Result<Value, ExecutionError> {
    let scale = 10f64.powi(digits);
    let rounded = |x: f64| (x * scale).round() / scale;
    match x {
        Value::Number(x) => Ok(Value::Number(rounded(*x))),
        Value::Quantity(q) => Ok(Value::Quantity(q.with_magnitude(rounded(q.magnitude())))),
        Value::Complex(z) => Ok(Value::complex(Complex::new(rounded(z.re), rounded(z.im)))),
        other => Err(unsupported_operand("round", other)),
    }
}

fn gcd(a: i64, b: i64) -> i64 {
    let (mut a, mut b) = (a.abs(), b.abs());
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

fn lcm(a: i64, b: i64) -> i64 {
    if a == 0 || b == 0 { 0 } else { (a / gcd(a, b) * b).abs() }
}

/// Flattens numbers, vectors and matrices into one list of samples.
fn samples(name: &str, args: &[Value]) -> Result<Vec<f64>, ExecutionError> {
    let mut values = Vec::new();
    for arg in args {
        match arg {
            Value::Number(x) => values.push(*x),
            Value::Vector(v) => values.extend_from_slice(v),
            Value::Matrix(m) => values.extend(m.iter().flatten()),
            other => return Err(unsupported_operand(name, other)),
        }
    }
    Ok(values)
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sum of squared deviations divided by `n - ddof`.
fn variance(name: &str, values: &[f64], ddof: usize) -> Result<f64, ExecutionError> {
    if values.len() <= ddof {
        return Err(invalid(name, format!("needs more than {} value(s)", ddof)));
    }
    let m = mean(values);
    Ok(values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (values.len() - ddof) as f64)
}

fn aggregate(kind: FunctionKind, values: &[f64]) -> Result<Value, ExecutionError> {
    use FunctionKind as F;
    let name = kind.name();
    if values.is_empty() && matches!(kind, F::Min | F::Max | F::Avg) {
        return Err(invalid(name, "needs at least one value"));
    }

    let result = match kind {
        F::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
        F::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        F::Sum => values.iter().sum(),
        F::Product => values.iter().product(),
        F::Avg => mean(values),
        F::Count => values.len() as f64,
        F::Var => variance(name, values, 1)?,
        F::Varp => variance(name, values, 0)?,
        F::Stdev => variance(name, values, 1)?.sqrt(),
        F::Stdevp => variance(name, values, 0)?.sqrt(),
        _ => return Err(invalid(name, "is not an aggregate")),
    };
    Ok(Value::Number(result))
}
