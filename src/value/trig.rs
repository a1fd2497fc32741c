//! # trig.rs
//!
//! Circular functions with an exact-value table.
//!
//! An angle is normalized into one full turn, then looked up among the multiples of
//! 30° and 45°. A hit returns the exact value (`sin 30° == 0.5`); a miss falls back
//! to the floating-point function in radians.

use crate::ast::UnaryKind;
use crate::units::{AngleUnit, Quantity, Unit};

/// Distance in degrees under which an angle snaps onto a table entry.
const SNAP_EPSILON: f64 = 1.0e-9;

const SQRT_3_2: f64 = 0.866_025_403_784_438_6;
const SQRT_2_2: f64 = std::f64::consts::FRAC_1_SQRT_2;

/// `(degrees, sin, cos)` for every exact angle of one turn.
static EXACT_ANGLES: [(f64, f64, f64); 16] = [
    (0.0,   0.0,        1.0),
    (30.0,  0.5,        SQRT_3_2),
    (45.0,  SQRT_2_2,   SQRT_2_2),
    (60.0,  SQRT_3_2,   0.5),
    (90.0,  1.0,        0.0),
    (120.0, SQRT_3_2,   -0.5),
    (135.0, SQRT_2_2,   -SQRT_2_2),
    (150.0, 0.5,        -SQRT_3_2),
    (180.0, 0.0,        -1.0),
    (210.0, -0.5,       -SQRT_3_2),
    (225.0, -SQRT_2_2,  -SQRT_2_2),
    (240.0, -SQRT_3_2,  -0.5),
    (270.0, -1.0,       0.0),
    (300.0, -SQRT_3_2,  0.5),
    (315.0, -SQRT_2_2,  SQRT_2_2),
    (330.0, -0.5,       SQRT_3_2),
];

/// Normalizes degrees into `[0, 360)`.
fn normalize(degrees: f64) -> f64 {
    let normalized = degrees.rem_euclid(360.0);
    if 360.0 - normalized < SNAP_EPSILON { 0.0 } else { normalized }
}

/// Returns the closest multiple of 15° if `degrees` lies within the snap distance.
fn snap(degrees: f64) -> Option<f64> {
    let candidate = (degrees / 15.0).round() * 15.0;
    ((degrees - candidate).abs() < SNAP_EPSILON).then_some(candidate)
}

/// Returns the exact `(sin, cos)` pair of an angle, if it is in the table.
pub fn exact_sin_cos(angle: &Quantity) -> Option<(f64, f64)> {
    let degrees = snap(normalize(angle.to_base()))?;
    let degrees = if degrees >= 360.0 { 0.0 } else { degrees };
    EXACT_ANGLES.iter()
        .find(|entry| entry.0 == degrees)
        .map(|&(_, sin, cos)| (sin, cos))
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 { f64::NAN } else { numerator / denominator }
}

/// Evaluates a circular function on an angle.
///
/// Undefined values such as `tan 90°` are `NaN`.
/// Returns `None` if `kind` is not a circular function or `angle` is not an angle.
pub fn circular(kind: UnaryKind, angle: &Quantity) -> Option<f64> {
    if !kind.is_circular() {
        return None;
    }
    let radians = angle.to_radians()?;

    match exact_sin_cos(angle) {
        Some((sin, cos)) => Some(match kind {
            UnaryKind::Sin => sin,
            UnaryKind::Cos => cos,
            UnaryKind::Tan => ratio(sin, cos),
            UnaryKind::Cot => ratio(cos, sin),
            UnaryKind::Sec => ratio(1.0, cos),
            _ => ratio(1.0, sin),
        }),
        None => kind.apply(radians),
    }
}

/// Evaluates an inverse circular function and reports the angle in `unit`.
///
/// Results within the snap distance of a multiple of 15° are made exact
/// in degree and gradian units.
pub fn inverse(kind: UnaryKind, x: f64, unit: AngleUnit) -> Option<Quantity> {
    if !kind.is_inverse_circular() {
        return None;
    }
    let radians = kind.apply(x)?;
    if unit == AngleUnit::Radian {
        return Some(Quantity::angle(radians, unit));
    }
    let degrees = radians.to_degrees();
    let degrees = snap(degrees).unwrap_or(degrees);
    Some(Quantity::from_base(degrees, Unit::Angle(unit)))
}
