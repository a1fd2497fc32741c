//! # registry.rs
//!
//! Read-only tables of named constants and native functions.
//!
//! A [`Registry`] is built explicitly and shared between environments through an
//! `Arc`, so no global state is involved. [`Registry::standard`] holds the
//! mathematical and physical constants plus a few native helpers; embedders can
//! extend it with their own entries before handing it to an environment.

use crate::errors::ExecutionError;
use crate::value::Value;
use num_complex::Complex;
use phf::Map;
use phf_macros::phf_map;
use std::collections::HashMap;
use std::sync::Arc;

/// Standard real constants; lookups are lowercase.
static CONSTANTS: Map<&'static str, f64> = phf_map! {
    "pi"    => std::f64::consts::PI,
    "π"     => std::f64::consts::PI,
    "e"     => std::f64::consts::E,
    "tau"   => std::f64::consts::TAU,
    "phi"   => 1.618_033_988_749_895,
    // standard gravity, m/s²
    "g"     => 9.806_65,
    // speed of light, m/s
    "c"     => 299_792_458.0,
    // Planck constant, J·s
    "h"     => 6.626_070_15e-34,
    // Avogadro constant, 1/mol
    "na"    => 6.022_140_76e23,
    // Boltzmann constant, J/K
    "k"     => 1.380_649e-23,
    // molar gas constant, J/(mol·K)
    "r"     => 8.314_462_618,
    // elementary charge, C
    "qe"    => 1.602_176_634e-19,
};

type NativeFn = dyn Fn(&[Value]) -> Result<Value, ExecutionError> + Send + Sync;

/// A function implemented in Rust and callable from expressions.
#[derive(Clone)] // Debug is implemented by hand because of the closure.
pub struct NativeFunction {
    name: String,
    arity: usize,
    func: Arc<NativeFn>,
}

impl NativeFunction {
    /// Creates a native function.
    ///
    /// # Arguments
    /// * `name` - name used in calls, matched case-insensitively
    /// * `arity` - number of arguments
    /// * `func` - implementation receiving exactly `arity` evaluated arguments
    pub fn new<F>(name: &str, arity: usize, func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, ExecutionError> + Send + Sync + 'static,
    {
        Self { name: name.to_lowercase(), arity, func: Arc::new(func) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn apply(&self, args: &[Value]) -> Result<Value, ExecutionError> {
        (self.func)(args)
    }
}

impl std::fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

impl PartialEq for NativeFunction {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.arity == other.arity
    }
}

/// Reads every argument as a number.
fn numbers<const N: usize>(name: &str, args: &[Value]) -> Result<[f64; N], ExecutionError> {
    let mut out = [0.0; N];
    for (slot, arg) in out.iter_mut().zip(args) {
        *slot = arg.as_number().ok_or_else(|| ExecutionError::UnsupportedOperand {
            operation: name.to_string(),
            kind: arg.kind_name(),
        })?;
    }
    Ok(out)
}

/// Named constants and native functions, resolved after every user scope.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Registry {
    constants: HashMap<String, Value>,
    functions: HashMap<(String, usize), NativeFunction>,
}

impl Registry {
    /// Creates a registry without any entry.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates the standard registry.
    pub fn standard() -> Self {
        let mut registry = CONSTANTS.entries()
            .fold(Self::empty(), |registry, (name, value)| registry.with_constant(name, Value::Number(*value)))
            .with_constant("i", Value::Complex(Complex::new(0.0, 1.0)));

        registry = registry
            .with_function(NativeFunction::new("hypot", 2, |args| {
                let [x, y] = numbers("hypot", args)?;
                Ok(Value::Number(x.hypot(y)))
            }))
            .with_function(NativeFunction::new("clamp", 3, |args| {
                let [x, lo, hi] = numbers("clamp", args)?;
                if lo > hi {
                    return Err(ExecutionError::InvalidArgument {
                        function: "clamp".into(),
                        reason: "the lower bound exceeds the upper bound".into(),
                    });
                }
                Ok(Value::Number(x.clamp(lo, hi)))
            }))
            .with_function(NativeFunction::new("lerp", 3, |args| {
                let [a, b, t] = numbers("lerp", args)?;
                Ok(Value::Number(a + (b - a) * t))
            }));

        registry
    }

    /// Adds or replaces a constant.
    pub fn with_constant(mut self, name: &str, value: Value) -> Self {
        self.constants.insert(name.to_lowercase(), value);
        self
    }

    /// Adds or replaces a native function.
    pub fn with_function(mut self, function: NativeFunction) -> Self {
        self.functions.insert((function.name.clone(), function.arity), function);
        self
    }

    /// Looks a constant up, ignoring case.
    pub fn constant(&self, name: &str) -> Option<&Value> {
        self.constants.get(&name.to_lowercase())
    }

    /// Looks a native function up by name, ignoring case, and arity.
    pub fn function(&self, name: &str, arity: usize) -> Option<&NativeFunction> {
        self.functions.get(&(name.to_lowercase(), arity))
    }

    /// Returns the names of every constant.
    pub fn constant_names(&self) -> impl Iterator<Item = &str> {
        self.constants.keys().map(String::as_str)
    }
}
