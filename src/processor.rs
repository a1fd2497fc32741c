//! # processor.rs
//!
//! This module provides the [`Processor`] facade that runs text through the whole
//! pipeline against one long-lived environment.

use crate::analyzers::{derive, evaluate, simplify};
use crate::ast::Expr;
use crate::environment::{Environment, Parameter};
use crate::errors::Error;
use crate::lexer::{self, Tokens};
use crate::parser;
use crate::registry::Registry;
use crate::settings::AngleMode;
use crate::value::Value;
use std::sync::Arc;

/// Owns an [`Environment`] and evaluates expressions in it one after another.
///
/// Assignments and definitions made by one call are visible to the next.
#[derive(Debug, Clone, Default)]
pub struct Processor {
    environment: Environment,
}

impl Processor {
    /// Creates a processor with the standard registry and radian mode.
    ///
    /// # Examples
    /// ```rust
    /// use exprengine::{Processor, Value};
    ///
    /// let mut processor = Processor::new();
    /// processor.solve("r := 2").unwrap();
    /// assert_eq!(processor.solve("r ^ 3 + 1").unwrap(), Value::Number(9.0));
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the unit plain numbers are read in by circular functions.
    ///
    /// # Examples
    /// ```rust
    /// use exprengine::{AngleMode, Processor, Value};
    ///
    /// let mut processor = Processor::new().with_angle_mode(AngleMode::Degree);
    /// assert_eq!(processor.solve("sin(30)").unwrap(), Value::Number(0.5));
    /// ```
    pub fn with_angle_mode(mut self, angle_mode: AngleMode) -> Self {
        self.environment.settings_mut().angle_mode = angle_mode;
        self
    }

    /// Replaces the registry of constants and native functions.
    ///
    /// The environment is rebuilt around the new registry, so call this before
    /// adding parameters. The settings are kept.
    ///
    /// # Examples
    /// ```rust
    /// use exprengine::{NativeFunction, Processor, Registry, Value};
    ///
    /// let registry = Registry::standard()
    ///     .with_constant("answer", Value::Number(42.0))
    ///     .with_function(NativeFunction::new("twice", 1, |args| args[0].add(&args[0])));
    ///
    /// let mut processor = Processor::new().with_registry(registry);
    /// assert_eq!(processor.solve("twice(answer)").unwrap(), Value::Number(84.0));
    /// ```
    pub fn with_registry(self, registry: Registry) -> Self {
        let settings = *self.environment.settings();
        Self { environment: Environment::new(Arc::new(registry)).with_settings(settings) }
    }

    /// Adds parameters to the global scope.
    ///
    /// # Errors
    /// Fails with [`Error::Parameter`] if a name belongs to a registry constant or to
    /// a protected parameter added earlier.
    pub fn with_parameters<I>(mut self, parameters: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = Parameter>,
    {
        for parameter in parameters {
            self.environment.add(parameter)?;
        }
        Ok(self)
    }

    /// Splits `text` into tokens.
    pub fn tokenize(&self, text: &str) -> Result<Tokens, Error> {
        Ok(lexer::tokenize(text)?)
    }

    /// Parses `text` into a tree without evaluating it.
    pub fn parse(&self, text: &str) -> Result<Expr, Error> {
        Ok(parser::parse(text)?)
    }

    /// Parses and evaluates `text` in the processor's environment.
    ///
    /// # Errors
    /// [`Error::Parse`] for malformed text, [`Error::Execution`] when evaluation fails.
    /// Assignments made before a failing node are kept.
    pub fn solve(&mut self, text: &str) -> Result<Value, Error> {
        log::debug!("solve '{}'", text);
        let expr = parser::parse(text)?;
        Ok(evaluate(&expr, &mut self.environment)?)
    }

    /// Parses and simplifies `text`.
    pub fn simplify(&self, text: &str) -> Result<Expr, Error> {
        log::debug!("simplify '{}'", text);
        Ok(simplify(&parser::parse(text)?))
    }

    /// Parses `text` and returns its simplified derivative with respect to `var`.
    ///
    /// # Examples
    /// ```rust
    /// use exprengine::Processor;
    ///
    /// let processor = Processor::new();
    /// let derivative = processor.differentiate("x^3 + 2x", "x").unwrap();
    /// assert_eq!(derivative.to_string(), "(3 * (x ^ 2)) + 2");
    /// ```
    pub fn differentiate(&self, text: &str, var: &str) -> Result<Expr, Error> {
        log::debug!("differentiate '{}' with respect to '{}'", text, var);
        let expr = parser::parse(text)?;
        Ok(simplify(&derive(&expr, var)?))
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn environment_mut(&mut self) -> &mut Environment {
        &mut self.environment
    }
}
