//! # environment.rs
//!
//! Name resolution during evaluation.
//!
//! An [`Environment`] is a stack of scopes on top of a shared [`Registry`].
//! Lookups walk the scopes from the innermost outwards and fall back to the
//! registry; definitions always land in the innermost scope. User function calls
//! run their body in a fresh scope holding the bound arguments, which is dropped
//! when the call returns.
//!
//! Registry constants are read-only in the global scope only. A nested scope may
//! define a parameter of the same name, which hides the constant until the scope
//! is dropped.

use crate::ast::Expr;
use crate::errors::ParameterError;
use crate::registry::{NativeFunction, Registry};
use crate::settings::Settings;
use crate::value::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Mutability of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParameterKind {
    #[default]
    Normal,

    /// Cannot be assigned or removed by expressions.
    ReadOnly,

    /// Like `ReadOnly`, for values fixed by the embedder.
    Constant,
}

/// A named value.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub value: Value,
    pub kind: ParameterKind,
}

impl Parameter {
    pub fn new(name: &str, value: Value) -> Self {
        Self { name: name.to_string(), value, kind: ParameterKind::Normal }
    }

    pub fn read_only(name: &str, value: Value) -> Self {
        Self { kind: ParameterKind::ReadOnly, ..Self::new(name, value) }
    }

    pub fn constant(name: &str, value: Value) -> Self {
        Self { kind: ParameterKind::Constant, ..Self::new(name, value) }
    }

    pub fn is_writable(&self) -> bool {
        self.kind == ParameterKind::Normal
    }
}

/// A function defined by an expression, e.g. `f(x) := x^2`.
#[derive(Debug, Clone, PartialEq)]
pub struct UserFunction {
    pub name: String,
    pub params: Vec<String>,
    pub body: Expr,
}

impl UserFunction {
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

#[derive(Debug, Clone, Default)]
struct Scope {
    parameters: HashMap<String, Parameter>,
    functions: HashMap<(String, usize), UserFunction>,
}

/// Scoped parameters and functions, the shared registry and the settings.
#[derive(Debug, Clone)]
pub struct Environment {
    registry: Arc<Registry>,
    scopes: Vec<Scope>,
    settings: Settings,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new(Arc::new(Registry::standard()))
    }
}

impl Environment {
    /// Creates an environment with one global scope.
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            scopes: vec![Scope::default()],
            settings: Settings::default(),
        }
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Number of scopes, the global one included.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    fn current(&mut self) -> &mut Scope {
        if self.scopes.is_empty() {
            self.scopes.push(Scope::default());
        }
        let last = self.scopes.len() - 1;
        &mut self.scopes[last]
    }

    fn is_global(&self) -> bool {
        self.scopes.len() <= 1
    }

    fn find(&self, name: &str) -> Option<&Parameter> {
        self.scopes.iter().rev().find_map(|scope| scope.parameters.get(name))
    }

    /// Adds a parameter to the innermost scope, replacing a writable one of the same name.
    ///
    /// # Errors
    ///
    /// [`ParameterError::ReadOnly`] if the name belongs to a protected parameter of the
    /// innermost scope, or to a registry constant while the global scope is innermost.
    pub fn add(&mut self, parameter: Parameter) -> Result<(), ParameterError> {
        let name = parameter.name.clone();
        if self.is_global() && self.registry.constant(&name).is_some() {
            return Err(ParameterError::ReadOnly(name));
        }
        let scope = self.current();
        if scope.parameters.get(&name).is_some_and(|p| !p.is_writable()) {
            return Err(ParameterError::ReadOnly(name));
        }
        log::trace!("define '{}' at depth {}", name, self.scopes.len());
        self.current().parameters.insert(name, parameter);
        Ok(())
    }

    /// Defines a writable parameter in the innermost scope.
    pub fn define(&mut self, name: &str, value: Value) -> Result<(), ParameterError> {
        self.add(Parameter::new(name, value))
    }

    /// Removes the innermost parameter called `name`.
    pub fn remove(&mut self, name: &str) -> Result<(), ParameterError> {
        let scope = self.scopes.iter_mut().rev().find(|scope| scope.parameters.contains_key(name));
        match scope {
            Some(scope) => {
                if scope.parameters.get(name).is_some_and(|p| !p.is_writable()) {
                    return Err(ParameterError::ReadOnly(name.to_string()));
                }
                scope.parameters.remove(name);
                Ok(())
            },
            None if self.registry.constant(name).is_some() => Err(ParameterError::ReadOnly(name.to_string())),
            None => Err(ParameterError::Undefined(name.to_string())),
        }
    }

    /// Resolves a name through the scopes, then the registry.
    pub fn lookup(&self, name: &str) -> Result<&Value, ParameterError> {
        self.find(name)
            .map(|p| &p.value)
            .or_else(|| self.registry.constant(name))
            .ok_or_else(|| ParameterError::Undefined(name.to_string()))
    }

    /// Stores `value` into the innermost parameter called `name`, defining it in the
    /// innermost scope if no scope knows the name.
    ///
    /// A name only the registry knows is read-only from the global scope and is
    /// shadowed from a nested one.
    pub fn assign(&mut self, name: &str, value: Value) -> Result<(), ParameterError> {
        let existing = self.scopes.iter_mut().rev().find_map(|scope| scope.parameters.get_mut(name));
        match existing {
            Some(parameter) if !parameter.is_writable() => Err(ParameterError::ReadOnly(name.to_string())),
            Some(parameter) => {
                parameter.value = value;
                Ok(())
            },
            None => self.define(name, value),
        }
    }

    pub fn enter_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    /// Drops the innermost scope; the global scope is never dropped.
    pub fn exit_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Runs `f` inside a fresh scope.
    pub fn scoped<F, T>(&mut self, f: F) -> T
    where
        F: FnOnce(&mut Self) -> T,
    {
        self.enter_scope();
        let result = f(self);
        self.exit_scope();
        result
    }

    /// Defines or replaces a user function in the innermost scope.
    pub fn define_function(&mut self, function: UserFunction) {
        log::trace!("define function '{}' with {} parameter(s)", function.name, function.arity());
        let key = (function.name.clone(), function.arity());
        self.current().functions.insert(key, function);
    }

    /// Resolves a user function by name and arity.
    pub fn function(&self, name: &str, arity: usize) -> Option<&UserFunction> {
        let key = (name.to_string(), arity);
        self.scopes.iter().rev().find_map(|scope| scope.functions.get(&key))
    }

    /// Removes the innermost user function with the given name and arity.
    pub fn remove_function(&mut self, name: &str, arity: usize) -> Result<(), ParameterError> {
        let key = (name.to_string(), arity);
        self.scopes.iter_mut().rev()
            .find_map(|scope| scope.functions.remove(&key))
            .map(|_| ())
            .ok_or_else(|| ParameterError::Undefined(format!("{}/{}", name, arity)))
    }

    /// Resolves a native registry function by name and arity.
    pub fn native(&self, name: &str, arity: usize) -> Option<&NativeFunction> {
        self.registry.function(name, arity)
    }
}

#[cfg(test)]
mod environment_tests {
    use super::*;

    #[test]
    fn test_lookup_falls_back_to_registry() {
        let mut env = Environment::default();
        assert_eq!(env.lookup("pi"), Ok(&Value::Number(std::f64::consts::PI)));
        assert_eq!(env.lookup("x"), Err(ParameterError::Undefined("x".into())));
        env.define("x", Value::Number(2.0)).unwrap();
        assert_eq!(env.lookup("x"), Ok(&Value::Number(2.0)));
    }

    #[test]
    fn test_registry_constants_are_read_only() {
        let mut env = Environment::default();
        assert_eq!(env.assign("pi", Value::Number(3.0)), Err(ParameterError::ReadOnly("pi".into())));
        assert_eq!(env.define("e", Value::Number(3.0)), Err(ParameterError::ReadOnly("e".into())));
        assert_eq!(env.remove("pi"), Err(ParameterError::ReadOnly("pi".into())));
        assert_eq!(env.remove("nothing"), Err(ParameterError::Undefined("nothing".into())));
    }

    #[test]
    fn test_protected_parameters() {
        let mut env = Environment::default();
        env.add(Parameter::read_only("limit", Value::Number(10.0))).unwrap();
        env.add(Parameter::constant("base", Value::Number(2.0))).unwrap();
        assert_eq!(env.assign("limit", Value::Number(1.0)), Err(ParameterError::ReadOnly("limit".into())));
        assert_eq!(env.define("base", Value::Number(1.0)), Err(ParameterError::ReadOnly("base".into())));
        assert_eq!(env.remove("limit"), Err(ParameterError::ReadOnly("limit".into())));
        assert_eq!(env.lookup("limit"), Ok(&Value::Number(10.0)));
    }

    #[test]
    fn test_scopes_shadow_and_restore() {
        let mut env = Environment::default();
        env.define("x", Value::Number(1.0)).unwrap();
        let inner = env.scoped(|env| {
            env.define("x", Value::Number(5.0)).unwrap();
            env.define("y", Value::Number(6.0)).unwrap();
            env.lookup("x").cloned()
        });
        assert_eq!(inner, Ok(Value::Number(5.0)));
        assert_eq!(env.lookup("x"), Ok(&Value::Number(1.0)));
        assert!(env.lookup("y").is_err());
        assert_eq!(env.depth(), 1);
    }

    #[test]
    fn test_assign_updates_outer_scope() {
        let mut env = Environment::default();
        env.define("total", Value::Number(1.0)).unwrap();
        env.scoped(|env| env.assign("total", Value::Number(3.0))).unwrap();
        assert_eq!(env.lookup("total"), Ok(&Value::Number(3.0)));
    }

    #[test]
    fn test_nested_scope_shadows_registry() {
        let mut env = Environment::default();
        let inner = env.scoped(|env| {
            env.define("r", Value::Number(3.0)).unwrap();
            env.assign("k", Value::Number(4.0)).unwrap();
            (env.lookup("r").cloned(), env.lookup("k").cloned())
        });
        assert_eq!(inner, (Ok(Value::Number(3.0)), Ok(Value::Number(4.0))));
        assert_eq!(env.lookup("r").ok(), env.registry().constant("r"));
        assert_ne!(env.lookup("r"), Ok(&Value::Number(3.0)));
        assert_eq!(env.assign("k", Value::Number(4.0)), Err(ParameterError::ReadOnly("k".into())));
    }

    #[test]
    fn test_nested_scope_hides_global_parameter() {
        let mut env = Environment::default();
        env.add(Parameter::constant("base", Value::Number(2.0))).unwrap();
        let inner = env.scoped(|env| {
            env.define("base", Value::Number(10.0)).unwrap();
            env.lookup("base").cloned()
        });
        assert_eq!(inner, Ok(Value::Number(10.0)));
        assert_eq!(env.lookup("base"), Ok(&Value::Number(2.0)));
    }

    #[test]
    fn test_global_scope_is_kept() {
        let mut env = Environment::default();
        env.exit_scope();
        env.exit_scope();
        assert_eq!(env.depth(), 1);
        env.define("x", Value::Number(1.0)).unwrap();
        assert!(env.lookup("x").is_ok());
    }

    #[test]
    fn test_user_functions_by_arity() {
        let mut env = Environment::default();
        env.define_function(UserFunction {
            name: "f".into(),
            params: vec!["x".into()],
            body: Expr::variable("x"),
        });
        assert!(env.function("f", 1).is_some());
        assert!(env.function("f", 2).is_none());
        assert!(env.remove_function("f", 2).is_err());
        env.remove_function("f", 1).unwrap();
        assert!(env.function("f", 1).is_none());
        assert!(env.native("hypot", 2).is_some());
    }
}
