//! # exprengine
//!
//! `exprengine` is a Rust library for parsing, evaluating, differentiating and
//! simplifying expressions of a small mathematical and logical language with
//! **unit-tagged values**, **complex numbers** and **user-defined functions**.
//!
//! ## Overview
//! - Tokenize and parse expressions with a precedence-correct shunting-yard parser.
//! - Evaluate trees against a scoped [`Environment`] of parameters and functions.
//! - Differentiate and simplify trees symbolically, and format them back to text.
//! - Compute with angles, lengths, temperatures and other unit families.
//!
//! Internally, text is first split into tokens, the argument counts of calls
//! and literals are resolved in a pre-pass, the Shunting-Yard algorithm turns
//! the tokens into postfix order, and the postfix items are folded into an
//! [`Expr`] tree. The analyzers ([`evaluate`], [`derive`], [`simplify`],
//! [`format`]) are single functions matching on every node kind.
//!
//! ## Feature Highlights
//! - **Exact trigonometry** at multiples of 30° and 45°: `sin(30°)` is exactly `0.5`
//! - **Units** with conversion, e.g. `convert(2 km, 'mi')` or `100 celsius`
//! - **Statements** such as `if`, `for`, `while`, `def` and `undef`
//! - **In-language analysis** with `deriv(expr, x[, point])` and `simplify(expr)`
//! - **Host extensions** through [`Registry`] constants and [`NativeFunction`] closures
//!
//! ## Example
//! ```rust
//! use exprengine::{AngleMode, Processor, Value};
//!
//! let mut processor = Processor::new().with_angle_mode(AngleMode::Degree);
//! assert_eq!(processor.solve("sin(30)").unwrap(), Value::Number(0.5));
//!
//! processor.solve("f(x) := x^2 + 1").unwrap();
//! assert_eq!(processor.solve("f(3)").unwrap(), Value::Number(10.0));
//! ```
//!
//! ## Example: Working With Trees
//! ```rust
//! use exprengine::{derive, evaluate, format, parse, simplify, Environment, Value};
//!
//! let expr = parse("x^2 * 3").unwrap();
//! let derivative = simplify(&derive(&expr, "x").unwrap());
//! assert_eq!(format(&derivative), "6 * x");
//!
//! let mut env = Environment::default();
//! env.define("x", Value::Number(5.0)).unwrap();
//! assert_eq!(evaluate(&derivative, &mut env).unwrap(), Value::Number(30.0));
//! ```
//!
//! ## Example: Retrieving All Names
//! ```rust
//! use exprengine::ast::{BinaryKind, Builtin, FunctionKind, UnaryKind};
//!
//! // Functions and statements callable by name
//! let builtin_names: Vec<&'static str> = Builtin::names();
//! println!("Builtins: {:?}", builtin_names);
//!
//! // One-argument functions and prefix operators
//! let unary_names: Vec<&'static str> = UnaryKind::names();
//! println!("Unary: {:?}", unary_names);
//!
//! // Binary operators
//! let binary_names: Vec<&'static str> = BinaryKind::names();
//! println!("Binary Operators: {:?}", binary_names);
//!
//! // Functions with more than one argument
//! let function_names: Vec<&'static str> = FunctionKind::names();
//! println!("Functions: {:?}", function_names);
//! ```
//!
//! ## Threads
//! Tokenizing and parsing are pure and may run in parallel. An [`Environment`]
//! is mutated by evaluation and must not be shared without a lock.
//!
//! ## License
//! Licensed under either **MIT** or **Apache-2.0** at your option.

mod arity;
mod processor;

pub mod analyzers;
pub mod ast;
pub mod environment;
pub mod errors;
pub mod lexer;
pub mod parser;
pub mod registry;
pub mod settings;
pub mod units;
pub mod value;

pub use analyzers::{derive, evaluate, format, simplify};
pub use ast::Expr;
pub use environment::{Environment, Parameter, ParameterKind, UserFunction};
pub use errors::{AnalyzerError, Error, ExecutionError, ParameterError, ParseError, TokenizeError};
pub use lexer::{tokenize, Token};
pub use parser::parse;
pub use processor::Processor;
pub use registry::{NativeFunction, Registry};
pub use settings::{AngleMode, Settings};
pub use units::{Quantity, Unit};
pub use value::Value;
