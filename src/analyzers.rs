//! Top-level analyzers module.
//!
//! Every analyzer is a single function with one match arm per [`crate::ast::Expr`]
//! variant, so the compiler flags an analyzer that forgets a node kind. None of
//! them mutates its input; transformations build new trees.
//!
//! - `evaluator`: tree to runtime [`crate::value::Value`] against an environment.
//! - `differentiator`: tree to derivative tree.
//! - `simplifier`: tree to an equivalent, smaller tree.
//! - `formatter`: tree to display string.
pub(crate) mod differentiator;
pub(crate) mod evaluator;
pub(crate) mod formatter;
pub(crate) mod simplifier;

pub use differentiator::derive;
pub use evaluator::evaluate;
pub use formatter::format;
pub use simplifier::simplify;
