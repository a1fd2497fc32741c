//! # formatter.rs
//!
//! Renders an [`Expr`] back into source text.
//!
//! Parenthesization is decided from the parent shape passed down the recursion:
//! a binary node, a prefix unary node, a negative number or a complex/quantity
//! leaf is wrapped when its parent is an operator. Function-style nodes never
//! need brackets around themselves. The output re-parses into a tree with the
//! same value, although not always the same text. Non-finite numbers have no
//! literal and are written as the division producing them, e.g. `(1 / 0)`.

use crate::ast::{Expr, Notation, UnaryKind};

/// Where a node is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Root,
    /// Operand of a unary or binary operator.
    Operator,
    /// Argument of a call or element of a literal.
    Argument,
}

fn wrap(text: String, context: Context) -> String {
    if context == Context::Operator { format!("({})", text) } else { text }
}

fn list(args: &[Expr]) -> String {
    args.iter()
        .map(|arg| render(arg, Context::Argument))
        .collect::<Vec<_>>()
        .join(", ")
}

fn non_finite(n: f64) -> &'static str {
    if n.is_nan() {
        "(0 / 0)"
    } else if n.is_sign_negative() {
        "(-1 / 0)"
    } else {
        "(1 / 0)"
    }
}

fn prefix_symbol(kind: UnaryKind) -> &'static str {
    match kind {
        UnaryKind::Not => "not ",
        other => other.name(),
    }
}

fn placeholders(arity: usize) -> String {
    (1..=arity).map(|i| format!("x{}", i)).collect::<Vec<_>>().join(", ")
}

fn render(expr: &Expr, context: Context) -> String {
    match expr {
        Expr::Number(n) if !n.is_finite() => non_finite(*n).to_string(),
        Expr::Number(n) if n.is_sign_negative() && *n != 0.0 => wrap(n.to_string(), context),
        Expr::Number(n) => n.to_string(),
        Expr::Boolean(b) => b.to_string(),
        Expr::Str(s) => format!("'{}'", s),
        Expr::Complex(z) => wrap(z.to_string(), context),
        Expr::Quantity(q) => wrap(q.to_string(), context),
        Expr::Variable(name) => name.clone(),
        Expr::Unary { kind, arg } => match kind.notation() {
            Notation::Prefix => {
                let text = format!("{}{}", prefix_symbol(*kind), render(arg, Context::Operator));
                wrap(text, context)
            },
            Notation::Function => format!("{}({})", kind.name(), render(arg, Context::Argument)),
        },
        Expr::Binary { kind, left, right } => {
            let text = format!(
                "{} {} {}",
                render(left, Context::Operator),
                kind.symbol(),
                render(right, Context::Operator),
            );
            wrap(text, context)
        },
        Expr::Call { kind, args } => format!("{}({})", kind.name(), list(args)),
        Expr::UserCall { name, args } => format!("{}({})", name, list(args)),
        Expr::Vector(elements) => format!("{{{}}}", list(elements)),
        Expr::Matrix(rows) => format!("{{{}}}", list(rows)),
        Expr::If { cond, then, otherwise: Some(otherwise) } => format!(
            "if({}, {}, {})",
            render(cond, Context::Argument),
            render(then, Context::Argument),
            render(otherwise, Context::Argument),
        ),
        Expr::If { cond, then, otherwise: None } => {
            format!("if({}, {})", render(cond, Context::Argument), render(then, Context::Argument))
        },
        Expr::For { body, init, cond, step } => format!(
            "for({}, {}, {}, {})",
            render(body, Context::Argument),
            render(init, Context::Argument),
            render(cond, Context::Argument),
            render(step, Context::Argument),
        ),
        Expr::While { body, cond } => {
            format!("while({}, {})", render(body, Context::Argument), render(cond, Context::Argument))
        },
        Expr::Assign { kind, target, value } => {
            wrap(format!("{} {} {}", target, kind.symbol(), render(value, Context::Argument)), context)
        },
        Expr::Step { kind, target } => wrap(format!("{}{}", target, kind.symbol()), context),
        Expr::Define { name, value } => format!("def({}, {})", name, render(value, Context::Argument)),
        Expr::DefineFunction { name, params, body } => {
            let text = format!("{}({}) := {}", name, params.join(", "), render(body, Context::Argument));
            wrap(text, context)
        },
        Expr::Undefine { name, arity: None } => format!("undef({})", name),
        Expr::Undefine { name, arity: Some(arity) } => format!("undef({}({}))", name, placeholders(*arity)),
        Expr::Derivative { expr, var, point } => match point {
            Some(point) => format!(
                "deriv({}, {}, {})",
                render(expr, Context::Argument),
                var,
                render(point, Context::Argument),
            ),
            None => format!("deriv({}, {})", render(expr, Context::Argument), var),
        },
        Expr::Simplify(expr) => format!("simplify({})", render(expr, Context::Argument)),
    }
}

/// Renders `expr` as text that parses back into an equivalent tree.
pub fn format(expr: &Expr) -> String {
    render(expr, Context::Root)
}
