//! # differentiator.rs
//!
//! Symbolic differentiation of an [`Expr`] with respect to one variable.
//!
//! Every node first checks whether its subtree mentions the variable at all; if it
//! does not, the derivative is the zero node and no rule is attempted, even for
//! nodes that have no rule. Circular functions are differentiated as functions of
//! radians. The result is not simplified; callers usually pass it through
//! [`crate::analyzers::simplify`].

use crate::analyzers::format;
use crate::ast::{BinaryKind, Expr, FunctionKind, UnaryKind};
use crate::errors::AnalyzerError;

fn unsupported(expr: &Expr) -> AnalyzerError {
    AnalyzerError::UnsupportedOperation { analyzer: "derive", node: format(expr) }
}

/// Compute the derivative of `expr` with respect to `var`.
///
/// # Arguments
/// * `expr` - tree to differentiate; it is not modified
/// * `var` - name of the variable
///
/// # Returns
/// * `Ok(Expr)` - the derivative tree, the zero node if `expr` does not mention `var`
/// * `Err(AnalyzerError)` - a node mentioning `var` has no derivative rule
pub fn derive(expr: &Expr, var: &str) -> Result<Expr, AnalyzerError> {
    if !expr.has_variable(var) {
        return Ok(Expr::zero());
    }

    match expr {
        // only the target variable gets past the check above
        Expr::Variable(_) => Ok(Expr::one()),
        Expr::Unary { kind, arg } => diff_unary(*kind, arg, var),
        Expr::Binary { kind, left, right } => diff_binary(*kind, left, right, var),
        Expr::Call { kind, args } => diff_function(*kind, args, var).ok_or_else(|| unsupported(expr))?,
        Expr::Vector(elements) => Ok(Expr::Vector(
            elements.iter().map(|e| derive(e, var)).collect::<Result<_, _>>()?,
        )),
        Expr::Matrix(rows) => Ok(Expr::Matrix(
            rows.iter().map(|row| derive(row, var)).collect::<Result<_, _>>()?,
        )),
        // piecewise: the condition selects which derivative applies
        Expr::If { cond, then, otherwise } => Ok(Expr::If {
            cond: cond.clone(),
            then: Box::new(derive(then, var)?),
            otherwise: match otherwise {
                Some(otherwise) => Some(Box::new(derive(otherwise, var)?)),
                None => None,
            },
        }),
        Expr::Derivative { expr: inner, var: inner_var, point: None } => {
            derive(&derive(inner, inner_var)?, var)
        },
        Expr::Simplify(inner) => derive(inner, var),
        _ => Err(unsupported(expr)),
    }
}

/// Differentiate a one-argument function with the chain rule: `f(u)' = f'(u) * u'`.
fn diff_unary(kind: UnaryKind, arg: &Expr, var: &str) -> Result<Expr, AnalyzerError> {
    use UnaryKind as U;

    let du = derive(arg, var)?;
    let u = || arg.clone();
    let one = Expr::one;

    let outer = match kind {
        U::Negate => return Ok(du.negative()),
        U::Plus | U::Frac | U::ToNumber => return Ok(du),
        // piecewise constant
        U::Floor | U::Ceil | U::Trunc | U::Sign => return Ok(Expr::zero()),
        U::Abs => u().div(u().apply(U::Abs)),
        U::Sqrt => Expr::Number(0.5).div(u().apply(U::Sqrt)),
        U::Cbrt => one().div(Expr::Number(3.0).mul(u().apply(U::Cbrt).powi(2))),
        U::Exp => u().apply(U::Exp),
        U::Ln => one().div(u()),
        U::Lg => one().div(u().mul(Expr::Number(std::f64::consts::LN_10))),
        U::Lb => one().div(u().mul(Expr::Number(std::f64::consts::LN_2))),
        U::Reciprocal => one().div(u().powi(2)).negative(),
        U::Sin => u().apply(U::Cos),
        U::Cos => u().apply(U::Sin).negative(),
        U::Tan => u().apply(U::Sec).powi(2),
        U::Cot => u().apply(U::Csc).powi(2).negative(),
        U::Sec => u().apply(U::Sec).mul(u().apply(U::Tan)),
        U::Csc => u().apply(U::Csc).mul(u().apply(U::Cot)).negative(),
        U::Asin => one().div(one().sub(u().powi(2)).apply(U::Sqrt)),
        U::Acos => one().div(one().sub(u().powi(2)).apply(U::Sqrt)).negative(),
        U::Atan => one().div(one().add(u().powi(2))),
        U::Acot => one().div(one().add(u().powi(2))).negative(),
        U::Asec => one().div(u().apply(U::Abs).mul(u().powi(2).sub(one()).apply(U::Sqrt))),
        U::Acsc => one().div(u().apply(U::Abs).mul(u().powi(2).sub(one()).apply(U::Sqrt))).negative(),
        U::Sinh => u().apply(U::Cosh),
        U::Cosh => u().apply(U::Sinh),
        U::Tanh => u().apply(U::Sech).powi(2),
        U::Coth => u().apply(U::Csch).powi(2).negative(),
        U::Sech => u().apply(U::Sech).mul(u().apply(U::Tanh)).negative(),
        U::Csch => u().apply(U::Csch).mul(u().apply(U::Coth)).negative(),
        U::Asinh => one().div(u().powi(2).add(one()).apply(U::Sqrt)),
        U::Acosh => one().div(u().powi(2).sub(one()).apply(U::Sqrt)),
        U::Atanh | U::Acoth => one().div(one().sub(u().powi(2))),
        U::Asech => one().div(u().mul(one().sub(u().powi(2)).apply(U::Sqrt))).negative(),
        U::Acsch => one().div(u().apply(U::Abs).mul(one().add(u().powi(2)).apply(U::Sqrt))).negative(),
        U::Not | U::Factorial | U::ToDegree | U::ToRadian | U::ToGradian | U::Re | U::Im
        | U::Conjugate | U::Phase | U::Transpose | U::Determinant | U::Inverse => {
            return Err(unsupported(&Expr::unary(kind, u())));
        },
    };

    Ok(outer.mul(du))
}

/// Differentiate a binary operator, restricted to the sides that mention `var`.
///
/// - `(u ± v)' = u' ± v'`
/// - `(u * v)' = u' * v + u * v'`
/// - `(u / v)' = (u' * v - u * v') / v^2`
/// - powers fall back to [`diff_pow`]
fn diff_binary(kind: BinaryKind, left: &Expr, right: &Expr, var: &str) -> Result<Expr, AnalyzerError> {
    let in_left = left.has_variable(var);
    let in_right = right.has_variable(var);
    let (u, v) = (left.clone(), right.clone());

    let result = match kind {
        BinaryKind::Add => match (in_left, in_right) {
            (true, true) => derive(left, var)?.add(derive(right, var)?),
            (true, false) => derive(left, var)?,
            _ => derive(right, var)?,
        },
        BinaryKind::Sub => match (in_left, in_right) {
            (true, true) => derive(left, var)?.sub(derive(right, var)?),
            (true, false) => derive(left, var)?,
            _ => derive(right, var)?.negative(),
        },
        BinaryKind::Mul => match (in_left, in_right) {
            (true, true) => derive(left, var)?.mul(v).add(u.mul(derive(right, var)?)),
            (true, false) => derive(left, var)?.mul(v),
            _ => u.mul(derive(right, var)?),
        },
        BinaryKind::Div => match (in_left, in_right) {
            (true, false) => derive(left, var)?.div(v),
            (false, _) => u.mul(derive(right, var)?).div(v.powi(2)).negative(),
            (true, true) => {
                let numerator = derive(left, var)?.mul(v.clone()).sub(u.mul(derive(right, var)?));
                numerator.div(v.powi(2))
            },
        },
        // (u mod c)' = u' wherever it is defined
        BinaryKind::Mod if !in_right => derive(left, var)?,
        BinaryKind::Pow => diff_pow(left, right, var)?,
        _ => return Err(unsupported(&Expr::binary(kind, u, v))),
    };
    Ok(result)
}

/// Differentiate a power expression with respect to a variable.
///
/// ```text
/// d/dx [ u ^ c ] = c * u ^ (c - 1) * u'
/// d/dx [ c ^ v ] = c ^ v * ln(c) * v'
/// d/dx [ u ^ v ] = u ^ v * ( v' * ln(u) + v * u' / u )
/// ```
fn diff_pow(base: &Expr, exp: &Expr, var: &str) -> Result<Expr, AnalyzerError> {
    let u = base.clone();
    let v = exp.clone();

    if !exp.has_variable(var) {
        let lowered = match exp.as_number() {
            Some(c) => Expr::Number(c - 1.0),
            None => v.clone().sub(Expr::one()),
        };
        return Ok(v.mul(u.pow(lowered)).mul(derive(base, var)?));
    }

    if !base.has_variable(var) {
        let ln_u = u.clone().apply(UnaryKind::Ln);
        return Ok(u.pow(v).mul(ln_u).mul(derive(exp, var)?));
    }

    let du = derive(base, var)?;
    let dv = derive(exp, var)?;
    let ln_u = u.clone().apply(UnaryKind::Ln);
    Ok(u.clone().pow(v.clone()).mul(dv.mul(ln_u).add(v.mul(du).div(u))))
}

/// Differentiate a built-in call.
///
/// `log` and `root` are rewritten into `ln` quotients and powers, `sum` and `avg`
/// are linear. Returns `None` for calls without a derivative rule.
fn diff_function(kind: FunctionKind, args: &[Expr], var: &str) -> Option<Result<Expr, AnalyzerError>> {
    match (kind, args) {
        (FunctionKind::Log, [base, x]) => {
            let rewritten = x.clone().apply(UnaryKind::Ln).div(base.clone().apply(UnaryKind::Ln));
            Some(derive(&rewritten, var))
        },
        (FunctionKind::Root, [x, n]) => {
            let rewritten = x.clone().pow(Expr::one().div(n.clone()));
            Some(derive(&rewritten, var))
        },
        (FunctionKind::Sum | FunctionKind::Avg, args) if !args.is_empty() => {
            let derived = args.iter().map(|arg| derive(arg, var)).collect::<Result<Vec<_>, _>>();
            Some(derived.map(|args| Expr::Call { kind, args }))
        },
        _ => None,
    }
}

#[cfg(test)]
mod differentiator_tests {
    use super::*;
    use crate::analyzers::{evaluate, simplify};
    use crate::environment::Environment;
    use crate::parser::parse;
    use crate::value::Value;
    use approx::assert_abs_diff_eq;

    fn derived(text: &str) -> Expr {
        simplify(&derive(&parse(text).unwrap(), "x").unwrap())
    }

    /// Evaluates the derivative of `text` at `x = at`.
    fn slope(text: &str, at: f64) -> f64 {
        let derivative = derive(&parse(text).unwrap(), "x").unwrap();
        let mut env = Environment::default();
        env.define("x", Value::Number(at)).unwrap();
        evaluate(&derivative, &mut env).unwrap().as_number().unwrap()
    }

    #[test]
    fn test_constant_subtree_is_zero() {
        assert_eq!(derive(&parse("y^2 + sin(y)").unwrap(), "x").unwrap(), Expr::zero());
        assert_eq!(derive(&parse("3").unwrap(), "x").unwrap(), Expr::zero());
        // no rule exists for booleans, but the check comes first
        assert_eq!(derive(&parse("a && b").unwrap(), "x").unwrap(), Expr::zero());
        assert_eq!(derive(&parse("undefined(y)").unwrap(), "x").unwrap(), Expr::zero());
    }

    #[test]
    fn test_variable() {
        assert_eq!(derive(&Expr::variable("x"), "x").unwrap(), Expr::one());
    }

    #[test]
    fn test_polynomials() {
        assert_eq!(derived("x^2"), Expr::Number(2.0).mul(Expr::variable("x")));
        assert_eq!(derived("x^3 + 2x"), Expr::Number(3.0).mul(Expr::variable("x").powi(2)).add(Expr::Number(2.0)));
        assert_abs_diff_eq!(slope("x^2", 5.0), 10.0, epsilon = 1.0e-12);
        assert_abs_diff_eq!(slope("3x^4 - x", 2.0), 95.0, epsilon = 1.0e-12);
    }

    #[test]
    fn test_product_and_quotient() {
        assert_abs_diff_eq!(slope("x * exp(x)", 1.0), 2.0 * std::f64::consts::E, epsilon = 1.0e-12);
        assert_abs_diff_eq!(slope("1 / x", 2.0), -0.25, epsilon = 1.0e-12);
        assert_abs_diff_eq!(slope("x / (x + 1)", 1.0), 0.25, epsilon = 1.0e-12);
    }

    #[test]
    fn test_chain_rule() {
        assert_abs_diff_eq!(slope("sin(x^2)", 1.0), 2.0 * 1.0_f64.cos(), epsilon = 1.0e-12);
        assert_abs_diff_eq!(slope("ln(2x)", 4.0), 0.25, epsilon = 1.0e-12);
        assert_abs_diff_eq!(slope("sqrt(x)", 4.0), 0.25, epsilon = 1.0e-12);
        assert_abs_diff_eq!(slope("atan(x)", 1.0), 0.5, epsilon = 1.0e-12);
        assert_abs_diff_eq!(slope("cosh(x)", 0.0), 0.0, epsilon = 1.0e-12);
    }

    #[test]
    fn test_variable_exponent() {
        assert_abs_diff_eq!(slope("2^x", 1.0), 2.0 * 2.0_f64.ln(), epsilon = 1.0e-12);
        // d/dx x^x = x^x (ln x + 1)
        assert_abs_diff_eq!(slope("x^x", 2.0), 4.0 * (2.0_f64.ln() + 1.0), epsilon = 1.0e-12);
    }

    #[test]
    fn test_calls() {
        assert_abs_diff_eq!(slope("log(2, x)", 1.0), 1.0 / 2.0_f64.ln(), epsilon = 1.0e-12);
        assert_abs_diff_eq!(slope("root(x, 2)", 4.0), 0.25, epsilon = 1.0e-12);
        assert_abs_diff_eq!(slope("sum(x, x^2)", 3.0), 7.0, epsilon = 1.0e-12);
    }

    #[test]
    fn test_vectors() {
        assert_eq!(
            derived("{x, 2x, y}"),
            Expr::Vector(vec![Expr::one(), Expr::Number(2.0), Expr::zero()])
        );
    }

    #[test]
    fn test_unsupported_nodes() {
        let err = derive(&parse("x && true").unwrap(), "x").unwrap_err();
        assert_eq!(err, AnalyzerError::UnsupportedOperation { analyzer: "derive", node: "x && true".into() });
        assert!(derive(&parse("floor(x) + x!").unwrap(), "x").is_err());
        assert!(derive(&parse("max(x, 1)").unwrap(), "x").is_err());
        assert!(derive(&parse("f(x)").unwrap(), "x").is_err());
    }

    #[test]
    fn test_input_is_untouched() {
        let expr = parse("x^2 * sin(x)").unwrap();
        let copy = expr.clone();
        let _ = derive(&expr, "x").unwrap();
        assert_eq!(expr, copy);
    }
}
