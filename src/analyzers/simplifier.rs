//! # simplifier.rs
//!
//! Rewrites an [`Expr`] into an equivalent, usually smaller tree.
//!
//! Constant subtrees are folded through the runtime value layer, so the folded
//! result is exactly what evaluation would produce. Functions whose result depends
//! on the angle mode are left alone. Sums and products are then flattened and
//! normalized: like terms are combined, powers of a common base are merged and
//! identities such as `x + 0`, `x * 1` and `x ^ 1` disappear.

use crate::ast::{BinaryKind, Expr, UnaryKind};
use crate::settings::Settings;
use crate::value::{functions, Value};

/// Reads a constant leaf as a runtime value.
fn constant(expr: &Expr) -> Option<Value> {
    match expr {
        Expr::Number(n) => Some(Value::Number(*n)),
        Expr::Boolean(b) => Some(Value::Bool(*b)),
        Expr::Complex(z) => Some(Value::Complex(*z)),
        Expr::Quantity(q) => Some(Value::Quantity(*q)),
        Expr::Str(s) => Some(Value::Str(s.clone())),
        _ => None,
    }
}

/// Turns a folded value back into a leaf; non-finite results are not folded.
fn leaf(value: Value) -> Option<Expr> {
    match value {
        Value::Number(n) if n.is_finite() => Some(Expr::Number(n)),
        Value::Bool(b) => Some(Expr::Boolean(b)),
        Value::Complex(z) if z.is_finite() => Some(Expr::Complex(z)),
        Value::Quantity(q) if q.magnitude().is_finite() => Some(Expr::Quantity(q)),
        _ => None,
    }
}

/// Returns `true` if the result of `kind` depends on the angle mode.
fn depends_on_angle_mode(kind: UnaryKind) -> bool {
    kind.is_circular()
        || kind.is_inverse_circular()
        || matches!(kind, UnaryKind::ToDegree | UnaryKind::ToRadian | UnaryKind::ToGradian)
}

fn fold_unary(kind: UnaryKind, arg: Expr) -> Expr {
    if !depends_on_angle_mode(kind)
        && let Some(value) = constant(&arg)
        && let Ok(result) = functions::apply_unary(kind, &value, &Settings::default())
        && let Some(folded) = leaf(result)
    {
        return folded;
    }

    match (kind, arg) {
        (UnaryKind::Plus, arg) => arg,
        (UnaryKind::Negate, Expr::Unary { kind: UnaryKind::Negate, arg }) => *arg,
        (kind, arg) => Expr::unary(kind, arg),
    }
}

fn fold_binary(kind: BinaryKind, left: Expr, right: Expr) -> Expr {
    if kind != BinaryKind::Polar
        && let (Some(l), Some(r)) = (constant(&left), constant(&right))
        && let Ok(result) = l.apply_binary(kind, &r, &Settings::default())
        && let Some(folded) = leaf(result)
    {
        return folded;
    }

    match kind {
        BinaryKind::Add => fold_add(left, right),
        BinaryKind::Sub => fold_sub(left, right),
        BinaryKind::Mul => fold_mul(left, right),
        BinaryKind::Div => fold_div(left, right),
        BinaryKind::Pow => fold_pow(left, right),
        kind => Expr::binary(kind, left, right),
    }
}

/// Simplifies and folds addition expressions by normalizing terms.
///
/// - `((a + b) + c)` is flattened into `a + b + c`
/// - `2 + x + 3` becomes `x + 5`
/// - `x + x` becomes `2 * x`, `2 * x - x` becomes `x`
/// - `x + 0` becomes `x`
fn fold_add(left: Expr, right: Expr) -> Expr {
    let mut terms = Vec::new();
    collect_add_terms(left, &mut terms);
    collect_add_terms(right, &mut terms);

    let mut const_sum = 0.0;
    let mut coefficients: Vec<(Expr, f64)> = Vec::new();
    for term in terms {
        match term {
            Expr::Number(n) => const_sum += n,
            other => match split_coefficient(other) {
                (coeff, Some(base)) => insert_term(&mut coefficients, base, coeff),
                (coeff, None) => const_sum += coeff,
            },
        }
    }

    let mut node: Option<Expr> = None;
    for (base, coeff) in coefficients {
        if coeff == 0.0 {
            continue;
        }
        node = Some(match node {
            None => scaled(base, coeff),
            Some(acc) if coeff < 0.0 => acc.sub(scaled(base, -coeff)),
            Some(acc) => acc.add(scaled(base, coeff)),
        });
    }

    match node {
        None => Expr::Number(const_sum),
        Some(acc) if const_sum == 0.0 => acc,
        Some(acc) if const_sum < 0.0 => acc.sub(Expr::Number(-const_sum)),
        Some(acc) => acc.add(Expr::Number(const_sum)),
    }
}

fn collect_add_terms(node: Expr, terms: &mut Vec<Expr>) {
    match node {
        Expr::Binary { kind: BinaryKind::Add, left, right } => {
            collect_add_terms(*left, terms);
            collect_add_terms(*right, terms);
        },
        Expr::Binary { kind: BinaryKind::Sub, left, right } => {
            collect_add_terms(*left, terms);
            let mut negated = Vec::new();
            collect_add_terms(*right, &mut negated);
            terms.extend(negated.into_iter().map(|term| match term {
                Expr::Number(n) => Expr::Number(-n),
                other => other.negative(),
            }));
        },
        _ => terms.push(node),
    }
}

/// Splits a term into its numeric coefficient and the remaining product, if any.
fn split_coefficient(term: Expr) -> (f64, Option<Expr>) {
    let mut factors = Vec::new();
    collect_mul_terms(term, &mut factors);

    let mut coeff = 1.0;
    let mut rest = Vec::new();
    for factor in factors {
        match factor {
            Expr::Number(n) => coeff *= n,
            other => rest.push(other),
        }
    }
    let base = if rest.is_empty() { None } else { Some(product(rest)) };
    (coeff, base)
}

/// Inserts `base` with `coeff`, adding to the coefficient of an equal base.
fn insert_term(map: &mut Vec<(Expr, f64)>, base: Expr, coeff: f64) {
    for (b, c) in map.iter_mut() {
        if *b == base {
            *c += coeff;
            return;
        }
    }
    map.push((base, coeff))
}

fn scaled(base: Expr, coeff: f64) -> Expr {
    if coeff == 1.0 {
        base
    } else if coeff == -1.0 {
        base.negative()
    } else {
        Expr::Number(coeff).mul(base)
    }
}

fn product(factors: Vec<Expr>) -> Expr {
    factors.into_iter().reduce(Expr::mul).unwrap_or_else(Expr::one)
}

fn fold_sub(left: Expr, right: Expr) -> Expr {
    if left == right {
        return Expr::zero();
    }
    let negated = match right {
        Expr::Number(n) => Expr::Number(-n),
        other => other.negative(),
    };
    fold_add(left, negated)
}

/// Simplifies and folds multiplication expressions by normalizing factors.
///
/// - numeric factors are multiplied together and moved first
/// - a zero factor makes the whole product zero
/// - `x^a * x^b` becomes `x^(a+b)`, so `x * x` becomes `x^2`
fn fold_mul(left: Expr, right: Expr) -> Expr {
    let mut factors = Vec::new();
    collect_mul_terms(left, &mut factors);
    collect_mul_terms(right, &mut factors);

    let mut const_product = 1.0;
    let mut exponents: Vec<(Expr, f64)> = Vec::new();
    let mut opaque = Vec::new();
    // powers with a symbolic exponent are kept as they are
    for factor in factors {
        match factor {
            Expr::Number(n) => const_product *= n,
            Expr::Binary { kind: BinaryKind::Pow, left, right } => match *right {
                Expr::Number(e) => insert_term(&mut exponents, *left, e),
                right => opaque.push((*left).pow(right)),
            },
            other => insert_term(&mut exponents, other, 1.0),
        }
    }

    if const_product == 0.0 {
        return Expr::zero();
    }

    let mut rest: Vec<Expr> = exponents.into_iter()
        .filter(|(_, exp)| *exp != 0.0)
        .map(|(base, exp)| if exp == 1.0 { base } else { base.pow(Expr::Number(exp)) })
        .collect();
    rest.extend(opaque);

    match (rest.is_empty(), const_product) {
        (true, c) => Expr::Number(c),
        (false, c) if c == 1.0 => product(rest),
        (false, c) if c == -1.0 => product(rest).negative(),
        (false, c) => Expr::Number(c).mul(product(rest)),
    }
}

/// Flattens nested products; a negation contributes a factor of `-1`.
fn collect_mul_terms(node: Expr, terms: &mut Vec<Expr>) {
    match node {
        Expr::Binary { kind: BinaryKind::Mul, left, right } => {
            collect_mul_terms(*left, terms);
            collect_mul_terms(*right, terms);
        },
        Expr::Unary { kind: UnaryKind::Negate, arg } => {
            terms.push(Expr::Number(-1.0));
            collect_mul_terms(*arg, terms);
        },
        _ => terms.push(node),
    }
}

fn fold_div(left: Expr, right: Expr) -> Expr {
    if right.is_number(1.0) {
        left
    } else if left.is_number(0.0) && !right.is_number(0.0) {
        Expr::zero()
    } else if left == right {
        Expr::one()
    } else {
        left.div(right)
    }
}

fn fold_pow(base: Expr, exp: Expr) -> Expr {
    if exp.is_number(1.0) {
        return base;
    }
    if exp.is_number(0.0) {
        return Expr::one();
    }

    match (base, exp) {
        (base, _) if base.is_number(1.0) => Expr::one(),
        (Expr::Number(b), Expr::Number(e)) if b == 0.0 && e > 0.0 => Expr::zero(),
        // (x^a)^b == x^(a*b) for integer exponents
        (Expr::Binary { kind: BinaryKind::Pow, left, right }, Expr::Number(outer)) => match *right {
            Expr::Number(inner) if inner.fract() == 0.0 && outer.fract() == 0.0 => {
                fold_pow(*left, Expr::Number(inner * outer))
            },
            right => (*left).pow(right).pow(Expr::Number(outer)),
        },
        (base, exp) => base.pow(exp),
    }
}

/// Simplifies `expr` into a new tree.
///
/// # Arguments
/// * `expr` - tree to simplify; it is not modified
///
/// # Returns
/// An equivalent tree with constant subtrees folded and identities removed.
pub fn simplify(expr: &Expr) -> Expr {
    match expr {
        Expr::Number(_) | Expr::Boolean(_) | Expr::Str(_) | Expr::Complex(_)
        | Expr::Quantity(_) | Expr::Variable(_) => expr.clone(),
        Expr::Unary { kind, arg } => fold_unary(*kind, simplify(arg)),
        Expr::Binary { kind, left, right } => fold_binary(*kind, simplify(left), simplify(right)),
        Expr::Call { kind, args } => {
            let args: Vec<Expr> = args.iter().map(simplify).collect();
            let values: Option<Vec<Value>> = args.iter().map(constant).collect();
            values
                .and_then(|values| functions::apply_function(*kind, &values, &Settings::default()).ok())
                .and_then(leaf)
                .unwrap_or(Expr::Call { kind: *kind, args })
        },
        Expr::UserCall { name, args } => Expr::UserCall {
            name: name.clone(),
            args: args.iter().map(simplify).collect(),
        },
        Expr::Vector(elements) => Expr::Vector(elements.iter().map(simplify).collect()),
        Expr::Matrix(rows) => Expr::Matrix(rows.iter().map(simplify).collect()),
        Expr::If { cond, then, otherwise } => match (simplify(cond), otherwise) {
            (Expr::Boolean(true), _) => simplify(then),
            (Expr::Boolean(false), Some(otherwise)) => simplify(otherwise),
            (cond, otherwise) => Expr::If {
                cond: Box::new(cond),
                then: Box::new(simplify(then)),
                otherwise: otherwise.as_ref().map(|e| Box::new(simplify(e))),
            },
        },
        Expr::For { body, init, cond, step } => Expr::For {
            body: Box::new(simplify(body)),
            init: Box::new(simplify(init)),
            cond: Box::new(simplify(cond)),
            step: Box::new(simplify(step)),
        },
        Expr::While { body, cond } => Expr::While {
            body: Box::new(simplify(body)),
            cond: Box::new(simplify(cond)),
        },
        Expr::Assign { kind, target, value } => Expr::Assign {
            kind: *kind,
            target: target.clone(),
            value: Box::new(simplify(value)),
        },
        Expr::Step { .. } | Expr::Undefine { .. } => expr.clone(),
        Expr::Define { name, value } => Expr::Define { name: name.clone(), value: Box::new(simplify(value)) },
        Expr::DefineFunction { name, params, body } => Expr::DefineFunction {
            name: name.clone(),
            params: params.clone(),
            body: Box::new(simplify(body)),
        },
        Expr::Derivative { expr, var, point } => Expr::Derivative {
            expr: Box::new(simplify(expr)),
            var: var.clone(),
            point: point.as_ref().map(|p| Box::new(simplify(p))),
        },
        Expr::Simplify(inner) => Expr::Simplify(Box::new(simplify(inner))),
    }
}

#[cfg(test)]
mod simplifier_tests {
    use super::*;
    use crate::ast::FunctionKind;
    use crate::parser::parse;

    fn var(name: &str) -> Expr {
        Expr::variable(name)
    }

    fn simplified(text: &str) -> Expr {
        simplify(&parse(text).unwrap())
    }

    #[test]
    fn test_constant_folding() {
        assert_eq!(simplified("2 + 3 * 4"), Expr::Number(14.0));
        assert_eq!(simplified("2 ^ 10"), Expr::Number(1024.0));
        assert_eq!(simplified("1 < 2"), Expr::Boolean(true));
        assert_eq!(simplified("sqrt(16)"), Expr::Number(4.0));
        assert_eq!(simplified("max(1, 5, 3)"), Expr::Number(5.0));
    }

    #[test]
    fn test_angle_dependent_functions_are_kept() {
        assert_eq!(simplified("sin(30)"), Expr::Number(30.0).apply(UnaryKind::Sin));
    }

    #[test]
    fn test_non_finite_results_are_kept() {
        assert_eq!(simplified("1 / 0"), Expr::Number(1.0).div(Expr::Number(0.0)));
    }

    #[test]
    fn test_fold_add() {
        assert_eq!(simplified("x + 0"), var("x"));
        assert_eq!(simplified("x + x"), Expr::Number(2.0).mul(var("x")));
        assert_eq!(simplified("2 + x + 3"), var("x").add(Expr::Number(5.0)));
        assert_eq!(simplified("2x + 3y - x"), var("x").add(Expr::Number(3.0).mul(var("y"))));
        assert_eq!(simplified("x - 1"), var("x").sub(Expr::Number(1.0)));
        assert_eq!(simplified("x - x"), Expr::zero());
        assert_eq!(simplified("a*b + 2*a*b"), Expr::Number(3.0).mul(var("a").mul(var("b"))));
    }

    #[test]
    fn test_fold_mul() {
        assert_eq!(simplified("x * 1"), var("x"));
        assert_eq!(simplified("0 * x"), Expr::zero());
        assert_eq!(simplified("2 * x * 3"), Expr::Number(6.0).mul(var("x")));
        assert_eq!(simplified("x * x"), var("x").pow(Expr::Number(2.0)));
        assert_eq!(simplified("x^2 * x^3"), var("x").pow(Expr::Number(5.0)));
        assert_eq!(simplified("-1 * x"), var("x").negative());
        assert_eq!(simplified("-(-x)"), var("x"));
    }

    #[test]
    fn test_fold_div_and_pow() {
        assert_eq!(simplified("x / 1"), var("x"));
        assert_eq!(simplified("0 / x"), Expr::zero());
        assert_eq!(simplified("x / x"), Expr::one());
        assert_eq!(simplified("x ^ 1"), var("x"));
        assert_eq!(simplified("x ^ 0"), Expr::one());
        assert_eq!(simplified("1 ^ x"), Expr::one());
        assert_eq!(simplified("(x ^ 2) ^ 3"), var("x").pow(Expr::Number(6.0)));
    }

    #[test]
    fn test_control_nodes() {
        assert_eq!(simplified("if(1 < 2, x + 0, y)"), var("x"));
        assert_eq!(
            simplified("max(x, 1 + 1)"),
            Expr::Call { kind: FunctionKind::Max, args: vec![var("x"), Expr::Number(2.0)] }
        );
    }

    #[test]
    fn test_input_is_untouched() {
        let expr = parse("x * 1 + 0").unwrap();
        let copy = expr.clone();
        let _ = simplify(&expr);
        assert_eq!(expr, copy);
    }
}
