//! # evaluator.rs
//!
//! Tree-walking evaluation of an [`Expr`] against an [`Environment`].
//!
//! Children are evaluated first, left to right, and their values combined by the
//! runtime value layer. The control nodes are the exception: conditions are
//! evaluated before each branch or iteration, and loop bodies run in the same
//! environment so assignments persist between iterations. A `for` loop runs in a
//! scope of its own, so a counter introduced by its initializer is dropped when the
//! loop ends and may reuse a registry name such as `i`. A failing node leaves every
//! assignment made before it in place.

use crate::analyzers::{derive, simplify};
use crate::ast::Expr;
use crate::environment::{Environment, UserFunction};
use crate::errors::ExecutionError;
use crate::value::{functions, matrix, unsupported_operand, Value};
use smallvec::SmallVec;

/// Evaluated call arguments; most calls take few of them.
type Args = SmallVec<[Value; 4]>;

fn evaluate_args(args: &[Expr], env: &mut Environment) -> Result<Args, ExecutionError> {
    args.iter().map(|arg| evaluate(arg, env)).collect()
}

/// Calls a user function, or a native one when no user function matches the arity.
fn call(name: &str, args: Args, env: &mut Environment) -> Result<Value, ExecutionError> {
    if let Some(function) = env.function(name, args.len()).cloned() {
        log::trace!("call '{}' with {} argument(s)", name, args.len());
        return env.scoped(|env| -> Result<Value, ExecutionError> {
            for (param, arg) in function.params.iter().zip(args) {
                env.define(param, arg)?;
            }
            evaluate(&function.body, env)
        });
    }

    match env.native(name, args.len()) {
        Some(native) => native.apply(&args),
        None => Err(ExecutionError::UndefinedFunction { name: name.to_string(), arity: args.len() }),
    }
}

/// Builds a vector from number elements, or a matrix when every element is a row vector.
fn vector_literal(elements: &[Expr], env: &mut Environment) -> Result<Value, ExecutionError> {
    let values = evaluate_args(elements, env)?;
    if !values.is_empty() && values.iter().all(|value| matches!(value, Value::Vector(_))) {
        let rows = values.into_iter()
            .filter_map(|value| match value {
                Value::Vector(row) => Some(row),
                _ => None,
            })
            .collect();
        return matrix::validate(rows).map(Value::Matrix);
    }
    values.into_iter()
        .map(|value| match value {
            Value::Number(n) => Ok(n),
            other => Err(unsupported_operand("vector literal", &other)),
        })
        .collect::<Result<_, _>>()
        .map(Value::Vector)
}

fn matrix_literal(rows: &[Expr], env: &mut Environment) -> Result<Value, ExecutionError> {
    let rows = rows.iter()
        .map(|row| match evaluate(row, env)? {
            Value::Vector(row) => Ok(row),
            other => Err(unsupported_operand("matrix literal", &other)),
        })
        .collect::<Result<_, _>>()?;
    matrix::validate(rows).map(Value::Matrix)
}

fn condition(cond: &Expr, env: &mut Environment, statement: &str) -> Result<bool, ExecutionError> {
    evaluate(cond, env)?.is_truthy(statement)
}

/// Evaluates `expr`.
///
/// # Arguments
/// * `expr` - tree to evaluate
/// * `env` - scopes, registry and settings; assignments and definitions are written into it
///
/// # Returns
/// * `Ok(Value)` - the result; definitions and loops yield [`Value::Empty`]
/// * `Err(ExecutionError)` - an operand kind is unsupported, a name is undefined or read-only
///
/// # Example
/// ```
/// use exprengine::{evaluate, parse, Environment, Value};
///
/// let mut env = Environment::default();
/// let expr = parse("x := 2 ^ 3 ^ 2").unwrap();
/// assert_eq!(evaluate(&expr, &mut env).unwrap(), Value::Number(512.0));
/// assert_eq!(env.lookup("x").unwrap(), &Value::Number(512.0));
/// ```
pub fn evaluate(expr: &Expr, env: &mut Environment) -> Result<Value, ExecutionError> {
    match expr {
        Expr::Number(n) => Ok(Value::Number(*n)),
        Expr::Boolean(b) => Ok(Value::Bool(*b)),
        Expr::Str(s) => Ok(Value::Str(s.clone())),
        Expr::Complex(z) => Ok(Value::complex(*z)),
        Expr::Quantity(q) => Ok(Value::Quantity(*q)),
        Expr::Variable(name) => Ok(env.lookup(name)?.clone()),
        Expr::Unary { kind, arg } => {
            let value = evaluate(arg, env)?;
            functions::apply_unary(*kind, &value, env.settings())
        },
        Expr::Binary { kind, left, right } => {
            let left = evaluate(left, env)?;
            let right = evaluate(right, env)?;
            left.apply_binary(*kind, &right, env.settings())
        },
        Expr::Call { kind, args } => {
            let args = evaluate_args(args, env)?;
            functions::apply_function(*kind, &args, env.settings())
        },
        Expr::UserCall { name, args } => {
            let args = evaluate_args(args, env)?;
            call(name, args, env)
        },
        Expr::Vector(elements) => vector_literal(elements, env),
        Expr::Matrix(rows) => matrix_literal(rows, env),
        Expr::If { cond, then, otherwise } => {
            if condition(cond, env, "if")? {
                evaluate(then, env)
            } else {
                otherwise.as_ref().map_or(Ok(Value::Empty), |otherwise| evaluate(otherwise, env))
            }
        },
        Expr::For { body, init, cond, step } => env.scoped(|env| -> Result<Value, ExecutionError> {
            evaluate(init, env)?;
            while condition(cond, env, "for")? {
                evaluate(body, env)?;
                evaluate(step, env)?;
            }
            Ok(Value::Empty)
        }),
        Expr::While { body, cond } => {
            while condition(cond, env, "while")? {
                evaluate(body, env)?;
            }
            Ok(Value::Empty)
        },
        Expr::Assign { kind, target, value } => {
            let value = evaluate(value, env)?;
            let result = match kind.operation() {
                Some(operation) => env.lookup(target)?.apply_binary(operation, &value, env.settings())?,
                None => value,
            };
            env.assign(target, result.clone())?;
            Ok(result)
        },
        // yields the stepped value
        Expr::Step { kind, target } => {
            let result = env.lookup(target)?.add(&Value::Number(kind.delta()))?;
            env.assign(target, result.clone())?;
            Ok(result)
        },
        Expr::Define { name, value } => {
            let value = evaluate(value, env)?;
            env.define(name, value)?;
            Ok(Value::Empty)
        },
        Expr::DefineFunction { name, params, body } => {
            env.define_function(UserFunction {
                name: name.clone(),
                params: params.clone(),
                body: (**body).clone(),
            });
            Ok(Value::Empty)
        },
        Expr::Undefine { name, arity: None } => {
            env.remove(name)?;
            Ok(Value::Empty)
        },
        Expr::Undefine { name, arity: Some(arity) } => {
            env.remove_function(name, *arity)?;
            Ok(Value::Empty)
        },
        Expr::Derivative { expr, var, point } => {
            let derivative = simplify(&derive(expr, var)?);
            match point {
                None => Ok(Value::Expression(Box::new(derivative))),
                Some(point) => {
                    let at = evaluate(point, env)?;
                    env.scoped(|env| -> Result<Value, ExecutionError> {
                        env.define(var, at)?;
                        evaluate(&derivative, env)
                    })
                },
            }
        },
        Expr::Simplify(expr) => Ok(Value::Expression(Box::new(simplify(expr)))),
    }
}

#[cfg(test)]
mod evaluator_tests {
    use super::*;
    use crate::errors::ParameterError;
    use crate::parser::parse;
    use crate::settings::{AngleMode, Settings};
    use crate::units::{Quantity, Unit};
    use approx::assert_abs_diff_eq;

    fn run(text: &str, env: &mut Environment) -> Result<Value, ExecutionError> {
        evaluate(&parse(text).unwrap(), env)
    }

    fn number(text: &str) -> f64 {
        let mut env = Environment::default();
        run(text, &mut env).unwrap().as_number().unwrap()
    }

    #[test]
    fn test_precedence_chains() {
        assert_eq!(number("2+3*4"), 14.0);
        assert_eq!(number("(2+3)*4"), 20.0);
        assert_eq!(number("2^3^2"), 512.0);
        assert_eq!(number("-2^2"), -4.0);
        assert_eq!(number("10 - 4 - 3"), 3.0);
    }

    #[test]
    fn test_number_literals() {
        assert_eq!(number("0xFF"), 255.0);
        assert_eq!(number("0b101"), 5.0);
        assert_eq!(number("017"), 15.0);
        assert_eq!(number("1.5e3"), 1500.0);
    }

    #[test]
    fn test_exact_trigonometry() {
        let mut env = Environment::default().with_settings(Settings::default().with_angle_mode(AngleMode::Degree));
        assert_eq!(run("sin(30)", &mut env), Ok(Value::Number(0.5)));
        let mut env = Environment::default();
        assert_eq!(run("sin(30°)", &mut env), Ok(Value::Number(0.5)));
        assert_abs_diff_eq!(number("cos(1)"), 1.0_f64.cos(), epsilon = 1.0e-12);
    }

    #[test]
    fn test_assignment_and_steps() {
        let mut env = Environment::default();
        assert_eq!(run("x := 2", &mut env), Ok(Value::Number(2.0)));
        assert_eq!(run("x += 3", &mut env), Ok(Value::Number(5.0)));
        assert_eq!(run("x++", &mut env), Ok(Value::Number(6.0)));
        assert_eq!(run("x--", &mut env), Ok(Value::Number(5.0)));
        assert_eq!(env.lookup("x"), Ok(&Value::Number(5.0)));
    }

    #[test]
    fn test_parameter_errors() {
        let mut env = Environment::default();
        assert_eq!(
            run("pi := 3", &mut env),
            Err(ExecutionError::Parameter(ParameterError::ReadOnly("pi".into())))
        );
        assert_eq!(
            run("y + 1", &mut env),
            Err(ExecutionError::Parameter(ParameterError::Undefined("y".into())))
        );
    }

    #[test]
    fn test_failure_keeps_earlier_assignments() {
        let mut env = Environment::default();
        assert!(run("(x := 5) && {1, 2}", &mut env).is_err());
        assert_eq!(env.lookup("x"), Ok(&Value::Number(5.0)));
    }

    #[test]
    fn test_unsupported_operands() {
        let mut env = Environment::default();
        assert!(matches!(
            run("true xor {1, 2}", &mut env),
            Err(ExecutionError::UnsupportedOperands { right: "vector", .. })
        ));
        assert_eq!(
            run("{true, 1}", &mut env),
            Err(ExecutionError::UnsupportedOperand { operation: "vector literal".into(), kind: "boolean" })
        );
    }

    #[test]
    fn test_conditionals() {
        let mut env = Environment::default();
        assert_eq!(run("if(1 < 2, 3, 4)", &mut env), Ok(Value::Number(3.0)));
        assert_eq!(run("if(1 > 2, 3)", &mut env), Ok(Value::Empty));
        assert_eq!(run("1 > 2 ? 3 : 4", &mut env), Ok(Value::Number(4.0)));
    }

    #[test]
    fn test_loops_share_the_environment() {
        let mut env = Environment::default();
        run("s := 0", &mut env).unwrap();
        assert_eq!(run("for(s += j, j := 0, j < 4, j++)", &mut env), Ok(Value::Empty));
        assert_eq!(env.lookup("s"), Ok(&Value::Number(6.0)));
        assert!(env.lookup("j").is_err());

        run("n := 1", &mut env).unwrap();
        assert_eq!(run("while(n := n * 2, n < 100)", &mut env), Ok(Value::Empty));
        assert_eq!(env.lookup("n"), Ok(&Value::Number(128.0)));
    }

    #[test]
    fn test_user_functions() {
        let mut env = Environment::default();
        assert_eq!(run("f(x, y) := x * y", &mut env), Ok(Value::Empty));
        assert_eq!(run("f(3, 4)", &mut env), Ok(Value::Number(12.0)));
        // arguments live in the call scope only
        assert!(env.lookup("x").is_err());

        run("def(g(x), f(x, x) + 1)", &mut env).unwrap();
        assert_eq!(run("g(3)", &mut env), Ok(Value::Number(10.0)));

        run("undef(f(a, b))", &mut env).unwrap();
        assert_eq!(
            run("f(3, 4)", &mut env),
            Err(ExecutionError::UndefinedFunction { name: "f".into(), arity: 2 })
        );
    }

    #[test]
    fn test_call_scope_hides_globals() {
        let mut env = Environment::default();
        run("x := 10", &mut env).unwrap();
        run("double(x) := x * 2", &mut env).unwrap();
        assert_eq!(run("double(3)", &mut env), Ok(Value::Number(6.0)));
        assert_eq!(env.lookup("x"), Ok(&Value::Number(10.0)));
    }

    #[test]
    fn test_nested_scopes_shadow_registry_names() {
        let mut env = Environment::default();
        run("f(r) := r^2", &mut env).unwrap();
        assert_eq!(run("f(3)", &mut env), Ok(Value::Number(9.0)));
        assert_eq!(run("deriv(k^2, k, 3)", &mut env), Ok(Value::Number(6.0)));

        run("s := 0", &mut env).unwrap();
        assert_eq!(run("for(s := s + i, i := 0, i < 3, i++)", &mut env), Ok(Value::Empty));
        assert_eq!(env.lookup("s"), Ok(&Value::Number(3.0)));
        assert_eq!(env.lookup("i").ok(), env.registry().constant("i"));

        // the global scope still protects them
        assert_eq!(
            run("r := 1", &mut env),
            Err(ExecutionError::Parameter(ParameterError::ReadOnly("r".into())))
        );
    }

    #[test]
    fn test_native_functions() {
        assert_eq!(number("hypot(3, 4)"), 5.0);
        assert_eq!(number("clamp(7, 0, 5)"), 5.0);
    }

    #[test]
    fn test_define_and_undefine() {
        let mut env = Environment::default();
        assert_eq!(run("def(a, 4)", &mut env), Ok(Value::Empty));
        assert_eq!(run("a * 2", &mut env), Ok(Value::Number(8.0)));
        run("undef(a)", &mut env).unwrap();
        assert!(run("a", &mut env).is_err());
    }

    #[test]
    fn test_linear_algebra() {
        let mut env = Environment::default();
        assert_eq!(run("{1, 2} + {3, 4}", &mut env), Ok(Value::Vector(vec![4.0, 6.0])));
        assert_eq!(run("det({{1, 2}, {3, 4}})", &mut env), Ok(Value::Number(-2.0)));

        // a vector of row vectors stacks into the same matrix as the literal
        run("u := {1, 2}", &mut env).unwrap();
        run("w := {3, 4}", &mut env).unwrap();
        assert_eq!(run("{u, w}", &mut env), run("{{1, 2}, {3, 4}}", &mut env));
        assert!(run("{u, 1}", &mut env).is_err());
        assert_eq!(
            run("{{1, 2}, {3}}", &mut env),
            Err(ExecutionError::DimensionMismatch { operation: "matrix literal".into() })
        );
    }

    #[test]
    fn test_units() {
        let mut env = Environment::default();
        let km = Unit::from_name("km").unwrap();
        assert_eq!(run("2 km + 500 m", &mut env), Ok(Value::Quantity(Quantity::new(2.5, km))));
    }

    #[test]
    fn test_derivatives() {
        let mut env = Environment::default();
        assert_eq!(run("deriv(x^2, x, 5)", &mut env), Ok(Value::Number(10.0)));
        assert_eq!(
            run("deriv(x^2, x)", &mut env),
            Ok(Value::Expression(Box::new(Expr::Number(2.0).mul(Expr::variable("x")))))
        );
        // the evaluation point does not leak
        assert!(env.lookup("x").is_err());
        assert!(matches!(run("deriv(x && y, x)", &mut env), Err(ExecutionError::Analyzer(_))));
    }

    #[test]
    fn test_simplify_call() {
        let mut env = Environment::default();
        assert_eq!(
            run("simplify(x + 0 + 2 * 3)", &mut env),
            Ok(Value::Expression(Box::new(Expr::variable("x").add(Expr::Number(6.0)))))
        );
    }
}
