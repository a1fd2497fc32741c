//! benches.rs
use criterion::{criterion_group, criterion_main, Criterion};
use exprengine::{derive, evaluate, parse, simplify, Environment, Processor, Value};
use paste::paste;

fn environment_with(names: &[(&str, f64)]) -> Environment {
    let mut env = Environment::default();
    for (name, value) in names {
        env.define(name, Value::Number(*value)).unwrap();
    }
    env
}

fn bench_analyze_liner(c: &mut Criterion) {
    let make_much_operand = |n: usize| (0..=n).map(|_| "x").collect::<Vec<_>>().join("+");
    for n in [1, 10, 100, 1000] {
        let formula = make_much_operand(n);
        c.bench_function(&format!("parse {} operands", n), |b| {
            b.iter(|| { let _ = parse(&formula); })
        });

        let expr = parse(&formula).unwrap();
        let mut env = environment_with(&[("x", 1.0)]);
        c.bench_function(&format!("eval {} operands", n), |b| {
            b.iter(|| evaluate(&expr, &mut env))
        });
    }
}

fn bench_analyze_nested(c: &mut Criterion) {
    let make_much_nested = |n: usize| {
        let mut formula = "x".to_string();
        for _ in 0..n {
            formula = format!("sin({})", formula);
        }
        formula
    };
    for n in [1, 10, 100] {
        let formula = make_much_nested(n);
        c.bench_function(&format!("parse {} nested", n), |b| {
            b.iter(|| { let _ = parse(&formula); })
        });

        let expr = parse(&formula).unwrap();
        let mut env = environment_with(&[("x", 1.0)]);
        c.bench_function(&format!("eval {} nested", n), |b| {
            b.iter(|| evaluate(&expr, &mut env))
        });
    }
}

fn bench_analyze_literal(c: &mut Criterion) {
    let formulas = ["1234567890", "0xDEADBEEF", "0b1011011101", "01234567", "6.02214076e23"];
    for formula in formulas {
        c.bench_function(&format!("parse literal {}", formula), |b| {
            b.iter(|| { let _ = parse(formula); })
        });
    }
}

fn bench_analyze_paren(c: &mut Criterion) {
    let names: Vec<(&str, f64)> = ["a", "b", "cc", "d", "ee", "f"].into_iter().map(|name| (name, 1.0)).collect();

    for formula in ["(a+b)*(cc-d)/(ee+f)", "a+b*cc-d/ee+f"] {
        c.bench_function(&format!("parse '{}'", formula), |b| {
            b.iter(|| { let _ = parse(formula); })
        });

        let expr = parse(formula).unwrap();
        let mut env = environment_with(&names);
        c.bench_function(&format!("eval '{}'", formula), |b| {
            b.iter(|| evaluate(&expr, &mut env))
        });
    }
}

fn bench_analyze_many_vars(c: &mut Criterion) {
    let var_names: Vec<String> = (1..=100).map(|i| format!("a{}", i)).collect();
    let names: Vec<(&str, f64)> = var_names.iter().map(|name| (name.as_str(), 1.0)).collect();

    // a1 + a2 + ... + a100
    let formula = var_names.join(" + ");
    let expr = parse(&formula).unwrap();
    let mut env = environment_with(&names);
    c.bench_function("eval many vars (100)", |b| {
        b.iter(|| evaluate(&expr, &mut env))
    });
}

fn bench_analyze_diff(c: &mut Criterion) {
    let formulas = [
        "x^2",
        "sin(x)",
        "exp(x^2+3*x+1)",
        "sin(cos(x))",
        "x^10 + x^5 + x^2",
    ];

    for formula in &formulas {
        let expr = parse(formula).unwrap();
        c.bench_function(&format!("derive '{}'", formula), |b| {
            b.iter(|| derive(&expr, "x").map(|d| simplify(&d)))
        });

        let derivative = simplify(&derive(&expr, "x").unwrap());
        let mut env = environment_with(&[("x", 0.7)]);
        c.bench_function(&format!("eval derivative of '{}'", formula), |b| {
            b.iter(|| evaluate(&derivative, &mut env))
        });
    }
}

fn bench_analyze_invalid(c: &mut Criterion) {
    let invalid_formulas = [
        "unknown_func(x",       // forget ')'
        "1 + (2 * 3",           // forget ')'
        "x ** 2",               // '*' without operand
        "1 + @",                // unknown symbol '@'
    ];

    for formula in &invalid_formulas {
        c.bench_function(&format!("parse invalid: {}", formula), |b| {
            b.iter(|| { let _ = parse(formula); })
        });
    }
}

criterion_group!(bench_analyze,
    bench_analyze_liner,
    bench_analyze_nested,
    bench_analyze_literal,
    bench_analyze_paren,
    bench_analyze_many_vars,
    bench_analyze_diff,
    bench_analyze_invalid,
);

fn bench_practical_polynomial(c: &mut Criterion) {
    let formula = "a0 + a1*x + a2*x^2 + a3*x^3 + a4*x^4";
    let expr = parse(formula).unwrap();
    let mut env = environment_with(&[("a0", 1.0), ("a1", -2.0), ("a2", 5.25), ("a3", -0.03), ("a4", 1.0), ("x", 2.4)]);
    c.bench_function(&format!("eval polynomial '{}'", formula), |b| {
        b.iter(|| evaluate(&expr, &mut env))
    });
}

fn bench_practical_loop(c: &mut Criterion) {
    let formula = "for(s += j^2, j := 0, j < 100, j++)";
    c.bench_function(&format!("solve loop '{}'", formula), |b| {
        b.iter(|| {
            let mut processor = Processor::new();
            processor.solve("s := 0").unwrap();
            processor.solve(formula)
        })
    });
}

fn bench_practical_units(c: &mut Criterion) {
    let formula = "convert(3 mi + 200 m, 'km') * 2";
    c.bench_function(&format!("solve units '{}'", formula), |b| {
        b.iter(|| Processor::new().solve(formula))
    });
}

criterion_group!(bench_practical,
    bench_practical_polynomial,
    bench_practical_loop,
    bench_practical_units,
);

macro_rules! compares_one_arity_functions {
    ($( $variant: ident ),* $(,)? ) => {
        paste! {
            $(
                pub fn [<bench_compares_ $variant>](c: &mut Criterion) {
                    let x = 0.5_f64;

                    c.bench_function(concat!("direct ", stringify!($variant), "(x)"), |b| {
                        b.iter(|| x.$variant())
                    });

                    let expr = parse(concat!(stringify!($variant), "(x)")).unwrap();
                    let mut env = environment_with(&[("x", x)]);
                    c.bench_function(concat!("evaluated \"", stringify!($variant), "(x)\""), |b| {
                        b.iter(|| evaluate(&expr, &mut env))
                    });
                }
            )*
        }
    };
}

compares_one_arity_functions! {
    sin,    cos,    tan,
    asin,   acos,   atan,
    sinh,   cosh,   tanh,
    asinh,  acosh,  atanh,
    exp,    ln,     cbrt,
    sqrt,   abs,    floor,
}

pub fn bench_compares_pow(c: &mut Criterion) {
    let x = 1.5_f64;
    let y = 2.5_f64;

    c.bench_function("direct x.powf(y)", |b| {
        b.iter(|| x.powf(y))
    });

    let expr = parse("x ^ y").unwrap();
    let mut env = environment_with(&[("x", x), ("y", y)]);
    c.bench_function(r#"evaluated "x ^ y""#, |b| {
        b.iter(|| evaluate(&expr, &mut env))
    });
}

criterion_group!(bench_compare,
    bench_compares_sin,     bench_compares_cos,     bench_compares_tan,
    bench_compares_asin,    bench_compares_acos,    bench_compares_atan,
    bench_compares_sinh,    bench_compares_cosh,    bench_compares_tanh,
    bench_compares_asinh,   bench_compares_acosh,   bench_compares_atanh,
    bench_compares_exp,     bench_compares_ln,      bench_compares_cbrt,
    bench_compares_sqrt,    bench_compares_abs,     bench_compares_floor,

    bench_compares_pow,
);

criterion_main!{
    bench_analyze,
    bench_practical,
    bench_compare,
}
