//! # ast.rs
//!
//! The node model of the expression language.
//!
//! An [`Expr`] is a closed tagged union grouped by shape:
//! - leaves: numbers, booleans, strings, complex and unit-tagged constants, variables
//! - unary nodes: sign, logical not, and every one-argument built-in function
//! - binary nodes: arithmetic, comparison, logical and bitwise operators
//! - variadic nodes: built-in and user function calls, vector and matrix literals
//! - control nodes: conditionals, loops, assignments and definitions
//!
//! Each node exclusively owns its children and is never mutated in place;
//! analyzers build new trees instead.
//!
//! The operator and function kinds are declared once in table macros, which generate
//! the enums together with their spelling, precedence and real-valued application.

use crate::units::Quantity;
use num_complex::Complex;
use phf::Map;
use phf_macros::phf_map;

/// Precedence of assignment operators, the lowest of all.
pub const ASSIGNMENT_PRECEDENCE: u8 = 1;

/// Precedence of the ternary `?:` operator.
pub const TERNARY_PRECEDENCE: u8 = 2;

/// Precedence of prefix operators: above `*` and below `^`, so that `-2^2` is `-(2^2)`.
pub const PREFIX_PRECEDENCE: u8 = 12;

/// How a unary kind is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notation {
    /// `-x`
    Prefix,
    /// `sin(x)`
    Function,
}

/// Rounds `x` to an `i64` when it holds an integer value.
pub(crate) fn as_integer(x: f64) -> Option<i64> {
    if x.fract() == 0.0 && x.abs() < i64::MAX as f64 {
        num_traits::ToPrimitive::to_i64(&x)
    } else {
        None
    }
}

/// Factorial of a non-negative integer, `NaN` otherwise.
pub(crate) fn factorial(x: f64) -> f64 {
    match as_integer(x) {
        // 171! already overflows an f64
        Some(n) if n > 170 => f64::INFINITY,
        Some(n) if n >= 0 => (1..=n).fold(1.0, |acc, k| acc * k as f64),
        _ => f64::NAN,
    }
}

#[doc(hidden)]
/// Internal macro to define all unary kinds.
///
/// This macro is **not intended for public use**.
/// It centralizes the enum variants, canonical name, notation and the real-valued
/// application used when the operand is a plain number. `apply` returns `None` for
/// kinds that have no meaning on a plain number.
/// Circular trigonometric kinds apply in radians; the evaluator converts their
/// argument according to the angle mode before calling them.
macro_rules! unary_kinds {
    ($( $variant:ident => { name: $name:expr, notation: $notation:ident, apply: $apply:expr } ),* $(,)?) => {
        /// Represents a node kind with exactly one child.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum UnaryKind {
            $( $variant ),*
        }

        impl UnaryKind {
            /// Returns the canonical spelling.
            pub fn name(&self) -> &'static str {
                match self {
                    $( Self::$variant => $name, )*
                }
            }

            /// Returns how the kind is written.
            pub fn notation(&self) -> Notation {
                match self {
                    $( Self::$variant => Notation::$notation, )*
                }
            }

            /// Applies the kind to a real number.
            pub fn apply(&self, x: f64) -> Option<f64> {
                match self {
                    $( Self::$variant => $apply(x), )*
                }
            }

            /// Returns a list of all canonical spellings.
            pub fn names() -> Vec<&'static str> {
                vec![$($name),*]
            }
        }

        impl std::fmt::Display for UnaryKind {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.name())
            }
        }
    };
}

unary_kinds! {
    Negate      => { name: "-",          notation: Prefix,   apply: |x: f64| Some(-x) },
    Plus        => { name: "+",          notation: Prefix,   apply: |x: f64| Some(x) },
    Not         => { name: "not",        notation: Prefix,   apply: |x: f64| as_integer(x).map(|i| !i as f64) },
    Factorial   => { name: "fact",       notation: Function, apply: |x: f64| Some(factorial(x)) },
    Abs         => { name: "abs",        notation: Function, apply: |x: f64| Some(x.abs()) },
    Sqrt        => { name: "sqrt",       notation: Function, apply: |x: f64| Some(x.sqrt()) },
    Cbrt        => { name: "cbrt",       notation: Function, apply: |x: f64| Some(x.cbrt()) },
    Exp         => { name: "exp",        notation: Function, apply: |x: f64| Some(x.exp()) },
    Ln          => { name: "ln",         notation: Function, apply: |x: f64| Some(x.ln()) },
    Lg          => { name: "lg",         notation: Function, apply: |x: f64| Some(x.log10()) },
    Lb          => { name: "lb",         notation: Function, apply: |x: f64| Some(x.log2()) },
    Sin         => { name: "sin",        notation: Function, apply: |x: f64| Some(x.sin()) },
    Cos         => { name: "cos",        notation: Function, apply: |x: f64| Some(x.cos()) },
    Tan         => { name: "tan",        notation: Function, apply: |x: f64| Some(x.tan()) },
    Cot         => { name: "cot",        notation: Function, apply: |x: f64| Some(1.0 / x.tan()) },
    Sec         => { name: "sec",        notation: Function, apply: |x: f64| Some(1.0 / x.cos()) },
    Csc         => { name: "csc",        notation: Function, apply: |x: f64| Some(1.0 / x.sin()) },
    Asin        => { name: "asin",       notation: Function, apply: |x: f64| Some(x.asin()) },
    Acos        => { name: "acos",       notation: Function, apply: |x: f64| Some(x.acos()) },
    Atan        => { name: "atan",       notation: Function, apply: |x: f64| Some(x.atan()) },
    Acot        => { name: "acot",       notation: Function, apply: |x: f64| Some((1.0 / x).atan()) },
    Asec        => { name: "asec",       notation: Function, apply: |x: f64| Some((1.0 / x).acos()) },
    Acsc        => { name: "acsc",       notation: Function, apply: |x: f64| Some((1.0 / x).asin()) },
    Sinh        => { name: "sinh",       notation: Function, apply: |x: f64| Some(x.sinh()) },
    Cosh        => { name: "cosh",       notation: Function, apply: |x: f64| Some(x.cosh()) },
    Tanh        => { name: "tanh",       notation: Function, apply: |x: f64| Some(x.tanh()) },
    Coth        => { name: "coth",       notation: Function, apply: |x: f64| Some(1.0 / x.tanh()) },
    Sech        => { name: "sech",       notation: Function, apply: |x: f64| Some(1.0 / x.cosh()) },
    Csch        => { name: "csch",       notation: Function, apply: |x: f64| Some(1.0 / x.sinh()) },
    Asinh       => { name: "asinh",      notation: Function, apply: |x: f64| Some(x.asinh()) },
    Acosh       => { name: "acosh",      notation: Function, apply: |x: f64| Some(x.acosh()) },
    Atanh       => { name: "atanh",      notation: Function, apply: |x: f64| Some(x.atanh()) },
    Acoth       => { name: "acoth",      notation: Function, apply: |x: f64| Some((1.0 / x).atanh()) },
    Asech       => { name: "asech",      notation: Function, apply: |x: f64| Some((1.0 / x).acosh()) },
    Acsch       => { name: "acsch",      notation: Function, apply: |x: f64| Some((1.0 / x).asinh()) },
    Floor       => { name: "floor",      notation: Function, apply: |x: f64| Some(x.floor()) },
    Ceil        => { name: "ceil",       notation: Function, apply: |x: f64| Some(x.ceil()) },
    Trunc       => { name: "trunc",      notation: Function, apply: |x: f64| Some(x.trunc()) },
    Frac        => { name: "frac",       notation: Function, apply: |x: f64| Some(x.fract()) },
    Sign        => { name: "sign",       notation: Function, apply: |x: f64| Some(if x == 0.0 { 0.0 } else { x.signum() }) },
    ToDegree    => { name: "todeg",      notation: Function, apply: |_: f64| None },
    ToRadian    => { name: "torad",      notation: Function, apply: |_: f64| None },
    ToGradian   => { name: "tograd",     notation: Function, apply: |_: f64| None },
    ToNumber    => { name: "tonumber",   notation: Function, apply: |x: f64| Some(x) },
    Re          => { name: "re",         notation: Function, apply: |x: f64| Some(x) },
    Im          => { name: "im",         notation: Function, apply: |_: f64| Some(0.0) },
    Conjugate   => { name: "conjugate",  notation: Function, apply: |x: f64| Some(x) },
    Phase       => { name: "phase",      notation: Function, apply: |x: f64| Some(0.0_f64.atan2(x)) },
    Reciprocal  => { name: "reciprocal", notation: Function, apply: |x: f64| Some(1.0 / x) },
    Transpose   => { name: "transpose",  notation: Function, apply: |x: f64| Some(x) },
    Determinant => { name: "det",        notation: Function, apply: |x: f64| Some(x) },
    Inverse     => { name: "inverse",    notation: Function, apply: |x: f64| Some(1.0 / x) },
}

impl UnaryKind {
    /// Returns `true` for the circular functions whose argument is an angle.
    pub fn is_circular(&self) -> bool {
        matches!(self, Self::Sin | Self::Cos | Self::Tan | Self::Cot | Self::Sec | Self::Csc)
    }

    /// Returns `true` for the inverse circular functions whose result is an angle.
    pub fn is_inverse_circular(&self) -> bool {
        matches!(self, Self::Asin | Self::Acos | Self::Atan | Self::Acot | Self::Asec | Self::Acsc)
    }
}

/// The number of arguments a fixed-shape call accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    Between(usize, usize),
    AtLeast(usize),
}

impl Arity {
    /// Returns `true` if a call with `n` arguments is accepted.
    pub fn accepts(&self, n: usize) -> bool {
        match *self {
            Self::Exact(k) => n == k,
            Self::Between(lo, hi) => (lo..=hi).contains(&n),
            Self::AtLeast(k) => n >= k,
        }
    }
}

impl std::fmt::Display for Arity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact(k) => write!(f, "{}", k),
            Self::Between(lo, hi) => write!(f, "{} to {}", lo, hi),
            Self::AtLeast(k) => write!(f, "at least {}", k),
        }
    }
}

#[doc(hidden)]
/// Internal macro to define the built-in functions taking more than one argument.
///
/// This macro is **not intended for public use**.
macro_rules! functions {
    ($( $variant:ident => { name: $name:expr, arity: $arity:expr } ),* $(,)?) => {
        /// Built-in functions taking a fixed or variable number of arguments.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum FunctionKind {
            $( $variant ),*
        }

        impl FunctionKind {
            /// Returns the canonical spelling.
            pub fn name(&self) -> &'static str {
                match self {
                    $( Self::$variant => $name, )*
                }
            }

            /// Returns the accepted number of arguments.
            pub fn arity(&self) -> Arity {
                match self {
                    $( Self::$variant => $arity, )*
                }
            }

            /// Returns a list of all function names.
            pub fn names() -> Vec<&'static str> {
                vec![$($name),*]
            }
        }

        impl std::fmt::Display for FunctionKind {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.name())
            }
        }
    };
}

functions! {
    Log             => { name: "log",           arity: Arity::Exact(2) },
    Root            => { name: "root",          arity: Arity::Exact(2) },
    Convert         => { name: "convert",       arity: Arity::Exact(2) },
    DotProduct      => { name: "dotproduct",    arity: Arity::Exact(2) },
    CrossProduct    => { name: "crossproduct",  arity: Arity::Exact(2) },
    Round           => { name: "round",         arity: Arity::Between(1, 2) },
    Gcd             => { name: "gcd",           arity: Arity::AtLeast(2) },
    Lcm             => { name: "lcm",           arity: Arity::AtLeast(2) },
    Min             => { name: "min",           arity: Arity::AtLeast(1) },
    Max             => { name: "max",           arity: Arity::AtLeast(1) },
    Avg             => { name: "avg",           arity: Arity::AtLeast(1) },
    Sum             => { name: "sum",           arity: Arity::AtLeast(1) },
    Product         => { name: "product",       arity: Arity::AtLeast(1) },
    Count           => { name: "count",         arity: Arity::AtLeast(1) },
    Var             => { name: "var",           arity: Arity::AtLeast(1) },
    Varp            => { name: "varp",          arity: Arity::AtLeast(1) },
    Stdev           => { name: "stdev",         arity: Arity::AtLeast(1) },
    Stdevp          => { name: "stdevp",        arity: Arity::AtLeast(1) },
}

/// Information about a binary operator.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryOperatorInfo {
    /// Operator precedence (higher value means higher precedence).
    pub precedence: u8,

    /// Whether the operator is left-associative.
    pub is_left_assoc: bool,
}

#[doc(hidden)]
/// Internal macro to define all binary operators.
///
/// This macro is **not intended for public use**.
/// It centralizes the enum variants, canonical spelling, precedence and associativity.
macro_rules! binary_kinds {
    ($( $variant:ident => { symbol: $symbol:expr, precedence: $prec:expr, left_assoc: $assoc:expr } ),* $(,)?) => {
        /// Represents a node kind with exactly two children.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum BinaryKind {
            $( $variant ),*
        }

        impl BinaryKind {
            /// Returns operator precedence and associativity.
            pub fn info(&self) -> BinaryOperatorInfo {
                match self {
                    $( Self::$variant => BinaryOperatorInfo { precedence: $prec, is_left_assoc: $assoc }, )*
                }
            }

            /// Returns the canonical spelling.
            pub fn symbol(&self) -> &'static str {
                match self {
                    $( Self::$variant => $symbol, )*
                }
            }

            /// Returns a list of all canonical spellings.
            pub fn names() -> Vec<&'static str> {
                vec![$($symbol),*]
            }
        }

        impl std::fmt::Display for BinaryKind {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.symbol())
            }
        }
    };
}

binary_kinds! {
    LogicalOr       => { symbol: "||",   precedence: 3,  left_assoc: true },
    LogicalAnd      => { symbol: "&&",   precedence: 4,  left_assoc: true },
    Implies         => { symbol: "->",   precedence: 5,  left_assoc: true },
    Equivalent      => { symbol: "<->",  precedence: 5,  left_assoc: true },
    Or              => { symbol: "|",    precedence: 6,  left_assoc: true },
    Nor             => { symbol: "nor",  precedence: 6,  left_assoc: true },
    Xor             => { symbol: "xor",  precedence: 6,  left_assoc: true },
    And             => { symbol: "&",    precedence: 7,  left_assoc: true },
    Nand            => { symbol: "nand", precedence: 7,  left_assoc: true },
    Equal           => { symbol: "==",   precedence: 8,  left_assoc: true },
    NotEqual        => { symbol: "!=",   precedence: 8,  left_assoc: true },
    Less            => { symbol: "<",    precedence: 8,  left_assoc: true },
    LessEqual       => { symbol: "<=",   precedence: 8,  left_assoc: true },
    Greater         => { symbol: ">",    precedence: 8,  left_assoc: true },
    GreaterEqual    => { symbol: ">=",   precedence: 8,  left_assoc: true },
    ShiftLeft       => { symbol: "<<",   precedence: 9,  left_assoc: true },
    ShiftRight      => { symbol: ">>",   precedence: 9,  left_assoc: true },
    Add             => { symbol: "+",    precedence: 10, left_assoc: true },
    Sub             => { symbol: "-",    precedence: 10, left_assoc: true },
    Mul             => { symbol: "*",    precedence: 11, left_assoc: true },
    Div             => { symbol: "/",    precedence: 11, left_assoc: true },
    Mod             => { symbol: "%",    precedence: 11, left_assoc: true },
    Pow             => { symbol: "^",    precedence: 13, left_assoc: false },
    Polar           => { symbol: "∠",    precedence: 14, left_assoc: true },
}

impl BinaryKind {
    /// Applies an arithmetic operator to two real numbers.
    ///
    /// Returns `None` for operators that are not plain arithmetic.
    pub fn apply_arithmetic(&self, l: f64, r: f64) -> Option<f64> {
        match self {
            Self::Add => Some(l + r),
            Self::Sub => Some(l - r),
            Self::Mul => Some(l * r),
            Self::Div => Some(l / r),
            Self::Mod => Some(l % r),
            Self::Pow => Some(l.powf(r)),
            _ => None,
        }
    }
}

#[doc(hidden)]
/// Internal macro to define the assignment operators.
macro_rules! assign_kinds {
    ($( $variant:ident => { symbol: $symbol:expr, operation: $operation:expr } ),* $(,)?) => {
        /// Assignment operators; compound ones combine the old value first.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum AssignKind {
            $( $variant ),*
        }

        impl AssignKind {
            pub fn symbol(&self) -> &'static str {
                match self {
                    $( Self::$variant => $symbol, )*
                }
            }

            /// Returns the operator combining the old and the assigned value, if any.
            pub fn operation(&self) -> Option<BinaryKind> {
                match self {
                    $( Self::$variant => $operation, )*
                }
            }
        }

        impl std::fmt::Display for AssignKind {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.symbol())
            }
        }
    };
}

assign_kinds! {
    Set     => { symbol: ":=",  operation: None },
    AddSet  => { symbol: "+=",  operation: Some(BinaryKind::Add) },
    SubSet  => { symbol: "-=",  operation: Some(BinaryKind::Sub) },
    MulSet  => { symbol: "*=",  operation: Some(BinaryKind::Mul) },
    DivSet  => { symbol: "/=",  operation: Some(BinaryKind::Div) },
    ShlSet  => { symbol: "<<=", operation: Some(BinaryKind::ShiftLeft) },
    ShrSet  => { symbol: ">>=", operation: Some(BinaryKind::ShiftRight) },
}

/// `x++` or `x--`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    Increment,
    Decrement,
}

impl StepKind {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Increment => "++",
            Self::Decrement => "--",
        }
    }

    pub fn delta(&self) -> f64 {
        match self {
            Self::Increment => 1.0,
            Self::Decrement => -1.0,
        }
    }
}

/// Anything callable by name with a bracketed argument list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Unary(UnaryKind),
    Function(FunctionKind),
    /// `deriv(expr, var[, point])`
    Derivative,
    /// `simplify(expr)`
    Simplify,
}

/// Map of built-in function spellings, aliases included.
static BUILTINS: Map<&'static str, Builtin> = phf_map! {
    "neg"           => Builtin::Unary(UnaryKind::Negate),
    "fact"          => Builtin::Unary(UnaryKind::Factorial),
    "factorial"     => Builtin::Unary(UnaryKind::Factorial),
    "abs"           => Builtin::Unary(UnaryKind::Abs),
    "sqrt"          => Builtin::Unary(UnaryKind::Sqrt),
    "cbrt"          => Builtin::Unary(UnaryKind::Cbrt),
    "exp"           => Builtin::Unary(UnaryKind::Exp),
    "ln"            => Builtin::Unary(UnaryKind::Ln),
    "lg"            => Builtin::Unary(UnaryKind::Lg),
    "lb"            => Builtin::Unary(UnaryKind::Lb),
    "sin"           => Builtin::Unary(UnaryKind::Sin),
    "cos"           => Builtin::Unary(UnaryKind::Cos),
    "tan"           => Builtin::Unary(UnaryKind::Tan),
    "cot"           => Builtin::Unary(UnaryKind::Cot),
    "sec"           => Builtin::Unary(UnaryKind::Sec),
    "csc"           => Builtin::Unary(UnaryKind::Csc),
    "asin"          => Builtin::Unary(UnaryKind::Asin),
    "arcsin"        => Builtin::Unary(UnaryKind::Asin),
    "acos"          => Builtin::Unary(UnaryKind::Acos),
    "arccos"        => Builtin::Unary(UnaryKind::Acos),
    "atan"          => Builtin::Unary(UnaryKind::Atan),
    "arctan"        => Builtin::Unary(UnaryKind::Atan),
    "acot"          => Builtin::Unary(UnaryKind::Acot),
    "arccot"        => Builtin::Unary(UnaryKind::Acot),
    "asec"          => Builtin::Unary(UnaryKind::Asec),
    "arcsec"        => Builtin::Unary(UnaryKind::Asec),
    "acsc"          => Builtin::Unary(UnaryKind::Acsc),
    "arccsc"        => Builtin::Unary(UnaryKind::Acsc),
    "sinh"          => Builtin::Unary(UnaryKind::Sinh),
    "cosh"          => Builtin::Unary(UnaryKind::Cosh),
    "tanh"          => Builtin::Unary(UnaryKind::Tanh),
    "coth"          => Builtin::Unary(UnaryKind::Coth),
    "sech"          => Builtin::Unary(UnaryKind::Sech),
    "csch"          => Builtin::Unary(UnaryKind::Csch),
    "asinh"         => Builtin::Unary(UnaryKind::Asinh),
    "arsinh"        => Builtin::Unary(UnaryKind::Asinh),
    "acosh"         => Builtin::Unary(UnaryKind::Acosh),
    "arcosh"        => Builtin::Unary(UnaryKind::Acosh),
    "atanh"         => Builtin::Unary(UnaryKind::Atanh),
    "artanh"        => Builtin::Unary(UnaryKind::Atanh),
    "acoth"         => Builtin::Unary(UnaryKind::Acoth),
    "arcoth"        => Builtin::Unary(UnaryKind::Acoth),
    "asech"         => Builtin::Unary(UnaryKind::Asech),
    "arsech"        => Builtin::Unary(UnaryKind::Asech),
    "acsch"         => Builtin::Unary(UnaryKind::Acsch),
    "arcsch"        => Builtin::Unary(UnaryKind::Acsch),
    "floor"         => Builtin::Unary(UnaryKind::Floor),
    "ceil"          => Builtin::Unary(UnaryKind::Ceil),
    "trunc"         => Builtin::Unary(UnaryKind::Trunc),
    "frac"          => Builtin::Unary(UnaryKind::Frac),
    "sign"          => Builtin::Unary(UnaryKind::Sign),
    "todeg"         => Builtin::Unary(UnaryKind::ToDegree),
    "torad"         => Builtin::Unary(UnaryKind::ToRadian),
    "tograd"        => Builtin::Unary(UnaryKind::ToGradian),
    "tonumber"      => Builtin::Unary(UnaryKind::ToNumber),
    "re"            => Builtin::Unary(UnaryKind::Re),
    "im"            => Builtin::Unary(UnaryKind::Im),
    "conjugate"     => Builtin::Unary(UnaryKind::Conjugate),
    "phase"         => Builtin::Unary(UnaryKind::Phase),
    "reciprocal"    => Builtin::Unary(UnaryKind::Reciprocal),
    "transpose"     => Builtin::Unary(UnaryKind::Transpose),
    "det"           => Builtin::Unary(UnaryKind::Determinant),
    "determinant"   => Builtin::Unary(UnaryKind::Determinant),
    "inverse"       => Builtin::Unary(UnaryKind::Inverse),
    "log"           => Builtin::Function(FunctionKind::Log),
    "root"          => Builtin::Function(FunctionKind::Root),
    "convert"       => Builtin::Function(FunctionKind::Convert),
    "dotproduct"    => Builtin::Function(FunctionKind::DotProduct),
    "crossproduct"  => Builtin::Function(FunctionKind::CrossProduct),
    "round"         => Builtin::Function(FunctionKind::Round),
    "gcd"           => Builtin::Function(FunctionKind::Gcd),
    "lcm"           => Builtin::Function(FunctionKind::Lcm),
    "min"           => Builtin::Function(FunctionKind::Min),
    "max"           => Builtin::Function(FunctionKind::Max),
    "avg"           => Builtin::Function(FunctionKind::Avg),
    "sum"           => Builtin::Function(FunctionKind::Sum),
    "product"       => Builtin::Function(FunctionKind::Product),
    "count"         => Builtin::Function(FunctionKind::Count),
    "var"           => Builtin::Function(FunctionKind::Var),
    "varp"          => Builtin::Function(FunctionKind::Varp),
    "stdev"         => Builtin::Function(FunctionKind::Stdev),
    "stdevp"        => Builtin::Function(FunctionKind::Stdevp),
    "deriv"         => Builtin::Derivative,
    "simplify"      => Builtin::Simplify,
};

impl Builtin {
    /// Looks a built-in up by any of its spellings, ignoring case.
    pub fn from(name: &str) -> Option<Self> {
        BUILTINS.get(name.to_lowercase().as_str()).copied()
    }

    /// Returns a list of every accepted spelling.
    pub fn names() -> Vec<&'static str> {
        BUILTINS.keys().copied().collect()
    }
}

/// Abstract Syntax Tree (AST) node of the expression language.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),

    Boolean(bool),

    Str(String),

    /// Complex constant folded from a polar literal such as `2∠30°`.
    Complex(Complex<f64>),

    /// Unit-tagged constant such as `30°` or `2 km`.
    Quantity(Quantity),

    Variable(String),

    Unary {
        kind: UnaryKind,
        arg: Box<Expr>,
    },

    Binary {
        kind: BinaryKind,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Call of a built-in function of [`FunctionKind`].
    Call {
        kind: FunctionKind,
        args: Vec<Expr>,
    },

    /// Call resolved by name and arity at evaluation time.
    UserCall {
        name: String,
        args: Vec<Expr>,
    },

    Vector(Vec<Expr>),

    /// Matrix literal; every row evaluates to a vector.
    Matrix(Vec<Expr>),

    If {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Option<Box<Expr>>,
    },

    For {
        body: Box<Expr>,
        init: Box<Expr>,
        cond: Box<Expr>,
        step: Box<Expr>,
    },

    While {
        body: Box<Expr>,
        cond: Box<Expr>,
    },

    Assign {
        kind: AssignKind,
        target: String,
        value: Box<Expr>,
    },

    /// `x++` / `x--`
    Step {
        kind: StepKind,
        target: String,
    },

    /// `def(x, value)`: defines `x` in the current scope.
    Define {
        name: String,
        value: Box<Expr>,
    },

    /// `f(x, y) := body` or `def(f(x, y), body)`.
    DefineFunction {
        name: String,
        params: Vec<String>,
        body: Box<Expr>,
    },

    /// `undef(x)` removes a parameter; `undef(f(x))` removes a function of that arity.
    Undefine {
        name: String,
        arity: Option<usize>,
    },

    /// `deriv(expr, var[, point])`
    Derivative {
        expr: Box<Expr>,
        var: String,
        point: Option<Box<Expr>>,
    },

    /// `simplify(expr)`
    Simplify(Box<Expr>),
}

/// Expr helper impl to create new nodes
impl Expr {
    /// Create a number 0.0 node.
    pub fn zero() -> Self {
        Self::Number(0.0)
    }

    /// Create a number 1.0 node.
    pub fn one() -> Self {
        Self::Number(1.0)
    }

    pub fn variable(name: &str) -> Self {
        Self::Variable(name.to_string())
    }

    pub fn unary(kind: UnaryKind, arg: Self) -> Self {
        Self::Unary { kind, arg: Box::new(arg) }
    }

    pub fn binary(kind: BinaryKind, left: Self, right: Self) -> Self {
        Self::Binary { kind, left: Box::new(left), right: Box::new(right) }
    }

    /// Internal helper to create `self + other`.
    pub(crate) fn add(self, other: Self) -> Self {
        Self::binary(BinaryKind::Add, self, other)
    }

    /// Internal helper to create `self - other`.
    pub(crate) fn sub(self, other: Self) -> Self {
        Self::binary(BinaryKind::Sub, self, other)
    }

    /// Internal helper to create `self * other`.
    pub(crate) fn mul(self, other: Self) -> Self {
        Self::binary(BinaryKind::Mul, self, other)
    }

    /// Internal helper to create `self / other`.
    pub(crate) fn div(self, other: Self) -> Self {
        Self::binary(BinaryKind::Div, self, other)
    }

    /// Internal helper to create `self ^ exp`.
    pub(crate) fn pow(self, exp: Self) -> Self {
        Self::binary(BinaryKind::Pow, self, exp)
    }

    /// Internal helper to create `self ^ n` with a number exponent.
    pub(crate) fn powi(self, n: i32) -> Self {
        self.pow(Self::Number(n as f64))
    }

    /// Internal helper to create `-self`.
    pub(crate) fn negative(self) -> Self {
        Self::unary(UnaryKind::Negate, self)
    }

    /// Internal helper to apply a one-argument function to `self`.
    pub(crate) fn apply(self, kind: UnaryKind) -> Self {
        Self::unary(kind, self)
    }
}

impl Expr {
    /// Returns the number held by a number leaf.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns `true` if the node is the number leaf `value`.
    pub fn is_number(&self, value: f64) -> bool {
        self.as_number() == Some(value)
    }

    /// Returns `true` if the variable `var` occurs anywhere in the subtree.
    pub fn has_variable(&self, var: &str) -> bool {
        match self {
            Self::Number(_) | Self::Boolean(_) | Self::Str(_)
            | Self::Complex(_) | Self::Quantity(_) => false,
            Self::Variable(name) => name == var,
            Self::Unary { arg, .. } => arg.has_variable(var),
            Self::Binary { left, right, .. } => left.has_variable(var) || right.has_variable(var),
            Self::Call { args, .. } | Self::UserCall { args, .. }
            | Self::Vector(args) | Self::Matrix(args) => args.iter().any(|arg| arg.has_variable(var)),
            Self::If { cond, then, otherwise } => {
                cond.has_variable(var) || then.has_variable(var)
                    || otherwise.as_ref().is_some_and(|e| e.has_variable(var))
            },
            Self::For { body, init, cond, step } => {
                body.has_variable(var) || init.has_variable(var)
                    || cond.has_variable(var) || step.has_variable(var)
            },
            Self::While { body, cond } => body.has_variable(var) || cond.has_variable(var),
            Self::Assign { target, value, .. } => target == var || value.has_variable(var),
            Self::Step { target, .. } => target == var,
            Self::Define { name, value } => name == var || value.has_variable(var),
            Self::DefineFunction { body, .. } => body.has_variable(var),
            Self::Undefine { name, .. } => name == var,
            Self::Derivative { expr, point, .. } => {
                expr.has_variable(var) || point.as_ref().is_some_and(|p| p.has_variable(var))
            },
            Self::Simplify(expr) => expr.has_variable(var),
        }
    }
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", crate::analyzers::format(self))
    }
}

#[cfg(test)]
mod kind_tests {
    use super::*;

    #[test]
    fn test_builtin_aliases() {
        assert_eq!(Builtin::from("arcsin"), Some(Builtin::Unary(UnaryKind::Asin)));
        assert_eq!(Builtin::from("ASIN"), Some(Builtin::Unary(UnaryKind::Asin)));
        assert_eq!(Builtin::from("determinant"), Some(Builtin::Unary(UnaryKind::Determinant)));
        assert_eq!(Builtin::from("max"), Some(Builtin::Function(FunctionKind::Max)));
        assert_eq!(Builtin::from("deriv"), Some(Builtin::Derivative));
        assert_eq!(Builtin::from("unknown"), None);
    }

    #[test]
    fn test_binary_kind_info() {
        assert!(BinaryKind::Mul.info().precedence > BinaryKind::Add.info().precedence);
        assert!(BinaryKind::Pow.info().precedence > PREFIX_PRECEDENCE);
        assert!(PREFIX_PRECEDENCE > BinaryKind::Mul.info().precedence);
        assert!(!BinaryKind::Pow.info().is_left_assoc);
        assert!(BinaryKind::LogicalOr.info().precedence > TERNARY_PRECEDENCE);
    }

    #[test]
    fn test_arity_accepts() {
        assert!(FunctionKind::Log.arity().accepts(2));
        assert!(!FunctionKind::Log.arity().accepts(1));
        assert!(FunctionKind::Round.arity().accepts(1));
        assert!(FunctionKind::Round.arity().accepts(2));
        assert!(!FunctionKind::Round.arity().accepts(3));
        assert!(FunctionKind::Gcd.arity().accepts(5));
        assert_eq!(FunctionKind::Gcd.arity().to_string(), "at least 2");
    }

    #[test]
    fn test_unary_apply() {
        assert_eq!(UnaryKind::Negate.apply(2.0), Some(-2.0));
        assert_eq!(UnaryKind::Not.apply(5.0), Some(-6.0));
        assert_eq!(UnaryKind::Not.apply(0.5), None);
        assert_eq!(UnaryKind::Factorial.apply(5.0), Some(120.0));
        assert!(UnaryKind::Factorial.apply(-1.0).is_some_and(f64::is_nan));
        assert_eq!(UnaryKind::Sign.apply(-3.0), Some(-1.0));
        assert_eq!(UnaryKind::ToDegree.apply(1.0), None);
    }

    #[test]
    fn test_has_variable() {
        let expr = Expr::variable("x").mul(Expr::Number(2.0)).add(Expr::variable("y"));
        assert!(expr.has_variable("x"));
        assert!(expr.has_variable("y"));
        assert!(!expr.has_variable("z"));
        assert!(!Expr::Number(1.0).has_variable("x"));
    }
}
