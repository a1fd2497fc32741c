//! # parser.rs
//!
//! Converts a token sequence into an [`Expr`] tree.
//!
//! Parsing runs in two stages:
//! 1. The tokens are rewritten into postfix order with the shunting-yard algorithm.
//!    An operator on the stack is moved to the output while its precedence is higher
//!    than the incoming one, or equal and the incoming operator is left-associative.
//!    Brackets push and pop markers; calls, vectors and matrices take their argument
//!    count from the arity pre-pass in [`crate::arity`].
//! 2. The postfix sequence is folded left to right on a stack of built nodes.
//!
//! Context decides between readings of the same token:
//! - `+`/`-` are prefix operators unless they follow a value.
//! - A value directly after another value inserts a multiplication (`2x`, `(a)(b)`).
//! - `!` after a value is the factorial, otherwise logical not.
//! - `++`/`--` after a value are postfix steps, unless another value follows, in
//!   which case `5--3` reads as `5 - (-3)`.
//! - A unit name after a number literal and whitespace is a unit suffix (`2 m`),
//!   while `2m` is `2 * m`. Angle keywords and `°` after a value are angle suffixes.

use crate::arity::{self, Arities, Construct};
use crate::ast::{
    AssignKind, BinaryKind, Builtin, Expr, StepKind, UnaryKind,
    ASSIGNMENT_PRECEDENCE, PREFIX_PRECEDENCE, TERNARY_PRECEDENCE,
};
use crate::errors::ParseError;
use crate::lexer::{tokenize, Keyword, Operator, Symbol, Token, TokenKind};
use crate::settings::Settings;
use crate::units::{AngleUnit, Family, Quantity, Unit};
use crate::value::Value;

/// Statements written as calls of a keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Statement {
    If,
    For,
    While,
    Define,
    Undefine,
}

impl Statement {
    fn from(keyword: Keyword) -> Option<Self> {
        match keyword {
            Keyword::If => Some(Self::If),
            Keyword::For => Some(Self::For),
            Keyword::While => Some(Self::While),
            Keyword::Define => Some(Self::Define),
            Keyword::Undefine => Some(Self::Undefine),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::If => "if",
            Self::For => "for",
            Self::While => "while",
            Self::Define => "def",
            Self::Undefine => "undef",
        }
    }
}

/// What a bracketed call invokes.
#[derive(Debug, Clone, PartialEq)]
enum Callee {
    Builtin(Builtin),
    Statement(Statement),
    User(String),
}

impl Callee {
    fn name(&self) -> String {
        match self {
            Self::Builtin(Builtin::Unary(kind)) => kind.name().to_string(),
            Self::Builtin(Builtin::Function(kind)) => kind.name().to_string(),
            Self::Builtin(Builtin::Derivative) => "deriv".to_string(),
            Self::Builtin(Builtin::Simplify) => "simplify".to_string(),
            Self::Statement(statement) => statement.name().to_string(),
            Self::User(name) => name.clone(),
        }
    }
}

/// An element of the postfix sequence.
#[derive(Debug, Clone, PartialEq)]
enum Item {
    Leaf(Expr),
    Prefix(UnaryKind),
    Factorial,
    Step(StepKind),
    Suffix(Unit),
    Binary(BinaryKind),
    Assign(AssignKind),
    Ternary,
    Call { callee: Callee, arity: usize },
    Vector(usize),
    Matrix(usize),
}

/// An element of the operator stack.
#[derive(Debug)]
enum Entry {
    Operator { item: Item, precedence: u8 },

    /// `(` or `{` at token `index`; `output` is the output length when it was opened.
    Open { index: usize, output: usize },

    Callee(Callee),

    /// `?` waiting for its `:`.
    Question,
}

/// Returns `true` if the token can start an operand.
fn starts_value(token: &Token) -> bool {
    match token.kind() {
        TokenKind::Number(_) | TokenKind::Identifier(_) | TokenKind::Str(_) => true,
        TokenKind::Symbol(Symbol::LeftParen | Symbol::LeftBrace) => true,
        TokenKind::Keyword(Keyword::True | Keyword::False) => true,
        _ => arity::is_callable(token),
    }
}

/// Returns `true` if the token can start an operand, a signed one included.
fn starts_operand(token: &Token) -> bool {
    starts_value(token) || matches!(
        token.kind(),
        TokenKind::Operator(
            Operator::Plus | Operator::Minus | Operator::Tilde | Operator::Bang
            | Operator::Increment | Operator::Decrement
        ) | TokenKind::Keyword(Keyword::Not)
    )
}

fn binary_of(op: Operator) -> Option<BinaryKind> {
    use Operator as O;
    let kind = match op {
        O::Plus => BinaryKind::Add,
        O::Minus => BinaryKind::Sub,
        O::Star => BinaryKind::Mul,
        O::Slash => BinaryKind::Div,
        O::Percent => BinaryKind::Mod,
        O::Caret => BinaryKind::Pow,
        O::Ampersand => BinaryKind::And,
        O::Pipe => BinaryKind::Or,
        O::LogicalAnd => BinaryKind::LogicalAnd,
        O::LogicalOr => BinaryKind::LogicalOr,
        O::Implication => BinaryKind::Implies,
        O::Equivalence => BinaryKind::Equivalent,
        O::Equal => BinaryKind::Equal,
        O::NotEqual => BinaryKind::NotEqual,
        O::Less => BinaryKind::Less,
        O::LessEqual => BinaryKind::LessEqual,
        O::Greater => BinaryKind::Greater,
        O::GreaterEqual => BinaryKind::GreaterEqual,
        O::ShiftLeft => BinaryKind::ShiftLeft,
        O::ShiftRight => BinaryKind::ShiftRight,
        _ => return None,
    };
    Some(kind)
}

fn assign_of(op: Operator) -> Option<AssignKind> {
    use Operator as O;
    let kind = match op {
        O::ColonAssign | O::Assign => AssignKind::Set,
        O::AddAssign => AssignKind::AddSet,
        O::SubAssign => AssignKind::SubSet,
        O::MulAssign => AssignKind::MulSet,
        O::DivAssign => AssignKind::DivSet,
        O::ShlAssign => AssignKind::ShlSet,
        O::ShrAssign => AssignKind::ShrSet,
        _ => return None,
    };
    Some(kind)
}

/// Shunting-yard state.
struct Postfix<'a> {
    tokens: &'a [Token],
    arities: Arities,
    output: Vec<Item>,
    stack: Vec<Entry>,
    prev_is_value: bool,
}

impl<'a> Postfix<'a> {
    fn new(tokens: &'a [Token]) -> Result<Self, ParseError> {
        Ok(Self {
            tokens,
            arities: arity::resolve(tokens)?,
            output: Vec::with_capacity(tokens.len()),
            stack: Vec::new(),
            prev_is_value: false,
        })
    }

    fn unexpected(token: &Token) -> ParseError {
        ParseError::UnexpectedToken { token: token.kind().to_string(), position: token.start() }
    }

    fn next_is(&self, idx: usize, predicate: fn(&Token) -> bool) -> bool {
        self.tokens.get(idx + 1).is_some_and(predicate)
    }

    fn pop_to_output(&mut self) {
        if let Some(Entry::Operator { item, .. }) = self.stack.pop() {
            self.output.push(item);
        }
    }

    /// Pushes an infix operator after moving the operators that bind tighter to the output.
    fn push_operator(&mut self, item: Item, precedence: u8, is_left_assoc: bool) {
        while let Some(Entry::Operator { precedence: top, .. }) = self.stack.last() {
            let top = *top;
            if top > precedence || (top == precedence && is_left_assoc) {
                self.pop_to_output();
            } else {
                break;
            }
        }
        self.stack.push(Entry::Operator { item, precedence });
        self.prev_is_value = false;
    }

    fn push_binary(&mut self, kind: BinaryKind) {
        let info = kind.info();
        self.push_operator(Item::Binary(kind), info.precedence, info.is_left_assoc);
    }

    fn push_prefix(&mut self, token: &Token, kind: UnaryKind) -> Result<(), ParseError> {
        if self.prev_is_value {
            return Err(Self::unexpected(token));
        }
        self.stack.push(Entry::Operator { item: Item::Prefix(kind), precedence: PREFIX_PRECEDENCE });
        Ok(())
    }

    /// Postfix operators bind tightest, so they go straight to the output.
    fn push_postfix(&mut self, token: &Token, item: Item) -> Result<(), ParseError> {
        if !self.prev_is_value {
            return Err(Self::unexpected(token));
        }
        self.output.push(item);
        Ok(())
    }

    fn implicit_mul(&mut self) {
        if self.prev_is_value {
            self.push_binary(BinaryKind::Mul);
        }
    }

    fn push_value(&mut self, item: Item) {
        self.implicit_mul();
        self.output.push(item);
        self.prev_is_value = true;
    }

    fn push_callee(&mut self, callee: Callee) {
        self.implicit_mul();
        self.stack.push(Entry::Callee(callee));
        self.prev_is_value = false;
    }

    /// Returns the unit of an identifier written as a suffix of a number literal.
    fn unit_suffix(&self, idx: usize, name: &str) -> Option<Unit> {
        let prev = self.tokens.get(idx.checked_sub(1)?)?;
        let tokens = self.tokens;
        let token = &tokens[idx];
        let separated = prev.end() < token.start();
        if matches!(prev.kind(), TokenKind::Number(_)) && separated {
            Unit::from_name(&name.to_lowercase())
        } else {
            None
        }
    }

    fn parse_in_identifier(&mut self, idx: usize, name: &str) {
        if self.next_is(idx, |t| t.is_symbol(Symbol::LeftParen)) {
            let callee = Builtin::from(name)
                .map(Callee::Builtin)
                .unwrap_or_else(|| Callee::User(name.to_string()));
            self.push_callee(callee);
        } else if let Some(unit) = self.unit_suffix(idx, name) {
            self.output.push(Item::Suffix(unit));
        } else {
            self.push_value(Item::Leaf(Expr::Variable(name.to_string())));
        }
    }

    fn parse_in_keyword(&mut self, idx: usize, keyword: Keyword) -> Result<(), ParseError> {
        let tokens = self.tokens;
        let token = &tokens[idx];
        match keyword {
            Keyword::True => self.push_value(Item::Leaf(Expr::Boolean(true))),
            Keyword::False => self.push_value(Item::Leaf(Expr::Boolean(false))),
            Keyword::And => self.push_binary(BinaryKind::And),
            Keyword::Or => self.push_binary(BinaryKind::Or),
            Keyword::Xor => self.push_binary(BinaryKind::Xor),
            Keyword::Nand => self.push_binary(BinaryKind::Nand),
            Keyword::Nor => self.push_binary(BinaryKind::Nor),
            Keyword::Mod => self.push_binary(BinaryKind::Mod),
            Keyword::Eq => self.push_binary(BinaryKind::Equivalent),
            Keyword::Impl => self.push_binary(BinaryKind::Implies),
            Keyword::Not => self.push_prefix(token, UnaryKind::Not)?,
            Keyword::Degree => self.push_postfix(token, Item::Suffix(Unit::Angle(AngleUnit::Degree)))?,
            Keyword::Radian => self.push_postfix(token, Item::Suffix(Unit::Angle(AngleUnit::Radian)))?,
            Keyword::Gradian => self.push_postfix(token, Item::Suffix(Unit::Angle(AngleUnit::Gradian)))?,
            Keyword::If | Keyword::For | Keyword::While | Keyword::Define | Keyword::Undefine => {
                match Statement::from(keyword) {
                    Some(statement) if self.next_is(idx, |t| t.is_symbol(Symbol::LeftParen)) => {
                        self.push_callee(Callee::Statement(statement));
                    },
                    _ => return Err(Self::unexpected(token)),
                }
            },
        }
        Ok(())
    }

    fn parse_in_operator(&mut self, idx: usize, op: Operator) -> Result<(), ParseError> {
        let tokens = self.tokens;
        let token = &tokens[idx];
        match op {
            Operator::Plus if !self.prev_is_value => self.push_prefix(token, UnaryKind::Plus)?,
            Operator::Minus if !self.prev_is_value => self.push_prefix(token, UnaryKind::Negate)?,
            Operator::Bang if self.prev_is_value => self.push_postfix(token, Item::Factorial)?,
            Operator::Bang | Operator::Tilde => self.push_prefix(token, UnaryKind::Not)?,
            Operator::Increment | Operator::Decrement => self.parse_in_step(idx, op)?,
            op => {
                if let Some(kind) = binary_of(op) {
                    self.push_binary(kind);
                } else if let Some(kind) = assign_of(op) {
                    self.push_operator(Item::Assign(kind), ASSIGNMENT_PRECEDENCE, false);
                } else {
                    return Err(Self::unexpected(token));
                }
            },
        }
        Ok(())
    }

    fn parse_in_step(&mut self, idx: usize, op: Operator) -> Result<(), ParseError> {
        let tokens = self.tokens;
        let token = &tokens[idx];
        let (step, binary, prefix) = match op {
            Operator::Increment => (StepKind::Increment, BinaryKind::Add, UnaryKind::Plus),
            _ => (StepKind::Decrement, BinaryKind::Sub, UnaryKind::Negate),
        };

        if !self.prev_is_value {
            self.push_prefix(token, prefix)?;
            self.push_prefix(token, prefix)
        } else if self.next_is(idx, starts_operand) {
            self.push_binary(binary);
            self.push_prefix(token, prefix)
        } else {
            self.push_postfix(token, Item::Step(step))
        }
    }

    /// Moves operators to the output until the innermost open bracket.
    fn flush_to_open(&mut self, position: usize) -> Result<(), ParseError> {
        loop {
            match self.stack.last() {
                Some(Entry::Operator { .. }) => self.pop_to_output(),
                Some(Entry::Open { .. }) => return Ok(()),
                Some(Entry::Question) => return Err(ParseError::MissingTernaryBranch),
                Some(Entry::Callee(_)) | None => return Err(ParseError::MismatchedBracket { position }),
            }
        }
    }

    fn parse_in_right_paren(&mut self, idx: usize) -> Result<(), ParseError> {
        let tokens = self.tokens;
        let token = &tokens[idx];
        let position = token.start();
        self.flush_to_open(position)?;
        let Some(Entry::Open { index, output }) = self.stack.pop() else {
            return Err(ParseError::MismatchedBracket { position });
        };

        match self.arities.get(&index) {
            Some(Construct::Call { arity }) => {
                let arity = *arity;
                let Some(Entry::Callee(callee)) = self.stack.pop() else {
                    return Err(ParseError::MismatchedBracket { position });
                };
                self.output.push(Item::Call { callee, arity });
            },
            None if self.output.len() == output => return Err(Self::unexpected(token)),
            None => {},
            Some(_) => return Err(ParseError::MismatchedBracket { position }),
        }
        self.prev_is_value = true;
        Ok(())
    }

    fn parse_in_right_brace(&mut self, idx: usize) -> Result<(), ParseError> {
        let position = self.tokens[idx].start();
        self.flush_to_open(position)?;
        let Some(Entry::Open { index, .. }) = self.stack.pop() else {
            return Err(ParseError::MismatchedBracket { position });
        };

        match self.arities.get(&index) {
            Some(Construct::Vector { arity }) => self.output.push(Item::Vector(*arity)),
            Some(Construct::Matrix { rows }) => self.output.push(Item::Matrix(*rows)),
            _ => return Err(ParseError::MismatchedBracket { position }),
        }
        self.prev_is_value = true;
        Ok(())
    }

    fn parse_in_colon(&mut self, idx: usize) -> Result<(), ParseError> {
        loop {
            match self.stack.last() {
                Some(Entry::Operator { .. }) => self.pop_to_output(),
                Some(Entry::Question) => {
                    self.stack.pop();
                    break;
                },
                _ => return Err(Self::unexpected(&self.tokens[idx])),
            }
        }
        self.stack.push(Entry::Operator { item: Item::Ternary, precedence: TERNARY_PRECEDENCE });
        self.prev_is_value = false;
        Ok(())
    }

    fn parse_in_symbol(&mut self, idx: usize, symbol: Symbol) -> Result<(), ParseError> {
        let tokens = self.tokens;
        let token = &tokens[idx];
        match symbol {
            Symbol::LeftParen | Symbol::LeftBrace => {
                let is_call = matches!(self.arities.get(&idx), Some(Construct::Call { .. }));
                if !is_call {
                    self.implicit_mul();
                }
                self.stack.push(Entry::Open { index: idx, output: self.output.len() });
                self.prev_is_value = false;
            },
            Symbol::RightParen => self.parse_in_right_paren(idx)?,
            Symbol::RightBrace => self.parse_in_right_brace(idx)?,
            Symbol::Comma => {
                self.flush_to_open(token.start())?;
                self.prev_is_value = false;
            },
            Symbol::Angle => self.push_binary(BinaryKind::Polar),
            Symbol::Degree => self.push_postfix(token, Item::Suffix(Unit::Angle(AngleUnit::Degree)))?,
            Symbol::Question => {
                while let Some(Entry::Operator { precedence, .. }) = self.stack.last() {
                    if *precedence <= TERNARY_PRECEDENCE {
                        break;
                    }
                    self.pop_to_output();
                }
                self.stack.push(Entry::Question);
                self.prev_is_value = false;
            },
            Symbol::Colon => self.parse_in_colon(idx)?,
        }
        Ok(())
    }

    /// Rewrites the whole token sequence into postfix order.
    fn run(mut self) -> Result<Vec<Item>, ParseError> {
        let tokens = self.tokens;
        for (idx, token) in tokens.iter().enumerate() {
            match token.kind() {
                TokenKind::Number(n) => self.push_value(Item::Leaf(Expr::Number(*n))),
                TokenKind::Str(s) => self.push_value(Item::Leaf(Expr::Str(s.clone()))),
                TokenKind::Identifier(name) => self.parse_in_identifier(idx, name),
                TokenKind::Keyword(keyword) => self.parse_in_keyword(idx, *keyword)?,
                TokenKind::Operator(op) => self.parse_in_operator(idx, *op)?,
                TokenKind::Symbol(symbol) => self.parse_in_symbol(idx, *symbol)?,
            }
        }

        let end = tokens.last().map_or(0, Token::end);
        while let Some(entry) = self.stack.pop() {
            match entry {
                Entry::Operator { item, .. } => self.output.push(item),
                Entry::Question => return Err(ParseError::MissingTernaryBranch),
                Entry::Open { index, .. } => {
                    return Err(ParseError::MismatchedBracket { position: tokens[index].start() });
                },
                Entry::Callee(_) => return Err(ParseError::MismatchedBracket { position: end }),
            }
        }
        Ok(self.output)
    }
}

/// Internal helper to pop one operand of `operator`.
fn pop_operand(nodes: &mut Vec<Expr>, operator: &str) -> Result<Expr, ParseError> {
    nodes.pop().ok_or_else(|| ParseError::MissingOperand { operator: operator.to_string() })
}

/// Internal helper to pop the last `count` operands, in order.
fn pop_args(nodes: &mut Vec<Expr>, count: usize, operator: &str) -> Result<Vec<Expr>, ParseError> {
    if nodes.len() < count {
        return Err(ParseError::MissingOperand { operator: operator.to_string() });
    }
    Ok(nodes.split_off(nodes.len() - count))
}

/// Internal helper to destructure an argument list of exactly `N` elements.
fn take<const N: usize>(args: Vec<Expr>, name: &str, expected: &str) -> Result<[Expr; N], ParseError> {
    let got = args.len();
    args.try_into().map_err(|_| ParseError::WrongArgumentCount {
        name: name.to_string(),
        expected: expected.to_string(),
        got,
    })
}

/// Internal helper to read the parameter list of a function definition.
fn parameter_names(args: Vec<Expr>, operator: &str) -> Result<Vec<String>, ParseError> {
    args.into_iter()
        .map(|arg| match arg {
            Expr::Variable(name) => Ok(name),
            _ => Err(ParseError::NotAVariable { operator: operator.to_string() }),
        })
        .collect()
}

fn from_unary(nodes: &mut Vec<Expr>, kind: UnaryKind) -> Result<(), ParseError> {
    let arg = pop_operand(nodes, kind.name())?;
    let node = match (kind, arg) {
        (UnaryKind::Negate, Expr::Number(n)) => Expr::Number(-n),
        (UnaryKind::Negate, Expr::Quantity(q)) => Expr::Quantity(q.with_magnitude(-q.magnitude())),
        (UnaryKind::Plus, leaf @ (Expr::Number(_) | Expr::Quantity(_))) => leaf,
        (kind, arg) => Expr::unary(kind, arg),
    };
    nodes.push(node);
    Ok(())
}

fn from_binary(nodes: &mut Vec<Expr>, kind: BinaryKind) -> Result<(), ParseError> {
    let right = pop_operand(nodes, kind.symbol())?;
    let left = pop_operand(nodes, kind.symbol())?;

    // a polar literal with a unit-tagged angle is folded into a complex constant
    let folded = match (&left, &right) {
        (Expr::Number(r), Expr::Quantity(angle))
            if kind == BinaryKind::Polar && angle.family() == Family::Angle =>
        {
            match Value::Number(*r).polar(&Value::Quantity(*angle), &Settings::default()) {
                Ok(Value::Complex(z)) => Some(Expr::Complex(z)),
                Ok(Value::Number(x)) => Some(Expr::Number(x)),
                _ => None,
            }
        },
        _ => None,
    };

    nodes.push(folded.unwrap_or_else(|| Expr::binary(kind, left, right)));
    Ok(())
}

fn from_suffix(nodes: &mut Vec<Expr>, unit: Unit) -> Result<(), ParseError> {
    match pop_operand(nodes, unit.name())? {
        Expr::Number(n) => {
            nodes.push(Expr::Quantity(Quantity::new(n, unit)));
            Ok(())
        },
        _ => Err(ParseError::InvalidUnitSuffix { unit: unit.name().to_string() }),
    }
}

fn from_step(nodes: &mut Vec<Expr>, kind: StepKind) -> Result<(), ParseError> {
    match pop_operand(nodes, kind.symbol())? {
        Expr::Variable(target) => {
            nodes.push(Expr::Step { kind, target });
            Ok(())
        },
        _ => Err(ParseError::NotAVariable { operator: kind.symbol().to_string() }),
    }
}

fn from_assign(nodes: &mut Vec<Expr>, kind: AssignKind) -> Result<(), ParseError> {
    let value = pop_operand(nodes, kind.symbol())?;
    let target = pop_operand(nodes, kind.symbol())?;

    let node = match target {
        Expr::Variable(name) => Expr::Assign { kind, target: name, value: Box::new(value) },
        Expr::UserCall { name, args } if kind == AssignKind::Set => Expr::DefineFunction {
            name,
            params: parameter_names(args, kind.symbol())?,
            body: Box::new(value),
        },
        _ => return Err(ParseError::NotAVariable { operator: kind.symbol().to_string() }),
    };
    nodes.push(node);
    Ok(())
}

fn from_ternary(nodes: &mut Vec<Expr>) -> Result<(), ParseError> {
    let otherwise = pop_operand(nodes, "?:")?;
    let then = pop_operand(nodes, "?:")?;
    let cond = pop_operand(nodes, "?:")?;
    nodes.push(Expr::If {
        cond: Box::new(cond),
        then: Box::new(then),
        otherwise: Some(Box::new(otherwise)),
    });
    Ok(())
}

fn from_call(nodes: &mut Vec<Expr>, callee: Callee, arity: usize) -> Result<(), ParseError> {
    let name = callee.name();
    let mut args = pop_args(nodes, arity, &name)?;
    let wrong = |expected: &str| ParseError::WrongArgumentCount {
        name: name.clone(),
        expected: expected.to_string(),
        got: arity,
    };

    let node = match callee {
        Callee::Builtin(Builtin::Unary(kind)) => {
            let [arg] = take(args, &name, "1")?;
            Expr::unary(kind, arg)
        },
        Callee::Builtin(Builtin::Function(kind)) => {
            if !kind.arity().accepts(arity) {
                return Err(wrong(&kind.arity().to_string()));
            }
            Expr::Call { kind, args }
        },
        Callee::Builtin(Builtin::Derivative) => {
            if !(2..=3).contains(&arity) {
                return Err(wrong("2 to 3"));
            }
            let point = if arity == 3 { args.pop().map(Box::new) } else { None };
            let [expr, var] = take(args, &name, "2 to 3")?;
            let Expr::Variable(var) = var else {
                return Err(ParseError::NotAVariable { operator: name });
            };
            Expr::Derivative { expr: Box::new(expr), var, point }
        },
        Callee::Builtin(Builtin::Simplify) => {
            let [expr] = take(args, &name, "1")?;
            Expr::Simplify(Box::new(expr))
        },
        Callee::Statement(Statement::If) => {
            if !(2..=3).contains(&arity) {
                return Err(wrong("2 to 3"));
            }
            let otherwise = if arity == 3 { args.pop().map(Box::new) } else { None };
            let [cond, then] = take(args, &name, "2 to 3")?;
            Expr::If { cond: Box::new(cond), then: Box::new(then), otherwise }
        },
        Callee::Statement(Statement::For) => {
            let [body, init, cond, step] = take(args, &name, "4")?;
            Expr::For {
                body: Box::new(body),
                init: Box::new(init),
                cond: Box::new(cond),
                step: Box::new(step),
            }
        },
        Callee::Statement(Statement::While) => {
            let [body, cond] = take(args, &name, "2")?;
            Expr::While { body: Box::new(body), cond: Box::new(cond) }
        },
        Callee::Statement(Statement::Define) => {
            let [target, value] = take(args, &name, "2")?;
            match target {
                Expr::Variable(target) => Expr::Define { name: target, value: Box::new(value) },
                Expr::UserCall { name: target, args } => Expr::DefineFunction {
                    name: target,
                    params: parameter_names(args, &name)?,
                    body: Box::new(value),
                },
                _ => return Err(ParseError::NotAVariable { operator: name }),
            }
        },
        Callee::Statement(Statement::Undefine) => {
            let [target] = take(args, &name, "1")?;
            match target {
                Expr::Variable(target) => Expr::Undefine { name: target, arity: None },
                Expr::UserCall { name: target, args } => Expr::Undefine { name: target, arity: Some(args.len()) },
                _ => return Err(ParseError::NotAVariable { operator: name }),
            }
        },
        Callee::User(name) => Expr::UserCall { name, args },
    };

    nodes.push(node);
    Ok(())
}

/// Folds a postfix sequence into a single tree.
fn fold(items: Vec<Item>) -> Result<Expr, ParseError> {
    let mut nodes: Vec<Expr> = Vec::new();

    for item in items {
        match item {
            Item::Leaf(expr) => nodes.push(expr),
            Item::Prefix(kind) => from_unary(&mut nodes, kind)?,
            Item::Factorial => from_unary(&mut nodes, UnaryKind::Factorial)?,
            Item::Step(kind) => from_step(&mut nodes, kind)?,
            Item::Suffix(unit) => from_suffix(&mut nodes, unit)?,
            Item::Binary(kind) => from_binary(&mut nodes, kind)?,
            Item::Assign(kind) => from_assign(&mut nodes, kind)?,
            Item::Ternary => from_ternary(&mut nodes)?,
            Item::Call { callee, arity } => from_call(&mut nodes, callee, arity)?,
            Item::Vector(count) => {
                let elements = pop_args(&mut nodes, count, "{}")?;
                nodes.push(Expr::Vector(elements));
            },
            Item::Matrix(rows) => {
                let rows = pop_args(&mut nodes, rows, "{}")?;
                nodes.push(Expr::Matrix(rows));
            },
        }
    }

    match nodes.len() {
        0 => Err(ParseError::EmptyExpression),
        1 => nodes.pop().ok_or(ParseError::EmptyExpression),
        count => Err(ParseError::TrailingOperands { count }),
    }
}

/// Parses a token sequence into an expression tree.
///
/// # Arguments
/// * `tokens` - tokens produced by [`tokenize`]
///
/// # Returns
/// * `Ok(Expr)` - the root of the tree
/// * `Err(ParseError)` - the tokens do not form a single expression
pub fn parse_tokens(tokens: &[Token]) -> Result<Expr, ParseError> {
    let postfix = Postfix::new(tokens)?.run()?;
    log::trace!("postfix: {} items from {} tokens", postfix.len(), tokens.len());
    fold(postfix)
}

/// Tokenizes and parses `text`.
///
/// Tokenizer failures are reported as [`ParseError::Tokenize`].
pub fn parse(text: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(text)?;
    parse_tokens(&tokens)
}

#[cfg(test)]
mod parser_tests {
    use super::*;
    use crate::ast::FunctionKind;
    use crate::errors::TokenizeError;
    use crate::units::LengthUnit;
    use num_complex::Complex;

    fn num(n: f64) -> Expr {
        Expr::Number(n)
    }

    fn var(name: &str) -> Expr {
        Expr::variable(name)
    }

    #[test]
    fn test_precedence() {
        assert_eq!(parse("2+3*4").unwrap(), num(2.0).add(num(3.0).mul(num(4.0))));
        assert_eq!(parse("(2+3)*4").unwrap(), num(2.0).add(num(3.0)).mul(num(4.0)));
        assert_eq!(parse("2-3-4").unwrap(), num(2.0).sub(num(3.0)).sub(num(4.0)));
        assert_eq!(parse("1 < 2 && x").unwrap(), Expr::binary(
            BinaryKind::LogicalAnd,
            Expr::binary(BinaryKind::Less, num(1.0), num(2.0)),
            var("x"),
        ));
    }

    #[test]
    fn test_power_is_right_associative() {
        assert_eq!(parse("2^3^2").unwrap(), num(2.0).pow(num(3.0).pow(num(2.0))));
    }

    #[test]
    fn test_prefix_minus_binds_looser_than_power() {
        assert_eq!(parse("-x^2").unwrap(), var("x").pow(num(2.0)).negative());
        assert_eq!(parse("(-2)^2").unwrap(), num(-2.0).pow(num(2.0)));
        assert_eq!(parse("2*-3").unwrap(), num(2.0).mul(num(-3.0)));
        assert_eq!(parse("-x*2").unwrap(), var("x").negative().mul(num(2.0)));
    }

    #[test]
    fn test_implicit_multiplication() {
        assert_eq!(parse("2x").unwrap(), num(2.0).mul(var("x")));
        assert_eq!(parse("(a)(b)").unwrap(), var("a").mul(var("b")));
        assert_eq!(parse("2 sin(x)").unwrap(), num(2.0).mul(var("x").apply(UnaryKind::Sin)));
        assert_eq!(parse("2e").unwrap(), num(2.0).mul(var("e")));
    }

    #[test]
    fn test_unit_suffix_needs_whitespace() {
        let metres = Expr::Quantity(Quantity::new(2.0, Unit::METRE));
        assert_eq!(parse("2 m").unwrap(), metres);
        assert_eq!(parse("2m").unwrap(), num(2.0).mul(var("m")));
        assert_eq!(
            parse("1.5 km").unwrap(),
            Expr::Quantity(Quantity::new(1.5, Unit::Length(LengthUnit::Kilometre)))
        );
    }

    #[test]
    fn test_angle_suffixes() {
        let degrees = Expr::Quantity(Quantity::angle(30.0, AngleUnit::Degree));
        assert_eq!(parse("30°").unwrap(), degrees);
        assert_eq!(parse("30deg").unwrap(), degrees);
        assert_eq!(parse("-30°").unwrap(), Expr::Quantity(Quantity::angle(-30.0, AngleUnit::Degree)));
        assert_eq!(
            parse("x°").unwrap_err(),
            ParseError::InvalidUnitSuffix { unit: "deg".into() }
        );
    }

    #[test]
    fn test_polar_literal() {
        assert_eq!(parse("2∠90°").unwrap(), Expr::Complex(Complex::new(0.0, 2.0)));
        assert_eq!(
            parse("2∠x").unwrap(),
            Expr::binary(BinaryKind::Polar, num(2.0), var("x"))
        );
    }

    #[test]
    fn test_factorial_and_not() {
        assert_eq!(parse("3!").unwrap(), num(3.0).apply(UnaryKind::Factorial));
        assert_eq!(parse("!x").unwrap(), var("x").apply(UnaryKind::Not));
        assert_eq!(parse("not true").unwrap(), Expr::Boolean(true).apply(UnaryKind::Not));
        assert_eq!(parse("~5").unwrap(), num(5.0).apply(UnaryKind::Not));
    }

    #[test]
    fn test_increment_and_decrement() {
        assert_eq!(parse("x++").unwrap(), Expr::Step { kind: StepKind::Increment, target: "x".into() });
        assert_eq!(parse("5--3").unwrap(), num(5.0).sub(num(-3.0)));
        assert_eq!(parse("--x").unwrap(), var("x").negative().negative());
        assert_eq!(parse("3++").unwrap_err(), ParseError::NotAVariable { operator: "++".into() });
    }

    #[test]
    fn test_keyword_operators() {
        assert_eq!(parse("7 mod 3").unwrap(), Expr::binary(BinaryKind::Mod, num(7.0), num(3.0)));
        assert_eq!(parse("a and b").unwrap(), Expr::binary(BinaryKind::And, var("a"), var("b")));
        assert_eq!(parse("a xor b").unwrap(), Expr::binary(BinaryKind::Xor, var("a"), var("b")));
        assert_eq!(parse("a impl b").unwrap(), Expr::binary(BinaryKind::Implies, var("a"), var("b")));
        assert_eq!(parse("a → b").unwrap(), Expr::binary(BinaryKind::Implies, var("a"), var("b")));
    }

    #[test]
    fn test_assignment() {
        assert_eq!(
            parse("x := 1 + 2").unwrap(),
            Expr::Assign { kind: AssignKind::Set, target: "x".into(), value: Box::new(num(1.0).add(num(2.0))) }
        );
        assert_eq!(
            parse("x += 2").unwrap(),
            Expr::Assign { kind: AssignKind::AddSet, target: "x".into(), value: Box::new(num(2.0)) }
        );
        assert_eq!(
            parse("x = y = 3").unwrap(),
            Expr::Assign {
                kind: AssignKind::Set,
                target: "x".into(),
                value: Box::new(Expr::Assign { kind: AssignKind::Set, target: "y".into(), value: Box::new(num(3.0)) }),
            }
        );
        assert_eq!(parse("3 := 4").unwrap_err(), ParseError::NotAVariable { operator: ":=".into() });
    }

    #[test]
    fn test_function_definition() {
        let expected = Expr::DefineFunction {
            name: "f".into(),
            params: vec!["x".into(), "y".into()],
            body: Box::new(var("x").mul(var("y"))),
        };
        assert_eq!(parse("f(x, y) := x*y").unwrap(), expected);
        assert_eq!(parse("def(f(x, y), x*y)").unwrap(), expected);
        assert_eq!(parse("undef(f(a, b))").unwrap(), Expr::Undefine { name: "f".into(), arity: Some(2) });
        assert_eq!(parse("undef(x)").unwrap(), Expr::Undefine { name: "x".into(), arity: None });
        assert_eq!(parse("f(1) := 2").unwrap_err(), ParseError::NotAVariable { operator: ":=".into() });
    }

    #[test]
    fn test_ternary() {
        let expected = Expr::If {
            cond: Box::new(var("a")),
            then: Box::new(num(1.0)),
            otherwise: Some(Box::new(Expr::If {
                cond: Box::new(var("b")),
                then: Box::new(num(2.0)),
                otherwise: Some(Box::new(num(3.0))),
            })),
        };
        assert_eq!(parse("a ? 1 : b ? 2 : 3").unwrap(), expected);
        assert_eq!(parse("a ? 1").unwrap_err(), ParseError::MissingTernaryBranch);
    }

    #[test]
    fn test_calls() {
        assert_eq!(
            parse("max(1, 2, 3)").unwrap(),
            Expr::Call { kind: FunctionKind::Max, args: vec![num(1.0), num(2.0), num(3.0)] }
        );
        assert_eq!(parse("ARCSIN(x)").unwrap(), var("x").apply(UnaryKind::Asin));
        assert_eq!(
            parse("g(1, x)").unwrap(),
            Expr::UserCall { name: "g".into(), args: vec![num(1.0), var("x")] }
        );
        assert_eq!(parse("now()").unwrap(), Expr::UserCall { name: "now".into(), args: vec![] });
        assert_eq!(
            parse("log(2)").unwrap_err(),
            ParseError::WrongArgumentCount { name: "log".into(), expected: "2".into(), got: 1 }
        );
        assert_eq!(
            parse("sin(1, 2)").unwrap_err(),
            ParseError::WrongArgumentCount { name: "sin".into(), expected: "1".into(), got: 2 }
        );
    }

    #[test]
    fn test_statements() {
        assert_eq!(
            parse("if(x > 1, 2)").unwrap(),
            Expr::If {
                cond: Box::new(Expr::binary(BinaryKind::Greater, var("x"), num(1.0))),
                then: Box::new(num(2.0)),
                otherwise: None,
            }
        );
        assert!(matches!(parse("while(x++, x < 3)").unwrap(), Expr::While { .. }));
        assert!(matches!(parse("for(s += i, i := 0, i < 3, i++)").unwrap(), Expr::For { .. }));
        assert_eq!(
            parse("for(1, 2)").unwrap_err(),
            ParseError::WrongArgumentCount { name: "for".into(), expected: "4".into(), got: 2 }
        );
    }

    #[test]
    fn test_derivative_call() {
        assert_eq!(
            parse("deriv(x^2, x, 3)").unwrap(),
            Expr::Derivative {
                expr: Box::new(var("x").pow(num(2.0))),
                var: "x".into(),
                point: Some(Box::new(num(3.0))),
            }
        );
        assert_eq!(parse("deriv(x^2, 2)").unwrap_err(), ParseError::NotAVariable { operator: "deriv".into() });
    }

    #[test]
    fn test_vectors_and_matrices() {
        assert_eq!(parse("{1, x}").unwrap(), Expr::Vector(vec![num(1.0), var("x")]));
        assert_eq!(
            parse("{{1, 2}, {3, 4}}").unwrap(),
            Expr::Matrix(vec![
                Expr::Vector(vec![num(1.0), num(2.0)]),
                Expr::Vector(vec![num(3.0), num(4.0)]),
            ])
        );
        assert_eq!(parse("2{1}").unwrap(), num(2.0).mul(Expr::Vector(vec![num(1.0)])));
    }

    #[test]
    fn test_errors() {
        assert_eq!(parse("").unwrap_err(), ParseError::EmptyExpression);
        assert_eq!(parse("2 +").unwrap_err(), ParseError::MissingOperand { operator: "+".into() });
        assert!(matches!(parse("()").unwrap_err(), ParseError::UnexpectedToken { .. }));
        assert!(matches!(parse("(1, 2)").unwrap_err(), ParseError::UnexpectedToken { .. }));
        assert!(matches!(parse("1 : 2").unwrap_err(), ParseError::UnexpectedToken { .. }));
        assert!(matches!(parse("if + 1").unwrap_err(), ParseError::UnexpectedToken { .. }));
        assert!(matches!(
            parse("2 $ 3").unwrap_err(),
            ParseError::Tokenize(TokenizeError::UnsupportedSymbol { symbol: '$', .. })
        ));
    }
}
