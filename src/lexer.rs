//! # lexer.rs
//!
//! This module provides the tokenizer of the expression language.
//! It splits an input string into a flat sequence of [`Token`]s, each carrying
//! its classified kind and its byte span in the original input string.
//!
//! The tokenizer has no knowledge of the grammar. At each position it tries, in order:
//! whitespace, a fixed symbol (`( ) { } , ∠ ° : ?`), a quoted string, an operator
//! (longest match over up to three characters), a number literal
//! (binary `0b…`, hexadecimal `0x…`, octal `0…`, or decimal with optional fraction and exponent),
//! and finally a keyword or identifier run.
//!
//! Keywords are matched case-insensitively; identifiers keep their original text.

use crate::errors::TokenizeError;
use phf::Map;
use phf_macros::phf_map;
use std::ops::Range;

#[doc(hidden)]
/// Internal macro to define the single-character symbols.
macro_rules! symbols {
    ($( $variant:ident => $ch:literal ),* $(,)?) => {
        /// Fixed single-character punctuation of the language.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Symbol {
            $( $variant ),*
        }

        impl Symbol {
            /// Converts a character into a `Symbol`.
            pub fn from(ch: char) -> Option<Self> {
                match ch {
                    $( $ch => Some(Self::$variant), )*
                    _ => None,
                }
            }

            /// Returns the character of the symbol.
            pub fn as_char(&self) -> char {
                match self {
                    $( Self::$variant => $ch, )*
                }
            }
        }

        impl std::fmt::Display for Symbol {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.as_char())
            }
        }
    };
}

symbols! {
    LeftParen   => '(',
    RightParen  => ')',
    LeftBrace   => '{',
    RightBrace  => '}',
    Comma       => ',',
    Angle       => '∠',
    Degree      => '°',
    Colon       => ':',
    Question    => '?',
}

#[doc(hidden)]
/// Internal macro to define the operator spellings.
///
/// The symbol given here is the canonical spelling used for display.
/// Alternative spellings are registered in [`OPERATORS`] only.
macro_rules! operators {
    ($( $variant:ident => $symbol:literal ),* $(,)?) => {
        /// Operator token. Whether it acts as prefix, postfix or binary is decided by the parser.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Operator {
            $( $variant ),*
        }

        impl Operator {
            /// Returns the canonical spelling of the operator.
            pub fn symbol(&self) -> &'static str {
                match self {
                    $( Self::$variant => $symbol, )*
                }
            }

            /// Returns a list of all canonical operator spellings.
            pub fn names() -> Vec<&'static str> {
                vec![$($symbol),*]
            }
        }

        impl std::fmt::Display for Operator {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.symbol())
            }
        }
    };
}

operators! {
    ColonAssign     => ":=",
    Assign          => "=",
    AddAssign       => "+=",
    SubAssign       => "-=",
    MulAssign       => "*=",
    DivAssign       => "/=",
    ShlAssign       => "<<=",
    ShrAssign       => ">>=",
    Implication     => "->",
    Equivalence     => "<->",
    Increment       => "++",
    Decrement       => "--",
    Equal           => "==",
    NotEqual        => "!=",
    Less            => "<",
    LessEqual       => "<=",
    Greater         => ">",
    GreaterEqual    => ">=",
    LogicalAnd      => "&&",
    LogicalOr       => "||",
    ShiftLeft       => "<<",
    ShiftRight      => ">>",
    Plus            => "+",
    Minus           => "-",
    Star            => "*",
    Slash           => "/",
    Caret           => "^",
    Percent         => "%",
    Bang            => "!",
    Tilde           => "~",
    Ampersand       => "&",
    Pipe            => "|",
}

/// Map of every operator spelling, including the unicode aliases.
static OPERATORS: Map<&'static str, Operator> = phf_map! {
    ":="  => Operator::ColonAssign,
    "="   => Operator::Assign,
    "+="  => Operator::AddAssign,
    "-="  => Operator::SubAssign,
    "*="  => Operator::MulAssign,
    "/="  => Operator::DivAssign,
    "<<=" => Operator::ShlAssign,
    ">>=" => Operator::ShrAssign,
    "->"  => Operator::Implication,
    "→"   => Operator::Implication,
    "<->" => Operator::Equivalence,
    "↔"   => Operator::Equivalence,
    "++"  => Operator::Increment,
    "--"  => Operator::Decrement,
    "=="  => Operator::Equal,
    "!="  => Operator::NotEqual,
    "<"   => Operator::Less,
    "<="  => Operator::LessEqual,
    ">"   => Operator::Greater,
    ">="  => Operator::GreaterEqual,
    "&&"  => Operator::LogicalAnd,
    "||"  => Operator::LogicalOr,
    "<<"  => Operator::ShiftLeft,
    ">>"  => Operator::ShiftRight,
    "+"   => Operator::Plus,
    "-"   => Operator::Minus,
    "*"   => Operator::Star,
    "/"   => Operator::Slash,
    "^"   => Operator::Caret,
    "%"   => Operator::Percent,
    "!"   => Operator::Bang,
    "~"   => Operator::Tilde,
    "¬"   => Operator::Tilde,
    "&"   => Operator::Ampersand,
    "∧"   => Operator::Ampersand,
    "|"   => Operator::Pipe,
    "∨"   => Operator::Pipe,
};

/// The longest operator spelling, in characters.
const MAX_OPERATOR_LEN: usize = 3;

#[doc(hidden)]
/// Internal macro to define the keywords with their canonical spelling.
macro_rules! keywords {
    ($( $variant:ident => $name:literal ),* $(,)?) => {
        /// Reserved words of the language.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Keyword {
            $( $variant ),*
        }

        impl Keyword {
            /// Returns the canonical spelling of the keyword.
            pub fn name(&self) -> &'static str {
                match self {
                    $( Self::$variant => $name, )*
                }
            }
        }

        impl std::fmt::Display for Keyword {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.name())
            }
        }
    };
}

keywords! {
    True        => "true",
    False       => "false",
    And         => "and",
    Or          => "or",
    Xor         => "xor",
    Nand        => "nand",
    Nor         => "nor",
    Not         => "not",
    If          => "if",
    For         => "for",
    While       => "while",
    Mod         => "mod",
    Eq          => "eq",
    Impl        => "impl",
    Define      => "def",
    Undefine    => "undef",
    Degree      => "deg",
    Radian      => "rad",
    Gradian     => "grad",
}

/// Map of lower-cased keyword spellings.
static KEYWORDS: Map<&'static str, Keyword> = phf_map! {
    "true"      => Keyword::True,
    "false"     => Keyword::False,
    "and"       => Keyword::And,
    "or"        => Keyword::Or,
    "xor"       => Keyword::Xor,
    "nand"      => Keyword::Nand,
    "nor"       => Keyword::Nor,
    "not"       => Keyword::Not,
    "if"        => Keyword::If,
    "for"       => Keyword::For,
    "while"     => Keyword::While,
    "mod"       => Keyword::Mod,
    "eq"        => Keyword::Eq,
    "impl"      => Keyword::Impl,
    "def"       => Keyword::Define,
    "define"    => Keyword::Define,
    "undef"     => Keyword::Undefine,
    "undefine"  => Keyword::Undefine,
    "deg"       => Keyword::Degree,
    "degree"    => Keyword::Degree,
    "degrees"   => Keyword::Degree,
    "rad"       => Keyword::Radian,
    "radian"    => Keyword::Radian,
    "radians"   => Keyword::Radian,
    "grad"      => Keyword::Gradian,
    "gradian"   => Keyword::Gradian,
    "gradians"  => Keyword::Gradian,
};

/// The classified content of a token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Number literal in any base, already converted.
    Number(f64),

    /// Name of a variable, constant, unit or function, in its original case.
    Identifier(String),

    /// Content of a quoted string, without its quotes.
    Str(String),

    Symbol(Symbol),

    Operator(Operator),

    Keyword(Keyword),
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Identifier(name) => write!(f, "{}", name),
            Self::Str(s) => write!(f, "'{}'", s),
            Self::Symbol(s) => write!(f, "{}", s),
            Self::Operator(op) => write!(f, "{}", op),
            Self::Keyword(kw) => write!(f, "{}", kw),
        }
    }
}

/// A single token extracted from the input string.
///
/// A `Token` stores its kind and its span (start..end byte indices) within
/// the original input string.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    kind: TokenKind,
    span: Range<usize>,
}

impl Token {
    /// Create a new `Token`.
    ///
    /// # Arguments
    ///
    /// * `kind` - The classified content of the token.
    /// * `span` - The byte range of the token in the original input string.
    pub fn new(kind: TokenKind, span: Range<usize>) -> Self {
        Self { kind, span }
    }

    /// Returns the kind of the token.
    pub fn kind(&self) -> &TokenKind {
        &self.kind
    }

    /// Returns the start index of the token in the original input string.
    pub fn start(&self) -> usize {
        self.span.start
    }

    /// Returns the end index of the token in the original input string.
    pub fn end(&self) -> usize {
        self.span.end
    }

    /// Returns the span of the token in the original input string.
    pub fn span(&self) -> &Range<usize> {
        &self.span
    }

    /// Returns `true` if the token is the given symbol.
    pub fn is_symbol(&self, symbol: Symbol) -> bool {
        self.kind == TokenKind::Symbol(symbol)
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{kind} at {start}..{end}", kind=self.kind, start=self.span.start, end=self.span.end)
    }
}

/// Type alias for a collection of tokens.
pub type Tokens = Vec<Token>;

type Chars = [(usize, char)];

/// Checks once, over the whole input, that every bracket and brace is closed by its pair.
///
/// Quoted strings are skipped so that brackets inside them are not counted.
fn check_brackets(text: &str) -> Result<(), TokenizeError> {
    let mut stack: Vec<(char, usize)> = Vec::new();
    let mut chars = text.char_indices();

    while let Some((pos, ch)) = chars.next() {
        match ch {
            '\'' | '"' => {
                if !chars.any(|(_, c)| c == ch) {
                    break;
                }
            },
            '(' | '{' => stack.push((ch, pos)),
            ')' | '}' => {
                let (open, _) = stack.pop()
                    .ok_or(TokenizeError::UnbalancedBrackets { position: pos })?;
                let expected = if open == '(' { ')' } else { '}' };
                if ch != expected {
                    return Err(TokenizeError::MismatchedBrackets { open, close: ch, position: pos });
                }
            },
            _ => {},
        }
    }

    match stack.last() {
        Some(&(_, position)) => Err(TokenizeError::UnbalancedBrackets { position }),
        None => Ok(()),
    }
}

/// Matches a fixed symbol at `idx`.
///
/// A `:` directly followed by `=` is left for the operator `:=`.
fn match_symbol(chars: &Chars, idx: usize) -> Option<Symbol> {
    let symbol = Symbol::from(chars[idx].1)?;
    if symbol == Symbol::Colon && chars.get(idx + 1).map(|c| c.1) == Some('=') {
        return None;
    }
    Some(symbol)
}

/// Matches the longest operator spelling starting at `idx`.
///
/// # Returns
///
/// The operator and the number of characters it spans.
fn match_operator(chars: &Chars, idx: usize) -> Option<(Operator, usize)> {
    (1..=MAX_OPERATOR_LEN).rev()
        .filter(|len| idx + len <= chars.len())
        .find_map(|len| {
            let spelling: String = chars[idx..idx + len].iter().map(|c| c.1).collect();
            OPERATORS.get(spelling.as_str()).map(|op| (*op, len))
        })
}

/// Reads a quoted string starting at `idx`.
///
/// # Returns
///
/// The content between the quotes and the index after the closing quote,
/// or `None` if the string is never closed.
fn read_string(chars: &Chars, idx: usize) -> Option<(String, usize)> {
    let quote = chars[idx].1;
    let close = chars[idx + 1..].iter().position(|c| c.1 == quote)? + idx + 1;
    let content = chars[idx + 1..close].iter().map(|c| c.1).collect();
    Some((content, close + 1))
}

/// Reads a keyword or identifier run starting at `idx`.
fn read_word(chars: &Chars, idx: usize) -> usize {
    let mut end = idx + 1;
    while end < chars.len() && (chars[end].1.is_alphanumeric() || chars[end].1 == '_') {
        end += 1;
    }
    end
}

fn skip_digits(chars: &Chars, mut idx: usize, radix: u32) -> usize {
    while idx < chars.len() && chars[idx].1.is_digit(radix) {
        idx += 1;
    }
    idx
}

/// Scanner for number literals over the collected characters of the input.
struct NumberScanner<'a> {
    text: &'a str,
    chars: &'a Chars,
}

impl<'a> NumberScanner<'a> {
    fn peek(&self, idx: usize) -> Option<char> {
        self.chars.get(idx).map(|c| c.1)
    }

    fn byte_at(&self, idx: usize) -> usize {
        self.chars.get(idx).map_or(self.text.len(), |c| c.0)
    }

    fn malformed(&self, start: usize, end: usize) -> TokenizeError {
        let position = self.byte_at(start);
        TokenizeError::MalformedNumber {
            text: self.text[position..self.byte_at(end)].to_string(),
            position,
        }
    }

    /// Reads the number literal starting at `idx`.
    ///
    /// # Returns
    ///
    /// The value of the literal and the index after it.
    fn scan(&self, idx: usize) -> Result<(f64, usize), TokenizeError> {
        if self.peek(idx) == Some('0') {
            match self.peek(idx + 1).map(|c| c.to_ascii_lowercase()) {
                Some('b') => return self.scan_radix(idx, 2),
                Some('x') => return self.scan_radix(idx, 16),
                Some(c) if c.is_ascii_digit() => {
                    let end = skip_digits(self.chars, idx + 1, 10);
                    if self.peek(end) != Some('.') {
                        return self.scan_octal(idx, end);
                    }
                },
                _ => {},
            }
        }
        self.scan_decimal(idx)
    }

    fn scan_radix(&self, idx: usize, radix: u32) -> Result<(f64, usize), TokenizeError> {
        let digits_start = idx + 2;
        let end = skip_digits(self.chars, digits_start, radix);
        if end == digits_start {
            return Err(self.malformed(idx, end));
        }
        let digits = &self.text[self.byte_at(digits_start)..self.byte_at(end)];
        let value = u64::from_str_radix(digits, radix)
            .map_err(|_| self.malformed(idx, end))?;
        Ok((value as f64, end))
    }

    fn scan_octal(&self, idx: usize, end: usize) -> Result<(f64, usize), TokenizeError> {
        let digits = &self.text[self.byte_at(idx + 1)..self.byte_at(end)];
        let value = u64::from_str_radix(digits, 8)
            .map_err(|_| self.malformed(idx, end))?;
        Ok((value as f64, end))
    }

    fn scan_decimal(&self, idx: usize) -> Result<(f64, usize), TokenizeError> {
        let mut end = skip_digits(self.chars, idx, 10);

        if self.peek(end) == Some('.') {
            match self.peek(end + 1) {
                Some(c) if c.is_ascii_digit() => end = skip_digits(self.chars, end + 1, 10),
                _ => return Err(self.malformed(idx, end + 1)),
            }
        }

        // an exponent marker without digits ends the literal, e.g. `2e` is `2 * e`
        if matches!(self.peek(end), Some('e') | Some('E')) {
            match (self.peek(end + 1), self.peek(end + 2)) {
                (Some(d), _) if d.is_ascii_digit()
                    => end = skip_digits(self.chars, end + 1, 10),
                (Some('+') | Some('-'), Some(d)) if d.is_ascii_digit()
                    => end = skip_digits(self.chars, end + 2, 10),
                _ => {},
            }
        }

        let literal = &self.text[self.byte_at(idx)..self.byte_at(end)];
        let value = literal.parse::<f64>()
            .map_err(|_| self.malformed(idx, end))?;
        Ok((value, end))
    }
}

/// Classifies a word as a keyword or a plain identifier.
fn classify_word(word: &str) -> TokenKind {
    match KEYWORDS.get(word.to_lowercase().as_str()) {
        Some(keyword) => TokenKind::Keyword(*keyword),
        None => TokenKind::Identifier(word.to_string()),
    }
}

/// Splits the input string into a sequence of `Token`s.
///
/// # Arguments
///
/// * `text` - The input string to tokenize.
///
/// # Returns
///
/// The tokens in source order, or a [`TokenizeError`] describing the first problem found.
/// Bracket balance is checked before any token is produced.
pub fn tokenize(text: &str) -> Result<Tokens, TokenizeError> {
    check_brackets(text)?;

    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let scanner = NumberScanner { text, chars: &chars };
    let mut tokens = Tokens::new();
    let mut idx = 0;

    while idx < chars.len() {
        let (start, ch) = chars[idx];
        if ch.is_whitespace() {
            idx += 1;
            continue;
        }

        let (kind, next) = if let Some(symbol) = match_symbol(&chars, idx) {
            (TokenKind::Symbol(symbol), idx + 1)
        } else if ch == '\'' || ch == '"' {
            let (content, next) = read_string(&chars, idx)
                .ok_or(TokenizeError::UnterminatedString { position: start })?;
            (TokenKind::Str(content), next)
        } else if let Some((op, len)) = match_operator(&chars, idx) {
            (TokenKind::Operator(op), idx + len)
        } else if ch.is_ascii_digit() {
            let (value, next) = scanner.scan(idx)?;
            (TokenKind::Number(value), next)
        } else if ch.is_alphabetic() || ch == '_' {
            let next = read_word(&chars, idx);
            (classify_word(&text[start..scanner.byte_at(next)]), next)
        } else {
            return Err(TokenizeError::UnsupportedSymbol { symbol: ch, position: start });
        };

        tokens.push(Token::new(kind, start..scanner.byte_at(next)));
        idx = next;
    }

    log::trace!("tokenized {} characters into {} tokens", chars.len(), tokens.len());
    Ok(tokens)
}

#[cfg(test)]
mod lexer_tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).unwrap().into_iter().map(|t| t.kind).collect()
    }

    fn number(input: &str) -> f64 {
        match kinds(input).as_slice() {
            [TokenKind::Number(n)] => *n,
            other => panic!("expected a single number, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_and_whitespace() {
        assert!(tokenize("").unwrap().is_empty());
        assert!(tokenize("   \t\n  ").unwrap().is_empty());
    }

    #[test]
    fn test_number_bases() {
        assert_eq!(number("0xFF"), 255.0);
        assert_eq!(number("0b101"), 5.0);
        assert_eq!(number("017"), 15.0);
        assert_eq!(number("0"), 0.0);
        assert_eq!(number("0.25"), 0.25);
        assert_eq!(number("1.5e3"), 1500.0);
        assert_eq!(number("2E-2"), 0.02);
        assert_eq!(number("42"), 42.0);
    }

    #[test]
    fn test_exponent_without_digits_ends_the_number() {
        assert_eq!(kinds("2e"), vec![TokenKind::Number(2.0), TokenKind::Identifier("e".into())]);
        assert_eq!(
            kinds("2e+x"),
            vec![
                TokenKind::Number(2.0),
                TokenKind::Identifier("e".into()),
                TokenKind::Operator(Operator::Plus),
                TokenKind::Identifier("x".into()),
            ]
        );
    }

    #[test]
    fn test_malformed_numbers() {
        assert!(matches!(tokenize("1."), Err(TokenizeError::MalformedNumber { .. })));
        assert!(matches!(tokenize("0b"), Err(TokenizeError::MalformedNumber { .. })));
        assert!(matches!(tokenize("0x"), Err(TokenizeError::MalformedNumber { .. })));
        assert!(matches!(tokenize("019"), Err(TokenizeError::MalformedNumber { .. })));
    }

    #[test]
    fn test_operators_longest_match() {
        assert_eq!(kinds("<->"), vec![TokenKind::Operator(Operator::Equivalence)]);
        assert_eq!(kinds("<="), vec![TokenKind::Operator(Operator::LessEqual)]);
        assert_eq!(kinds("<<="), vec![TokenKind::Operator(Operator::ShlAssign)]);
        assert_eq!(
            kinds("< <"),
            vec![TokenKind::Operator(Operator::Less), TokenKind::Operator(Operator::Less)]
        );
        assert_eq!(kinds("→"), vec![TokenKind::Operator(Operator::Implication)]);
        assert_eq!(kinds("¬"), vec![TokenKind::Operator(Operator::Tilde)]);
    }

    #[test]
    fn test_colon_and_assignment() {
        assert_eq!(kinds(":="), vec![TokenKind::Operator(Operator::ColonAssign)]);
        assert_eq!(kinds(":"), vec![TokenKind::Symbol(Symbol::Colon)]);
        assert_eq!(
            kinds("a ? b : c"),
            vec![
                TokenKind::Identifier("a".into()),
                TokenKind::Symbol(Symbol::Question),
                TokenKind::Identifier("b".into()),
                TokenKind::Symbol(Symbol::Colon),
                TokenKind::Identifier("c".into()),
            ]
        );
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        assert_eq!(kinds("TRUE"), vec![TokenKind::Keyword(Keyword::True)]);
        assert_eq!(kinds("Degrees"), vec![TokenKind::Keyword(Keyword::Degree)]);
        assert_eq!(kinds("define"), vec![TokenKind::Keyword(Keyword::Define)]);
        assert_eq!(kinds("XoR"), vec![TokenKind::Keyword(Keyword::Xor)]);
    }

    #[test]
    fn test_identifiers_keep_their_case() {
        assert_eq!(kinds("Foo_1"), vec![TokenKind::Identifier("Foo_1".into())]);
        assert_eq!(kinds("π"), vec![TokenKind::Identifier("π".into())]);
    }

    #[test]
    fn test_strings() {
        assert_eq!(kinds("'km'"), vec![TokenKind::Str("km".into())]);
        assert_eq!(kinds("\"a b\""), vec![TokenKind::Str("a b".into())]);
        assert_eq!(
            tokenize("'abc"),
            Err(TokenizeError::UnterminatedString { position: 0 })
        );
    }

    #[test]
    fn test_brackets_are_checked_up_front() {
        assert_eq!(tokenize("(2+3"), Err(TokenizeError::UnbalancedBrackets { position: 0 }));
        assert_eq!(tokenize("2+3)"), Err(TokenizeError::UnbalancedBrackets { position: 3 }));
        assert!(matches!(tokenize("(1}"), Err(TokenizeError::MismatchedBrackets { .. })));
        // brackets inside strings are not counted
        assert!(tokenize("convert(1, ')')").is_ok());
        // an unbalanced input fails even if it also has an unsupported symbol
        assert_eq!(tokenize("($"), Err(TokenizeError::UnbalancedBrackets { position: 0 }));
    }

    #[test]
    fn test_unsupported_symbol() {
        assert_eq!(tokenize("2 $ 3"), Err(TokenizeError::UnsupportedSymbol { symbol: '$', position: 2 }));
        assert_eq!(tokenize(".5"), Err(TokenizeError::UnsupportedSymbol { symbol: '.', position: 0 }));
    }

    #[test]
    fn test_spans() {
        let tokens = tokenize("sin(30°)").unwrap();
        let spans: Vec<_> = tokens.iter().map(|t| t.span().clone()).collect();
        assert_eq!(spans, vec![0..3, 3..4, 4..6, 6..8, 8..9]);
        assert_eq!(tokens[2].to_string(), "30 at 4..6");
    }
}
