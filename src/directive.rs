//! Directive model
//!
//! A directive is a single `;`-terminated statement. Its tokens are sorted
//! into positional and keyword (`key=value`) arguments, with unquoted
//! values coerced into booleans and integers.

use crate::lexer::Token;
use indexmap::IndexMap;
use smallvec::SmallVec;
use std::fmt;
use tracing::debug;

/// A coerced argument value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scalar {
    Bool(bool),
    Integer(i64),
    String(String),
}

impl Scalar {
    /// Coerces an unquoted literal
    ///
    /// `on` and `off` become booleans and a run of decimal digits becomes
    /// an integer. Digit runs too large for `i64` stay strings.
    pub fn coerce(literal: &str) -> Self {
        match literal {
            "on" => Scalar::Bool(true),
            "off" => Scalar::Bool(false),
            _ if is_decimal(literal) => literal
                .parse()
                .map(Scalar::Integer)
                .unwrap_or_else(|_| Scalar::String(literal.to_string())),
            _ => Scalar::String(literal.to_string()),
        }
    }
}

fn is_decimal(literal: &str) -> bool {
    !literal.is_empty() && literal.bytes().all(|b| b.is_ascii_digit())
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Integer(i) => write!(f, "{i}"),
            Scalar::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::String(s.to_string())
    }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self {
        Scalar::Integer(i)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

/// Value of a `key=value` argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeywordValue {
    /// `key=value`
    Single(Scalar),
    /// `key=a:b:c`
    List(Vec<Scalar>),
}

/// Positional arguments; most directives have only a few
pub type Args = SmallVec<[Scalar; 4]>;

/// Keyword arguments in source order
pub type Kwargs = IndexMap<String, KeywordValue>;

/// A named statement with its arguments
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub name: String,
    pub positional_args: Args,
    pub keyword_args: Kwargs,
}

impl Directive {
    /// Builds a directive from the tokens following its name
    pub fn new(name: impl Into<String>, tokens: &[Token<'_>]) -> Self {
        let name = name.into();
        let mut positional_args = Args::new();
        let mut keyword_args = Kwargs::new();

        // bare flag, e.g. "ip_hash"
        if tokens.is_empty() {
            positional_args.push(Scalar::Bool(true));
        }

        for token in tokens {
            if token.is_quoted() {
                positional_args.push(Scalar::String(token.value.to_string()));
            } else if let Some((key, value)) = token.value.split_once('=') {
                let value = if value.contains(':') {
                    KeywordValue::List(value.split(':').map(Scalar::coerce).collect())
                } else {
                    KeywordValue::Single(Scalar::coerce(value))
                };
                keyword_args.insert(key.to_string(), value);
            } else {
                positional_args.push(Scalar::coerce(token.value));
            }
        }

        debug!(
            directive = %name,
            args = positional_args.len(),
            kwargs = keyword_args.len(),
            "parsed"
        );

        Self {
            name,
            positional_args,
            keyword_args,
        }
    }
}
