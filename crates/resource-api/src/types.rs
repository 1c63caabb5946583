//! Attribute type expressions
//!
//! Attribute types are written in the host's type language, e.g.
//! `Enum[present, absent]` or `Variant[Stdlib::Absolutepath, Pattern[/\A(https?|ftp):\/\//]]`.
//! [`TypeSpec::parse`] turns such a string into a [`TypeSpec`] that can check
//! and coerce ("munge") values before they reach a provider.

use regex::Regex;
use serde_json::{Map, Number, Value, json};
use std::fmt;
use std::sync::LazyLock;

use crate::error::{Error, Result};

/// Unix absolute path, Windows drive path or UNC path
const ABSOLUTE_PATH_PATTERN: &str = r"^(/|[a-zA-Z]:[\\/]|\\\\)";

static ABSOLUTE_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(ABSOLUTE_PATH_PATTERN).expect("absolute path pattern is a valid regex")
});

/// A parsed attribute type
#[derive(Debug, Clone)]
pub enum TypeSpec {
    Any,
    String,
    Boolean,
    Integer,
    Float,
    Numeric,
    Enum(Vec<String>),
    Pattern(Vec<PatternLiteral>),
    Optional(Box<TypeSpec>),
    Variant(Vec<TypeSpec>),
    AbsolutePath,
}

/// A `/regex/` literal as written in a type expression
#[derive(Debug, Clone)]
pub struct PatternLiteral {
    source: String,
    regex: Regex,
}

impl PatternLiteral {
    fn new(source: String) -> std::result::Result<Self, String> {
        let translated = translate_regex(&source);
        let regex = Regex::new(&translated).map_err(|e| e.to_string())?;
        Ok(Self { source, regex })
    }

    /// The regex as written between the slashes
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// Rewrite a Ruby-flavoured regex body for the `regex` crate.
///
/// `\/` is an escaped delimiter, `\Z` anchors at the end of the text and
/// `\h` is a hex digit.
fn translate_regex(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('/') => out.push('/'),
            Some('Z') => out.push_str(r"\z"),
            Some('h') => out.push_str("[0-9a-fA-F]"),
            Some('H') => out.push_str("[^0-9a-fA-F]"),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Rewrite a Ruby-flavoured regex body as an ECMA 262 pattern for JSON Schema.
///
/// Anchors become `^`/`$` and hex classes are spelled out.
fn ecma_regex(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('/') => out.push('/'),
            Some('A') => out.push('^'),
            Some('Z' | 'z') => out.push('$'),
            Some('h') => out.push_str("[0-9a-fA-F]"),
            Some('H') => out.push_str("[^0-9a-fA-F]"),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// A value that did not match its declared type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub expected: String,
    pub actual: String,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expects {}, got {}", self.expected, self.actual)
    }
}

impl TypeSpec {
    /// Parse a type expression
    pub fn parse(expr: &str) -> Result<Self> {
        let mut parser = Parser {
            expr,
            chars: expr.chars().collect(),
            pos: 0,
        };
        let spec = parser.parse_type()?;
        parser.skip_ws();
        if parser.pos < parser.chars.len() {
            return Err(parser.error("unexpected trailing input"));
        }
        Ok(spec)
    }

    /// Check `value` against this type, returning the coerced value
    pub fn munge(&self, value: &Value) -> std::result::Result<Value, Mismatch> {
        let munged = match (self, value) {
            (Self::Any, v) => Some(v.clone()),
            (Self::String, Value::String(_)) => Some(value.clone()),
            (Self::Boolean, Value::Bool(_)) => Some(value.clone()),
            (Self::Boolean, Value::String(s)) => match s.as_str() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            (Self::Integer, Value::Number(n)) if n.is_i64() || n.is_u64() => Some(value.clone()),
            (Self::Integer, Value::String(s)) => parse_integer(s).map(Value::from),
            (Self::Float | Self::Numeric, Value::Number(_)) => Some(value.clone()),
            (Self::Float | Self::Numeric, Value::String(s)) => parse_number(s).map(Value::Number),
            (Self::Enum(words), Value::String(s)) => {
                words.iter().any(|w| w == s).then(|| value.clone())
            }
            (Self::Pattern(patterns), Value::String(s)) => {
                patterns.iter().any(|p| p.is_match(s)).then(|| value.clone())
            }
            (Self::Optional(_), Value::Null) => Some(Value::Null),
            (Self::Optional(inner), v) => inner.munge(v).ok(),
            (Self::Variant(options), v) => options.iter().find_map(|t| t.munge(v).ok()),
            (Self::AbsolutePath, Value::String(s)) => {
                ABSOLUTE_PATH.is_match(s).then(|| value.clone())
            }
            _ => None,
        };

        munged.ok_or_else(|| Mismatch {
            expected: self.expectation(),
            actual: describe_value(value),
        })
    }

    /// Whether `null` is an acceptable value
    pub fn is_optional(&self) -> bool {
        match self {
            Self::Any | Self::Optional(_) => true,
            Self::Variant(options) => options.iter().any(Self::is_optional),
            _ => false,
        }
    }

    fn expectation(&self) -> String {
        match self {
            Self::Enum(_) | Self::Pattern(_) | Self::Variant(_) | Self::AbsolutePath => {
                format!("a match for {self}")
            }
            Self::Optional(_) => format!("a value of type {self}"),
            _ => format!("a {self} value"),
        }
    }

    /// JSON Schema fragment accepting the canonical (munged) values of this type
    pub fn json_schema(&self) -> Value {
        match self {
            Self::Any => json!({}),
            Self::String => json!({ "type": "string" }),
            Self::Boolean => json!({ "type": "boolean" }),
            Self::Integer => json!({ "type": "integer" }),
            Self::Float | Self::Numeric => json!({ "type": "number" }),
            Self::Enum(words) => json!({ "type": "string", "enum": words }),
            Self::Pattern(patterns) => {
                let mut alternatives: Vec<Value> = patterns
                    .iter()
                    .map(|p| json!({ "type": "string", "pattern": ecma_regex(&p.source) }))
                    .collect();
                if alternatives.len() == 1 {
                    alternatives.remove(0)
                } else {
                    json!({ "anyOf": alternatives })
                }
            }
            Self::Optional(inner) => {
                json!({ "anyOf": [inner.json_schema(), { "type": "null" }] })
            }
            Self::Variant(options) => {
                let alternatives: Vec<Value> = options.iter().map(Self::json_schema).collect();
                json!({ "anyOf": alternatives })
            }
            Self::AbsolutePath => json!({ "type": "string", "pattern": ABSOLUTE_PATH_PATTERN }),
        }
    }
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "Any"),
            Self::String => write!(f, "String"),
            Self::Boolean => write!(f, "Boolean"),
            Self::Integer => write!(f, "Integer"),
            Self::Float => write!(f, "Float"),
            Self::Numeric => write!(f, "Numeric"),
            Self::Enum(words) => write!(f, "Enum[{}]", words.join(", ")),
            Self::Pattern(patterns) => {
                let sources: Vec<String> =
                    patterns.iter().map(|p| format!("/{}/", p.source)).collect();
                write!(f, "Pattern[{}]", sources.join(", "))
            }
            Self::Optional(inner) => write!(f, "Optional[{inner}]"),
            Self::Variant(options) => {
                let parts: Vec<String> = options.iter().map(ToString::to_string).collect();
                write!(f, "Variant[{}]", parts.join(", "))
            }
            Self::AbsolutePath => write!(f, "Stdlib::Absolutepath"),
        }
    }
}

/// Whether `path` is a Unix, Windows drive or UNC absolute path
pub fn is_absolute_path(path: &str) -> bool {
    ABSOLUTE_PATH.is_match(path)
}

fn parse_integer(s: &str) -> Option<i64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn parse_number(s: &str) -> Option<Number> {
    if let Ok(i) = s.parse::<i64>() {
        return Some(Number::from(i));
    }
    s.parse::<f64>().ok().and_then(Number::from_f64)
}

/// Describe a value for mismatch messages
pub fn describe_value(value: &Value) -> String {
    match value {
        Value::Null => "Undef".to_string(),
        Value::Bool(b) => format!("Boolean {b}"),
        Value::Number(n) if n.is_f64() => format!("Float {n}"),
        Value::Number(n) => format!("Integer {n}"),
        Value::String(s) => format!("'{s}'"),
        Value::Array(_) => "Array".to_string(),
        Value::Object(_) => "Hash".to_string(),
    }
}

struct Parser<'a> {
    expr: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl Parser<'_> {
    fn error(&self, message: &str) -> Error {
        Error::TypeParse {
            expr: self.expr.to_string(),
            message: format!("{message} at offset {}", self.pos),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, c: char) -> Result<()> {
        self.skip_ws();
        if self.peek() == Some(c) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected '{c}'")))
        }
    }

    fn name(&mut self) -> String {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
        {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn parse_type(&mut self) -> Result<TypeSpec> {
        self.skip_ws();
        let name = self.name();
        let spec = match name.as_str() {
            "Any" => TypeSpec::Any,
            "String" => TypeSpec::String,
            "Boolean" => TypeSpec::Boolean,
            "Integer" => TypeSpec::Integer,
            "Float" => TypeSpec::Float,
            "Numeric" => TypeSpec::Numeric,
            "Stdlib::Absolutepath" => TypeSpec::AbsolutePath,
            "Enum" => TypeSpec::Enum(self.arguments(Self::enum_word)?),
            "Pattern" => TypeSpec::Pattern(self.arguments(Self::pattern)?),
            "Optional" => {
                let mut inner = self.arguments(Self::parse_type)?;
                if inner.len() != 1 {
                    return Err(self.error("Optional takes exactly one type"));
                }
                TypeSpec::Optional(Box::new(inner.remove(0)))
            }
            "Variant" => TypeSpec::Variant(self.arguments(Self::parse_type)?),
            "" => return Err(self.error("expected a type name")),
            other => return Err(self.error(&format!("unsupported type '{other}'"))),
        };
        Ok(spec)
    }

    /// Parse `[item, item, ...]` with at least one item
    fn arguments<T>(&mut self, item: fn(&mut Self) -> Result<T>) -> Result<Vec<T>> {
        self.expect('[')?;
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            items.push(item(self)?);
            self.skip_ws();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(']') => {
                    self.pos += 1;
                    return Ok(items);
                }
                _ => return Err(self.error("expected ',' or ']'")),
            }
        }
    }

    fn enum_word(&mut self) -> Result<String> {
        match self.peek() {
            Some(quote @ ('\'' | '"')) => {
                self.pos += 1;
                let start = self.pos;
                while self.peek().is_some_and(|c| c != quote) {
                    self.pos += 1;
                }
                if self.peek().is_none() {
                    return Err(self.error("unterminated string"));
                }
                let word: String = self.chars[start..self.pos].iter().collect();
                self.pos += 1;
                Ok(word)
            }
            _ => {
                let start = self.pos;
                while self
                    .peek()
                    .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
                {
                    self.pos += 1;
                }
                if start == self.pos {
                    return Err(self.error("expected an enum value"));
                }
                Ok(self.chars[start..self.pos].iter().collect())
            }
        }
    }

    fn pattern(&mut self) -> Result<PatternLiteral> {
        if self.peek() != Some('/') {
            return Err(self.error("expected a /regex/ literal"));
        }
        self.pos += 1;
        let mut source = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated regex")),
                Some('/') => {
                    self.pos += 1;
                    break;
                }
                Some('\\') => {
                    source.push('\\');
                    self.pos += 1;
                    if let Some(escaped) = self.peek() {
                        source.push(escaped);
                        self.pos += 1;
                    }
                }
                Some(c) => {
                    source.push(c);
                    self.pos += 1;
                }
            }
        }
        PatternLiteral::new(source).map_err(|e| self.error(&format!("invalid regex: {e}")))
    }
}

/// Merge `overlay` on top of `base`, keys in `overlay` win
pub fn merge_hashes(base: &Map<String, Value>, overlay: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = base.clone();
    for (key, value) in overlay {
        merged.insert(key.clone(), value.clone());
    }
    merged
}
