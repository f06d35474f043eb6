//! Evaluated values.

use std::fmt;

use nuance_trousse::CompactString;

use crate::Color;

/// Number with an optional unit (`""` when unitless)
#[derive(Debug, Clone, PartialEq)]
pub struct Number {
    pub value: f64,
    pub unit: CompactString,
}

impl Number {
    pub fn new(value: f64, unit: impl Into<CompactString>) -> Self {
        Self {
            value,
            unit: unit.into(),
        }
    }

    #[inline]
    pub fn unitless(value: f64) -> Self {
        Self::new(value, "")
    }

    /// Parse a literal such as `10px`, `-.5em` or `50%`
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let split = text
            .char_indices()
            .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || (i == 0 && (c == '-' || c == '+'))))
            .map(|(i, _)| i)
            .unwrap_or(text.len());
        let (digits, unit) = text.split_at(split);
        if !unit.is_empty() && unit != "%" && !unit.bytes().all(|b| b.is_ascii_alphabetic()) {
            return None;
        }
        digits.parse::<f64>().ok().map(|value| Self::new(value, unit))
    }

    /// Whether two numbers denote the same quantity
    pub fn same_as(&self, other: &Number) -> bool {
        self.unit.eq_ignore_ascii_case(&other.unit) && (self.value - other.value).abs() < 1e-9
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", format_number(self.value), self.unit)
    }
}

/// How the items of a [`Value::List`] are joined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Separator {
    Space,
    Comma,
    /// Slash kept as literal text, e.g. `14px/20px` in `font`
    Slash,
}

impl Separator {
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Space => " ",
            Self::Comma => ", ",
            Self::Slash => "/",
        }
    }
}

/// Result of evaluating an expression
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(Number),
    Color(Color),
    /// Bare identifier, `!important`, `url(...)`, escaped string contents
    Keyword(CompactString),
    /// Quoted string, printed with its quotes
    Quoted { text: CompactString, quote: char },
    List(Vec<Value>, Separator),
}

impl Value {
    #[inline]
    pub fn number(value: f64, unit: impl Into<CompactString>) -> Self {
        Self::Number(Number::new(value, unit))
    }

    #[inline]
    pub fn keyword(text: impl Into<CompactString>) -> Self {
        Self::Keyword(text.into())
    }

    /// Short name of the value's type, for diagnostics
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Number(_) => "number",
            Self::Color(_) => "color",
            Self::Keyword(_) => "keyword",
            Self::Quoted { .. } => "string",
            Self::List(..) => "list",
        }
    }

    /// Color view of the value; named-color keywords count as colors
    pub fn as_color(&self) -> Option<Color> {
        match self {
            Self::Color(color) => Some(*color),
            Self::Keyword(name) => Color::named(name),
            _ => None,
        }
    }

    #[inline]
    pub fn is_color(&self) -> bool {
        self.as_color().is_some()
    }

    #[inline]
    pub fn as_number(&self) -> Option<&Number> {
        match self {
            Self::Number(n) => Some(n),
            _ => None,
        }
    }

    /// Loose equality against a literal written in a stylesheet.
    ///
    /// Matches when the printed value equals the trimmed literal, when both
    /// are numbers of the same unit and magnitude (`1.0px` == `1px`), or when
    /// both denote the same opaque color.
    pub fn loose_eq(&self, literal: &str) -> bool {
        let literal = literal.trim();
        if literal.is_empty() {
            return false;
        }
        if self.to_string() == literal {
            return true;
        }
        match self {
            Self::Number(n) => Number::parse(literal).is_some_and(|m| n.same_as(&m)),
            Self::Keyword(k) => k.eq_ignore_ascii_case(literal),
            Self::Color(c) => Color::parse(literal).is_some_and(|other| other.to_string() == c.to_string()),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => n.fmt(f),
            Self::Color(c) => c.fmt(f),
            Self::Keyword(k) => f.write_str(k),
            Self::Quoted { text, quote } => write!(f, "{quote}{text}{quote}"),
            Self::List(items, sep) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(sep.as_str())?;
                    }
                    item.fmt(f)?;
                }
                Ok(())
            }
        }
    }
}

/// Print a number with at most 8 fraction digits and no trailing zeros
pub fn format_number(value: f64) -> String {
    let rounded = (value * 1e8).round() / 1e8;
    if rounded == 0.0 {
        return "0".to_string();
    }
    if rounded.fract() == 0.0 && rounded.abs() < 1e15 {
        return format!("{}", rounded as i64);
    }
    let text = format!("{rounded:.8}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}
