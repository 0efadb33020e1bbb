//! Slot values.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Textual form of an absent slot.
pub const NIL: &str = "nil";

/// The value held by a chunk slot.
///
/// Symbols refer to other chunks by name; the memory store owns the chunks
/// themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// Reference to a chunk, by name.
    Symbol(String),
    /// Numeric value.
    Number(f64),
    /// Literal text.
    Text(String),
}

impl Value {
    /// Stand-in for a missing slot during matching.
    pub fn nil() -> Self {
        Value::Text(NIL.to_string())
    }

    /// Resolve raw text into a value.
    ///
    /// The policy is ordered: text that parses as a finite number becomes
    /// `Number`; otherwise text naming a known chunk becomes `Symbol`;
    /// anything else stays `Text`.
    ///
    /// ```
    /// use prims_core::types::Value;
    ///
    /// let known = |name: &str| name == "seven";
    /// assert_eq!(Value::resolve("7", known), Value::Number(7.0));
    /// assert_eq!(Value::resolve("seven", known), Value::Symbol("seven".into()));
    /// assert_eq!(Value::resolve("eight", known), Value::Text("eight".into()));
    /// ```
    pub fn resolve(text: &str, is_chunk: impl Fn(&str) -> bool) -> Self {
        match text.trim().parse::<f64>() {
            Ok(number) if number.is_finite() => Value::Number(number),
            _ if is_chunk(text) => Value::Symbol(text.to_string()),
            _ => Value::Text(text.to_string()),
        }
    }

    /// Type tag used by the matcher: `symbol`, `number` or `text`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Symbol(_) => "symbol",
            Value::Number(_) => "number",
            Value::Text(_) => "text",
        }
    }

    /// Textual form, also used for chunk equality and persistence.
    pub fn description(&self) -> String {
        self.to_string()
    }

    /// Same tag and same payload.
    pub fn is_equal(&self, other: &Value) -> bool {
        self == other
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Text(s) if s == NIL)
    }

    /// Chunk name when this is a symbol.
    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Value::Symbol(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Symbol(name) => write!(f, "{}", name),
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_wins_over_chunk_name() {
        let value = Value::resolve("3", |_| true);
        assert_eq!(value, Value::Number(3.0));
    }

    #[test]
    fn test_non_finite_text_is_not_numeric() {
        assert_eq!(Value::resolve("nan", |_| false), Value::Text("nan".into()));
        assert_eq!(Value::resolve("inf", |_| false), Value::Text("inf".into()));
    }

    #[test]
    fn test_description_of_integral_number() {
        assert_eq!(Value::Number(3.0).description(), "3");
        assert_eq!(Value::Number(2.5).description(), "2.5");
    }

    #[test]
    fn test_type_sensitive_equality() {
        assert!(!Value::Symbol("a".into()).is_equal(&Value::Text("a".into())));
        assert!(Value::Symbol("a".into()).is_equal(&Value::Symbol("a".into())));
        assert!(Value::nil().is_nil());
        assert!(!Value::Symbol(NIL.into()).is_nil());
    }

    #[test]
    fn test_serde_is_tagged() {
        let json = serde_json::to_string(&Value::Symbol("goal1".into())).unwrap();
        assert_eq!(json, r#"{"type":"symbol","value":"goal1"}"#);
    }
}
