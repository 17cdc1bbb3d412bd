//! Decoded record schema definitions.

use serde::Serialize;
use serde_json::Value;

/// A single value in an outlet call.
///
/// JSON numbers that fit in an `i64` become [`OutletValue::Int`], every other
/// number becomes [`OutletValue::Float`]. Nested arrays and objects are kept
/// untouched in [`OutletValue::Raw`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutletValue {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Nil,
    Raw(Value),
}

impl OutletValue {
    /// Borrow the string payload, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            OutletValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<Value> for OutletValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => OutletValue::Nil,
            Value::Bool(b) => OutletValue::Bool(b),
            Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => OutletValue::Int(i),
                (None, Some(f)) => OutletValue::Float(f),
                (None, None) => OutletValue::Raw(Value::Number(n)),
            },
            Value::String(s) => OutletValue::Str(s),
            composite @ (Value::Array(_) | Value::Object(_)) => OutletValue::Raw(composite),
        }
    }
}

impl From<&str> for OutletValue {
    fn from(s: &str) -> Self {
        OutletValue::Str(s.to_string())
    }
}

impl From<String> for OutletValue {
    fn from(s: String) -> Self {
        OutletValue::Str(s)
    }
}

impl From<i64> for OutletValue {
    fn from(v: i64) -> Self {
        OutletValue::Int(v)
    }
}

impl From<f64> for OutletValue {
    fn from(v: f64) -> Self {
        OutletValue::Float(v)
    }
}

/// One `(address, args)` pair produced by the decoder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedRecord {
    /// Routing address, e.g. `/hand/0/left`. Never empty.
    pub address: String,
    /// Arguments in producer order.
    pub args: Vec<OutletValue>,
}

impl DecodedRecord {
    pub fn new(address: impl Into<String>, args: Vec<OutletValue>) -> Self {
        Self {
            address: address.into(),
            args,
        }
    }

    /// Flatten into the value list handed to an outlet: address first.
    pub fn into_outlet_values(self) -> Vec<OutletValue> {
        let mut values = Vec::with_capacity(self.args.len() + 1);
        values.push(OutletValue::Str(self.address));
        values.extend(self.args);
        values
    }
}
