// src/stringify.rs
use crate::error::CoercionError;
use serde_json::Value;

/// Converts an extracted value into the string a stage should parse.
///
/// Shared by every stage that reads its input from the extracted map, so a
/// stage never decides on its own how numbers or booleans look as text.
pub trait Stringify: Send + Sync {
    fn stringify(&self, value: &Value) -> Result<String, CoercionError>;
}

/// Default coercion: strings pass through, numbers and booleans are
/// formatted, everything else is rejected.
#[derive(Debug, Default, Clone, Copy)]
pub struct ValueStringifier;

impl Stringify for ValueStringifier {
    fn stringify(&self, value: &Value) -> Result<String, CoercionError> {
        match value {
            Value::String(s) => Ok(s.clone()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(i.to_string())
                } else if let Some(u) = n.as_u64() {
                    Ok(u.to_string())
                } else if let Some(f) = n.as_f64() {
                    // Display never switches to exponent notation
                    Ok(format!("{}", f))
                } else {
                    Ok(n.to_string())
                }
            }
            other => Err(CoercionError::Unsupported {
                kind: value_kind(other),
            }),
        }
    }
}

/// Short type name of a JSON value, used in diagnostics
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
