//! Request definitions
//!
//! A request is a decoded value that passed shape validation: an array
//! whose first element is a bulk string naming the command.

use crate::error::{Result, TideError};
use super::Value;

/// A validated client request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Uppercased command name
    name: String,

    /// The original request array, kept intact for the AOF
    value: Value,
}

impl Request {
    /// Validate a decoded value as a request
    ///
    /// Fails with `InvalidRequest` for a non-array, an empty array, or an
    /// array whose first element is not a bulk string.
    pub fn from_value(value: Value) -> Result<Self> {
        let name = {
            let items = match &value {
                Value::Array(items) => items,
                other => {
                    return Err(TideError::InvalidRequest(format!(
                        "expected array, got {}",
                        other.kind()
                    )))
                }
            };

            match items.first() {
                Some(Value::BulkString(name)) => String::from_utf8_lossy(name).to_ascii_uppercase(),
                Some(other) => {
                    return Err(TideError::InvalidRequest(format!(
                        "expected bulk string command name, got {}",
                        other.kind()
                    )))
                }
                None => {
                    return Err(TideError::InvalidRequest(
                        "expected array length > 0".to_string(),
                    ))
                }
            }
        };

        Ok(Self { name, value })
    }

    /// Command name, uppercased
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Arguments after the command name
    pub fn args(&self) -> &[Value] {
        match &self.value {
            Value::Array(items) => &items[1..],
            _ => &[],
        }
    }

    /// The request exactly as it was decoded
    pub fn as_value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }
}
