//! RESP value definitions
//!
//! Represents everything that travels over the wire: client requests,
//! replies, and the entries of the append-only file.

use bytes::Bytes;

/// A single RESP value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Short status text, e.g. `+OK`
    SimpleString(String),

    /// Error text, e.g. `-ERR unknown command`
    Error(String),

    /// Signed 64-bit integer
    Integer(i64),

    /// Length-prefixed binary-safe string (may be empty)
    BulkString(Bytes),

    /// The null bulk string (`$-1`), distinct from an empty bulk string
    Null,

    /// Ordered sequence of nested values
    Array(Vec<Value>),
}

impl Value {
    /// `+OK`
    pub fn ok() -> Self {
        Value::SimpleString("OK".to_string())
    }

    pub fn simple(text: impl Into<String>) -> Self {
        Value::SimpleString(text.into())
    }

    pub fn error(text: impl Into<String>) -> Self {
        Value::Error(text.into())
    }

    pub fn bulk(data: impl Into<Bytes>) -> Self {
        Value::BulkString(data.into())
    }

    /// Build a request array of bulk strings, the shape clients send.
    ///
    /// ```
    /// use tidekv::protocol::Value;
    ///
    /// let request = Value::command(["SET", "foo", "bar"]);
    /// assert_eq!(request.as_array().map(|a| a.len()), Some(3));
    /// ```
    pub fn command<I, T>(parts: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        Value::Array(
            parts
                .into_iter()
                .map(|p| Value::BulkString(Bytes::copy_from_slice(p.as_ref())))
                .collect(),
        )
    }

    pub fn as_bulk(&self) -> Option<&Bytes> {
        match self {
            Value::BulkString(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    /// Type name used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Value::SimpleString(_) => "simple string",
            Value::Error(_) => "error",
            Value::Integer(_) => "integer",
            Value::BulkString(_) => "bulk string",
            Value::Null => "null",
            Value::Array(_) => "array",
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<Option<Bytes>> for Value {
    fn from(data: Option<Bytes>) -> Self {
        data.map(Value::BulkString).unwrap_or(Value::Null)
    }
}
