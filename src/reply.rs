//! Shape of the value a generic command replies with.

use bytes::Bytes;

/// Result of an arbitrary command, tagged by the shape the store replied with.
///
/// RESP3-only shapes are folded into the closest RESP2 one so callers only have
/// to match a handful of variants.
#[derive(Debug, PartialEq, Clone)]
pub enum Reply {
    /// The key, field or element does not exist.
    Nil,
    /// Signed 64-bit integer.
    Integer(i64),
    /// Binary safe string.
    Bulk(Bytes),
    /// Status string such as `OK` or `PONG`.
    Status(String),
    /// Floating point number, RESP3 only.
    Double(f64),
    /// `true` or `false`, RESP3 only.
    Boolean(bool),
    /// Array of replies, possibly nested.
    Sequence(Vec<Reply>),
    /// Key-value pairs in the order the store sent them.
    Mapping(Vec<(Reply, Reply)>),
    /// A shape without a counterpart here, kept in its debug form.
    Other(String),
}

impl Reply {
    /// Name of the reply shape, used when reporting type mismatches.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Integer(_) => "integer",
            Self::Bulk(_) => "string",
            Self::Status(_) => "status",
            Self::Double(_) => "double",
            Self::Boolean(_) => "boolean",
            Self::Sequence(_) => "sequence",
            Self::Mapping(_) => "mapping",
            Self::Other(_) => "other",
        }
    }

    /// Converts a string-shaped reply into a `String`.
    ///
    /// `Nil` is reported as [`Error::KeyNotFound`] and every other non-string shape as
    /// [`Error::UnexpectedType`].
    ///
    /// [`Error::KeyNotFound`]: crate::Error::KeyNotFound
    /// [`Error::UnexpectedType`]: crate::Error::UnexpectedType
    pub fn into_string(self) -> crate::Result<String> {
        match self {
            Self::Bulk(b) => Ok(String::from_utf8(b.to_vec())?),
            Self::Status(s) => Ok(s),
            Self::Nil => Err(crate::Error::KeyNotFound),
            other => Err(crate::Error::UnexpectedType {
                expected: "string",
                found: other.kind(),
            }),
        }
    }

    /// Returns the integer held by an `Integer` reply.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<redis::Value> for Reply {
    fn from(value: redis::Value) -> Self {
        use redis::Value;
        match value {
            Value::Nil => Self::Nil,
            Value::Int(n) => Self::Integer(n),
            Value::BulkString(b) => Self::Bulk(b.into()),
            Value::SimpleString(s) => Self::Status(s),
            Value::Okay => Self::Status("OK".to_string()),
            Value::VerbatimString { text, .. } => Self::Bulk(text.into()),
            Value::Double(d) => Self::Double(d),
            Value::Boolean(b) => Self::Boolean(b),
            Value::Array(items) | Value::Set(items) => {
                Self::Sequence(items.into_iter().map(Reply::from).collect())
            }
            Value::Map(pairs) => Self::Mapping(
                pairs
                    .into_iter()
                    .map(|(k, v)| (Reply::from(k), Reply::from(v)))
                    .collect(),
            ),
            Value::Attribute { data, .. } => Reply::from(*data),
            other => Self::Other(format!("{:?}", other)),
        }
    }
}

impl From<&str> for Reply {
    fn from(s: &str) -> Self {
        Self::Bulk(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<String> for Reply {
    fn from(s: String) -> Self {
        Self::Bulk(s.into())
    }
}

impl From<i64> for Reply {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<Option<String>> for Reply {
    fn from(s: Option<String>) -> Self {
        s.map(Reply::from).unwrap_or(Self::Nil)
    }
}
