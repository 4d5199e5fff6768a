use std::fmt;

/// A typed column value decoded from a raw mutation.
///
/// [`Datum`] is the currency of the decode layer: row images map column names
/// to datums, and DML operations carry datums all the way to the sink. The
/// variants cover the upstream store's value domain.
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    /// Explicit SQL NULL.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed 64-bit integer.
    Int(i64),
    /// Unsigned 64-bit integer.
    Uint(u64),
    /// Double-precision float.
    Double(f64),
    /// Raw byte string.
    Bytes(Vec<u8>),
    /// UTF-8 string.
    String(String),
}

impl Datum {
    /// Returns a short name for the datum's variant, used in decode errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Datum::Null => "null",
            Datum::Bool(_) => "bool",
            Datum::Int(_) => "int",
            Datum::Uint(_) => "uint",
            Datum::Double(_) => "double",
            Datum::Bytes(_) => "bytes",
            Datum::String(_) => "string",
        }
    }

    /// Returns true if the datum is [`Datum::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datum::Null => write!(f, "NULL"),
            Datum::Bool(value) => write!(f, "{value}"),
            Datum::Int(value) => write!(f, "{value}"),
            Datum::Uint(value) => write!(f, "{value}"),
            Datum::Double(value) => write!(f, "{value}"),
            Datum::Bytes(value) => write!(f, "{value:02x?}"),
            Datum::String(value) => write!(f, "{value:?}"),
        }
    }
}
