//! Typed values carried by message properties, map bodies and stream bodies.
//!
//! Reads follow the usual JMS conversion table: a narrower integer widens to a
//! wider one, `float` widens to `double`, every primitive reads back as a
//! string, and strings parse into the primitive asked for. Any other pairing
//! is a [`Error::MessageFormat`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A single typed value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `boolean`
    Bool(bool),
    /// `byte`
    Byte(i8),
    /// `char`, a UTF-16 code unit.
    Char(u16),
    /// `short`
    Short(i16),
    /// `int`
    Int(i32),
    /// `long`
    Long(i64),
    /// `float`
    Float(f32),
    /// `double`
    Double(f64),
    /// `String`
    String(String),
    /// `byte[]`
    Bytes(Vec<u8>),
}

impl Value {
    /// Name of the stored type, as used in conversion errors.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Byte(_) => "byte",
            Self::Char(_) => "char",
            Self::Short(_) => "short",
            Self::Int(_) => "int",
            Self::Long(_) => "long",
            Self::Float(_) => "float",
            Self::Double(_) => "double",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
        }
    }

    fn mismatch(&self, wanted: &str) -> Error {
        Error::MessageFormat(format!("cannot read {} as {wanted}", self.type_name()))
    }

    /// Read as `boolean`.
    ///
    /// # Errors
    ///
    /// [`Error::MessageFormat`] when the stored type does not convert.
    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Self::Bool(v) => Ok(*v),
            Self::String(s) => Ok(s.trim().eq_ignore_ascii_case("true")),
            _ => Err(self.mismatch("boolean")),
        }
    }

    /// Read as `byte`.
    ///
    /// # Errors
    ///
    /// [`Error::MessageFormat`] when the stored type does not convert.
    pub fn as_byte(&self) -> Result<i8> {
        match self {
            Self::Byte(v) => Ok(*v),
            Self::String(s) => parse(s, "byte"),
            _ => Err(self.mismatch("byte")),
        }
    }

    /// Read as `char`. Only a stored `char` converts.
    ///
    /// # Errors
    ///
    /// [`Error::MessageFormat`] when the stored type does not convert.
    pub fn as_char(&self) -> Result<u16> {
        match self {
            Self::Char(v) => Ok(*v),
            _ => Err(self.mismatch("char")),
        }
    }

    /// Read as `short`.
    ///
    /// # Errors
    ///
    /// [`Error::MessageFormat`] when the stored type does not convert.
    pub fn as_short(&self) -> Result<i16> {
        match self {
            Self::Byte(v) => Ok(i16::from(*v)),
            Self::Short(v) => Ok(*v),
            Self::String(s) => parse(s, "short"),
            _ => Err(self.mismatch("short")),
        }
    }

    /// Read as `int`.
    ///
    /// # Errors
    ///
    /// [`Error::MessageFormat`] when the stored type does not convert.
    pub fn as_int(&self) -> Result<i32> {
        match self {
            Self::Byte(v) => Ok(i32::from(*v)),
            Self::Short(v) => Ok(i32::from(*v)),
            Self::Int(v) => Ok(*v),
            Self::String(s) => parse(s, "int"),
            _ => Err(self.mismatch("int")),
        }
    }

    /// Read as `long`.
    ///
    /// # Errors
    ///
    /// [`Error::MessageFormat`] when the stored type does not convert.
    pub fn as_long(&self) -> Result<i64> {
        match self {
            Self::Byte(v) => Ok(i64::from(*v)),
            Self::Short(v) => Ok(i64::from(*v)),
            Self::Int(v) => Ok(i64::from(*v)),
            Self::Long(v) => Ok(*v),
            Self::String(s) => parse(s, "long"),
            _ => Err(self.mismatch("long")),
        }
    }

    /// Read as `float`.
    ///
    /// # Errors
    ///
    /// [`Error::MessageFormat`] when the stored type does not convert.
    pub fn as_float(&self) -> Result<f32> {
        match self {
            Self::Float(v) => Ok(*v),
            Self::String(s) => parse(s, "float"),
            _ => Err(self.mismatch("float")),
        }
    }

    /// Read as `double`.
    ///
    /// # Errors
    ///
    /// [`Error::MessageFormat`] when the stored type does not convert.
    pub fn as_double(&self) -> Result<f64> {
        match self {
            Self::Float(v) => Ok(f64::from(*v)),
            Self::Double(v) => Ok(*v),
            Self::String(s) => parse(s, "double"),
            _ => Err(self.mismatch("double")),
        }
    }

    /// Read as a string. Every type except `bytes` converts.
    ///
    /// # Errors
    ///
    /// [`Error::MessageFormat`] for a `bytes` value.
    pub fn as_string(&self) -> Result<String> {
        match self {
            Self::Bytes(_) => Err(self.mismatch("string")),
            other => Ok(other.to_string()),
        }
    }

    /// Read as a byte array. Only stored `bytes` convert.
    ///
    /// # Errors
    ///
    /// [`Error::MessageFormat`] when the stored type does not convert.
    pub fn as_bytes(&self) -> Result<&[u8]> {
        match self {
            Self::Bytes(v) => Ok(v),
            _ => Err(self.mismatch("bytes")),
        }
    }
}

fn parse<T: FromStr>(s: &str, wanted: &str) -> Result<T> {
    s.trim()
        .parse()
        .map_err(|_| Error::MessageFormat(format!("cannot convert \"{s}\" to {wanted}")))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Byte(v) => write!(f, "{v}"),
            Self::Char(v) => {
                let c = char::from_u32(u32::from(*v)).unwrap_or(char::REPLACEMENT_CHARACTER);
                write!(f, "{c}")
            }
            Self::Short(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::String(v) => f.write_str(v),
            Self::Bytes(v) => write!(f, "<{} bytes>", v.len()),
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Self::$variant(v.into())
            }
        })*
    };
}

value_from! {
    bool => Bool,
    i8 => Byte,
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    String => String,
    &str => String,
    Vec<u8> => Bytes,
    &[u8] => Bytes,
}

/// Named values with typed, converting accessors.
///
/// A missing name reads as `false` for booleans and as the empty string for
/// strings; every other typed read of a missing name is a format error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueMap {
    entries: BTreeMap<String, Value>,
}

impl ValueMap {
    /// Empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw value stored under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    /// Store `value` under `name`, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(name.into(), value.into());
    }

    /// Whether a value is stored under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stored names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterate over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn required(&self, name: &str) -> Result<&Value> {
        self.entries
            .get(name)
            .ok_or_else(|| Error::MessageFormat(format!("no value named `{name}`")))
    }

    /// # Errors
    ///
    /// [`Error::MessageFormat`] when the stored value does not convert.
    pub fn get_bool(&self, name: &str) -> Result<bool> {
        self.entries.get(name).map_or(Ok(false), Value::as_bool)
    }

    /// # Errors
    ///
    /// [`Error::MessageFormat`] when missing or not convertible.
    pub fn get_byte(&self, name: &str) -> Result<i8> {
        self.required(name)?.as_byte()
    }

    /// # Errors
    ///
    /// [`Error::MessageFormat`] when missing or not convertible.
    pub fn get_char(&self, name: &str) -> Result<u16> {
        self.required(name)?.as_char()
    }

    /// # Errors
    ///
    /// [`Error::MessageFormat`] when missing or not convertible.
    pub fn get_short(&self, name: &str) -> Result<i16> {
        self.required(name)?.as_short()
    }

    /// # Errors
    ///
    /// [`Error::MessageFormat`] when missing or not convertible.
    pub fn get_int(&self, name: &str) -> Result<i32> {
        self.required(name)?.as_int()
    }

    /// # Errors
    ///
    /// [`Error::MessageFormat`] when missing or not convertible.
    pub fn get_long(&self, name: &str) -> Result<i64> {
        self.required(name)?.as_long()
    }

    /// # Errors
    ///
    /// [`Error::MessageFormat`] when missing or not convertible.
    pub fn get_float(&self, name: &str) -> Result<f32> {
        self.required(name)?.as_float()
    }

    /// # Errors
    ///
    /// [`Error::MessageFormat`] when missing or not convertible.
    pub fn get_double(&self, name: &str) -> Result<f64> {
        self.required(name)?.as_double()
    }

    /// # Errors
    ///
    /// [`Error::MessageFormat`] when the stored value is a byte array.
    pub fn get_string(&self, name: &str) -> Result<String> {
        self.entries.get(name).map_or(Ok(String::new()), Value::as_string)
    }

    /// # Errors
    ///
    /// [`Error::MessageFormat`] when missing or not a byte array.
    pub fn get_bytes(&self, name: &str) -> Result<&[u8]> {
        self.required(name)?.as_bytes()
    }
}

#[cfg(test)]
#[path = "value_tests.rs"]
mod tests;
