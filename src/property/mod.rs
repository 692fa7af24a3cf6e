//! Property type system for graph elements.
//!
//! Graph properties are dynamically typed from the caller's point of view but
//! every property column in the backing store is strongly typed. This module
//! provides the closed set of supported value domains ([`PropertyType`]), the
//! tagged value union ([`PropertyValue`]), and classification of incoming
//! dynamic values. The SQL marshalling halves live in [`codec`].
//!
//! # Supported Types
//!
//! Scalars: boolean, byte, short, int, long, float, double, string.
//! One-dimensional arrays of each, where the byte array maps to a native
//! binary (BLOB) column and every other array is stored as JSON text in a
//! column whose declared type records the element width.

pub mod codec;

use std::fmt;

use crate::errors::{Result, SqlGraphError};

/// The closed set of value domains a property column may hold.
///
/// Once a column is created for a given (element kind, property name) with a
/// given `PropertyType`, all future writes of that property must carry the
/// same type; an incompatible type is a schema conflict, not a migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyType {
    Boolean,
    Byte,
    Short,
    Integer,
    Long,
    Float,
    Double,
    String,
    BooleanArray,
    ByteArray,
    ShortArray,
    IntegerArray,
    LongArray,
    FloatArray,
    DoubleArray,
    StringArray,
}

impl PropertyType {
    /// The declared SQL column type for this property type.
    ///
    /// These strings are reversible through [`PropertyType::from_sql_type`]
    /// and are what the schema catalog reports back on reload, which is how
    /// narrow numeric widths survive the driver's wide runtime
    /// representation.
    pub fn sql_type(&self) -> &'static str {
        match self {
            PropertyType::Boolean => "BOOLEAN",
            PropertyType::Byte => "TINYINT",
            PropertyType::Short => "SMALLINT",
            PropertyType::Integer => "INT",
            PropertyType::Long => "BIGINT",
            PropertyType::Float => "FLOAT",
            PropertyType::Double => "DOUBLE PRECISION",
            PropertyType::String => "TEXT",
            PropertyType::BooleanArray => "BOOLEAN ARRAY",
            PropertyType::ByteArray => "BLOB",
            PropertyType::ShortArray => "SMALLINT ARRAY",
            PropertyType::IntegerArray => "INT ARRAY",
            PropertyType::LongArray => "BIGINT ARRAY",
            PropertyType::FloatArray => "FLOAT ARRAY",
            PropertyType::DoubleArray => "DOUBLE PRECISION ARRAY",
            PropertyType::StringArray => "TEXT ARRAY",
        }
    }

    /// Parse a declared SQL column type back into a `PropertyType`.
    ///
    /// Accepts the aliases SQLite and other engines commonly report
    /// (`INTEGER`, `DOUBLE`, `VARCHAR`, `REAL`). Returns `None` for types
    /// this layer never creates.
    pub fn from_sql_type(sql_type: &str) -> Option<Self> {
        match sql_type.trim().to_uppercase().as_str() {
            "BOOLEAN" | "BOOL" => Some(PropertyType::Boolean),
            "TINYINT" => Some(PropertyType::Byte),
            "SMALLINT" => Some(PropertyType::Short),
            "INT" | "INTEGER" => Some(PropertyType::Integer),
            "BIGINT" => Some(PropertyType::Long),
            "FLOAT" | "REAL" => Some(PropertyType::Float),
            "DOUBLE PRECISION" | "DOUBLE" => Some(PropertyType::Double),
            "TEXT" | "VARCHAR" => Some(PropertyType::String),
            "BOOLEAN ARRAY" => Some(PropertyType::BooleanArray),
            "BLOB" => Some(PropertyType::ByteArray),
            "SMALLINT ARRAY" => Some(PropertyType::ShortArray),
            "INT ARRAY" | "INTEGER ARRAY" => Some(PropertyType::IntegerArray),
            "BIGINT ARRAY" => Some(PropertyType::LongArray),
            "FLOAT ARRAY" => Some(PropertyType::FloatArray),
            "DOUBLE PRECISION ARRAY" | "DOUBLE ARRAY" => Some(PropertyType::DoubleArray),
            "TEXT ARRAY" | "VARCHAR ARRAY" => Some(PropertyType::StringArray),
            _ => None,
        }
    }

    /// Whether this is one of the array variants.
    pub fn is_array(&self) -> bool {
        matches!(
            self,
            PropertyType::BooleanArray
                | PropertyType::ByteArray
                | PropertyType::ShortArray
                | PropertyType::IntegerArray
                | PropertyType::LongArray
                | PropertyType::FloatArray
                | PropertyType::DoubleArray
                | PropertyType::StringArray
        )
    }

    /// Get the type name as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Boolean => "boolean",
            PropertyType::Byte => "byte",
            PropertyType::Short => "short",
            PropertyType::Integer => "integer",
            PropertyType::Long => "long",
            PropertyType::Float => "float",
            PropertyType::Double => "double",
            PropertyType::String => "string",
            PropertyType::BooleanArray => "boolean[]",
            PropertyType::ByteArray => "byte[]",
            PropertyType::ShortArray => "short[]",
            PropertyType::IntegerArray => "integer[]",
            PropertyType::LongArray => "long[]",
            PropertyType::FloatArray => "float[]",
            PropertyType::DoubleArray => "double[]",
            PropertyType::StringArray => "string[]",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A property value, tagged with its domain.
///
/// All encode/decode logic dispatches over this tag rather than inspecting
/// runtime representations.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Boolean(bool),
    Byte(i8),
    Short(i16),
    Integer(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    BooleanArray(Vec<bool>),
    ByteArray(Vec<u8>),
    ShortArray(Vec<i16>),
    IntegerArray(Vec<i32>),
    LongArray(Vec<i64>),
    FloatArray(Vec<f32>),
    DoubleArray(Vec<f64>),
    StringArray(Vec<String>),
}

impl PropertyValue {
    /// Classify this value into its [`PropertyType`].
    pub fn property_type(&self) -> PropertyType {
        match self {
            PropertyValue::Boolean(_) => PropertyType::Boolean,
            PropertyValue::Byte(_) => PropertyType::Byte,
            PropertyValue::Short(_) => PropertyType::Short,
            PropertyValue::Integer(_) => PropertyType::Integer,
            PropertyValue::Long(_) => PropertyType::Long,
            PropertyValue::Float(_) => PropertyType::Float,
            PropertyValue::Double(_) => PropertyType::Double,
            PropertyValue::String(_) => PropertyType::String,
            PropertyValue::BooleanArray(_) => PropertyType::BooleanArray,
            PropertyValue::ByteArray(_) => PropertyType::ByteArray,
            PropertyValue::ShortArray(_) => PropertyType::ShortArray,
            PropertyValue::IntegerArray(_) => PropertyType::IntegerArray,
            PropertyValue::LongArray(_) => PropertyType::LongArray,
            PropertyValue::FloatArray(_) => PropertyType::FloatArray,
            PropertyValue::DoubleArray(_) => PropertyType::DoubleArray,
            PropertyValue::StringArray(_) => PropertyType::StringArray,
        }
    }

    /// Classify a dynamically-typed JSON value into a `PropertyValue`.
    ///
    /// JSON does not distinguish integer widths, so whole numbers classify
    /// as `long` and fractional numbers as `double`; the narrower variants
    /// are produced through the typed constructors instead.
    ///
    /// # Errors
    ///
    /// - `UnsupportedPropertyType` for nulls, objects, nested or
    ///   mixed-element arrays, and empty arrays (whose element type cannot
    ///   be determined).
    /// - `NullArrayElement` for arrays containing a null element. Rejected
    ///   here, before any write is attempted.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        use serde_json::Value as Json;
        match value {
            Json::Bool(b) => Ok(PropertyValue::Boolean(*b)),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(PropertyValue::Long(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(PropertyValue::Double(f))
                } else {
                    Err(SqlGraphError::UnsupportedPropertyType(format!(
                        "number out of range: {}",
                        n
                    )))
                }
            }
            Json::String(s) => Ok(PropertyValue::String(s.clone())),
            Json::Array(items) => Self::array_from_json(items),
            Json::Null => Err(SqlGraphError::UnsupportedPropertyType(
                "null is not a property value".to_string(),
            )),
            Json::Object(_) => Err(SqlGraphError::UnsupportedPropertyType(
                "objects are not property values".to_string(),
            )),
        }
    }

    fn array_from_json(items: &[serde_json::Value]) -> Result<Self> {
        use serde_json::Value as Json;
        if items.is_empty() {
            return Err(SqlGraphError::UnsupportedPropertyType(
                "cannot determine element type of an empty array".to_string(),
            ));
        }
        if items.iter().any(|i| i.is_null()) {
            return Err(SqlGraphError::NullArrayElement);
        }
        match &items[0] {
            Json::Bool(_) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Json::Bool(b) => out.push(*b),
                        other => return Err(mixed_array(other)),
                    }
                }
                Ok(PropertyValue::BooleanArray(out))
            }
            Json::String(_) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Json::String(s) => out.push(s.clone()),
                        other => return Err(mixed_array(other)),
                    }
                }
                Ok(PropertyValue::StringArray(out))
            }
            Json::Number(_) => {
                // A single fractional element makes the whole array double.
                let fractional = items
                    .iter()
                    .any(|i| matches!(i, Json::Number(n) if n.as_i64().is_none()));
                if fractional {
                    let mut out = Vec::with_capacity(items.len());
                    for item in items {
                        match item.as_f64() {
                            Some(f) => out.push(f),
                            None => return Err(mixed_array(item)),
                        }
                    }
                    Ok(PropertyValue::DoubleArray(out))
                } else {
                    let mut out = Vec::with_capacity(items.len());
                    for item in items {
                        match item.as_i64() {
                            Some(i) => out.push(i),
                            None => return Err(mixed_array(item)),
                        }
                    }
                    Ok(PropertyValue::LongArray(out))
                }
            }
            other => Err(SqlGraphError::UnsupportedPropertyType(format!(
                "array element {:?} is not a supported element type",
                other
            ))),
        }
    }
}

fn mixed_array(offending: &serde_json::Value) -> SqlGraphError {
    SqlGraphError::UnsupportedPropertyType(format!(
        "arrays must hold a single element type, found {:?}",
        offending
    ))
}

macro_rules! impl_from {
    ($($from:ty => $variant:ident),* $(,)?) => {
        $(impl From<$from> for PropertyValue {
            fn from(v: $from) -> Self {
                PropertyValue::$variant(v.into())
            }
        })*
    };
}

impl_from!(
    bool => Boolean,
    i8 => Byte,
    i16 => Short,
    i32 => Integer,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    String => String,
    &str => String,
    Vec<bool> => BooleanArray,
    Vec<u8> => ByteArray,
    Vec<i16> => ShortArray,
    Vec<i32> => IntegerArray,
    Vec<i64> => LongArray,
    Vec<f32> => FloatArray,
    Vec<f64> => DoubleArray,
    Vec<String> => StringArray,
);
