//! Parameter marshalling between [`PropertyValue`] and the relational driver.
//!
//! Encoding and decoding are the two halves of one boundary and must stay
//! symmetric: for every supported value `v`,
//! `decode(v.property_type(), encode(v)) == v`.
//!
//! SQLite stores all integers as 8-byte values and all floats as doubles, so
//! the runtime representation coming back from the driver is always wide.
//! [`decode`] narrows it back to the originally-stored width using the
//! column's declared [`PropertyType`] (recovered from the schema catalog),
//! never the raw value's runtime type. Arrays other than byte arrays travel
//! as JSON text; byte arrays are native BLOBs.

use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};

use crate::errors::{Result, SqlGraphError};
use crate::property::{PropertyType, PropertyValue};

/// Encode a property value into an owned driver parameter.
///
/// Booleans become 0/1 integers, every integer width widens to `i64`, both
/// float widths widen to `f64`, and non-byte arrays serialize to JSON text.
/// Only parameterized binding is supported; values are never interpolated
/// into SQL.
pub fn encode(value: &PropertyValue) -> Result<Value> {
    let encoded = match value {
        PropertyValue::Boolean(b) => Value::Integer(i64::from(*b)),
        PropertyValue::Byte(b) => Value::Integer(i64::from(*b)),
        PropertyValue::Short(s) => Value::Integer(i64::from(*s)),
        PropertyValue::Integer(i) => Value::Integer(i64::from(*i)),
        PropertyValue::Long(l) => Value::Integer(*l),
        PropertyValue::Float(f) => Value::Real(f64::from(*f)),
        PropertyValue::Double(d) => Value::Real(*d),
        PropertyValue::String(s) => Value::Text(s.clone()),
        PropertyValue::ByteArray(b) => Value::Blob(b.clone()),
        PropertyValue::BooleanArray(v) => json_text(v)?,
        PropertyValue::ShortArray(v) => json_text(v)?,
        PropertyValue::IntegerArray(v) => json_text(v)?,
        PropertyValue::LongArray(v) => json_text(v)?,
        PropertyValue::FloatArray(v) => json_text(v)?,
        PropertyValue::DoubleArray(v) => json_text(v)?,
        PropertyValue::StringArray(v) => json_text(v)?,
    };
    Ok(encoded)
}

fn json_text<T: serde::Serialize>(items: &[T]) -> Result<Value> {
    let text = serde_json::to_string(items).map_err(|e| {
        SqlGraphError::UnsupportedPropertyType(format!("array not serializable: {}", e))
    })?;
    Ok(Value::Text(text))
}

impl ToSql for PropertyValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        encode(self)
            .map(ToSqlOutput::Owned)
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
    }
}

/// Decode a raw driver value back into a property value of the declared
/// column type.
///
/// The declared type, not the raw value, decides the result width: a
/// `SMALLINT` column read back as an `i64` decodes to `Short`, a `FLOAT`
/// column read back as an `f64` decodes to `Float`. String arrays are
/// passed through; every other array converts element-by-element into the
/// fixed-width variant matching the column's base type.
pub fn decode(ty: PropertyType, raw: ValueRef<'_>) -> Result<PropertyValue> {
    match ty {
        PropertyType::Boolean => Ok(PropertyValue::Boolean(integer_of(ty, raw)? != 0)),
        PropertyType::Byte => Ok(PropertyValue::Byte(narrow(ty, integer_of(ty, raw)?)?)),
        PropertyType::Short => Ok(PropertyValue::Short(narrow(ty, integer_of(ty, raw)?)?)),
        PropertyType::Integer => Ok(PropertyValue::Integer(narrow(ty, integer_of(ty, raw)?)?)),
        PropertyType::Long => Ok(PropertyValue::Long(integer_of(ty, raw)?)),
        PropertyType::Float => Ok(PropertyValue::Float(real_of(ty, raw)? as f32)),
        PropertyType::Double => Ok(PropertyValue::Double(real_of(ty, raw)?)),
        PropertyType::String => Ok(PropertyValue::String(text_of(ty, raw)?.to_string())),
        PropertyType::ByteArray => match raw {
            ValueRef::Blob(b) => Ok(PropertyValue::ByteArray(b.to_vec())),
            other => Err(type_mismatch(ty, other)),
        },
        PropertyType::BooleanArray
        | PropertyType::ShortArray
        | PropertyType::IntegerArray
        | PropertyType::LongArray
        | PropertyType::FloatArray
        | PropertyType::DoubleArray
        | PropertyType::StringArray => decode_array(ty, text_of(ty, raw)?),
    }
}

fn decode_array(ty: PropertyType, text: &str) -> Result<PropertyValue> {
    let items: Vec<serde_json::Value> = serde_json::from_str(text).map_err(|e| {
        SqlGraphError::UnsupportedPropertyType(format!(
            "stored {} column is not a JSON array: {}",
            ty, e
        ))
    })?;
    if items.iter().any(|i| i.is_null()) {
        return Err(SqlGraphError::NullArrayElement);
    }
    match ty {
        // String arrays pass through without per-element conversion.
        PropertyType::StringArray => {
            let mut out = Vec::with_capacity(items.len());
            for item in &items {
                out.push(
                    item.as_str()
                        .ok_or_else(|| element_mismatch(ty, item))?
                        .to_string(),
                );
            }
            Ok(PropertyValue::StringArray(out))
        }
        PropertyType::BooleanArray => {
            let mut out = Vec::with_capacity(items.len());
            for item in &items {
                out.push(item.as_bool().ok_or_else(|| element_mismatch(ty, item))?);
            }
            Ok(PropertyValue::BooleanArray(out))
        }
        PropertyType::ShortArray => {
            let wide = integer_elements(ty, &items)?;
            let mut out = Vec::with_capacity(wide.len());
            for i in wide {
                out.push(narrow(ty, i)?);
            }
            Ok(PropertyValue::ShortArray(out))
        }
        PropertyType::IntegerArray => {
            let wide = integer_elements(ty, &items)?;
            let mut out = Vec::with_capacity(wide.len());
            for i in wide {
                out.push(narrow(ty, i)?);
            }
            Ok(PropertyValue::IntegerArray(out))
        }
        PropertyType::LongArray => Ok(PropertyValue::LongArray(integer_elements(ty, &items)?)),
        PropertyType::FloatArray => {
            let out = real_elements(ty, &items)?;
            Ok(PropertyValue::FloatArray(
                out.into_iter().map(|f| f as f32).collect(),
            ))
        }
        PropertyType::DoubleArray => Ok(PropertyValue::DoubleArray(real_elements(ty, &items)?)),
        _ => unreachable!("decode_array called for scalar type {}", ty),
    }
}

fn integer_elements(ty: PropertyType, items: &[serde_json::Value]) -> Result<Vec<i64>> {
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        out.push(item.as_i64().ok_or_else(|| element_mismatch(ty, item))?);
    }
    Ok(out)
}

fn real_elements(ty: PropertyType, items: &[serde_json::Value]) -> Result<Vec<f64>> {
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        out.push(item.as_f64().ok_or_else(|| element_mismatch(ty, item))?);
    }
    Ok(out)
}

/// Checked narrowing. A column externally overwritten with a value outside
/// its declared width must surface as corrupt, not wrap.
fn narrow<T: TryFrom<i64>>(ty: PropertyType, value: i64) -> Result<T> {
    T::try_from(value).map_err(|_| {
        SqlGraphError::UnsupportedPropertyType(format!(
            "column declared {} holds out-of-range value {}",
            ty, value
        ))
    })
}

fn integer_of(ty: PropertyType, raw: ValueRef<'_>) -> Result<i64> {
    match raw {
        ValueRef::Integer(i) => Ok(i),
        other => Err(type_mismatch(ty, other)),
    }
}

fn real_of(ty: PropertyType, raw: ValueRef<'_>) -> Result<f64> {
    match raw {
        ValueRef::Real(f) => Ok(f),
        // REAL-affinity columns may hand back integral values as integers.
        ValueRef::Integer(i) => Ok(i as f64),
        other => Err(type_mismatch(ty, other)),
    }
}

fn text_of(ty: PropertyType, raw: ValueRef<'_>) -> Result<&str> {
    match raw {
        ValueRef::Text(bytes) => std::str::from_utf8(bytes).map_err(|e| {
            SqlGraphError::UnsupportedPropertyType(format!(
                "stored {} column is not valid UTF-8: {}",
                ty, e
            ))
        }),
        other => Err(type_mismatch(ty, other)),
    }
}

fn type_mismatch(ty: PropertyType, raw: ValueRef<'_>) -> SqlGraphError {
    SqlGraphError::UnsupportedPropertyType(format!(
        "column declared {} holds a {:?} value",
        ty,
        raw.data_type()
    ))
}

fn element_mismatch(ty: PropertyType, item: &serde_json::Value) -> SqlGraphError {
    SqlGraphError::UnsupportedPropertyType(format!(
        "stored {} column holds incompatible element {:?}",
        ty, item
    ))
}
