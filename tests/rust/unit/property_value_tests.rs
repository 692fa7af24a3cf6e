//! Typed value conversion tests against the public API.

use sqlgraph::{PropertyType, PropertyValue};
use test_case::test_case;

#[test_case(PropertyType::Boolean, false ; "boolean is scalar")]
#[test_case(PropertyType::Long, false ; "long is scalar")]
#[test_case(PropertyType::ByteArray, true ; "byte array is array")]
#[test_case(PropertyType::StringArray, true ; "string array is array")]
fn test_is_array(ty: PropertyType, expected: bool) {
    assert_eq!(ty.is_array(), expected);
}

#[test_case(PropertyType::Double, "double")]
#[test_case(PropertyType::Short, "short")]
#[test_case(PropertyType::IntegerArray, "integer[]")]
fn test_display(ty: PropertyType, expected: &str) {
    assert_eq!(ty.to_string(), expected);
}

#[test]
fn test_typed_constructors_keep_narrow_widths() {
    // The typed conversions are the only way to produce narrow numerics;
    // dynamic classification widens to long/double.
    assert_eq!(PropertyValue::from(1i8).property_type(), PropertyType::Byte);
    assert_eq!(PropertyValue::from(1i16).property_type(), PropertyType::Short);
    assert_eq!(
        PropertyValue::from(1i32).property_type(),
        PropertyType::Integer
    );
    assert_eq!(PropertyValue::from(1.5f32).property_type(), PropertyType::Float);
    assert_eq!(
        PropertyValue::from_json(&serde_json::json!(1))
            .unwrap()
            .property_type(),
        PropertyType::Long
    );
}

#[test]
fn test_byte_array_is_binary_not_json() {
    let v = PropertyValue::from(vec![0u8, 255u8]);
    assert_eq!(v.property_type(), PropertyType::ByteArray);
    assert_eq!(v.property_type().sql_type(), "BLOB");
}
