//! Conversion between Osiris values and Lua values

use mlua::{Lua, Value};
use osibridge_core::{OsiValue, RuntimeError, ValueType};

/// Convert a native argument to its Lua representation
pub fn osi_to_lua(lua: &Lua, value: &OsiValue) -> mlua::Result<Value> {
    let value = match value {
        OsiValue::None => Value::Nil,
        OsiValue::Integer(v) => Value::Integer(i64::from(*v)),
        OsiValue::Integer64(v) => Value::Integer(*v),
        OsiValue::Real(v) => Value::Number(f64::from(*v)),
        OsiValue::String(s) | OsiValue::GuidString(s) => Value::String(lua.create_string(s)?),
    };
    Ok(value)
}

/// Convert a Lua value into a native value of the requested type.
///
/// Integral floats are accepted where an integer is expected, and integers
/// where a real is expected.
pub fn lua_to_osi(value: &Value, expected: ValueType) -> Result<OsiValue, RuntimeError> {
    match (expected, value) {
        (ValueType::None, Value::Nil) => Ok(OsiValue::None),

        (ValueType::Integer, Value::Integer(v)) => i32::try_from(*v)
            .map(OsiValue::Integer)
            .map_err(|_| RuntimeError::conversion(format!("integer {v} out of range"))),
        (ValueType::Integer, Value::Number(v)) => integral(*v)
            .and_then(|v| i32::try_from(v).ok())
            .map(OsiValue::Integer)
            .ok_or_else(|| RuntimeError::conversion(format!("number {v} is not an integer"))),

        (ValueType::Integer64, Value::Integer(v)) => Ok(OsiValue::Integer64(*v)),
        (ValueType::Integer64, Value::Number(v)) => integral(*v)
            .map(OsiValue::Integer64)
            .ok_or_else(|| RuntimeError::conversion(format!("number {v} is not an integer"))),

        (ValueType::Real, Value::Number(v)) => Ok(OsiValue::Real(*v as f32)),
        (ValueType::Real, Value::Integer(v)) => Ok(OsiValue::Real(*v as f32)),

        (ValueType::String, Value::String(s)) => Ok(OsiValue::String(lua_str(s)?)),
        (ValueType::GuidString, Value::String(s)) => Ok(OsiValue::GuidString(lua_str(s)?)),

        (expected, value) => Err(RuntimeError::conversion(format!(
            "expected {expected:?}, got {}",
            value.type_name()
        ))),
    }
}

/// Pick the natural native type for a Lua value
pub fn infer_osi(value: &Value) -> Result<OsiValue, RuntimeError> {
    match value {
        Value::Nil => Ok(OsiValue::None),
        Value::Integer(v) => Ok(i32::try_from(*v)
            .map(OsiValue::Integer)
            .unwrap_or(OsiValue::Integer64(*v))),
        Value::Number(v) => Ok(OsiValue::Real(*v as f32)),
        Value::String(s) => Ok(OsiValue::String(lua_str(s)?)),
        other => Err(RuntimeError::conversion(format!(
            "{} has no Osiris representation",
            other.type_name()
        ))),
    }
}

fn integral(v: f64) -> Option<i64> {
    if v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}

fn lua_str(s: &mlua::String) -> Result<String, RuntimeError> {
    s.to_str()
        .map(|s| (*s).to_owned())
        .map_err(|err| RuntimeError::conversion(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_osi_to_lua_scalars() {
        let lua = Lua::new();
        assert!(matches!(osi_to_lua(&lua, &OsiValue::None).unwrap(), Value::Nil));
        assert!(matches!(
            osi_to_lua(&lua, &OsiValue::Integer(-4)).unwrap(),
            Value::Integer(-4)
        ));
        assert!(matches!(
            osi_to_lua(&lua, &OsiValue::Integer64(1 << 40)).unwrap(),
            Value::Integer(v) if v == 1 << 40
        ));
        assert!(matches!(
            osi_to_lua(&lua, &OsiValue::Real(0.5)).unwrap(),
            Value::Number(v) if v == 0.5
        ));
    }

    #[test]
    fn test_guid_becomes_plain_string() {
        let lua = Lua::new();
        let guid = OsiValue::GuidString("S_Player_abc".into());
        let value = osi_to_lua(&lua, &guid).unwrap();
        let Value::String(s) = value else {
            panic!("expected string, got {value:?}");
        };
        assert_eq!(s.to_string_lossy(), "S_Player_abc");
    }

    #[test]
    fn test_integral_float_accepted_as_integer() {
        assert_eq!(
            lua_to_osi(&Value::Number(3.0), ValueType::Integer).unwrap(),
            OsiValue::Integer(3)
        );
        assert!(lua_to_osi(&Value::Number(3.5), ValueType::Integer).is_err());
        assert_eq!(
            lua_to_osi(&Value::Integer(7), ValueType::Real).unwrap(),
            OsiValue::Real(7.0)
        );
    }

    #[test]
    fn test_integer_range_checked() {
        assert!(lua_to_osi(&Value::Integer(i64::from(i32::MAX) + 1), ValueType::Integer).is_err());
        assert_eq!(
            lua_to_osi(&Value::Integer(i64::from(i32::MAX) + 1), ValueType::Integer64).unwrap(),
            OsiValue::Integer64(i64::from(i32::MAX) + 1)
        );
    }

    #[test]
    fn test_type_mismatch_is_conversion_error() {
        let lua = Lua::new();
        let s = Value::String(lua.create_string("x").unwrap());
        assert!(matches!(
            lua_to_osi(&s, ValueType::Integer),
            Err(RuntimeError::Conversion(_))
        ));
        assert!(lua_to_osi(&Value::Nil, ValueType::String).is_err());
        assert_eq!(
            lua_to_osi(&s, ValueType::GuidString).unwrap(),
            OsiValue::GuidString("x".into())
        );
    }

    #[test]
    fn test_infer_picks_narrowest_integer() {
        assert_eq!(infer_osi(&Value::Integer(5)).unwrap(), OsiValue::Integer(5));
        assert_eq!(
            infer_osi(&Value::Integer(i64::MAX)).unwrap(),
            OsiValue::Integer64(i64::MAX)
        );
        assert!(infer_osi(&Value::Boolean(true)).is_err());
    }
}
