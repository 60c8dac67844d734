//! JSON <-> Boa value conversions.
//!
//! Request parameters travel into a script as a JavaScript object and the
//! handler's `data` field travels back out as a `serde_json::Value`, deep
//! converting nested objects and arrays. Symbol keys are skipped on export;
//! symbol values export as null.

use boa_engine::object::builtins::JsArray;
use boa_engine::object::JsObject;
use boa_engine::property::PropertyKey;
use boa_engine::value::JsValue;
use boa_engine::{js_string, Context};
use serde_json::Value;

use jsgate_common::protocol::{JsgateError, Result};

/// Convert a JSON value into its Boa equivalent, recursively.
pub(crate) fn json_to_js(json: &Value, ctx: &mut Context) -> Result<JsValue> {
    match json {
        Value::Null => Ok(JsValue::null()),
        Value::Bool(b) => Ok(JsValue::new(*b)),
        Value::Number(n) => n
            .as_f64()
            .map(JsValue::new)
            .ok_or_else(|| JsgateError::Execution("number out of range".into())),
        Value::String(s) => Ok(JsValue::new(js_string!(s.clone()))),
        Value::Array(items) => {
            let array = JsArray::new(ctx);
            for item in items {
                let value = json_to_js(item, ctx)?;
                array
                    .push(value, ctx)
                    .map_err(|e| JsgateError::Execution(format!("array element rejected: {e}")))?;
            }
            Ok(array.into())
        }
        Value::Object(fields) => {
            let object = JsObject::with_object_proto(ctx.intrinsics());
            for (key, value) in fields {
                let value = json_to_js(value, ctx)?;
                object
                    .create_data_property_or_throw(js_string!(key.clone()), value, ctx)
                    .map_err(|e| {
                        JsgateError::Execution(format!("property '{key}' rejected: {e}"))
                    })?;
            }
            Ok(object.into())
        }
    }
}

/// Convert a Boa value into JSON, recursively.
pub(crate) fn js_to_json(value: &JsValue, ctx: &mut Context) -> Result<Value> {
    if value.is_undefined() || value.is_null() {
        return Ok(Value::Null);
    }

    if let Some(b) = value.as_boolean() {
        return Ok(Value::Bool(b));
    }

    if let JsValue::Integer(i) = value {
        return Ok(Value::Number((*i).into()));
    }

    if let Some(n) = value.as_number() {
        return serde_json::Number::from_f64(n)
            .map(Value::Number)
            .ok_or_else(|| JsgateError::Execution("non-finite number in result".into()));
    }

    if let Some(s) = value.as_string() {
        return Ok(Value::String(s.to_std_string().map_err(|e| {
            JsgateError::Execution(format!("string export failed: {e:?}"))
        })?));
    }

    if let Some(object) = value.as_object() {
        if object.is_array() {
            let array = JsArray::from_object(object.clone())
                .map_err(|e| JsgateError::Execution(format!("array export failed: {e}")))?;
            let length: usize = array
                .length(ctx)
                .map_err(|e| JsgateError::Execution(format!("array length failed: {e}")))?
                .try_into()
                .map_err(|_| JsgateError::Execution("array length overflow".into()))?;

            let mut items = Vec::with_capacity(length);
            for i in 0..length {
                let element = array
                    .get(i, ctx)
                    .map_err(|e| JsgateError::Execution(format!("array element {i} failed: {e}")))?;
                items.push(js_to_json(&element, ctx)?);
            }
            return Ok(Value::Array(items));
        }

        let keys = object
            .own_property_keys(ctx)
            .map_err(|e| JsgateError::Execution(format!("object keys failed: {e}")))?;

        let mut fields = serde_json::Map::new();
        for key in keys {
            let name = match &key {
                PropertyKey::String(s) => s.to_std_string().map_err(|e| {
                    JsgateError::Execution(format!("property name export failed: {e:?}"))
                })?,
                PropertyKey::Index(i) => i.get().to_string(),
                PropertyKey::Symbol(_) => continue,
            };
            let property = object
                .get(key, ctx)
                .map_err(|e| JsgateError::Execution(format!("property '{name}' failed: {e}")))?;
            fields.insert(name, js_to_json(&property, ctx)?);
        }
        return Ok(Value::Object(fields));
    }

    // Symbols and anything else without a JSON form.
    Ok(Value::Null)
}
