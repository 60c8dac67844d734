//! Script environments: load, bind, invoke, validate.

use std::sync::Mutex;

use boa_engine::object::JsObject;
use boa_engine::value::JsValue;
use boa_engine::{js_string, Context, Source};
use serde_json::{Map, Value};

use jsgate_common::params::RequestParams;
use jsgate_common::protocol::{JsgateError, ResponseEnvelope, Result};

use crate::runtime::conversions::{js_to_json, json_to_js};
use crate::runtime::HostRegistry;

/// Global identifier a script must bind to a function to act as a handler.
pub const ENTRY_POINT: &str = "handle";

struct Inner {
    ctx: Context,
    entry: JsObject,
}

/// One compiled, bound script environment.
///
/// Boa's `Context` is not reentrant, so all access goes through the inner
/// mutex and a shared environment serializes its invocations. An
/// environment exists only if the script bound a callable to `handle` at
/// load time.
pub struct ScriptContext {
    inner: Mutex<Inner>,
}

// Safety: the Boa `Context` and entry-point handle are reachable only
// through `invoke`, which holds the mutex for the full call; no Boa value
// leaks past the lock.
unsafe impl Send for ScriptContext {}
unsafe impl Sync for ScriptContext {}

impl ScriptContext {
    /// Compile `source` in a fresh interpreter, install the registry's
    /// capabilities, run the script body, and resolve the entry point.
    ///
    /// Compile or top-level execution failure is a `ScriptLoad` error; a
    /// missing or non-callable `handle` is an `EntryPoint` error.
    pub fn from_source(source: &str, registry: &HostRegistry) -> Result<Self> {
        let mut ctx = Context::default();

        registry.install(&mut ctx)?;

        ctx.eval(Source::from_bytes(source))
            .map_err(|e| JsgateError::ScriptLoad(e.to_string()))?;

        let entry = ctx
            .global_object()
            .get(js_string!(ENTRY_POINT), &mut ctx)
            .map_err(|e| JsgateError::ScriptLoad(e.to_string()))?;

        let entry = match entry.as_object() {
            Some(object) if object.is_callable() => object.clone(),
            _ => {
                return Err(JsgateError::EntryPoint(format!(
                    "`{ENTRY_POINT}` is not a function"
                )))
            }
        };

        Ok(Self {
            inner: Mutex::new(Inner { ctx, entry }),
        })
    }

    /// Invoke the entry point once with `params` as its sole argument and
    /// no receiver, then validate the returned value.
    pub fn invoke(&self, params: &RequestParams) -> Result<ResponseEnvelope> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|e| JsgateError::Execution(format!("environment lock poisoned: {e}")))?;
        let Inner { ctx, entry } = &mut *inner;

        let args = params_to_js(params, ctx)?;
        let result = entry
            .call(&JsValue::undefined(), &[args], ctx)
            .map_err(|e| JsgateError::Execution(e.to_string()))?;

        decode_envelope(&result, ctx)
    }
}

fn params_to_js(params: &RequestParams, ctx: &mut Context) -> Result<JsValue> {
    let mut fields = Map::new();
    for (key, value) in params {
        fields.insert(key.clone(), Value::String(value.clone()));
    }
    json_to_js(&Value::Object(fields), ctx)
}

/// The shape contract on the entry point's return value, checked in order;
/// the first failing gate wins and carries its own diagnostic.
fn decode_envelope(value: &JsValue, ctx: &mut Context) -> Result<ResponseEnvelope> {
    let object = match value.as_object() {
        Some(object) => object,
        None => {
            return Err(JsgateError::MalformedReturn(
                "returned value is not an object".into(),
            ))
        }
    };

    let status = object
        .get(js_string!("status"), ctx)
        .map_err(|e| JsgateError::MalformedReturn(format!("`status` unreadable: {e}")))?;
    let status = match status.as_string() {
        Some(status) => status.to_std_string().map_err(|e| {
            JsgateError::MalformedReturn(format!("`status` is not valid UTF-16: {e:?}"))
        })?,
        None => {
            return Err(JsgateError::MalformedReturn(
                "`status` is not a string".into(),
            ))
        }
    };

    let err_code = object
        .get(js_string!("errCode"), ctx)
        .map_err(|e| JsgateError::MalformedReturn(format!("`errCode` unreadable: {e}")))?;
    let err_code = match err_code.as_number() {
        // Truncating conversion, matching the engine's ToInteger behavior.
        Some(code) => code as i64,
        None => {
            return Err(JsgateError::MalformedReturn(
                "`errCode` is not a number".into(),
            ))
        }
    };

    let data = object
        .get(js_string!("data"), ctx)
        .map_err(|e| JsgateError::MalformedReturn(format!("`data` unreadable: {e}")))?;
    if data.is_undefined() {
        return Err(JsgateError::MalformedReturn("`data` is missing".into()));
    }
    let data = js_to_json(&data, ctx)?;

    Ok(ResponseEnvelope {
        status,
        err_code,
        data,
    })
}
