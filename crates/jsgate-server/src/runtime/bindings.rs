//! Host capabilities installed into every script environment.
//!
//! Scripts see two globals: `gFetch(url)` performs an outbound HTTP GET
//! and returns `{status, headers, body}`; `retData(errCode, status, data)`
//! builds the entry-point return shape in one call. Capability failures
//! are thrown into the script as catchable errors; the host never aborts
//! on them.

use std::time::Duration;

use boa_engine::native_function::NativeFunction;
use boa_engine::object::{FunctionObjectBuilder, JsObject};
use boa_engine::property::Attribute;
use boa_engine::value::JsValue;
use boa_engine::{js_string, Context, JsNativeError};

use jsgate_common::protocol::{JsgateError, Result};

use crate::runtime::conversions::json_to_js;
use crate::runtime::fetch;

/// Read-only registry of native capabilities injected into each script
/// environment before any script code runs.
///
/// One registry instance is passed into every environment constructor;
/// there is no process-wide registry state to mutate.
#[derive(Debug, Clone)]
pub struct HostRegistry {
    fetch_timeout: Duration,
}

impl Default for HostRegistry {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(10),
        }
    }
}

impl HostRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound on a single `gFetch` call, not on the whole invocation.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Names of every capability this registry installs.
    pub fn capability_names(&self) -> &'static [&'static str] {
        &["gFetch", "retData"]
    }

    /// Install all capabilities as globals on `ctx`. Called once per
    /// environment, before the script body is evaluated.
    pub(crate) fn install(&self, ctx: &mut Context) -> Result<()> {
        let fetch_timeout = self.fetch_timeout;

        let g_fetch = FunctionObjectBuilder::new(
            ctx.realm(),
            NativeFunction::from_copy_closure(move |_this, args, context| {
                let url = match (args.len(), args.first().and_then(|v| v.as_string())) {
                    (1, Some(url)) => url.to_std_string_escaped(),
                    _ => {
                        return Err(JsNativeError::typ()
                            .with_message("Invalid gFetch function arguments.")
                            .into())
                    }
                };

                let response = fetch::http_get(&url, fetch_timeout)
                    .map_err(|e| JsNativeError::error().with_message(format!("GetError: {e}")))?;

                match json_to_js(&response.to_json(), context) {
                    Ok(value) => Ok(value),
                    Err(e) => {
                        tracing::warn!("gFetch response conversion failed: {}", e);
                        Ok(JsValue::null())
                    }
                }
            }),
        )
        .name(js_string!("gFetch"))
        .length(1)
        .build();

        ctx.register_global_property(js_string!("gFetch"), g_fetch, Attribute::all())
            .map_err(|e| JsgateError::ScriptLoad(e.to_string()))?;

        let ret_data = FunctionObjectBuilder::new(
            ctx.realm(),
            NativeFunction::from_copy_closure(|_this, args, context| {
                if args.len() != 3 {
                    return Err(JsNativeError::typ()
                        .with_message("Invalid retData function arguments.")
                        .into());
                }

                let result = JsObject::with_object_proto(context.intrinsics());
                for (name, value) in [("errCode", &args[0]), ("status", &args[1]), ("data", &args[2])]
                {
                    result
                        .create_data_property_or_throw(js_string!(name), value.clone(), context)
                        .map_err(|e| {
                            JsNativeError::typ().with_message(format!("retData: {e}"))
                        })?;
                }
                Ok(result.into())
            }),
        )
        .name(js_string!("retData"))
        .length(3)
        .build();

        ctx.register_global_property(js_string!("retData"), ret_data, Attribute::all())
            .map_err(|e| JsgateError::ScriptLoad(e.to_string()))?;

        Ok(())
    }
}
