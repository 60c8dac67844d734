//! The serving component: owns handler scripts and drives invocations.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::RwLock;

use jsgate_common::params::RequestParams;
use jsgate_common::protocol::{JsgateError, ResponseEnvelope, Result};

use crate::resource_limits::ResourceLimits;
use crate::runtime::{HostRegistry, ScriptContext};

/// How script environments relate to requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Compile each handler once and reuse the environment; invocations on
    /// one environment are serialized by its internal lock.
    Cached,
    /// Compile a fresh environment per request. Every request sees the
    /// current on-disk script, which makes this the development mode.
    PerRequest,
}

/// Serves handler scripts out of one directory.
///
/// The handler named `n` lives at `<handlers_dir>/n.js`. The registry is
/// installed into every environment the host creates.
pub struct ScriptHost {
    handlers_dir: PathBuf,
    registry: Arc<HostRegistry>,
    mode: ExecutionMode,
    limits: ResourceLimits,
    cache: RwLock<HashMap<String, Arc<ScriptContext>>>,
}

impl ScriptHost {
    pub fn new(handlers_dir: impl Into<PathBuf>, registry: HostRegistry) -> Result<Self> {
        let handlers_dir = handlers_dir.into();
        if !handlers_dir.is_dir() {
            return Err(JsgateError::NotFound(format!(
                "handlers directory does not exist: {}",
                handlers_dir.display()
            )));
        }

        Ok(Self {
            handlers_dir,
            registry: Arc::new(registry),
            mode: ExecutionMode::Cached,
            limits: ResourceLimits::default(),
            cache: RwLock::new(HashMap::new()),
        })
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_resource_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn handlers_dir(&self) -> &Path {
        &self.handlers_dir
    }

    /// Execute the named handler with `params`, bounded by the execution
    /// timeout.
    ///
    /// The invocation runs on a blocking thread; on timeout that thread is
    /// abandoned, so a cached environment stays locked until its script
    /// actually returns.
    pub async fn execute(&self, name: &str, params: RequestParams) -> Result<ResponseEnvelope> {
        let context = self.context_for(name).await?;

        let timeout = self.limits.execution_timeout;
        let task = tokio::task::spawn_blocking(move || context.invoke(&params));

        match tokio::time::timeout(timeout, task).await {
            Ok(joined) => {
                joined.map_err(|e| JsgateError::Execution(format!("invocation task failed: {e}")))?
            }
            Err(_) => Err(JsgateError::Timeout(timeout.as_millis() as u64)),
        }
    }

    /// Replace the cached environment for `name` with one compiled from
    /// the current on-disk source.
    ///
    /// In-flight invocations keep their environment; the swap only affects
    /// later requests.
    pub async fn reload(&self, name: &str) -> Result<()> {
        let context = Arc::new(self.load(name)?);
        self.cache.write().await.insert(name.to_string(), context);
        tracing::info!("reloaded handler '{}'", name);
        Ok(())
    }

    /// Forget every cached environment; each handler reloads on next use.
    pub async fn reload_all(&self) {
        self.cache.write().await.clear();
        tracing::info!("cleared handler environment cache");
    }

    async fn context_for(&self, name: &str) -> Result<Arc<ScriptContext>> {
        if self.mode == ExecutionMode::PerRequest {
            return Ok(Arc::new(self.load(name)?));
        }

        if let Some(context) = self.cache.read().await.get(name) {
            return Ok(context.clone());
        }

        let context = Arc::new(self.load(name)?);
        let mut cache = self.cache.write().await;
        Ok(cache.entry(name.to_string()).or_insert(context).clone())
    }

    fn load(&self, name: &str) -> Result<ScriptContext> {
        let path = self.script_path(name)?;
        if !path.is_file() {
            return Err(JsgateError::NotFound(format!(
                "no handler script at {}",
                path.display()
            )));
        }

        let source = std::fs::read_to_string(&path).map_err(|e| {
            JsgateError::ScriptLoad(format!("failed to read {}: {e}", path.display()))
        })?;

        tracing::debug!("loading handler '{}' from {}", name, path.display());
        ScriptContext::from_source(&source, &self.registry)
    }

    /// Map a handler name to its script file, rejecting path escapes.
    fn script_path(&self, name: &str) -> Result<PathBuf> {
        let name = name.trim_matches('/');
        let invalid = name.is_empty()
            || name.split('/').any(|part| {
                part.is_empty() || part == "." || part == ".." || part.contains('\\')
            });
        if invalid {
            return Err(JsgateError::NotFound(format!(
                "invalid handler name: {name}"
            )));
        }
        Ok(self.handlers_dir.join(format!("{name}.js")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use std::time::Duration;

    fn write_handler(dir: &Path, name: &str, source: &str) {
        fs::write(dir.join(format!("{name}.js")), source).unwrap();
    }

    fn echo_script() -> &'static str {
        r#"function handle(p) { return {errCode: 200, status: "success", data: p}; }"#
    }

    fn params(pairs: &[(&str, &str)]) -> RequestParams {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_executes_cached_handler() {
        let dir = tempfile::tempdir().unwrap();
        write_handler(dir.path(), "echo", echo_script());
        let host = ScriptHost::new(dir.path(), HostRegistry::new()).unwrap();

        let envelope = host
            .execute("echo", params(&[("name", "12345")]))
            .await
            .unwrap();
        assert_eq!(envelope.err_code, 200);
        assert_eq!(envelope.data, json!({"name": "12345"}));
    }

    #[tokio::test]
    async fn test_missing_handler_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let host = ScriptHost::new(dir.path(), HostRegistry::new()).unwrap();

        let err = host.execute("ghost", RequestParams::new()).await.unwrap_err();
        assert!(matches!(err, JsgateError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_missing_handlers_dir_fails_construction() {
        let result = ScriptHost::new("/nonexistent/handlers", HostRegistry::new());
        assert!(matches!(result, Err(JsgateError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_rejects_path_escapes() {
        let dir = tempfile::tempdir().unwrap();
        let host = ScriptHost::new(dir.path(), HostRegistry::new()).unwrap();

        for name in ["../secret", "a/../../b", ".", "a//b"] {
            let err = host.execute(name, RequestParams::new()).await.unwrap_err();
            assert!(matches!(err, JsgateError::NotFound(_)), "name {name:?}");
        }
    }

    #[tokio::test]
    async fn test_cached_mode_keeps_environment_until_reload() {
        let dir = tempfile::tempdir().unwrap();
        write_handler(
            dir.path(),
            "h",
            r#"function handle(p) { return {errCode: 200, status: "ok", data: "one"}; }"#,
        );
        let host = ScriptHost::new(dir.path(), HostRegistry::new()).unwrap();

        let first = host.execute("h", RequestParams::new()).await.unwrap();
        assert_eq!(first.data, json!("one"));

        write_handler(
            dir.path(),
            "h",
            r#"function handle(p) { return {errCode: 200, status: "ok", data: "two"}; }"#,
        );

        let second = host.execute("h", RequestParams::new()).await.unwrap();
        assert_eq!(second.data, json!("one"), "edit must not apply before reload");

        host.reload("h").await.unwrap();
        let third = host.execute("h", RequestParams::new()).await.unwrap();
        assert_eq!(third.data, json!("two"));
    }

    #[tokio::test]
    async fn test_per_request_mode_sees_script_edits() {
        let dir = tempfile::tempdir().unwrap();
        write_handler(
            dir.path(),
            "h",
            r#"function handle(p) { return {errCode: 200, status: "ok", data: "one"}; }"#,
        );
        let host = ScriptHost::new(dir.path(), HostRegistry::new())
            .unwrap()
            .with_mode(ExecutionMode::PerRequest);

        assert_eq!(
            host.execute("h", RequestParams::new()).await.unwrap().data,
            json!("one")
        );

        write_handler(
            dir.path(),
            "h",
            r#"function handle(p) { return {errCode: 200, status: "ok", data: "two"}; }"#,
        );

        assert_eq!(
            host.execute("h", RequestParams::new()).await.unwrap().data,
            json!("two")
        );
    }

    #[tokio::test]
    async fn test_load_error_surfaces_from_execute() {
        let dir = tempfile::tempdir().unwrap();
        write_handler(dir.path(), "bad", "this is not javascript ))");
        let host = ScriptHost::new(dir.path(), HostRegistry::new()).unwrap();

        let err = host.execute("bad", RequestParams::new()).await.unwrap_err();
        assert!(matches!(err, JsgateError::ScriptLoad(_)));
    }

    #[tokio::test]
    async fn test_runaway_handler_times_out() {
        let dir = tempfile::tempdir().unwrap();
        write_handler(dir.path(), "spin", "function handle(p) { while (true) {} }");
        let host = ScriptHost::new(dir.path(), HostRegistry::new())
            .unwrap()
            .with_resource_limits(
                ResourceLimits::new().with_execution_timeout(Duration::from_millis(100)),
            );

        let err = host.execute("spin", RequestParams::new()).await.unwrap_err();
        assert!(matches!(err, JsgateError::Timeout(100)));
    }

    #[tokio::test]
    async fn test_concurrent_requests_get_their_own_results() {
        let dir = tempfile::tempdir().unwrap();
        write_handler(dir.path(), "echo", echo_script());
        let host = Arc::new(ScriptHost::new(dir.path(), HostRegistry::new()).unwrap());

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let host = host.clone();
                tokio::spawn(async move {
                    let value = format!("value-{i}");
                    let envelope = host
                        .execute("echo", params(&[("input", &value)]))
                        .await
                        .unwrap();
                    (value, envelope)
                })
            })
            .collect();

        for result in futures::future::join_all(tasks).await {
            let (value, envelope) = result.unwrap();
            assert_eq!(envelope.data, json!({"input": value}));
        }
    }
}
