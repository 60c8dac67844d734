//! Maps HTTP requests onto handler scripts.
//!
//! The router owns the last translation step in both directions: inbound
//! requests are marshalled into `RequestParams`, outbound results and
//! errors become JSON envelopes. Nothing below the router writes to the
//! response and nothing above it sees a handler error.

use std::sync::Arc;

use http_body_util::BodyExt;
use hyper::body::Bytes;
use hyper::header::CONTENT_TYPE;

use jsgate_common::http::{HyperRequest, HyperResponse, ResponseWriter};
use jsgate_common::params::merge_request_params;
use jsgate_common::protocol::JsgateError;

use crate::host::ScriptHost;

/// URL prefix under which handler scripts are exposed.
pub const HANDLER_PREFIX: &str = "/handlers/";

pub struct HandlerRouter {
    host: Arc<ScriptHost>,
}

impl HandlerRouter {
    pub fn new(host: Arc<ScriptHost>) -> Self {
        Self { host }
    }

    /// Resolve, marshal, execute, write. Every outcome becomes exactly one
    /// JSON response.
    pub async fn route(&self, req: HyperRequest) -> HyperResponse {
        let path = req.uri().path().to_string();
        let Some(name) = path.strip_prefix(HANDLER_PREFIX).map(str::to_string) else {
            return ResponseWriter::failure(&JsgateError::NotFound(format!(
                "no handler mounted at {path}"
            )));
        };

        let query = req.uri().query().map(str::to_string);
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        // An unreadable body degrades like an unparseable form: the handler
        // still runs with whatever parameters survived.
        let body = match req.into_body().collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                tracing::warn!("failed to read request body: {}", e);
                Bytes::new()
            }
        };

        let params = merge_request_params(query.as_deref(), &body, content_type.as_deref());

        tracing::debug!(
            "executing handler '{}' with {} parameter(s)",
            name,
            params.len()
        );
        match self.host.execute(&name, params).await {
            Ok(envelope) => ResponseWriter::success(&envelope),
            Err(e) => {
                tracing::warn!("handler '{}' failed: {}", name, e);
                ResponseWriter::failure(&e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::HostRegistry;

    #[tokio::test]
    async fn test_router_creation() {
        let dir = tempfile::tempdir().unwrap();
        let host = Arc::new(ScriptHost::new(dir.path(), HostRegistry::new()).unwrap());
        let router = HandlerRouter::new(host.clone());
        assert_eq!(router.host.handlers_dir(), host.handlers_dir());
    }
}
