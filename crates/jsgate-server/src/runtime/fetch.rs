//! Blocking HTTP GET for the `gFetch` capability.
//!
//! Boa native functions are synchronous, so the fetch drives a hyper
//! client connection on a shared tokio runtime and blocks the calling
//! thread until the response or the timeout arrives. Plain-HTTP only;
//! redirects are returned as-is, not followed.

use std::collections::BTreeMap;
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use http_body_util::{BodyExt, Empty};
use hyper::body::Bytes;
use hyper::header::HOST;
use hyper::Request;
use hyper_util::rt::TokioIo;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use url::Url;

use jsgate_common::protocol::{JsgateError, Result};

/// Shared runtime for blocking fetches, created on first use.
static BLOCKING_RUNTIME: OnceLock<Mutex<tokio::runtime::Runtime>> = OnceLock::new();

fn blocking_runtime() -> std::io::Result<&'static Mutex<tokio::runtime::Runtime>> {
    if let Some(runtime) = BLOCKING_RUNTIME.get() {
        return Ok(runtime);
    }

    let runtime = tokio::runtime::Runtime::new().map(Mutex::new)?;
    Ok(BLOCKING_RUNTIME.get_or_init(|| runtime))
}

/// Native form of a fetched response, before conversion into the script.
#[derive(Debug)]
pub(crate) struct FetchResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl FetchResponse {
    pub fn to_json(&self) -> Value {
        json!({
            "status": self.status,
            "headers": self.headers,
            "body": self.body,
        })
    }
}

/// Perform one blocking GET, bounded by `timeout`.
///
/// Every failure mode (bad URL, unsupported scheme, connection refused,
/// timeout) comes back as a `Capability` error for the caller to throw
/// into the script.
pub(crate) fn http_get(url: &str, timeout: Duration) -> Result<FetchResponse> {
    let runtime = blocking_runtime()
        .map_err(|e| JsgateError::Capability(format!("fetch runtime unavailable: {e}")))?;
    let runtime = runtime
        .lock()
        .map_err(|e| JsgateError::Capability(format!("fetch runtime poisoned: {e}")))?;

    runtime.block_on(async {
        tokio::time::timeout(timeout, fetch_url(url))
            .await
            .map_err(|_| {
                JsgateError::Capability(format!(
                    "fetch timed out after {}ms",
                    timeout.as_millis()
                ))
            })?
    })
}

async fn fetch_url(raw: &str) -> Result<FetchResponse> {
    let url =
        Url::parse(raw).map_err(|e| JsgateError::Capability(format!("invalid URL: {e}")))?;
    if url.scheme() != "http" {
        return Err(JsgateError::Capability(format!(
            "unsupported URL scheme '{}'",
            url.scheme()
        )));
    }
    let host = url
        .host_str()
        .ok_or_else(|| JsgateError::Capability("URL has no host".into()))?;
    let port = url.port_or_known_default().unwrap_or(80);

    let stream = TcpStream::connect((host, port))
        .await
        .map_err(|e| JsgateError::Capability(format!("connect to {host}:{port} failed: {e}")))?;

    let io = TokioIo::new(stream);
    let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
        .await
        .map_err(|e| JsgateError::Capability(format!("handshake failed: {e}")))?;
    tokio::spawn(async move {
        if let Err(e) = conn.await {
            tracing::debug!("fetch connection closed: {}", e);
        }
    });

    let mut path = url.path().to_string();
    if let Some(query) = url.query() {
        path.push('?');
        path.push_str(query);
    }

    let request = Request::builder()
        .uri(path)
        .header(HOST, host)
        .body(Empty::<Bytes>::new())
        .map_err(|e| JsgateError::Capability(format!("request build failed: {e}")))?;

    let response = sender
        .send_request(request)
        .await
        .map_err(|e| JsgateError::Capability(format!("request failed: {e}")))?;

    let status = response.status().as_u16();
    let mut headers = BTreeMap::new();
    for (name, value) in response.headers() {
        headers.insert(
            name.to_string(),
            String::from_utf8_lossy(value.as_bytes()).into_owned(),
        );
    }

    let body = response
        .into_body()
        .collect()
        .await
        .map_err(|e| JsgateError::Capability(format!("body read failed: {e}")))?
        .to_bytes();

    Ok(FetchResponse {
        status,
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_url_is_capability_error() {
        let err = http_get("not a url", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, JsgateError::Capability(_)));
        assert!(err.to_string().contains("invalid URL"));
    }

    #[test]
    fn test_non_http_scheme_is_rejected() {
        let err = http_get("ftp://example.com/file", Duration::from_secs(1)).unwrap_err();
        assert!(err.to_string().contains("unsupported URL scheme"));
    }

    #[test]
    fn test_https_is_rejected() {
        let err = http_get("https://example.com/", Duration::from_secs(1)).unwrap_err();
        assert!(err.to_string().contains("unsupported URL scheme 'https'"));
    }
}
