//! HTTP response writing.
//!
//! Every request that reaches the router produces exactly one JSON body.
//! Success responses take their status code from the envelope's `errCode`;
//! failure responses always commit an explicit status (404 for a missing
//! handler script, 500 otherwise) instead of leaking a transport default.

use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::{Request, Response, StatusCode};

use crate::protocol::{ErrorEnvelope, JsgateError, ResponseEnvelope};

/// Type alias for hyper incoming requests.
pub type HyperRequest = Request<Incoming>;

/// Type alias for hyper responses with a full body.
pub type HyperResponse = Response<Full<Bytes>>;

/// Serializes envelopes onto the wire.
pub struct ResponseWriter;

impl ResponseWriter {
    /// Write a validated envelope: status from `errCode`, body
    /// `{"status": ..., "data": ...}`.
    pub fn success(envelope: &ResponseEnvelope) -> HyperResponse {
        if !(100..=599).contains(&envelope.err_code) {
            tracing::warn!(
                "errCode {} outside the valid HTTP range, writing 500",
                envelope.err_code
            );
        }
        let status = StatusCode::from_u16(envelope.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self::json(status, &envelope.body())
    }

    /// Write an error envelope: `{"status": "error", "data": <message>}`.
    pub fn failure(err: &JsgateError) -> HyperResponse {
        let status = match err {
            JsgateError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::json(status, &ErrorEnvelope::new(err.to_string()).body())
    }

    fn json(status: StatusCode, body: &impl serde::Serialize) -> HyperResponse {
        let bytes = serde_json::to_vec(body).unwrap_or_default();
        Response::builder()
            .status(status)
            .header("Content-Type", "application/json")
            .body(Full::new(Bytes::from(bytes)))
            .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_success_uses_err_code_as_status() {
        let envelope = ResponseEnvelope {
            status: "success".into(),
            err_code: 201,
            data: Value::Null,
        };
        let response = ResponseWriter::success(&envelope);
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response.headers().get("Content-Type").unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_success_clamps_out_of_range_err_code() {
        let envelope = ResponseEnvelope {
            status: "success".into(),
            err_code: 9000,
            data: Value::Null,
        };
        let response = ResponseWriter::success(&envelope);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_failure_is_500_with_error_body() {
        let response =
            ResponseWriter::failure(&JsgateError::Execution("handler blew up".into()));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_missing_handler_is_404() {
        let response = ResponseWriter::failure(&JsgateError::NotFound("nope".into()));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_error_body_shape() {
        let body = ErrorEnvelope::new("boom").body();
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"status": "error", "data": "boom"})
        );
    }
}
