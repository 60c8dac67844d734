//! Response envelopes.
//!
//! A `ResponseEnvelope` exists only after the result validator has accepted
//! a handler's return value; the writer consumes it immediately. The
//! `ErrorEnvelope` is the fallback body for every failure upstream of
//! response writing.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Validated result of one handler invocation.
///
/// `err_code` supplies the HTTP status code; `status` and `data` form the
/// response body.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEnvelope {
    pub status: String,
    pub err_code: i64,
    pub data: Value,
}

impl ResponseEnvelope {
    /// HTTP status code for this envelope.
    ///
    /// `err_code` must land in the valid HTTP range (100-599); anything
    /// else maps to 500 rather than producing an unwritable status line.
    pub fn http_status(&self) -> u16 {
        if (100..=599).contains(&self.err_code) {
            self.err_code as u16
        } else {
            500
        }
    }

    /// Wire body for this envelope.
    pub fn body(&self) -> EnvelopeBody {
        EnvelopeBody {
            status: self.status.clone(),
            data: self.data.clone(),
        }
    }
}

/// Wire form of every response body: `{"status": ..., "data": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnvelopeBody {
    pub status: String,
    pub data: Value,
}

/// Fallback envelope written when any stage before the writer fails.
///
/// `status` is fixed to `"error"`; `data` carries the failure description.
#[derive(Debug, Clone)]
pub struct ErrorEnvelope {
    pub message: String,
}

impl ErrorEnvelope {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn body(&self) -> EnvelopeBody {
        EnvelopeBody {
            status: "error".into(),
            data: Value::String(self.message.clone()),
        }
    }
}
