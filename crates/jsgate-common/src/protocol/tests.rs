use serde_json::{json, Value};

use super::{EnvelopeBody, ErrorEnvelope, JsgateError, ResponseEnvelope};

#[test]
fn test_http_status_in_range_passes_through() {
    let envelope = ResponseEnvelope {
        status: "success".into(),
        err_code: 418,
        data: Value::Null,
    };
    assert_eq!(envelope.http_status(), 418);
}

#[test]
fn test_http_status_out_of_range_maps_to_500() {
    for err_code in [0, -1, 99, 600, 70000] {
        let envelope = ResponseEnvelope {
            status: "success".into(),
            err_code,
            data: Value::Null,
        };
        assert_eq!(envelope.http_status(), 500, "err_code {}", err_code);
    }
}

#[test]
fn test_envelope_body_serializes_status_and_data() {
    let envelope = ResponseEnvelope {
        status: "success".into(),
        err_code: 200,
        data: json!({"cf": "bine"}),
    };
    let body = serde_json::to_string(&envelope.body()).unwrap();
    assert_eq!(body, r#"{"status":"success","data":{"cf":"bine"}}"#);
}

#[test]
fn test_envelope_body_preserves_nested_data() {
    let data = json!({"scores": [1, 2, 3], "name": "ana"});
    let envelope = ResponseEnvelope {
        status: "success".into(),
        err_code: 200,
        data: data.clone(),
    };
    let encoded = serde_json::to_string(&envelope.body()).unwrap();
    let decoded: EnvelopeBody = serde_json::from_str(&encoded).unwrap();
    assert_eq!(decoded.data, data);
}

#[test]
fn test_error_envelope_has_fixed_status() {
    let body = ErrorEnvelope::new("something broke").body();
    assert_eq!(body.status, "error");
    assert_eq!(body.data, json!("something broke"));
}

#[test]
fn test_error_messages_are_distinct_per_failure() {
    let malformed = JsgateError::MalformedReturn("`status` is not a string".into());
    assert_eq!(
        malformed.to_string(),
        "Malformed return object: `status` is not a string"
    );

    let entry = JsgateError::EntryPoint("`handle` is not a function".into());
    assert_eq!(
        entry.to_string(),
        "Entry point violation: `handle` is not a function"
    );

    let timeout = JsgateError::Timeout(250);
    assert_eq!(timeout.to_string(), "Execution timeout after 250ms");
}
