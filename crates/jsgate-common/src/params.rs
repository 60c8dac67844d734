//! Request parameter marshalling.
//!
//! Handlers receive one flat string-to-string map built from the request's
//! query string and form-encoded body. Query parameters are applied first,
//! then body parameters overwrite or add; within a single source the first
//! value for a duplicate key wins. Parsing is permissive: a body that is
//! not form-encoded contributes nothing, it never aborts the request.

use std::collections::BTreeMap;

use url::form_urlencoded;

/// Parameters passed to a handler's entry point for one request.
pub type RequestParams = BTreeMap<String, String>;

/// Content type under which a request body is treated as form parameters.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Merge query and body parameters into one map.
pub fn merge_request_params(
    query: Option<&str>,
    body: &[u8],
    content_type: Option<&str>,
) -> RequestParams {
    let mut params = RequestParams::new();

    if let Some(query) = query {
        collect_pairs(query.as_bytes(), &mut params);
    }

    if is_form_content_type(content_type) {
        let mut body_params = RequestParams::new();
        collect_pairs(body, &mut body_params);
        params.extend(body_params);
    }

    params
}

fn is_form_content_type(content_type: Option<&str>) -> bool {
    content_type
        .map(|ct| {
            ct.trim()
                .to_ascii_lowercase()
                .starts_with(FORM_CONTENT_TYPE)
        })
        .unwrap_or(false)
}

fn collect_pairs(input: &[u8], out: &mut RequestParams) {
    for (key, value) in form_urlencoded::parse(input) {
        out.entry(key.into_owned())
            .or_insert_with(|| value.into_owned());
    }
}
