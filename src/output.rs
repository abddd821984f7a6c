use serde_json::{json, Value};

use crate::buffered::BufferedRequest;

/// Serialize a [`BufferedRequest`] to a JSON string.
///
/// `http::Method` and `http::Uri` don't implement `serde::Serialize`, so
/// the JSON value is built by hand rather than derived.
///
/// When `pretty` is `true` the output is indented for readability.
pub fn format_json(request: &BufferedRequest, pretty: bool) -> String {
    let value = to_json_value(request);
    if pretty {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    }
    .unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
}

fn to_json_value(request: &BufferedRequest) -> Value {
    let headers: Vec<Value> = request
        .head
        .headers
        .iter()
        .map(|(name, values)| json!({ "name": name, "values": values }))
        .collect();

    let body = if request.body.is_empty() {
        None
    } else {
        match std::str::from_utf8(&request.body) {
            Ok(s) => Some(Value::String(s.to_string())),
            Err(_) => Some(json!({ "binary_len": request.body.len() })),
        }
    };

    json!({
        "method": request.head.method.as_str(),
        "uri": request.head.uri.to_string(),
        "version": request.head.version.as_str(),
        "headers": headers,
        "body": body,
    })
}

/// Render a [`BufferedRequest`] in a human-readable debug format.
pub fn format_debug(request: &BufferedRequest) -> String {
    let mut out = String::with_capacity(256);

    out.push_str("=== HTTP Request ===\n");
    out.push_str(&format!("Method:  {}\n", request.head.method));
    out.push_str(&format!("URI:     {}\n", request.head.uri));
    out.push_str(&format!("Version: {}\n", request.head.version));

    out.push_str(&format!("\n--- Headers ({}) ---\n", request.head.headers.len()));
    for (name, values) in request.head.headers.iter() {
        for value in values {
            out.push_str(&format!("  {name}: {value}\n"));
        }
    }

    if request.body.is_empty() {
        out.push_str("\n--- No Body ---\n");
    } else {
        out.push_str(&format!("\n--- Body ({} bytes) ---\n", request.body.len()));
        match request.body_as_str() {
            Some(s) => out.push_str(s),
            None => out.push_str(&format!("<binary data: {} bytes>", request.body.len())),
        }
        out.push('\n');
    }

    if !request.trailers.is_empty() {
        out.push_str(&format!("\n--- Trailers ({}) ---\n", request.trailers.len()));
        for (name, values) in request.trailers.iter() {
            for value in values {
                out.push_str(&format!("  {name}: {value}\n"));
            }
        }
    }

    out.push_str("====================\n");
    out
}

/// Render only the request line and headers (no body, no trailers).
pub fn format_headers_only(request: &BufferedRequest) -> String {
    let mut out = String::with_capacity(64 + request.head.headers.len() * 40);

    out.push_str(&format!(
        "{} {} {}\n",
        request.head.method, request.head.uri, request.head.version
    ));

    for (name, values) in request.head.headers.iter() {
        for value in values {
            out.push_str(&format!("{name}: {value}\n"));
        }
    }

    out
}
