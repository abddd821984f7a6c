use std::io::Read;
use std::sync::Arc;
use std::thread;

use http::Method;
use wireframe::{
    format_debug, format_headers_only, format_json, parse_request_buffered,
    parse_request_buffered_with_config, BodyConduit, HttpVersion, ParseStatus, Parser,
    ParserConfig, RequestError,
};

// =========================================================================
// Request-line parsing
// =========================================================================

#[test]
fn simple_get_request() {
    let raw = b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n";
    let req = parse_request_buffered(raw).expect("should parse");
    assert_eq!(req.head.method, Method::GET);
    assert_eq!(req.head.uri.path(), "/");
    assert_eq!(req.head.version, HttpVersion::Http11);
    assert_eq!(req.head.headers.len(), 1);
    assert_eq!(req.head.headers.get("Host"), Some("example.com"));
    assert!(req.body.is_empty());
}

#[test]
fn get_with_query_string() {
    let raw = b"GET /api/users?page=1&limit=10 HTTP/1.1\r\nHost: api.example.com\r\nAccept: application/json\r\n\r\n";
    let req = parse_request_buffered(raw).expect("should parse");
    assert_eq!(req.head.method, Method::GET);
    assert_eq!(req.head.uri.path_and_query().unwrap(), "/api/users?page=1&limit=10");
    assert_eq!(req.head.headers.get("Accept"), Some("application/json"));
}

#[test]
fn http_10_version() {
    let raw = b"GET /legacy HTTP/1.0\r\nHost: old.example.com\r\n\r\n";
    let req = parse_request_buffered(raw).expect("should parse");
    assert_eq!(req.head.version, HttpVersion::Http10);
}

#[test]
fn all_standard_methods() {
    let methods = [
        "GET", "HEAD", "POST", "PUT", "DELETE", "CONNECT", "OPTIONS", "TRACE", "PATCH",
    ];

    for name in methods {
        let raw = format!("{name} / HTTP/1.1\r\nHost: h\r\n\r\n");
        let req = parse_request_buffered(raw.as_bytes()).unwrap_or_else(|e| panic!("method {name}: {e}"));
        assert_eq!(req.head.method.as_str(), name, "mismatch for method {name}");
    }
}

#[test]
fn options_asterisk_uri() {
    let raw = b"OPTIONS * HTTP/1.1\r\nHost: example.com\r\n\r\n";
    let req = parse_request_buffered(raw).expect("should parse");
    assert_eq!(req.head.uri, "*");
}

// =========================================================================
// Header parsing
// =========================================================================

#[test]
fn multiple_headers() {
    let raw = b"GET / HTTP/1.1\r\n\
        Host: example.com\r\n\
        Accept: text/html\r\n\
        Accept-Language: en-US\r\n\
        User-Agent: WireFrame/1.0\r\n\
        Connection: keep-alive\r\n\r\n";
    let req = parse_request_buffered(raw).expect("should parse");
    assert_eq!(req.head.headers.len(), 5);
    assert_eq!(req.head.headers.get("Host"), Some("example.com"));
    assert_eq!(req.head.headers.get("Accept"), Some("text/html"));
    assert_eq!(req.head.headers.get("User-Agent"), Some("WireFrame/1.0"));
}

#[test]
fn header_value_ows_is_trimmed() {
    let raw = b"GET / HTTP/1.1\r\nHost:   example.com   \r\n\r\n";
    let req = parse_request_buffered(raw).expect("should parse");
    assert_eq!(req.head.headers.get("Host"), Some("example.com"));
}

#[test]
fn header_value_with_interior_spaces() {
    let raw = b"GET / HTTP/1.1\r\nX-Custom: hello   world\r\n\r\n";
    let req = parse_request_buffered(raw).expect("should parse");
    assert_eq!(req.head.headers.get("X-Custom"), Some("hello   world"));
}

#[test]
fn empty_header_value() {
    let raw = b"GET / HTTP/1.1\r\nHost: example.com\r\nX-Empty:\r\n\r\n";
    let req = parse_request_buffered(raw).expect("should parse");
    assert_eq!(req.head.headers.get("X-Empty"), Some(""));
}

#[test]
fn case_insensitive_header_lookup() {
    let raw = b"GET / HTTP/1.1\r\nhost: example.com\r\ncontent-type: text/plain\r\n\r\n";
    let req = parse_request_buffered(raw).expect("should parse");
    assert_eq!(req.head.headers.get("Host"), Some("example.com"));
    assert_eq!(req.head.headers.get("CONTENT-TYPE"), Some("text/plain"));
}

#[test]
fn duplicate_header_values() {
    let raw = b"GET / HTTP/1.1\r\nHost: h\r\nSet-Cookie: a=1\r\nSet-Cookie: b=2\r\n\r\n";
    let req = parse_request_buffered(raw).expect("should parse");
    assert_eq!(req.head.headers.get_all("Set-Cookie"), &["a=1".to_string(), "b=2".to_string()]);
}

// =========================================================================
// Body parsing (Content-Length)
// =========================================================================

#[test]
fn post_with_content_length_body() {
    let body = "name=John&age=30";
    let raw = format!(
        "POST /submit HTTP/1.1\r\n\
         Host: example.com\r\n\
         Content-Length: {}\r\n\
         Content-Type: application/x-www-form-urlencoded\r\n\r\n\
         {}",
        body.len(),
        body
    );
    let req = parse_request_buffered(raw.as_bytes()).expect("should parse");
    assert_eq!(req.head.method, Method::POST);
    assert_eq!(req.head.uri.path(), "/submit");
    assert_eq!(req.body_as_str(), Some(body));
    assert_eq!(req.head.content_length(), Some(16));
}

#[test]
fn content_length_zero_yields_no_body() {
    let raw = b"POST /empty HTTP/1.1\r\nHost: h\r\nContent-Length: 0\r\n\r\n";
    let req = parse_request_buffered(raw).expect("should parse");
    assert!(req.body.is_empty());
}

#[test]
fn put_with_json_body() {
    let body = r#"{"key":"value"}"#;
    let raw = format!(
        "PUT /resource HTTP/1.1\r\n\
         Host: api.example.com\r\n\
         Content-Type: application/json\r\n\
         Content-Length: {}\r\n\r\n\
         {}",
        body.len(),
        body
    );
    let req = parse_request_buffered(raw.as_bytes()).expect("should parse");
    assert_eq!(req.head.method, Method::PUT);
    assert_eq!(req.body_as_str(), Some(body));
}

#[test]
fn duplicate_identical_content_lengths_accepted() {
    let raw = b"POST / HTTP/1.1\r\nHost: h\r\nContent-Length: 3\r\nContent-Length: 3\r\n\r\nabc";
    let req = parse_request_buffered(raw).expect("should parse");
    assert_eq!(req.body_as_str(), Some("abc"));
}

// =========================================================================
// Chunked transfer encoding
// =========================================================================

#[test]
fn chunked_body_two_chunks() {
    let raw = b"POST /upload HTTP/1.1\r\n\
        Host: example.com\r\n\
        Transfer-Encoding: chunked\r\n\r\n\
        5\r\nHello\r\n6\r\n World\r\n0\r\n\r\n";
    let req = parse_request_buffered(raw).expect("should parse");
    assert_eq!(req.body_as_str(), Some("Hello World"));
    assert!(req.head.is_chunked());
}

#[test]
fn chunked_single_chunk() {
    let raw = b"POST /data HTTP/1.1\r\n\
        Host: h\r\n\
        Transfer-Encoding: chunked\r\n\r\n\
        4\r\nRust\r\n0\r\n\r\n";
    let req = parse_request_buffered(raw).expect("should parse");
    assert_eq!(req.body_as_str(), Some("Rust"));
}

#[test]
fn chunked_with_extension() {
    let raw = b"POST /data HTTP/1.1\r\n\
        Host: h\r\n\
        Transfer-Encoding: chunked\r\n\r\n\
        5;ext=val\r\nHello\r\n0\r\n\r\n";
    let req = parse_request_buffered(raw).expect("should parse");
    assert_eq!(req.body_as_str(), Some("Hello"));
}

#[test]
fn chunked_empty_body_zero_only() {
    let raw = b"POST / HTTP/1.1\r\n\
        Host: h\r\n\
        Transfer-Encoding: chunked\r\n\r\n\
        0\r\n\r\n";
    let req = parse_request_buffered(raw).expect("should parse");
    assert!(req.body.is_empty());
}

#[test]
fn chunked_hex_sizes() {
    // 0xA = 10 bytes, 0x5 = 5 bytes
    let raw = b"POST / HTTP/1.1\r\n\
        Host: h\r\n\
        Transfer-Encoding: chunked\r\n\r\n\
        A\r\n0123456789\r\n5\r\nabcde\r\n0\r\n\r\n";
    let req = parse_request_buffered(raw).expect("should parse");
    assert_eq!(req.body_as_str(), Some("0123456789abcde"));
}

#[test]
fn chunked_with_trailer_fields() {
    let raw = b"POST / HTTP/1.1\r\n\
        Host: h\r\n\
        Transfer-Encoding: chunked\r\n\r\n\
        3\r\nabc\r\n0\r\n\
        Trailer-Field: value\r\n\r\n";
    let req = parse_request_buffered(raw).expect("should parse");
    assert_eq!(req.body_as_str(), Some("abc"));
    assert_eq!(req.trailers.get("Trailer-Field"), Some("value"));
}

#[test]
fn chunked_detection_checks_every_transfer_encoding_occurrence() {
    // Two separate Transfer-Encoding lines fold into one HeaderMap entry
    // whose first value is "gzip" — chunked detection must still see the
    // second occurrence rather than only `get()`'s first value.
    let raw = b"POST / HTTP/1.1\r\n\
        Host: h\r\n\
        Transfer-Encoding: gzip\r\n\
        Transfer-Encoding: chunked\r\n\r\n\
        3\r\nabc\r\n0\r\n\r\n";
    let req = parse_request_buffered(raw).expect("should parse as chunked");
    assert!(req.head.is_chunked());
    assert_eq!(req.body_as_str(), Some("abc"));
}

// =========================================================================
// Incremental (streaming) parsing, driving the conduit directly
// =========================================================================

#[test]
fn incremental_byte_by_byte() {
    let raw = b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n";
    let mut parser = Parser::new(Box::new(|head, _conduit| {
        assert_eq!(head.method, Method::GET);
        assert_eq!(head.uri.path(), "/");
    }));

    for &byte in &raw[..raw.len() - 1] {
        let status = parser.offer(&[byte]).expect("each byte should be ok");
        assert_eq!(status, ParseStatus::Incomplete);
    }

    let status = parser.offer(&[raw[raw.len() - 1]]).expect("last byte");
    assert!(matches!(status, ParseStatus::Complete(_)));
    assert!(parser.is_complete());
}

#[test]
fn incremental_multi_chunk_with_body() {
    let part1 = b"POST /path HTTP/1.1\r\n";
    let part2 = b"Host: example.com\r\n";
    let part3 = b"Content-Length: 5\r\n\r\n";
    let part4 = b"Hello";

    let conduit_slot: Arc<std::sync::Mutex<Option<Arc<BodyConduit>>>> = Arc::new(std::sync::Mutex::new(None));
    let conduit_slot_cb = conduit_slot.clone();
    let mut parser = Parser::new(Box::new(move |head, conduit| {
        assert_eq!(head.uri.path(), "/path");
        *conduit_slot_cb.lock().unwrap() = conduit;
    }));

    assert_eq!(parser.offer(part1).unwrap(), ParseStatus::Incomplete);
    assert_eq!(parser.offer(part2).unwrap(), ParseStatus::Incomplete);
    assert_eq!(parser.offer(part3).unwrap(), ParseStatus::Incomplete);
    assert!(matches!(parser.offer(part4).unwrap(), ParseStatus::Complete(_)));

    let conduit = conduit_slot.lock().unwrap().take().unwrap();
    let mut body = Vec::new();
    let mut reader: &BodyConduit = &conduit;
    reader.read_to_end(&mut body).unwrap();
    assert_eq!(body, b"Hello");
}

#[test]
fn incremental_chunked_body() {
    let mut parser = Parser::new(Box::new(|_head, _conduit| {}));

    assert_eq!(
        parser
            .offer(b"POST / HTTP/1.1\r\nHost: h\r\nTransfer-Encoding: chunked\r\n\r\n")
            .unwrap(),
        ParseStatus::Incomplete
    );
    assert_eq!(parser.offer(b"3\r\nabc\r\n").unwrap(), ParseStatus::Incomplete);
    assert!(matches!(parser.offer(b"0\r\n\r\n").unwrap(), ParseStatus::Complete(_)));
}

#[test]
fn body_conduit_can_be_consumed_from_a_separate_thread() {
    let conduit_slot: Arc<std::sync::Mutex<Option<Arc<BodyConduit>>>> = Arc::new(std::sync::Mutex::new(None));
    let conduit_slot_cb = conduit_slot.clone();
    let mut parser = Parser::new(Box::new(move |_head, conduit| {
        *conduit_slot_cb.lock().unwrap() = conduit;
    }));

    parser
        .offer(b"POST / HTTP/1.1\r\nHost: h\r\nContent-Length: 11\r\n\r\n")
        .unwrap();
    let conduit = conduit_slot.lock().unwrap().take().unwrap();

    let reader_conduit = conduit.clone();
    let handle = thread::spawn(move || {
        let mut body = Vec::new();
        let mut reader: &BodyConduit = &reader_conduit;
        reader.read_to_end(&mut body).unwrap();
        body
    });

    parser.offer(b"hello ").unwrap();
    parser.offer(b"world").unwrap();
    assert!(parser.is_complete());

    let body = handle.join().unwrap();
    assert_eq!(body, b"hello world");
}

// =========================================================================
// Bytes-consumed / pipelining
// =========================================================================

#[test]
fn bytes_consumed_with_trailing_data() {
    let raw = b"GET / HTTP/1.1\r\nHost: h\r\n\r\nGET /next HTTP/1.1\r\n";
    let mut parser = Parser::new(Box::new(|_head, _conduit| {}));
    let status = parser.offer(raw).unwrap();

    if let ParseStatus::Complete(consumed) = status {
        assert_eq!(&raw[consumed..consumed + 3], b"GET");
    } else {
        panic!("expected Complete");
    }
}

#[test]
fn offer_after_complete_is_rejected() {
    let mut parser = Parser::new(Box::new(|_head, _conduit| {}));
    assert!(matches!(
        parser.offer(b"GET /a HTTP/1.1\r\nHost: h\r\n\r\n").unwrap(),
        ParseStatus::Complete(_)
    ));
    assert!(parser.offer(b"GET /b HTTP/1.1\r\n\r\n").is_err());
}

// =========================================================================
// Error conditions
// =========================================================================

#[test]
fn error_invalid_method() {
    let raw = b"FOOBAR / HTTP/1.1\r\nHost: h\r\n\r\n";
    assert!(parse_request_buffered(raw).is_err());
}

#[test]
fn error_empty_method() {
    let raw = b" / HTTP/1.1\r\nHost: h\r\n\r\n";
    assert!(parse_request_buffered(raw).is_err());
}

#[test]
fn error_invalid_version() {
    let raw = b"GET / HTTP/2.0\r\nHost: h\r\n\r\n";
    assert!(parse_request_buffered(raw).is_err());
}

#[test]
fn bare_lf_line_endings_are_tolerated() {
    // RFC 9112 §2.2 permits a lenient server to accept bare LF; this core
    // tolerates CR everywhere and only requires the terminating LF.
    let raw = b"GET / HTTP/1.1\nHost: h\n\n";
    assert!(parse_request_buffered(raw).is_ok());
}

#[test]
fn error_incomplete_request_no_end() {
    let raw = b"GET / HTTP/1.1\r\nHost: h\r\n";
    assert!(parse_request_buffered(raw).is_err());
}

#[test]
fn error_incomplete_body() {
    let raw = b"POST / HTTP/1.1\r\nHost: h\r\nContent-Length: 100\r\n\r\nshort";
    assert!(parse_request_buffered(raw).is_err());
}

#[test]
fn error_body_exceeds_content_length() {
    // Content-Length declares 3 bytes but 4 arrive in the same buffer —
    // this must be rejected outright, not silently completed with the
    // 4th byte left unconsumed as if it started a pipelined request.
    let raw = b"POST / HTTP/1.1\r\nHost: h\r\nContent-Length: 3\r\n\r\nabcd";
    let err = parse_request_buffered(raw).unwrap_err();
    assert!(matches!(err, RequestError::Invalid(_)));
}

#[test]
fn error_differing_content_lengths() {
    let raw = b"POST / HTTP/1.1\r\nHost: h\r\nContent-Length: 3\r\nContent-Length: 5\r\n\r\nabc";
    assert!(parse_request_buffered(raw).is_err());
}

#[test]
fn error_negative_content_length() {
    let raw = b"POST / HTTP/1.1\r\nHost: h\r\nContent-Length: -1\r\n\r\n";
    assert!(parse_request_buffered(raw).is_err());
}

#[test]
fn error_non_numeric_content_length() {
    let raw = b"POST / HTTP/1.1\r\nHost: h\r\nContent-Length: abc\r\n\r\n";
    assert!(parse_request_buffered(raw).is_err());
}

#[test]
fn error_empty_uri() {
    // Two spaces between method and version → empty URI.
    let raw = b"GET  HTTP/1.1\r\nHost: h\r\n\r\n";
    assert!(parse_request_buffered(raw).is_err());
}

#[test]
fn conflicting_content_length_and_transfer_encoding_is_rejected() {
    // RFC 9112 §6.1: a message with both must be treated as an error,
    // not resolved by giving one of them precedence.
    let raw = b"POST / HTTP/1.1\r\n\
        Host: h\r\n\
        Content-Length: 999\r\n\
        Transfer-Encoding: chunked\r\n\r\n\
        3\r\nabc\r\n0\r\n\r\n";
    let err = parse_request_buffered(raw).unwrap_err();
    assert!(matches!(err, RequestError::Invalid(_)));
}

// =========================================================================
// Configuration limits
// =========================================================================

#[test]
fn config_max_body_size_enforced() {
    let config = ParserConfig {
        max_body_size: 5,
        ..ParserConfig::default()
    };
    let raw = b"POST / HTTP/1.1\r\nHost: h\r\nContent-Length: 10\r\n\r\n0123456789";
    assert!(parse_request_buffered_with_config(raw, config).is_err());
}

#[test]
fn config_max_headers_count_enforced() {
    let config = ParserConfig {
        max_headers_count: 2,
        ..ParserConfig::default()
    };
    let raw = b"GET / HTTP/1.1\r\nH1: a\r\nH2: b\r\nH3: c\r\n\r\n";
    assert!(parse_request_buffered_with_config(raw, config).is_err());
}

#[test]
fn config_max_uri_len_enforced() {
    let config = ParserConfig {
        max_uri_len: 5,
        ..ParserConfig::default()
    };
    let raw = b"GET /very-long-uri HTTP/1.1\r\nHost: h\r\n\r\n";
    assert!(parse_request_buffered_with_config(raw, config).is_err());
}

#[test]
fn config_max_header_name_len_enforced() {
    let config = ParserConfig {
        max_header_name_len: 4,
        ..ParserConfig::default()
    };
    let raw = b"GET / HTTP/1.1\r\nVeryLongHeaderName: v\r\n\r\n";
    assert!(parse_request_buffered_with_config(raw, config).is_err());
}

#[test]
fn config_max_header_value_len_enforced() {
    let config = ParserConfig {
        max_header_value_len: 3,
        ..ParserConfig::default()
    };
    let raw = b"GET / HTTP/1.1\r\nHost: very-long-value\r\n\r\n";
    assert!(parse_request_buffered_with_config(raw, config).is_err());
}

#[test]
fn config_chunked_body_too_large() {
    let config = ParserConfig {
        max_body_size: 3,
        ..ParserConfig::default()
    };
    let raw = b"POST / HTTP/1.1\r\n\
        Host: h\r\n\
        Transfer-Encoding: chunked\r\n\r\n\
        5\r\nHello\r\n0\r\n\r\n";
    assert!(parse_request_buffered_with_config(raw, config).is_err());
}

// =========================================================================
// BufferedRequest helper methods
// =========================================================================

#[test]
fn is_chunked_detection() {
    let raw = b"POST / HTTP/1.1\r\n\
        Host: h\r\n\
        Transfer-Encoding: chunked\r\n\r\n\
        0\r\n\r\n";
    let req = parse_request_buffered(raw).unwrap();
    assert!(req.head.is_chunked());
}

#[test]
fn is_not_chunked_without_header() {
    let raw = b"GET / HTTP/1.1\r\nHost: h\r\n\r\n";
    let req = parse_request_buffered(raw).unwrap();
    assert!(!req.head.is_chunked());
}

// =========================================================================
// Output formatting
// =========================================================================

#[test]
fn json_output_compact() {
    let raw = b"GET / HTTP/1.1\r\nHost: h\r\n\r\n";
    let req = parse_request_buffered(raw).unwrap();
    let json = format_json(&req, false);
    assert!(json.contains("\"method\":\"GET\""));
    assert!(json.contains("\"uri\":\"/\""));
    assert!(json.contains("\"version\":\"HTTP/1.1\""));
}

#[test]
fn json_output_pretty() {
    let raw = b"GET /pretty HTTP/1.1\r\nHost: h\r\n\r\n";
    let req = parse_request_buffered(raw).unwrap();
    let json = format_json(&req, true);
    assert!(json.contains('\n'));
    assert!(json.contains("  "));
}

#[test]
fn json_output_with_body() {
    let raw = b"POST / HTTP/1.1\r\nHost: h\r\nContent-Length: 4\r\n\r\ndata";
    let req = parse_request_buffered(raw).unwrap();
    let json = format_json(&req, false);
    assert!(json.contains("\"body\":\"data\""));
}

#[test]
fn debug_output_contains_sections() {
    let raw = b"GET /test HTTP/1.1\r\nHost: h\r\n\r\n";
    let req = parse_request_buffered(raw).unwrap();
    let dbg = format_debug(&req);
    assert!(dbg.contains("=== HTTP Request ==="));
    assert!(dbg.contains("Method:  GET"));
    assert!(dbg.contains("URI:     /test"));
    assert!(dbg.contains("Version: HTTP/1.1"));
    assert!(dbg.contains("--- Headers"));
    assert!(dbg.contains("--- No Body ---"));
}

#[test]
fn headers_only_output() {
    let raw = b"GET /path HTTP/1.1\r\nHost: example.com\r\nAccept: */*\r\n\r\n";
    let req = parse_request_buffered(raw).unwrap();
    let out = format_headers_only(&req);
    assert!(out.starts_with("GET /path HTTP/1.1\n"));
    assert!(out.contains("Host: example.com\n"));
    assert!(out.contains("Accept: */*\n"));
}

// =========================================================================
// Edge cases
// =========================================================================

#[test]
fn large_body_content_length() {
    let body = "X".repeat(100_000);
    let raw = format!(
        "POST / HTTP/1.1\r\n\
         Host: h\r\n\
         Content-Length: {}\r\n\r\n\
         {}",
        body.len(),
        body
    );
    let req = parse_request_buffered(raw.as_bytes()).unwrap();
    assert_eq!(req.body_as_str(), Some(body.as_str()));
}

#[test]
fn many_headers_within_limit() {
    let mut raw = String::from("GET / HTTP/1.1\r\n");
    for i in 0..100 {
        raw.push_str(&format!("X-Header-{i}: value-{i}\r\n"));
    }
    raw.push_str("\r\n");

    let req = parse_request_buffered(raw.as_bytes()).unwrap();
    assert_eq!(req.head.headers.len(), 100);
}

#[test]
fn header_with_obs_text_bytes() {
    // obs-text (0x80-0xFF) is allowed in header values.
    let raw = b"GET / HTTP/1.1\r\nHost: h\r\nX-Custom: hello\x80world\r\n\r\n";
    let req = parse_request_buffered(raw).unwrap();
    let val = req.head.headers.get("X-Custom").unwrap();
    // from_utf8_lossy replaces 0x80 with U+FFFD.
    assert!(val.contains('\u{FFFD}'));
}
