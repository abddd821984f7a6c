use std::fmt;

use http::{Method, Uri};

use crate::error::InvalidRequest;
use crate::headers::HeaderMap;

// ---------------------------------------------------------------------------
// HttpVersion
// ---------------------------------------------------------------------------

/// HTTP protocol version. Only the two versions spec.md §4.1 permits on
/// the request line; anything else is a fatal protocol error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpVersion {
    Http10,
    Http11,
}

impl HttpVersion {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, InvalidRequest> {
        match bytes {
            b"HTTP/1.0" => Ok(Self::Http10),
            b"HTTP/1.1" => Ok(Self::Http11),
            _ => Err(InvalidRequest::bad_request(
                "unsupported HTTP version",
                format!("invalid HTTP version: '{}'", String::from_utf8_lossy(bytes)),
            )),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http10 => "HTTP/1.0",
            Self::Http11 => "HTTP/1.1",
        }
    }
}

impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RequestHead
// ---------------------------------------------------------------------------

/// Everything known about a request at the headers-ready boundary
/// (spec.md §4.1): the request line plus the full header block. Delivered
/// exactly once via the `on_headers` callback; read-only to the handler
/// from that point on.
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: Method,
    pub uri: Uri,
    pub version: HttpVersion,
    pub headers: HeaderMap,
}

impl RequestHead {
    /// Parse the `Content-Length` header, if present and valid.
    pub fn content_length(&self) -> Option<usize> {
        self.headers.get("content-length").and_then(|v| v.trim().parse().ok())
    }

    /// `true` if `Transfer-Encoding` names `chunked` as its last coding
    /// (spec.md §9's substring-based, last-coding match). Checks every
    /// occurrence of the header, since repeated `Transfer-Encoding` lines
    /// fold into one entry's value list rather than the first value alone.
    pub fn is_chunked(&self) -> bool {
        self.headers
            .get_all("transfer-encoding")
            .iter()
            .any(|v| v.to_ascii_lowercase().contains("chunked"))
    }
}

// ---------------------------------------------------------------------------
// 100-continue (spec.md §6)
// ---------------------------------------------------------------------------

/// What the enclosing server should do about `Expect: 100-continue`,
/// decided purely from the already-parsed request head. This crate never
/// writes to a socket; it only hands the decision back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinueDecision {
    /// No `Expect: 100-continue` was present; proceed normally.
    NotRequested,
    /// Emit `100 Continue` before reading the body.
    Send100,
    /// Emit `417 Expectation Failed` and close the connection.
    Expectation417,
}

/// Decide how to handle a `100-continue` expectation at headers-ready time
/// (spec.md §6): present and `Content-Length` fits an `i32` → `Send100`;
/// present otherwise → `Expectation417`; absent → `NotRequested`.
pub fn decide_100_continue(headers: &HeaderMap) -> ContinueDecision {
    let expects_continue = headers
        .get("expect")
        .map(|v| v.eq_ignore_ascii_case("100-continue"))
        .unwrap_or(false);

    if !expects_continue {
        return ContinueDecision::NotRequested;
    }

    let fits_i32 = headers
        .get("content-length")
        .and_then(|v| v.trim().parse::<i64>().ok())
        .map(|n| i32::try_from(n).is_ok())
        .unwrap_or(false);

    let decision = if fits_i32 {
        ContinueDecision::Send100
    } else {
        ContinueDecision::Expectation417
    };
    log::debug!("100-continue decision: {decision:?}");
    decision
}
