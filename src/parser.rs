use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::{Method, StatusCode, Uri};

use crate::conduit::BodyConduit;
use crate::error::{InvalidRequest, RequestError};
use crate::headers::HeaderMap;
use crate::types::{HttpVersion, RequestHead};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configurable limits for the HTTP parser.
///
/// All sizes are in bytes unless stated otherwise.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Maximum length of the HTTP method token (default: 16).
    pub max_method_len: usize,
    /// Maximum length of the request URI (default: 8 192).
    pub max_uri_len: usize,
    /// Maximum length of a single header field name (default: 256).
    pub max_header_name_len: usize,
    /// Maximum length of a single header field value (default: 8 192).
    pub max_header_value_len: usize,
    /// Maximum number of header fields (default: 128).
    pub max_headers_count: usize,
    /// Maximum total body size enforced by the body conduit (default: 10 MiB).
    pub max_body_size: usize,
    /// How long a blocking pull read waits for the next buffer before
    /// failing with [`crate::error::ConduitError::Timeout`] (default: 30s).
    pub read_timeout: Duration,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_method_len: 16,
            max_uri_len: 8_192,
            max_header_name_len: 256,
            max_header_value_len: 8_192,
            max_headers_count: 128,
            max_body_size: 10 * 1024 * 1024,
            read_timeout: Duration::from_secs(30),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse status
// ---------------------------------------------------------------------------

/// Outcome of a [`Parser::offer`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStatus {
    /// The request, including its body and trailers, has been fully
    /// consumed. Carries the **total** number of bytes consumed so far;
    /// any bytes past this offset belong to a subsequent request and
    /// should be fed to a fresh `Parser` (HTTP pipelining).
    Complete(usize),
    /// The parser needs more data before the request is complete.
    Incomplete,
}

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    // ---- Request line ----
    Method,
    Uri,
    Version,

    // ---- Header section (reused for trailers via `parsing_trailers`) ----
    HeaderStart,
    HeaderName,
    HeaderValueOws,
    HeaderValue,

    // ---- Fixed-length body ----
    Body,

    // ---- Chunked transfer encoding ----
    ChunkSize,
    ChunkExt,
    ChunkData,
    ChunkDataDone,

    // ---- Done ----
    Complete,
}

/// Callback invoked exactly once per request, at the header/body boundary:
/// `(head, conduit)`. `conduit` is `None` when the request carries no
/// body at all, and `Some` — already closed for a zero-length body, open
/// otherwise — for a fixed-length or chunked body.
pub type OnHeaders = Box<dyn FnMut(RequestHead, Option<Arc<BodyConduit>>)>;

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// An incremental, single-request HTTP/1.x parser.
///
/// Lives on the network-reader thread: [`Parser::offer`] never blocks.
/// Header bytes are consumed one at a time; fixed-length and chunked body
/// data is bulk-copied straight into the [`BodyConduit`] the parser
/// allocates once the header block ends, so the body never touches an
/// internal buffer.
///
/// # Usage
///
/// ```rust
/// use wireframe::{Parser, ParseStatus};
///
/// let mut parser = Parser::new(Box::new(|head, _conduit| {
///     assert_eq!(head.uri.path(), "/");
/// }));
///
/// let status = parser.offer(b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n").unwrap();
/// assert!(matches!(status, ParseStatus::Complete(_)));
/// ```
pub struct Parser {
    state: State,
    config: ParserConfig,
    bytes_consumed: usize,

    // Accumulation buffers
    method_buf: Vec<u8>,
    uri_buf: Vec<u8>,
    version_buf: Vec<u8>,
    header_name_buf: Vec<u8>,
    header_value_buf: Vec<u8>,
    chunk_size_buf: Vec<u8>,

    // Parsed components
    method: Option<Method>,
    uri: Option<Uri>,
    version: Option<HttpVersion>,
    headers: HeaderMap,
    trailers: HeaderMap,
    parsing_trailers: bool,

    // Body bookkeeping
    body_remaining: usize,
    chunk_remaining: usize,
    conduit: Option<Arc<BodyConduit>>,

    on_headers: OnHeaders,
}

impl Parser {
    /// Create a new parser with default configuration.
    pub fn new(on_headers: OnHeaders) -> Self {
        Self::with_config(ParserConfig::default(), on_headers)
    }

    /// Create a new parser with custom limits.
    pub fn with_config(config: ParserConfig, on_headers: OnHeaders) -> Self {
        Self {
            state: State::Method,
            config,
            bytes_consumed: 0,
            method_buf: Vec::with_capacity(8),
            uri_buf: Vec::with_capacity(256),
            version_buf: Vec::with_capacity(8),
            header_name_buf: Vec::with_capacity(32),
            header_value_buf: Vec::with_capacity(128),
            chunk_size_buf: Vec::with_capacity(16),
            method: None,
            uri: None,
            version: None,
            headers: HeaderMap::new(),
            trailers: HeaderMap::new(),
            parsing_trailers: false,
            body_remaining: 0,
            chunk_remaining: 0,
            conduit: None,
            on_headers,
        }
    }

    /// Feed a slice of bytes into the parser.
    ///
    /// May be called repeatedly with arbitrarily small slices; partial
    /// tokens are retained across calls. A parser handles exactly one
    /// request — calling `offer` again once [`Parser::is_complete`] is
    /// already `true` is itself a framing violation.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError`] on any protocol violation, limit breach,
    /// or conduit-boundary failure.
    pub fn offer(&mut self, data: &[u8]) -> Result<ParseStatus, RequestError> {
        if self.state == State::Complete {
            return Err(RequestError::Invalid(InvalidRequest::bad_request(
                "request body too long",
                "offer() called after the request was already complete",
            )));
        }

        let mut i = 0;

        while i < data.len() {
            if self.state == State::Complete {
                break;
            }

            // ----- Bulk-copy paths for body states -----
            match self.state {
                State::Body => {
                    let available = data.len() - i;
                    let to_copy = available.min(self.body_remaining);
                    self.push_body_bytes(&data[i..i + to_copy])?;
                    self.body_remaining -= to_copy;
                    self.bytes_consumed += to_copy;
                    i += to_copy;

                    if self.body_remaining == 0 {
                        if i < data.len() {
                            return Err(bad_request(
                                "request body too long",
                                "received more bytes than the declared Content-Length",
                            )
                            .into());
                        }
                        self.finish_body();
                    }
                    continue;
                }
                State::ChunkData => {
                    let available = data.len() - i;
                    let to_copy = available.min(self.chunk_remaining);
                    self.push_body_bytes(&data[i..i + to_copy])?;
                    self.chunk_remaining -= to_copy;
                    self.bytes_consumed += to_copy;
                    i += to_copy;

                    if self.chunk_remaining == 0 {
                        self.state = State::ChunkDataDone;
                    }
                    continue;
                }
                _ => {}
            }

            // ----- Byte-by-byte path -----
            let byte = data[i];
            self.bytes_consumed += 1;
            i += 1;

            match self.state {
                // ===================== REQUEST LINE =====================
                State::Method => {
                    if byte == b' ' {
                        self.method = Some(parse_method(&self.method_buf)?);
                        self.state = State::Uri;
                    } else if is_tchar(byte) {
                        if self.method_buf.len() >= self.config.max_method_len {
                            return Err(bad_request("method too long", "HTTP method exceeds configured limit").into());
                        }
                        self.method_buf.push(byte);
                    } else {
                        return Err(unexpected(byte, "token character or SP in request method").into());
                    }
                }

                State::Uri => {
                    if byte == b' ' {
                        if self.uri_buf.is_empty() {
                            return Err(bad_request("empty URI", "request target was empty").into());
                        }
                        self.uri = Some(parse_uri(&self.uri_buf)?);
                        self.state = State::Version;
                    } else if byte > b' ' && byte != 0x7F {
                        if self.uri_buf.len() >= self.config.max_uri_len {
                            return Err(InvalidRequest::new(
                                StatusCode::URI_TOO_LONG,
                                "URI too long",
                                "request target exceeds configured limit",
                            )
                            .into());
                        }
                        self.uri_buf.push(byte);
                    } else {
                        return Err(unexpected(byte, "visible character or SP in request URI").into());
                    }
                }

                State::Version => {
                    if byte == b'\r' {
                        // ignored; a bare LF alone terminates the line
                    } else if byte == b'\n' {
                        self.version = Some(HttpVersion::from_bytes(&self.version_buf)?);
                        self.state = State::HeaderStart;
                    } else if byte >= b' ' && byte != 0x7F {
                        if self.version_buf.len() >= 16 {
                            return Err(bad_request("version too long", "HTTP version string too long").into());
                        }
                        self.version_buf.push(byte);
                    } else {
                        return Err(unexpected(byte, "version character, CR, or LF").into());
                    }
                }

                // ===================== HEADERS / TRAILERS =====================
                State::HeaderStart => {
                    if byte == b'\r' {
                        // ignored
                    } else if byte == b'\n' {
                        if self.parsing_trailers {
                            self.finish_body();
                        } else {
                            self.determine_body_handling()?;
                        }
                    } else if is_tchar(byte) {
                        if !self.parsing_trailers && self.headers.len() >= self.config.max_headers_count {
                            return Err(InvalidRequest::new(
                                StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE,
                                "too many headers",
                                "number of headers exceeds configured limit",
                            )
                            .into());
                        }
                        self.header_name_buf.clear();
                        self.header_name_buf.push(byte);
                        self.state = State::HeaderName;
                    } else {
                        return Err(unexpected(byte, "header name character, CR, or LF").into());
                    }
                }

                State::HeaderName => {
                    if byte == b'\r' {
                        // ignored mid-token
                    } else if byte == b':' {
                        self.header_value_buf.clear();
                        self.state = State::HeaderValueOws;
                    } else if byte == b'\n' {
                        return Err(bad_request("malformed header", "header name contained LF").into());
                    } else if is_tchar(byte) {
                        let limit = if self.parsing_trailers { usize::MAX } else { self.config.max_header_name_len };
                        if self.header_name_buf.len() >= limit {
                            return Err(InvalidRequest::new(
                                StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE,
                                "header too large",
                                "header name exceeds configured limit",
                            )
                            .into());
                        }
                        self.header_name_buf.push(byte);
                    } else {
                        return Err(unexpected(byte, "header name character or ':'").into());
                    }
                }

                State::HeaderValueOws => {
                    if byte == b' ' || byte == b'\t' {
                        // leading OWS skipped
                    } else if byte == b'\r' {
                        // ignored
                    } else if byte == b'\n' {
                        self.store_current_header();
                        self.state = State::HeaderStart;
                    } else if is_field_content_byte(byte) {
                        self.header_value_buf.push(byte);
                        self.state = State::HeaderValue;
                    } else {
                        return Err(unexpected(byte, "header value character, OWS, CR, or LF").into());
                    }
                }

                State::HeaderValue => {
                    if byte == b'\r' {
                        // ignored
                    } else if byte == b'\n' {
                        while self.header_value_buf.last().is_some_and(|&b| b == b' ' || b == b'\t') {
                            self.header_value_buf.pop();
                        }
                        self.store_current_header();
                        self.state = State::HeaderStart;
                    } else if is_field_content_byte(byte) {
                        let limit = if self.parsing_trailers { usize::MAX } else { self.config.max_header_value_len };
                        if self.header_value_buf.len() >= limit {
                            return Err(InvalidRequest::new(
                                StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE,
                                "header too large",
                                "header value exceeds configured limit",
                            )
                            .into());
                        }
                        self.header_value_buf.push(byte);
                    } else {
                        return Err(unexpected(byte, "header value character, CR, or LF").into());
                    }
                }

                // ===================== CHUNKED ENCODING =====================
                State::ChunkSize => {
                    if byte == b'\r' {
                        // ignored
                    } else if byte == b';' {
                        self.apply_chunk_size()?;
                        self.state = State::ChunkExt;
                    } else if byte == b'\n' {
                        self.apply_chunk_size()?;
                        self.enter_data_or_trailers();
                    } else if byte.is_ascii_hexdigit() {
                        self.chunk_size_buf.push(byte);
                    } else {
                        return Err(unexpected(byte, "hex digit, ';', CR, or LF in chunk size").into());
                    }
                }

                State::ChunkExt => {
                    // RFC 9112 §7.1.1: ignore chunk extensions.
                    if byte == b'\n' {
                        self.enter_data_or_trailers();
                    }
                }

                // ChunkData is handled by the bulk-copy path above.
                State::ChunkDataDone => {
                    if byte == b'\r' {
                        // ignored
                    } else if byte == b'\n' {
                        self.chunk_size_buf.clear();
                        self.state = State::ChunkSize;
                    } else {
                        return Err(unexpected(byte, "LF after chunk data").into());
                    }
                }

                // Body & ChunkData handled above; Complete checked at loop top.
                State::Body | State::ChunkData | State::Complete => {
                    unreachable!("handled by bulk-copy or early-return paths");
                }
            }
        }

        if self.state == State::Complete {
            Ok(ParseStatus::Complete(self.bytes_consumed))
        } else {
            Ok(ParseStatus::Incomplete)
        }
    }

    /// Returns `true` once the current request, including its body and any
    /// trailers, has been fully consumed.
    pub fn is_complete(&self) -> bool {
        self.state == State::Complete
    }

    /// Total number of bytes consumed across all `offer` calls.
    pub fn bytes_consumed(&self) -> usize {
        self.bytes_consumed
    }

    /// Trailer headers observed during a chunked body; only meaningful to
    /// read after [`Parser::is_complete`] is `true`.
    pub fn trailers(&self) -> &HeaderMap {
        &self.trailers
    }

    /// Tell the parser the peer disconnected before the request finished.
    /// Closes any live body conduit so a blocked handler thread wakes up
    /// with an error, without otherwise altering parser state.
    pub fn notify_peer_closed(&mut self) {
        if let Some(conduit) = &self.conduit {
            conduit.close();
        }
    }

    // ----- helpers --------------------------------------------------------

    fn push_body_bytes(&mut self, bytes: &[u8]) -> Result<(), RequestError> {
        if bytes.is_empty() {
            return Ok(());
        }
        if let Some(conduit) = &self.conduit {
            conduit
                .hand_off(Bytes::copy_from_slice(bytes), Box::new(|_| {}))
                .map_err(RequestError::Conduit)?;
        }
        Ok(())
    }

    fn finish_body(&mut self) {
        if let Some(conduit) = &self.conduit {
            conduit.close();
        }
        self.state = State::Complete;
    }

    /// Move accumulated header name/value buffers into the current header
    /// target — the request's own headers, or the chunked trailer block.
    fn store_current_header(&mut self) {
        let name = String::from_utf8_lossy(&self.header_name_buf).into_owned();
        let value = String::from_utf8_lossy(&self.header_value_buf).into_owned();
        let target = if self.parsing_trailers { &mut self.trailers } else { &mut self.headers };
        target.get_all_mut(&name).push(value);
    }

    /// Inspect parsed headers to decide how to read the body, and invoke
    /// `on_headers` exactly once at the header/body boundary.
    fn determine_body_handling(&mut self) -> Result<(), RequestError> {
        // Transfer-Encoding may arrive as separate header lines that all fold
        // into one HeaderMap entry's value list; check every occurrence, not
        // just the first (mirrors the content-length handling just below).
        let has_chunked = self
            .headers
            .get_all("transfer-encoding")
            .iter()
            .any(|v| v.to_ascii_lowercase().contains("chunked"));

        let cl_values = self.headers.get_all("content-length").to_vec();
        let has_content_length = !cl_values.is_empty();

        if has_chunked && has_content_length {
            return Err(bad_request(
                "conflicting framing headers",
                "both Content-Length and Transfer-Encoding were present",
            )
            .into());
        }

        if cl_values.len() > 1 {
            let first = cl_values[0].trim();
            if !cl_values.iter().all(|v| v.trim() == first) {
                return Err(bad_request("conflicting Content-Length", "multiple differing Content-Length values").into());
            }
        }

        let head = self.take_head();

        if has_chunked {
            self.chunk_size_buf.clear();
            self.state = State::ChunkSize;
            let conduit = Arc::new(BodyConduit::new(self.config.max_body_size, self.config.read_timeout));
            self.conduit = Some(conduit.clone());
            (self.on_headers)(head, Some(conduit));
            return Ok(());
        }

        if let Some(cl_str) = cl_values.first() {
            let length: usize = cl_str
                .trim()
                .parse()
                .map_err(|_| bad_request("invalid Content-Length", format!("'{cl_str}' is not a valid length")))?;

            if length == 0 {
                self.state = State::Complete;
                let conduit = BodyConduit::empty();
                (self.on_headers)(head, Some(conduit));
            } else {
                self.body_remaining = length;
                self.state = State::Body;
                let conduit = Arc::new(BodyConduit::new(self.config.max_body_size, self.config.read_timeout));
                self.conduit = Some(conduit.clone());
                (self.on_headers)(head, Some(conduit));
            }
        } else {
            self.state = State::Complete;
            (self.on_headers)(head, None);
        }

        Ok(())
    }

    fn take_head(&mut self) -> RequestHead {
        RequestHead {
            method: self.method.clone().expect("method set before header block ends"),
            uri: self.uri.clone().expect("uri set before header block ends"),
            version: self.version.expect("version set before header block ends"),
            headers: std::mem::take(&mut self.headers),
        }
    }

    /// Parse the hex chunk-size that was accumulated in `chunk_size_buf`.
    /// The overall body-size budget is enforced by the conduit itself as
    /// bytes actually arrive, not here.
    fn apply_chunk_size(&mut self) -> Result<(), RequestError> {
        if self.chunk_size_buf.is_empty() {
            return Err(bad_request("invalid chunk size", "empty chunk size").into());
        }

        let size_str = String::from_utf8_lossy(&self.chunk_size_buf);
        let size = usize::from_str_radix(size_str.trim(), 16)
            .map_err(|_| bad_request("invalid chunk size", format!("'{size_str}' is not valid hex")))?;

        self.chunk_remaining = size;
        Ok(())
    }

    /// Common continuation after a chunk-size (or chunk-extension) LF: a
    /// zero-size chunk enters the trailer block regardless of whether it
    /// carried an extension.
    fn enter_data_or_trailers(&mut self) {
        if self.chunk_remaining == 0 {
            self.parsing_trailers = true;
            self.state = State::HeaderStart;
        } else {
            self.state = State::ChunkData;
        }
    }
}

fn bad_request(public_msg: &str, private_detail: impl Into<String>) -> InvalidRequest {
    InvalidRequest::bad_request(public_msg.to_string(), private_detail)
}

fn unexpected(found: u8, expected: &str) -> InvalidRequest {
    InvalidRequest::bad_request(
        "malformed request",
        format!("unexpected byte 0x{found:02X} (expected {expected})"),
    )
}

fn parse_method(bytes: &[u8]) -> Result<Method, InvalidRequest> {
    Method::from_bytes(bytes)
        .map_err(|_| bad_request("invalid HTTP method", format!("'{}' is not a valid method token", String::from_utf8_lossy(bytes))))
}

fn parse_uri(bytes: &[u8]) -> Result<Uri, InvalidRequest> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse::<Uri>().ok())
        .ok_or_else(|| bad_request("invalid request URI", format!("'{}' is not a valid URI reference", String::from_utf8_lossy(bytes))))
}

// ---------------------------------------------------------------------------
// Character classification helpers (RFC 9110 / RFC 9112)
// ---------------------------------------------------------------------------

/// `tchar` – characters allowed in HTTP tokens (method, header names).
///
/// ```text
/// tchar = "!" / "#" / "$" / "%" / "&" / "'" / "*" / "+" / "-" / "." /
///         "^" / "_" / "`" / "|" / "~" / DIGIT / ALPHA
/// ```
#[inline]
fn is_tchar(b: u8) -> bool {
    matches!(
        b,
        b'!' | b'#'
            | b'$'
            | b'%'
            | b'&'
            | b'\''
            | b'*'
            | b'+'
            | b'-'
            | b'.'
            | b'^'
            | b'_'
            | b'`'
            | b'|'
            | b'~'
            | b'0'..=b'9'
            | b'a'..=b'z'
            | b'A'..=b'Z'
    )
}

/// Bytes permitted inside a header field value:
/// `SP / HTAB / VCHAR / obs-text`.
///
/// VCHAR = 0x21..=0x7E, obs-text = 0x80..=0xFF.
#[inline]
fn is_field_content_byte(b: u8) -> bool {
    b == b' ' || b == b'\t' || (0x21..=0x7E).contains(&b) || b >= 0x80
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
