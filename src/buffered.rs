//! One-shot convenience wrappers around [`Parser`] for callers who have
//! the entire request already in memory and don't need the conduit's
//! streaming or push-mode features.

use std::cell::RefCell;
use std::io::{self, Read};
use std::rc::Rc;
use std::sync::Arc;

use crate::conduit::BodyConduit;
use crate::error::{ConduitError, InvalidRequest, RequestError};
use crate::headers::HeaderMap;
use crate::parser::{OnHeaders, ParseStatus, Parser, ParserConfig};
use crate::types::RequestHead;

/// A fully-parsed request with its body collected into a single buffer.
///
/// Produced by [`parse_request_buffered`] / [`parse_request_buffered_with_config`];
/// unlike [`Parser`] directly, this never exposes a live [`BodyConduit`] —
/// the body has already been drained by the time it's returned.
#[derive(Debug, Clone)]
pub struct BufferedRequest {
    pub head: RequestHead,
    pub body: Vec<u8>,
    pub trailers: HeaderMap,
}

impl BufferedRequest {
    /// The body interpreted as UTF-8, if valid.
    pub fn body_as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}

/// Parse a complete HTTP request from a byte slice in one call.
///
/// This is a convenience wrapper around [`Parser`] for callers that
/// already hold the whole request in memory. For streaming use-cases —
/// bodies larger than you want to buffer, or push-mode delivery — drive
/// a [`Parser`] directly.
///
/// # Errors
///
/// Returns [`RequestError`] if the data is malformed or the request is
/// incomplete.
pub fn parse_request_buffered(data: &[u8]) -> Result<BufferedRequest, RequestError> {
    parse_request_buffered_with_config(data, ParserConfig::default())
}

/// Like [`parse_request_buffered`], but with custom [`ParserConfig`] limits.
///
/// # Errors
///
/// Returns [`RequestError`] if the data is malformed, incomplete, or
/// exceeds the configured limits.
pub fn parse_request_buffered_with_config(
    data: &[u8],
    config: ParserConfig,
) -> Result<BufferedRequest, RequestError> {
    type Captured = Rc<RefCell<Option<(RequestHead, Option<Arc<BodyConduit>>)>>>;
    let captured: Captured = Rc::new(RefCell::new(None));
    let captured_for_cb = captured.clone();
    let on_headers: OnHeaders = Box::new(move |head, conduit| {
        *captured_for_cb.borrow_mut() = Some((head, conduit));
    });

    let mut parser = Parser::with_config(config, on_headers);
    match parser.offer(data)? {
        ParseStatus::Complete(_) => {}
        ParseStatus::Incomplete => {
            return Err(RequestError::Invalid(InvalidRequest::bad_request(
                "incomplete request",
                "request data ended before the request was fully framed",
            )));
        }
    }

    let (head, conduit) = captured
        .borrow_mut()
        .take()
        .expect("on_headers fires before offer() can report Complete");

    let body = match conduit {
        Some(conduit) => drain(&conduit)?,
        None => Vec::new(),
    };

    Ok(BufferedRequest {
        head,
        body,
        trailers: parser.trailers().clone(),
    })
}

/// Drain an already-closed conduit into a single buffer. Safe to call
/// without blocking here because the whole request was handed to the
/// parser in one `offer()` call before this runs.
fn drain(conduit: &BodyConduit) -> Result<Vec<u8>, RequestError> {
    let mut out = Vec::new();
    let mut buf = [0u8; 8192];
    let mut reader: &BodyConduit = conduit;
    loop {
        let n = reader.read(&mut buf).map_err(io_err_to_conduit_error)?;
        if n == 0 {
            break;
        }
        out.extend_from_slice(&buf[..n]);
    }
    Ok(out)
}

/// Recover the original [`ConduitError`] from an [`io::Error`] produced by
/// [`BodyConduit::read`]. These errors are built via `ConduitError::into`,
/// which boxes the original value as the `io::Error`'s source, so
/// downcasting it back out preserves the exact cause instead of guessing
/// from `kind()` (which can't distinguish `BudgetExceeded` from
/// `ListenerAlreadyInstalled`, both mapped to `io::ErrorKind::Other`). The
/// "a listener has been installed" error is built from a plain `&str`
/// rather than a `ConduitError`, so the downcast fails there and falls
/// back to `Interrupted`.
fn io_err_to_conduit_error(e: io::Error) -> RequestError {
    let cause = e
        .into_inner()
        .and_then(|inner| inner.downcast::<ConduitError>().ok())
        .map(|boxed| *boxed)
        .unwrap_or(ConduitError::Interrupted);
    RequestError::Conduit(cause)
}
