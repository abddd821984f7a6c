//! # WireFrame
//!
//! An embeddable **HTTP/1.x request-ingestion core**: an incremental,
//! RFC 9112-strict request parser paired with a backpressure-aware body
//! conduit. WireFrame never writes to a socket, never buffers an entire
//! body in memory, and never assumes an async runtime — it hands a
//! request's head to your callback the moment the header block ends, and
//! hands the body off through a small blocking pipe a second thread can
//! pull from or subscribe to.
//!
//! ## Quick start — one-shot parsing
//!
//! ```rust
//! use wireframe::parse_request_buffered;
//!
//! let raw = b"GET /hello HTTP/1.1\r\nHost: example.com\r\n\r\n";
//! let request = parse_request_buffered(raw).expect("valid request");
//! assert_eq!(request.head.method.as_str(), "GET");
//! assert_eq!(request.head.uri.path(), "/hello");
//! ```
//!
//! ## Quick start — incremental parsing with a streamed body
//!
//! ```rust
//! use std::io::Read;
//! use wireframe::{ParseStatus, Parser};
//!
//! let mut body_out = Vec::new();
//! let mut parser = Parser::new(Box::new(|head, conduit| {
//!     assert_eq!(head.uri.path(), "/upload");
//!     if let Some(conduit) = conduit {
//!         let mut reader: &wireframe::BodyConduit = &conduit;
//!         reader.read_to_end(&mut body_out).ok();
//!     }
//! }));
//!
//! let status = parser.offer(b"POST /upload HTTP/1.1\r\n").unwrap();
//! assert_eq!(status, ParseStatus::Incomplete);
//!
//! let status = parser
//!     .offer(b"Content-Length: 5\r\n\r\nhello")
//!     .unwrap();
//! assert!(matches!(status, ParseStatus::Complete(_)));
//! ```

mod buffered;
mod conduit;
mod error;
mod headers;
mod output;
mod parser;
mod types;

pub use buffered::{parse_request_buffered, parse_request_buffered_with_config, BufferedRequest};
pub use conduit::{Ack, BodyConduit, BodyListener};
pub use error::{ConduitError, InvalidRequest, RequestError};
pub use headers::HeaderMap;
pub use output::{format_debug, format_headers_only, format_json};
pub use parser::{OnHeaders, ParseStatus, Parser, ParserConfig};
pub use types::{decide_100_continue, ContinueDecision, HttpVersion, RequestHead};
