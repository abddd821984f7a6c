use std::fmt;
use std::io;

use http::StatusCode;

/// A request that violates RFC 7230 framing, raised synchronously from
/// [`crate::parser::Parser::offer`].
///
/// Carries an HTTP status code for the enclosing server to respond with, a
/// short client-facing message, and a private operator-facing detail that
/// should not be echoed back to the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidRequest {
    pub status: StatusCode,
    pub public_msg: String,
    pub private_detail: String,
}

impl InvalidRequest {
    pub(crate) fn new(
        status: StatusCode,
        public_msg: impl Into<String>,
        private_detail: impl Into<String>,
    ) -> Self {
        let public_msg = public_msg.into();
        let private_detail = private_detail.into();
        log::warn!("rejecting request: {status} {public_msg}: {private_detail}");
        Self {
            status,
            public_msg,
            private_detail,
        }
    }

    pub(crate) fn bad_request(public_msg: impl Into<String>, private_detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, public_msg, private_detail)
    }

    /// The HTTP status and client-facing message the enclosing server
    /// should respond with (spec.md §6's error-response mapping). The
    /// `private_detail` is deliberately excluded — it is for operator logs,
    /// never for the wire.
    pub fn into_response_parts(&self) -> (StatusCode, &str) {
        (self.status, self.public_msg.as_str())
    }
}

impl fmt::Display for InvalidRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.status.as_u16(), self.public_msg, self.private_detail)
    }
}

impl std::error::Error for InvalidRequest {}

/// Failures that originate on the [`crate::conduit::BodyConduit`] boundary
/// rather than from malformed wire bytes: budget exhaustion, read timeout,
/// or interruption. These are *not* translated to an HTTP status by this
/// crate — the enclosing server decides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConduitError {
    /// A pull read waited longer than the configured read timeout.
    Timeout,
    /// A pull read was interrupted before data or EOF arrived.
    Interrupted,
    /// The conduit's total-byte budget would have been exceeded.
    BudgetExceeded,
    /// `switch_to_listener` was called a second time on the same conduit.
    ListenerAlreadyInstalled,
}

impl fmt::Display for ConduitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::Timeout => "body read timed out",
            Self::Interrupted => "body read was interrupted",
            Self::BudgetExceeded => "body exceeded the configured byte budget",
            Self::ListenerAlreadyInstalled => "a listener is already installed on this conduit",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for ConduitError {}

impl From<ConduitError> for io::Error {
    fn from(e: ConduitError) -> Self {
        let kind = match e {
            ConduitError::Timeout => io::ErrorKind::TimedOut,
            ConduitError::Interrupted => io::ErrorKind::Interrupted,
            ConduitError::BudgetExceeded | ConduitError::ListenerAlreadyInstalled => {
                io::ErrorKind::Other
            }
        };
        io::Error::new(kind, e)
    }
}

/// Either half of spec.md §7's error taxonomy, surfaced from
/// [`crate::parser::Parser::offer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// A framing violation: the server should send the carried status and
    /// close the connection.
    Invalid(InvalidRequest),
    /// A conduit-boundary failure: budget exceeded while handing body
    /// bytes off, or the conduit itself is in a failed state.
    Conduit(ConduitError),
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid(e) => fmt::Display::fmt(e, f),
            Self::Conduit(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl std::error::Error for RequestError {}

impl From<InvalidRequest> for RequestError {
    fn from(e: InvalidRequest) -> Self {
        Self::Invalid(e)
    }
}

impl From<ConduitError> for RequestError {
    fn from(e: ConduitError) -> Self {
        Self::Conduit(e)
    }
}
