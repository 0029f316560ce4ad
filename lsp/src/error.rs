//! Error taxonomy for the transport and the diagnostic synchronizer.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Framing violation in a header block.
#[derive(Debug, Error)]
pub enum HeaderError {
    #[error("header line is not terminated by CRLF")]
    MissingCrLf,
    #[error("unknown header `{0}`")]
    UnknownHeader(String),
    #[error("Content-Length `{0}` is not a decimal number")]
    InvalidContentLength(String),
    #[error("missing Content-Length header")]
    MissingContentLength,
    #[error("unexpected EOF while reading headers")]
    UnexpectedEof,
    #[error("header line exceeds {max} bytes", max = crate::codec::MAX_HEADER_LINE_BYTES)]
    LineTooLong,
    #[error("Content-Length {0} exceeds maximum {max}", max = crate::codec::MAX_FRAME_BYTES)]
    FrameTooLarge(usize),
}

/// Failure to read or write one frame.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("bad header: {0}")]
    MalformedHeader(#[from] HeaderError),
    #[error("frame I/O: {0}")]
    Io(#[from] io::Error),
    #[error("decoding frame body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// The server said something other than what the conversation requires.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("error {code} received: {message}")]
    ErrorResponse { code: i64, message: String },
    #[error("expected `{expected}` but received `{actual}`")]
    UnexpectedMethod { expected: String, actual: String },
    #[error("expected `{expected}` notification but received a non-notification message: {message}")]
    NotANotification { expected: String, message: String },
    #[error("invalid `{method}` payload: {source}")]
    InvalidParams {
        method: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("expected response to request {expected_id} but received: {message}")]
    MismatchedResponse { expected_id: u64, message: String },
}

impl ProtocolError {
    /// Build an `ErrorResponse` from a JSON-RPC `error` object.
    pub(crate) fn from_error_object(error: &serde_json::Value) -> Self {
        Self::ErrorResponse {
            code: error
                .get("code")
                .and_then(serde_json::Value::as_i64)
                .unwrap_or_default(),
            message: error
                .get("message")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("unknown error")
                .to_string(),
        }
    }
}

/// Outcome of any exchange with a language server that did not yield the
/// expected value.
#[derive(Debug, Error)]
pub enum LspError {
    #[error("spawning language server `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("language server closed its output stream")]
    StreamClosed,
    #[error("timed out after {elapsed:?} waiting for {expected} diagnostic reports ({received} received)")]
    Timeout {
        expected: usize,
        received: usize,
        elapsed: Duration,
    },
}

impl From<HeaderError> for LspError {
    fn from(err: HeaderError) -> Self {
        Self::Frame(FrameError::MalformedHeader(err))
    }
}
