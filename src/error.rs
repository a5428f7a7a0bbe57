//! Error types for the rawhttp crate.

use std::io;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while parsing a request or emitting a response.
///
/// Every parse-time error is fatal to the connection that produced it and
/// never escapes that connection's task.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request line did not split into method, target and version.
    #[error("malformed request line")]
    MalformedRequestLine,

    /// The request method is not in the allowed set.
    #[error("method not allowed")]
    MethodNotAllowed,

    /// The version token did not start with `HTTP/`.
    #[error("invalid http version")]
    InvalidHttpVersion,

    /// The version is well-formed but not one we speak.
    #[error("unsupported http version")]
    UnsupportedHttpVersion,

    /// A header line had no colon separator.
    #[error("malformed field line")]
    MalformedFieldLine,

    /// A header field name contained a non-token byte.
    #[error("invalid field name")]
    InvalidFieldName,

    /// Content-Length was present but not a non-negative integer.
    #[error("invalid content length")]
    InvalidContentLength,

    /// More body bytes arrived than Content-Length declared.
    #[error("body is larger than the declared content length")]
    BodyTooLarge,

    /// The stream ended before the request was completely parsed.
    #[error("stream ended before the request was complete")]
    TruncatedRequest,

    /// The parser was fed more data after reaching its done state.
    #[error("parser fed after completion")]
    ProtocolViolation,

    /// Reading from the underlying byte source failed.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// Writing the response to the underlying sink failed.
    #[error("response write failed: {0}")]
    WriteFailure(#[source] io::Error),
}
