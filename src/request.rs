//! Incremental HTTP/1.1 request parsing.
//!
//! [`Request::parse`] is a state machine over a byte buffer that may arrive
//! in arbitrary fragments; [`Request::from_reader`] drives it from an async
//! byte source with a growable, self-compacting buffer.

use std::cmp::Ordering;
use std::fmt;

use once_cell::sync::Lazy;
use rustc_hash::FxHashSet;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{Error, Result};
use crate::headers::{find_crlf, Headers, CRLF};

const INITIAL_BUFFER_SIZE: usize = 1024;

/// HTTP versions the parser accepts, without the `HTTP/` prefix.
static SUPPORTED_VERSIONS: Lazy<FxHashSet<&'static str>> =
    Lazy::new(|| ["1.1"].into_iter().collect());

/// The allowed request methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
}

impl Method {
    /// Map a request-line token onto the method whitelist.
    pub fn from_token(token: &str) -> Option<Method> {
        match token {
            "GET" => Some(Method::Get),
            "POST" => Some(Method::Post),
            "PUT" => Some(Method::Put),
            "DELETE" => Some(Method::Delete),
            "PATCH" => Some(Method::Patch),
            "OPTIONS" => Some(Method::Options),
            "HEAD" => Some(Method::Head),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
            Method::Options => "OPTIONS",
            Method::Head => "HEAD",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The parsed first line of a request.
///
/// The target is kept verbatim; no decoding or normalization is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: Method,
    pub target: String,
    pub version: String,
}

impl Default for RequestLine {
    fn default() -> Self {
        Self {
            method: Method::Get,
            target: String::new(),
            version: String::new(),
        }
    }
}

impl RequestLine {
    /// Parse the request line from the front of `data`.
    ///
    /// Returns `Ok(None)` when the buffer does not yet contain a complete
    /// line, and `Ok(Some((line, consumed)))` once it does. The line must
    /// split on whitespace into exactly three tokens.
    pub fn parse(data: &[u8]) -> Result<Option<(RequestLine, usize)>> {
        let Some(crlf_idx) = find_crlf(data) else {
            return Ok(None);
        };
        let line =
            std::str::from_utf8(&data[..crlf_idx]).map_err(|_| Error::MalformedRequestLine)?;

        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() != 3 {
            return Err(Error::MalformedRequestLine);
        }

        let method = Method::from_token(parts[0]).ok_or(Error::MethodNotAllowed)?;

        let version = parts[2]
            .strip_prefix("HTTP/")
            .ok_or(Error::InvalidHttpVersion)?;
        if !SUPPORTED_VERSIONS.contains(version) {
            return Err(Error::UnsupportedHttpVersion);
        }

        let line = RequestLine {
            method,
            target: parts[1].to_string(),
            version: version.to_string(),
        };
        Ok(Some((line, crlf_idx + CRLF.len())))
    }
}

/// Parser progress. Transitions are strictly forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    AwaitingRequestLine,
    ParsingHeaders,
    ParsingBody,
    Done,
}

/// A request being assembled from a byte stream.
///
/// `line` holds its default placeholder until the request line has been
/// parsed; once [`state`](Request::state) reaches
/// [`ParserState::Done`] all fields are final.
#[derive(Debug)]
pub struct Request {
    pub line: RequestLine,
    pub headers: Headers,
    pub body: Vec<u8>,
    state: ParserState,
}

impl Default for Request {
    fn default() -> Self {
        Self::new()
    }
}

impl Request {
    pub fn new() -> Self {
        Self {
            line: RequestLine::default(),
            headers: Headers::new(),
            body: Vec::new(),
            state: ParserState::AwaitingRequestLine,
        }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Feed a buffer to the parser, returning how many bytes were consumed.
    ///
    /// The caller is expected to drop the consumed prefix before the next
    /// call. All complete elements in the buffer are consumed in one call;
    /// a partial trailing element reports the bytes before it and waits for
    /// more data. Feeding a finished parser is an error.
    pub fn parse(&mut self, data: &[u8]) -> Result<usize> {
        if self.state == ParserState::Done {
            return Err(Error::ProtocolViolation);
        }

        let mut consumed = 0;
        while self.state != ParserState::Done {
            match self.state {
                ParserState::AwaitingRequestLine => {
                    match RequestLine::parse(&data[consumed..])? {
                        Some((line, n)) => {
                            self.line = line;
                            consumed += n;
                            self.state = ParserState::ParsingHeaders;
                        }
                        None => break,
                    }
                }
                ParserState::ParsingHeaders => {
                    let (n, done) = self.headers.parse(&data[consumed..])?;
                    consumed += n;
                    if done {
                        self.state = if self.headers.get("content-length").is_empty() {
                            ParserState::Done
                        } else {
                            ParserState::ParsingBody
                        };
                    } else if n == 0 {
                        break;
                    }
                }
                ParserState::ParsingBody => {
                    let declared: usize = self
                        .headers
                        .get("content-length")
                        .parse()
                        .map_err(|_| Error::InvalidContentLength)?;
                    self.body.extend_from_slice(&data[consumed..]);
                    consumed = data.len();
                    match self.body.len().cmp(&declared) {
                        Ordering::Greater => return Err(Error::BodyTooLarge),
                        Ordering::Equal => self.state = ParserState::Done,
                        Ordering::Less => break,
                    }
                }
                ParserState::Done => break,
            }
        }
        Ok(consumed)
    }

    /// Read a complete request from an async byte source.
    ///
    /// The buffer doubles when a read fills it and shrinks back to a
    /// multiple of the initial size once parsed bytes are discarded, so a
    /// large header block does not pin its peak allocation for the rest of
    /// the request. End of stream before the parser finishes is an error;
    /// there is no implicit end-of-headers.
    pub async fn from_reader<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Request> {
        let mut request = Request::new();
        let mut buf = vec![0u8; INITIAL_BUFFER_SIZE];
        let mut filled = 0;
        let mut reached_eof = false;

        while request.state != ParserState::Done {
            if reached_eof {
                return Err(Error::TruncatedRequest);
            }

            let n = reader.read(&mut buf[filled..]).await?;
            if n == 0 {
                reached_eof = true;
            }
            filled += n;
            if filled == buf.len() {
                buf.resize(buf.len() * 2, 0);
            }

            let consumed = request.parse(&buf[..filled])?;
            if consumed > 0 {
                // Snap from the pre-compaction level so the shrunken buffer
                // always keeps room for the next read.
                let snapped = filled.div_ceil(INITIAL_BUFFER_SIZE).max(1) * INITIAL_BUFFER_SIZE;
                buf.copy_within(consumed..filled, 0);
                filled -= consumed;
                if snapped < buf.len() {
                    buf.truncate(snapped);
                }
            }
        }

        Ok(request)
    }
}
