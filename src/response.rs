//! Response emission: status line, headers, body, chunked framing.

use std::io;

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};
use crate::headers::{Headers, CRLF};

pub const OK: u16 = 200;
pub const BAD_REQUEST: u16 = 400;
pub const INTERNAL_SERVER_ERROR: u16 = 500;

/// Reason phrases for the status codes we emit ourselves. Unknown codes get
/// an empty phrase on the wire, which is not an error.
static REASON_PHRASES: Lazy<FxHashMap<u16, &'static str>> = Lazy::new(|| {
    [
        (OK, "OK"),
        (BAD_REQUEST, "Bad Request"),
        (INTERNAL_SERVER_ERROR, "Internal Server Error"),
    ]
    .into_iter()
    .collect()
});

/// The baseline header set for a fixed-length response.
///
/// Callers override `Content-Type` as needed. Chunked responses must remove
/// `Content-Length` and set `Transfer-Encoding: chunked` plus any `Trailer`
/// announcements before the headers are written.
pub fn default_headers(content_len: usize) -> Headers {
    let mut headers = Headers::new();
    headers.set("Content-Length", &content_len.to_string());
    headers.set("Connection", "close");
    headers.set("Content-Type", "text/plain");
    headers
}

/// Writes response bytes to an async sink.
///
/// Methods append to the sink in call order; nothing is buffered or rolled
/// back here. A failed write leaves the connection in an unknown state and
/// the caller must close it.
pub struct Writer<W> {
    sink: W,
}

impl<W: AsyncWrite + Unpin> Writer<W> {
    pub fn new(sink: W) -> Self {
        Self { sink }
    }

    pub fn into_inner(self) -> W {
        self.sink
    }

    async fn send(&mut self, bytes: &[u8]) -> Result<()> {
        self.sink.write_all(bytes).await.map_err(Error::WriteFailure)
    }

    /// Emit `HTTP/1.1 <code> <reason>\r\n`.
    pub async fn write_status_line(&mut self, code: u16) -> Result<()> {
        let reason = REASON_PHRASES.get(&code).copied().unwrap_or("");
        let line = format!("HTTP/1.1 {} {}{}", code, reason, CRLF);
        self.send(line.as_bytes()).await
    }

    /// Emit every field as `name: value\r\n`, then the bare CRLF that ends
    /// the header block. Emission order is unspecified.
    pub async fn write_headers(&mut self, headers: &Headers) -> Result<()> {
        let mut block = String::new();
        for (name, value) in headers.iter() {
            block.push_str(name);
            block.push_str(": ");
            block.push_str(value);
            block.push_str(CRLF);
        }
        block.push_str(CRLF);
        self.send(block.as_bytes()).await
    }

    /// Raw passthrough write. Returns the number of bytes written.
    pub async fn write_body(&mut self, body: &[u8]) -> Result<usize> {
        self.send(body).await?;
        Ok(body.len())
    }

    /// Emit one chunk as `<hex-len>\r\n<bytes>\r\n`.
    ///
    /// A zero-length chunk would terminate the body early and is rejected;
    /// use [`write_chunk_done`](Writer::write_chunk_done) instead.
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<usize> {
        if chunk.is_empty() {
            return Err(Error::WriteFailure(io::Error::new(
                io::ErrorKind::InvalidInput,
                "zero-length chunk terminates the body",
            )));
        }
        let mut frame = Vec::with_capacity(chunk.len() + 16);
        frame.extend_from_slice(format!("{:x}{}", chunk.len(), CRLF).as_bytes());
        frame.extend_from_slice(chunk);
        frame.extend_from_slice(CRLF.as_bytes());
        self.send(&frame).await?;
        Ok(chunk.len())
    }

    /// Emit the terminal `0\r\n` frame of a chunked body.
    pub async fn write_chunk_done(&mut self) -> Result<()> {
        self.send(format!("0{}", CRLF).as_bytes()).await
    }

    /// Emit trailer field lines followed by the final bare CRLF.
    ///
    /// Chunked messages end with this call even when the store is empty.
    pub async fn write_trailer(&mut self, trailer: &Headers) -> Result<()> {
        self.write_headers(trailer).await
    }

    /// Status line, headers and body in one call.
    ///
    /// The first failed write aborts; partial output is not rolled back and
    /// the connection must be treated as contaminated.
    pub async fn write_response(&mut self, code: u16, headers: &Headers, body: &[u8]) -> Result<()> {
        self.write_status_line(code).await?;
        self.write_headers(headers).await?;
        self.write_body(body).await?;
        self.flush().await
    }

    pub async fn flush(&mut self) -> Result<()> {
        self.sink.flush().await.map_err(Error::WriteFailure)
    }
}
