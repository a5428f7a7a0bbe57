//! A from-scratch HTTP/1.1 server: incremental request parsing and response
//! generation straight over TCP byte streams, no HTTP stack underneath.
//!
//! The parser reconstructs a [`Request`] from arbitrarily fragmented reads;
//! the [`response::Writer`] emits status line, headers, fixed bodies and
//! chunked bodies with trailers. [`Server`] wires both to a listener with
//! one task per connection and one request per connection.

pub mod error;
pub mod headers;
pub mod request;
pub mod response;
pub mod server;

pub use error::{Error, Result};
pub use headers::Headers;
pub use request::{Method, ParserState, Request, RequestLine};
pub use response::{default_headers, Writer};
pub use server::{Config, Handler, ResponseWriter, Server};
