//! TCP harness: accept loop, per-connection tasks, shutdown.
//!
//! One request per connection; the connection is closed once the response
//! (or the best-effort error response) has been written.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info};

use crate::error::{Error, Result};
use crate::request::Request;
use crate::response::{self, Writer};

pub const DEFAULT_PORT: u16 = 8080;
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// The response writer handed to request handlers.
pub type ResponseWriter = Writer<OwnedWriteHalf>;

#[derive(Debug, Clone)]
pub struct Config {
    /// Port to bind on all interfaces. Use 0 for an ephemeral port.
    pub port: u16,
    /// How long a connection may take to deliver a complete request.
    pub read_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

/// Application logic invoked once a request has been fully parsed.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn handle(&self, w: &mut ResponseWriter, req: &Request);
}

/// A running listener. Dropping it stops the accept loop; in-flight
/// connections run to completion either way.
pub struct Server {
    local_addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    notify: Arc<Notify>,
    accept_task: Mutex<Option<JoinHandle<()>>>,
}

impl Server {
    /// Bind the listener and spawn the accept loop.
    pub async fn serve<H: Handler>(config: Config, handler: H) -> Result<Server> {
        let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
        let local_addr = listener.local_addr()?;
        let shutdown = Arc::new(AtomicBool::new(false));
        let notify = Arc::new(Notify::new());

        let accept_task = tokio::spawn(accept_loop(
            listener,
            Arc::new(handler),
            config.read_timeout,
            shutdown.clone(),
            notify.clone(),
        ));
        info!(%local_addr, "listening");

        Ok(Server {
            local_addr,
            shutdown,
            notify,
            accept_task: Mutex::new(Some(accept_task)),
        })
    }

    /// The address the listener is actually bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Signal the accept loop to stop. Connections already accepted are
    /// not cancelled.
    pub fn close(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        // notify_one stores a permit, so the accept loop sees the signal
        // even if it is not parked in select! at this instant.
        self.notify.notify_one();
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.close();
        if let Some(task) = self.accept_task.lock().take() {
            task.abort();
        }
    }
}

async fn accept_loop<H: Handler>(
    listener: TcpListener,
    handler: Arc<H>,
    read_timeout: Duration,
    shutdown: Arc<AtomicBool>,
    notify: Arc<Notify>,
) {
    loop {
        tokio::select! {
            result = listener.accept() => match result {
                Ok((stream, peer)) => {
                    let _ = stream.set_nodelay(true);
                    tokio::spawn(handle_connection(stream, peer, handler.clone(), read_timeout));
                }
                Err(err) => {
                    if !shutdown.load(Ordering::SeqCst) {
                        error!(%err, "accept failed");
                    }
                    break;
                }
            },
            _ = notify.notified() => break,
        }
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
    }
    debug!("accept loop stopped");
}

async fn handle_connection<H: Handler>(
    stream: TcpStream,
    peer: SocketAddr,
    handler: Arc<H>,
    read_timeout: Duration,
) {
    let (mut read_half, write_half) = stream.into_split();
    let mut w = Writer::new(write_half);

    let request = match timeout(read_timeout, Request::from_reader(&mut read_half)).await {
        Ok(Ok(request)) => request,
        Ok(Err(err)) => {
            debug!(%peer, %err, "request parse failed");
            send_parse_failure(&mut w, &err).await;
            return;
        }
        Err(_) => {
            debug!(%peer, "timed out waiting for a complete request");
            let body = b"request timeout";
            let _ = w
                .write_response(408, &response::default_headers(body.len()), body)
                .await;
            return;
        }
    };

    debug!(
        %peer,
        method = %request.line.method,
        target = %request.line.target,
        "request parsed"
    );
    handler.handle(&mut w, &request).await;
    let _ = w.flush().await;
}

/// Best-effort 400 carrying the parse error as its body. The peer may have
/// hung up already, in which case the connection is simply dropped.
async fn send_parse_failure(w: &mut ResponseWriter, err: &Error) {
    let body = err.to_string();
    if let Err(write_err) = w
        .write_response(
            response::BAD_REQUEST,
            &response::default_headers(body.len()),
            body.as_bytes(),
        )
        .await
    {
        debug!(%write_err, "could not deliver 400 response");
    }
}
