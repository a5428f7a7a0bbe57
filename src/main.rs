use std::io;
use std::path::Path;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;
use tokio::signal;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use rawhttp::{default_headers, Config, Handler, Headers, Method, Request, ResponseWriter, Server};

const TEMPLATES_DIR: &str = "templates";
const ASSETS_DIR: &str = "assets";
const FILE_CHUNK_SIZE: usize = 32 * 1024;
const MAX_STREAM_LINES: usize = 10_000;

struct Router;

#[async_trait]
impl Handler for Router {
    async fn handle(&self, w: &mut ResponseWriter, req: &Request) {
        if req.line.method != Method::Get {
            serve_page(w, 200).await;
            return;
        }

        let target = req.line.target.as_str();
        match target {
            "/bad-request" => serve_page(w, 400).await,
            "/server-error" => serve_page(w, 500).await,
            "/video" => serve_video(w).await,
            _ => {
                if let Some(count) = target.strip_prefix("/stream/") {
                    serve_stream(w, count).await;
                } else {
                    serve_page(w, 200).await;
                }
            }
        }
    }
}

/// Serve the HTML template matching a status code. A missing template
/// degrades to an empty body rather than failing the connection.
async fn serve_page(w: &mut ResponseWriter, code: u16) {
    let path = Path::new(TEMPLATES_DIR).join(format!("{code}.html"));
    let body = match tokio::fs::read(&path).await {
        Ok(body) => body,
        Err(err) if err.kind() == io::ErrorKind::NotFound => Vec::new(),
        Err(err) => {
            warn!(%err, path = %path.display(), "failed to read template");
            Vec::new()
        }
    };

    let mut headers = default_headers(body.len());
    headers.replace("Content-Type", "text/html");
    if let Err(err) = w.write_response(code, &headers, &body).await {
        debug!(%err, "failed to write page");
    }
}

/// Stream `count` generated lines with chunked transfer-encoding, closing
/// with SHA-256 and length trailers.
async fn serve_stream(w: &mut ResponseWriter, count: &str) {
    let Ok(count) = count.parse::<usize>() else {
        serve_page(w, 400).await;
        return;
    };
    let count = count.min(MAX_STREAM_LINES);

    let mut headers = default_headers(0);
    headers.remove("Content-Length");
    headers.set("Transfer-Encoding", "chunked");
    headers.set("Trailer", "X-Content-SHA256");
    headers.set("Trailer", "X-Content-Length");

    if w.write_status_line(200).await.is_err() || w.write_headers(&headers).await.is_err() {
        return;
    }

    let mut hasher = Sha256::new();
    let mut total = 0usize;
    for i in 0..count {
        let line = format!("stream line {i}\n");
        hasher.update(line.as_bytes());
        total += line.len();
        if let Err(err) = w.write_chunk(line.as_bytes()).await {
            debug!(%err, "stream aborted mid-chunk");
            return;
        }
    }

    if w.write_chunk_done().await.is_err() {
        return;
    }
    let mut trailer = Headers::new();
    trailer.set("X-Content-SHA256", &hex::encode(hasher.finalize()));
    trailer.set("X-Content-Length", &total.to_string());
    if let Err(err) = w.write_trailer(&trailer).await {
        debug!(%err, "failed to write trailers");
    }
}

/// Stream the demo video file with a fixed-length body.
async fn serve_video(w: &mut ResponseWriter) {
    let path = Path::new(ASSETS_DIR).join("video.mp4");
    let mut file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(err) => {
            warn!(%err, path = %path.display(), "failed to open video file");
            serve_page(w, 500).await;
            return;
        }
    };
    let meta = match file.metadata().await {
        Ok(meta) => meta,
        Err(err) => {
            warn!(%err, "failed to stat video file");
            serve_page(w, 500).await;
            return;
        }
    };

    let mut headers = default_headers(meta.len() as usize);
    headers.replace("Content-Type", "video/mp4");
    headers.set("Accept-Ranges", "bytes");
    if let Ok(modified) = meta.modified() {
        headers.set("Last-Modified", &httpdate::fmt_http_date(modified));
    }

    if w.write_status_line(200).await.is_err() || w.write_headers(&headers).await.is_err() {
        return;
    }

    let mut buf = vec![0u8; FILE_CHUNK_SIZE];
    loop {
        match file.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                if let Err(err) = w.write_body(&buf[..n]).await {
                    debug!(%err, "client went away mid-video");
                    return;
                }
            }
            Err(err) => {
                warn!(%err, "failed to read video file");
                return;
            }
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let server = match Server::serve(Config::default(), Router).await {
        Ok(server) => server,
        Err(err) => {
            error!(%err, "failed to start server");
            return;
        }
    };
    info!(addr = %server.local_addr(), "server started");

    shutdown_signal().await;
    info!("shutdown signal received, stopping server");
    server.close();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
