//! HTTP/1.1 server for the script host.
//!
//! One tokio task per connection; the router does the rest. The server
//! holds no request state of its own.

use std::net::SocketAddr;
use std::sync::Arc;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use jsgate_common::protocol::{JsgateError, Result};

use crate::host::ScriptHost;
use crate::http_router::HandlerRouter;

pub struct HttpServer {
    router: Arc<HandlerRouter>,
}

impl HttpServer {
    pub fn new(host: Arc<ScriptHost>) -> Self {
        Self {
            router: Arc::new(HandlerRouter::new(host)),
        }
    }

    /// Bind `addr` and serve until the task is dropped.
    pub async fn run(self, addr: SocketAddr) -> Result<()> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| JsgateError::Transport(format!("failed to bind {addr}: {e}")))?;

        tracing::info!(
            "HTTP server listening on {}",
            listener
                .local_addr()
                .map_err(|e| JsgateError::Transport(e.to_string()))?
        );

        self.serve(listener).await
    }

    /// Serve connections from an already-bound listener.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        loop {
            let (stream, _) = listener
                .accept()
                .await
                .map_err(|e| JsgateError::Transport(format!("accept failed: {e}")))?;

            let io = TokioIo::new(stream);
            let router = self.router.clone();

            tokio::task::spawn(async move {
                let service = service_fn(move |req| {
                    let router = router.clone();
                    async move {
                        Ok::<_, std::convert::Infallible>(router.route(req).await)
                    }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    tracing::error!("error serving connection: {}", err);
                }
            });
        }
    }
}
