//! # Report endpoint.
//!
//! [`ReportServer`] serves `GET /metrics` with whatever the [`Publisher`]
//! currently holds. It owns its listener and a publisher handle injected at
//! construction; there is no global state.
//!
//! Binding happens in [`ReportServer::bind`] so that an unusable address is
//! reported at startup, before any probe runs.

use std::net::SocketAddr;

use axum::{
    Router,
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::RuntimeError;
use crate::report::{CONTENT_TYPE, Publisher};

/// HTTP server exposing the latest report.
pub struct ReportServer {
    listener: TcpListener,
    publisher: Publisher,
}

impl ReportServer {
    /// Binds `addr`.
    ///
    /// Fails with [`RuntimeError::Bind`] if the address is unavailable.
    pub async fn bind(addr: SocketAddr, publisher: Publisher) -> Result<Self, RuntimeError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| RuntimeError::Bind { addr, source })?;
        Ok(Self {
            listener,
            publisher,
        })
    }

    /// Address actually bound (useful with port `0`).
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Routes served by the endpoint.
    pub fn router(publisher: Publisher) -> Router {
        Router::new()
            .route("/metrics", get(metrics))
            .with_state(publisher)
    }

    /// Serves until `token` is cancelled, then lets in-flight requests finish.
    pub async fn serve(self, token: CancellationToken) -> Result<(), RuntimeError> {
        let addr = self.local_addr().map_err(|source| RuntimeError::Serve { source })?;
        info!(%addr, "report endpoint listening");

        axum::serve(self.listener, Self::router(self.publisher))
            .with_graceful_shutdown(token.cancelled_owned())
            .await
            .map_err(|source| RuntimeError::Serve { source })
    }
}

async fn metrics(State(publisher): State<Publisher>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, CONTENT_TYPE)], publisher.read().await)
}
