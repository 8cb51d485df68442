// src/http/server.rs

//! Listener setup and serving.

use std::net::SocketAddr;

use anyhow::Context;
use prometheus::Registry;
use tokio::net::TcpListener;
use tracing::info;

use crate::errors::Result;
use crate::http::routes::create_router;
use crate::state::SharedState;

/// Bind `listen_addr` and serve the status page and metrics forever.
///
/// Failure to bind is fatal: there is no point supervising a command
/// nobody can observe.
pub async fn serve(
    listen_addr: SocketAddr,
    state: SharedState,
    registry: Registry,
) -> Result<()> {
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("binding listen address {listen_addr}"))?;

    info!(addr = %listen_addr, "listening");

    let router = create_router(state, registry);
    axum::serve(listener, router)
        .await
        .context("serving HTTP")?;

    Ok(())
}
