pub mod routes;

use crate::config::Config;
use anyhow::{Context, Result};
use axum::Router;
use rust_embed::RustEmbed;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

#[derive(RustEmbed)]
#[folder = "frontend"]
struct FrontendAssets;

pub fn server_address(port: u16) -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, port))
}

pub async fn bind(config: &Config) -> Result<TcpListener> {
    let addr = server_address(config.api_port);
    TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind API server: {addr}"))
}

pub async fn run_server(listener: TcpListener, config: Arc<Config>) -> Result<()> {
    let state = routes::ApiState { config };
    let app: Router = routes::router(state);

    let addr = listener
        .local_addr()
        .context("Failed to read API server address")?;
    info!(address = %addr, "Activity Tracker API server started");

    axum::serve(listener, app)
        .await
        .context("API server failed")?;

    Ok(())
}

pub fn get_embedded_asset(path: &str) -> Option<(Vec<u8>, String)> {
    let normalized = path.trim_start_matches('/');
    let requested = if normalized.is_empty() {
        "index.html"
    } else {
        normalized
    };

    match FrontendAssets::get(requested) {
        Some(content) => {
            let mime = mime_guess::from_path(requested)
                .first_or_octet_stream()
                .to_string();
            Some((content.data.into_owned(), mime))
        }
        // page routes such as /activities and /export are rendered client-side
        None => FrontendAssets::get("index.html")
            .map(|content| (content.data.into_owned(), "text/html".to_string())),
    }
}
