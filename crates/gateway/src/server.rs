use std::{net::SocketAddr, sync::Arc};

use {
    axum::{
        Router,
        routing::{get, post},
    },
    tower_http::cors::{Any, CorsLayer},
    tracing::info,
};

use {herald_browser::SessionController, herald_whatsapp::Dispatcher};

use crate::routes;

// ── Shared app state ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub session: Arc<SessionController>,
    pub dispatcher: Arc<Dispatcher>,
}

// ── Server startup ───────────────────────────────────────────────────────────

/// Build the gateway router (shared between production startup and tests).
pub fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health))
        .route("/admin/whatsapp/initialize", post(routes::initialize))
        .route("/admin/whatsapp/check-status", get(routes::check_status))
        .route("/admin/whatsapp/send-single", post(routes::send_single))
        .route("/admin/whatsapp/send-bulk", post(routes::send_bulk))
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(bind: &str, port: u16, state: AppState) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "gateway listening");
    axum::serve(listener, app).await?;
    Ok(())
}
