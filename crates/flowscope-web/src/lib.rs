//! The Flowscope web form: an axum router over the inference pipeline.

mod handlers;
mod state;
mod templates;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use state::AppState;

/// The application router.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/predict", post(handlers::predict))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(addr: SocketAddr, state: Arc<AppState>) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve_on(listener, state).await
}

/// Serve on an already bound listener.
pub async fn serve_on(listener: TcpListener, state: Arc<AppState>) -> std::io::Result<()> {
    info!(addr = %listener.local_addr()?, "flowscope web form listening");
    axum::serve(listener, app(state)).await
}
