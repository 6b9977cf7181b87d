//! Webhook HTTP server for non-local environments.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};

use pricewatch_channels::TelegramUpdate;
use pricewatch_core::{PricewatchError, Result};

use crate::updates::UpdateHandler;

/// Build the webhook router.
pub fn router(handler: Arc<UpdateHandler>) -> Router {
    Router::new()
        .route("/webhook", post(receive_update))
        .with_state(handler)
}

/// Bind and serve the webhook endpoint until the process exits.
pub async fn serve(handler: Arc<UpdateHandler>, port: u16) -> Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| PricewatchError::Channel(format!("failed to bind {addr}: {e}")))?;
    tracing::info!(%addr, "webhook server listening");

    axum::serve(listener, router(handler))
        .await
        .map_err(|e| PricewatchError::Channel(format!("webhook server failed: {e}")))
}

async fn receive_update(
    State(handler): State<Arc<UpdateHandler>>,
    Json(update): Json<TelegramUpdate>,
) -> StatusCode {
    tracing::debug!(update_id = update.update_id, "webhook update received");
    handler.handle_update(update).await;
    // Telegram retries anything non-2xx; handler errors are logged and
    // swallowed upstream, so every well-formed update is acknowledged.
    StatusCode::OK
}
