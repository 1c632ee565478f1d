use crate::error::ListenerError;
use crate::payload;
use crate::record::{self, EventLog};
use crate::relay::Relay;
use crate::types::InboundEvent;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, FromRequest, Request, State},
    http::header::CONTENT_TYPE,
    routing::get,
    Json, Router,
};
use chrono::Local;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

pub const RUNNING_MESSAGE: &str =
    "Webhook listener is running. Send POST requests to this endpoint to see them printed.";

/// Shared, immutable per-process state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub log: EventLog,
    pub relay: Option<Arc<dyn Relay>>,
}

#[derive(Debug, Serialize)]
struct Acknowledgment {
    status: &'static str,
    message: &'static str,
}

const EVENT_RECEIVED: Acknowledgment = Acknowledgment {
    status: "success",
    message: "Event received",
};

pub fn router(state: AppState, body_limit: usize) -> Router {
    Router::new()
        .route(
            "/",
            get(home)
                .post(root_webhook)
                .put(catch_all)
                .delete(catch_all)
                .patch(catch_all),
        )
        .route(
            "/{*path}",
            get(catch_all)
                .post(catch_all)
                .put(catch_all)
                .delete(catch_all)
                .patch(catch_all),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl+C or SIGTERM.
pub async fn serve(app: Router, addr: SocketAddr) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => error!("failed to install SIGTERM handler: {e}"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}

async fn home() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": RUNNING_MESSAGE }))
}

/// `POST /`: capture, then hand the payload to the relay when one is set.
async fn root_webhook(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<Acknowledgment>, ListenerError> {
    let event = capture(&state, request).await?;

    if let Some(relay) = &state.relay {
        let response = relay.relay(&event.payload).await.map_err(|e| {
            error!(event_id = %event.id, error = %e, "Relay failed");
            e
        })?;
        info!(
            event_id = %event.id,
            conversation_id = %response.conversation_id,
            status = %response.status,
            "Relay conversation created"
        );
    }

    Ok(Json(EVENT_RECEIVED))
}

async fn catch_all(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<Acknowledgment>, ListenerError> {
    capture(&state, request).await?;
    Ok(Json(EVENT_RECEIVED))
}

/// Extract, print and return the event for one request.
async fn capture(state: &AppState, request: Request) -> Result<InboundEvent, ListenerError> {
    let (parts, body) = request.into_parts();
    let method = parts.method.to_string();
    let path = parts.uri.path().to_string();
    let headers = record::capture_headers(&parts.headers);
    let content_type = parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let extensions = parts.extensions.clone();

    let body = Bytes::from_request(Request::from_parts(parts, body), &()).await?;
    let payload = payload::extract(&body, content_type.as_deref(), &extensions)
        .await
        .map_err(|e| {
            warn!(%method, %path, bytes = body.len(), "Rejected undecodable body");
            e
        })?;

    let event = InboundEvent {
        id: uuid::Uuid::new_v4().to_string(),
        received_at: Local::now(),
        method,
        path,
        headers,
        payload,
    };
    debug!(
        event_id = %event.id,
        method = %event.method,
        path = %event.path,
        payload = event.payload.kind(),
        "Captured webhook event"
    );

    if let Err(e) = state.log.emit(&event) {
        warn!(event_id = %event.id, error = %e, "Failed to write event record");
    }

    Ok(event)
}
