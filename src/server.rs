//! HTTP surface.
//!
//! - `POST /draft-{persona}-email` for every configured persona
//! - `POST /draft/{persona}` generic form
//! - `GET /health`, `GET /`
//!
//! Draft responses are [`DraftResult`] JSON. A draft failure maps to the
//! status from [`DraftError::status`] with a sanitised message body.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Map, Value};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::drafting::{DraftError, DraftResult, Drafter, IncomingMessage};

/// Service name reported by `/health`.
pub const SERVICE_NAME: &str = "mailvoice";

/// Shared handler state.
#[derive(Clone, Debug)]
pub struct AppState {
    /// The drafting pipeline.
    pub drafter: Arc<Drafter>,
}

/// Route path for a persona's dedicated draft endpoint.
pub fn persona_route(persona_id: &str) -> String {
    format!("/draft-{persona_id}-email")
}

/// Build the router.
pub fn app_router(state: AppState, max_body_bytes: usize) -> Router {
    let mut router = Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/draft/{persona}", post(draft_generic));

    let ids: Vec<String> = state
        .drafter
        .personas()
        .ids()
        .into_iter()
        .map(str::to_owned)
        .collect();
    for id in ids {
        let path = persona_route(&id);
        router = router.route(
            &path,
            post(
                move |State(state): State<AppState>,
                      payload: Result<Json<IncomingMessage>, JsonRejection>| {
                    let id = id.clone();
                    async move { draft_response(&state, &id, payload).await }
                },
            ),
        );
    }

    router
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
}

/// Bind `addr` and serve until Ctrl-C or SIGTERM.
///
/// # Errors
///
/// Returns an error if `addr` is invalid, the port cannot be bound, or the
/// server fails.
pub async fn run_server(state: AppState, addr: &str, max_body_bytes: usize) -> anyhow::Result<()> {
    let addr: SocketAddr = addr
        .parse()
        .with_context(|| format!("invalid bind address '{addr}'"))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "mailvoice listening");
    axum::serve(listener, app_router(state, max_body_bytes))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received, draining connections");
}

async fn draft_generic(
    State(state): State<AppState>,
    Path(persona): Path<String>,
    payload: Result<Json<IncomingMessage>, JsonRejection>,
) -> impl IntoResponse {
    draft_response(&state, &persona, payload).await
}

fn failure(status: StatusCode, error: String) -> (StatusCode, Json<DraftResult>) {
    (status, Json(DraftResult::Failure { error }))
}

async fn draft_response(
    state: &AppState,
    persona: &str,
    payload: Result<Json<IncomingMessage>, JsonRejection>,
) -> (StatusCode, Json<DraftResult>) {
    let message = match payload {
        Ok(Json(message)) => message,
        Err(rejection) => {
            let status = match rejection.status() {
                StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
                _ => StatusCode::BAD_REQUEST,
            };
            warn!(persona, %status, "rejected draft request body");
            return failure(status, format!("invalid request body: {}", rejection.body_text()));
        }
    };

    match state.drafter.draft(persona, &message).await {
        Ok(draft) => (StatusCode::OK, Json(DraftResult::Success(draft))),
        Err(e) => failure(status_for(&e), e.public_message()),
    }
}

fn status_for(err: &DraftError) -> StatusCode {
    StatusCode::from_u16(err.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let personas = state.drafter.personas();
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "databases": personas.collections(),
        "personas": personas.ids(),
    }))
}

async fn home(State(state): State<AppState>) -> impl IntoResponse {
    let mut endpoints = Map::new();
    for id in state.drafter.personas().ids() {
        endpoints.insert(id.to_owned(), Value::String(persona_route(id)));
    }
    endpoints.insert("draft".to_owned(), json!("/draft/{persona}"));
    endpoints.insert("health".to_owned(), json!("/health"));

    Json(json!({
        "message": "Mailvoice email drafting API",
        "endpoints": endpoints,
        "status": "ready",
    }))
}
