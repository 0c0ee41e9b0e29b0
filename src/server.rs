use std::time::Duration;

use anyhow::Result;
use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Json, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use marvin_core::{ArtifactReport, ChatRequest, StreamProducer};
use tokio_stream::wrappers::ReceiverStream;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Error answered as `{ "error": ... }` before any reply byte is sent
struct ServerError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<marvin_core::Error> for ServerError {
    fn from(err: marvin_core::Error) -> Self {
        let status = match err {
            marvin_core::Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    producer: StreamProducer,
}

impl AppState {
    pub fn new(pacing: Duration) -> Self {
        Self {
            producer: StreamProducer::new(pacing),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/artifacts/:id", get(artifact))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(addr: &str, pacing: Duration) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, pacing_ms = pacing.as_millis() as u64, "chat server listening");
    axum::serve(listener, router(AppState::new(pacing))).await?;
    Ok(())
}

async fn chat(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> std::result::Result<Response, ServerError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!(error = %rejection, "rejected chat request");
        ServerError::from(rejection)
    })?;

    let conversation = request.into_conversation()?;
    let frames = state.producer.produce(&conversation)?;

    let body = Body::from_stream(ReceiverStream::new(frames));
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response())
}

async fn artifact(Path(id): Path<String>) -> Json<ArtifactReport> {
    Json(ArtifactReport::load(&id))
}
