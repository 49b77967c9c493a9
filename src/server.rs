//! HTTP surface for summa.
//!
//! - `POST /api/summarize` – Summarize `{ "input": string, "mode"?: "url" | "text" }`. Replies
//!   `{ text, success: true }`, or `{ error, success: false }` with 400 for bad input and 500
//!   for summarization failures.
//! - `GET /health` – Liveness probe.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use tokio::net::TcpListener;

use crate::pipeline::{Pipeline, RequestError};
use crate::response::{SummaryResponse, GENERIC_FAILURE};
use crate::router::Mode;
use crate::summary::SummarizationRequest;

/// Build the HTTP router around a shared pipeline.
pub fn create_router(pipeline: Arc<Pipeline>) -> Router {
    Router::new()
        .route("/api/summarize", post(summarize))
        .route("/health", get(|| async { "ok" }))
        .with_state(pipeline)
}

/// Bind `addr` and serve until the process exits.
pub async fn serve(pipeline: Arc<Pipeline>, addr: &str) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, create_router(pipeline)).await
}

async fn summarize(
    State(pipeline): State<Arc<Pipeline>>,
    body: Bytes,
) -> (StatusCode, Json<SummaryResponse>) {
    let request = match parse_request(&body) {
        Ok(request) => request,
        Err(response) => return (StatusCode::BAD_REQUEST, Json(response)),
    };

    // Panics inside the pipeline surface as a generic failure, not a dropped connection
    let response = match tokio::spawn(async move { pipeline.run(request).await }).await {
        Ok(response) => response,
        Err(err) => {
            tracing::error!(error = %err, "summarization task failed");
            SummaryResponse::failure(GENERIC_FAILURE)
        }
    };

    let status = if response.success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(response))
}

fn parse_request(body: &[u8]) -> Result<SummarizationRequest, SummaryResponse> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| SummaryResponse::failure(format!("Invalid JSON body: {e}")))?;

    let input = value
        .get("input")
        .and_then(Value::as_str)
        .filter(|input| !input.trim().is_empty())
        .ok_or_else(|| SummaryResponse::from(RequestError::EmptyInput))?;

    let mode = match value.get("mode") {
        None | Some(Value::Null) => None,
        Some(raw) => Some(
            serde_json::from_value::<Mode>(raw.clone())
                .map_err(|_| SummaryResponse::failure("mode must be \"url\" or \"text\""))?,
        ),
    };

    Ok(SummarizationRequest {
        input: input.to_string(),
        mode,
    })
}
