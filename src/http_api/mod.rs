use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Deserializer, Serialize, de::Error as _};
use serde_json::{Value, json};
use tracing::{error, info};

use crate::{BoardOutcome, ColumnChangeEvent, Reconciler, RecordStore, SweepSummary};

pub struct AppState<S> {
    reconciler: Arc<Reconciler<S>>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            reconciler: self.reconciler.clone(),
        }
    }
}

impl<S: RecordStore> AppState<S> {
    pub fn with_shared(reconciler: Arc<Reconciler<S>>) -> Self {
        Self { reconciler }
    }

    fn reconciler(&self) -> Arc<Reconciler<S>> {
        self.reconciler.clone()
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    Invalid(String),
}

impl ApiError {
    fn invalid(message: impl Into<String>) -> Self {
        ApiError::Invalid(message.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(message) => {
                let body = Json(ErrorBody {
                    error: "not_found",
                    message,
                });
                (StatusCode::NOT_FOUND, body).into_response()
            }
            ApiError::Invalid(message) => {
                let body = Json(ErrorBody {
                    error: "invalid_request",
                    message,
                });
                (StatusCode::BAD_REQUEST, body).into_response()
            }
        }
    }
}

/// Body posted by monday.com. The first request after registering a webhook
/// carries only `challenge`; later ones carry `event`.
#[derive(Debug, Deserialize)]
struct WebhookPayload {
    #[serde(default)]
    challenge: Option<String>,
    #[serde(default)]
    event: Option<WebhookEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebhookEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, deserialize_with = "flexible_id")]
    board_id: Option<String>,
    #[serde(default, deserialize_with = "flexible_id")]
    pulse_id: Option<String>,
    #[serde(default)]
    pulse_name: Option<String>,
    #[serde(default)]
    column_id: Option<String>,
    #[serde(default)]
    value: Option<Value>,
}

impl WebhookEvent {
    fn into_column_change(self) -> Option<ColumnChangeEvent> {
        Some(ColumnChangeEvent {
            board_id: self.board_id?,
            item_id: self.pulse_id?,
            column_id: self.column_id?,
            value: self.value.filter(|value| !value.is_null()),
        })
    }
}

// monday sends numeric ids in webhooks but string ids everywhere else.
fn flexible_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(id)) => Ok(Some(id)),
        Some(Value::Number(id)) => Ok(Some(id.to_string())),
        Some(other) => Err(D::Error::custom(format!("invalid id {other}"))),
    }
}

pub fn router<S: RecordStore + 'static>(state: AppState<S>) -> Router {
    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health))
        .route("/webhooks/monday", post(monday_webhook::<S>))
        .route("/sweep", post(run_sweep::<S>))
        .route("/boards/:id/sweep", post(sweep_board::<S>))
        .fallback(not_found)
        .with_state(state)
}

pub async fn serve<S: RecordStore + 'static>(
    addr: SocketAddr,
    reconciler: Arc<Reconciler<S>>,
) -> std::io::Result<()> {
    let app = router(AppState::with_shared(reconciler));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "week-sync HTTP API listening");
    axum::serve(listener, app).await
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn service_info() -> impl IntoResponse {
    Json(json!({
        "status": "Week Assigned reconciler is running",
        "endpoints": {
            "health": "GET /health",
            "webhook": "POST /webhooks/monday",
            "sweep": "POST /sweep",
            "board_sweep": "POST /boards/:id/sweep",
        }
    }))
}

async fn not_found() -> ApiError {
    ApiError::NotFound("no such route".to_string())
}

async fn monday_webhook<S: RecordStore + 'static>(
    State(state): State<AppState<S>>,
    Json(payload): Json<WebhookPayload>,
) -> Result<Json<Value>, ApiError> {
    if let Some(challenge) = payload.challenge {
        info!("webhook challenge received");
        return Ok(Json(json!({ "challenge": challenge })));
    }
    let event = payload
        .event
        .ok_or_else(|| ApiError::invalid("payload carries neither challenge nor event"))?;
    info!(
        event_type = %event.kind,
        board_id = ?event.board_id,
        item_id = ?event.pulse_id,
        column_id = ?event.column_id,
        "webhook event received"
    );

    let outcome = match event.kind.as_str() {
        "update_column_value" | "change_status_column_value" => {
            let change = event.into_column_change().ok_or_else(|| {
                ApiError::invalid("column change requires boardId, pulseId and columnId")
            })?;
            match state.reconciler().handle_column_change(&change).await {
                Ok(outcome) => Some(outcome),
                Err(err) => {
                    // Acknowledged anyway; monday retries non-2xx responses.
                    error!(
                        board_id = %change.board_id,
                        item_id = %change.item_id,
                        %err,
                        "failed to update week assignment from webhook"
                    );
                    None
                }
            }
        }
        "create_item" => {
            info!(item = ?event.pulse_name, "item created");
            None
        }
        "create_update" => {
            info!(item_id = ?event.pulse_id, "update posted on item");
            None
        }
        other => {
            info!(event_type = other, "ignoring webhook event");
            None
        }
    };

    Ok(Json(json!({
        "success": true,
        "message": "Webhook processed successfully",
        "outcome": outcome,
    })))
}

async fn run_sweep<S: RecordStore + 'static>(State(state): State<AppState<S>>) -> Json<SweepSummary> {
    let summary = state.reconciler().update_all_boards().await;
    Json(summary)
}

async fn sweep_board<S: RecordStore + 'static>(
    State(state): State<AppState<S>>,
    Path(board_id): Path<String>,
) -> Json<BoardOutcome> {
    let outcome = state.reconciler().update_board(&board_id).await;
    Json(outcome)
}
