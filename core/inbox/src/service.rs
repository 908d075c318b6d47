//! HTTP surface for the assistant. A chat transport adapter posts incoming
//! messages and button presses here and relays the replies.

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use idea_inbox_schemas::{ItemStats, OwnerId, UserSettings};

use crate::assistant::{Assistant, Reply};
use crate::error::StoreError;
use crate::repository::{IdeaRepository, TaskRepository};

#[derive(Clone)]
pub struct AppState {
    pub assistant: Arc<Mutex<Assistant>>,
}

impl AppState {
    pub fn new(assistant: Assistant) -> Self {
        Self {
            assistant: Arc::new(Mutex::new(assistant)),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct IncomingMessage {
    pub owner_id: i64,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct IncomingCallback {
    pub owner_id: i64,
    pub data: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OwnerStats {
    pub ideas: ItemStats,
    pub tasks: ItemStats,
    pub settings: UserSettings,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/messages", post(post_message))
        .route("/callbacks", post(post_callback))
        .route("/owners/:owner_id/stats", get(get_owner_stats))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "service": "idea-inbox",
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn post_message(
    State(state): State<AppState>,
    Json(message): Json<IncomingMessage>,
) -> Json<Reply> {
    let mut assistant = state.assistant.lock().await;
    Json(assistant.handle_message(OwnerId(message.owner_id), &message.text))
}

async fn post_callback(
    State(state): State<AppState>,
    Json(callback): Json<IncomingCallback>,
) -> Json<Reply> {
    let mut assistant = state.assistant.lock().await;
    Json(assistant.handle_callback(OwnerId(callback.owner_id), &callback.data))
}

async fn get_owner_stats(
    State(state): State<AppState>,
    Path(owner_id): Path<i64>,
) -> Result<Json<OwnerStats>, (StatusCode, String)> {
    let owner_id = OwnerId(owner_id);
    if owner_id.0 <= 0 {
        return Err((StatusCode::BAD_REQUEST, "owner id must be positive".into()));
    }

    let assistant = state.assistant.lock().await;
    let db = assistant.database();

    let ideas = IdeaRepository::new(db).stats(owner_id).map_err(internal)?;
    let tasks = TaskRepository::new(db).stats(owner_id).map_err(internal)?;
    let settings = assistant.settings().get_or_create(owner_id).map_err(internal)?;

    info!("Served stats for owner {}", owner_id);
    Ok(Json(OwnerStats {
        ideas,
        tasks,
        settings,
    }))
}

fn internal(err: StoreError) -> (StatusCode, String) {
    error!("Storage failure: {}", err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Sorry, something went wrong.".to_string(),
    )
}
