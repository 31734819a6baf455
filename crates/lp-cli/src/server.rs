//! Axum HTTP API over a shared [`LifecycleEngine`].
//!
//! The engine sits behind one `tokio::sync::Mutex`, serializing every
//! handler and the background sweep against each other. Hatching math is
//! timestamp-based, so requests queued behind a sweep still settle to the
//! same progress.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use lp_core::{DiaryEntry, MemoryRecord, Pet, now_unix_secs, unix_to_iso8601};

use crate::engine::{EngineError, LifecycleEngine};

pub type SharedEngine = Arc<Mutex<LifecycleEngine>>;

pub fn router(engine: SharedEngine) -> axum::Router {
    axum::Router::new()
        .route("/pets/claim", post(claim))
        .route("/pets/{id}", get(get_pet))
        .route("/pets/{id}/heat", post(heat))
        .route("/pets/{id}/name", post(name))
        .route("/pets/{id}/diaries", get(diaries))
        .route("/pets/{id}/memories", get(memories))
        .route("/pets/{id}/chat", post(chat))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(engine)
}

/// Serve the API and run the background sweep until shutdown.
pub async fn serve(
    engine: SharedEngine,
    bind: &str,
    tick_interval_secs: u64,
) -> anyhow::Result<()> {
    let sweeper = engine.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(tick_interval_secs));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let now = now_unix_secs();
            match sweeper.lock().await.sweep_all(now).await {
                Ok(summary) => tracing::debug!(
                    "sweep: {} pets, {} transitions, {} trips, {} errors",
                    summary.pets,
                    summary.transitions,
                    summary.trips_resolved,
                    summary.errors,
                ),
                Err(e) => tracing::warn!("sweep failed: {e}"),
            }
        }
    });

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("listening on {bind}");
    axum::serve(listener, router(engine)).await?;
    Ok(())
}

// --- Wire shapes ---

#[derive(Serialize)]
struct PetView {
    id: Uuid,
    owner_id: Uuid,
    name: String,
    template_id: String,
    personality_prompt: String,
    traits: lp_core::TraitVector,
    status: String,
    current_destination: Option<String>,
    visited_landmarks: Vec<String>,
    hatch_progress_seconds: u64,
    heat_buffer_seconds: u64,
    answered_questions: usize,
    last_status_update: String,
    created_at: String,
}

impl From<Pet> for PetView {
    fn from(pet: Pet) -> Self {
        Self {
            id: pet.id,
            owner_id: pet.owner_id,
            name: pet.name,
            template_id: pet.template_id,
            personality_prompt: pet.personality_prompt,
            traits: pet.traits,
            status: pet.status.as_str().to_string(),
            current_destination: pet.current_destination,
            visited_landmarks: pet.visited_landmarks,
            hatch_progress_seconds: pet.hatch_progress_seconds,
            heat_buffer_seconds: pet.heat_buffer_seconds,
            answered_questions: pet.hatch_answers.len(),
            last_status_update: unix_to_iso8601(pet.last_status_update),
            created_at: unix_to_iso8601(pet.created_at),
        }
    }
}

#[derive(Serialize)]
struct DiaryView {
    id: Uuid,
    title: String,
    body: String,
    image_ref: Option<String>,
    created_at: String,
}

impl From<DiaryEntry> for DiaryView {
    fn from(diary: DiaryEntry) -> Self {
        Self {
            id: diary.id,
            title: diary.title,
            body: diary.body,
            image_ref: diary.image_ref,
            created_at: unix_to_iso8601(diary.created_at),
        }
    }
}

#[derive(Serialize)]
struct MemoryView {
    content: String,
    kind: String,
    created_at: String,
}

impl From<MemoryRecord> for MemoryView {
    fn from(memory: MemoryRecord) -> Self {
        Self {
            content: memory.content,
            kind: memory.kind.as_str().to_string(),
            created_at: unix_to_iso8601(memory.created_at),
        }
    }
}

#[derive(Deserialize)]
struct ClaimRequest {
    owner_id: Uuid,
}

#[derive(Deserialize)]
struct HeatRequest {
    /// Option index for the current questionnaire question, if any.
    answer: Option<u8>,
}

#[derive(Deserialize)]
struct NameRequest {
    name: String,
}

#[derive(Deserialize)]
struct MemoryQuery {
    query: String,
    #[serde(default = "default_memory_limit")]
    limit: usize,
}

fn default_memory_limit() -> usize {
    5
}

#[derive(Deserialize)]
struct ChatRequest {
    message: String,
}

// --- Error mapping ---

struct ApiError(EngineError);

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            EngineError::PetNotFound(_) => StatusCode::NOT_FOUND,
            EngineError::EggDead | EngineError::NotAnEgg | EngineError::StillAnEgg => {
                StatusCode::CONFLICT
            }
            EngineError::Store(e) => {
                tracing::error!("storage error: {e}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

// --- Handlers ---

async fn claim(
    State(engine): State<SharedEngine>,
    Json(request): Json<ClaimRequest>,
) -> Result<Json<PetView>, ApiError> {
    let pet = engine.lock().await.claim_egg(request.owner_id)?;
    Ok(Json(pet.into()))
}

/// Reads settle hatching progress first, so a poll alone can freeze,
/// hatch, or kill an egg.
async fn get_pet(
    State(engine): State<SharedEngine>,
    Path(id): Path<Uuid>,
) -> Result<Json<PetView>, ApiError> {
    let pet = engine.lock().await.advance_egg(id, now_unix_secs())?;
    Ok(Json(pet.into()))
}

async fn heat(
    State(engine): State<SharedEngine>,
    Path(id): Path<Uuid>,
    Json(request): Json<HeatRequest>,
) -> Result<Json<PetView>, ApiError> {
    let pet = engine
        .lock()
        .await
        .heat_egg(id, request.answer, now_unix_secs())?;
    Ok(Json(pet.into()))
}

async fn name(
    State(engine): State<SharedEngine>,
    Path(id): Path<Uuid>,
    Json(request): Json<NameRequest>,
) -> Result<Json<PetView>, Response> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": "name must not be empty" })),
        )
            .into_response());
    }
    let pet = engine
        .lock()
        .await
        .name_pet(id, name, now_unix_secs())
        .map_err(|e| ApiError(e).into_response())?;
    Ok(Json(pet.into()))
}

async fn diaries(
    State(engine): State<SharedEngine>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<DiaryView>>, ApiError> {
    let diaries = engine.lock().await.diaries(id)?;
    Ok(Json(diaries.into_iter().map(Into::into).collect()))
}

async fn memories(
    State(engine): State<SharedEngine>,
    Path(id): Path<Uuid>,
    Query(params): Query<MemoryQuery>,
) -> Result<Json<Vec<MemoryView>>, ApiError> {
    let found = engine
        .lock()
        .await
        .retrieve_memories(id, &params.query, params.limit)
        .await?;
    Ok(Json(found.into_iter().map(Into::into).collect()))
}

async fn chat(
    State(engine): State<SharedEngine>,
    Path(id): Path<Uuid>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let reply = engine
        .lock()
        .await
        .chat(id, &request.message, now_unix_secs())
        .await?;
    Ok(Json(json!({ "reply": reply })))
}
