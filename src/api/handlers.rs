//! Axum request handlers for the HTTP API.
//!
//! Every session endpoint answers with the full [`SessionView`] so the client
//! can re-render from a single source of truth.
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::routes::AppState;
use crate::error::{AppError, AppResult};
use crate::media::{ImageData, ImageUpload};
use crate::prompt::catalog::{default_enhancements, AspectRatio, FoodCategory};
use crate::workflow::{ConfigurationPatch, Session, SessionView};

fn view(id: Uuid, session: &Session) -> Json<SessionView> {
    Json(SessionView::new(id, session))
}

pub async fn root() -> &'static str {
    "Photo Run API"
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({ "status": "ok", "sessions": state.sessions.len().await }))
}

pub async fn catalog(State(state): State<Arc<AppState>>) -> Json<Value> {
    let ratios: Vec<Value> = AspectRatio::ALL
        .iter()
        .map(|r| json!({ "value": r.label(), "usage": r.usage() }))
        .collect();
    Json(json!({
        "categories": FoodCategory::ALL.iter().map(|c| c.label()).collect::<Vec<_>>(),
        "aspect_ratios": ratios,
        "default_aspect_ratio": AspectRatio::default().label(),
        "enhancements": default_enhancements(),
        "payment": { "pix_key": state.pix_key, "price": state.price_label },
    }))
}

pub async fn create_session(State(state): State<Arc<AppState>>) -> (StatusCode, Json<SessionView>) {
    let (id, controller) = state.sessions.create().await;
    let session = controller.snapshot().await;
    (StatusCode::CREATED, view(id, &session))
}

pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SessionView>> {
    let session = state.sessions.get(id).await?.snapshot().await;
    Ok(view(id, &session))
}

pub async fn delete_session(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> AppResult<StatusCode> {
    state.sessions.remove(id).await?;
    tracing::info!(%id, "session deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn select_image(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(upload): Json<ImageUpload>,
) -> AppResult<Json<SessionView>> {
    let image = upload.decode()?;
    let session = state.sessions.get(id).await?.select_image(image).await?;
    Ok(view(id, &session))
}

/// Raw bytes of the selected source photo, for previews.
pub async fn source_image(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> AppResult<Response> {
    let session = state.sessions.get(id).await?.snapshot().await;
    let source = session
        .source()
        .ok_or(AppError::InvalidTransition { action: "preview the image", stage: session.stage() })?;
    Ok(([(header::CONTENT_TYPE, source.image.mime_type.clone())], source.image.bytes.clone()).into_response())
}

pub async fn update_configuration(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(patch): Json<ConfigurationPatch>,
) -> AppResult<Json<SessionView>> {
    let session = state.sessions.get(id).await?.update_configuration(patch).await?;
    Ok(view(id, &session))
}

pub async fn submit_configuration(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SessionView>> {
    let session = state.sessions.get(id).await?.submit_configuration().await?;
    Ok(view(id, &session))
}

pub async fn upload_receipt(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(upload): Json<ImageUpload>,
) -> AppResult<Json<SessionView>> {
    let receipt = upload.decode()?;
    let session = state.sessions.get(id).await?.upload_receipt(receipt).await?;
    Ok(view(id, &session))
}

/// Verifies the receipt and, when accepted, runs generation before answering.
pub async fn confirm_payment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SessionView>> {
    let session = state.sessions.get(id).await?.confirm_payment().await?;
    Ok(view(id, &session))
}

pub async fn cancel_payment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SessionView>> {
    let session = state.sessions.get(id).await?.cancel_payment().await?;
    Ok(view(id, &session))
}

pub async fn generate(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> AppResult<Json<SessionView>> {
    let session = state.sessions.get(id).await?.generate().await?;
    Ok(view(id, &session))
}

#[derive(Debug, Deserialize)]
pub struct RefineRequest {
    pub instruction: String,
}

pub async fn refine(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<RefineRequest>,
) -> AppResult<Json<SessionView>> {
    let session = state.sessions.get(id).await?.refine(&body.instruction).await?;
    Ok(view(id, &session))
}

/// The current result as a downloadable file.
pub async fn download_result(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> AppResult<Response> {
    let session = state.sessions.get(id).await?.snapshot().await;
    let result = session
        .result()
        .ok_or(AppError::InvalidTransition { action: "download the result", stage: session.stage() })?;
    let image = ImageData::from_data_url(&result.image_url)?;
    let millis = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis()).unwrap_or_default();
    let disposition = format!("attachment; filename=\"photorun-{}.{}\"", millis, image.file_extension());
    Ok((
        [(header::CONTENT_TYPE, image.mime_type.clone()), (header::CONTENT_DISPOSITION, disposition)],
        image.bytes,
    )
        .into_response())
}

pub async fn reset(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> AppResult<Json<SessionView>> {
    let session = state.sessions.get(id).await?.reset().await?;
    Ok(view(id, &session))
}
