use crate::errors::AppError;
use crate::export::{EXPORT_FILE_NAME, export_database};
use crate::models::{CommentDraftRequest, KeypadRequest, SessionView, StartSessionRequest};
use crate::refresh::{SharedSession, refresh_counts, spawn_delete, spawn_write};
use crate::session::{SessionController, SessionError};
use crate::state::AppState;
use crate::ui::{render_index, render_launcher};
use axum::{
    extract::{Path, State},
    http::header,
    response::{Html, IntoResponse},
    Json,
};
use chrono::{Local, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

pub async fn launcher() -> Html<String> {
    Html(render_launcher())
}

pub async fn counter_page(State(state): State<AppState>) -> Html<String> {
    let (id, _) = state.create_session().await;
    info!(%id, "session created");
    Html(render_index(id))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let session = lookup(&state, id).await?;
    let controller = session.lock().await;
    Ok(Json(controller.view(id, Utc::now())))
}

pub async fn start_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StartSessionRequest>,
) -> Result<Json<SessionView>, AppError> {
    let session = lookup(&state, id).await?;
    let mut controller = session.lock().await;
    if controller.start_session(&payload.owner_id, &payload.reference_time, Local::now()) {
        info!(%id, owner = controller.owner_id(), "session ready");
    }
    Ok(Json(controller.view(id, Utc::now())))
}

pub async fn record_marker(
    State(state): State<AppState>,
    Path((id, marker_id)): Path<(Uuid, String)>,
) -> Result<Json<SessionView>, AppError> {
    let session = lookup(&state, id).await?;
    let mut controller = session.lock().await;
    let result = controller.record_marker_event(&marker_id, Utc::now());
    let record = surface(&mut controller, result)?;
    spawn_write(Arc::clone(&state.store), Arc::clone(&session), record);
    Ok(Json(controller.view(id, Utc::now())))
}

pub async fn update_comment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CommentDraftRequest>,
) -> Result<Json<SessionView>, AppError> {
    let session = lookup(&state, id).await?;
    let mut controller = session.lock().await;
    controller.set_comment_text(&payload.text);
    Ok(Json(controller.view(id, Utc::now())))
}

pub async fn record_comment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CommentDraftRequest>,
) -> Result<Json<SessionView>, AppError> {
    let session = lookup(&state, id).await?;
    let mut controller = session.lock().await;
    controller.set_comment_text(&payload.text);
    let result = controller.record_comment(Utc::now());
    let record = surface(&mut controller, result)?;
    spawn_write(Arc::clone(&state.store), Arc::clone(&session), record);
    Ok(Json(controller.view(id, Utc::now())))
}

pub async fn keypad(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<KeypadRequest>,
) -> Result<Json<SessionView>, AppError> {
    let session = lookup(&state, id).await?;
    let mut controller = session.lock().await;
    match payload.key.trim() {
        "back" => controller.pop_camera_digit(),
        "clear" => controller.clear_camera_number(),
        key => {
            let mut chars = key.chars();
            match (chars.next(), chars.next()) {
                (Some(digit), None) if digit.is_ascii_digit() => {
                    controller.push_camera_digit(digit);
                }
                _ => return Err(AppError::bad_request("key must be a digit, 'back' or 'clear'")),
            }
        }
    }
    Ok(Json(controller.view(id, Utc::now())))
}

pub async fn undo(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let session = lookup(&state, id).await?;
    let mut controller = session.lock().await;
    let result = controller.undo_last();
    let entry = surface(&mut controller, result)?;
    spawn_delete(Arc::clone(&state.store), Arc::clone(&session), entry.key);
    Ok(Json(controller.view(id, Utc::now())))
}

pub async fn refresh(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let session = lookup(&state, id).await?;
    refresh_counts(state.store.as_ref(), &session).await?;
    let controller = session.lock().await;
    Ok(Json(controller.view(id, Utc::now())))
}

pub async fn dismiss_error(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let session = lookup(&state, id).await?;
    let mut controller = session.lock().await;
    controller.dismiss_error();
    Ok(Json(controller.view(id, Utc::now())))
}

pub async fn download(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let text = export_database(state.store.as_ref()).await.map_err(|err| {
        error!("export failed: {err}");
        AppError::from(err)
    })?;
    let headers = [
        (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{EXPORT_FILE_NAME}\""),
        ),
    ];
    Ok((headers, text))
}

async fn lookup(state: &AppState, id: Uuid) -> Result<SharedSession, AppError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| AppError::not_found(format!("unknown session {id}")))
}

// Validation failures become the session's global message as well as the
// response, before anything reaches the store.
fn surface<T>(
    controller: &mut SessionController,
    result: Result<T, SessionError>,
) -> Result<T, AppError> {
    result.map_err(|err| {
        warn!("rejected: {err}");
        controller.report(err.to_string());
        AppError::from(err)
    })
}
