use crate::handlers;
use crate::state::AppState;
use crate::ui::COUNTER_PATH;
use axum::{routing::{delete, get, post, put}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::launcher))
        .route(COUNTER_PATH, get(handlers::counter_page))
        .route("/download", get(handlers::download))
        .route("/api/sessions/:id", get(handlers::get_session))
        .route("/api/sessions/:id/start", post(handlers::start_session))
        .route("/api/sessions/:id/markers/:marker", post(handlers::record_marker))
        .route(
            "/api/sessions/:id/comment",
            put(handlers::update_comment).post(handlers::record_comment),
        )
        .route("/api/sessions/:id/keypad", post(handlers::keypad))
        .route("/api/sessions/:id/undo", post(handlers::undo))
        .route("/api/sessions/:id/refresh", post(handlers::refresh))
        .route("/api/sessions/:id/error", delete(handlers::dismiss_error))
        .with_state(state)
}
