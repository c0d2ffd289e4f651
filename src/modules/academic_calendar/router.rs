use axum::{Router, routing::get};

use crate::state::AppState;

use super::controller::{
    get_academic_event, get_academic_events, get_current_session_exam, get_next_academic_event,
    get_next_session_exam, get_opened_academic_events, get_previous_academic_event,
    get_previous_session_exam, update_academic_event,
};

/// Routes: GET /, GET /opened, GET /next, GET /previous, GET /{id}, PUT /{id}
pub fn init_academic_calendars_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_academic_events))
        .route("/opened", get(get_opened_academic_events))
        .route("/next", get(get_next_academic_event))
        .route("/previous", get(get_previous_academic_event))
        .route(
            "/{id}",
            get(get_academic_event).put(update_academic_event),
        )
}

/// Routes: GET /current, GET /next, GET /previous
pub fn init_exam_sessions_router() -> Router<AppState> {
    Router::new()
        .route("/current", get(get_current_session_exam))
        .route("/next", get(get_next_session_exam))
        .route("/previous", get(get_previous_session_exam))
}
