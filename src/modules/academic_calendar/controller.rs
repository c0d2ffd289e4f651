use axum::{
    Json,
    extract::{Path, State},
};
use chrono::{Local, NaiveDate};
use tracing::instrument;
use uuid::Uuid;

use campus_core::AppError;
use campus_models::ids::AcademicEventId;

use crate::modules::academic_calendar::model::{
    AcademicEvent, AcademicEventFilterParams, AcademicSessionEvent, CalendarReferenceParams,
    OpenedEventsParams, OpenedEventsResponse, ReferenceDateParams, UpdateAcademicCalendarDto,
};
use crate::modules::academic_calendar::service::AcademicCalendarService;
use crate::state::AppState;
use crate::validator::{QueryParams, ValidatedJson};

fn reference_date(date: Option<NaiveDate>) -> NaiveDate {
    date.unwrap_or_else(|| Local::now().date_naive())
}

/// List every event of one calendar type
#[utoipa::path(
    get,
    path = "/api/academic-calendars",
    summary = "List academic events",
    params(AcademicEventFilterParams),
    responses(
        (status = 200, description = "Events of every target year", body = Vec<AcademicEvent>),
        (status = 400, description = "Unknown calendar type")
    ),
    tag = "Academic Calendars"
)]
#[instrument(skip(state))]
pub async fn get_academic_events(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<AcademicEventFilterParams>,
) -> Result<Json<Vec<AcademicEvent>>, AppError> {
    let events =
        AcademicCalendarService::get_academic_events(state.calendars.as_ref(), params.reference)
            .await?;

    Ok(Json(events))
}

/// Get an academic event by ID
#[utoipa::path(
    get,
    path = "/api/academic-calendars/{id}",
    summary = "Get academic event",
    params(
        ("id" = Uuid, Path, description = "Academic event ID")
    ),
    responses(
        (status = 200, description = "Academic event", body = AcademicEvent),
        (status = 404, description = "Academic event not found")
    ),
    tag = "Academic Calendars"
)]
#[instrument(skip(state))]
pub async fn get_academic_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AcademicEvent>, AppError> {
    let event =
        AcademicCalendarService::get_event(state.calendars.as_ref(), AcademicEventId::from(id))
            .await?;

    Ok(Json(event))
}

/// Move a calendar window
#[utoipa::path(
    put,
    path = "/api/academic-calendars/{id}",
    summary = "Update academic event",
    params(
        ("id" = Uuid, Path, description = "Academic event ID")
    ),
    request_body = UpdateAcademicCalendarDto,
    responses(
        (status = 200, description = "Academic event updated", body = AcademicEvent),
        (status = 400, description = "Dates violate a calendar rule"),
        (status = 404, description = "Academic event not found"),
        (status = 422, description = "Missing start date")
    ),
    tag = "Academic Calendars"
)]
#[instrument(skip(state))]
pub async fn update_academic_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateAcademicCalendarDto>,
) -> Result<Json<AcademicEvent>, AppError> {
    let event = AcademicCalendarService::update_event(
        state.calendars.as_ref(),
        AcademicEventId::from(id),
        dto,
    )
    .await?;

    Ok(Json(event))
}

/// Windows of one type open on a date
#[utoipa::path(
    get,
    path = "/api/academic-calendars/opened",
    summary = "Get opened academic events",
    params(OpenedEventsParams),
    responses(
        (status = 200, description = "Open windows and their target years", body = OpenedEventsResponse)
    ),
    tag = "Academic Calendars"
)]
#[instrument(skip(state))]
pub async fn get_opened_academic_events(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<OpenedEventsParams>,
) -> Result<Json<OpenedEventsResponse>, AppError> {
    let overview = AcademicCalendarService::get_opened_overview(
        state.calendars.as_ref(),
        params.reference,
        params.target_year,
        reference_date(params.date),
    )
    .await?;

    Ok(Json(overview))
}

/// Next window of one type
#[utoipa::path(
    get,
    path = "/api/academic-calendars/next",
    summary = "Get next academic event",
    params(CalendarReferenceParams),
    responses(
        (status = 200, description = "Earliest window starting on or after the date", body = Option<AcademicEvent>)
    ),
    tag = "Academic Calendars"
)]
#[instrument(skip(state))]
pub async fn get_next_academic_event(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<CalendarReferenceParams>,
) -> Result<Json<Option<AcademicEvent>>, AppError> {
    let event = AcademicCalendarService::get_next_academic_event(
        state.calendars.as_ref(),
        params.reference,
        reference_date(params.date),
    )
    .await?;

    Ok(Json(event))
}

/// Previous window of one type
#[utoipa::path(
    get,
    path = "/api/academic-calendars/previous",
    summary = "Get previous academic event",
    params(CalendarReferenceParams),
    responses(
        (status = 200, description = "Latest-starting window ended on or before the date", body = Option<AcademicEvent>)
    ),
    tag = "Academic Calendars"
)]
#[instrument(skip(state))]
pub async fn get_previous_academic_event(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<CalendarReferenceParams>,
) -> Result<Json<Option<AcademicEvent>>, AppError> {
    let event = AcademicCalendarService::get_previous_academic_event(
        state.calendars.as_ref(),
        params.reference,
        reference_date(params.date),
    )
    .await?;

    Ok(Json(event))
}

/// Exam session whose score encoding is open
#[utoipa::path(
    get,
    path = "/api/exam-sessions/current",
    summary = "Get current exam session",
    params(ReferenceDateParams),
    responses(
        (status = 200, description = "Current session, if any", body = Option<AcademicSessionEvent>)
    ),
    tag = "Exam Sessions"
)]
#[instrument(skip(state))]
pub async fn get_current_session_exam(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<ReferenceDateParams>,
) -> Result<Json<Option<AcademicSessionEvent>>, AppError> {
    let session = AcademicCalendarService::current_session_exam(
        state.calendars.as_ref(),
        reference_date(params.date),
    )
    .await?;

    Ok(Json(session))
}

/// Closest upcoming exam session
#[utoipa::path(
    get,
    path = "/api/exam-sessions/next",
    summary = "Get closest new exam session",
    params(ReferenceDateParams),
    responses(
        (status = 200, description = "Next session, if any", body = Option<AcademicSessionEvent>)
    ),
    tag = "Exam Sessions"
)]
#[instrument(skip(state))]
pub async fn get_next_session_exam(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<ReferenceDateParams>,
) -> Result<Json<Option<AcademicSessionEvent>>, AppError> {
    let session = AcademicCalendarService::closest_new_session_exam(
        state.calendars.as_ref(),
        reference_date(params.date),
    )
    .await?;

    Ok(Json(session))
}

/// Latest finished exam session
#[utoipa::path(
    get,
    path = "/api/exam-sessions/previous",
    summary = "Get latest exam session",
    params(ReferenceDateParams),
    responses(
        (status = 200, description = "Previous session, if any", body = Option<AcademicSessionEvent>)
    ),
    tag = "Exam Sessions"
)]
#[instrument(skip(state))]
pub async fn get_previous_session_exam(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<ReferenceDateParams>,
) -> Result<Json<Option<AcademicSessionEvent>>, AppError> {
    let session = AcademicCalendarService::latest_session_exam(
        state.calendars.as_ref(),
        reference_date(params.date),
    )
    .await?;

    Ok(Json(session))
}
