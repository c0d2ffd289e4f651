use utoipa::OpenApi;

use campus_core::{ErrorResponse, FailureKind, ValidationFailure};
use campus_models::{
    AcademicCalendarType, AcademicEvent, AcademicSessionEvent, AdjacencyRow, Block, BlockInput,
    CreateLinkDto, EducationGroupType, LinkResponse, LinkType, OpenedEventsResponse,
    ReverseAdjacencyRow, SessionNumber, UpdateAcademicCalendarDto, UpdateLinkDto,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::academic_calendar::controller::get_academic_events,
        crate::modules::academic_calendar::controller::get_academic_event,
        crate::modules::academic_calendar::controller::update_academic_event,
        crate::modules::academic_calendar::controller::get_opened_academic_events,
        crate::modules::academic_calendar::controller::get_next_academic_event,
        crate::modules::academic_calendar::controller::get_previous_academic_event,
        crate::modules::academic_calendar::controller::get_current_session_exam,
        crate::modules::academic_calendar::controller::get_next_session_exam,
        crate::modules::academic_calendar::controller::get_previous_session_exam,
        crate::modules::program_tree::controller::create_link,
        crate::modules::program_tree::controller::update_link,
        crate::modules::program_tree::controller::delete_link,
        crate::modules::program_tree::controller::get_adjacency_list,
        crate::modules::program_tree::controller::get_reverse_adjacency_list,
    ),
    components(
        schemas(
            AcademicCalendarType,
            AcademicEvent,
            AcademicSessionEvent,
            UpdateAcademicCalendarDto,
            OpenedEventsResponse,
            SessionNumber,
            EducationGroupType,
            LinkType,
            Block,
            BlockInput,
            CreateLinkDto,
            UpdateLinkDto,
            LinkResponse,
            AdjacencyRow,
            ReverseAdjacencyRow,
            ErrorResponse,
            ValidationFailure,
            FailureKind,
        )
    ),
    tags(
        (name = "Academic Calendars", description = "Calendar windows gating period-bound operations"),
        (name = "Exam Sessions", description = "Exam session projections of the score encoding calendar"),
        (name = "Program Tree", description = "Program tree links and adjacency queries")
    ),
    info(
        title = "Campus API",
        version = "0.1.0",
        description = "Academic calendar windows and program tree rules, built with Rust, Axum, and PostgreSQL.",
        license(
            name = "GPL-3.0-or-later"
        )
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();

        for expected in [
            "/api/academic-calendars",
            "/api/academic-calendars/{id}",
            "/api/academic-calendars/opened",
            "/api/exam-sessions/current",
            "/api/program-tree/links",
            "/api/program-tree/links/{id}",
            "/api/program-tree/adjacency",
            "/api/program-tree/reverse-adjacency",
        ] {
            assert!(paths.iter().any(|p| p.as_str() == expected), "missing {expected}");
        }
    }
}
