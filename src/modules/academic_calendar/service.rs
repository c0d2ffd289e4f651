use anyhow::anyhow;
use chrono::NaiveDate;
use tracing::instrument;

use campus_core::{AppError, TwoStepsValidatorList};
use campus_models::{
    AcademicCalendarType, AcademicEvent, AcademicEventId, AcademicSessionEvent,
    OpenedEventsResponse, UpdateAcademicCalendarDto,
};

use crate::metrics;
use crate::modules::academic_calendar::repository::AcademicEventRepository;
use crate::modules::academic_calendar::validator::UpdateAcademicCalendarValidatorList;

pub struct AcademicCalendarService;

impl AcademicCalendarService {
    #[instrument(skip(repo))]
    pub async fn get_academic_events(
        repo: &dyn AcademicEventRepository,
        reference: AcademicCalendarType,
    ) -> Result<Vec<AcademicEvent>, AppError> {
        Ok(repo.get_academic_events(reference).await?)
    }

    #[instrument(skip(repo))]
    pub async fn get_event(
        repo: &dyn AcademicEventRepository,
        id: AcademicEventId,
    ) -> Result<AcademicEvent, AppError> {
        Ok(repo.get(id).await?)
    }

    /// Moves a window after checking the update rules. Nothing is written
    /// when validation fails.
    #[instrument(skip(repo))]
    pub async fn update_event(
        repo: &dyn AcademicEventRepository,
        id: AcademicEventId,
        dto: UpdateAcademicCalendarDto,
    ) -> Result<AcademicEvent, AppError> {
        let event = repo.get(id).await?;

        let score_encodings = if event.reference == AcademicCalendarType::AttendanceMark {
            repo.search(
                Some(AcademicCalendarType::ScoresExamSubmission),
                Some(event.authorized_target_year),
            )
            .await?
        } else {
            Vec::new()
        };

        UpdateAcademicCalendarValidatorList::new(
            &event,
            dto.start_date,
            dto.end_date,
            &score_encodings,
        )
        .validate()
        .map_err(|errors| {
            metrics::track_business_validation_failures(&errors);
            AppError::business(errors)
        })?;

        let Some(start_date) = dto.start_date else {
            return Err(AppError::bad_request(anyhow!("start_date is required")));
        };

        let updated = AcademicEvent {
            title: dto.title.unwrap_or_else(|| event.title.clone()),
            start_date,
            end_date: dto.end_date,
            ..event
        };

        let saved = repo.update(&updated).await?;
        tracing::info!(
            event_id = %saved.id,
            reference = %saved.reference,
            target_year = %saved.target_year_label(),
            "Academic event updated"
        );

        Ok(saved)
    }

    /// Open events of one type, ordered by start date.
    #[instrument(skip(repo))]
    pub async fn get_opened_academic_events(
        repo: &dyn AcademicEventRepository,
        reference: AcademicCalendarType,
        date: NaiveDate,
    ) -> Result<Vec<AcademicEvent>, AppError> {
        let events = repo.get_academic_events(reference).await?;
        Ok(events.into_iter().filter(|e| e.is_open(date)).collect())
    }

    #[instrument(skip(repo))]
    pub async fn get_target_years_opened(
        repo: &dyn AcademicEventRepository,
        reference: AcademicCalendarType,
        date: NaiveDate,
    ) -> Result<Vec<i32>, AppError> {
        let events = Self::get_opened_academic_events(repo, reference, date).await?;
        Ok(target_years(&events))
    }

    /// `target_year = None` accepts any year.
    #[instrument(skip(repo))]
    pub async fn is_open(
        repo: &dyn AcademicEventRepository,
        reference: AcademicCalendarType,
        target_year: Option<i32>,
        date: NaiveDate,
    ) -> Result<bool, AppError> {
        let years = Self::get_target_years_opened(repo, reference, date).await?;
        Ok(match target_year {
            Some(year) => years.contains(&year),
            None => !years.is_empty(),
        })
    }

    /// Open events, their target years and `is_open` in one read.
    #[instrument(skip(repo))]
    pub async fn get_opened_overview(
        repo: &dyn AcademicEventRepository,
        reference: AcademicCalendarType,
        target_year: Option<i32>,
        date: NaiveDate,
    ) -> Result<OpenedEventsResponse, AppError> {
        let events = Self::get_opened_academic_events(repo, reference, date).await?;
        let target_years_opened = target_years(&events);
        let is_open = match target_year {
            Some(year) => target_years_opened.contains(&year),
            None => !target_years_opened.is_empty(),
        };

        Ok(OpenedEventsResponse {
            reference,
            date,
            is_open,
            target_years_opened,
            events,
        })
    }

    /// Earliest event starting on or after `date`.
    #[instrument(skip(repo))]
    pub async fn get_next_academic_event(
        repo: &dyn AcademicEventRepository,
        reference: AcademicCalendarType,
        date: NaiveDate,
    ) -> Result<Option<AcademicEvent>, AppError> {
        let events = repo.get_academic_events(reference).await?;
        Ok(next_event(events, date))
    }

    /// Among the events ended on or before `date`, the one that started last.
    #[instrument(skip(repo))]
    pub async fn get_previous_academic_event(
        repo: &dyn AcademicEventRepository,
        reference: AcademicCalendarType,
        date: NaiveDate,
    ) -> Result<Option<AcademicEvent>, AppError> {
        let events = repo.get_academic_events(reference).await?;
        Ok(previous_event(events, date))
    }

    #[instrument(skip(repo))]
    pub async fn current_session_exam(
        repo: &dyn AcademicEventRepository,
        date: NaiveDate,
    ) -> Result<Option<AcademicSessionEvent>, AppError> {
        let sessions = Self::session_exam_events(repo).await?;
        Ok(sessions
            .into_iter()
            .find(|e| e.is_open(date))
            .and_then(|e| e.as_session_event()))
    }

    #[instrument(skip(repo))]
    pub async fn closest_new_session_exam(
        repo: &dyn AcademicEventRepository,
        date: NaiveDate,
    ) -> Result<Option<AcademicSessionEvent>, AppError> {
        let sessions = Self::session_exam_events(repo).await?;
        Ok(next_event(sessions, date).and_then(|e| e.as_session_event()))
    }

    #[instrument(skip(repo))]
    pub async fn latest_session_exam(
        repo: &dyn AcademicEventRepository,
        date: NaiveDate,
    ) -> Result<Option<AcademicSessionEvent>, AppError> {
        let sessions = Self::session_exam_events(repo).await?;
        Ok(previous_event(sessions, date).and_then(|e| e.as_session_event()))
    }

    async fn session_exam_events(
        repo: &dyn AcademicEventRepository,
    ) -> Result<Vec<AcademicEvent>, AppError> {
        let events = repo
            .get_academic_events(AcademicCalendarType::ScoresExamSubmission)
            .await?;
        Ok(events.into_iter().filter(|e| e.is_session_event()).collect())
    }
}

fn target_years(events: &[AcademicEvent]) -> Vec<i32> {
    let mut years: Vec<i32> = events.iter().map(|e| e.authorized_target_year).collect();
    years.sort_unstable();
    years.dedup();
    years
}

fn next_event(events: Vec<AcademicEvent>, date: NaiveDate) -> Option<AcademicEvent> {
    events
        .into_iter()
        .filter(|e| e.start_date >= date)
        .min_by_key(|e| e.start_date)
}

fn previous_event(events: Vec<AcademicEvent>, date: NaiveDate) -> Option<AcademicEvent> {
    events
        .into_iter()
        .filter(|e| e.end_date.is_some_and(|end| end <= date))
        .max_by_key(|e| e.start_date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::academic_calendar::repository::InMemoryAcademicEventRepository;
    use axum::http::StatusCode;
    use campus_models::SessionNumber;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn event(
        reference: AcademicCalendarType,
        year: i32,
        start: NaiveDate,
        end: Option<NaiveDate>,
        session: Option<SessionNumber>,
    ) -> AcademicEvent {
        AcademicEvent {
            id: AcademicEventId::new(),
            title: format!("{} {}", reference, year),
            reference,
            authorized_target_year: year,
            start_date: start,
            end_date: end,
            session,
        }
    }

    const SUMMARY: AcademicCalendarType = AcademicCalendarType::SummaryCourseSubmission;

    #[tokio::test]
    async fn test_opened_events_are_ordered_by_start_date() {
        let repo = InMemoryAcademicEventRepository::with_events(vec![
            event(SUMMARY, 2020, date(2020, 1, 12), None, None),
            event(SUMMARY, 2019, date(2019, 1, 12), None, None),
            event(SUMMARY, 2018, date(2018, 1, 12), Some(date(2018, 2, 1)), None),
        ]);

        let today = date(2021, 3, 1);
        let opened = AcademicCalendarService::get_opened_academic_events(&repo, SUMMARY, today)
            .await
            .unwrap();
        let years: Vec<i32> = opened.iter().map(|e| e.authorized_target_year).collect();
        assert_eq!(years, vec![2019, 2020]);

        assert_eq!(
            AcademicCalendarService::get_target_years_opened(&repo, SUMMARY, today)
                .await
                .unwrap(),
            vec![2019, 2020]
        );
        assert!(
            AcademicCalendarService::is_open(&repo, SUMMARY, Some(2020), today)
                .await
                .unwrap()
        );
        assert!(
            !AcademicCalendarService::is_open(&repo, SUMMARY, Some(2018), today)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_no_opened_events() {
        let repo = InMemoryAcademicEventRepository::with_events(vec![event(
            SUMMARY,
            2020,
            date(2020, 1, 1),
            Some(date(2020, 1, 31)),
            None,
        )]);
        let today = date(2021, 1, 1);

        assert!(
            AcademicCalendarService::get_opened_academic_events(&repo, SUMMARY, today)
                .await
                .unwrap()
                .is_empty()
        );
        assert!(!AcademicCalendarService::is_open(&repo, SUMMARY, None, today).await.unwrap());
    }

    #[tokio::test]
    async fn test_next_and_previous_events() {
        let today = date(2025, 6, 15);
        let upcoming = event(SUMMARY, 2025, date(2025, 6, 20), Some(date(2025, 6, 25)), None);
        let later = event(SUMMARY, 2026, date(2026, 6, 20), None, None);
        let past = event(SUMMARY, 2024, date(2025, 5, 31), Some(date(2025, 6, 5)), None);
        let older = event(SUMMARY, 2023, date(2024, 5, 1), Some(date(2024, 6, 1)), None);
        let open_now = event(SUMMARY, 2022, date(2025, 6, 1), Some(date(2025, 6, 30)), None);
        let repo = InMemoryAcademicEventRepository::with_events(vec![
            later,
            upcoming.clone(),
            older,
            past.clone(),
            open_now,
        ]);

        let next = AcademicCalendarService::get_next_academic_event(&repo, SUMMARY, today)
            .await
            .unwrap();
        assert_eq!(next, Some(upcoming));

        let previous = AcademicCalendarService::get_previous_academic_event(&repo, SUMMARY, today)
            .await
            .unwrap();
        assert_eq!(previous, Some(past));
    }

    #[tokio::test]
    async fn test_next_and_previous_include_the_reference_date() {
        let today = date(2025, 6, 15);
        let starts_today = event(SUMMARY, 2025, today, None, None);
        let ends_today = event(SUMMARY, 2024, date(2025, 6, 1), Some(today), None);
        let repo = InMemoryAcademicEventRepository::with_events(vec![
            starts_today.clone(),
            ends_today.clone(),
        ]);

        let next = AcademicCalendarService::get_next_academic_event(&repo, SUMMARY, today)
            .await
            .unwrap();
        assert_eq!(next, Some(starts_today));

        let previous = AcademicCalendarService::get_previous_academic_event(&repo, SUMMARY, today)
            .await
            .unwrap();
        assert_eq!(previous, Some(ends_today));
    }

    #[tokio::test]
    async fn test_next_and_previous_are_none_without_candidates() {
        let repo = InMemoryAcademicEventRepository::new();
        let today = date(2025, 6, 15);
        assert!(
            AcademicCalendarService::get_next_academic_event(&repo, SUMMARY, today)
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            AcademicCalendarService::get_previous_academic_event(&repo, SUMMARY, today)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_session_exam_projections() {
        let scores = AcademicCalendarType::ScoresExamSubmission;
        let today = date(2025, 6, 15);
        let first = event(scores, 2024, date(2025, 1, 5), Some(date(2025, 1, 30)), Some(SessionNumber::FIRST));
        let second = event(scores, 2024, date(2025, 6, 1), Some(date(2025, 6, 30)), Some(SessionNumber::SECOND));
        let third = event(scores, 2024, date(2025, 8, 20), Some(date(2025, 9, 10)), Some(SessionNumber::THIRD));
        let without_session = event(scores, 2024, date(2025, 6, 10), None, None);
        let repo = InMemoryAcademicEventRepository::with_events(vec![
            without_session,
            third.clone(),
            first.clone(),
            second.clone(),
        ]);

        let current = AcademicCalendarService::current_session_exam(&repo, today).await.unwrap();
        assert_eq!(current.map(|e| e.session()), Some(SessionNumber::SECOND));

        let next = AcademicCalendarService::closest_new_session_exam(&repo, today).await.unwrap();
        assert_eq!(next.map(|e| e.event.id), Some(third.id));

        let latest = AcademicCalendarService::latest_session_exam(&repo, today).await.unwrap();
        assert_eq!(latest.map(|e| e.event.id), Some(first.id));
    }

    #[tokio::test]
    async fn test_update_event_persists_valid_dates() {
        let target = event(SUMMARY, 2025, date(2025, 7, 1), Some(date(2025, 9, 13)), None);
        let repo = InMemoryAcademicEventRepository::with_events(vec![target.clone()]);

        let updated = AcademicCalendarService::update_event(
            &repo,
            target.id,
            UpdateAcademicCalendarDto {
                title: None,
                start_date: Some(date(2025, 7, 2)),
                end_date: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.start_date, date(2025, 7, 2));
        assert_eq!(updated.end_date, None);
        assert_eq!(updated.title, target.title);
        assert_eq!(repo.get(target.id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_update_event_rejects_without_writing() {
        let target = event(SUMMARY, 2025, date(2025, 7, 1), Some(date(2025, 9, 13)), None);
        let repo = InMemoryAcademicEventRepository::with_events(vec![target.clone()]);

        let err = AcademicCalendarService::update_event(
            &repo,
            target.id,
            UpdateAcademicCalendarDto {
                title: None,
                start_date: Some(date(2025, 9, 1)),
                end_date: Some(date(2025, 8, 1)),
            },
        )
        .await
        .unwrap_err();

        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.details.unwrap().field_errors.contains_key("end_date"));
        assert_eq!(repo.get(target.id).await.unwrap(), target);
    }

    #[tokio::test]
    async fn test_update_attendance_mark_checks_score_encoding() {
        let scores = event(
            AcademicCalendarType::ScoresExamSubmission,
            2024,
            date(2025, 1, 10),
            Some(date(2025, 1, 31)),
            Some(SessionNumber::FIRST),
        );
        let attendance = event(
            AcademicCalendarType::AttendanceMark,
            2024,
            date(2025, 1, 10),
            Some(date(2025, 1, 20)),
            Some(SessionNumber::FIRST),
        );
        let repo = InMemoryAcademicEventRepository::with_events(vec![scores, attendance.clone()]);

        let err = AcademicCalendarService::update_event(
            &repo,
            attendance.id,
            UpdateAcademicCalendarDto {
                title: None,
                start_date: Some(date(2025, 1, 5)),
                end_date: Some(date(2025, 1, 20)),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.details.unwrap().non_field_errors.len(), 1);

        let ok = AcademicCalendarService::update_event(
            &repo,
            attendance.id,
            UpdateAcademicCalendarDto {
                title: None,
                start_date: Some(date(2025, 1, 11)),
                end_date: Some(date(2025, 1, 31)),
            },
        )
        .await;
        assert!(ok.is_ok());
    }

    #[tokio::test]
    async fn test_update_unknown_event_is_not_found() {
        let repo = InMemoryAcademicEventRepository::new();
        let err = AcademicCalendarService::update_event(
            &repo,
            AcademicEventId::new(),
            UpdateAcademicCalendarDto {
                title: None,
                start_date: Some(date(2025, 1, 1)),
                end_date: None,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }
}
