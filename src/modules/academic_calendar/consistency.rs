//! Periodic regeneration of recurring calendar windows.
//!
//! Each [`CalendarDefinition`] describes a window that recurs every academic
//! year on the same month/day boundaries. Regeneration only creates missing
//! events and never touches existing ones, so it can run any number of times.

use chrono::NaiveDate;
use tracing::instrument;

use campus_core::AppError;
use campus_models::{AcademicCalendarType, AcademicEventDefaults, SessionNumber};

use crate::metrics;
use crate::modules::academic_calendar::repository::AcademicEventRepository;

/// Years generated after the current one by [`ensure_consistency_until_n_plus_6`].
pub const DEFAULT_HORIZON_YEARS: i32 = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarDefinition {
    pub reference: AcademicCalendarType,
    pub title: &'static str,
    pub start: (u32, u32),
    pub end: Option<(u32, u32)>,
    pub session: Option<SessionNumber>,
}

impl CalendarDefinition {
    /// Window boundaries for `target_year`. `None` when the month/day does
    /// not exist that year (Feb 29).
    pub fn defaults_for(&self, target_year: i32) -> Option<AcademicEventDefaults> {
        let start_date = NaiveDate::from_ymd_opt(target_year, self.start.0, self.start.1)?;
        let end_date = match self.end {
            Some((month, day)) => Some(NaiveDate::from_ymd_opt(target_year, month, day)?),
            None => None,
        };

        Some(AcademicEventDefaults {
            title: self.title.to_string(),
            start_date,
            end_date,
        })
    }
}

pub fn default_definitions() -> Vec<CalendarDefinition> {
    vec![
        CalendarDefinition {
            reference: AcademicCalendarType::TeachingChargeApplication,
            title: "Candidature aux cours vacants",
            start: (2, 1),
            end: Some((2, 14)),
            session: None,
        },
        CalendarDefinition {
            reference: AcademicCalendarType::SummaryCourseSubmission,
            title: "Modification fiches descriptives",
            start: (7, 1),
            end: Some((9, 13)),
            session: None,
        },
    ]
}

/// Creates the missing events of `definition` for
/// `current_year ..= current_year + horizon_years`. Returns how many were created.
#[instrument(skip(repo))]
pub async fn ensure_consistency(
    repo: &dyn AcademicEventRepository,
    definition: &CalendarDefinition,
    current_year: i32,
    horizon_years: i32,
) -> Result<usize, AppError> {
    let mut created_count = 0;

    for target_year in current_year..=current_year + horizon_years {
        let Some(defaults) = definition.defaults_for(target_year) else {
            tracing::warn!(
                reference = %definition.reference,
                target_year,
                "Calendar definition has no valid date this year, skipping"
            );
            continue;
        };

        let (_, created) = repo
            .get_or_create(definition.reference, target_year, definition.session, defaults)
            .await?;

        if created {
            created_count += 1;
            metrics::track_calendar_event_created(definition.reference);
        }
    }

    if created_count > 0 {
        tracing::info!(
            reference = %definition.reference,
            created = created_count,
            "Calendar events created"
        );
    }

    Ok(created_count)
}

pub async fn ensure_consistency_until_n_plus_6(
    repo: &dyn AcademicEventRepository,
    definition: &CalendarDefinition,
    current_year: i32,
) -> Result<usize, AppError> {
    ensure_consistency(repo, definition, current_year, DEFAULT_HORIZON_YEARS).await
}

/// Runs every definition once.
pub async fn ensure_all(
    repo: &dyn AcademicEventRepository,
    definitions: &[CalendarDefinition],
    current_year: i32,
    horizon_years: i32,
) -> Result<usize, AppError> {
    let mut total = 0;
    for definition in definitions {
        total += ensure_consistency(repo, definition, current_year, horizon_years).await?;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::academic_calendar::repository::InMemoryAcademicEventRepository;

    fn summary_definition() -> CalendarDefinition {
        default_definitions()
            .into_iter()
            .find(|d| d.reference == AcademicCalendarType::SummaryCourseSubmission)
            .unwrap()
    }

    #[tokio::test]
    async fn test_creates_seven_years_with_default_values() {
        let repo = InMemoryAcademicEventRepository::new();
        let definition = summary_definition();

        let created = ensure_consistency_until_n_plus_6(&repo, &definition, 2025)
            .await
            .unwrap();
        assert_eq!(created, 7);

        let events = repo.get_academic_events(definition.reference).await.unwrap();
        assert_eq!(events.len(), 7);

        let first = &events[0];
        assert_eq!(first.title, "Modification fiches descriptives");
        assert_eq!(first.authorized_target_year, 2025);
        assert_eq!(first.start_date, NaiveDate::from_ymd_opt(2025, 7, 1).unwrap());
        assert_eq!(first.end_date, NaiveDate::from_ymd_opt(2025, 9, 13));
        assert_eq!(events[6].authorized_target_year, 2031);
    }

    #[tokio::test]
    async fn test_is_idempotent() {
        let repo = InMemoryAcademicEventRepository::new();
        let definition = summary_definition();

        for _ in 0..5 {
            ensure_consistency_until_n_plus_6(&repo, &definition, 2025)
                .await
                .unwrap();
        }

        assert_eq!(
            repo.get_academic_events(definition.reference).await.unwrap().len(),
            7
        );
    }

    #[tokio::test]
    async fn test_existing_events_are_left_untouched() {
        let repo = InMemoryAcademicEventRepository::new();
        let definition = default_definitions().remove(0);
        let (existing, _) = repo
            .get_or_create(
                definition.reference,
                2026,
                None,
                AcademicEventDefaults {
                    title: "Custom".to_string(),
                    start_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
                    end_date: None,
                },
            )
            .await
            .unwrap();

        let created = ensure_consistency_until_n_plus_6(&repo, &definition, 2025)
            .await
            .unwrap();
        assert_eq!(created, 6);
        assert_eq!(repo.get(existing.id).await.unwrap().title, "Custom");
    }

    #[tokio::test]
    async fn test_ensure_all_runs_every_definition() {
        let repo = InMemoryAcademicEventRepository::new();
        let total = ensure_all(&repo, &default_definitions(), 2025, 2).await.unwrap();
        assert_eq!(total, 6);
    }

    #[test]
    fn test_leap_day_definition_skips_common_years() {
        let definition = CalendarDefinition {
            reference: AcademicCalendarType::Deliberation,
            title: "Leap",
            start: (2, 29),
            end: None,
            session: None,
        };
        assert!(definition.defaults_for(2024).is_some());
        assert!(definition.defaults_for(2025).is_none());
    }
}
