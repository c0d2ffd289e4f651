//! Storage of academic calendar windows.
//!
//! [`AcademicEventRepository`] is the only way services reach calendar data.
//! The composition root picks one implementation and shares it through
//! [`AppState`](crate::state::AppState).

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::RwLock;
use tracing::instrument;

use campus_core::RepositoryError;
use campus_models::{
    AcademicCalendarType, AcademicEvent, AcademicEventDefaults, AcademicEventId, SessionNumber,
};

const EVENT_COLUMNS: &str =
    "id, title, reference, authorized_target_year, start_date, end_date, session";

#[async_trait]
pub trait AcademicEventRepository: Send + Sync {
    async fn get(&self, id: AcademicEventId) -> Result<AcademicEvent, RepositoryError>;

    /// Events matching every given filter, ordered by start date then target year.
    async fn search(
        &self,
        reference: Option<AcademicCalendarType>,
        target_year: Option<i32>,
    ) -> Result<Vec<AcademicEvent>, RepositoryError>;

    /// Inserts the event, or replaces the stored event with the same id.
    async fn save(&self, event: &AcademicEvent) -> Result<(), RepositoryError>;

    /// Replaces an existing event. Fails with `NotFound` when absent.
    async fn update(&self, event: &AcademicEvent) -> Result<AcademicEvent, RepositoryError>;

    async fn delete(&self, id: AcademicEventId) -> Result<(), RepositoryError>;

    /// Returns the event for `(reference, target_year, session)`, creating it
    /// from `defaults` when missing. The flag is `true` when it was created.
    async fn get_or_create(
        &self,
        reference: AcademicCalendarType,
        target_year: i32,
        session: Option<SessionNumber>,
        defaults: AcademicEventDefaults,
    ) -> Result<(AcademicEvent, bool), RepositoryError>;

    /// All target years of one reference type.
    async fn get_academic_events(
        &self,
        reference: AcademicCalendarType,
    ) -> Result<Vec<AcademicEvent>, RepositoryError> {
        self.search(Some(reference), None).await
    }
}

// ============================================================================
// Postgres
// ============================================================================

#[derive(Clone, Debug)]
pub struct PgAcademicEventRepository {
    db: PgPool,
}

impl PgAcademicEventRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AcademicEventRepository for PgAcademicEventRepository {
    #[instrument(skip(self))]
    async fn get(&self, id: AcademicEventId) -> Result<AcademicEvent, RepositoryError> {
        sqlx::query_as::<_, AcademicEvent>(&format!(
            "SELECT {EVENT_COLUMNS} FROM academic_calendars WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| RepositoryError::not_found("Academic event"))
    }

    #[instrument(skip(self))]
    async fn search(
        &self,
        reference: Option<AcademicCalendarType>,
        target_year: Option<i32>,
    ) -> Result<Vec<AcademicEvent>, RepositoryError> {
        let events = sqlx::query_as::<_, AcademicEvent>(&format!(
            r#"SELECT {EVENT_COLUMNS} FROM academic_calendars
               WHERE ($1::TEXT IS NULL OR reference = $1)
                 AND ($2::INTEGER IS NULL OR authorized_target_year = $2)
               ORDER BY start_date, authorized_target_year, id"#
        ))
        .bind(reference)
        .bind(target_year)
        .fetch_all(&self.db)
        .await?;

        Ok(events)
    }

    #[instrument(skip(self))]
    async fn save(&self, event: &AcademicEvent) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO academic_calendars
                   (id, title, reference, authorized_target_year, start_date, end_date, session)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               ON CONFLICT (id) DO UPDATE SET
                   title = EXCLUDED.title,
                   reference = EXCLUDED.reference,
                   authorized_target_year = EXCLUDED.authorized_target_year,
                   start_date = EXCLUDED.start_date,
                   end_date = EXCLUDED.end_date,
                   session = EXCLUDED.session,
                   updated_at = NOW()"#,
        )
        .bind(event.id)
        .bind(&event.title)
        .bind(event.reference)
        .bind(event.authorized_target_year)
        .bind(event.start_date)
        .bind(event.end_date)
        .bind(event.session)
        .execute(&self.db)
        .await
        .map_err(map_unique_violation)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn update(&self, event: &AcademicEvent) -> Result<AcademicEvent, RepositoryError> {
        sqlx::query_as::<_, AcademicEvent>(&format!(
            r#"UPDATE academic_calendars
               SET title = $2, start_date = $3, end_date = $4, updated_at = NOW()
               WHERE id = $1
               RETURNING {EVENT_COLUMNS}"#
        ))
        .bind(event.id)
        .bind(&event.title)
        .bind(event.start_date)
        .bind(event.end_date)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| RepositoryError::not_found("Academic event"))
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: AcademicEventId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM academic_calendars WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("Academic event"));
        }

        Ok(())
    }

    #[instrument(skip(self, defaults))]
    async fn get_or_create(
        &self,
        reference: AcademicCalendarType,
        target_year: i32,
        session: Option<SessionNumber>,
        defaults: AcademicEventDefaults,
    ) -> Result<(AcademicEvent, bool), RepositoryError> {
        let created = sqlx::query_as::<_, AcademicEvent>(&format!(
            r#"INSERT INTO academic_calendars
                   (id, title, reference, authorized_target_year, start_date, end_date, session)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               ON CONFLICT DO NOTHING
               RETURNING {EVENT_COLUMNS}"#
        ))
        .bind(AcademicEventId::new())
        .bind(&defaults.title)
        .bind(reference)
        .bind(target_year)
        .bind(defaults.start_date)
        .bind(defaults.end_date)
        .bind(session)
        .fetch_optional(&self.db)
        .await?;

        if let Some(event) = created {
            return Ok((event, true));
        }

        let existing = sqlx::query_as::<_, AcademicEvent>(&format!(
            r#"SELECT {EVENT_COLUMNS} FROM academic_calendars
               WHERE reference = $1
                 AND authorized_target_year = $2
                 AND session IS NOT DISTINCT FROM $3"#
        ))
        .bind(reference)
        .bind(target_year)
        .bind(session)
        .fetch_one(&self.db)
        .await?;

        Ok((existing, false))
    }
}

fn map_unique_violation(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db_err) = &e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(
            "An academic event already exists for this type, target year and session".into(),
        );
    }
    RepositoryError::Database(e)
}

// ============================================================================
// In-memory
// ============================================================================

#[derive(Debug, Default)]
pub struct InMemoryAcademicEventRepository {
    events: RwLock<Vec<AcademicEvent>>,
}

impl InMemoryAcademicEventRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(events: Vec<AcademicEvent>) -> Self {
        Self {
            events: RwLock::new(events),
        }
    }
}

#[async_trait]
impl AcademicEventRepository for InMemoryAcademicEventRepository {
    async fn get(&self, id: AcademicEventId) -> Result<AcademicEvent, RepositoryError> {
        self.events
            .read()
            .await
            .iter()
            .find(|event| event.id == id)
            .cloned()
            .ok_or_else(|| RepositoryError::not_found("Academic event"))
    }

    async fn search(
        &self,
        reference: Option<AcademicCalendarType>,
        target_year: Option<i32>,
    ) -> Result<Vec<AcademicEvent>, RepositoryError> {
        let mut events: Vec<AcademicEvent> = self
            .events
            .read()
            .await
            .iter()
            .filter(|event| reference.is_none_or(|r| event.reference == r))
            .filter(|event| target_year.is_none_or(|y| event.authorized_target_year == y))
            .cloned()
            .collect();

        events.sort_by_key(|event| (event.start_date, event.authorized_target_year, event.id));
        Ok(events)
    }

    async fn save(&self, event: &AcademicEvent) -> Result<(), RepositoryError> {
        let mut events = self.events.write().await;

        let duplicate = events.iter().any(|existing| {
            existing.id != event.id
                && existing.reference == event.reference
                && existing.authorized_target_year == event.authorized_target_year
                && existing.session == event.session
        });
        if duplicate {
            return Err(RepositoryError::Conflict(
                "An academic event already exists for this type, target year and session".into(),
            ));
        }

        match events.iter_mut().find(|existing| existing.id == event.id) {
            Some(existing) => *existing = event.clone(),
            None => events.push(event.clone()),
        }
        Ok(())
    }

    async fn update(&self, event: &AcademicEvent) -> Result<AcademicEvent, RepositoryError> {
        let mut events = self.events.write().await;
        let existing = events
            .iter_mut()
            .find(|existing| existing.id == event.id)
            .ok_or_else(|| RepositoryError::not_found("Academic event"))?;

        existing.title = event.title.clone();
        existing.start_date = event.start_date;
        existing.end_date = event.end_date;
        Ok(existing.clone())
    }

    async fn delete(&self, id: AcademicEventId) -> Result<(), RepositoryError> {
        let mut events = self.events.write().await;
        let before = events.len();
        events.retain(|event| event.id != id);

        if events.len() == before {
            return Err(RepositoryError::not_found("Academic event"));
        }
        Ok(())
    }

    async fn get_or_create(
        &self,
        reference: AcademicCalendarType,
        target_year: i32,
        session: Option<SessionNumber>,
        defaults: AcademicEventDefaults,
    ) -> Result<(AcademicEvent, bool), RepositoryError> {
        // held for the whole lookup-then-insert
        let mut events = self.events.write().await;

        if let Some(existing) = events.iter().find(|event| {
            event.reference == reference
                && event.authorized_target_year == target_year
                && event.session == session
        }) {
            return Ok((existing.clone(), false));
        }

        let event = AcademicEvent {
            id: AcademicEventId::new(),
            title: defaults.title,
            reference,
            authorized_target_year: target_year,
            start_date: defaults.start_date,
            end_date: defaults.end_date,
            session,
        };
        events.push(event.clone());
        Ok((event, true))
    }
}
