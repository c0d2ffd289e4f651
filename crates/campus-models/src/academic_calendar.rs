//! Academic calendar domain models and DTOs.
//!
//! An [`AcademicEvent`] is a dated window (start date, optional end date)
//! during which an action such as score encoding is permitted for one
//! target academic year. Events that carry a session number are exam-session
//! windows and are projected as [`AcademicSessionEvent`].

use crate::enums::AcademicCalendarType;
use crate::ids::AcademicEventId;
use crate::value_types::SessionNumber;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// A calendar window for one reference type and target year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AcademicEvent {
    pub id: AcademicEventId,
    pub title: String,
    pub reference: AcademicCalendarType,
    /// Academic year the window authorizes actions for (2024 means 2024-25)
    pub authorized_target_year: i32,
    pub start_date: NaiveDate,
    /// Open-ended when absent
    pub end_date: Option<NaiveDate>,
    pub session: Option<SessionNumber>,
}

impl AcademicEvent {
    /// Whether `date` falls inside the window, both ends inclusive.
    pub fn is_open(&self, date: NaiveDate) -> bool {
        self.start_date <= date && self.end_date.is_none_or(|end| date <= end)
    }

    pub fn is_session_event(&self) -> bool {
        self.session.is_some()
    }

    pub fn as_session_event(&self) -> Option<AcademicSessionEvent> {
        self.session.map(|session| AcademicSessionEvent {
            event: self.clone(),
            session,
        })
    }

    /// `"2024-25"`
    pub fn target_year_label(&self) -> String {
        format!(
            "{}-{:02}",
            self.authorized_target_year,
            (self.authorized_target_year + 1) % 100
        )
    }
}

/// An academic event guaranteed to carry a session number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AcademicSessionEvent {
    #[serde(flatten)]
    pub event: AcademicEvent,
    #[serde(skip)]
    pub session: SessionNumber,
}

impl AcademicSessionEvent {
    pub fn session(&self) -> SessionNumber {
        self.session
    }

    pub fn is_open(&self, date: NaiveDate) -> bool {
        self.event.is_open(date)
    }
}

/// Fields used when `get_or_create` has to create the event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcademicEventDefaults {
    pub title: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

/// DTO for moving a calendar window.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateAcademicCalendarDto {
    /// New title, unchanged when absent
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    #[validate(required(message = "This field is required."))]
    pub start_date: Option<NaiveDate>,
    /// Leave empty for an open-ended window
    pub end_date: Option<NaiveDate>,
}

/// Query parameters selecting events of one reference type.
#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct CalendarReferenceParams {
    pub reference: AcademicCalendarType,
    /// Reference date, today when absent
    pub date: Option<NaiveDate>,
}

/// Query parameters for the opened-events endpoint.
#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct OpenedEventsParams {
    pub reference: AcademicCalendarType,
    pub date: Option<NaiveDate>,
    /// Restricts `is_open` to one target year
    pub target_year: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct ReferenceDateParams {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct AcademicEventFilterParams {
    pub reference: AcademicCalendarType,
}

/// Windows of one type open on a given date.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OpenedEventsResponse {
    pub reference: AcademicCalendarType,
    pub date: NaiveDate,
    pub is_open: bool,
    pub target_years_opened: Vec<i32>,
    pub events: Vec<AcademicEvent>,
}
