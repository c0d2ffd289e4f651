//! Business rules for moving a calendar window.

use chrono::NaiveDate;

use campus_core::{BusinessValidator, FailureKind, TwoStepsValidatorList, ValidationFailure};
use campus_models::{AcademicCalendarType, AcademicEvent};

pub const END_BEFORE_START_MESSAGE: &str = "End date must be greater or equals than Start date";
pub const ATTENDANCE_OUTSIDE_SCORE_ENCODING_MESSAGE: &str = "The start date cannot be lower than the score encoding start date and the end date cannot be greater than the score encoding end date";

pub struct StartDateRequiredValidator {
    start_date: Option<NaiveDate>,
}

impl BusinessValidator for StartDateRequiredValidator {
    fn validate(&self) -> Result<(), ValidationFailure> {
        match self.start_date {
            Some(_) => Ok(()),
            None => Err(ValidationFailure::field(
                FailureKind::Required,
                "start_date",
                "This field is required.",
            )),
        }
    }
}

pub struct DateOrderValidator {
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
}

impl BusinessValidator for DateOrderValidator {
    fn validate(&self) -> Result<(), ValidationFailure> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date)
            && end < start
        {
            return Err(ValidationFailure::field(
                FailureKind::DateOrder,
                "end_date",
                END_BEFORE_START_MESSAGE,
            ));
        }
        Ok(())
    }
}

/// An attendance-mark window must sit inside the score-encoding window of the
/// same session and target year.
pub struct AttendanceMarkWithinScoreEncodingValidator<'a> {
    score_encoding: Option<&'a AcademicEvent>,
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
}

impl BusinessValidator for AttendanceMarkWithinScoreEncodingValidator<'_> {
    fn validate(&self) -> Result<(), ValidationFailure> {
        let Some(score_encoding) = self.score_encoding else {
            return Err(self.failure());
        };

        if self.start_date < score_encoding.start_date {
            return Err(self.failure());
        }

        let ends_too_late = match (score_encoding.end_date, self.end_date) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(limit), Some(end)) => end > limit,
        };
        if ends_too_late {
            return Err(self.failure());
        }

        Ok(())
    }
}

impl AttendanceMarkWithinScoreEncodingValidator<'_> {
    fn failure(&self) -> ValidationFailure {
        ValidationFailure::non_field(
            FailureKind::AttendanceMarkOutsideScoreEncoding,
            ATTENDANCE_OUTSIDE_SCORE_ENCODING_MESSAGE,
        )
    }
}

/// Validates new dates for `event`.
///
/// `score_encodings` are the `SCORES_EXAM_SUBMISSION` windows to compare an
/// attendance-mark window with; other event types ignore them.
pub struct UpdateAcademicCalendarValidatorList<'a> {
    event: &'a AcademicEvent,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    score_encodings: &'a [AcademicEvent],
}

impl<'a> UpdateAcademicCalendarValidatorList<'a> {
    pub fn new(
        event: &'a AcademicEvent,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        score_encodings: &'a [AcademicEvent],
    ) -> Self {
        Self {
            event,
            start_date,
            end_date,
            score_encodings,
        }
    }

    fn score_encoding_for_same_session(&self) -> Option<&'a AcademicEvent> {
        self.score_encodings.iter().find(|candidate| {
            candidate.reference == AcademicCalendarType::ScoresExamSubmission
                && candidate.session == self.event.session
                && candidate.authorized_target_year == self.event.authorized_target_year
        })
    }
}

impl TwoStepsValidatorList for UpdateAcademicCalendarValidatorList<'_> {
    fn data_contract_validators(&self) -> Vec<Box<dyn BusinessValidator + '_>> {
        let mut validators: Vec<Box<dyn BusinessValidator + '_>> = Vec::new();
        validators.push(Box::new(StartDateRequiredValidator {
            start_date: self.start_date,
        }));
        validators.push(Box::new(DateOrderValidator {
            start_date: self.start_date,
            end_date: self.end_date,
        }));
        validators
    }

    fn invariant_validators(&self) -> Vec<Box<dyn BusinessValidator + '_>> {
        let mut validators: Vec<Box<dyn BusinessValidator + '_>> = Vec::new();

        if self.event.reference == AcademicCalendarType::AttendanceMark
            && let Some(start_date) = self.start_date
        {
            validators.push(Box::new(AttendanceMarkWithinScoreEncodingValidator {
                score_encoding: self.score_encoding_for_same_session(),
                start_date,
                end_date: self.end_date,
            }));
        }

        validators
    }
}
