//! Business validator chain.
//!
//! A [`BusinessValidator`] checks one rule and returns a [`ValidationFailure`]
//! when the rule is violated. A [`TwoStepsValidatorList`] groups validators in
//! two tiers:
//!
//! 1. **data contract** validators: structural checks on the input. The first
//!    failure stops validation and is reported alone.
//! 2. **invariant** validators: independent business rules. All of them run
//!    and every failure is reported together in one [`BusinessErrors`].
//!
//! # Example
//!
//! ```ignore
//! struct CreateLinkValidatorList<'a> { /* command, tree, ... */ }
//!
//! impl TwoStepsValidatorList for CreateLinkValidatorList<'_> {
//!     fn data_contract_validators(&self) -> Vec<Box<dyn BusinessValidator + '_>> {
//!         vec![Box::new(ChildReferenceValidator::new(&self.command))]
//!     }
//!
//!     fn invariant_validators(&self) -> Vec<Box<dyn BusinessValidator + '_>> {
//!         vec![Box::new(NoLoopValidator::new(self.tree, parent, child))]
//!     }
//! }
//!
//! CreateLinkValidatorList { .. }.validate()?;
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use utoipa::ToSchema;

/// Tag identifying which rule produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Required,
    DateOrder,
    AttendanceMarkOutsideScoreEncoding,
    ChildReference,
    Loop,
    AcademicYearMismatch,
    InvalidBlock,
    NotFound,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::DateOrder => "date_order",
            Self::AttendanceMarkOutsideScoreEncoding => "attendance_mark_outside_score_encoding",
            Self::ChildReference => "child_reference",
            Self::Loop => "loop",
            Self::AcademicYearMismatch => "academic_year_mismatch",
            Self::InvalidBlock => "invalid_block",
            Self::NotFound => "not_found",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One violated rule, optionally attached to an input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema, thiserror::Error)]
#[error("{message}")]
pub struct ValidationFailure {
    pub kind: FailureKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ValidationFailure {
    pub fn field(kind: FailureKind, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            field: Some(field.into()),
        }
    }

    pub fn non_field(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            field: None,
        }
    }
}

/// Every failure reported by one validation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusinessErrors(Vec<ValidationFailure>);

impl BusinessErrors {
    pub fn new(failures: Vec<ValidationFailure>) -> Self {
        Self(failures)
    }

    pub fn failures(&self) -> &[ValidationFailure] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<ValidationFailure> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, kind: FailureKind) -> bool {
        self.0.iter().any(|failure| failure.kind == kind)
    }

    pub fn non_field_errors(&self) -> Vec<String> {
        self.0
            .iter()
            .filter(|failure| failure.field.is_none())
            .map(|failure| failure.message.clone())
            .collect()
    }

    pub fn field_errors(&self) -> BTreeMap<String, Vec<String>> {
        let mut fields: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for failure in &self.0 {
            if let Some(field) = &failure.field {
                fields
                    .entry(field.clone())
                    .or_default()
                    .push(failure.message.clone());
            }
        }
        fields
    }
}

impl From<ValidationFailure> for BusinessErrors {
    fn from(failure: ValidationFailure) -> Self {
        Self(vec![failure])
    }
}

impl fmt::Display for BusinessErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.0.iter().map(|f| f.message.as_str()).collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl std::error::Error for BusinessErrors {}

pub trait BusinessValidator {
    fn validate(&self) -> Result<(), ValidationFailure>;
}

pub trait TwoStepsValidatorList {
    fn data_contract_validators(&self) -> Vec<Box<dyn BusinessValidator + '_>>;

    fn invariant_validators(&self) -> Vec<Box<dyn BusinessValidator + '_>>;

    fn validate(&self) -> Result<(), BusinessErrors> {
        for validator in self.data_contract_validators() {
            validator.validate()?;
        }

        let failures: Vec<ValidationFailure> = self
            .invariant_validators()
            .iter()
            .filter_map(|validator| validator.validate().err())
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(BusinessErrors::new(failures))
        }
    }
}
