//! # Campus Core
//!
//! Core types, errors, and the business validator chain shared by every
//! Campus crate.
//!
//! - [`errors`]: [`AppError`] with HTTP response conversion, [`RepositoryError`]
//! - [`validation`]: [`ValidationFailure`], [`BusinessErrors`] and the
//!   two-step validator list
//!
//! # Example
//!
//! ```ignore
//! use campus_core::{AppError, TwoStepsValidatorList};
//!
//! validator_list.validate().map_err(AppError::business)?;
//! ```

pub mod errors;
pub mod validation;

// Re-export commonly used types at crate root
pub use errors::{AppError, ErrorDetails, ErrorResponse, RepositoryError};
pub use validation::{
    BusinessErrors, BusinessValidator, FailureKind, TwoStepsValidatorList, ValidationFailure,
};
