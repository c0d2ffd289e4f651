//! Academic calendar data models and DTOs.
//!
//! Re-exports the calendar models from the `campus-models` crate.

pub use campus_models::academic_calendar::*;
