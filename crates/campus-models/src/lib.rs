//! # Campus Models
//!
//! Domain models and DTOs for the Campus rules service.
//!
//! # Modules
//!
//! - [`academic_calendar`]: calendar windows and exam-session projections
//! - [`program_tree`]: branch/leaf nodes, links and traversal rows
//! - [`enums`]: text-backed enumerations (calendar types, node types, link types)
//! - [`ids`]: strongly-typed UUID newtypes
//! - [`value_types`]: [`Block`](value_types::Block) and
//!   [`SessionNumber`](value_types::SessionNumber)
//!
//! # Example
//!
//! ```ignore
//! use campus_models::{AcademicEvent, AcademicCalendarType};
//!
//! let open_now = events
//!     .iter()
//!     .filter(|e| e.reference == AcademicCalendarType::ScoresExamSubmission)
//!     .any(|e| e.is_open(today));
//! ```

pub mod academic_calendar;
pub mod enums;
pub mod ids;
pub mod program_tree;
pub mod value_types;

// Re-export commonly used types at crate root for convenience
pub use academic_calendar::{
    AcademicEvent, AcademicEventDefaults, AcademicEventFilterParams, AcademicSessionEvent,
    CalendarReferenceParams, OpenedEventsParams, OpenedEventsResponse, ReferenceDateParams,
    UpdateAcademicCalendarDto,
};

pub use enums::{
    AcademicCalendarType, EducationGroupType, GroupType, LinkType, MiniTrainingType, NodeType,
    TrainingType,
};

pub use ids::{AcademicEventId, EducationGroupYearId, LearningUnitYearId, LinkId};

pub use program_tree::{
    AdjacencyParams, AdjacencyRow, CreateLinkDto, EducationGroupYear, LearningUnitYear, Link,
    LinkChild, LinkResponse, ReverseAdjacencyParams, ReverseAdjacencyRow, UpdateLinkDto,
};

pub use value_types::{Block, BlockInput, SessionNumber, ValueTypeError};
