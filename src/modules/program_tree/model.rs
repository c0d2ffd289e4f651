//! Program tree data models and DTOs.
//!
//! Re-exports the program tree models from the `campus-models` crate.

pub use campus_models::program_tree::*;
