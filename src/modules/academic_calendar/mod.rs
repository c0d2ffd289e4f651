//! Academic calendar module.
//!
//! Calendar windows ("academic events") decide when an action such as score
//! encoding is permitted for a target academic year. This module answers
//! which windows are open on a date, validates window updates, projects exam
//! sessions, and regenerates recurring windows ahead of time.

pub mod consistency;
pub mod controller;
pub mod model;
pub mod repository;
pub mod router;
pub mod service;
pub mod validator;
