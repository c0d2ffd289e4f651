//! Program tree module.
//!
//! A program is a tree of groups (branches) and learning units (leaves)
//! joined by ordered links. This module validates link writes so that the
//! tree stays acyclic and year-consistent, and serves downward and upward
//! adjacency lists.

pub mod controller;
pub mod graph;
pub mod model;
pub mod repository;
pub mod router;
pub mod service;
pub mod validator;
