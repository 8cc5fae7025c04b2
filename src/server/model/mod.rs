//! Server-side domain models.
//!
//! Entities declare their storage configuration here; documents read through
//! the data layer are wrapped in domain types and transformed to DTOs at the
//! controller boundary.

pub mod task;
