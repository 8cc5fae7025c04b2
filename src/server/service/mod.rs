//! Business logic between the controllers and the repositories.
//!
//! Services are created per request from the shared document store handle,
//! validate request-level constraints, and convert store errors into
//! application errors through `?`.

pub mod task;
