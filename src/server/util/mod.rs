//! Request-independent helpers used across the server layers.
//!
//! - `convert` - Stored documents to and from JSON transport values
//! - `param` - The `Params` extractor and its coercions
//! - `route` - Module path to URL prefix derivation and route sets

pub mod convert;
pub mod param;
pub mod route;
