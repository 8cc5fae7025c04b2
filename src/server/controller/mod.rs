//! HTTP request handlers.
//!
//! Each entity module exposes its handlers as a `RouteSet` which the router
//! mounts under the prefix derived from the set's module path. Handlers take
//! the `Params` extractor and return `HandlerResult`, so every response is an
//! envelope.

pub mod home;
pub mod task;

#[cfg(test)]
mod test;
