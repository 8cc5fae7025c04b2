//! Repository layer over the document store.
//!
//! `model_base` holds the generic access layer every entity shares: collection
//! binding, bookkeeping timestamps, soft deletion and counters. Repositories for
//! individual entities wrap a `ModelBase` and express that entity's queries;
//! they return documents and store results to the service layer.

pub mod model_base;
pub mod task;

#[cfg(test)]
mod test;
