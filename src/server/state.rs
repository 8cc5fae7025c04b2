//! Application state shared across all request handlers.
//!
//! The state is initialized once during startup and then cloned for each
//! request handler through Axum's state extraction.

use sea_orm::DatabaseConnection;

use crate::server::store::DocumentStore;

/// Application state containing shared resources.
///
/// All fields are cheap to clone: `DocumentStore` wraps the SeaORM connection
/// pool, so clones share the pool.
#[derive(Clone)]
pub struct AppState {
    /// Document store every repository reads and writes through.
    pub store: DocumentStore,
}

impl AppState {
    /// Creates a new application state.
    ///
    /// # Arguments
    /// - `db` - Database connection pool with migrations applied
    ///
    /// # Returns
    /// - `AppState` - Initialized application state ready for use
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            store: DocumentStore::new(db),
        }
    }
}
