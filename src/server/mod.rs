//! Server-side API backend and business logic.
//!
//! This module contains the complete backend implementation: HTTP endpoints, business
//! logic, the generic document access layer and the document store underneath it. The
//! backend uses Axum as the web framework and SeaORM over SQLite for persistence.
//!
//! # Architecture
//!
//! The server follows a layered architecture with clear separation of concerns:
//!
//! - **Controller Layer** (`controller/`) - HTTP handlers exposed as route sets
//! - **Service Layer** (`service/`) - Business logic between controllers and repositories
//! - **Data Layer** (`data/`) - `ModelBase` and the per-entity repositories built on it
//! - **Store** (`store/`) - Collections of BSON documents with a MongoDB-style query language
//! - **Model Layer** (`model/`) - Entity declarations and domain types
//! - **Error Layer** (`error/`) - Application error types and the error envelope
//! - **Middleware** (`middleware/`) - Request start/end logging
//!
//! # Infrastructure
//!
//! - **Configuration** (`config`) - Environment-based application configuration
//! - **State** (`state`) - Shared application state (the document store handle)
//! - **Startup** (`startup`) - Tracing, database connection and shutdown signals
//! - **Router** (`router`) - Route mounting, CORS and the OpenAPI document
//! - **Wrapper** (`wrapper`) - Handler output to response envelope
//!
//! # Request Flow
//!
//! 1. **Middleware** logs the request start
//! 2. **Router** dispatches to the handler mounted for the path
//! 3. **Controller** extracts parameters and calls the service
//! 4. **Service** validates and calls the repository
//! 5. **Data** runs `ModelBase` operations against the store, logging each one
//! 6. **Wrapper** turns the handler's reply or fault into the envelope
//! 7. **Middleware** logs the request end with status and duration

pub mod config;
pub mod controller;
pub mod data;
pub mod error;
pub mod middleware;
pub mod model;
pub mod router;
pub mod service;
pub mod startup;
pub mod state;
pub mod store;
pub mod util;
pub mod wrapper;
