//! Mounting of per-entity route sets under derived URL prefixes.

use axum::{routing::MethodRouter, Router};

use crate::server::state::AppState;

/// Prefix every mounted route set lives under.
pub const API_PREFIX: &str = "/api";

/// Converts a dotted module path into its route.
///
/// A trailing `api` segment is dropped and a trailing `api_<name>` segment is
/// replaced by `<name>`; every `_` then separates path segments.
///
/// # Example
/// - `path1_path2.path3.api` -> `/path1/path2/path3`
/// - `api_x` -> `/x`
pub fn module_route(module_path: &str) -> String {
    let mut parts: Vec<&str> = module_path.split('.').collect();

    match parts.last().copied() {
        Some("api") => {
            parts.pop();
        }
        Some(last) => {
            if let Some(rest) = last.strip_prefix("api_") {
                parts.pop();
                parts.push(rest);
            }
        }
        None => {}
    }

    let segments: Vec<&str> = parts.iter().flat_map(|part| part.split('_')).collect();
    format!("/{}", segments.join("/"))
}

/// Handlers of one module, each under a path suffix.
pub struct RouteSet {
    module: &'static str,
    prefix: Option<&'static str>,
    router: Router<AppState>,
}

impl RouteSet {
    /// Starts an empty set for the module path `module`.
    pub fn new(module: &'static str) -> Self {
        Self {
            module,
            prefix: None,
            router: Router::new(),
        }
    }

    /// Mounts the set under `/api<prefix>` instead of the derived route.
    pub fn with_prefix(mut self, prefix: &'static str) -> Self {
        self.prefix = Some(prefix);
        self
    }

    pub fn route(mut self, suffix: &str, handler: MethodRouter<AppState>) -> Self {
        self.router = self.router.route(suffix, handler);
        self
    }

    /// Full URL prefix the set is mounted under.
    pub fn url_prefix(&self) -> String {
        match self.prefix {
            Some(prefix) if !prefix.is_empty() => format!("{}{}", API_PREFIX, prefix),
            _ => format!("{}{}", API_PREFIX, module_route(self.module)),
        }
    }

    /// Nests the set into `router` under its URL prefix.
    pub fn mount(self, router: Router<AppState>) -> Router<AppState> {
        let prefix = self.url_prefix();
        tracing::info!("Mounting {} at {}", self.module, prefix);
        router.nest(&prefix, self.router)
    }
}
