use axum::{middleware, routing::get, Json, Router};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;

use crate::{
    model::{
        api::Envelope,
        task::{DeleteCountDto, TaskPageDto, UpdateCountDto},
    },
    server::{
        controller::{home, task},
        middleware::request_log::request_log,
        state::AppState,
        util::route::RouteSet,
    },
};

#[derive(OpenApi)]
#[openapi(
    paths(
        home::home,
        task::insert,
        task::import,
        task::get_task,
        task::list,
        task::update,
        task::save,
        task::complete,
        task::delete,
        task::count,
        task::names,
        task::stats,
    ),
    components(schemas(Envelope, TaskPageDto, UpdateCountDto, DeleteCountDto)),
    tags((name = "task", description = "Task documents"))
)]
pub struct ApiDoc;

/// Route sets mounted under `/api`.
fn route_sets() -> Vec<RouteSet> {
    vec![task::routes()]
}

pub fn router() -> Router<AppState> {
    let router = Router::new()
        .route("/", get(home::home))
        .route("/api/openapi.json", get(openapi));

    route_sets()
        .into_iter()
        .fold(router, |router, set| set.mount(router))
}

/// Builds the complete application: routes, request logging and CORS.
pub fn app(state: AppState) -> Router {
    router()
        .layer(middleware::from_fn(request_log))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
