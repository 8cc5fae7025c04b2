use axum::{
    extract::State,
    routing::{get, post},
};
use bson::Bson;
use serde_json::{json, Value};

use crate::{
    model::{
        api::Envelope,
        task::{DeleteCountDto, TaskPageDto, UpdateCountDto},
    },
    server::{
        error::{param::ParamError, AppError},
        model::task::TaskFields,
        service::task::TaskService,
        state::AppState,
        util::{
            convert::{document_from_transport, document_to_transport, from_transport, to_transport},
            param::{coerce, Params},
            route::RouteSet,
        },
        wrapper::{HandlerResult, Reply},
    },
};

/// Tag for grouping task endpoints in OpenAPI documentation
pub static TASK_TAG: &str = "task";

const DEFAULT_PAGE_SIZE: u64 = 10;

/// Task routes, mounted under `/api/task`.
pub fn routes() -> RouteSet {
    RouteSet::new("task.api")
        .route("/insert", post(insert))
        .route("/import", post(import))
        .route("/get", get(get_task))
        .route("/list", get(list))
        .route("/update", post(update))
        .route("/save", post(save))
        .route("/complete", post(complete))
        .route("/delete", post(delete))
        .route("/count", get(count))
        .route("/names", get(names))
        .route("/stats", get(stats))
}

/// Reads the writable task fields from the request body.
fn body_fields(params: &Params) -> Result<TaskFields, AppError> {
    let map = params
        .body_object()
        .ok_or_else(|| AppError::BadRequest("Request body must be a JSON object".to_string()))?;

    Ok(TaskFields::writable(document_from_transport(map)))
}

/// Reads the required `id` parameter as an `_id` condition.
fn task_id(params: &Params) -> Result<Bson, ParamError> {
    params
        .get_as("id", None, coerce::identifier)?
        .ok_or_else(|| ParamError::Missing("id".to_string()))
}

/// Create a task.
///
/// Stores the body fields as a new task numbered from the task counter. Keys
/// starting with `_`, `id` and bookkeeping fields are ignored.
///
/// # Arguments
/// - `state` - Application state containing the document store
/// - `params` - Request parameters; the body holds the task fields
///
/// # Returns
/// - Success envelope with the stored task
/// - Error envelope if the body is not an object or the store fails
#[utoipa::path(
    post,
    path = "/api/task/insert",
    tag = TASK_TAG,
    responses(
        (status = 200, description = "Stored task", body = Envelope),
        (status = 500, description = "Invalid body or store failure", body = Envelope)
    ),
)]
pub async fn insert(State(state): State<AppState>, params: Params) -> HandlerResult {
    let service = TaskService::new(&state.store);

    let fields = body_fields(&params)?;

    let task = service.create(fields).await?;

    Ok(Reply::Data(Value::Object(document_to_transport(&task))))
}

/// Create several tasks.
///
/// Body: `{"items": [{...}, ...], "ordered": true}`. With `ordered` the batch
/// stops at the first failure; otherwise every item is attempted.
///
/// # Returns
/// - Success envelope with the ids of the inserted tasks
/// - Error envelope naming the failed items
#[utoipa::path(
    post,
    path = "/api/task/import",
    tag = TASK_TAG,
    responses(
        (status = 200, description = "Inserted task ids", body = Envelope),
        (status = 500, description = "Invalid items or insert failure", body = Envelope)
    ),
)]
pub async fn import(State(state): State<AppState>, params: Params) -> HandlerResult {
    let service = TaskService::new(&state.store);

    let items = match params.get("items", None)? {
        Value::Array(items) => items,
        _ => return Err(AppError::BadRequest("items must be an array".to_string()).into()),
    };
    let ordered = params
        .get_as("ordered", Some(json!(true)), coerce::boolean)?
        .unwrap_or(true);

    let items = items
        .iter()
        .map(|item| match item {
            Value::Object(map) => Ok(TaskFields::writable(document_from_transport(map))),
            _ => Err(AppError::BadRequest("items must be objects".to_string())),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let result = service.import(items, ordered).await?;

    let ids: Vec<Value> = result.inserted_ids.iter().map(to_transport).collect();
    Ok(Reply::Data(json!({ "inserted_ids": ids })))
}

/// Get a live task by id.
///
/// # Arguments
/// - `state` - Application state containing the document store
/// - `params` - Query parameters; `id` is required
///
/// # Returns
/// - Success envelope with the task, or `null` data when no live task matches
/// - Error envelope `Missing required parameter: id` without `id`
#[utoipa::path(
    get,
    path = "/api/task/get",
    tag = TASK_TAG,
    params(
        ("id" = String, Query, description = "Task id")
    ),
    responses(
        (status = 200, description = "Task or null", body = Envelope),
        (status = 500, description = "Missing id or store failure", body = Envelope)
    ),
)]
pub async fn get_task(State(state): State<AppState>, params: Params) -> HandlerResult {
    let service = TaskService::new(&state.store);

    let id = task_id(&params)?;

    let task = service.get_by_id(id).await?;

    Ok(Reply::Data(task.map_or(Value::Null, |task| {
        Value::Object(document_to_transport(&task))
    })))
}

/// Get one page of tasks, newest first.
///
/// # Arguments
/// - `params` - `page` (zero-based, default 0), `page_size` (default 10) and
///   `include_deleted` (default false)
///
/// # Returns
/// - Success envelope with the page and the total across all pages
#[utoipa::path(
    get,
    path = "/api/task/list",
    tag = TASK_TAG,
    params(
        ("page" = Option<u64>, Query, description = "Zero-based page index"),
        ("page_size" = Option<u64>, Query, description = "Tasks per page"),
        ("include_deleted" = Option<bool>, Query, description = "List soft-deleted tasks too")
    ),
    responses(
        (status = 200, description = "Page of tasks", body = TaskPageDto),
        (status = 500, description = "Invalid paging or store failure", body = Envelope)
    ),
)]
pub async fn list(State(state): State<AppState>, params: Params) -> HandlerResult {
    let service = TaskService::new(&state.store);

    let page = params
        .get_as("page", Some(json!(0)), coerce::integer)?
        .unwrap_or(0);
    let page_size = params
        .get_as("page_size", Some(json!(DEFAULT_PAGE_SIZE)), coerce::integer)?
        .unwrap_or(DEFAULT_PAGE_SIZE as i64);
    let include_deleted = params
        .get_as("include_deleted", Some(json!(false)), coerce::boolean)?
        .unwrap_or(false);

    let page = service
        .get_paginated(page.max(0) as u64, page_size.max(0) as u64, include_deleted)
        .await?;

    Reply::data(&page.into_dto())
}

/// Set fields of a live task.
///
/// Body: `{"id": .., ...fields}`; `update_time` is stamped when a field
/// actually changed.
///
/// # Returns
/// - Success envelope with matched and modified counts
/// - Error envelope without `id` or fields
#[utoipa::path(
    post,
    path = "/api/task/update",
    tag = TASK_TAG,
    responses(
        (status = 200, description = "Update counts", body = UpdateCountDto),
        (status = 500, description = "Missing id, no fields or store failure", body = Envelope)
    ),
)]
pub async fn update(State(state): State<AppState>, params: Params) -> HandlerResult {
    let service = TaskService::new(&state.store);

    let id = task_id(&params)?;
    let fields = body_fields(&params)?;

    let result = service.update(id, fields).await?;

    Reply::data(&UpdateCountDto {
        matched: result.matched_count,
        modified: result.modified_count,
    })
}

/// Set fields of a task under a caller-chosen id, creating it when missing.
///
/// Unlike `update`, the id is taken literally and soft-deleted tasks are
/// matched too.
#[utoipa::path(
    post,
    path = "/api/task/save",
    tag = TASK_TAG,
    responses(
        (status = 200, description = "Update counts and the created id", body = Envelope),
        (status = 500, description = "Missing id, no fields or store failure", body = Envelope)
    ),
)]
pub async fn save(State(state): State<AppState>, params: Params) -> HandlerResult {
    let service = TaskService::new(&state.store);

    let id = match params.get("id", None)? {
        Value::Null => return Err(ParamError::Missing("id".to_string()).into()),
        id => from_transport(&id),
    };
    let fields = body_fields(&params)?;

    let result = service.save(id, fields).await?;

    let envelope = Envelope::success(json!({
        "matched": result.matched_count,
        "modified": result.modified_count,
    }))
    .with_extra(
        "upserted_id",
        result.upserted_id.as_ref().map_or(Value::Null, to_transport),
    );
    Ok(Reply::Envelope(envelope))
}

/// Mark open tasks as done one at a time.
///
/// Body: `{"limit": n}`; without a positive limit every open task is completed.
///
/// # Returns
/// - Success envelope with the number and ids of completed tasks
#[utoipa::path(
    post,
    path = "/api/task/complete",
    tag = TASK_TAG,
    responses(
        (status = 200, description = "Completed task ids", body = Envelope),
        (status = 500, description = "Store failure", body = Envelope)
    ),
)]
pub async fn complete(State(state): State<AppState>, params: Params) -> HandlerResult {
    let service = TaskService::new(&state.store);

    let limit = params
        .get_as("limit", Some(json!(-1)), coerce::integer)?
        .unwrap_or(-1);

    let outcome = service.complete_open(limit).await?;

    let ids: Vec<Value> = outcome.modified_ids.iter().map(to_transport).collect();
    Ok(Reply::Data(json!({ "modified": outcome.modified_count, "ids": ids })))
}

/// Delete a task, softly unless `real_delete` is set.
///
/// # Returns
/// - Success envelope with the number of deleted tasks
/// - Error envelope without `id`
#[utoipa::path(
    post,
    path = "/api/task/delete",
    tag = TASK_TAG,
    responses(
        (status = 200, description = "Delete count", body = DeleteCountDto),
        (status = 500, description = "Missing id or store failure", body = Envelope)
    ),
)]
pub async fn delete(State(state): State<AppState>, params: Params) -> HandlerResult {
    let service = TaskService::new(&state.store);

    let id = task_id(&params)?;
    let real_delete = params
        .get_as("real_delete", Some(json!(false)), coerce::boolean)?
        .unwrap_or(false);

    let deleted = service.delete(id, real_delete).await?;

    Reply::data(&DeleteCountDto { deleted })
}

/// Number of live tasks.
#[utoipa::path(
    get,
    path = "/api/task/count",
    tag = TASK_TAG,
    responses(
        (status = 200, description = "Live task count", body = Envelope),
        (status = 500, description = "Store failure", body = Envelope)
    ),
)]
pub async fn count(State(state): State<AppState>) -> HandlerResult {
    let service = TaskService::new(&state.store);

    let count = service.count().await?;

    Ok(Reply::Data(json!(count)))
}

/// Distinct names of live tasks.
#[utoipa::path(
    get,
    path = "/api/task/names",
    tag = TASK_TAG,
    responses(
        (status = 200, description = "Distinct names", body = Envelope),
        (status = 500, description = "Store failure", body = Envelope)
    ),
)]
pub async fn names(State(state): State<AppState>) -> HandlerResult {
    let service = TaskService::new(&state.store);

    let names = service.names().await?;

    Ok(Reply::Data(Value::Array(names.iter().map(to_transport).collect())))
}

/// Live tasks grouped by `done` with count and summed points.
#[utoipa::path(
    get,
    path = "/api/task/stats",
    tag = TASK_TAG,
    responses(
        (status = 200, description = "One entry per done value", body = Envelope),
        (status = 500, description = "Store failure", body = Envelope)
    ),
)]
pub async fn stats(State(state): State<AppState>) -> HandlerResult {
    let service = TaskService::new(&state.store);

    let stats = service.stats().await?;

    Ok(Reply::Data(Value::Array(
        stats
            .iter()
            .map(|group| Value::Object(document_to_transport(group)))
            .collect(),
    )))
}
