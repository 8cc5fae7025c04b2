use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// One page of tasks as returned by the list endpoint.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct TaskPageDto {
    #[schema(value_type = Vec<Object>)]
    pub items: Vec<Value>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

/// Outcome of an update request.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq, Eq)]
pub struct UpdateCountDto {
    pub matched: u64,
    pub modified: u64,
}

/// Outcome of a delete request.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq, Eq)]
pub struct DeleteCountDto {
    pub deleted: u64,
}
