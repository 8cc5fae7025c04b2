use axum::Json;

/// Liveness check at `/`.
///
/// # Returns
/// - `200 OK` - The JSON string `"Backend Server is Up"`
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Server is running", body = String)
    ),
)]
pub async fn home() -> Json<&'static str> {
    Json("Backend Server is Up")
}
