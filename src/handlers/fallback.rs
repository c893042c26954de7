use axum::{extract::OriginalUri, http::StatusCode, Json};
use tracing::debug;

use crate::models::ErrorResponse;

/// Any route we do not serve
pub async fn not_found(OriginalUri(uri): OriginalUri) -> (StatusCode, Json<ErrorResponse>) {
    debug!("No route for {}", uri);
    let status = StatusCode::NOT_FOUND;
    (status, Json(ErrorResponse {
        code: status.as_u16(),
        status: status.to_string(),
        error: format!("No route for {}", uri.path()),
    }))
}
