//! History HTTP handlers.
//!
//! - GET /api/history/ - Raw entries, newest first
//! - GET /api/history/details/ - Entries with site code and key description
//! - PUT /api/history/{history_id} - Partial update
//! - DELETE /api/history/{history_id} - Delete an entry

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    db::DbPool,
    error::AppError,
    filter::filter,
    models::history::{HistoryEntry, HistoryQuery, HistoryRecord, UpdateHistoryRequest},
    services::history_service,
};

/// List history entries, optionally only those of one site.
///
/// # Query Parameters
///
/// - `site_code` - restrict to keys of this site
pub async fn list_history(
    State(pool): State<DbPool>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<HistoryEntry>>, AppError> {
    let entries = history_service::list_history(&pool, query.site_code()).await?;

    Ok(Json(entries))
}

/// List history entries joined with their key.
///
/// # Query Parameters
///
/// - `site_code` - restrict to keys of this site
/// - `q`, `mode` - text filter over site code, description, recipient and memo
///
/// # Response
///
/// ```json
/// [
///   {
///     "history_id": 5,
///     "key_id": 1,
///     "issued_to": "J. Smith",
///     "issued_at": "2025-03-09T10:15:00",
///     "returned_at": null,
///     "memo": null,
///     "site_code": "A1",
///     "description": "Front door"
///   }
/// ]
/// ```
///
/// Entries whose key no longer exists carry `"unknown site"` and
/// `"unknown key"`.
pub async fn list_history_details(
    State(pool): State<DbPool>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<HistoryRecord>>, AppError> {
    let records =
        history_service::list_history_records(&pool, query.site_code()).await?;

    Ok(Json(filter(records, query.filter.query(), query.filter.mode)))
}

/// Update the fields present in the body.
pub async fn update_history(
    State(pool): State<DbPool>,
    Path(history_id): Path<i32>,
    Json(request): Json<UpdateHistoryRequest>,
) -> Result<Json<HistoryEntry>, AppError> {
    let entry = history_service::update_history(&pool, history_id, request).await?;

    Ok(Json(entry))
}

/// Delete a history entry.
///
/// Returns 204 No Content, or 404 if the entry does not exist.
pub async fn delete_history(
    State(pool): State<DbPool>,
    Path(history_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    history_service::delete_history(&pool, history_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
