//! Key management HTTP handlers.
//!
//! This module implements the key-related API endpoints:
//! - GET /api/keys/ - List keys (optionally by site and filtered)
//! - POST /api/keys/ - Create a key
//! - GET /api/keys/{key_id} - Get one key
//! - PUT /api/keys/{key_id} - Replace a key's fields
//! - DELETE /api/keys/{key_id} - Delete a key
//! - POST /api/keys/issue/ - Check out a key of a site
//! - POST /api/keys/return/ - Check a key of a site back in

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    db::DbPool,
    error::AppError,
    filter::filter,
    models::{
        history::HistoryEntry,
        key::{IssueKeyRequest, Key, KeyListQuery, KeyRequest, ReturnKeyRequest},
    },
    services::key_service,
};

/// List keys.
///
/// # Query Parameters
///
/// - `site_code` - only keys of this site (ordered by id)
/// - `q`, `mode` - text filter over site code, description and memo
///
/// Without `site_code`, keys are ordered by site code, then id.
pub async fn list_keys(
    State(pool): State<DbPool>,
    Query(query): Query<KeyListQuery>,
) -> Result<Json<Vec<Key>>, AppError> {
    let keys = key_service::list_keys(&pool, query.site_code()).await?;

    Ok(Json(filter(keys, query.filter.query(), query.filter.mode)))
}

/// Create a key for an existing site.
///
/// # Response
///
/// - **Success (201 Created)**: the stored key, `is_issued = false`
/// - **Error (400)**: invalid counts or empty description
/// - **Error (404)**: site does not exist
pub async fn create_key(
    State(pool): State<DbPool>,
    Json(request): Json<KeyRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate().map_err(AppError::InvalidRequest)?;
    key_service::ensure_site_exists(&pool, &request.site_code).await?;

    let key = sqlx::query_as::<_, Key>(
        r#"
        INSERT INTO keys (site_code, description, key_count, set_count, memo)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING key_id, site_code, description, key_count, set_count, is_issued, memo
        "#,
    )
    .bind(&request.site_code)
    .bind(&request.description)
    .bind(request.key_count)
    .bind(request.set_count)
    .bind(&request.memo)
    .fetch_one(&pool)
    .await?;

    tracing::info!("Created key {} for site {}", key.key_id, key.site_code);

    Ok((StatusCode::CREATED, Json(key)))
}

/// Get a key by id.
pub async fn get_key(
    State(pool): State<DbPool>,
    Path(key_id): Path<i32>,
) -> Result<Json<Key>, AppError> {
    let key = key_service::get_key(&pool, key_id)
        .await?
        .ok_or(AppError::KeyNotFound(key_id))?;

    Ok(Json(key))
}

/// Replace a key's site, description, counts and memo.
///
/// The issued flag is not touched; it only changes through issue/return.
pub async fn update_key(
    State(pool): State<DbPool>,
    Path(key_id): Path<i32>,
    Json(request): Json<KeyRequest>,
) -> Result<Json<Key>, AppError> {
    request.validate().map_err(AppError::InvalidRequest)?;

    if key_service::get_key(&pool, key_id).await?.is_none() {
        return Err(AppError::KeyNotFound(key_id));
    }
    key_service::ensure_site_exists(&pool, &request.site_code).await?;

    let key = sqlx::query_as::<_, Key>(
        r#"
        UPDATE keys
        SET site_code = $1, description = $2, key_count = $3, set_count = $4, memo = $5
        WHERE key_id = $6
        RETURNING key_id, site_code, description, key_count, set_count, is_issued, memo
        "#,
    )
    .bind(&request.site_code)
    .bind(&request.description)
    .bind(request.key_count)
    .bind(request.set_count)
    .bind(&request.memo)
    .bind(key_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::KeyNotFound(key_id))?;

    Ok(Json(key))
}

/// Delete a key.
///
/// # Response
///
/// - **Success (204 No Content)**
/// - **Error (404)**: no such key
/// - **Error (409)**: history entries still reference the key
pub async fn delete_key(
    State(pool): State<DbPool>,
    Path(key_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("DELETE FROM keys WHERE key_id = $1")
        .bind(key_id)
        .execute(&pool)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => AppError::Conflict(format!(
                "Key with ID {} has history entries; delete them first",
                key_id
            )),
            other => other,
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::KeyNotFound(key_id));
    }

    tracing::info!("Deleted key {}", key_id);

    Ok(StatusCode::NO_CONTENT)
}

/// Issue the first available key of a site.
///
/// # Request Body
///
/// ```json
/// {
///   "site_code": "A1",
///   "issued_to": "J. Smith",
///   "issued_at": "2025-03-09T10:15"
/// }
/// ```
///
/// # Response
///
/// - **Success (200 OK)**: the opened history entry
/// - **Error (404)**: the site has no key that is not already issued
pub async fn issue_key(
    State(pool): State<DbPool>,
    Json(request): Json<IssueKeyRequest>,
) -> Result<Json<HistoryEntry>, AppError> {
    if request.issued_to.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "Recipient (issued_to) is required".to_string(),
        ));
    }

    let entry = key_service::issue_key(&pool, request).await?;

    Ok(Json(entry))
}

/// Return the first issued key of a site.
///
/// # Response
///
/// - **Success (200 OK)**: the closed history entry
/// - **Error (404)**: no key of the site is issued
pub async fn return_key(
    State(pool): State<DbPool>,
    Json(request): Json<ReturnKeyRequest>,
) -> Result<Json<HistoryEntry>, AppError> {
    let entry = key_service::return_key(&pool, request).await?;

    Ok(Json(entry))
}
