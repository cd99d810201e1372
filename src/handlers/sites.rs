//! Site management HTTP handlers.
//!
//! This module implements the site-related API endpoints:
//! - GET /api/sites/ - List sites (optionally filtered)
//! - POST /api/sites/ - Create a site
//! - GET /api/sites/{site_code} - Get one site
//! - PUT /api/sites/{site_code} - Update address and memo
//! - DELETE /api/sites/{site_code} - Delete a site

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
        ListQuery,
        site::{CreateSiteRequest, Site, UpdateSiteRequest},
    },
};

/// List all sites ordered by code.
///
/// # Query Parameters
///
/// - `q` - filter text (optional)
/// - `mode` - `substring` (default) or `regexp`
///
/// An invalid pattern in `regexp` mode returns every site.
pub async fn list_sites(
    State(pool): State<DbPool>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Site>>, AppError> {
    let sites = sqlx::query_as::<_, Site>(
        "SELECT site_id, site_code, address, memo FROM sites ORDER BY site_code",
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(filter(sites, query.query(), query.mode)))
}

/// Create a new site.
///
/// # Request Body
///
/// ```json
/// {
///   "site_code": "A1",
///   "address": "1 Main Street",
///   "memo": null
/// }
/// ```
///
/// # Response
///
/// - **Success (201 Created)**: the stored site
/// - **Error (400)**: empty code or address
/// - **Error (409)**: a site with this code already exists
pub async fn create_site(
    State(pool): State<DbPool>,
    Json(request): Json<CreateSiteRequest>,
) -> Result<impl IntoResponse, AppError> {
    if request.site_code.trim().is_empty() || request.address.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "Site code and address are required".to_string(),
        ));
    }

    let site = sqlx::query_as::<_, Site>(
        r#"
        INSERT INTO sites (site_code, address, memo)
        VALUES ($1, $2, $3)
        RETURNING site_id, site_code, address, memo
        "#,
    )
    .bind(request.site_code.trim())
    .bind(&request.address)
    .bind(&request.memo)
    .fetch_one(&pool)
    .await
    .map_err(|e| match AppError::from(e) {
        AppError::Conflict(_) => {
            AppError::Conflict(format!("Site '{}' already exists", request.site_code.trim()))
        }
        other => other,
    })?;

    tracing::info!("Created site {}", site.site_code);

    Ok((StatusCode::CREATED, Json(site)))
}

/// Get a site by its code.
pub async fn get_site(
    State(pool): State<DbPool>,
    Path(site_code): Path<String>,
) -> Result<Json<Site>, AppError> {
    let site = sqlx::query_as::<_, Site>(
        "SELECT site_id, site_code, address, memo FROM sites WHERE site_code = $1",
    )
    .bind(&site_code)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| AppError::SiteNotFound(site_code.clone()))?;

    Ok(Json(site))
}

/// Update the address and memo of a site.
///
/// The code in the path identifies the site and is never changed.
pub async fn update_site(
    State(pool): State<DbPool>,
    Path(site_code): Path<String>,
    Json(request): Json<UpdateSiteRequest>,
) -> Result<Json<Site>, AppError> {
    if request.address.trim().is_empty() {
        return Err(AppError::InvalidRequest("Address is required".to_string()));
    }

    let site = sqlx::query_as::<_, Site>(
        r#"
        UPDATE sites
        SET address = $1, memo = $2
        WHERE site_code = $3
        RETURNING site_id, site_code, address, memo
        "#,
    )
    .bind(&request.address)
    .bind(&request.memo)
    .bind(&site_code)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| AppError::SiteNotFound(site_code.clone()))?;

    Ok(Json(site))
}

/// Delete a site.
///
/// # Response
///
/// - **Success (204 No Content)**
/// - **Error (404)**: no such site
/// - **Error (409)**: keys still reference the site
pub async fn delete_site(
    State(pool): State<DbPool>,
    Path(site_code): Path<String>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("DELETE FROM sites WHERE site_code = $1")
        .bind(&site_code)
        .execute(&pool)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => AppError::Conflict(format!(
                "Site '{}' still has keys; delete them first",
                site_code
            )),
            other => other,
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::SiteNotFound(site_code));
    }

    tracing::info!("Deleted site {}", site_code);

    Ok(StatusCode::NO_CONTENT)
}
