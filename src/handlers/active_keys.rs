//! Dashboard of keys that are currently out.

use axum::{
    Json,
    extract::{Query, State},
};

use crate::{
    db::DbPool,
    error::AppError,
    filter::filter,
    models::{ListQuery, active_key::ActiveKey},
};

/// List issued keys with the recipient from their latest history entry.
///
/// # Endpoint
///
/// `GET /api/active-keys/`
///
/// # Ordering
///
/// By site code, then key id.
///
/// # Query Parameters
///
/// - `q`, `mode` - text filter over site code, description and recipient
pub async fn list_active_keys(
    State(pool): State<DbPool>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ActiveKey>>, AppError> {
    // Latest entry per key = highest history_id
    let keys = sqlx::query_as::<_, ActiveKey>(
        r#"
        SELECT k.site_code, k.description AS key_description, h.issued_to, h.issued_at
        FROM keys k
        LEFT JOIN LATERAL (
            SELECT issued_to, issued_at
            FROM history
            WHERE history.key_id = k.key_id
            ORDER BY history_id DESC
            LIMIT 1
        ) h ON true
        WHERE k.is_issued = true
        ORDER BY k.site_code, k.key_id
        "#,
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(filter(keys, query.query(), query.mode)))
}
