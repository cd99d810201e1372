//! History service - listing, enriching and editing history entries.

use crate::{
    db::DbPool,
    enrich::enrich_history,
    error::AppError,
    models::history::{HistoryEntry, HistoryRecord, UpdateHistoryRequest},
    services::key_service,
};

const HISTORY_COLUMNS: &str = "h.history_id, h.key_id, h.issued_to, h.issued_at, h.returned_at, h.memo";

/// History entries, newest first, optionally limited to one site.
pub async fn list_history(
    pool: &DbPool,
    site_code: Option<&str>,
) -> Result<Vec<HistoryEntry>, AppError> {
    let entries = match site_code {
        Some(code) => {
            sqlx::query_as::<_, HistoryEntry>(&format!(
                r#"
                SELECT {HISTORY_COLUMNS}
                FROM history h
                JOIN keys k ON k.key_id = h.key_id
                WHERE k.site_code = $1
                ORDER BY h.issued_at DESC NULLS LAST, h.history_id DESC
                "#
            ))
            .bind(code)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, HistoryEntry>(&format!(
                r#"
                SELECT {HISTORY_COLUMNS}
                FROM history h
                ORDER BY h.issued_at DESC NULLS LAST, h.history_id DESC
                "#
            ))
            .fetch_all(pool)
            .await?
        }
    };

    Ok(entries)
}

/// History entries joined with the site code and description of their key.
///
/// The two lists are read one after the other outside a transaction; a key
/// deleted in between shows up as "unknown".
pub async fn list_history_records(
    pool: &DbPool,
    site_code: Option<&str>,
) -> Result<Vec<HistoryRecord>, AppError> {
    let entries = list_history(pool, site_code).await?;
    let keys = key_service::list_keys(pool, None).await?;

    Ok(enrich_history(entries, &keys))
}

/// Apply a partial update to one entry.
///
/// # Errors
///
/// - `HistoryNotFound`: no entry with this id
pub async fn update_history(
    pool: &DbPool,
    history_id: i32,
    request: UpdateHistoryRequest,
) -> Result<HistoryEntry, AppError> {
    let mut tx = pool.begin().await?;

    let mut entry = sqlx::query_as::<_, HistoryEntry>(
        r#"
        SELECT history_id, key_id, issued_to, issued_at, returned_at, memo
        FROM history
        WHERE history_id = $1
        FOR UPDATE
        "#,
    )
    .bind(history_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::HistoryNotFound(history_id))?;

    request.apply_to(&mut entry);

    let entry = sqlx::query_as::<_, HistoryEntry>(
        r#"
        UPDATE history
        SET issued_to = $1, issued_at = $2, returned_at = $3, memo = $4
        WHERE history_id = $5
        RETURNING history_id, key_id, issued_to, issued_at, returned_at, memo
        "#,
    )
    .bind(&entry.issued_to)
    .bind(entry.issued_at)
    .bind(entry.returned_at)
    .bind(&entry.memo)
    .bind(history_id)
    .fetch_one(&mut *tx)
    .await?;

    sync_issued_flag(&mut tx, entry.key_id).await?;
    tx.commit().await?;

    Ok(entry)
}

/// Delete one entry.
pub async fn delete_history(pool: &DbPool, history_id: i32) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    let key_id: i32 =
        sqlx::query_scalar("DELETE FROM history WHERE history_id = $1 RETURNING key_id")
            .bind(history_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::HistoryNotFound(history_id))?;

    sync_issued_flag(&mut tx, key_id).await?;
    tx.commit().await?;

    Ok(())
}

/// Recompute `keys.is_issued` from the key's open history entries.
///
/// Editing or deleting entries by hand can open or close a cycle; the flag
/// must follow so issue/return keep picking the right key.
async fn sync_issued_flag(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    key_id: i32,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE keys
        SET is_issued = EXISTS(
            SELECT 1 FROM history WHERE key_id = $1 AND returned_at IS NULL
        )
        WHERE key_id = $1
        "#,
    )
    .bind(key_id)
    .execute(&mut **tx)
    .await?;

    Ok(())
}
