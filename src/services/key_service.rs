//! Key service - issuing and returning keys.
//!
//! This service handles:
//! - Picking which key of a site is issued or returned
//! - Keeping `keys.is_issued` and the open history entry in step
//! - Database transaction management
//!
//! # Atomicity Guarantees
//!
//! The key flag and the history row are written in one PostgreSQL
//! transaction. The chosen key row is locked with `FOR UPDATE`, so two
//! concurrent issues for the same site never pick the same key.

use chrono::Utc;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        history::HistoryEntry,
        key::{IssueKeyRequest, Key, ReturnKeyRequest},
    },
};

const KEY_COLUMNS: &str = "key_id, site_code, description, key_count, set_count, is_issued, memo";

/// All keys, or the keys of one site.
///
/// Ordered by (site_code, key_id), or by key_id within a site.
pub async fn list_keys(pool: &DbPool, site_code: Option<&str>) -> Result<Vec<Key>, AppError> {
    let keys = match site_code {
        Some(code) => {
            sqlx::query_as::<_, Key>(&format!(
                "SELECT {KEY_COLUMNS} FROM keys WHERE site_code = $1 ORDER BY key_id"
            ))
            .bind(code)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, Key>(&format!(
                "SELECT {KEY_COLUMNS} FROM keys ORDER BY site_code, key_id"
            ))
            .fetch_all(pool)
            .await?
        }
    };

    Ok(keys)
}

/// Get key by ID.
pub async fn get_key(pool: &DbPool, key_id: i32) -> Result<Option<Key>, AppError> {
    let key = sqlx::query_as::<_, Key>(&format!("SELECT {KEY_COLUMNS} FROM keys WHERE key_id = $1"))
        .bind(key_id)
        .fetch_optional(pool)
        .await?;

    Ok(key)
}

/// Fail with `SiteNotFound` unless a site with this code exists.
pub async fn ensure_site_exists(pool: &DbPool, site_code: &str) -> Result<(), AppError> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM sites WHERE site_code = $1)")
            .bind(site_code)
            .fetch_one(pool)
            .await?;

    if !exists {
        return Err(AppError::SiteNotFound(site_code.to_string()));
    }

    Ok(())
}

/// Issue the first available key of a site.
///
/// # Process
///
/// 1. Start database transaction
/// 2. Lock the lowest-id key of the site that is not issued
/// 3. Flag it as issued
/// 4. Open a history entry (`issued_at` defaults to now)
/// 5. Commit
///
/// # Errors
///
/// - `NoAvailableKey`: every key of the site is out, or it has none
/// - `Database`: Database error occurred
pub async fn issue_key(pool: &DbPool, request: IssueKeyRequest) -> Result<HistoryEntry, AppError> {
    let issued_at = request
        .issued_at
        .unwrap_or_else(|| Utc::now().naive_utc());

    let mut tx = pool.begin().await?;

    let key_id: i32 = sqlx::query_scalar(
        r#"
        SELECT key_id FROM keys
        WHERE site_code = $1 AND is_issued = false
        ORDER BY key_id
        LIMIT 1
        FOR UPDATE
        "#,
    )
    .bind(&request.site_code)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NoAvailableKey(request.site_code.clone()))?;

    sqlx::query("UPDATE keys SET is_issued = true WHERE key_id = $1")
        .bind(key_id)
        .execute(&mut *tx)
        .await?;

    let entry = sqlx::query_as::<_, HistoryEntry>(
        r#"
        INSERT INTO history (key_id, issued_to, issued_at)
        VALUES ($1, $2, $3)
        RETURNING history_id, key_id, issued_to, issued_at, returned_at, memo
        "#,
    )
    .bind(key_id)
    .bind(request.issued_to.trim())
    .bind(issued_at)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        "Issued key {} of site {} to {}",
        key_id,
        request.site_code,
        request.issued_to
    );

    Ok(entry)
}

/// Return the first issued key of a site.
///
/// # Process
///
/// 1. Start database transaction
/// 2. Lock the lowest-id issued key of the site
/// 3. Close its most recent open history entry; a non-empty `memo`
///    replaces the entry's memo. If no open entry exists, record a
///    closed entry so the return is not lost.
/// 4. Clear the issued flag
/// 5. Commit
///
/// # Errors
///
/// - `NoIssuedKey`: no key of the site is out
/// - `Database`: Database error occurred
pub async fn return_key(
    pool: &DbPool,
    request: ReturnKeyRequest,
) -> Result<HistoryEntry, AppError> {
    let returned_at = request
        .returned_at
        .unwrap_or_else(|| Utc::now().naive_utc());
    let memo = request.memo.filter(|m| !m.trim().is_empty());

    let mut tx = pool.begin().await?;

    let key_id: i32 = sqlx::query_scalar(
        r#"
        SELECT key_id FROM keys
        WHERE site_code = $1 AND is_issued = true
        ORDER BY key_id
        LIMIT 1
        FOR UPDATE
        "#,
    )
    .bind(&request.site_code)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NoIssuedKey(request.site_code.clone()))?;

    let open_entry: Option<i32> = sqlx::query_scalar(
        r#"
        SELECT history_id FROM history
        WHERE key_id = $1 AND returned_at IS NULL
        ORDER BY issued_at DESC NULLS LAST, history_id DESC
        LIMIT 1
        FOR UPDATE
        "#,
    )
    .bind(key_id)
    .fetch_optional(&mut *tx)
    .await?;

    let entry = match open_entry {
        Some(history_id) => {
            sqlx::query_as::<_, HistoryEntry>(
                r#"
                UPDATE history
                SET returned_at = $1, memo = COALESCE($2, memo)
                WHERE history_id = $3
                RETURNING history_id, key_id, issued_to, issued_at, returned_at, memo
                "#,
            )
            .bind(returned_at)
            .bind(&memo)
            .bind(history_id)
            .fetch_one(&mut *tx)
            .await?
        }
        None => {
            tracing::warn!(
                "Key {} was flagged as issued without an open history entry",
                key_id
            );
            sqlx::query_as::<_, HistoryEntry>(
                r#"
                INSERT INTO history (key_id, issued_at, returned_at, memo)
                VALUES ($1, NULL, $2, $3)
                RETURNING history_id, key_id, issued_to, issued_at, returned_at, memo
                "#,
            )
            .bind(key_id)
            .bind(returned_at)
            .bind(&memo)
            .fetch_one(&mut *tx)
            .await?
        }
    };

    sqlx::query("UPDATE keys SET is_issued = false WHERE key_id = $1")
        .bind(key_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!("Returned key {} of site {}", key_id, request.site_code);

    Ok(entry)
}
