//! Backup service - export, restore and wipe of the whole dataset.
//!
//! # Atomicity Guarantees
//!
//! Restore and clear each run in a single transaction: a restore that
//! fails halfway leaves the previous data in place.

use std::collections::HashMap;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        backup::{BackupDocument, RestoreSummary},
        history::HistoryEntry,
        key::Key,
        site::Site,
    },
};

/// Read all three tables into a backup document.
pub async fn export(pool: &DbPool) -> Result<BackupDocument, AppError> {
    let sites = sqlx::query_as::<_, Site>(
        "SELECT site_id, site_code, address, memo FROM sites ORDER BY site_id",
    )
    .fetch_all(pool)
    .await?;

    let keys = sqlx::query_as::<_, Key>(
        r#"
        SELECT key_id, site_code, description, key_count, set_count, is_issued, memo
        FROM keys
        ORDER BY key_id
        "#,
    )
    .fetch_all(pool)
    .await?;

    let history = sqlx::query_as::<_, HistoryEntry>(
        r#"
        SELECT history_id, key_id, issued_to, issued_at, returned_at, memo
        FROM history
        ORDER BY history_id
        "#,
    )
    .fetch_all(pool)
    .await?;

    tracing::info!(
        "Exported backup: {} sites, {} keys, {} history entries",
        sites.len(),
        keys.len(),
        history.len()
    );

    Ok(BackupDocument::new(sites, keys, history))
}

/// Replace all data with the contents of `document`.
///
/// # Process
///
/// 1. Drop rows whose parent is missing from the document
/// 2. Start database transaction and delete history, keys, sites
/// 3. Insert sites
/// 4. Insert keys, remembering old id -> new id
/// 5. Insert history against the new key ids
/// 6. Commit
pub async fn restore(pool: &DbPool, document: BackupDocument) -> Result<RestoreSummary, AppError> {
    let plan = document.plan();

    let mut tx = pool.begin().await?;
    delete_all(&mut tx).await?;

    for site in &plan.sites {
        sqlx::query("INSERT INTO sites (site_code, address, memo) VALUES ($1, $2, $3)")
            .bind(&site.site_code)
            .bind(&site.address)
            .bind(&site.memo)
            .execute(&mut *tx)
            .await?;
    }

    let mut key_ids: HashMap<i32, i32> = HashMap::with_capacity(plan.keys.len());
    for key in &plan.keys {
        let new_id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO keys (site_code, description, key_count, set_count, is_issued, memo)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING key_id
            "#,
        )
        .bind(&key.site_code)
        .bind(&key.description)
        .bind(key.key_count)
        .bind(key.set_count)
        .bind(key.is_issued)
        .bind(&key.memo)
        .fetch_one(&mut *tx)
        .await?;
        key_ids.insert(key.key_id, new_id);
    }

    for entry in &plan.history {
        // plan() only keeps entries whose key survived
        let Some(&key_id) = key_ids.get(&entry.key_id) else {
            continue;
        };
        sqlx::query(
            r#"
            INSERT INTO history (key_id, issued_to, issued_at, returned_at, memo)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(key_id)
        .bind(&entry.issued_to)
        .bind(entry.issued_at)
        .bind(entry.returned_at)
        .bind(&entry.memo)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    let summary = RestoreSummary {
        message: "Data restored successfully".to_string(),
        sites: plan.sites.len(),
        keys: plan.keys.len(),
        history: plan.history.len(),
        skipped_keys: plan.skipped_keys,
        skipped_history: plan.skipped_history,
    };

    tracing::info!(
        "Restored backup: {} sites, {} keys, {} history entries ({} keys, {} entries skipped)",
        summary.sites,
        summary.keys,
        summary.history,
        summary.skipped_keys,
        summary.skipped_history
    );

    Ok(summary)
}

/// Delete every history entry, key and site.
pub async fn clear(pool: &DbPool) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;
    delete_all(&mut tx).await?;
    tx.commit().await?;

    tracing::warn!("Database cleared");

    Ok(())
}

/// Delete in dependency order: history, keys, sites.
async fn delete_all(tx: &mut sqlx::Transaction<'_, sqlx::Postgres>) -> Result<(), AppError> {
    for table in ["history", "keys", "sites"] {
        sqlx::query(&format!("DELETE FROM {table}"))
            .execute(&mut **tx)
            .await?;
    }

    Ok(())
}
