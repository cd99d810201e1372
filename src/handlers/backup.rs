//! Backup, restore and clear HTTP handlers.
//!
//! - GET /api/backup/ - Download all data as YAML
//! - POST /api/backup/restore/ - Replace all data from an uploaded YAML file
//! - DELETE /api/backup/clear/ - Delete all data

use axum::{
    Json,
    extract::{Multipart, State},
    http::header,
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    db::DbPool,
    error::AppError,
    models::backup::{
        BACKUP_CONTENT_TYPE, BACKUP_FILENAME, BackupDocument, RestoreSummary,
        has_backup_extension,
    },
    services::backup_service,
};

/// Download a YAML backup.
///
/// # Response Headers
///
/// - `Content-Type: application/x-yaml`
/// - `Content-Disposition: attachment; filename="key_tracker_backup.yaml"`
pub async fn download_backup(State(pool): State<DbPool>) -> Result<impl IntoResponse, AppError> {
    let document = backup_service::export(&pool).await?;
    let yaml = document
        .to_yaml()
        .map_err(|e| AppError::InvalidBackup(format!("Error creating backup: {}", e)))?;

    Ok((
        [
            (header::CONTENT_TYPE, BACKUP_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", BACKUP_FILENAME),
            ),
        ],
        yaml,
    ))
}

/// Restore from an uploaded backup.
///
/// # Request
///
/// `multipart/form-data` with a `file` field holding a `.yaml` / `.yml`
/// document that has `sites`, `keys` and `history` sections.
///
/// # Response
///
/// - **Success (200 OK)**: counts of restored and skipped rows
/// - **Error (400)**: no file, wrong extension, or malformed document
///
/// The upload is fully validated before any data is deleted.
pub async fn restore_backup(
    State(pool): State<DbPool>,
    mut multipart: Multipart,
) -> Result<Json<RestoreSummary>, AppError> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidRequest(format!("Invalid upload: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidRequest(format!("Invalid upload: {}", e)))?;
        upload = Some((filename, bytes));
        break;
    }

    let (filename, bytes) =
        upload.ok_or_else(|| AppError::InvalidRequest("Missing 'file' field".to_string()))?;

    if !has_backup_extension(&filename) {
        return Err(AppError::InvalidBackup(
            "only .yaml or .yml files are accepted".to_string(),
        ));
    }

    let document = BackupDocument::from_yaml(&bytes)
        .map_err(|e| AppError::InvalidBackup(format!("{}", e)))?;

    tracing::info!("Restoring backup from {}", filename);

    let summary = backup_service::restore(&pool, document).await?;

    Ok(Json(summary))
}

/// Delete all data.
pub async fn clear_database(
    State(pool): State<DbPool>,
) -> Result<Json<serde_json::Value>, AppError> {
    backup_service::clear(&pool).await?;

    Ok(Json(json!({ "message": "Database cleared successfully" })))
}
