//! Key Tracker - sites, keys and their issue/return history.
//!
//! The crate contains:
//!
//! - the REST API server ([`router`]) over PostgreSQL
//! - the list filtering ([`filter`]) and history enrichment ([`enrich`])
//!   shared by the server and clients
//! - a typed API client with per-view state ([`client`])

pub mod client;
pub mod config;
pub mod db;
pub mod enrich;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod models;
pub mod services;

use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{db::DbPool, handlers::*};

/// Build the HTTP router.
///
/// All data endpoints live under `/api`. `/` and `/health` stay at the root.
pub fn router(pool: DbPool) -> Router {
    let api = Router::new()
        // Sites
        .route("/sites/", get(sites::list_sites).post(sites::create_site))
        .route(
            "/sites/{site_code}",
            get(sites::get_site)
                .put(sites::update_site)
                .delete(sites::delete_site),
        )
        // Keys
        .route("/keys/", get(keys::list_keys).post(keys::create_key))
        .route("/keys/issue/", post(keys::issue_key))
        .route("/keys/return/", post(keys::return_key))
        .route(
            "/keys/{key_id}",
            get(keys::get_key)
                .put(keys::update_key)
                .delete(keys::delete_key),
        )
        // History
        .route("/history/", get(history::list_history))
        .route("/history/details/", get(history::list_history_details))
        .route(
            "/history/{history_id}",
            put(history::update_history).delete(history::delete_history),
        )
        .route("/active-keys/", get(active_keys::list_active_keys))
        // Backup
        .route("/backup/", get(backup::download_backup))
        .route("/backup/restore/", post(backup::restore_backup))
        .route("/backup/clear/", axum::routing::delete(backup::clear_database));

    Router::new()
        .route("/", get(health::welcome))
        .route("/health", get(health::health_check))
        .nest("/api", api)
        // The browser front end may be served from another origin
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use tower::ServiceExt;

    // Never connects; every request below is rejected before touching the database.
    fn app() -> Router {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://tracker@localhost/unused")
            .unwrap();
        router(pool)
    }

    async fn send(req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let resp = app().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn upload(filename: &str, contents: &str) -> Request<Body> {
        let boundary = "XBOUNDARYX";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n\
             {contents}\r\n\
             --{boundary}--\r\n"
        );
        Request::builder()
            .method("POST")
            .uri("/api/backup/restore/")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn welcome_message() {
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let (status, body) = send(req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Welcome to Key Tracker API");
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let req = Request::builder()
            .uri("/api/nothing/")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn restore_rejects_wrong_extension() {
        let (status, body) = send(upload("backup.json", "{}")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "invalid_backup");
    }

    #[tokio::test]
    async fn restore_rejects_incomplete_document() {
        let (status, body) = send(upload("backup.yaml", "sites: []\nkeys: []\n")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "invalid_backup");
    }

    #[tokio::test]
    async fn restore_requires_file_field() {
        let boundary = "XBOUNDARYX";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"other\"\r\n\r\n\
             value\r\n\
             --{boundary}--\r\n"
        );
        let req = Request::builder()
            .method("POST")
            .uri("/api/backup/restore/")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();
        let (status, body) = send(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "invalid_request");
    }

    #[tokio::test]
    async fn create_key_validates_counts_first() {
        let req = json_request(
            "POST",
            "/api/keys/",
            serde_json::json!({
                "site_code": "A1",
                "description": "Front door",
                "key_count": 0,
                "set_count": 1
            }),
        );
        let (status, body) = send(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "invalid_request");
    }

    #[tokio::test]
    async fn issue_requires_recipient() {
        let req = json_request(
            "POST",
            "/api/keys/issue/",
            serde_json::json!({ "site_code": "A1", "issued_to": "  " }),
        );
        let (status, _) = send(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn create_site_requires_code() {
        let req = json_request(
            "POST",
            "/api/sites/",
            serde_json::json!({ "site_code": "", "address": "1 Main Street" }),
        );
        let (status, _) = send(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_filter_mode_is_rejected() {
        let req = Request::builder()
            .uri("/api/sites/?q=a&mode=fuzzy")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
