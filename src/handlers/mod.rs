//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, etc.)
//! 2. Performs business logic (database queries, validation)
//! 3. Returns HTTP response (JSON, status code)

/// Currently issued keys
pub mod active_keys;
/// Backup download, restore and clear
pub mod backup;
/// Health check endpoint
pub mod health;
/// History listing and editing
pub mod history;
/// Key management, issue and return
pub mod keys;
/// Site management
pub mod sites;
