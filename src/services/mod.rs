//! Business logic services.
//!
//! Services contain logic separated from HTTP handlers: multi-statement
//! database transactions and queries shared between handlers.

pub mod backup_service;
pub mod history_service;
pub mod key_service;
