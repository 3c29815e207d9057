//! This module aggregates the utility submodules shared across the application.

/// The SQLite document store for guild and user settings.
pub mod database;
/// Background posting of unexpected errors to a webhook.
pub mod error_report;
