//! Visitdesk Visit Query & Export Server
//!
//! Serves the field visit list of the operations dashboard: filter state per
//! screen, role-dependent routing to the remote record API, cached page
//! queries and full CSV exports.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
