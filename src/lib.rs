//! Local Library catalog server
//!
//! A JSON web service for a small lending library: books, authors, genres,
//! languages and physical copies, with loan views, renewals and a staff
//! administration console.

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
    pub sessions: Arc<dyn services::sessions::SessionStore>,
}
