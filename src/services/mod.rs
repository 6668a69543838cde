//! Business logic services

pub mod admin;
pub mod auth;
pub mod catalog;
pub mod dashboard;
pub mod loans;
pub mod sessions;

use crate::{config::AppConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub catalog: catalog::CatalogService,
    pub dashboard: dashboard::DashboardService,
    pub loans: loans::LoansService,
    pub admin: admin::AdminService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, config: &AppConfig) -> Self {
        let catalog = catalog::CatalogService::new(repository.clone(), config.catalog.clone());
        Self {
            auth: auth::AuthService::new(repository.clone(), config.auth.clone()),
            dashboard: dashboard::DashboardService::new(repository.clone()),
            loans: loans::LoansService::new(repository.clone(), config.catalog.clone()),
            admin: admin::AdminService::new(repository, catalog.clone()),
            catalog,
        }
    }
}
