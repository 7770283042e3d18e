//! Business logic services

pub mod admin;
pub mod auth;
pub mod catalog;
pub mod loans;
pub mod redis;
pub mod sessions;

use std::sync::Arc;

use chrono::NaiveDate;

use crate::{config::AuthConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub admin: admin::AdminService,
    pub auth: auth::AuthService,
    pub catalog: catalog::CatalogService,
    pub loans: loans::LoansService,
    pub sessions: sessions::SessionsService,
}

impl Services {
    /// Create all services over one repository and session store
    pub fn new(
        repository: Repository,
        session_store: Arc<dyn sessions::SessionStore>,
        auth_config: AuthConfig,
    ) -> Self {
        Self {
            admin: admin::AdminService::new(repository.clone()),
            auth: auth::AuthService::new(repository.clone(), auth_config),
            catalog: catalog::CatalogService::new(repository.clone()),
            loans: loans::LoansService::new(repository),
            sessions: sessions::SessionsService::new(session_store),
        }
    }
}

/// Current date on the server's local calendar
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}
