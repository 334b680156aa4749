//! Business logic services

pub mod crawler;
pub mod export;
pub mod persistence;
pub mod query_cache;
pub mod redis;
pub mod strategy;
pub mod visits;

use std::sync::Arc;

use crate::{config::AppConfig, repository::Repository};

use persistence::PersistenceAdapter;

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub visits: visits::VisitsService,
}

impl Services {
    /// Create all services with the given repository and filter store
    pub fn new(
        repository: Repository,
        persistence: Arc<dyn PersistenceAdapter>,
        config: &AppConfig,
    ) -> Self {
        Self {
            visits: visits::VisitsService::new(repository, persistence, config),
        }
    }
}
