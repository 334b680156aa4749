//! Repository layer: access to the remote record API

pub mod visits;

use std::sync::Arc;

use crate::{config::RecordApiConfig, error::AppResult};

pub use visits::{HttpRecordApi, RecordApi, VisitSearch};

/// Main repository struct holding the record API client
#[derive(Clone)]
pub struct Repository {
    pub visits: Arc<dyn RecordApi>,
}

impl Repository {
    /// Create a repository over any record API implementation
    pub fn new(visits: Arc<dyn RecordApi>) -> Self {
        Self { visits }
    }

    /// Create a repository talking HTTP to the configured record API
    pub fn http(config: &RecordApiConfig) -> AppResult<Self> {
        Ok(Self::new(Arc::new(HttpRecordApi::new(config)?)))
    }
}
