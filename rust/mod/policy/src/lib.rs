//! Policy snapshot module.
//!
//! Pulls routing-policy metadata from the remote controller, persists it
//! as a versioned generation of records (replace-on-refresh), and exports
//! the newest records as CSV.

pub mod api;
pub mod export;
pub mod fetch;
pub mod generation;
pub mod model;
pub mod normalize;
pub mod service;
pub mod store;

use std::sync::Arc;

use axum::Router;
use polsnap_core::Module;
use polsnap_sql::SQLStore;

use fetch::PolicyFetcher;
use service::PolicyService;

/// The policy module — snapshot lifecycle plus the export surface.
pub struct PolicyModule {
    service: Arc<PolicyService>,
}

impl PolicyModule {
    /// Create the policy module and initialise storage.
    pub fn new(
        db: Arc<dyn SQLStore>,
        fetcher: Arc<dyn PolicyFetcher>,
    ) -> Result<Self, polsnap_core::ServiceError> {
        Ok(Self {
            service: Arc::new(PolicyService::new(db, fetcher)?),
        })
    }

    /// Access the service for programmatic refresh or tests.
    pub fn service(&self) -> &Arc<PolicyService> {
        &self.service
    }
}

impl Module for PolicyModule {
    fn name(&self) -> &str {
        "policy"
    }

    fn routes(&self) -> Router {
        api::router(Arc::clone(&self.service))
    }
}
