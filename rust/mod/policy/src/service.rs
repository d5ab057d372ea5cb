use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use polsnap_core::ServiceError;
use polsnap_sql::SQLStore;

use crate::fetch::{FetchError, PolicyFetcher};
use crate::model::{NewPolicyRecord, PolicyRecord, RefreshOutcome};
use crate::normalize::normalize;
use crate::store::PolicyStore;

/// Policy module error taxonomy.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// Remote endpoint unreachable or non-2xx. The message is fixed and
    /// user-facing; the underlying cause stays in the error chain.
    #[error("Failed to fetch policy data")]
    FetchFailed(#[source] FetchError),

    /// A raw record could not be transformed. Aborts the whole batch.
    #[error("{0}")]
    Normalization(String),

    /// Storage failure during allocate, delete, or insert.
    #[error("{0}")]
    Persistence(String),

    /// Export requested against an empty record set. Not a fault.
    #[error("No records found")]
    NoRecords,
}

impl From<PolicyError> for ServiceError {
    fn from(e: PolicyError) -> Self {
        let message = e.to_string();
        match e {
            PolicyError::NoRecords => ServiceError::NotFound(message),
            PolicyError::FetchFailed(_) => ServiceError::Internal(message),
            PolicyError::Normalization(_) => ServiceError::Internal(message),
            PolicyError::Persistence(_) => ServiceError::Storage(message),
        }
    }
}

/// Orchestrates the snapshot lifecycle (allocate, fetch, normalize,
/// replace) plus export reads.
pub struct PolicyService {
    store: PolicyStore,
    fetcher: Arc<dyn PolicyFetcher>,
}

impl PolicyService {
    /// Create the service and initialise storage.
    pub fn new(
        db: Arc<dyn SQLStore>,
        fetcher: Arc<dyn PolicyFetcher>,
    ) -> Result<Self, ServiceError> {
        Ok(Self {
            store: PolicyStore::new(db)?,
            fetcher,
        })
    }

    /// Run one refresh cycle.
    ///
    /// The generation marker commits first; the delete of the previous
    /// record set for that number and all inserts commit together
    /// afterwards, as one transaction. A failure at any later step leaves
    /// the marker in place with zero associated records and every
    /// previously stored generation untouched; partial generations are
    /// never visible. There is no mid-flight abort path.
    pub async fn refresh(&self) -> Result<RefreshOutcome, PolicyError> {
        let generation = self
            .store
            .allocate_generation()
            .map_err(|e| PolicyError::Persistence(e.to_string()))?;

        let raw = self.fetcher.fetch().await.map_err(|e| {
            warn!(generation, error = %e, "policy fetch failed");
            PolicyError::FetchFailed(e)
        })?;

        let records: Vec<NewPolicyRecord> = raw
            .iter()
            .map(|r| normalize(r, generation))
            .collect::<Result<_, _>>()
            .map_err(|e| PolicyError::Normalization(e.to_string()))?;

        self.store
            .replace_generation(generation, &records)
            .map_err(|e| PolicyError::Persistence(e.to_string()))?;

        info!(generation, records = records.len(), "policy snapshot refreshed");
        Ok(RefreshOutcome {
            generation,
            records: records.len(),
        })
    }

    /// Up to `limit` records, newest-inserted first, across all
    /// generations.
    pub fn latest(&self, limit: usize) -> Result<Vec<PolicyRecord>, PolicyError> {
        self.store
            .latest(limit)
            .map_err(|e| PolicyError::Persistence(e.to_string()))
    }

    /// Access the underlying store.
    pub fn store(&self) -> &PolicyStore {
        &self.store
    }
}
