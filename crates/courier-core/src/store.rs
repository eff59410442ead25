#![allow(async_fn_in_trait)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RuntimeError;

/// A single immutable version of a logical document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    /// `base_id` and zero-padded `version`; unique within a collection.
    pub id: String,
    pub base_id: String,
    pub version: u64,
    pub partition_key: String,
    pub body: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document {id} already exists")]
    Conflict { id: String },
    #[error("document {id} could not be decoded")]
    Decode {
        id: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("entity could not be encoded")]
    Encode(#[source] serde_json::Error),
    #[error("update changed the identity of {base_id}")]
    IdentityChanged { base_id: String },
    #[error("store backend error")]
    Backend(#[from] anyhow::Error),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Write failures against the store are presumed recoverable.
impl From<StoreError> for RuntimeError {
    fn from(err: StoreError) -> Self {
        RuntimeError::Transient(store_error_message(&err))
    }
}

/// Display of the error followed by its source chain.
pub fn store_error_message(err: &StoreError) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Partitioned document store with insert-conflict detection.
///
/// Documents are never updated or deleted. `create_document` must reject an
/// id already present in the collection with [`StoreError::Conflict`].
pub trait DocumentStore: Send + Sync {
    async fn create_document(
        &self,
        collection: &str,
        doc: StoredDocument,
    ) -> Result<StoredDocument, StoreError>;

    async fn read_document(
        &self,
        collection: &str,
        id: &str,
        partition_key: &str,
    ) -> Result<Option<StoredDocument>, StoreError>;

    /// Highest version sharing `base_id` within the partition.
    async fn find_latest_version(
        &self,
        collection: &str,
        base_id: &str,
        partition_key: &str,
    ) -> Result<Option<StoredDocument>, StoreError>;

    /// All versions of `base_id`, ascending.
    async fn list_versions(
        &self,
        collection: &str,
        base_id: &str,
        partition_key: &str,
    ) -> Result<Vec<StoredDocument>, StoreError>;
}
