use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::store::{DocumentStore, StoreError, StoredDocument};

type Collections = HashMap<String, BTreeMap<String, StoredDocument>>;

/// Process-local [`DocumentStore`]. Clones share the same documents.
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    collections: Arc<Mutex<Collections>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every document in `collection`, ordered by id.
    pub fn documents(&self, collection: &str) -> Vec<StoredDocument> {
        self.lock()
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Stores `doc` as-is, bypassing conflict detection.
    pub fn insert_raw(&self, collection: &str, doc: StoredDocument) {
        self.lock()
            .entry(collection.to_owned())
            .or_default()
            .insert(doc.id.clone(), doc);
    }

    fn lock(&self) -> MutexGuard<'_, Collections> {
        self.collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn versions_of(
        &self,
        collection: &str,
        base_id: &str,
        partition_key: &str,
    ) -> Vec<StoredDocument> {
        let mut versions: Vec<StoredDocument> = self
            .lock()
            .get(collection)
            .into_iter()
            .flat_map(|docs| docs.values())
            .filter(|d| d.base_id == base_id && d.partition_key == partition_key)
            .cloned()
            .collect();
        versions.sort_by_key(|d| d.version);
        versions
    }
}

impl DocumentStore for InMemoryDocumentStore {
    async fn create_document(
        &self,
        collection: &str,
        doc: StoredDocument,
    ) -> Result<StoredDocument, StoreError> {
        let mut collections = self.lock();
        let docs = collections.entry(collection.to_owned()).or_default();
        if docs.contains_key(&doc.id) {
            return Err(StoreError::Conflict { id: doc.id });
        }
        docs.insert(doc.id.clone(), doc.clone());
        Ok(doc)
    }

    async fn read_document(
        &self,
        collection: &str,
        id: &str,
        partition_key: &str,
    ) -> Result<Option<StoredDocument>, StoreError> {
        Ok(self
            .lock()
            .get(collection)
            .and_then(|docs| docs.get(id))
            .filter(|d| d.partition_key == partition_key)
            .cloned())
    }

    async fn find_latest_version(
        &self,
        collection: &str,
        base_id: &str,
        partition_key: &str,
    ) -> Result<Option<StoredDocument>, StoreError> {
        Ok(self
            .versions_of(collection, base_id, partition_key)
            .pop())
    }

    async fn list_versions(
        &self,
        collection: &str,
        base_id: &str,
        partition_key: &str,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        Ok(self.versions_of(collection, base_id, partition_key))
    }
}
