use std::sync::{Arc, Mutex, PoisonError};

use anyhow::anyhow;

use courier_core::store::{DocumentStore, StoreError, StoredDocument};

#[derive(Default)]
struct Faults {
    failing_writes: Vec<String>,
    failing_reads: Vec<String>,
    races: usize,
    write_attempts: usize,
}

/// Wraps a [`DocumentStore`] and injects failures per collection.
///
/// Clones share both the inner store (when it shares state on clone) and the
/// fault plan, so a test can keep a handle after moving the store into a usecase.
#[derive(Clone)]
pub struct FaultyStore<S> {
    inner: S,
    faults: Arc<Mutex<Faults>>,
}

impl<S: DocumentStore + Clone> FaultyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            faults: Arc::default(),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Every subsequent write to `collection` fails with a backend error.
    pub fn fail_writes(&self, collection: &str) {
        self.faults().failing_writes.push(collection.to_owned());
    }

    /// Every subsequent read from `collection` fails with a backend error.
    pub fn fail_reads(&self, collection: &str) {
        self.faults().failing_reads.push(collection.to_owned());
    }

    pub fn heal(&self) {
        let mut faults = self.faults();
        faults.failing_writes.clear();
        faults.failing_reads.clear();
    }

    /// The next `n` writes lose a race: a competing writer inserts the same
    /// id first, so the inner store reports a genuine conflict.
    pub fn race_next_writes(&self, n: usize) {
        self.faults().races = n;
    }

    pub fn write_attempts(&self) -> usize {
        self.faults().write_attempts
    }

    fn faults(&self) -> std::sync::MutexGuard<'_, Faults> {
        self.faults.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_read(&self, collection: &str) -> Result<(), StoreError> {
        if self.faults().failing_reads.iter().any(|c| c == collection) {
            return Err(StoreError::Backend(anyhow!("injected read failure on {collection}")));
        }
        Ok(())
    }
}

impl<S: DocumentStore + Clone> DocumentStore for FaultyStore<S> {
    async fn create_document(
        &self,
        collection: &str,
        doc: StoredDocument,
    ) -> Result<StoredDocument, StoreError> {
        let race = {
            let mut faults = self.faults();
            faults.write_attempts += 1;
            if faults.failing_writes.iter().any(|c| c == collection) {
                return Err(StoreError::Backend(anyhow!(
                    "injected write failure on {collection}"
                )));
            }
            let race = faults.races > 0;
            if race {
                faults.races -= 1;
            }
            race
        };
        if race {
            self.inner.create_document(collection, doc.clone()).await?;
        }
        self.inner.create_document(collection, doc).await
    }

    async fn read_document(
        &self,
        collection: &str,
        id: &str,
        partition_key: &str,
    ) -> Result<Option<StoredDocument>, StoreError> {
        self.check_read(collection)?;
        self.inner.read_document(collection, id, partition_key).await
    }

    async fn find_latest_version(
        &self,
        collection: &str,
        base_id: &str,
        partition_key: &str,
    ) -> Result<Option<StoredDocument>, StoreError> {
        self.check_read(collection)?;
        self.inner
            .find_latest_version(collection, base_id, partition_key)
            .await
    }

    async fn list_versions(
        &self,
        collection: &str,
        base_id: &str,
        partition_key: &str,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        self.check_read(collection)?;
        self.inner.list_versions(collection, base_id, partition_key).await
    }
}
