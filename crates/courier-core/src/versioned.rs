//! Append-only versioned entities on top of a [`DocumentStore`].
//!
//! Every write inserts a new document whose id embeds the version number.
//! Two writers racing on the same version collide on that id, the loser gets
//! [`StoreError::Conflict`] and re-runs its read-modify-write cycle.

use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::store::{DocumentStore, StoreError, StoredDocument};

pub const DEFAULT_MAX_CONFLICT_RETRIES: u32 = 3;

/// An entity persisted as a sequence of immutable versions.
pub trait VersionedEntity: Serialize + DeserializeOwned + Clone + Send + Sync {
    /// Collection holding every version of every entity of this kind.
    const COLLECTION: &'static str;

    /// Stable logical id shared by all versions.
    fn base_id(&self) -> String;

    /// Value co-locating all versions of one entity.
    fn partition_key(&self) -> String;
}

/// A stored version of an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub id: String,
    pub version: u64,
    pub partition_key: String,
    pub created_at: DateTime<Utc>,
    pub entity: T,
}

pub fn versioned_model_id(base_id: &str, version: u64) -> String {
    format!("{base_id}-{version:016}")
}

pub struct VersionedModel<S, T> {
    store: S,
    max_conflict_retries: u32,
    _entity: PhantomData<fn() -> T>,
}

impl<S: Clone, T> Clone for VersionedModel<S, T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            max_conflict_retries: self.max_conflict_retries,
            _entity: PhantomData,
        }
    }
}

impl<S, T> VersionedModel<S, T>
where
    S: DocumentStore,
    T: VersionedEntity,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            max_conflict_retries: DEFAULT_MAX_CONFLICT_RETRIES,
            _entity: PhantomData,
        }
    }

    pub fn with_max_conflict_retries(mut self, retries: u32) -> Self {
        self.max_conflict_retries = retries;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Inserts version 0. Fails with `Conflict` if the entity already exists.
    pub async fn create(&self, entity: T) -> Result<Versioned<T>, StoreError> {
        self.insert(entity, 0).await
    }

    /// Latest version of the entity, if any.
    pub async fn find(
        &self,
        base_id: &str,
        partition_key: &str,
    ) -> Result<Option<Versioned<T>>, StoreError> {
        self.store
            .find_latest_version(T::COLLECTION, base_id, partition_key)
            .await?
            .map(decode)
            .transpose()
    }

    pub async fn find_version(
        &self,
        base_id: &str,
        partition_key: &str,
        version: u64,
    ) -> Result<Option<Versioned<T>>, StoreError> {
        let id = versioned_model_id(base_id, version);
        self.store
            .read_document(T::COLLECTION, &id, partition_key)
            .await?
            .map(decode)
            .transpose()
    }

    /// Every version, oldest first.
    pub async fn history(
        &self,
        base_id: &str,
        partition_key: &str,
    ) -> Result<Vec<Versioned<T>>, StoreError> {
        self.store
            .list_versions(T::COLLECTION, base_id, partition_key)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    /// Reads the latest version, applies `transform` and inserts the result
    /// as the next version. A missing entity is `Ok(None)`.
    pub async fn update<F>(
        &self,
        base_id: &str,
        partition_key: &str,
        mut transform: F,
    ) -> Result<Option<Versioned<T>>, StoreError>
    where
        F: FnMut(T) -> T,
    {
        let mut attempt = 0;
        loop {
            let Some(current) = self.find(base_id, partition_key).await? else {
                return Ok(None);
            };
            let next = transform(current.entity);
            if next.base_id() != base_id || next.partition_key() != partition_key {
                return Err(StoreError::IdentityChanged {
                    base_id: base_id.to_owned(),
                });
            }
            match self.insert(next, current.version + 1).await {
                Err(err) if err.is_conflict() && attempt < self.max_conflict_retries => {
                    attempt += 1;
                    tracing::debug!(
                        base_id = %base_id,
                        attempt,
                        "version conflict, retrying update"
                    );
                }
                result => return result.map(Some),
            }
        }
    }

    /// Inserts `entity` as version 0 or as the successor of the latest version.
    pub async fn upsert(&self, entity: T) -> Result<Versioned<T>, StoreError> {
        let base_id = entity.base_id();
        let partition_key = entity.partition_key();
        let mut attempt = 0;
        loop {
            let next_version = self
                .store
                .find_latest_version(T::COLLECTION, &base_id, &partition_key)
                .await?
                .map_or(0, |doc| doc.version + 1);
            match self.insert(entity.clone(), next_version).await {
                Err(err) if err.is_conflict() && attempt < self.max_conflict_retries => {
                    attempt += 1;
                    tracing::debug!(
                        base_id = %base_id,
                        attempt,
                        "version conflict, retrying upsert"
                    );
                }
                result => return result,
            }
        }
    }

    async fn insert(&self, entity: T, version: u64) -> Result<Versioned<T>, StoreError> {
        let base_id = entity.base_id();
        let doc = StoredDocument {
            id: versioned_model_id(&base_id, version),
            base_id,
            version,
            partition_key: entity.partition_key(),
            body: serde_json::to_value(&entity).map_err(StoreError::Encode)?,
            created_at: Utc::now(),
        };
        let created = self.store.create_document(T::COLLECTION, doc).await?;
        Ok(Versioned {
            id: created.id,
            version: created.version,
            partition_key: created.partition_key,
            created_at: created.created_at,
            entity,
        })
    }
}

fn decode<T: DeserializeOwned>(doc: StoredDocument) -> Result<Versioned<T>, StoreError> {
    let entity = serde_json::from_value(doc.body).map_err(|source| StoreError::Decode {
        id: doc.id.clone(),
        source,
    })?;
    Ok(Versioned {
        id: doc.id,
        version: doc.version,
        partition_key: doc.partition_key,
        created_at: doc.created_at,
        entity,
    })
}
