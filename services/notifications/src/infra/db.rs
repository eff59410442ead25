use anyhow::Context as _;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, SqlErr,
};

use courier_core::store::{DocumentStore, StoreError, StoredDocument};
use courier_notifications_schema::documents;

// ── Document store ───────────────────────────────────────────────────────────

/// [`DocumentStore`] over the `documents` table. The primary key
/// `(collection, id)` provides the insert-conflict detection.
#[derive(Clone)]
pub struct DbDocumentStore {
    pub db: DatabaseConnection,
}

impl DocumentStore for DbDocumentStore {
    async fn create_document(
        &self,
        collection: &str,
        doc: StoredDocument,
    ) -> Result<StoredDocument, StoreError> {
        let version = i64::try_from(doc.version).context("document version out of range")?;
        let result = documents::ActiveModel {
            collection: Set(collection.to_owned()),
            id: Set(doc.id.clone()),
            base_id: Set(doc.base_id.clone()),
            version: Set(version),
            partition_key: Set(doc.partition_key.clone()),
            body: Set(doc.body.clone()),
            created_at: Set(doc.created_at),
        }
        .insert(&self.db)
        .await;

        match result {
            Ok(model) => document_from_model(model),
            Err(err) if is_unique_violation(&err) => Err(StoreError::Conflict { id: doc.id }),
            Err(err) => Err(StoreError::Backend(
                anyhow::Error::new(err).context("insert document"),
            )),
        }
    }

    async fn read_document(
        &self,
        collection: &str,
        id: &str,
        partition_key: &str,
    ) -> Result<Option<StoredDocument>, StoreError> {
        let model = documents::Entity::find_by_id((collection.to_owned(), id.to_owned()))
            .filter(documents::Column::PartitionKey.eq(partition_key))
            .one(&self.db)
            .await
            .context("read document")?;
        model.map(document_from_model).transpose()
    }

    async fn find_latest_version(
        &self,
        collection: &str,
        base_id: &str,
        partition_key: &str,
    ) -> Result<Option<StoredDocument>, StoreError> {
        let model = documents::Entity::find()
            .filter(documents::Column::Collection.eq(collection))
            .filter(documents::Column::BaseId.eq(base_id))
            .filter(documents::Column::PartitionKey.eq(partition_key))
            .order_by_desc(documents::Column::Version)
            .one(&self.db)
            .await
            .context("find latest document version")?;
        model.map(document_from_model).transpose()
    }

    async fn list_versions(
        &self,
        collection: &str,
        base_id: &str,
        partition_key: &str,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        let models = documents::Entity::find()
            .filter(documents::Column::Collection.eq(collection))
            .filter(documents::Column::BaseId.eq(base_id))
            .filter(documents::Column::PartitionKey.eq(partition_key))
            .order_by_asc(documents::Column::Version)
            .all(&self.db)
            .await
            .context("list document versions")?;
        models.into_iter().map(document_from_model).collect()
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

fn document_from_model(model: documents::Model) -> Result<StoredDocument, StoreError> {
    let version = u64::try_from(model.version)
        .with_context(|| format!("negative version on document {}", model.id))?;
    Ok(StoredDocument {
        id: model.id,
        base_id: model.base_id,
        version,
        partition_key: model.partition_key,
        body: model.body,
        created_at: model.created_at,
    })
}
