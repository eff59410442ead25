use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Documents::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Documents::Collection).string().not_null())
                    .col(ColumnDef::new(Documents::Id).string().not_null())
                    .col(ColumnDef::new(Documents::BaseId).string().not_null())
                    .col(ColumnDef::new(Documents::Version).big_integer().not_null())
                    .col(ColumnDef::new(Documents::PartitionKey).string().not_null())
                    .col(ColumnDef::new(Documents::Body).json_binary().not_null())
                    .col(
                        ColumnDef::new(Documents::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .primary_key(
                        Index::create()
                            .col(Documents::Collection)
                            .col(Documents::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // Latest-version lookups scan one logical document's versions.
        manager
            .create_index(
                Index::create()
                    .table(Documents::Table)
                    .col(Documents::Collection)
                    .col(Documents::BaseId)
                    .col(Documents::PartitionKey)
                    .col(Documents::Version)
                    .name("idx_documents_base_id_version")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Documents::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Documents {
    Table,
    Collection,
    Id,
    BaseId,
    Version,
    PartitionKey,
    Body,
    CreatedAt,
}
