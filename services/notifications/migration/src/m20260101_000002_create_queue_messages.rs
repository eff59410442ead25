use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(QueueMessages::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(QueueMessages::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(QueueMessages::QueueName).string().not_null())
                    .col(
                        ColumnDef::new(QueueMessages::Payload)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(QueueMessages::DequeueCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(QueueMessages::InsertedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(QueueMessages::NextVisibleAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(QueueMessages::CompletedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(QueueMessages::DeadLetteredAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(QueueMessages::LastError).string())
                    .to_owned(),
            )
            .await?;

        // Index for receive: pending messages of one queue by visibility.
        manager
            .create_index(
                Index::create()
                    .table(QueueMessages::Table)
                    .col(QueueMessages::QueueName)
                    .col(QueueMessages::NextVisibleAt)
                    .name("idx_queue_messages_queue_name_next_visible_at")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(QueueMessages::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum QueueMessages {
    Table,
    Id,
    QueueName,
    Payload,
    DequeueCount,
    InsertedAt,
    NextVisibleAt,
    CompletedAt,
    DeadLetteredAt,
    LastError,
}
