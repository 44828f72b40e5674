//! Create polls table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Polls::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Polls::PartitionKey).string_len(64).not_null())
                    .col(ColumnDef::new(Polls::RowKey).string_len(64).not_null())
                    .col(ColumnDef::new(Polls::Data).json_binary().not_null())
                    .col(ColumnDef::new(Polls::Etag).big_integer().not_null().default(0))
                    .col(
                        ColumnDef::new(Polls::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .primary_key(
                        Index::create()
                            .col(Polls::PartitionKey)
                            .col(Polls::RowKey),
                    )
                    .to_owned(),
            )
            .await?;

        // GIN index for jsonb containment queries (session lookup, active flag).
        manager
            .get_connection()
            .execute_unprepared("CREATE INDEX IF NOT EXISTS idx_polls_data ON polls USING GIN (data)")
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Polls::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Polls {
    Table,
    PartitionKey,
    RowKey,
    Data,
    Etag,
    UpdatedAt,
}
