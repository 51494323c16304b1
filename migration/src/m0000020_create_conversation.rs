use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Conversation::Table)
                    .col(
                        ColumnDef::new(Conversation::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Conversation::Name).string())
                    .col(
                        ColumnDef::new(Conversation::IsGroup)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Conversation::DirectKey).string())
                    .col(
                        ColumnDef::new(Conversation::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Conversation::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // one direct conversation per (ordered) pair of users, groups carry NULL
        manager
            .create_index(
                Index::create()
                    .table(Conversation::Table)
                    .name(Indexes::ConversationDirectKeyIdx.to_string())
                    .col(Conversation::DirectKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .if_exists()
                    .table(Conversation::Table)
                    .name(Indexes::ConversationDirectKeyIdx.to_string())
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Conversation::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Indexes {
    ConversationDirectKeyIdx,
}

#[derive(DeriveIden)]
pub enum Conversation {
    Table,
    Id,
    Name,
    IsGroup,
    DirectKey,
    CreatedAt,
    UpdatedAt,
}
