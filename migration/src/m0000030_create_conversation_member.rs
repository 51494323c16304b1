use crate::m0000010_create_user::UserAccount;
use crate::m0000020_create_conversation::Conversation;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ConversationMember::Table)
                    .col(
                        ColumnDef::new(ConversationMember::ConversationId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ConversationMember::UserId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ConversationMember::JoinedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(ConversationMember::ConversationId)
                            .col(ConversationMember::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(
                                ConversationMember::Table,
                                ConversationMember::ConversationId,
                            )
                            .to(Conversation::Table, Conversation::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(ConversationMember::Table, ConversationMember::UserId)
                            .to(UserAccount::Table, UserAccount::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // listing the conversations of a user
        manager
            .create_index(
                Index::create()
                    .table(ConversationMember::Table)
                    .name(Indexes::ConversationMemberUserIdIdx.to_string())
                    .col(ConversationMember::UserId)
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
                    .table(ConversationMember::Table)
                    .name(Indexes::ConversationMemberUserIdIdx.to_string())
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(ConversationMember::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Indexes {
    ConversationMemberUserIdIdx,
}

#[derive(DeriveIden)]
pub enum ConversationMember {
    Table,
    ConversationId,
    UserId,
    JoinedAt,
}
