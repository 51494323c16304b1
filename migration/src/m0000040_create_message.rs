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
                    .table(Message::Table)
                    .col(ColumnDef::new(Message::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Message::ConversationId).uuid().not_null())
                    .col(ColumnDef::new(Message::SenderId).string().not_null())
                    .col(ColumnDef::new(Message::Content).text())
                    .col(
                        ColumnDef::new(Message::MessageType)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Message::FileUrl).string())
                    .col(ColumnDef::new(Message::FileName).string())
                    .col(ColumnDef::new(Message::FileSize).big_integer())
                    .col(
                        ColumnDef::new(Message::IsRead)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Message::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Message::Table, Message::ConversationId)
                            .to(Conversation::Table, Conversation::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Message::Table, Message::SenderId)
                            .to(UserAccount::Table, UserAccount::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // this index should speed up paging through the messages of a conversation
        manager
            .create_index(
                Index::create()
                    .table(Message::Table)
                    .name(Indexes::MessageConversationIdCreatedAtIdx.to_string())
                    .col(Message::ConversationId)
                    .col(Message::CreatedAt)
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
                    .table(Message::Table)
                    .name(Indexes::MessageConversationIdCreatedAtIdx.to_string())
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Message::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Indexes {
    MessageConversationIdCreatedAtIdx,
}

#[derive(DeriveIden)]
pub enum Message {
    Table,
    Id,
    ConversationId,
    SenderId,
    Content,
    MessageType,
    FileUrl,
    FileName,
    FileSize,
    IsRead,
    CreatedAt,
}
