use crate::m0000010_create_user::UserAccount;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(FriendRequest::Table)
                    .col(
                        ColumnDef::new(FriendRequest::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(FriendRequest::RequesterId).string().not_null())
                    .col(ColumnDef::new(FriendRequest::AddresseeId).string().not_null())
                    .col(ColumnDef::new(FriendRequest::PairKey).string().not_null())
                    .col(
                        ColumnDef::new(FriendRequest::Status)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FriendRequest::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FriendRequest::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(FriendRequest::Table, FriendRequest::RequesterId)
                            .to(UserAccount::Table, UserAccount::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(FriendRequest::Table, FriendRequest::AddresseeId)
                            .to(UserAccount::Table, UserAccount::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // at most one request, or friendship, per pair of users
        manager
            .create_index(
                Index::create()
                    .table(FriendRequest::Table)
                    .name(Indexes::FriendRequestPairKeyIdx.to_string())
                    .col(FriendRequest::PairKey)
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
                    .table(FriendRequest::Table)
                    .name(Indexes::FriendRequestPairKeyIdx.to_string())
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(FriendRequest::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Indexes {
    FriendRequestPairKeyIdx,
}

#[derive(DeriveIden)]
enum FriendRequest {
    Table,
    Id,
    RequesterId,
    AddresseeId,
    PairKey,
    Status,
    CreatedAt,
    UpdatedAt,
}
