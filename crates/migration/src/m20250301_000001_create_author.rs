//! Create `author` table.
//!
//! Authors own posts; `avatar_url` points at a thumbnail under the static tree.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Author::Table)
                    .if_not_exists()
                    .col(pk_auto(Author::Id))
                    .col(string_len(Author::Name, 128).not_null())
                    .col(string_len_null(Author::AvatarUrl, 512))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Author::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Author { Table, Id, Name, AvatarUrl }
