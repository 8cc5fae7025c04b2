use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Ids::Table)
                    .if_not_exists()
                    .col(string(Ids::Name).primary_key())
                    .col(big_integer(Ids::Id))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Ids::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Ids {
    Table,
    Name,
    Id,
}
