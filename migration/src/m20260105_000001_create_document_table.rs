use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Document::Table)
                    .if_not_exists()
                    .col(pk_auto(Document::Seq))
                    .col(string(Document::Collection))
                    .col(string(Document::DocKey))
                    .col(blob(Document::Body))
                    .to_owned(),
            )
            .await?;

        // One `_id` per collection
        manager
            .create_index(
                Index::create()
                    .name("idx_document_collection_doc_key")
                    .table(Document::Table)
                    .col(Document::Collection)
                    .col(Document::DocKey)
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
                    .name("idx_document_collection_doc_key")
                    .table(Document::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Document::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Document {
    Table,
    Seq,
    Collection,
    DocKey,
    Body,
}
