use sea_orm::entity::prelude::*;

/// One stored document.
///
/// `seq` is the insertion order of the row and doubles as the natural order of
/// a collection scan. `doc_key` is the canonical string form of the document's
/// `_id` and is unique per collection.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "document")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub seq: i64,
    pub collection: String,
    pub doc_key: String,
    #[sea_orm(column_type = "Blob")]
    pub body: Vec<u8>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
