//! SeaORM entities backing the document store.
//!
//! Documents of every collection share the `document` table and are stored as
//! BSON blobs; `ids` holds one auto-increment counter per collection.

pub mod counter;
pub mod document;
pub mod prelude;
