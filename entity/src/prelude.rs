pub use super::counter::Entity as Counter;
pub use super::document::Entity as Document;
