pub mod category;
pub mod content_item;
pub mod data_content_item;
pub mod timestamp;

pub use category::{Category, CategoryInput};
pub use content_item::{ContentItem, ContentItemInput};
pub use data_content_item::{DataContentItem, DataContentItemInput};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

/// Loosely typed stored document
pub type Document = Map<String, Value>;

/// Serialize an entity into its stored document form
pub fn to_document<T: Serialize>(entity: &T) -> Result<Document, serde_json::Error> {
    match serde_json::to_value(entity)? {
        Value::Object(map) => Ok(map),
        other => Err(serde::ser::Error::custom(format!("expected object, got {}", other))),
    }
}

pub fn from_document<T: DeserializeOwned>(doc: Document) -> Result<T, serde_json::Error> {
    serde_json::from_value(Value::Object(doc))
}
