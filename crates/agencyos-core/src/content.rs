//! Content types fetched from the content source.
//!
//! Every field the content source sends is optional: authors may leave any of
//! them empty. Relational fields arrive either as a bare identifier or as an
//! expanded record depending on the requested relation depth; they are
//! normalized into [`Relation`] as soon as they are deserialized.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de::DeserializeOwned};
use serde_json::Value;

/// Identifier of a record in the content source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    /// Auto-increment integer key.
    Int(i64),
    /// UUID or other string key.
    Str(String),
}

impl ItemId {
    /// Read an identifier from a raw JSON value.
    ///
    /// Only integers and non-empty strings qualify.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(Self::Int),
            Value::String(s) if !s.is_empty() => Some(Self::Str(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(id) => write!(f, "{id}"),
            Self::Str(id) => f.write_str(id),
        }
    }
}

impl From<i64> for ItemId {
    fn from(id: i64) -> Self {
        Self::Int(id)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self::Str(id.to_string())
    }
}

/// A relational field: either a foreign key or the expanded record.
#[derive(Debug, Clone, PartialEq)]
pub enum Relation<T> {
    /// Only the identifier is known; the record must be fetched.
    Unresolved(ItemId),
    /// The record was expanded inline.
    Resolved(Box<T>),
    /// The element could not be read; holds the reason. Keeps list
    /// positions stable when the content source sends a malformed entry.
    Invalid(String),
}

impl<T> Relation<T> {
    /// The foreign key, if the record has not been expanded.
    pub fn unresolved_id(&self) -> Option<&ItemId> {
        match self {
            Self::Unresolved(id) => Some(id),
            Self::Resolved(_) | Self::Invalid(_) => None,
        }
    }

    /// The expanded record, if present.
    pub fn as_resolved(&self) -> Option<&T> {
        match self {
            Self::Resolved(record) => Some(record),
            Self::Unresolved(_) | Self::Invalid(_) => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid(_))
    }
}

impl<T: DeserializeOwned> TryFrom<Value> for Relation<T> {
    type Error = serde_json::Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        if let Some(id) = ItemId::from_value(&value) {
            return Ok(Self::Unresolved(id));
        }
        match value {
            Value::Object(_) => serde_json::from_value(value).map(|r| Self::Resolved(Box::new(r))),
            other => Err(serde::de::Error::custom(format!(
                "expected an identifier or an object, found {}",
                json_kind(&other)
            ))),
        }
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Relation<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::try_from(value).map_err(serde::de::Error::custom)
    }
}

impl<T: Serialize> Serialize for Relation<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Unresolved(id) => id.serialize(serializer),
            Self::Resolved(record) => record.serialize(serializer),
            Self::Invalid(_) => serializer.serialize_none(),
        }
    }
}

/// Name of a JSON value's type, for diagnostics.
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Deserialize a nullable list of relations.
///
/// A `null` list becomes empty. Malformed elements become
/// [`Relation::Invalid`] in their original slot, so positions never shift.
pub fn lenient_relations<'de, D, T>(deserializer: D) -> Result<Vec<Relation<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let values = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(values
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            Relation::try_from(value).unwrap_or_else(|e| {
                tracing::warn!(index, error = %e, "malformed relation");
                Relation::Invalid(e.to_string())
            })
        })
        .collect())
}

/// A media asset owned by the content source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct File {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub title: Option<String>,

    /// Alternative text for images.
    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub filename_download: Option<String>,

    /// MIME type.
    #[serde(default, rename = "type")]
    pub mime_type: Option<String>,

    #[serde(default)]
    pub width: Option<u32>,

    #[serde(default)]
    pub height: Option<u32>,
}

/// A page composed of an ordered list of blocks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub id: Option<ItemId>,

    #[serde(default)]
    pub title: Option<String>,

    /// Route of the page, e.g. "/about".
    #[serde(default)]
    pub permalink: Option<String>,

    /// Publication status ("published", "draft", ...).
    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub date_created: Option<DateTime<Utc>>,

    #[serde(default)]
    pub date_updated: Option<DateTime<Utc>>,

    /// Block references in layout order.
    #[serde(default, deserialize_with = "lenient_block_refs")]
    pub blocks: Vec<BlockRef>,
}

/// One entry of a page's block list, as sent by the content source.
///
/// `collection` names the block kind and `item` holds either the block's
/// identifier or the inline block record. Nothing here is validated; the
/// resolver decides what a reference means.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockRef {
    /// Identifier of the junction row itself.
    #[serde(default)]
    pub id: Option<ItemId>,

    #[serde(default)]
    pub collection: Option<String>,

    #[serde(default)]
    pub item: Value,

    #[serde(default)]
    pub sort: Option<i64>,

    #[serde(default)]
    pub hide_block: Option<bool>,
}

impl BlockRef {
    /// Reference to a block by identifier.
    pub fn foreign(collection: &str, id: impl Into<ItemId>) -> Self {
        let item = match id.into() {
            ItemId::Int(id) => Value::from(id),
            ItemId::Str(id) => Value::from(id),
        };
        Self {
            collection: Some(collection.to_string()),
            item,
            ..Self::default()
        }
    }

    /// Reference carrying the block record inline.
    pub fn inline(collection: &str, item: Value) -> Self {
        Self {
            collection: Some(collection.to_string()),
            item,
            ..Self::default()
        }
    }
}

/// Non-object entries of a block list become empty references so the
/// resolver can report them in place.
fn lenient_block_refs<'de, D>(deserializer: D) -> Result<Vec<BlockRef>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(values
        .into_iter()
        .map(|value| {
            serde_json::from_value(value).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "unreadable block reference");
                BlockRef::default()
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_item_id_from_value() {
        assert_eq!(ItemId::from_value(&json!(3)), Some(ItemId::Int(3)));
        assert_eq!(ItemId::from_value(&json!("abc")), Some(ItemId::Str("abc".into())));
        assert_eq!(ItemId::from_value(&json!("")), None);
        assert_eq!(ItemId::from_value(&json!(1.5)), None);
        assert_eq!(ItemId::from_value(&json!(null)), None);
        assert_eq!(ItemId::from_value(&json!({})), None);
    }

    #[test]
    fn test_relation_from_identifier() {
        let rel: Relation<File> = serde_json::from_value(json!("f-1")).expect("relation");
        assert_eq!(rel.unresolved_id(), Some(&ItemId::from("f-1")));
        assert!(!rel.is_resolved());
    }

    #[test]
    fn test_relation_from_object() {
        let rel: Relation<File> =
            serde_json::from_value(json!({"id": "f-1", "width": 640})).expect("relation");
        let file = rel.as_resolved().expect("resolved");
        assert_eq!(file.id.as_deref(), Some("f-1"));
        assert_eq!(file.width, Some(640));
    }

    #[test]
    fn test_relation_rejects_other_shapes() {
        let err = serde_json::from_value::<Relation<File>>(json!(true)).unwrap_err();
        assert!(err.to_string().contains("found a boolean"));
        assert!(serde_json::from_value::<Relation<File>>(json!([1])).is_err());
    }

    #[test]
    fn test_relation_serializes_back_to_wire_shape() {
        let rel: Relation<File> = Relation::Unresolved(ItemId::Int(7));
        assert_eq!(serde_json::to_value(&rel).expect("serialize"), json!(7));

        let rel: Relation<File> = Relation::Invalid("bad".to_string());
        assert_eq!(serde_json::to_value(&rel).expect("serialize"), json!(null));
    }

    #[derive(Debug, Deserialize)]
    struct Gallery {
        #[serde(default, deserialize_with = "lenient_relations")]
        files: Vec<Relation<File>>,
    }

    #[test]
    fn test_lenient_relations_keep_malformed_slots() {
        let gallery: Gallery = serde_json::from_value(json!({
            "files": ["a", true, {"id": "c"}, [1], 5]
        }))
        .expect("gallery");

        assert_eq!(gallery.files.len(), 5);
        assert_eq!(gallery.files[0].unresolved_id(), Some(&ItemId::from("a")));
        assert!(gallery.files[1].is_invalid());
        assert!(gallery.files[2].is_resolved());
        assert!(gallery.files[3].is_invalid());
        assert_eq!(gallery.files[4].unresolved_id(), Some(&ItemId::Int(5)));
    }

    #[test]
    fn test_page_blocks_null_is_empty() {
        let page: Page =
            serde_json::from_value(json!({"title": "Home", "blocks": null})).expect("page");
        assert!(page.blocks.is_empty());
        assert_eq!(page.title.as_deref(), Some("Home"));
    }

    #[test]
    fn test_page_keeps_unreadable_block_refs_in_place() {
        let page: Page = serde_json::from_value(json!({
            "blocks": [
                {"collection": "block_hero", "item": 1},
                42,
                {"collection": "block_quote", "item": {"title": "Q"}}
            ]
        }))
        .expect("page");

        assert_eq!(page.blocks.len(), 3);
        assert_eq!(page.blocks[0].collection.as_deref(), Some("block_hero"));
        assert_eq!(page.blocks[1], BlockRef::default());
        assert_eq!(page.blocks[2].collection.as_deref(), Some("block_quote"));
    }

    #[test]
    fn test_file_type_field() {
        let file: File =
            serde_json::from_value(json!({"id": "a", "type": "image/png"})).expect("file");
        assert_eq!(file.mime_type.as_deref(), Some("image/png"));
    }
}
