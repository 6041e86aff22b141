//! Block records and the registry of block kinds.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    content::{File, ItemId, Relation, lenient_relations},
    error::{CoreError, Result},
};

/// Every block kind a page can reference, keyed by its collection name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockKind {
    #[serde(rename = "block_hero")]
    Hero,
    #[serde(rename = "block_richtext")]
    RichText,
    #[serde(rename = "block_columns")]
    Columns,
    #[serde(rename = "block_quote")]
    Quote,
    #[serde(rename = "block_cta")]
    Cta,
}

impl BlockKind {
    /// All registered kinds.
    pub const ALL: [BlockKind; 5] = [
        Self::Hero,
        Self::RichText,
        Self::Columns,
        Self::Quote,
        Self::Cta,
    ];

    /// Look up a kind by collection name.
    pub fn from_collection(collection: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.collection() == collection)
    }

    /// Collection holding records of this kind.
    pub fn collection(&self) -> &'static str {
        match self {
            Self::Hero => "block_hero",
            Self::RichText => "block_richtext",
            Self::Columns => "block_columns",
            Self::Quote => "block_quote",
            Self::Cta => "block_cta",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.collection())
    }
}

/// Full-width hero section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockHero {
    #[serde(default)]
    pub id: Option<ItemId>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub headline: Option<String>,
    /// Trusted HTML from the editor.
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub image: Option<Relation<File>>,
}

/// Free-form rich text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockRichText {
    #[serde(default)]
    pub id: Option<ItemId>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub headline: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    /// "left" or "center".
    #[serde(default)]
    pub alignment: Option<String>,
}

/// Multi-column layout section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockColumn {
    #[serde(default)]
    pub headline: Option<String>,
    #[serde(default)]
    pub id: Option<ItemId>,
    #[serde(default)]
    pub title: Option<String>,
    /// Rows in layout order.
    #[serde(default, deserialize_with = "lenient_relations")]
    pub rows: Vec<Relation<BlockColumnRow>>,
}

/// One row of a [`BlockColumn`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockColumnRow {
    /// Owning column block.
    #[serde(default)]
    pub block_columns: Option<Relation<BlockColumn>>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub headline: Option<String>,
    #[serde(default)]
    pub id: Option<ItemId>,
    #[serde(default)]
    pub image: Option<Relation<File>>,
    /// "left" or "right".
    #[serde(default)]
    pub image_position: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

/// Pull quote.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockQuote {
    #[serde(default)]
    pub id: Option<ItemId>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// Call to action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockCta {
    #[serde(default)]
    pub id: Option<ItemId>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub headline: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub button_label: Option<String>,
    #[serde(default)]
    pub button_href: Option<String>,
}

/// A fully typed block record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "collection", content = "item")]
pub enum Block {
    #[serde(rename = "block_hero")]
    Hero(BlockHero),
    #[serde(rename = "block_richtext")]
    RichText(BlockRichText),
    #[serde(rename = "block_columns")]
    Columns(BlockColumn),
    #[serde(rename = "block_quote")]
    Quote(BlockQuote),
    #[serde(rename = "block_cta")]
    Cta(BlockCta),
}

impl Block {
    /// Build a typed block from a record of the given kind.
    pub fn from_item(kind: BlockKind, item: Value) -> Result<Self> {
        let wrap = |e| CoreError::record(kind.collection(), e);
        Ok(match kind {
            BlockKind::Hero => Self::Hero(serde_json::from_value(item).map_err(wrap)?),
            BlockKind::RichText => Self::RichText(serde_json::from_value(item).map_err(wrap)?),
            BlockKind::Columns => Self::Columns(serde_json::from_value(item).map_err(wrap)?),
            BlockKind::Quote => Self::Quote(serde_json::from_value(item).map_err(wrap)?),
            BlockKind::Cta => Self::Cta(serde_json::from_value(item).map_err(wrap)?),
        })
    }

    pub fn kind(&self) -> BlockKind {
        match self {
            Self::Hero(_) => BlockKind::Hero,
            Self::RichText(_) => BlockKind::RichText,
            Self::Columns(_) => BlockKind::Columns,
            Self::Quote(_) => BlockKind::Quote,
            Self::Cta(_) => BlockKind::Cta,
        }
    }

    /// Record identifier, when the author's record carries one.
    pub fn id(&self) -> Option<&ItemId> {
        match self {
            Self::Hero(b) => b.id.as_ref(),
            Self::RichText(b) => b.id.as_ref(),
            Self::Columns(b) => b.id.as_ref(),
            Self::Quote(b) => b.id.as_ref(),
            Self::Cta(b) => b.id.as_ref(),
        }
    }
}

/// A record with a nested collection of related child records.
pub trait Nested {
    /// Child record type.
    type Child;

    /// Collection the children live in.
    const CHILD_COLLECTION: &'static str;

    /// Children in layout order.
    fn children(&self) -> &[Relation<Self::Child>];

    /// Mutable access for replacing children once they are fetched.
    fn children_mut(&mut self) -> &mut Vec<Relation<Self::Child>>;
}

impl Nested for BlockColumn {
    type Child = BlockColumnRow;

    const CHILD_COLLECTION: &'static str = "block_column_rows";

    fn children(&self) -> &[Relation<BlockColumnRow>] {
        &self.rows
    }

    fn children_mut(&mut self) -> &mut Vec<Relation<BlockColumnRow>> {
        &mut self.rows
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_kind_registry_round_trips_collection_names() {
        for kind in BlockKind::ALL {
            assert_eq!(BlockKind::from_collection(kind.collection()), Some(kind));
        }
        assert_eq!(BlockKind::from_collection("block_unknown"), None);
        assert_eq!(BlockKind::from_collection("block_column_rows"), None);
    }

    #[test]
    fn test_column_rows_keep_mixed_shapes_in_order() {
        let column: BlockColumn = serde_json::from_value(json!({
            "id": "c1",
            "rows": [3, {"id": "r1", "title": "A"}, "r2"]
        }))
        .expect("column");

        assert_eq!(column.rows.len(), 3);
        assert_eq!(column.rows[0].unresolved_id(), Some(&ItemId::Int(3)));
        let row = column.rows[1].as_resolved().expect("expanded row");
        assert_eq!(row.id, Some(ItemId::from("r1")));
        assert_eq!(row.title.as_deref(), Some("A"));
        assert_eq!(column.rows[2].unresolved_id(), Some(&ItemId::from("r2")));
    }

    #[test]
    fn test_column_rows_null_and_malformed() {
        let column: BlockColumn =
            serde_json::from_value(json!({"rows": null})).expect("column");
        assert!(column.rows.is_empty());

        let column: BlockColumn =
            serde_json::from_value(json!({"rows": [1, true, 2]})).expect("column");
        assert_eq!(column.rows.len(), 3);
        assert_eq!(column.rows[0].unresolved_id(), Some(&ItemId::Int(1)));
        assert!(column.rows[1].is_invalid());
        assert_eq!(column.rows[2].unresolved_id(), Some(&ItemId::Int(2)));
    }

    #[test]
    fn test_integer_keyed_records() {
        let column: BlockColumn = serde_json::from_value(json!({
            "id": 1,
            "rows": [3, {"id": 7, "title": "A"}]
        }))
        .expect("column");

        assert_eq!(column.id, Some(ItemId::Int(1)));
        assert_eq!(column.rows.len(), 2);
        assert_eq!(column.rows[0].unresolved_id(), Some(&ItemId::Int(3)));
        let row = column.rows[1].as_resolved().expect("expanded row");
        assert_eq!(row.id, Some(ItemId::Int(7)));

        let block = Block::from_item(BlockKind::Hero, json!({"id": 12, "title": "Hi"}))
            .expect("hero");
        assert_eq!(block.id(), Some(&ItemId::Int(12)));
        assert_eq!(serde_json::to_value(&block).expect("serialize")["item"]["id"], 12);
    }

    #[test]
    fn test_row_back_reference_and_image() {
        let row: BlockColumnRow = serde_json::from_value(json!({
            "block_columns": "c1",
            "image": {"id": "img-1", "description": "Team"},
            "image_position": "left"
        }))
        .expect("row");

        assert_eq!(
            row.block_columns.as_ref().and_then(Relation::unresolved_id),
            Some(&ItemId::from("c1"))
        );
        let image = row.image.as_ref().and_then(Relation::as_resolved).expect("image");
        assert_eq!(image.description.as_deref(), Some("Team"));
    }

    #[test]
    fn test_from_item_typed_block() {
        let block = Block::from_item(BlockKind::Quote, json!({"id": "q1", "content": "Hi"}))
            .expect("quote");
        assert_eq!(block.kind(), BlockKind::Quote);
        assert_eq!(block.id(), Some(&ItemId::from("q1")));
    }

    #[test]
    fn test_from_item_shape_error() {
        let err = Block::from_item(BlockKind::Hero, json!({"title": 12})).unwrap_err();
        assert!(err.to_string().contains("block_hero"));
    }

    #[test]
    fn test_block_serializes_with_collection_tag() {
        let block = Block::Cta(BlockCta {
            id: Some("x".into()),
            ..BlockCta::default()
        });
        let value = serde_json::to_value(&block).expect("serialize");
        assert_eq!(value["collection"], "block_cta");
        assert_eq!(value["item"]["id"], "x");
    }

    #[test]
    fn test_nested_children_for_column() {
        let column: BlockColumn =
            serde_json::from_value(json!({"rows": [1, 2]})).expect("column");
        assert_eq!(column.children().len(), 2);
        assert_eq!(BlockColumn::CHILD_COLLECTION, "block_column_rows");
    }
}
