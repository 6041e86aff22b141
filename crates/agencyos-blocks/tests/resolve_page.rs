//! Page resolution against fixture content on disk.

use std::{fs, path::Path, sync::Arc};

use agencyos_blocks::{MemorySource, ResolvedBlock, Resolver, SkipReason};
use agencyos_core::{Block, BlockKind, ItemId, Relation};

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn fixture_site() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    write(
        root,
        "pages/services.yaml",
        r#"
title: Services
permalink: /services
blocks:
  - collection: block_quote
    item: 1
  - collection: block_quote
    item: 2
  - {}
  - collection: block_columns
    item: cols
  - collection: block_quote
    item: 3
"#,
    );
    write(root, "block_quote/1.yaml", "id: q1\ncontent: First\n");
    write(root, "block_quote/3.json", r#"{"id": "q3", "content": "Third"}"#);
    write(
        root,
        "block_columns/cols.yaml",
        "id: cols\nrows:\n  - 10\n  - id: inline\n    title: Inline row\n  - 11\n",
    );
    write(root, "block_column_rows/10.yaml", "id: r10\ntitle: Fetched row\n");
    dir
}

#[tokio::test]
async fn test_missing_block_keeps_its_position() {
    let site = fixture_site();
    let source = MemorySource::from_dir(site.path()).unwrap();
    let resolver = Resolver::new(Arc::new(source)).with_max_concurrent(2);

    let page = resolver.load_page("/services").await.unwrap().unwrap();
    assert_eq!(page.title.as_deref(), Some("Services"));
    assert_eq!(page.blocks.len(), 5);

    let ids: Vec<Option<String>> = page
        .ready_blocks()
        .map(|block| block.id().map(ItemId::to_string))
        .collect();
    assert_eq!(
        ids,
        [Some("q1".to_string()), Some("cols".to_string()), Some("q3".to_string())]
    );

    assert_eq!(
        page.blocks[1],
        ResolvedBlock::Missing {
            kind: BlockKind::Quote,
            id: ItemId::Int(2)
        }
    );
    assert_eq!(
        page.blocks[2],
        ResolvedBlock::Skipped {
            reason: SkipReason::MissingCollection
        }
    );
}

#[tokio::test]
async fn test_column_rows_are_expanded_in_order() {
    let site = fixture_site();
    let source = MemorySource::from_dir(site.path()).unwrap();
    let resolver = Resolver::new(Arc::new(source));

    let page = resolver.load_page("/services").await.unwrap().unwrap();
    let Some(Block::Columns(columns)) = page.blocks[3].as_ready() else {
        panic!("expected a columns block, got {:?}", page.blocks[3]);
    };

    assert_eq!(columns.rows.len(), 3);
    let first = columns.rows[0].as_resolved().expect("row 10 fetched");
    assert_eq!(first.title.as_deref(), Some("Fetched row"));
    let second = columns.rows[1].as_resolved().expect("inline row kept");
    assert_eq!(second.title.as_deref(), Some("Inline row"));
    assert_eq!(columns.rows[2], Relation::Unresolved(ItemId::Int(11)));
}
