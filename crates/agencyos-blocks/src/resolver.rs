//! Block resolution.
//!
//! A page lists its blocks as references: a collection name plus either the
//! block's identifier or the block record itself. [`resolve`] classifies one
//! reference without any IO; [`Resolver`] completes a whole page by fetching
//! the references that only carry an identifier.
//!
//! Resolution never reorders blocks and never drops one silently: every input
//! reference yields exactly one output entry, in the same position.

use std::sync::Arc;

use agencyos_core::{
    Block, BlockKind, BlockRef, FailurePolicy, ItemId, Nested, Page, Relation,
    config::ContentConfig, content::json_kind,
};
use chrono::{DateTime, Utc};
use futures::{FutureExt, Stream, StreamExt, TryStreamExt, future::BoxFuture, stream};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::source::{ContentSource, SourceError};

/// Resolution errors.
///
/// Only transport failures surface here; missing and malformed blocks are
/// reported in place as [`ResolvedBlock`] markers.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// A record fetch failed.
    #[error("failed to fetch {collection}:{id}: {source}")]
    Fetch {
        collection: String,
        id: ItemId,
        #[source]
        source: SourceError,
    },

    /// The page fetch failed.
    #[error("failed to fetch page {permalink}: {source}")]
    Page {
        permalink: String,
        #[source]
        source: SourceError,
    },

    /// The content source returned something that is not a page.
    #[error("invalid page record for {permalink}: {source}")]
    InvalidPage {
        permalink: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for resolution.
pub type Result<T> = std::result::Result<T, ResolveError>;

/// Why a reference was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    #[error("block is hidden")]
    Hidden,

    #[error("reference has no collection")]
    MissingCollection,

    #[error("unknown block collection '{0}'")]
    UnknownKind(String),

    #[error("{kind} reference has no item")]
    MissingItem { kind: BlockKind },

    #[error("{kind} reference item is {found}, expected an identifier or an object")]
    InvalidItem { kind: BlockKind, found: &'static str },

    #[error("{kind} record is malformed: {message}")]
    InvalidRecord { kind: BlockKind, message: String },
}

/// Outcome of resolving one block reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResolvedBlock {
    /// A typed block ready for rendering.
    Ready(Block),

    /// Only the identifier is known; the record must be fetched.
    Pending { kind: BlockKind, id: ItemId },

    /// The content source has no such record.
    Missing { kind: BlockKind, id: ItemId },

    /// The fetch failed and the page chose to render without it.
    Failed {
        kind: BlockKind,
        id: ItemId,
        error: String,
    },

    /// The reference is unusable and is left out of the page.
    Skipped { reason: SkipReason },
}

impl ResolvedBlock {
    pub fn as_ready(&self) -> Option<&Block> {
        match self {
            Self::Ready(block) => Some(block),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Block kind, when the reference named a known one.
    pub fn kind(&self) -> Option<BlockKind> {
        match self {
            Self::Ready(block) => Some(block.kind()),
            Self::Pending { kind, .. } | Self::Missing { kind, .. } | Self::Failed { kind, .. } => {
                Some(*kind)
            }
            Self::Skipped { reason } => match reason {
                SkipReason::MissingItem { kind }
                | SkipReason::InvalidItem { kind, .. }
                | SkipReason::InvalidRecord { kind, .. } => Some(*kind),
                _ => None,
            },
        }
    }
}

/// A nested child as found in its parent, before any fetch.
#[derive(Debug, PartialEq)]
pub enum Child<'a, T> {
    /// The child is only referenced by identifier.
    Pending(&'a ItemId),
    /// The child record is expanded inline.
    Ready(&'a T),
    /// The child entry was unreadable.
    Invalid(&'a str),
}

impl<T> Clone for Child<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Child<'_, T> {}

/// A nested child after the resolver tried to fetch it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum ChildOutcome<T> {
    Ready(T),
    Missing(ItemId),
    Failed { id: ItemId, error: String },
    /// The record was unreadable. `id` is absent when the parent's entry
    /// itself was malformed.
    Invalid {
        id: Option<ItemId>,
        message: String,
    },
}

/// A page with every block reference settled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedPage {
    pub id: Option<ItemId>,
    pub title: Option<String>,
    pub permalink: Option<String>,
    pub date_updated: Option<DateTime<Utc>>,
    /// One entry per input reference, in input order.
    pub blocks: Vec<ResolvedBlock>,
}

impl ResolvedPage {
    /// Blocks that can be rendered, in page order.
    pub fn ready_blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter().filter_map(ResolvedBlock::as_ready)
    }

    /// Number of blocks that are not ready.
    pub fn unavailable_count(&self) -> usize {
        self.blocks.iter().filter(|b| !b.is_ready()).count()
    }
}

/// Classify a block reference without fetching anything.
///
/// An inline record is returned as a typed block; an identifier yields
/// [`ResolvedBlock::Pending`]; anything else is skipped with a reason.
pub fn resolve(reference: &BlockRef) -> ResolvedBlock {
    let skip = |reason| ResolvedBlock::Skipped { reason };

    if reference.hide_block == Some(true) {
        return skip(SkipReason::Hidden);
    }
    let Some(collection) = reference.collection.as_deref() else {
        return skip(SkipReason::MissingCollection);
    };
    let Some(kind) = BlockKind::from_collection(collection) else {
        return skip(SkipReason::UnknownKind(collection.to_string()));
    };

    if let Some(id) = ItemId::from_value(&reference.item) {
        return ResolvedBlock::Pending { kind, id };
    }
    match &reference.item {
        Value::Object(_) => ready_or_invalid(kind, reference.item.clone()),
        Value::Null => skip(SkipReason::MissingItem { kind }),
        other => skip(SkipReason::InvalidItem {
            kind,
            found: json_kind(other),
        }),
    }
}

fn ready_or_invalid(kind: BlockKind, record: Value) -> ResolvedBlock {
    match Block::from_item(kind, record) {
        Ok(block) => ResolvedBlock::Ready(block),
        Err(e) => ResolvedBlock::Skipped {
            reason: SkipReason::InvalidRecord {
                kind,
                message: e.to_string(),
            },
        },
    }
}

/// Classify the nested children of a record, keeping their order.
pub fn resolve_children<N: Nested>(parent: &N) -> Vec<Child<'_, N::Child>> {
    parent
        .children()
        .iter()
        .map(|child| match child {
            Relation::Unresolved(id) => Child::Pending(id),
            Relation::Resolved(record) => Child::Ready(record.as_ref()),
            Relation::Invalid(message) => Child::Invalid(message),
        })
        .collect()
}

/// Resolves pages against a content source.
#[derive(Clone)]
pub struct Resolver {
    source: Arc<dyn ContentSource>,
    depth: u8,
    max_concurrent: usize,
    policy: FailurePolicy,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("depth", &self.depth)
            .field("max_concurrent", &self.max_concurrent)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Resolver {
    /// Create a resolver with depth 2, eight concurrent fetches and the
    /// fallback failure policy.
    pub fn new(source: Arc<dyn ContentSource>) -> Self {
        Self {
            source,
            depth: 2,
            max_concurrent: 8,
            policy: FailurePolicy::Fallback,
        }
    }

    /// Create a resolver from the `[content]` configuration section.
    pub fn from_config(source: Arc<dyn ContentSource>, config: &ContentConfig) -> Self {
        Self::new(source)
            .with_depth(config.depth)
            .with_max_concurrent(config.max_concurrent_fetches)
            .with_policy(config.on_fetch_failure)
    }

    /// Relation depth requested from the content source.
    #[must_use]
    pub fn with_depth(mut self, depth: u8) -> Self {
        self.depth = depth.max(1);
        self
    }

    #[must_use]
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Fetch the page at `permalink` and resolve it.
    ///
    /// Returns `Ok(None)` when no page has that permalink.
    #[instrument(skip(self))]
    pub async fn load_page(&self, permalink: &str) -> Result<Option<ResolvedPage>> {
        let record = self
            .source
            .fetch_page(permalink, self.depth)
            .await
            .map_err(|source| ResolveError::Page {
                permalink: permalink.to_string(),
                source,
            })?;
        let Some(record) = record else {
            debug!("page not found");
            return Ok(None);
        };

        let page: Page =
            serde_json::from_value(record).map_err(|source| ResolveError::InvalidPage {
                permalink: permalink.to_string(),
                source,
            })?;
        self.resolve_page(&page).await.map(Some)
    }

    /// Resolve every block of a page.
    ///
    /// Blocks are fetched concurrently; the output keeps the input order.
    /// Dropping the returned future abandons all outstanding fetches.
    pub async fn resolve_page(&self, page: &Page) -> Result<ResolvedPage> {
        let blocks: Vec<ResolvedBlock> = self.settle_all(&page.blocks).try_collect().await?;

        let resolved = ResolvedPage {
            id: page.id.clone(),
            title: page.title.clone(),
            permalink: page.permalink.clone(),
            date_updated: page.date_updated,
            blocks,
        };
        info!(
            permalink = page.permalink.as_deref().unwrap_or_default(),
            blocks = resolved.blocks.len(),
            unavailable = resolved.unavailable_count(),
            "page resolved"
        );
        Ok(resolved)
    }

    /// Settle references with bounded concurrency, yielding in input order.
    fn settle_all<'a>(
        &'a self,
        references: &'a [BlockRef],
    ) -> impl Stream<Item = Result<ResolvedBlock>> + Send + 'a {
        let settle = move |reference: &'a BlockRef| -> BoxFuture<'a, Result<ResolvedBlock>> {
            self.settle(reference).boxed()
        };
        stream::iter(references.iter().map(settle)).buffered(self.max_concurrent)
    }

    /// Resolve one reference all the way: fetch it if needed, then expand
    /// its nested children.
    async fn settle(&self, reference: &BlockRef) -> Result<ResolvedBlock> {
        let resolved = match resolve(reference) {
            ResolvedBlock::Pending { kind, id } => self.fetch_block(kind, &id).await?,
            ResolvedBlock::Skipped { reason } => {
                warn!(%reason, "skipping block reference");
                ResolvedBlock::Skipped { reason }
            }
            other => other,
        };

        match resolved {
            ResolvedBlock::Ready(Block::Columns(mut column)) => {
                self.expand_in_place(&mut column).await?;
                Ok(ResolvedBlock::Ready(Block::Columns(column)))
            }
            other => Ok(other),
        }
    }

    /// Fetch a block by identifier.
    pub async fn fetch_block(&self, kind: BlockKind, id: &ItemId) -> Result<ResolvedBlock> {
        let collection = kind.collection();
        match self.source.fetch_item(collection, id, self.depth).await {
            Ok(Some(record)) => Ok(ready_or_invalid(kind, record)),
            Ok(None) => {
                warn!(%collection, %id, "block record not found");
                Ok(ResolvedBlock::Missing {
                    kind,
                    id: id.clone(),
                })
            }
            Err(source) => match self.policy {
                FailurePolicy::Fallback => Err(ResolveError::Fetch {
                    collection: collection.to_string(),
                    id: id.clone(),
                    source,
                }),
                FailurePolicy::Partial => {
                    warn!(%collection, %id, error = %source, "block fetch failed");
                    Ok(ResolvedBlock::Failed {
                        kind,
                        id: id.clone(),
                        error: source.to_string(),
                    })
                }
            },
        }
    }

    /// Fetch the unresolved children of a record, keeping their order.
    pub async fn expand_children<'a, N>(
        &'a self,
        parent: &'a N,
    ) -> Result<Vec<ChildOutcome<N::Child>>>
    where
        N: Nested + Sync,
        N::Child: DeserializeOwned + Clone + Send + Sync + 'a,
    {
        let settle =
            move |child: Child<'a, N::Child>| -> BoxFuture<'a, Result<ChildOutcome<N::Child>>> {
                self.settle_child(N::CHILD_COLLECTION, child).boxed()
            };
        let pending: Vec<BoxFuture<'a, Result<ChildOutcome<N::Child>>>> =
            resolve_children(parent).into_iter().map(settle).collect();
        stream::iter(pending)
            .buffered(self.max_concurrent)
            .try_collect()
            .await
    }

    async fn settle_child<T>(&self, collection: &str, child: Child<'_, T>) -> Result<ChildOutcome<T>>
    where
        T: DeserializeOwned + Clone + Sync,
    {
        let id = match child {
            Child::Ready(record) => return Ok(ChildOutcome::Ready(record.clone())),
            Child::Invalid(message) => {
                return Ok(ChildOutcome::Invalid {
                    id: None,
                    message: message.to_string(),
                });
            }
            Child::Pending(id) => id,
        };

        match self.source.fetch_item(collection, id, self.depth).await {
            Ok(Some(record)) => Ok(match serde_json::from_value(record) {
                Ok(child) => ChildOutcome::Ready(child),
                Err(e) => {
                    warn!(%collection, %id, error = %e, "malformed child record");
                    ChildOutcome::Invalid {
                        id: Some(id.clone()),
                        message: e.to_string(),
                    }
                }
            }),
            Ok(None) => {
                warn!(%collection, %id, "child record not found");
                Ok(ChildOutcome::Missing(id.clone()))
            }
            Err(source) => match self.policy {
                FailurePolicy::Fallback => Err(ResolveError::Fetch {
                    collection: collection.to_string(),
                    id: id.clone(),
                    source,
                }),
                FailurePolicy::Partial => {
                    warn!(%collection, %id, error = %source, "child fetch failed");
                    Ok(ChildOutcome::Failed {
                        id: id.clone(),
                        error: source.to_string(),
                    })
                }
            },
        }
    }

    /// Replace fetched children with their records.
    ///
    /// Children that could not be fetched stay unresolved so the renderer
    /// can mark their position.
    async fn expand_in_place<N>(&self, parent: &mut N) -> Result<()>
    where
        N: Nested + Sync,
        N::Child: DeserializeOwned + Clone + Send + Sync,
    {
        if parent.children().iter().all(|child| child.unresolved_id().is_none()) {
            return Ok(());
        }

        let outcomes = self.expand_children(parent).await?;
        for (slot, outcome) in parent.children_mut().iter_mut().zip(outcomes) {
            if let ChildOutcome::Ready(record) = outcome {
                *slot = Relation::Resolved(Box::new(record));
            }
        }
        Ok(())
    }
}
