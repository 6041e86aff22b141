//! AgencyOS Core Library
//!
//! Configuration, error handling, and the content data model shared by the
//! block resolver, the renderer, and the portal binary.

pub mod blocks;
pub mod config;
pub mod content;
pub mod error;

pub use blocks::{
    Block, BlockColumn, BlockColumnRow, BlockCta, BlockHero, BlockKind, BlockQuote, BlockRichText,
    Nested,
};
pub use config::{Config, FailurePolicy};
pub use content::{BlockRef, File, ItemId, Page, Relation};
pub use error::{CoreError, Result};
