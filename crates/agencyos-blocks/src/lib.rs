//! AgencyOS Block Resolution
//!
//! Turns a page's block references into typed block records.
//!
//! # Modules
//!
//! - [`resolver`] - Reference classification and page resolution
//! - [`source`] - The content source collaborator
//! - [`directus`] - Directus REST content source
//! - [`memory`] - In-memory and fixture-backed content source

pub mod directus;
pub mod memory;
pub mod resolver;
pub mod source;

pub use directus::DirectusSource;
pub use memory::MemorySource;
pub use resolver::{
    Child, ChildOutcome, ResolveError, ResolvedBlock, ResolvedPage, Resolver, SkipReason,
    resolve, resolve_children,
};
pub use source::{ContentSource, SourceError};
