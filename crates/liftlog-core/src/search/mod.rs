//! Full-text search over workouts and exercises.
//!
//! This module provides:
//! - The [`IndexClient`] contract and its backends (Elasticsearch over HTTP,
//!   SQLite FTS5, in-memory)
//! - The [`SearchIndex`] handle, which turns every call into a no-op when no
//!   backend is configured
//! - The [`Searchable`] capability and the rank-preserving [`RankedQuery`]

mod client;
mod elasticsearch;
mod fts5;
mod memory;
mod query;
mod searchable;

pub use client::{page_offset, IndexClient, IndexDocument, SearchHits, SearchIndex};
pub use elasticsearch::ElasticsearchClient;
pub use fts5::{Fts5Index, Fts5Stats};
pub use memory::{IndexCall, MemoryIndex};
pub use query::{build_fts5_query, escape_fts5_term, tokenize};
pub use searchable::{RankedQuery, Searchable, SearchableModel};
