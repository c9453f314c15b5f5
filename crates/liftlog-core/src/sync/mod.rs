//! Write-through synchronization between the relational store and the
//! search index.
//!
//! A commit runs in three steps: [`ChangeTracker::capture`] moves the
//! session's pending entities into its [`TransactionContext`], the session
//! writes them in one SQL transaction, and [`IndexSynchronizer::apply`]
//! drains the context into the index once that transaction has committed.

mod synchronizer;
mod tracker;

pub use synchronizer::{IndexSynchronizer, SyncFailure, SyncOperation, SyncReport};
pub use tracker::{ChangeSet, ChangeTracker, TransactionContext};
