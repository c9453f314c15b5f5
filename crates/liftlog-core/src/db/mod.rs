//! SQLite relational store.
//!
//! This module provides:
//! - Connection setup and schema creation
//! - Locked access and write transactions for sessions

mod database;

pub use database::Database;
