//! Thin SQLite access helper for small Runar applications.
//!
//! # Intention
//!
//! - Wrap a single connection behind four operations: select, insert,
//!   update, delete.
//! - Build write statements from column → value maps, escaping every value.
//! - Surface every engine failure with its SQL text and message, never
//!   swallow it.
//!
//! # Architectural Boundaries
//!
//! - Table names and WHERE clauses are trusted and passed through verbatim.
//! - No query builder, pooling, statement caching or transactions.
//! - The host application builds one [`Database`] (or [`DatabaseService`])
//!   and injects it; there is no global instance.

pub mod config;
pub mod database;
pub mod error;
pub mod service;
pub mod shared;
pub mod sink;
pub mod statement;
pub mod value;

pub use config::{DatabaseConfig, FailurePolicy};
pub use database::{Database, ReturnId, Row};
pub use error::{Error, Result};
pub use service::{DatabaseService, Lifecycle};
pub use shared::SharedDatabase;
pub use sink::{DiagnosticSink, TracingSink};
pub use statement::ColumnValueMap;
pub use value::Value;
