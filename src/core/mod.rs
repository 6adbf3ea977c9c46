//! Core storage types and traits
//!
//! This module provides the building blocks of the storage layer: SQL
//! builders, the value serializer, the deadline-bounded executor, result
//! sets, the database facade and the error taxonomy.

pub mod command_tag;
pub mod config;
pub mod context;
pub mod database;
pub mod error;
pub mod executor;
pub mod query;
pub mod query_builder;
pub mod query_executor;
pub mod result;
pub mod rows;
pub mod serialization;
pub mod value;

// Re-export commonly used types
pub use command_tag::parse_command_tag;
pub use config::{Config, PoolParams};
pub use context::Context;
pub use database::{ConnectionPool, Database, PoolFactory, PooledDatabase};
pub use error::{BoxError, DatabaseError, ErrorKind, Result};
pub use executor::{execute_with_context, Process};
pub use query::{Filter, Query};
pub use query_builder::{
    DeleteQueryBuilder, FilterBuilder, InFilterBuilder, InsertQueryBuilder, QueryBuilder,
    ScriptQueryBuilder, SelectQueryBuilder, UpdateQueryBuilder,
};
pub use query_executor::QueryExecutor;
pub use result::ExecutionResult;
pub use rows::{RowCursor, RowParser, Rows};
pub use serialization::{serialize, Convertible, SqlValue, StructuredValue};
pub use value::{DatabaseValue, FromRow, FromValue, Row};
