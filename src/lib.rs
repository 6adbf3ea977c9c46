//! # Rust User Store
//!
//! Relational storage access layer for the user-management service. It turns
//! typed intents ("insert this user", "select users matching this filter")
//! into SQL, runs that SQL on a pooled connection under a caller-supplied
//! deadline and hands rows back through caller-supplied parsers.
//!
//! ## Features
//!
//! - **Query builders**: select / insert / update / delete / stored-function
//!   builders plus `IN` filters, validated as they are filled
//! - **Deadlines everywhere**: every backend call runs under
//!   [`core::execute_with_context`]; late results are cleaned up, never leaked
//! - **Scanning contracts**: exactly-one-row and all-rows scans with typed
//!   column decoding
//! - **Layered errors**: connection, translation, execution, data and
//!   contract failures, each keeping its cause
//! - **Pluggable backends**: PostgreSQL through `deadpool-postgres`, or any
//!   [`core::PoolFactory`]
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! rust_user_store = "0.1"
//! tokio = { version = "1", features = ["full"] }
//! ```
//!
//! ```rust,no_run
//! use rust_user_store::prelude::*;
//! use std::sync::Arc;
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::default()
//!         .with_host("localhost")
//!         .with_name("users")
//!         .with_credentials("service", "secret");
//!
//!     let db = Arc::new(PostgresPoolFactory::database(config));
//!     let ctx = Context::background();
//!     db.connect(&ctx).await?;
//!
//!     let executor = QueryExecutor::new(db.clone());
//!
//!     let mut select = SelectQueryBuilder::new();
//!     select.set_table("users")?.add_prop("id")?.add_prop("name")?;
//!
//!     let mut users = Vec::new();
//!     executor
//!         .run_query_and_scan_all_results(&ctx, &select, |row: &Row| -> Result<()> {
//!             users.push(row.scan::<(Uuid, String)>()?);
//!             Ok(())
//!         })
//!         .await?;
//!
//!     db.disconnect(&ctx).await
//! }
//! ```
//!
//! ## Project Structure
//!
//! ```text
//! src/
//! ├── core/
//! │   ├── command_tag.rs     # affected-row extraction
//! │   ├── config.rs          # connection settings
//! │   ├── context.rs         # request id, deadline, cancellation
//! │   ├── database.rs        # Database facade, pool seams
//! │   ├── error.rs           # error taxonomy
//! │   ├── executor.rs        # deadline-bounded execution
//! │   ├── query.rs           # Query / Filter
//! │   ├── query_builder.rs   # statement builders
//! │   ├── query_executor.rs  # build + run + scan
//! │   ├── result.rs          # ExecutionResult
//! │   ├── rows.rs            # Rows, RowCursor, RowParser
//! │   ├── serialization.rs   # SqlValue rendering
//! │   └── value.rs           # DatabaseValue, Row
//! ├── backends/
//! │   └── postgres.rs        # deadpool-postgres pool factory
//! └── lib.rs
//! ```

/// Core storage types and traits
pub mod core;

/// Database backend implementations
pub mod backends;

/// Prelude for convenient imports
///
/// ```rust
/// use rust_user_store::prelude::*;
///
/// let mut filter = InFilterBuilder::new();
/// filter.set_key("id").unwrap().add_value("a").unwrap();
/// assert_eq!(filter.build().unwrap().sql(), "id in ('a')");
/// ```
pub mod prelude {
    pub use crate::core::{
        Config, Context, Database, DatabaseError, DatabaseValue, DeleteQueryBuilder,
        ExecutionResult, Filter, FilterBuilder, InFilterBuilder, InsertQueryBuilder, Query,
        QueryBuilder, QueryExecutor, Result, Row, RowParser, Rows, ScriptQueryBuilder,
        SelectQueryBuilder, SqlValue, UpdateQueryBuilder,
    };

    #[cfg(feature = "postgres")]
    pub use crate::backends::PostgresPoolFactory;
}

// Re-export at root level for convenience
pub use core::{
    Config, Context, Database, DatabaseError, DatabaseValue, ExecutionResult, Query,
    QueryExecutor, Result, Row, Rows,
};

#[cfg(feature = "postgres")]
pub use backends::PostgresPoolFactory;
