//! User repository example
//!
//! This example walks a user record through the storage layer:
//! - Loading connection settings from `store.toml` and `DB_*` variables
//! - Connecting under a deadline
//! - Inserting, reading, renaming and deleting a user
//! - Reading the error taxonomy when a contract is broken
//!
//! It expects a reachable PostgreSQL database with this table:
//!
//! ```sql
//! CREATE TABLE users (
//!     id uuid PRIMARY KEY,
//!     mail text NOT NULL,
//!     name text NOT NULL,
//!     password text NOT NULL,
//!     created_at timestamptz NOT NULL DEFAULT now()
//! );
//! ```
//!
//! Run with: DB_HOST=localhost DB_NAME=users DB_USER=.. DB_PASSWORD=.. cargo run --example user_repository

use chrono::{DateTime, Utc};
use rust_user_store::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const USERS: &str = "users";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("=== Rust User Store - User Repository Example ===\n");

    let config = Config::load("store.toml")
        .map_err(|e| DatabaseError::other(format!("invalid configuration: {e}")))?;
    println!("1. Loaded configuration for {config}\n");

    let db = Arc::new(PostgresPoolFactory::database(config));
    let ctx = Context::background().with_timeout(Duration::from_secs(10));
    db.connect(&ctx).await?;
    println!("2. Connected (request {})\n", ctx.request_id());

    let executor = QueryExecutor::new(db.clone());
    let id = Uuid::new_v4();

    // Insert
    let mut insert = InsertQueryBuilder::new();
    insert
        .set_table(USERS)?
        .add_element("id", id)?
        .add_element("mail", "ada@example.org")?
        .add_element("name", "ada")?
        .add_element("password", "engine")?
        .set_verbose(true);
    executor.execute_query_affecting_single_row(&ctx, &insert).await?;
    println!("3. Inserted user {id}\n");

    // Read it back
    let mut by_id = InFilterBuilder::new();
    by_id.set_key("id")?.add_value(id)?;

    let mut select = SelectQueryBuilder::new();
    select
        .set_table(USERS)?
        .add_prop("mail")?
        .add_prop("name")?
        .add_prop("created_at")?
        .set_filter(by_id.build()?)?;

    let mut found: Option<(String, String, DateTime<Utc>)> = None;
    executor
        .run_query_and_scan_single_result(&ctx, &select, |row: &Row| -> Result<()> {
            found = Some(row.scan()?);
            Ok(())
        })
        .await?;
    if let Some((mail, name, created_at)) = &found {
        println!("4. Found {name} <{mail}>, created {created_at}\n");
    }

    // Rename
    let mut update = UpdateQueryBuilder::new();
    update
        .set_table(USERS)?
        .add_update("name", "countess")?
        .set_filter(by_id.build()?)?;
    executor.execute_query_affecting_single_row(&ctx, &update).await?;
    println!("5. Renamed user\n");

    // Delete, then show what a broken contract looks like
    let mut delete = DeleteQueryBuilder::new();
    delete.set_table(USERS)?.set_filter(by_id.build()?)?;
    let removed = executor.execute_query(&ctx, &delete).await?;
    println!("6. Deleted {removed} row(s)\n");

    match executor
        .run_query_and_scan_single_result(&ctx, &select, |_: &Row| -> Result<()> { Ok(()) })
        .await
    {
        Err(err) => println!("7. Lookup after delete failed as expected: {err} ({:?})\n", err.kind()),
        Ok(()) => println!("7. Unexpectedly found the deleted user\n"),
    }

    db.disconnect(&ctx).await?;
    println!("=== Example completed successfully ===");
    Ok(())
}
