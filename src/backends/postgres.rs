//! PostgreSQL backend
//!
//! [`PostgresPoolFactory`] opens a `deadpool-postgres` pool for
//! [`PooledDatabase`]. Statements are sent as built, without bind
//! parameters. A query keeps its pooled client checked out until the returned
//! cursor is closed.

use crate::core::{
    config::{Config, PoolParams},
    database::{ConnectionPool, PoolFactory, PooledDatabase},
    error::{DatabaseError, Result},
    rows::RowCursor,
    value::{DatabaseValue, Row},
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod};
use std::collections::VecDeque;
use std::net::IpAddr;
use std::sync::Arc;
use tokio_postgres::NoTls;
use tracing::debug;

/// Creates PostgreSQL pools over plain TCP
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresPoolFactory;

impl PostgresPoolFactory {
    /// A disconnected facade backed by PostgreSQL
    pub fn database(config: Config) -> PooledDatabase {
        PooledDatabase::new(config, Arc::new(PostgresPoolFactory))
    }
}

#[async_trait]
impl PoolFactory for PostgresPoolFactory {
    async fn create(&self, params: PoolParams) -> Result<Arc<dyn ConnectionPool>> {
        let pg_config: tokio_postgres::Config = params.connection_string().parse()?;

        let manager = Manager::from_config(
            pg_config,
            NoTls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );
        let pool = Pool::builder(manager)
            .max_size(params.max_size)
            .build()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create pool: {e}")))?;

        // Pools connect lazily; check out one client so bad credentials fail here
        let client = pool
            .get()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to acquire initial connection: {e}")))?;
        drop(client);

        debug!(host = %params.host, max_size = params.max_size, "postgres pool ready");
        Ok(Arc::new(PostgresPool { pool }))
    }
}

/// A live `deadpool-postgres` pool
pub struct PostgresPool {
    pool: Pool,
}

impl PostgresPool {
    async fn client(&self) -> Result<Object> {
        self.pool
            .get()
            .await
            .map_err(|e| DatabaseError::Pool(e.to_string()))
    }
}

#[async_trait]
impl ConnectionPool for PostgresPool {
    async fn query(&self, sql: &str) -> Result<Box<dyn RowCursor>> {
        let client = self.client().await?;
        let rows = client.query(sql, &[]).await?;
        Ok(Box::new(PostgresCursor {
            client: Some(client),
            rows: rows.into(),
        }))
    }

    async fn execute(&self, sql: &str) -> Result<String> {
        let client = self.client().await?;
        let affected = client.execute(sql, &[]).await?;
        Ok(command_tag_for(sql, affected))
    }

    fn close(&self) {
        self.pool.close();
    }
}

/// Rebuild the server command tag, which tokio-postgres reduces to a count
fn command_tag_for(sql: &str, affected: u64) -> String {
    let verb = sql
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();
    match verb.as_str() {
        "INSERT" => format!("INSERT 0 {affected}"),
        _ => format!("{verb} {affected}"),
    }
}

/// Buffered result set holding its pooled client until closed
struct PostgresCursor {
    client: Option<Object>,
    rows: VecDeque<tokio_postgres::Row>,
}

impl RowCursor for PostgresCursor {
    fn next_row(&mut self) -> Result<Option<Row>> {
        match self.rows.pop_front() {
            Some(row) => convert_row(&row).map(Some),
            None => Ok(None),
        }
    }

    fn close(&mut self) {
        self.rows.clear();
        self.client.take();
    }
}

fn cell<'a, T>(row: &'a tokio_postgres::Row, idx: usize, wrap: fn(T) -> DatabaseValue) -> Result<DatabaseValue>
where
    T: tokio_postgres::types::FromSql<'a>,
{
    Ok(row
        .try_get::<_, Option<T>>(idx)?
        .map(wrap)
        .unwrap_or(DatabaseValue::Null))
}

/// How a PostgreSQL column type is decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Bool,
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    Bytes,
    Uuid,
    TimestampTz,
    Timestamp,
    Date,
    Time,
    Inet,
    Json,
    Text,
    Other,
}

fn column_kind(type_name: &str) -> ColumnKind {
    match type_name {
        "bool" => ColumnKind::Bool,
        "int2" => ColumnKind::Int2,
        "int4" => ColumnKind::Int4,
        "int8" => ColumnKind::Int8,
        "float4" => ColumnKind::Float4,
        "float8" => ColumnKind::Float8,
        "bytea" => ColumnKind::Bytes,
        "uuid" => ColumnKind::Uuid,
        "timestamptz" => ColumnKind::TimestampTz,
        "timestamp" => ColumnKind::Timestamp,
        "date" => ColumnKind::Date,
        "time" => ColumnKind::Time,
        "inet" => ColumnKind::Inet,
        "json" | "jsonb" => ColumnKind::Json,
        "text" | "varchar" | "bpchar" | "name" | "citext" => ColumnKind::Text,
        _ => ColumnKind::Other,
    }
}

/// Error for a column whose type has no `DatabaseValue` mapping
fn unsupported_column(column: &str, type_name: &str) -> DatabaseError {
    DatabaseError::type_mismatch(
        "text-compatible column",
        &format!("{type_name} in column {column}"),
    )
}

fn convert_row(row: &tokio_postgres::Row) -> Result<Row> {
    let mut cells = Vec::with_capacity(row.len());

    for (idx, column) in row.columns().iter().enumerate() {
        let type_name = column.type_().name();
        let value = match column_kind(type_name) {
            ColumnKind::Bool => cell(row, idx, DatabaseValue::Bool)?,
            ColumnKind::Int2 => cell(row, idx, |v: i16| DatabaseValue::Int(v.into()))?,
            ColumnKind::Int4 => cell(row, idx, DatabaseValue::Int)?,
            ColumnKind::Int8 => cell(row, idx, DatabaseValue::Long)?,
            ColumnKind::Float4 => cell(row, idx, |v: f32| DatabaseValue::Double(v.into()))?,
            ColumnKind::Float8 => cell(row, idx, DatabaseValue::Double)?,
            ColumnKind::Bytes => cell(row, idx, DatabaseValue::Bytes)?,
            ColumnKind::Uuid => cell(row, idx, DatabaseValue::Uuid)?,
            ColumnKind::TimestampTz => {
                cell::<DateTime<Utc>>(row, idx, DatabaseValue::Timestamp)?
            }
            ColumnKind::Timestamp => cell(row, idx, |v: NaiveDateTime| {
                DatabaseValue::Timestamp(v.and_utc())
            })?,
            ColumnKind::Date => cell(row, idx, |v: NaiveDate| DatabaseValue::String(v.to_string()))?,
            ColumnKind::Time => cell(row, idx, |v: NaiveTime| DatabaseValue::String(v.to_string()))?,
            ColumnKind::Inet => cell(row, idx, |v: IpAddr| DatabaseValue::String(v.to_string()))?,
            ColumnKind::Json => cell(row, idx, DatabaseValue::Json)?,
            ColumnKind::Text => cell(row, idx, DatabaseValue::String)?,
            ColumnKind::Other => cell(row, idx, DatabaseValue::String)
                .map_err(|_| unsupported_column(column.name(), type_name))?,
        };
        cells.push((column.name().to_string(), value));
    }

    Ok(Row::new(cells))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::Context;
    use crate::core::database::Database;
    use crate::core::query_builder::{DeleteQueryBuilder, InsertQueryBuilder, SelectQueryBuilder};
    use crate::core::query_executor::QueryExecutor;
    use uuid::Uuid;

    #[test]
    fn test_command_tag_for() {
        assert_eq!(command_tag_for("INSERT INTO t (a) VALUES ('1')", 1), "INSERT 0 1");
        assert_eq!(command_tag_for("delete from t", 4), "DELETE 4");
        assert_eq!(command_tag_for("UPDATE t SET a = '1'", 0), "UPDATE 0");
    }

    #[test]
    fn test_column_kinds() {
        assert_eq!(column_kind("date"), ColumnKind::Date);
        assert_eq!(column_kind("time"), ColumnKind::Time);
        assert_eq!(column_kind("inet"), ColumnKind::Inet);
        assert_eq!(column_kind("varchar"), ColumnKind::Text);
        assert_eq!(column_kind("jsonb"), ColumnKind::Json);
        assert_eq!(column_kind("numeric"), ColumnKind::Other);
    }

    #[test]
    fn test_unsupported_column_is_type_mismatch() {
        let err = unsupported_column("balance", "numeric");
        assert!(matches!(
            &err,
            DatabaseError::TypeMismatch { actual, .. } if actual == "numeric in column balance"
        ));
        assert_eq!(err.kind(), crate::core::error::ErrorKind::Data);
    }

    #[test]
    fn test_pool_params_parse_as_postgres_config() {
        let params = Config::default()
            .with_host("db.internal")
            .with_name("users")
            .with_credentials("service", "it's a secret")
            .to_pool_params();

        let pg: tokio_postgres::Config = params.connection_string().parse().unwrap();
        assert_eq!(pg.get_dbname(), Some("users"));
        assert_eq!(pg.get_user(), Some("service"));
        assert_eq!(pg.get_password(), Some("it's a secret".as_bytes()));
        assert_eq!(pg.get_ports(), &[5432]);
    }

    /// Live settings from `DB_*` variables, or `None` to skip
    fn live_config() -> Option<Config> {
        Config::from_env().ok().filter(Config::valid)
    }

    #[tokio::test]
    #[ignore] // Run with: DB_HOST=.. DB_NAME=.. DB_USER=.. DB_PASSWORD=.. cargo test -- --ignored
    async fn test_postgres_round_trip() -> Result<()> {
        let Some(config) = live_config() else {
            eprintln!("Skipping test: DB_* settings not set");
            return Ok(());
        };

        let db = Arc::new(PostgresPoolFactory::database(config));
        let ctx = Context::background();
        db.connect(&ctx).await?;
        let executor = QueryExecutor::new(db.clone());

        let create = crate::core::query::Query::new(
            "CREATE TABLE IF NOT EXISTS store_smoke (id uuid PRIMARY KEY, name text)".to_string(),
            false,
        );
        let _ = db.execute(&ctx, &create).await;

        let id = Uuid::new_v4();
        let mut insert = InsertQueryBuilder::new();
        insert
            .set_table("store_smoke")?
            .add_element("id", id)?
            .add_element("name", "smoke")?;
        executor.execute_query_affecting_single_row(&ctx, &insert).await?;

        let mut select = SelectQueryBuilder::new();
        select.set_table("store_smoke")?.add_prop("id")?.add_prop("name")?;
        let mut found = Vec::new();
        executor
            .run_query_and_scan_all_results(&ctx, &select, |row: &Row| -> Result<()> {
                found.push(row.scan::<(Uuid, String)>()?);
                Ok(())
            })
            .await?;
        assert!(found.contains(&(id, "smoke".to_string())));

        let mut delete = DeleteQueryBuilder::new();
        delete.set_table("store_smoke")?;
        executor.execute_query(&ctx, &delete).await?;

        db.disconnect(&ctx).await?;
        Ok(())
    }
}
