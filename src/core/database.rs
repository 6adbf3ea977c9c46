//! Database facade and backend seams
//!
//! [`Database`] is what repositories talk to. [`PooledDatabase`] implements it
//! over any backend exposing a [`ConnectionPool`], created on `connect` by an
//! injected [`PoolFactory`]. Every backend call runs under
//! [`execute_with_context`] so that a slow database never blocks a request
//! past its deadline.

use crate::core::config::{Config, PoolParams};
use crate::core::context::Context;
use crate::core::error::{DatabaseError, Result};
use crate::core::executor::{execute_with_context, Process};
use crate::core::query::Query;
use crate::core::result::ExecutionResult;
use crate::core::rows::{RowCursor, Rows};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, trace};

/// Storage entry point used by repositories
#[async_trait]
pub trait Database: Send + Sync {
    /// Open the connection pool
    ///
    /// Connecting again replaces (and closes) the previous pool.
    async fn connect(&self, ctx: &Context) -> Result<()>;

    /// Close the connection pool; a no-op when not connected
    async fn disconnect(&self, ctx: &Context) -> Result<()>;

    /// Run a statement returning rows
    ///
    /// Failures are carried by the returned [`Rows`] (see [`Rows::err`]).
    ///
    /// # Thread Safety
    /// Calls on one facade are serialized: the pool lock is held until the
    /// backend answers or the deadline fires.
    async fn query(&self, ctx: &Context, query: &Query) -> Rows;

    /// Run a write statement
    ///
    /// Failures are carried by the returned [`ExecutionResult`].
    ///
    /// # Thread Safety
    /// Same serialization as [`Database::query`].
    async fn execute(&self, ctx: &Context, query: &Query) -> ExecutionResult;
}

/// An open pool of backend connections
#[async_trait]
pub trait ConnectionPool: Send + Sync {
    /// Run `sql`, returning a cursor over its rows
    async fn query(&self, sql: &str) -> Result<Box<dyn RowCursor>>;

    /// Run `sql`, returning its command tag (e.g. `INSERT 0 1`)
    async fn execute(&self, sql: &str) -> Result<String>;

    /// Stop handing out connections; idempotent
    fn close(&self);
}

/// Opens connection pools for [`PooledDatabase::connect`]
#[async_trait]
pub trait PoolFactory: Send + Sync {
    async fn create(&self, params: PoolParams) -> Result<Arc<dyn ConnectionPool>>;
}

/// [`Database`] over a pool created by a [`PoolFactory`]
pub struct PooledDatabase {
    config: Config,
    factory: Arc<dyn PoolFactory>,
    pool: Mutex<Option<Arc<dyn ConnectionPool>>>,
}

impl PooledDatabase {
    /// Create a disconnected facade; nothing is opened until `connect`
    pub fn new(config: Config, factory: Arc<dyn PoolFactory>) -> Self {
        Self {
            config,
            factory,
            pool: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn is_connected(&self) -> bool {
        self.pool.lock().await.is_some()
    }
}

impl std::fmt::Debug for PooledDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledDatabase")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn connection_error(err: DatabaseError) -> DatabaseError {
    match err {
        err @ DatabaseError::DeadlineExceeded { .. } => DatabaseError::ConnectionTimeout(Box::new(err)),
        err => DatabaseError::ConnectionFailed(Box::new(err)),
    }
}

fn request_error(err: DatabaseError) -> DatabaseError {
    match err {
        err @ DatabaseError::DeadlineExceeded { .. } => DatabaseError::RequestTimeout(Box::new(err)),
        err => DatabaseError::RequestFailed(Box::new(err)),
    }
}

#[async_trait]
impl Database for PooledDatabase {
    async fn connect(&self, ctx: &Context) -> Result<()> {
        let request_id = ctx.request_id();
        info!(%request_id, "connection attempt to {}", self.config);

        let factory = Arc::clone(&self.factory);
        let params = self.config.to_pool_params();
        let process = Process::new(async move { factory.create(params).await }).with_cleanup(
            |late: Result<Arc<dyn ConnectionPool>>| {
                if let Ok(pool) = late {
                    pool.close();
                }
            },
        );

        let pool = execute_with_context(process, ctx, self.config.connection_timeout())
            .await
            .map_err(connection_error)?;

        info!(%request_id, "connected to {}", self.config);

        let previous = self.pool.lock().await.replace(pool);
        if let Some(previous) = previous {
            previous.close();
        }
        Ok(())
    }

    async fn disconnect(&self, ctx: &Context) -> Result<()> {
        let mut guard = self.pool.lock().await;
        if let Some(pool) = guard.take() {
            pool.close();
            info!(request_id = %ctx.request_id(), "connection to {} closed", self.config);
        }
        Ok(())
    }

    async fn query(&self, ctx: &Context, query: &Query) -> Rows {
        let guard = self.pool.lock().await;
        let Some(pool) = guard.as_ref() else {
            return Rows::failed(DatabaseError::ConnectionInvalid);
        };
        if !query.valid() {
            return Rows::failed(DatabaseError::InvalidQuery);
        }
        if query.verbose() {
            trace!(request_id = %ctx.request_id(), "executing: {}", query.sql());
        }

        let pool = Arc::clone(pool);
        let sql = query.sql().to_string();
        let process = Process::new(async move { pool.query(&sql).await }).with_cleanup(
            |late: Result<Box<dyn RowCursor>>| {
                if let Ok(mut cursor) = late {
                    cursor.close();
                }
            },
        );

        match execute_with_context(process, ctx, self.config.query_timeout()).await {
            Ok(cursor) => Rows::new(cursor),
            Err(err) => Rows::failed(request_error(err)),
        }
    }

    async fn execute(&self, ctx: &Context, query: &Query) -> ExecutionResult {
        let guard = self.pool.lock().await;
        let Some(pool) = guard.as_ref() else {
            return ExecutionResult::failed(DatabaseError::ConnectionInvalid);
        };
        if !query.valid() {
            return ExecutionResult::failed(DatabaseError::InvalidQuery);
        }
        if query.verbose() {
            trace!(request_id = %ctx.request_id(), "executing: {}", query.sql());
        }

        let pool = Arc::clone(pool);
        let sql = query.sql().to_string();
        let process = Process::new(async move { pool.execute(&sql).await });

        match execute_with_context(process, ctx, self.config.query_timeout()).await {
            Ok(tag) => ExecutionResult::new(&tag, None),
            Err(err) => ExecutionResult::failed(request_error(err)),
        }
    }
}
