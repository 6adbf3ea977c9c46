//! Build, run and scan in one call
//!
//! [`QueryExecutor`] is the layer repositories use: it builds a statement
//! from a [`QueryBuilder`], sends it through a [`Database`] and applies the
//! requested scanning contract, classifying each failure on the way.

use crate::core::context::Context;
use crate::core::database::Database;
use crate::core::error::{DatabaseError, Result};
use crate::core::query_builder::QueryBuilder;
use crate::core::rows::{RowParser, Rows};
use std::sync::Arc;

#[derive(Clone)]
pub struct QueryExecutor {
    db: Arc<dyn Database>,
}

impl QueryExecutor {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Run a statement whose rows are not needed
    pub async fn run_query(&self, ctx: &Context, qb: &dyn QueryBuilder) -> Result<()> {
        let mut rows = self.query_rows(ctx, qb).await?;
        rows.close();
        Ok(())
    }

    /// Run a statement expected to return exactly one row
    ///
    /// # Errors
    ///
    /// - [`DatabaseError::RequestCreationFailed`] when the builder fails
    /// - the query error as returned by the database
    /// - [`DatabaseError::CorruptedData`] when the row count or the parser
    ///   does not match expectations
    pub async fn run_query_and_scan_single_result<P: RowParser>(
        &self,
        ctx: &Context,
        qb: &dyn QueryBuilder,
        parser: P,
    ) -> Result<()> {
        let rows = self.query_rows(ctx, qb).await?;
        rows.get_single_value(parser)
            .map_err(|err| DatabaseError::CorruptedData(Box::new(err)))
    }

    /// Run a statement and scan all of its rows
    ///
    /// Errors are classified as in [`QueryExecutor::run_query_and_scan_single_result`].
    pub async fn run_query_and_scan_all_results<P: RowParser>(
        &self,
        ctx: &Context,
        qb: &dyn QueryBuilder,
        parser: P,
    ) -> Result<()> {
        let rows = self.query_rows(ctx, qb).await?;
        rows.get_all(parser)
            .map_err(|err| DatabaseError::CorruptedData(Box::new(err)))
    }

    /// Run a write statement and return how many rows it affected
    pub async fn execute_query(&self, ctx: &Context, qb: &dyn QueryBuilder) -> Result<u64> {
        let query = qb
            .build()
            .map_err(|err| DatabaseError::RequestCreationFailed(Box::new(err)))?;
        self.db.execute(ctx, &query).await.into_result()
    }

    /// Run a write statement that must affect exactly one row
    pub async fn execute_query_affecting_single_row(
        &self,
        ctx: &Context,
        qb: &dyn QueryBuilder,
    ) -> Result<()> {
        match self.execute_query(ctx, qb).await? {
            1 => Ok(()),
            affected => Err(DatabaseError::NotExactlyOneRowAffected { affected }),
        }
    }

    async fn query_rows(&self, ctx: &Context, qb: &dyn QueryBuilder) -> Result<Rows> {
        let query = qb
            .build()
            .map_err(|err| DatabaseError::RequestCreationFailed(Box::new(err)))?;

        let mut rows = self.db.query(ctx, &query).await;
        if let Some(err) = rows.take_err() {
            return Err(err);
        }
        Ok(rows)
    }
}

impl std::fmt::Debug for QueryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryExecutor").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::query::Query;
    use crate::core::result::ExecutionResult;
    use crate::core::rows::RowCursor;
    use crate::core::value::{DatabaseValue, Row};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    struct StaticBuilder(Option<&'static str>);

    impl QueryBuilder for StaticBuilder {
        fn build(&self) -> Result<Query> {
            match self.0 {
                Some(sql) => Ok(Query::new(sql.to_string(), false)),
                None => Err(DatabaseError::translation(DatabaseError::InvalidTable)),
            }
        }
    }

    struct CountCursor(usize);

    impl RowCursor for CountCursor {
        fn next_row(&mut self) -> Result<Option<Row>> {
            if self.0 == 0 {
                return Ok(None);
            }
            self.0 -= 1;
            Ok(Some(Row::new([("n", DatabaseValue::Long(self.0 as i64))])))
        }

        fn close(&mut self) {}
    }

    #[derive(Default)]
    struct MockDb {
        rows: usize,
        query_err: bool,
        tag: &'static str,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Database for MockDb {
        async fn connect(&self, _ctx: &Context) -> Result<()> {
            Ok(())
        }

        async fn disconnect(&self, _ctx: &Context) -> Result<()> {
            Ok(())
        }

        async fn query(&self, _ctx: &Context, query: &Query) -> Rows {
            self.seen.lock().push(query.sql().to_string());
            if self.query_err {
                return Rows::failed(DatabaseError::other("someError"));
            }
            Rows::new(Box::new(CountCursor(self.rows)))
        }

        async fn execute(&self, _ctx: &Context, query: &Query) -> ExecutionResult {
            self.seen.lock().push(query.sql().to_string());
            ExecutionResult::new(self.tag, None)
        }
    }

    fn executor(db: MockDb) -> (QueryExecutor, Arc<MockDb>) {
        let db = Arc::new(db);
        (QueryExecutor::new(db.clone()), db)
    }

    fn ignore(_: &Row) -> Result<()> {
        Ok(())
    }

    #[tokio::test]
    async fn test_build_error_is_request_creation_failure() {
        let (qe, db) = executor(MockDb::default());
        let ctx = Context::background();

        let err = qe.run_query(&ctx, &StaticBuilder(None)).await.unwrap_err();
        assert!(matches!(err, DatabaseError::RequestCreationFailed(_)));
        assert!(matches!(
            err.cause(),
            Some(DatabaseError::TranslationFailed(_))
        ));

        let err = qe.execute_query(&ctx, &StaticBuilder(None)).await.unwrap_err();
        assert!(matches!(err, DatabaseError::RequestCreationFailed(_)));
        assert!(db.seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_query_error_is_returned_as_is() {
        let (qe, _) = executor(MockDb {
            query_err: true,
            ..Default::default()
        });
        let ctx = Context::background();

        let err = qe
            .run_query_and_scan_single_result(&ctx, &StaticBuilder(Some("SELECT 1")), ignore)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "someError");
    }

    #[tokio::test]
    async fn test_run_query() {
        let (qe, db) = executor(MockDb {
            rows: 3,
            ..Default::default()
        });
        qe.run_query(&Context::background(), &StaticBuilder(Some("SELECT 1")))
            .await
            .unwrap();
        assert_eq!(*db.seen.lock(), vec!["SELECT 1".to_string()]);
    }

    #[tokio::test]
    async fn test_scan_single_result() {
        let ctx = Context::background();
        let qb = StaticBuilder(Some("SELECT n"));

        let (qe, _) = executor(MockDb {
            rows: 1,
            ..Default::default()
        });
        let mut value = -1i64;
        qe.run_query_and_scan_single_result(&ctx, &qb, |row: &Row| -> Result<()> {
            value = row.get::<i64>(0)?;
            Ok(())
        })
        .await
        .unwrap();
        assert_eq!(value, 0);

        for rows in [0, 2] {
            let (qe, _) = executor(MockDb {
                rows,
                ..Default::default()
            });
            let err = qe
                .run_query_and_scan_single_result(&ctx, &qb, ignore)
                .await
                .unwrap_err();
            assert!(matches!(err, DatabaseError::CorruptedData(_)), "{rows} rows");
        }
    }

    #[tokio::test]
    async fn test_scan_all_results() {
        let (qe, _) = executor(MockDb {
            rows: 3,
            ..Default::default()
        });
        let ctx = Context::background();

        let mut values = Vec::new();
        qe.run_query_and_scan_all_results(&ctx, &StaticBuilder(Some("SELECT n")), |row: &Row| -> Result<()> {
            values.push(row.get::<i64>(0)?);
            Ok(())
        })
        .await
        .unwrap();
        assert_eq!(values, vec![2, 1, 0]);

        let err = qe
            .run_query_and_scan_all_results(&ctx, &StaticBuilder(Some("SELECT n")), |_: &Row| -> Result<()> {
                Err(DatabaseError::other("bad"))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::CorruptedData(_)));
        assert!(matches!(
            err.cause(),
            Some(DatabaseError::RowParsingFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_execute_query_affecting_single_row() {
        let ctx = Context::background();
        let qb = StaticBuilder(Some("DELETE FROM users"));

        let (qe, _) = executor(MockDb {
            tag: "DELETE 1",
            ..Default::default()
        });
        qe.execute_query_affecting_single_row(&ctx, &qb).await.unwrap();

        let (qe, _) = executor(MockDb {
            tag: "DELETE 2",
            ..Default::default()
        });
        assert_eq!(qe.execute_query(&ctx, &qb).await.unwrap(), 2);
        let err = qe.execute_query_affecting_single_row(&ctx, &qb).await.unwrap_err();
        assert!(matches!(
            err,
            DatabaseError::NotExactlyOneRowAffected { affected: 2 }
        ));

        let (qe, _) = executor(MockDb {
            tag: "garbage",
            ..Default::default()
        });
        let err = qe.execute_query(&ctx, &qb).await.unwrap_err();
        assert!(matches!(err, DatabaseError::UnknownCommandTag(_)));
    }
}
