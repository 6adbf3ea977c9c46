//! Forward-only result sets
//!
//! [`Rows`] wraps a backend [`RowCursor`] and exposes the two scanning
//! contracts used by repositories: exactly one row ([`Rows::get_single_value`])
//! or any number of rows ([`Rows::get_all`]). Both consume the `Rows` and
//! release the cursor before returning.

use crate::core::error::{DatabaseError, Result};
use crate::core::value::Row;

/// Backend cursor over a result set
pub trait RowCursor: Send {
    /// Fetch the next row, `None` once the set is exhausted
    fn next_row(&mut self) -> Result<Option<Row>>;

    /// Release the underlying connection; must tolerate repeated calls
    fn close(&mut self);
}

/// Turns one row into caller state
///
/// Implemented for every `FnMut(&Row) -> Result<()>`, so most callers pass a
/// closure collecting into a local.
pub trait RowParser {
    fn parse(&mut self, row: &Row) -> Result<()>;
}

impl<F> RowParser for F
where
    F: FnMut(&Row) -> Result<()>,
{
    fn parse(&mut self, row: &Row) -> Result<()> {
        self(row)
    }
}

/// Result set returned by [`crate::core::Database::query`]
pub struct Rows {
    cursor: Option<Box<dyn RowCursor>>,
    pending: Option<Row>,
    err: Option<DatabaseError>,
}

impl Rows {
    /// Wrap `cursor`, fetching its first row
    ///
    /// A failing first fetch becomes the error of the returned `Rows`.
    pub fn new(mut cursor: Box<dyn RowCursor>) -> Self {
        let (pending, err) = match cursor.next_row() {
            Ok(row) => (row, None),
            Err(e) => (None, Some(e)),
        };
        Self {
            cursor: Some(cursor),
            pending,
            err,
        }
    }

    /// A result set that only carries `err`
    pub fn failed(err: DatabaseError) -> Self {
        Self {
            cursor: None,
            pending: None,
            err: Some(err),
        }
    }

    pub fn err(&self) -> Option<&DatabaseError> {
        self.err.as_ref()
    }

    pub(crate) fn take_err(&mut self) -> Option<DatabaseError> {
        self.err.take()
    }

    /// True when there is no row left to scan
    pub fn empty(&self) -> bool {
        self.cursor.is_none() || self.pending.is_none()
    }

    /// Release the cursor; later calls do nothing
    pub fn close(&mut self) {
        self.pending = None;
        if let Some(mut cursor) = self.cursor.take() {
            cursor.close();
        }
    }

    /// Scan the only row of the set
    ///
    /// # Errors
    ///
    /// - the error this `Rows` already carries, returned as-is
    /// - [`DatabaseError::NoRowsReturned`] when the set is empty
    /// - [`DatabaseError::RowParsingFailed`] when `parser` rejects the row
    /// - [`DatabaseError::MultiValuedElement`] when a second row exists
    pub fn get_single_value<P: RowParser>(mut self, mut parser: P) -> Result<()> {
        let outcome = self.scan_single(&mut parser);
        self.close();
        outcome
    }

    /// Scan every row of the set, stopping at the first parser error
    ///
    /// An empty set is not an error.
    pub fn get_all<P: RowParser>(mut self, mut parser: P) -> Result<()> {
        let outcome = self.scan_all(&mut parser);
        self.close();
        outcome
    }

    fn scan_single<P: RowParser>(&mut self, parser: &mut P) -> Result<()> {
        if let Some(err) = self.err.take() {
            return Err(err);
        }
        let row = self.advance()?.ok_or(DatabaseError::NoRowsReturned)?;
        parse_row(parser, &row)?;

        if self.advance()?.is_some() {
            return Err(DatabaseError::MultiValuedElement);
        }
        Ok(())
    }

    fn scan_all<P: RowParser>(&mut self, parser: &mut P) -> Result<()> {
        if let Some(err) = self.err.take() {
            return Err(err);
        }
        while let Some(row) = self.advance()? {
            parse_row(parser, &row)?;
        }
        Ok(())
    }

    /// Hand out the pending row and pre-fetch the one after it
    fn advance(&mut self) -> Result<Option<Row>> {
        let Some(row) = self.pending.take() else {
            return Ok(None);
        };
        if let Some(cursor) = self.cursor.as_mut() {
            self.pending = cursor.next_row()?;
        }
        Ok(Some(row))
    }
}

fn parse_row<P: RowParser>(parser: &mut P, row: &Row) -> Result<()> {
    parser
        .parse(row)
        .map_err(|e| DatabaseError::RowParsingFailed(Box::new(e)))
}

impl Drop for Rows {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Rows {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rows")
            .field("open", &self.cursor.is_some())
            .field("pending", &self.pending)
            .field("err", &self.err)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::DatabaseValue;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct MockCursor {
        rows: usize,
        fetched: usize,
        fail_at: Option<usize>,
        close_calls: Arc<AtomicUsize>,
    }

    impl MockCursor {
        fn with_rows(rows: usize) -> (Box<dyn RowCursor>, Arc<AtomicUsize>) {
            let close_calls = Arc::new(AtomicUsize::new(0));
            let cursor = MockCursor {
                rows,
                close_calls: Arc::clone(&close_calls),
                ..Default::default()
            };
            (Box::new(cursor), close_calls)
        }
    }

    impl RowCursor for MockCursor {
        fn next_row(&mut self) -> Result<Option<Row>> {
            if self.fail_at == Some(self.fetched) {
                return Err(DatabaseError::other("fetch failed"));
            }
            if self.fetched >= self.rows {
                return Ok(None);
            }
            self.fetched += 1;
            Ok(Some(Row::new([("n", DatabaseValue::Long(self.fetched as i64))])))
        }

        fn close(&mut self) {
            self.close_calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn counting_parser(calls: &mut usize) -> impl FnMut(&Row) -> Result<()> + '_ {
        move |_| {
            *calls += 1;
            Ok(())
        }
    }

    #[test]
    fn test_err_and_empty() {
        let rows = Rows::failed(DatabaseError::other("someError"));
        assert_eq!(rows.err().unwrap().to_string(), "someError");
        assert!(rows.empty());

        let (cursor, _) = MockCursor::with_rows(0);
        assert!(Rows::new(cursor).empty());

        let (cursor, _) = MockCursor::with_rows(1);
        let rows = Rows::new(cursor);
        assert!(!rows.empty());
        assert!(rows.err().is_none());
    }

    #[test]
    fn test_close_reaches_cursor_once() {
        let (cursor, closes) = MockCursor::with_rows(3);
        let mut rows = Rows::new(cursor);
        rows.close();
        rows.close();
        drop(rows);
        assert_eq!(closes.load(Ordering::SeqCst), 1);

        let mut rows = Rows::failed(DatabaseError::InvalidQuery);
        rows.close();
    }

    #[test]
    fn test_get_single_value_preconditions() {
        let mut calls = 0;
        let err = Rows::failed(DatabaseError::other("someError"))
            .get_single_value(counting_parser(&mut calls))
            .unwrap_err();
        assert_eq!(err.to_string(), "someError");

        let (cursor, closes) = MockCursor::with_rows(0);
        let err = Rows::new(cursor)
            .get_single_value(counting_parser(&mut calls))
            .unwrap_err();
        assert!(matches!(err, DatabaseError::NoRowsReturned));
        assert_eq!(calls, 0);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_get_single_value() {
        let mut calls = 0;
        let (cursor, closes) = MockCursor::with_rows(1);
        Rows::new(cursor)
            .get_single_value(counting_parser(&mut calls))
            .unwrap();
        assert_eq!(calls, 1);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_get_single_value_rejects_multiple_rows() {
        let mut calls = 0;
        let (cursor, closes) = MockCursor::with_rows(2);
        let err = Rows::new(cursor)
            .get_single_value(counting_parser(&mut calls))
            .unwrap_err();
        assert!(matches!(err, DatabaseError::MultiValuedElement));
        assert_eq!(calls, 1);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_parser_error_is_wrapped_and_closes() {
        let (cursor, closes) = MockCursor::with_rows(3);
        let err = Rows::new(cursor)
            .get_single_value(|_: &Row| -> Result<()> { Err(DatabaseError::other("bad row")) })
            .unwrap_err();
        assert!(matches!(err, DatabaseError::RowParsingFailed(_)));
        assert_eq!(closes.load(Ordering::SeqCst), 1);

        let mut seen = 0;
        let (cursor, closes) = MockCursor::with_rows(3);
        let err = Rows::new(cursor)
            .get_all(|_: &Row| -> Result<()> {
                seen += 1;
                if seen == 2 {
                    Err(DatabaseError::other("bad row"))
                } else {
                    Ok(())
                }
            })
            .unwrap_err();
        assert!(matches!(err, DatabaseError::RowParsingFailed(_)));
        assert_eq!(seen, 2);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_get_all() {
        let mut values = Vec::new();
        let (cursor, closes) = MockCursor::with_rows(4);
        Rows::new(cursor)
            .get_all(|row: &Row| -> Result<()> {
                values.push(row.get::<i64>(0)?);
                Ok(())
            })
            .unwrap();
        assert_eq!(values, vec![1, 2, 3, 4]);
        assert_eq!(closes.load(Ordering::SeqCst), 1);

        let mut calls = 0;
        let (cursor, closes) = MockCursor::with_rows(0);
        Rows::new(cursor).get_all(counting_parser(&mut calls)).unwrap();
        assert_eq!(calls, 0);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_fetch_errors_surface() {
        let close_calls = Arc::new(AtomicUsize::new(0));
        let cursor = MockCursor {
            rows: 5,
            fail_at: Some(0),
            close_calls: Arc::clone(&close_calls),
            ..Default::default()
        };
        let rows = Rows::new(Box::new(cursor));
        assert!(rows.err().is_some());
        drop(rows);
        assert_eq!(close_calls.load(Ordering::SeqCst), 1);

        let cursor = MockCursor {
            rows: 5,
            fail_at: Some(2),
            ..Default::default()
        };
        let mut calls = 0;
        let err = Rows::new(Box::new(cursor))
            .get_all(counting_parser(&mut calls))
            .unwrap_err();
        assert_eq!(err.to_string(), "fetch failed");
        assert_eq!(calls, 1);
    }
}
