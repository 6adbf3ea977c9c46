//! Outcome of a write statement

use crate::core::command_tag::parse_command_tag;
use crate::core::error::{DatabaseError, Result};

/// Affected-row count of an executed statement, or why it is unknown
#[derive(Debug)]
pub struct ExecutionResult {
    affected_rows: u64,
    err: Option<DatabaseError>,
}

impl ExecutionResult {
    /// Derive a result from a command tag and an optional backend error
    ///
    /// The backend error wins over a tag that cannot be parsed.
    pub fn new(tag: &str, err: Option<DatabaseError>) -> Self {
        match (parse_command_tag(tag), err) {
            (Ok(affected_rows), err) => Self { affected_rows, err },
            (Err(_), Some(err)) => Self::failed(err),
            (Err(tag_err), None) => Self::failed(tag_err),
        }
    }

    pub fn failed(err: DatabaseError) -> Self {
        Self {
            affected_rows: 0,
            err: Some(err),
        }
    }

    pub fn err(&self) -> Option<&DatabaseError> {
        self.err.as_ref()
    }

    pub fn affected_rows(&self) -> u64 {
        self.affected_rows
    }

    /// Affected-row count, or the carried error
    pub fn into_result(self) -> Result<u64> {
        match self.err {
            Some(err) => Err(err),
            None => Ok(self.affected_rows),
        }
    }
}
