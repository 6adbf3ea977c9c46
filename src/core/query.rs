//! Built SQL fragments
//!
//! [`Query`] and [`Filter`] are the immutable outputs of the builders in
//! [`crate::core::query_builder`]. Only builders create non-empty values; the
//! default value of each is the invalid, empty fragment.

use std::fmt;

/// A complete SQL statement ready to be sent to the database
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    sql: String,
    verbose: bool,
}

impl Query {
    pub(crate) fn new(sql: String, verbose: bool) -> Self {
        Self { sql, verbose }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Whether the facade should trace the statement before sending it
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn valid(&self) -> bool {
        !self.sql.is_empty()
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// A boolean SQL predicate, embedded after `WHERE`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    sql: String,
}

impl Filter {
    pub(crate) fn new(sql: String) -> Self {
        Self { sql }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn valid(&self) -> bool {
        !self.sql.is_empty()
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}
