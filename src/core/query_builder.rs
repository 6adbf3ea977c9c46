//! SQL statement builders
//!
//! One builder per statement kind, plus [`InFilterBuilder`] for `WHERE`
//! predicates. Builders are mutated through `&mut self` setters that validate
//! their input eagerly, then turned into an immutable [`Query`] (or
//! [`Filter`]) by `build`, which checks the statement is complete.
//!
//! Every failure, from a setter or from `build`, is reported as
//! [`DatabaseError::TranslationFailed`] wrapping the precise cause.
//!
//! ```
//! use rust_user_store::core::query_builder::{InFilterBuilder, SelectQueryBuilder};
//! use rust_user_store::core::{FilterBuilder, QueryBuilder};
//!
//! # fn main() -> rust_user_store::Result<()> {
//! let mut filter = InFilterBuilder::new();
//! filter.set_key("id")?.add_value("a")?.add_value("b")?;
//!
//! let mut select = SelectQueryBuilder::new();
//! select
//!     .set_table("users")?
//!     .add_prop("id")?
//!     .add_prop("name")?
//!     .set_filter(filter.build()?)?;
//!
//! assert_eq!(
//!     select.build()?.sql(),
//!     "SELECT id, name FROM users WHERE id in ('a', 'b')"
//! );
//! # Ok(())
//! # }
//! ```

use super::error::{DatabaseError, Result};
use super::query::{Filter, Query};
use super::serialization::{serialize, SqlValue};

/// Anything that can produce a complete SQL statement
pub trait QueryBuilder: Send + Sync {
    fn build(&self) -> Result<Query>;
}

/// Anything that can produce a SQL predicate
pub trait FilterBuilder: Send + Sync {
    fn build(&self) -> Result<Filter>;
}

fn translation<T>(cause: DatabaseError) -> Result<T> {
    Err(DatabaseError::translation(cause))
}

fn quoted(value: &SqlValue) -> Result<String> {
    serialize(value)
        .map(|text| format!("'{text}'"))
        .map_err(|err| DatabaseError::translation(err.into()))
}

fn quoted_list(values: &[SqlValue]) -> Result<String> {
    let parts = values.iter().map(quoted).collect::<Result<Vec<_>>>()?;
    Ok(parts.join(", "))
}

fn checked_table(table: &str) -> Result<String> {
    if table.is_empty() {
        return translation(DatabaseError::InvalidTable);
    }
    Ok(table.to_string())
}

fn checked_filter(filter: Filter) -> Result<String> {
    if !filter.valid() {
        return translation(DatabaseError::InvalidFilter);
    }
    Ok(filter.sql().to_string())
}

fn where_clause(filter: &Option<String>) -> String {
    match filter {
        Some(f) => format!(" WHERE {f}"),
        None => String::new(),
    }
}

/// Column/value pairs with unique column names, kept in insertion order
#[derive(Debug, Default)]
struct Assignments {
    entries: Vec<(String, SqlValue)>,
}

impl Assignments {
    fn push(&mut self, column: &str, value: SqlValue) -> Result<()> {
        if column.is_empty() {
            return translation(DatabaseError::InvalidColumn);
        }
        if self.entries.iter().any(|(c, _)| c == column) {
            return translation(DatabaseError::DuplicatedColumn(column.to_string()));
        }
        self.entries.push((column.to_string(), value));
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// SELECT query builder
#[derive(Debug, Default)]
pub struct SelectQueryBuilder {
    table: String,
    props: Vec<String>,
    filter: Option<String>,
    verbose: bool,
}

impl SelectQueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_table(&mut self, table: &str) -> Result<&mut Self> {
        self.table = checked_table(table)?;
        Ok(self)
    }

    /// Add a selected column; each name may only be added once
    pub fn add_prop(&mut self, prop: &str) -> Result<&mut Self> {
        if prop.is_empty() {
            return translation(DatabaseError::InvalidProp);
        }
        if self.props.iter().any(|p| p == prop) {
            return translation(DatabaseError::DuplicatedProp(prop.to_string()));
        }
        self.props.push(prop.to_string());
        Ok(self)
    }

    pub fn set_filter(&mut self, filter: Filter) -> Result<&mut Self> {
        self.filter = Some(checked_filter(filter)?);
        Ok(self)
    }

    pub fn set_verbose(&mut self, verbose: bool) -> &mut Self {
        self.verbose = verbose;
        self
    }
}

impl QueryBuilder for SelectQueryBuilder {
    fn build(&self) -> Result<Query> {
        if self.table.is_empty() {
            return translation(DatabaseError::InvalidTable);
        }
        if self.props.is_empty() {
            return translation(DatabaseError::NoPropInSelectQuery);
        }

        let sql = format!(
            "SELECT {} FROM {}{}",
            self.props.join(", "),
            self.table,
            where_clause(&self.filter)
        );
        Ok(Query::new(sql, self.verbose))
    }
}

/// INSERT query builder
#[derive(Debug, Default)]
pub struct InsertQueryBuilder {
    table: String,
    elements: Assignments,
    verbose: bool,
}

impl InsertQueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_table(&mut self, table: &str) -> Result<&mut Self> {
        self.table = checked_table(table)?;
        Ok(self)
    }

    /// Add a column and the value stored in it
    pub fn add_element(&mut self, column: &str, value: impl Into<SqlValue>) -> Result<&mut Self> {
        self.elements.push(column, value.into())?;
        Ok(self)
    }

    pub fn set_verbose(&mut self, verbose: bool) -> &mut Self {
        self.verbose = verbose;
        self
    }
}

impl QueryBuilder for InsertQueryBuilder {
    fn build(&self) -> Result<Query> {
        if self.table.is_empty() {
            return translation(DatabaseError::InvalidTable);
        }
        if self.elements.is_empty() {
            return translation(DatabaseError::NoColumnInInsertQuery);
        }

        let columns: Vec<&str> = self.elements.entries.iter().map(|(c, _)| c.as_str()).collect();
        let values = self
            .elements
            .entries
            .iter()
            .map(|(_, v)| quoted(v))
            .collect::<Result<Vec<_>>>()?;

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table,
            columns.join(", "),
            values.join(", ")
        );
        Ok(Query::new(sql, self.verbose))
    }
}

/// UPDATE query builder
#[derive(Debug, Default)]
pub struct UpdateQueryBuilder {
    table: String,
    updates: Assignments,
    filter: Option<String>,
    verbose: bool,
}

impl UpdateQueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_table(&mut self, table: &str) -> Result<&mut Self> {
        self.table = checked_table(table)?;
        Ok(self)
    }

    /// Set `column` to `value`; each column may only be updated once
    pub fn add_update(&mut self, column: &str, value: impl Into<SqlValue>) -> Result<&mut Self> {
        self.updates.push(column, value.into())?;
        Ok(self)
    }

    pub fn set_filter(&mut self, filter: Filter) -> Result<&mut Self> {
        self.filter = Some(checked_filter(filter)?);
        Ok(self)
    }

    pub fn set_verbose(&mut self, verbose: bool) -> &mut Self {
        self.verbose = verbose;
        self
    }
}

impl QueryBuilder for UpdateQueryBuilder {
    fn build(&self) -> Result<Query> {
        if self.table.is_empty() {
            return translation(DatabaseError::InvalidTable);
        }
        if self.updates.is_empty() {
            return translation(DatabaseError::NoColumnInUpdateQuery);
        }

        let assignments = self
            .updates
            .entries
            .iter()
            .map(|(c, v)| quoted(v).map(|v| format!("{c} = {v}")))
            .collect::<Result<Vec<_>>>()?;

        let sql = format!(
            "UPDATE {} SET {}{}",
            self.table,
            assignments.join(", "),
            where_clause(&self.filter)
        );
        Ok(Query::new(sql, self.verbose))
    }
}

/// DELETE query builder
#[derive(Debug, Default)]
pub struct DeleteQueryBuilder {
    table: String,
    filter: Option<String>,
    verbose: bool,
}

impl DeleteQueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_table(&mut self, table: &str) -> Result<&mut Self> {
        self.table = checked_table(table)?;
        Ok(self)
    }

    pub fn set_filter(&mut self, filter: Filter) -> Result<&mut Self> {
        self.filter = Some(checked_filter(filter)?);
        Ok(self)
    }

    pub fn set_verbose(&mut self, verbose: bool) -> &mut Self {
        self.verbose = verbose;
        self
    }
}

impl QueryBuilder for DeleteQueryBuilder {
    fn build(&self) -> Result<Query> {
        if self.table.is_empty() {
            return translation(DatabaseError::InvalidTable);
        }

        let sql = format!("DELETE FROM {}{}", self.table, where_clause(&self.filter));
        Ok(Query::new(sql, self.verbose))
    }
}

/// Stored function call builder
///
/// Emits `SELECT fn(args)`, or `SELECT * FROM fn(args)` when the function
/// returns a row set.
#[derive(Debug, Default)]
pub struct ScriptQueryBuilder {
    script: String,
    args: Vec<SqlValue>,
    has_return_value: bool,
    verbose: bool,
}

impl ScriptQueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_script(&mut self, script: &str) -> Result<&mut Self> {
        if script.is_empty() {
            return translation(DatabaseError::InvalidScript);
        }
        self.script = script.to_string();
        Ok(self)
    }

    /// Append a positional argument
    pub fn add_arg(&mut self, arg: impl Into<SqlValue>) -> Result<&mut Self> {
        self.args.push(arg.into());
        Ok(self)
    }

    pub fn set_has_return_value(&mut self, has_return_value: bool) -> &mut Self {
        self.has_return_value = has_return_value;
        self
    }

    pub fn set_verbose(&mut self, verbose: bool) -> &mut Self {
        self.verbose = verbose;
        self
    }
}

impl QueryBuilder for ScriptQueryBuilder {
    fn build(&self) -> Result<Query> {
        if self.script.is_empty() {
            return translation(DatabaseError::InvalidScript);
        }

        let args = quoted_list(&self.args)?;
        let sql = if self.has_return_value {
            format!("SELECT * FROM {}({})", self.script, args)
        } else {
            format!("SELECT {}({})", self.script, args)
        };
        Ok(Query::new(sql, self.verbose))
    }
}

/// `key in (...)` predicate builder
#[derive(Debug, Default)]
pub struct InFilterBuilder {
    key: String,
    values: Vec<SqlValue>,
}

impl InFilterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_key(&mut self, key: &str) -> Result<&mut Self> {
        if key.is_empty() {
            return translation(DatabaseError::InvalidComparisonKey);
        }
        self.key = key.to_string();
        Ok(self)
    }

    pub fn add_value(&mut self, value: impl Into<SqlValue>) -> Result<&mut Self> {
        self.values.push(value.into());
        Ok(self)
    }
}

impl FilterBuilder for InFilterBuilder {
    fn build(&self) -> Result<Filter> {
        if self.key.is_empty() {
            return translation(DatabaseError::InvalidComparisonKey);
        }
        if self.values.is_empty() {
            return translation(DatabaseError::NoValuesInComparison);
        }

        let sql = format!("{} in ({})", self.key, quoted_list(&self.values)?);
        Ok(Filter::new(sql))
    }
}
