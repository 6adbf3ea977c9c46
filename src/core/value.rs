//! Database value types
//!
//! This module defines the cell values a backend hands back for each column
//! and the [`Row`] record that row parsers scan from.

use crate::core::error::{DatabaseError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Database value that can hold different types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DatabaseValue {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// 32-bit integer
    Int(i32),
    /// 64-bit integer
    Long(i64),
    /// 64-bit floating point
    Double(f64),
    /// String value
    String(String),
    /// Binary data
    Bytes(Vec<u8>),
    /// Timestamp with time zone
    Timestamp(DateTime<Utc>),
    /// Uuid value
    Uuid(Uuid),
    /// Json / jsonb document
    Json(serde_json::Value),
}

impl DatabaseValue {
    /// Get the value as a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DatabaseValue::Bool(v) => Some(*v),
            DatabaseValue::Int(v) => Some(*v != 0),
            DatabaseValue::Long(v) => Some(*v != 0),
            DatabaseValue::String(s) => match s.to_lowercase().as_str() {
                "true" | "t" | "1" => Some(true),
                "false" | "f" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Get the value as an i32
    pub fn as_int(&self) -> Option<i32> {
        match self {
            DatabaseValue::Int(v) => Some(*v),
            DatabaseValue::Long(v) => i32::try_from(*v).ok(),
            DatabaseValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Get the value as an i64
    pub fn as_long(&self) -> Option<i64> {
        match self {
            DatabaseValue::Long(v) => Some(*v),
            DatabaseValue::Int(v) => Some(*v as i64),
            DatabaseValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Get the value as an f64
    pub fn as_double(&self) -> Option<f64> {
        match self {
            DatabaseValue::Double(v) => Some(*v),
            DatabaseValue::Int(v) => Some(*v as f64),
            DatabaseValue::Long(v) => Some(*v as f64),
            DatabaseValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Get the value as a string (zero-copy for String values)
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DatabaseValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Get the value as a uuid, parsing textual columns
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            DatabaseValue::Uuid(v) => Some(*v),
            DatabaseValue::String(s) => Uuid::parse_str(s).ok(),
            _ => None,
        }
    }

    /// Get the value as a UTC timestamp, parsing RFC 3339 text
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            DatabaseValue::Timestamp(v) => Some(*v),
            DatabaseValue::String(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|t| t.with_timezone(&Utc)),
            _ => None,
        }
    }

    /// Get the value as bytes (zero-copy)
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            DatabaseValue::Bytes(b) => Some(b),
            DatabaseValue::String(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, DatabaseValue::Null)
    }

    /// Get the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            DatabaseValue::Null => "null",
            DatabaseValue::Bool(_) => "bool",
            DatabaseValue::Int(_) => "int",
            DatabaseValue::Long(_) => "long",
            DatabaseValue::Double(_) => "double",
            DatabaseValue::String(_) => "string",
            DatabaseValue::Bytes(_) => "bytes",
            DatabaseValue::Timestamp(_) => "timestamp",
            DatabaseValue::Uuid(_) => "uuid",
            DatabaseValue::Json(_) => "json",
        }
    }
}

impl From<bool> for DatabaseValue {
    fn from(v: bool) -> Self {
        DatabaseValue::Bool(v)
    }
}

impl From<i32> for DatabaseValue {
    fn from(v: i32) -> Self {
        DatabaseValue::Int(v)
    }
}

impl From<i64> for DatabaseValue {
    fn from(v: i64) -> Self {
        DatabaseValue::Long(v)
    }
}

impl From<f64> for DatabaseValue {
    fn from(v: f64) -> Self {
        DatabaseValue::Double(v)
    }
}

impl From<String> for DatabaseValue {
    fn from(v: String) -> Self {
        DatabaseValue::String(v)
    }
}

impl From<&str> for DatabaseValue {
    fn from(v: &str) -> Self {
        DatabaseValue::String(v.to_string())
    }
}

impl From<Uuid> for DatabaseValue {
    fn from(v: Uuid) -> Self {
        DatabaseValue::Uuid(v)
    }
}

impl From<DateTime<Utc>> for DatabaseValue {
    fn from(v: DateTime<Utc>) -> Self {
        DatabaseValue::Timestamp(v)
    }
}

impl<T: Into<DatabaseValue>> From<Option<T>> for DatabaseValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => DatabaseValue::Null,
        }
    }
}

/// Typed decoding of a single cell
pub trait FromValue: Sized {
    fn from_value(value: &DatabaseValue) -> Result<Self>;
}

fn mismatch<T>(expected: &str, value: &DatabaseValue) -> Result<T> {
    Err(DatabaseError::type_mismatch(expected, value.type_name()))
}

macro_rules! impl_from_value {
    ($ty:ty, $name:literal, $accessor:ident) => {
        impl FromValue for $ty {
            fn from_value(value: &DatabaseValue) -> Result<Self> {
                match value.$accessor() {
                    Some(v) => Ok(v),
                    None => mismatch($name, value),
                }
            }
        }
    };
}

impl_from_value!(bool, "bool", as_bool);
impl_from_value!(i32, "int", as_int);
impl_from_value!(i64, "long", as_long);
impl_from_value!(f64, "double", as_double);
impl_from_value!(Uuid, "uuid", as_uuid);
impl_from_value!(DateTime<Utc>, "timestamp", as_timestamp);

impl FromValue for String {
    fn from_value(value: &DatabaseValue) -> Result<Self> {
        match value {
            DatabaseValue::String(s) => Ok(s.clone()),
            DatabaseValue::Uuid(u) => Ok(u.to_string()),
            other => mismatch("string", other),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &DatabaseValue) -> Result<Self> {
        match value.as_bytes() {
            Some(b) => Ok(b.to_vec()),
            None => mismatch("bytes", value),
        }
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: &DatabaseValue) -> Result<Self> {
        match value {
            DatabaseValue::Json(v) => Ok(v.clone()),
            DatabaseValue::String(s) => serde_json::from_str(s).map_err(DatabaseError::from),
            other => mismatch("json", other),
        }
    }
}

impl FromValue for DatabaseValue {
    fn from_value(value: &DatabaseValue) -> Result<Self> {
        Ok(value.clone())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &DatabaseValue) -> Result<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}

/// One record of a result set, columns kept in select order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<DatabaseValue>,
}

impl Row {
    /// Build a row from `(column, value)` pairs
    pub fn new<I, S>(cells: I) -> Self
    where
        I: IntoIterator<Item = (S, DatabaseValue)>,
        S: Into<String>,
    {
        let (columns, values) = cells.into_iter().map(|(c, v)| (c.into(), v)).unzip();
        Self { columns, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[DatabaseValue] {
        &self.values
    }

    /// Decode the column at `idx`
    pub fn get<T: FromValue>(&self, idx: usize) -> Result<T> {
        let value = self
            .values
            .get(idx)
            .ok_or_else(|| DatabaseError::ColumnNotFound(format!("#{idx}")))?;
        T::from_value(value)
    }

    /// Decode the column called `name`
    pub fn get_by_name<T: FromValue>(&self, name: &str) -> Result<T> {
        let idx = self
            .columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| DatabaseError::ColumnNotFound(name.to_string()))?;
        self.get(idx)
    }

    /// Decode the whole row into a tuple, in column order
    ///
    /// The tuple arity must match the number of columns.
    pub fn scan<T: FromRow>(&self) -> Result<T> {
        T::from_row(self)
    }
}

/// Typed decoding of a complete row
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> Result<Self>;
}

macro_rules! impl_from_row_tuple {
    ($len:expr; $($idx:tt => $ty:ident),+) => {
        impl<$($ty: FromValue),+> FromRow for ($($ty,)+) {
            fn from_row(row: &Row) -> Result<Self> {
                if row.len() != $len {
                    return Err(DatabaseError::type_mismatch(
                        concat!(stringify!($len), " columns"),
                        &format!("{} columns", row.len()),
                    ));
                }
                Ok(($(row.get::<$ty>($idx)?,)+))
            }
        }
    };
}

impl_from_row_tuple!(1; 0 => A);
impl_from_row_tuple!(2; 0 => A, 1 => B);
impl_from_row_tuple!(3; 0 => A, 1 => B, 2 => C);
impl_from_row_tuple!(4; 0 => A, 1 => B, 2 => C, 3 => D);
impl_from_row_tuple!(5; 0 => A, 1 => B, 2 => C, 3 => D, 4 => E);
impl_from_row_tuple!(6; 0 => A, 1 => B, 2 => C, 3 => D, 4 => E, 5 => F);
impl_from_row_tuple!(7; 0 => A, 1 => B, 2 => C, 3 => D, 4 => E, 5 => F, 6 => G);
impl_from_row_tuple!(8; 0 => A, 1 => B, 2 => C, 3 => D, 4 => E, 5 => F, 6 => G, 7 => H);

#[cfg(test)]
mod tests {
    use super::*;

    fn user_row() -> Row {
        Row::new([
            ("id", DatabaseValue::Uuid(Uuid::nil())),
            ("name", DatabaseValue::from("ada")),
            ("age", DatabaseValue::Int(36)),
            ("mail", DatabaseValue::Null),
        ])
    }

    #[test]
    fn test_value_conversions() {
        let val = DatabaseValue::Int(42);
        assert_eq!(val.as_int(), Some(42));
        assert_eq!(val.as_long(), Some(42));

        let val = DatabaseValue::String("123".to_string());
        assert_eq!(val.as_int(), Some(123));
        assert_eq!(val.as_long(), Some(123));

        let val = DatabaseValue::String("t".to_string());
        assert_eq!(val.as_bool(), Some(true));
    }

    #[test]
    fn test_value_from_types() {
        let val: DatabaseValue = 42.into();
        assert_eq!(val, DatabaseValue::Int(42));

        let val: DatabaseValue = "hello".into();
        assert_eq!(val, DatabaseValue::String("hello".to_string()));

        let val: DatabaseValue = Option::<i32>::None.into();
        assert_eq!(val, DatabaseValue::Null);
    }

    #[test]
    fn test_row_get_by_index_and_name() {
        let row = user_row();
        assert_eq!(row.len(), 4);
        assert_eq!(row.get::<Uuid>(0).unwrap(), Uuid::nil());
        assert_eq!(row.get_by_name::<String>("name").unwrap(), "ada");
        assert_eq!(row.get_by_name::<Option<String>>("mail").unwrap(), None);
        assert!(matches!(
            row.get_by_name::<i32>("missing"),
            Err(DatabaseError::ColumnNotFound(_))
        ));
        assert!(matches!(
            row.get::<i32>(1),
            Err(DatabaseError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_row_scan_tuple() {
        let row = user_row();
        let (id, name, age, mail): (Uuid, String, i64, Option<String>) = row.scan().unwrap();
        assert_eq!(id, Uuid::nil());
        assert_eq!(name, "ada");
        assert_eq!(age, 36);
        assert!(mail.is_none());

        let wrong_arity = row.scan::<(Uuid, String)>();
        assert!(matches!(wrong_arity, Err(DatabaseError::TypeMismatch { .. })));
    }
}
