//! Rendering of argument values as SQL literal text
//!
//! Builders accept any [`SqlValue`] and turn it into text with [`serialize`].
//! The text is embedded between single quotes without escaping, so callers
//! are responsible for the values they pass in.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::fmt::Debug;
use uuid::Uuid;

/// A value rendered through its JSON representation
pub trait StructuredValue: Debug + Send + Sync {
    fn to_json(&self) -> serde_json::Result<String>;
}

impl<T> StructuredValue for T
where
    T: Serialize + Debug + Send + Sync,
{
    fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// A domain value that chooses its own database representation
///
/// ```
/// use rust_user_store::core::serialization::{serialize, Convertible, SqlValue, StructuredValue};
///
/// #[derive(Debug)]
/// struct Age(u8);
///
/// impl Convertible for Age {
///     fn convert(&self) -> Box<dyn StructuredValue> {
///         Box::new(self.0)
///     }
/// }
///
/// assert_eq!(serialize(&SqlValue::convertible(Age(32))).unwrap(), "32");
/// ```
pub trait Convertible: Debug + Send + Sync {
    fn convert(&self) -> Box<dyn StructuredValue>;
}

/// Argument accepted by the builders, tagged by how it is rendered
#[derive(Debug)]
pub enum SqlValue {
    /// Rendered as the JSON of its converted form
    Convertible(Box<dyn Convertible>),
    /// Rendered verbatim
    Text(String),
    /// Rendered in hyphenated lowercase form
    Uuid(Uuid),
    /// Rendered as RFC 3339 with whole seconds, e.g. `2024-01-02T03:04:05Z`
    Timestamp(DateTime<Utc>),
    /// Rendered as JSON
    Structured(Box<dyn StructuredValue>),
}

impl SqlValue {
    pub fn convertible<C: Convertible + 'static>(value: C) -> Self {
        SqlValue::Convertible(Box::new(value))
    }

    pub fn structured<S: StructuredValue + 'static>(value: S) -> Self {
        SqlValue::Structured(Box::new(value))
    }
}

/// Render `value` as SQL literal text (without the surrounding quotes)
///
/// # Errors
///
/// Returns the JSON encoder error when a convertible or structured value
/// cannot be encoded.
pub fn serialize(value: &SqlValue) -> serde_json::Result<String> {
    match value {
        SqlValue::Convertible(c) => c.convert().to_json(),
        SqlValue::Text(s) => Ok(s.clone()),
        SqlValue::Uuid(id) => Ok(id.to_string()),
        SqlValue::Timestamp(ts) => Ok(ts.to_rfc3339_opts(SecondsFormat::Secs, true)),
        SqlValue::Structured(s) => s.to_json(),
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<&String> for SqlValue {
    fn from(v: &String) -> Self {
        SqlValue::Text(v.clone())
    }
}

impl From<Uuid> for SqlValue {
    fn from(v: Uuid) -> Self {
        SqlValue::Uuid(v)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(v: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(v)
    }
}

macro_rules! structured_from {
    ($($ty:ty),+) => {
        $(
            impl From<$ty> for SqlValue {
                fn from(v: $ty) -> Self {
                    SqlValue::Structured(Box::new(v))
                }
            }
        )+
    };
}

structured_from!(bool, i32, i64, u32, u64, f64, serde_json::Value);
