//! Database backend implementations
//!
//! This module contains concrete [`crate::core::PoolFactory`]
//! implementations.

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "postgres")]
pub use postgres::{PostgresPool, PostgresPoolFactory};
