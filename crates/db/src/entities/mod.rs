//! Database entities.

pub mod row;
