//! SQL utilities for the repository layer
//!
//! Provides statement building, clause parsing and identifier validation.

pub mod clause;
pub mod mutation;
pub mod sanitize;
pub mod select;
pub mod statement;

pub use clause::{ColumnRef, JoinPredicate, Projection, SortDirection, SortKey, SortSpec};
pub use sanitize::{POSTGRES_RESERVED_WORDS, split_qualified, validate_identifier};
pub use select::SelectBuilder;
pub use statement::Statement;
