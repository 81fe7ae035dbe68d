//! The query builder.
//!
//! Each statement kind has its own builder with chainable methods that render
//! SQL with `?` placeholders and a matching list of bound values.
//!
//! - [`SelectQuery`]: `SELECT` with projection, filters, ordering and paging.
//! - [`InsertQuery`]: `INSERT INTO` with column/value pairs.
//! - [`UpdateQuery`]: `UPDATE ... SET` with filters.
//! - [`DeleteQuery`]: `DELETE FROM` with filters.
//!
//! Columns can be given as typed [`crate::expr::Col`] constants or, where the
//! name is only known at runtime, as strings that get quoted.

pub(crate) mod clause;
pub mod delete;
pub mod insert;
pub mod select;
pub mod update;

pub use delete::DeleteQuery;
pub use insert::InsertQuery;
pub use select::SelectQuery;
pub use update::UpdateQuery;
