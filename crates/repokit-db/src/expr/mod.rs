//! Columns and the predicate nodes built from them.

pub mod column;
pub mod ops;

pub use column::{quote_ident, Col};
pub use ops::BoxedExpr;
