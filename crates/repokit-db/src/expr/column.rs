//! Typed column handles.

use std::{fmt, marker::PhantomData};

use rusqlite::types::Value;

use crate::traits::Expression;

/// A column of some table, tagged with the Rust type it decodes to.
///
/// The tag only guides the caller; rows are decoded by [`FromRow`](crate::FromRow).
///
/// ```rust
/// use repokit_db::expr::Col;
///
/// const NAME: Col<String> = Col::new("name");
/// assert_eq!(NAME.name(), "name");
/// assert_eq!(NAME.quoted(), "\"name\"");
/// ```
pub struct Col<T> {
    name: &'static str,
    _type: PhantomData<fn() -> T>,
}

impl<T> Clone for Col<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Col<T> {}

impl<T> fmt::Debug for Col<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Col({})", self.name)
    }
}

impl<T> Col<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _type: PhantomData,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The column name as a quoted identifier, for projections.
    pub fn quoted(&self) -> String {
        quote_ident(self.name)
    }
}

impl<T> Expression for Col<T> {
    fn to_sql(&self, _params: &mut Vec<Value>) -> String {
        self.name.to_string()
    }
}

/// Quotes a runtime column name for use in a projection.
///
/// `*` passes through untouched; everything else is wrapped in double quotes
/// with embedded quotes doubled.
pub fn quote_ident(name: &str) -> String {
    if name == "*" {
        return name.to_string();
    }
    format!("\"{}\"", name.replace('"', "\"\""))
}
