//! The two traits the builders are written against.

use rusqlite::{types::Value, Row};

use crate::expr::ops::{Compare, Comparison, Connective, Junction, Membership, NullCheck, Pattern};

/// Anything that renders to a SQL fragment.
///
/// `to_sql` appends the values it binds to `params`, in placeholder order,
/// and returns the fragment with `?` placeholders. The provided methods build
/// predicates out of any expression, most often a [`Col`](crate::expr::Col):
///
/// ```rust
/// use repokit_db::{expr::Col, Expression as _, Value};
///
/// let name = Col::<String>::new("name");
/// let mut params = vec![];
/// let sql = name.eq("widget".to_string()).or(name.null()).to_sql(&mut params);
///
/// assert_eq!(sql, "(name = ? OR name IS NULL)");
/// assert_eq!(params, vec![Value::Text("widget".into())]);
/// ```
pub trait Expression: Sized {
    fn to_sql(&self, params: &mut Vec<Value>) -> String;

    fn eq<T: Into<Value>>(self, value: T) -> Comparison<Self> {
        Comparison::new(self, Compare::Eq, value.into())
    }

    fn ne<T: Into<Value>>(self, value: T) -> Comparison<Self> {
        Comparison::new(self, Compare::Ne, value.into())
    }

    fn gt<T: Into<Value>>(self, value: T) -> Comparison<Self> {
        Comparison::new(self, Compare::Gt, value.into())
    }

    fn lt<T: Into<Value>>(self, value: T) -> Comparison<Self> {
        Comparison::new(self, Compare::Lt, value.into())
    }

    fn gte<T: Into<Value>>(self, value: T) -> Comparison<Self> {
        Comparison::new(self, Compare::Gte, value.into())
    }

    fn lte<T: Into<Value>>(self, value: T) -> Comparison<Self> {
        Comparison::new(self, Compare::Lte, value.into())
    }

    /// Matches values containing `needle`.
    fn like(self, needle: impl Into<String>) -> Pattern<Self> {
        Pattern::contains(self, needle.into())
    }

    /// Case-insensitive [`Expression::like`].
    fn ilike(self, needle: impl Into<String>) -> Pattern<Self> {
        Pattern::contains(self, needle.into()).ignore_case()
    }

    fn in_<T, I>(self, values: I) -> Membership<Self>
    where
        T: Into<Value>,
        I: IntoIterator<Item = T>,
    {
        Membership::new(self, values.into_iter().map(Into::into).collect(), false)
    }

    fn not_in<T, I>(self, values: I) -> Membership<Self>
    where
        T: Into<Value>,
        I: IntoIterator<Item = T>,
    {
        Membership::new(self, values.into_iter().map(Into::into).collect(), true)
    }

    fn null(self) -> NullCheck<Self> {
        NullCheck::new(self, true)
    }

    fn not_null(self) -> NullCheck<Self> {
        NullCheck::new(self, false)
    }

    fn and<E: Expression>(self, other: E) -> Junction<Self, E> {
        Junction::new(Connective::And, self, other)
    }

    fn or<E: Expression>(self, other: E) -> Junction<Self, E> {
        Junction::new(Connective::Or, self, other)
    }
}

/// Maps a result row to a value.
///
/// Scalars read the first column, so a single-column projection can be
/// fetched as `SelectQuery<i64>` or `SelectQuery<String>` without a wrapper
/// struct.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

macro_rules! first_column_from_row {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromRow for $ty {
                fn from_row(row: &Row) -> rusqlite::Result<Self> {
                    row.get(0)
                }
            }
        )*
    };
}

first_column_from_row!(i64, f64, bool, String, Value, Option<i64>, Option<String>);
