//! Identifier resolution across primary key, slug and external id.

use repokit_db::{
    expr::{BoxedExpr, Col},
    Expression, FromRow, Value,
};
use tracing::trace;

use crate::{
    error::{RepositoryError, Result},
    identifier::Identifier,
    model::Model,
    record::Record,
};

/// Builds `pk = coerced [OR slug = raw] [OR external_id = raw]` for `R`.
///
/// The primary key branch compares the identifier coerced to an integer, the
/// other branches compare it as given.
pub fn identifier_predicate<R: Record>(identifier: &Identifier) -> BoxedExpr {
    let mut predicate = BoxedExpr::new(Col::<i64>::new(R::PRIMARY_KEY).eq(identifier.as_key()));

    for column in [R::slug_key(), R::external_id_key()].into_iter().flatten() {
        predicate = BoxedExpr::new(predicate.or(Col::<Value>::new(column).eq(identifier.raw_value())));
    }

    predicate
}

/// Looks up one row of `R`'s table by `identifier`, projected on `columns`.
///
/// `columns` empty or `["*"]` selects every column. With `fail` set, no match
/// is [`RepositoryError::NotFound`]; otherwise it is `Ok(None)`.
pub fn find_by_identifier<R, T>(
    model: &Model<R>,
    identifier: &Identifier,
    columns: &[&str],
    fail: bool,
) -> Result<Option<T>>
where
    R: Record,
    T: FromRow,
{
    let query = model
        .select::<T>()
        .columns(columns)
        .filter(identifier_predicate::<R>(identifier));

    trace!(table = R::TABLE, identifier = %identifier, "resolving identifier");

    match query.fetch_one()? {
        Some(row) => Ok(Some(row)),
        None if fail => Err(RepositoryError::NotFound {
            table: R::TABLE.to_string(),
            identifier: identifier.to_string(),
        }),
        None => Ok(None),
    }
}
