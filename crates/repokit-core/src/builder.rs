//! The query builder handed out by repositories.
//!
//! [`Builder`] wraps a [`SelectQuery`] for one record type and adds named
//! scopes on top of it.

use std::{any::type_name, fmt, sync::Arc};

use repokit_db::{expr::Col, Expression, SelectQuery, Value};

use crate::{
    error::{RepositoryError, Result},
    record::Record,
    scope::ScopeTable,
};

pub struct Builder<R> {
    query: SelectQuery<R>,
    scopes: Arc<ScopeTable>,
}

impl<R> fmt::Debug for Builder<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (sql, params) = self.query.to_sql();
        f.debug_struct("Builder")
            .field("sql", &sql)
            .field("params", &params)
            .finish()
    }
}

impl<R: Record> Builder<R> {
    pub(crate) fn new(query: SelectQuery<R>, scopes: Arc<ScopeTable>) -> Self {
        Self { query, scopes }
    }

    /// Swaps in a fresh, unfiltered builder and returns the current one.
    ///
    /// Lets a scope behavior that only holds `&mut Builder` hand back an
    /// owned, further-chained builder:
    ///
    /// ```rust,ignore
    /// fn scope_named(query: &mut Builder<Widget>, args: &[Value]) -> Option<Builder<Widget>> {
    ///     Some(query.take().filter(widgets::NAME.eq(args[0].clone())))
    /// }
    /// ```
    pub fn take(&mut self) -> Self {
        let fresh = Self::new(self.query.fresh(), self.scopes.clone());
        std::mem::replace(self, fresh)
    }

    /// Applies the scope installed as `name` for this record type.
    ///
    /// The behavior gets this builder and `args`. When it returns `None` the
    /// (possibly mutated) builder carries on, otherwise the returned one does.
    /// Filters the scope adds are grouped and `AND`ed onto the existing ones,
    /// so an `or_where` inside a scope never widens earlier filters.
    pub fn scope(mut self, name: &str, args: &[Value]) -> Result<Self> {
        let behavior =
            self.scopes
                .get::<R>(name)
                .ok_or_else(|| RepositoryError::UnknownScope {
                    record: type_name::<R>().to_string(),
                    name: name.to_string(),
                })?;

        let mark = self.query.filter_count();
        let mut scoped = behavior(&mut self, args).unwrap_or(self);
        scoped.query.group_filters_from(mark);
        Ok(scoped)
    }

    pub fn filter<E: Expression + 'static>(mut self, expr: E) -> Self {
        self.query.and_where(expr);
        self
    }

    pub fn or_filter<E: Expression + 'static>(mut self, expr: E) -> Self {
        self.query.or_where(expr);
        self
    }

    /// In-place `AND` filter, for scope behaviors.
    pub fn and_where<E: Expression + 'static>(&mut self, expr: E) -> &mut Self {
        self.query.and_where(expr);
        self
    }

    /// In-place `OR` filter, for scope behaviors. Joins flat with the filters
    /// before it; inside a scope those are only the scope's own.
    pub fn or_where<E: Expression + 'static>(&mut self, expr: E) -> &mut Self {
        self.query.or_where(expr);
        self
    }

    /// `column = value` on a column named at runtime.
    pub fn where_eq(self, column: &'static str, value: impl Into<Value>) -> Self {
        self.filter(Col::<Value>::new(column).eq(value.into()))
    }

    pub fn order_by<T>(mut self, col: Col<T>, desc: bool) -> Self {
        self.query.order(col, desc);
        self
    }

    pub fn order<T>(&mut self, col: Col<T>, desc: bool) -> &mut Self {
        self.query.order(col, desc);
        self
    }

    /// Projects the listed columns. `[]` or `["*"]` selects everything.
    pub fn columns(mut self, names: &[&str]) -> Self {
        self.query.set_columns(names);
        self
    }

    pub fn limit(self, limit: u32) -> Self {
        self.map_query(|query| query.limit(limit))
    }

    pub fn offset(self, offset: u32) -> Self {
        self.map_query(|query| query.offset(offset))
    }

    pub fn page(self, page: u32, per_page: u32) -> Self {
        self.map_query(|query| query.page(page, per_page))
    }

    fn map_query(self, f: impl FnOnce(SelectQuery<R>) -> SelectQuery<R>) -> Self {
        Self {
            query: f(self.query),
            scopes: self.scopes,
        }
    }

    pub fn get(&self) -> Result<Vec<R>> {
        Ok(self.query.fetch()?)
    }

    pub fn first(&self) -> Result<Option<R>> {
        Ok(self.query.fetch_one()?)
    }

    pub fn first_or_fail(&self) -> Result<R> {
        Ok(self.query.fetch_one_or_fail()?)
    }

    pub fn count(&self) -> Result<u64> {
        Ok(self.query.count()?)
    }

    pub fn to_sql(&self) -> (String, Vec<Value>) {
        self.query.to_sql()
    }

    /// Unwraps the underlying query.
    pub fn into_query(self) -> SelectQuery<R> {
        self.query
    }
}
