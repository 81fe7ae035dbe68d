//! Reading rows.

use std::{marker::PhantomData, sync::Arc};

use rusqlite::{params_from_iter, types::Value};
use tracing::trace;

use crate::{
    connection::SharedConnection,
    error::{DbError, Result},
    expr::{column::Col, quote_ident},
    query::clause::Filters,
    traits::{Expression, FromRow},
};

/// A `SELECT` over one table, decoded into `E`.
///
/// Chaining methods consume the query; `and_where`, `or_where`, `order` and
/// `set_columns` work through `&mut` for callers that only hold a reference.
///
/// ```rust
/// use repokit_db::{define_entity, FromRow, SelectQuery, SharedConnection};
/// use repokit_db::traits::Expression as _;
/// use std::sync::Arc;
/// use rusqlite::Connection;
///
/// struct Widget {
///     id: i64,
/// }
///
/// impl FromRow for Widget {
///     fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
///         Ok(Widget { id: row.get("id")? })
///     }
/// }
///
/// define_entity!(
///     widgets {
///         table: "widgets",
///         columns: {
///             ID: i64 => "id"
///         }
///     }
/// );
///
/// let conn = Connection::open_in_memory().unwrap();
/// conn.execute("CREATE TABLE widgets (id INTEGER PRIMARY KEY)", []).unwrap();
/// conn.execute("INSERT INTO widgets (id) VALUES (3)", []).unwrap();
///
/// let found = SelectQuery::<Widget>::from(Arc::new(SharedConnection::new(conn)), widgets::TABLE)
///     .filter(widgets::ID.gt(1))
///     .order_by(widgets::ID, true)
///     .fetch()
///     .unwrap();
/// assert_eq!(found.iter().map(|w| w.id).collect::<Vec<_>>(), vec![3]);
/// ```
pub struct SelectQuery<E> {
    db: Arc<SharedConnection>,
    table: &'static str,
    projection: Vec<String>,
    filters: Filters,
    ordering: Vec<String>,
    limit: Option<u32>,
    offset: Option<u32>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> SelectQuery<E> {
    pub fn from(db: Arc<SharedConnection>, table: &'static str) -> Self {
        Self {
            db,
            table,
            projection: vec![],
            filters: Filters::default(),
            ordering: vec![],
            limit: None,
            offset: None,
            _entity: PhantomData,
        }
    }

    /// An unfiltered query over the same connection and table.
    pub fn fresh(&self) -> Self {
        Self::from(Arc::clone(&self.db), self.table)
    }

    pub fn table(&self) -> &'static str {
        self.table
    }

    /// Restricts the projection to typed columns.
    pub fn select<T>(mut self, cols: &[Col<T>]) -> Self {
        self.projection.extend(cols.iter().map(Col::quoted));
        self
    }

    /// Restricts the projection to named columns. An empty list, or one
    /// containing `*`, reads every column.
    pub fn columns(mut self, names: &[&str]) -> Self {
        self.set_columns(names);
        self
    }

    pub fn set_columns(&mut self, names: &[&str]) -> &mut Self {
        self.projection = if names.contains(&"*") {
            vec![]
        } else {
            names.iter().map(|name| quote_ident(name)).collect()
        };
        self
    }

    pub fn filter<Expr: Expression + 'static>(mut self, expr: Expr) -> Self {
        self.and_where(expr);
        self
    }

    pub fn or_filter<Expr: Expression + 'static>(mut self, expr: Expr) -> Self {
        self.or_where(expr);
        self
    }

    pub fn and_where<Expr: Expression + 'static>(&mut self, expr: Expr) -> &mut Self {
        self.filters.and(expr);
        self
    }

    pub fn or_where<Expr: Expression + 'static>(&mut self, expr: Expr) -> &mut Self {
        self.filters.or(expr);
        self
    }

    /// How many filters have been added; a mark for [`SelectQuery::group_filters_from`].
    pub fn filter_count(&self) -> usize {
        self.filters.len()
    }

    /// Wraps the filters added after `mark` in parentheses and joins the group
    /// to the earlier filters with `AND`.
    pub fn group_filters_from(&mut self, mark: usize) -> &mut Self {
        self.filters.group_from(mark);
        self
    }

    pub fn order_by<T>(mut self, col: Col<T>, desc: bool) -> Self {
        self.order(col, desc);
        self
    }

    pub fn order<T>(&mut self, col: Col<T>, desc: bool) -> &mut Self {
        let direction = if desc { "DESC" } else { "ASC" };
        self.ordering.push(format!("{} {direction}", col.name()));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Windows the results to one page. Pages are 1-based; page 0 reads as 1.
    pub fn page(self, page: u32, per_page: u32) -> Self {
        self.limit(per_page)
            .offset(page.saturating_sub(1).saturating_mul(per_page))
    }

    /// The statement and its bound values, without running it.
    pub fn to_sql(&self) -> (String, Vec<Value>) {
        self.render(self.limit)
    }

    fn render(&self, limit: Option<u32>) -> (String, Vec<Value>) {
        let projection = match self.projection.is_empty() {
            true => "*".to_string(),
            false => self.projection.join(", "),
        };
        let (mut sql, params) = self.filtered(&projection);

        if !self.ordering.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.ordering.join(", "));
        }
        // SQLite only accepts OFFSET after a LIMIT; -1 means unbounded.
        match (limit, self.offset) {
            (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}")),
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {limit}")),
            (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {offset}")),
            (None, None) => {}
        }
        (sql, params)
    }

    fn filtered(&self, projection: &str) -> (String, Vec<Value>) {
        let mut params = vec![];
        let mut sql = format!("SELECT {projection} FROM {}", self.table);
        self.filters.write(&mut sql, &mut params);
        (sql, params)
    }

    /// Rows matching the filters. Projection, ordering and windowing are ignored.
    pub fn count(&self) -> Result<u64> {
        let (sql, params) = self.filtered("COUNT(*)");
        trace!(sql = %sql, "count");
        let conn = self.db.lock()?;
        let total: u64 = conn.query_row(&sql, params_from_iter(params.iter()), |row| row.get(0))?;
        Ok(total)
    }
}

impl<E: FromRow> SelectQuery<E> {
    pub fn fetch(&self) -> Result<Vec<E>> {
        self.load(self.limit)
    }

    /// The first row, if any. The statement is capped with `LIMIT 1`.
    pub fn fetch_one(&self) -> Result<Option<E>> {
        let limit = self.limit.map_or(1, |limit| limit.min(1));
        Ok(self.load(Some(limit))?.into_iter().next())
    }

    /// Like [`SelectQuery::fetch_one`], but a missing row is [`DbError::NotFound`].
    pub fn fetch_one_or_fail(&self) -> Result<E> {
        self.fetch_one()?
            .ok_or_else(|| DbError::NotFound(self.table.to_string()))
    }

    fn load(&self, limit: Option<u32>) -> Result<Vec<E>> {
        let (sql, params) = self.render(limit);
        trace!(sql = %sql, params = params.len(), "select");
        let conn = self.db.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(params.iter()), E::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}
