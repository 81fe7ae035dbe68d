//! Pieces shared by the statement builders.

use rusqlite::{params_from_iter, types::Value, Connection};
use tracing::trace;

use crate::{
    connection::SharedConnection,
    error::Result,
    expr::{quote_ident, Col},
    traits::Expression,
};

type Render = Box<dyn Fn(&mut Vec<Value>) -> String>;

/// The predicates of a `WHERE` clause, in the order they were added.
///
/// Predicates are joined flat, left to right, so `a OR b AND c` follows SQL
/// precedence. Group with [`Expression::or`] when that is not what you want.
#[derive(Default)]
pub(crate) struct Filters {
    predicates: Vec<(&'static str, Render)>,
}

impl Filters {
    pub fn and<E: Expression + 'static>(&mut self, expr: E) {
        self.push("AND", expr);
    }

    pub fn or<E: Expression + 'static>(&mut self, expr: E) {
        self.push("OR", expr);
    }

    fn push<E: Expression + 'static>(&mut self, keyword: &'static str, expr: E) {
        self.predicates
            .push((keyword, Box::new(move |params: &mut Vec<Value>| expr.to_sql(params))));
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    /// Folds the predicates added after the first `mark` into a single
    /// parenthesized predicate joined with `AND`.
    pub fn group_from(&mut self, mark: usize) {
        if mark == 0 || mark >= self.predicates.len() {
            return;
        }
        let grouped = self.predicates.split_off(mark);
        self.predicates.push((
            "AND",
            Box::new(move |params: &mut Vec<Value>| match grouped.as_slice() {
                [(_, single)] => single(params),
                many => format!("({})", join(many, params)),
            }),
        ));
    }

    /// Appends ` WHERE ...` to `sql`. Nothing is written without predicates.
    pub fn write(&self, sql: &mut String, params: &mut Vec<Value>) {
        if !self.predicates.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&join(&self.predicates, params));
        }
    }
}

fn join(predicates: &[(&'static str, Render)], params: &mut Vec<Value>) -> String {
    let mut sql = String::new();
    for (idx, (keyword, render)) in predicates.iter().enumerate() {
        if idx > 0 {
            sql.push(' ');
            sql.push_str(keyword);
            sql.push(' ');
        }
        sql.push_str(&render(params));
    }
    sql
}

/// Column/value pairs for `INSERT` and `UPDATE`.
#[derive(Default)]
pub(crate) struct Assignments {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Assignments {
    pub fn typed<T>(&mut self, col: Col<T>, value: Value) {
        self.columns.push(col.name().to_string());
        self.values.push(value);
    }

    pub fn runtime(&mut self, column: &str, value: Value) {
        self.columns.push(quote_ident(column));
        self.values.push(value);
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

/// Executes a write statement, handing the connection to `after` for follow-up
/// reads such as the last rowid.
pub(crate) fn execute<T>(
    db: &SharedConnection,
    kind: &str,
    sql: &str,
    params: &[Value],
    after: impl FnOnce(&Connection, usize) -> T,
) -> Result<T> {
    trace!(sql = %sql, params = params.len(), "{kind}");
    let conn = db.lock()?;
    let changed = conn.execute(sql, params_from_iter(params.iter()))?;
    Ok(after(&conn, changed))
}
