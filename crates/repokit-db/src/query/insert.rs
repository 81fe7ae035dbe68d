use std::sync::Arc;

use rusqlite::types::Value;

use crate::{
    connection::SharedConnection,
    error::Result,
    expr::Col,
    query::clause::{execute, Assignments},
};

/// `INSERT INTO` a single row.
pub struct InsertQuery {
    db: Arc<SharedConnection>,
    table: &'static str,
    assignments: Assignments,
}

impl InsertQuery {
    pub fn into(db: Arc<SharedConnection>, table: &'static str) -> Self {
        Self {
            db,
            table,
            assignments: Assignments::default(),
        }
    }

    pub fn set<T, V: Into<Value>>(mut self, col: Col<T>, value: V) -> Self {
        self.assignments.typed(col, value.into());
        self
    }

    /// Sets a column known only at runtime. The name is quoted.
    pub fn value<V: Into<Value>>(mut self, column: &str, value: V) -> Self {
        self.assignments.runtime(column, value.into());
        self
    }

    /// Returns the rowid of the new row.
    pub fn execute(self) -> Result<i64> {
        let (sql, params) = self.render();
        execute(&self.db, "insert", &sql, &params, |conn, _| {
            conn.last_insert_rowid()
        })
    }

    fn render(&self) -> (String, Vec<Value>) {
        let columns = self.assignments.columns();
        let sql = if columns.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", self.table)
        } else {
            let marks = vec!["?"; columns.len()].join(", ");
            format!(
                "INSERT INTO {} ({}) VALUES ({marks})",
                self.table,
                columns.join(", ")
            )
        };
        (sql, self.assignments.values().to_vec())
    }
}
