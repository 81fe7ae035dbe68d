use std::sync::Arc;

use rusqlite::types::Value;

use crate::{
    connection::SharedConnection,
    error::Result,
    query::clause::{execute, Filters},
    traits::Expression,
};

/// `DELETE FROM` a table. Without filters every row goes.
pub struct DeleteQuery {
    db: Arc<SharedConnection>,
    table: &'static str,
    filters: Filters,
}

impl DeleteQuery {
    pub fn from(db: Arc<SharedConnection>, table: &'static str) -> Self {
        Self {
            db,
            table,
            filters: Filters::default(),
        }
    }

    pub fn filter<Expr: Expression + 'static>(mut self, expr: Expr) -> Self {
        self.filters.and(expr);
        self
    }

    /// Returns the number of removed rows.
    pub fn execute(self) -> Result<usize> {
        let (sql, params) = self.render();
        execute(&self.db, "delete", &sql, &params, |_, removed| removed)
    }

    fn render(&self) -> (String, Vec<Value>) {
        let mut params = vec![];
        let mut sql = format!("DELETE FROM {}", self.table);
        self.filters.write(&mut sql, &mut params);
        (sql, params)
    }
}
