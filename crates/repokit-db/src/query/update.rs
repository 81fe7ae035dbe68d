use std::sync::Arc;

use rusqlite::types::Value;

use crate::{
    connection::SharedConnection,
    error::Result,
    expr::Col,
    query::clause::{execute, Assignments, Filters},
    traits::Expression,
};

/// `UPDATE ... SET` with optional filters.
pub struct UpdateQuery {
    db: Arc<SharedConnection>,
    table: &'static str,
    assignments: Assignments,
    filters: Filters,
}

impl UpdateQuery {
    pub fn table(db: Arc<SharedConnection>, table: &'static str) -> Self {
        Self {
            db,
            table,
            assignments: Assignments::default(),
            filters: Filters::default(),
        }
    }

    pub fn set<T, V: Into<Value>>(mut self, col: Col<T>, value: V) -> Self {
        self.assignments.typed(col, value.into());
        self
    }

    /// Assigns a column known only at runtime. The name is quoted.
    pub fn value<V: Into<Value>>(mut self, column: &str, value: V) -> Self {
        self.assignments.runtime(column, value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn filter<Expr: Expression + 'static>(mut self, expr: Expr) -> Self {
        self.filters.and(expr);
        self
    }

    /// Returns the number of affected rows. With nothing assigned the
    /// statement is skipped and `0` comes back.
    pub fn execute(self) -> Result<usize> {
        if self.is_empty() {
            return Ok(0);
        }
        let (sql, params) = self.render();
        execute(&self.db, "update", &sql, &params, |_, changed| changed)
    }

    fn render(&self) -> (String, Vec<Value>) {
        let mut params = self.assignments.values().to_vec();
        let sets = self
            .assignments
            .columns()
            .iter()
            .map(|col| format!("{col} = ?"))
            .collect::<Vec<_>>()
            .join(", ");

        let mut sql = format!("UPDATE {} SET {sets}", self.table);
        self.filters.write(&mut sql, &mut params);
        (sql, params)
    }
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use super::*;

    fn db() -> Arc<SharedConnection> {
        Arc::new(SharedConnection::new(Connection::open_in_memory().unwrap()))
    }

    #[test]
    fn test_update_binds_assignments_before_filters() {
        let id: Col<i64> = Col::new("id");
        let (sql, params) = UpdateQuery::table(db(), "widgets")
            .value("name", "b".to_string())
            .filter(id.eq(7))
            .render();
        assert_eq!(sql, "UPDATE widgets SET \"name\" = ? WHERE id = ?");
        assert_eq!(params, vec![Value::Text("b".into()), Value::Integer(7)]);
    }

    #[test]
    fn test_empty_update_is_skipped() {
        let update = UpdateQuery::table(db(), "missing_table");
        assert!(update.is_empty());
        assert_eq!(update.execute().unwrap(), 0);
    }
}
