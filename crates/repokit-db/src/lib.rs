//! SQLite plumbing for repokit.
//!
//! - [`query`]: chainable SELECT/INSERT/UPDATE/DELETE builders
//! - [`expr`]: typed columns and the operators used in filters
//! - [`connection`]: shared connections, savepoint transactions and the
//!   named connection registry

pub mod connection;
pub mod error;
pub mod expr;
pub mod helpers;
pub mod macros;
pub mod query;
pub mod traits;

pub use connection::{ConnectionOptions, Database, DatabaseManager, SharedConnection};
pub use error::DbError;
pub use helpers::*;
pub use query::*;
pub use rusqlite::{self, types::Value};
pub use traits::{Expression, FromRow};

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rusqlite::{Connection, Row};

    use super::*;
    use crate::traits::Expression as _;

    #[derive(Debug, Clone)]
    struct Widget {
        pub id: i64,
        pub name: String,
        pub slug: Option<String>,
        pub stock: i64,
        pub tags: Option<Vec<String>>,
    }

    impl FromRow for Widget {
        fn from_row(row: &Row) -> rusqlite::Result<Self> {
            Ok(Self {
                id: row.get("id")?,
                name: row.get("name")?,
                slug: row.get("slug")?,
                stock: row.get("stock")?,
                tags: row
                    .get::<_, Option<String>>("tags")?
                    .and_then(|raw| serde_json::from_str(&raw).ok()),
            })
        }
    }

    #[derive(Debug, Clone)]
    struct WidgetName {
        pub name: String,
    }

    impl FromRow for WidgetName {
        fn from_row(row: &Row) -> rusqlite::Result<Self> {
            Ok(Self {
                name: row.get("name")?,
            })
        }
    }

    define_entity!(
        widgets {
            table: "widgets",
            columns: {
                ID: i64 => "id",
                NAME: String => "name",
                SLUG: Option<String> => "slug",
                STOCK: i64 => "stock",
                TAGS: Option<Vec<String>> => "tags"
            }
        }
    );

    fn setup_db() -> Arc<SharedConnection> {
        let conn = Connection::open_in_memory().unwrap();

        conn.execute(
            "CREATE TABLE widgets (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                slug TEXT,
                stock INTEGER NOT NULL DEFAULT 0,
                tags TEXT
            )",
            [],
        )
        .unwrap();

        Arc::new(SharedConnection::new(conn))
    }

    fn insert(db: &Arc<SharedConnection>, name: &str, slug: &str) -> i64 {
        InsertQuery::into(db.clone(), widgets::TABLE)
            .set(widgets::NAME, name.to_string())
            .set(widgets::SLUG, slug.to_string())
            .execute()
            .unwrap()
    }

    #[test]
    fn test_insert() {
        let db = setup_db();

        let tags: Vec<String> = vec!["blue".to_string(), "small".to_string()];

        let id = InsertQuery::into(db.clone(), widgets::TABLE)
            .set(widgets::NAME, "Widget A".to_string())
            .set(widgets::SLUG, "widget-a".to_string())
            .set(widgets::STOCK, 12)
            .set(widgets::TAGS, json_to_value(&serde_json::json!(tags)))
            .execute()
            .unwrap();

        assert!(id > 0);

        let widget = SelectQuery::<Widget>::from(db, widgets::TABLE)
            .columns(widgets::COLUMNS)
            .filter(widgets::ID.eq(id))
            .fetch_one()
            .unwrap()
            .unwrap();

        assert_eq!(widget.id, id);
        assert_eq!(widget.name, "Widget A");
        assert_eq!(widget.slug.as_deref(), Some("widget-a"));
        assert_eq!(widget.stock, 12);
        assert_eq!(widget.tags, Some(tags));
    }

    #[test]
    fn test_select_with_like() {
        let db = setup_db();
        insert(&db, "zinc bolt", "zinc-bolt");
        insert(&db, "rust bolt", "rust-bolt");

        let names = SelectQuery::<WidgetName>::from(db, widgets::TABLE)
            .select(&[widgets::NAME])
            .filter(widgets::NAME.like("rust"))
            .fetch()
            .unwrap();

        assert_eq!(names.len(), 1);
        assert_eq!(names[0].name, "rust bolt");
    }

    #[test]
    fn test_or_filter_and_runtime_columns() {
        let db = setup_db();
        let first = insert(&db, "first", "one");
        insert(&db, "second", "two");
        insert(&db, "third", "three");

        let query = SelectQuery::<WidgetName>::from(db, widgets::TABLE)
            .columns(&["name"])
            .filter(widgets::ID.eq(first))
            .or_filter(widgets::SLUG.eq("three".to_string()))
            .order_by(widgets::ID, false);

        let (sql, _) = query.to_sql();
        assert_eq!(
            sql,
            "SELECT \"name\" FROM widgets WHERE id = ? OR slug = ? ORDER BY id ASC"
        );

        let names: Vec<_> = query.fetch().unwrap().into_iter().map(|w| w.name).collect();
        assert_eq!(names, vec!["first", "third"]);
        assert_eq!(query.count().unwrap(), 2);
    }

    #[test]
    fn test_fetch_one_or_fail() {
        let db = setup_db();
        let result = SelectQuery::<Widget>::from(db, widgets::TABLE)
            .filter(widgets::ID.eq(99))
            .fetch_one_or_fail();

        assert!(matches!(result, Err(DbError::NotFound(table)) if table == "widgets"));
    }

    #[test]
    fn test_update_and_delete() {
        let db = setup_db();
        let id = insert(&db, "old", "old");

        let updated = UpdateQuery::table(db.clone(), widgets::TABLE)
            .set(widgets::NAME, "new".to_string())
            .filter(widgets::ID.eq(id))
            .execute()
            .unwrap();
        assert_eq!(updated, 1);

        let widget = SelectQuery::<Widget>::from(db.clone(), widgets::TABLE)
            .filter(widgets::ID.eq(id))
            .fetch_one_or_fail()
            .unwrap();
        assert_eq!(widget.name, "new");

        let deleted = DeleteQuery::from(db.clone(), widgets::TABLE)
            .filter(widgets::ID.eq(id))
            .execute()
            .unwrap();
        assert_eq!(deleted, 1);

        let remaining = SelectQuery::<Widget>::from(db, widgets::TABLE)
            .count()
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[test]
    fn test_pagination() {
        let db = setup_db();
        for i in 0..5 {
            insert(&db, &format!("w{}", i), &format!("w-{}", i));
        }

        let page = SelectQuery::<WidgetName>::from(db, widgets::TABLE)
            .order_by(widgets::ID, false)
            .page(2, 2)
            .fetch()
            .unwrap();

        let names: Vec<_> = page.into_iter().map(|w| w.name).collect();
        assert_eq!(names, vec!["w2", "w3"]);
    }
}
