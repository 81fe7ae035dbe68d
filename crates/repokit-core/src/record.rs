//! The record type contract.

use repokit_db::FromRow;

/// A persistence-mapped entity type managed by a repository.
///
/// The slug and external id keys are optional capabilities: a record type
/// that has them returns the column name, and identifier lookups then also
/// match on that column.
///
/// ```rust
/// use repokit_core::Record;
/// use repokit_db::FromRow;
///
/// struct Widget {
///     id: i64,
///     slug: String,
/// }
///
/// impl FromRow for Widget {
///     fn from_row(row: &repokit_db::rusqlite::Row) -> repokit_db::rusqlite::Result<Self> {
///         Ok(Widget {
///             id: row.get("id")?,
///             slug: row.get("slug")?,
///         })
///     }
/// }
///
/// impl Record for Widget {
///     const TABLE: &'static str = "widgets";
///     const FILLABLE: &'static [&'static str] = &["name", "slug"];
///
///     fn key(&self) -> i64 {
///         self.id
///     }
///
///     fn slug_key() -> Option<&'static str> {
///         Some("slug")
///     }
/// }
///
/// assert_eq!(Widget::PRIMARY_KEY, "id");
/// assert_eq!(Widget::external_id_key(), None);
/// ```
pub trait Record: FromRow + Send + Sync + 'static {
    const TABLE: &'static str;

    const PRIMARY_KEY: &'static str = "id";

    /// Columns mass assignment may write.
    const FILLABLE: &'static [&'static str];

    /// The primary key value of this record.
    fn key(&self) -> i64;

    fn slug_key() -> Option<&'static str> {
        None
    }

    fn external_id_key() -> Option<&'static str> {
        None
    }
}
