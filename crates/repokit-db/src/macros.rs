//! Schema declaration macros.

/// Declares a module of typed column handles for one table.
///
/// ```rust
/// repokit_db::define_entity!(
///     widgets {
///         table: "widgets",
///         columns: {
///             ID: i64 => "id",
///             NAME: String => "name",
///             SLUG: Option<String> => "slug"
///         }
///     }
/// );
///
/// assert_eq!(widgets::TABLE, "widgets");
/// assert_eq!(widgets::NAME.name(), "name");
/// assert_eq!(widgets::COLUMNS, &["id", "name", "slug"]);
/// ```
///
/// `COLUMNS` lists the column names in declaration order, which is handy for
/// a record's fillable list or an explicit projection.
#[macro_export]
macro_rules! define_entity {
    (
        $entity:ident {
            table: $table:literal,
            columns: {
                $($const_name:ident: $col_type:ty => $column:literal),* $(,)?
            }
        }
    ) => {
        #[allow(dead_code)]
        pub mod $entity {
            pub const TABLE: &str = $table;

            pub const COLUMNS: &[&str] = &[$($column),*];

            $(
                pub const $const_name: $crate::expr::Col<$col_type> =
                    $crate::expr::Col::new($column);
            )*
        }
    };
}
