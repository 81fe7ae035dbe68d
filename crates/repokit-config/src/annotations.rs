//! Turns `///` docs on config structs into comments of a TOML document, so
//! `defconfig` output explains itself.

use std::any::type_name;

use documented::{Documented, DocumentedFields};
use toml_edit::{Decor, Item, Table};
use tracing::debug;

use crate::error::{ConfigError, Result};

/// Renders `docs` as a block of `#` lines. Blank doc lines become a bare `#`.
fn comment_block(docs: &str) -> String {
    docs.lines()
        .map(|line| match line.trim_end() {
            "" => "#\n".to_string(),
            text => format!("# {text}\n"),
        })
        .collect()
}

/// Adds `docs` as comments in front of whatever `decor` already carries.
///
/// When the existing prefix ends in a comment, a bare `#` line keeps the two
/// blocks apart.
pub fn append_docs_as_toml_comments(decor: &mut Decor, docs: &str) {
    let existing = decor
        .prefix()
        .and_then(|raw| raw.as_str())
        .unwrap_or_default();

    let separator = match existing.lines().last() {
        Some(line) if !line.is_empty() => "#\n",
        _ => "",
    };

    let prefix = format!("{existing}{separator}{}", comment_block(docs));
    decor.set_prefix(prefix);
}

/// Comments every key of `table` with the matching field docs of `T`.
///
/// Nested tables also get `T`'s own doc comment above their header. Keys that
/// `T` doesn't document are left alone.
pub fn annotate_toml_table<T>(table: &mut Table, is_root: bool) -> Result<()>
where
    T: Documented + DocumentedFields,
{
    if !is_root {
        append_docs_as_toml_comments(table.decor_mut(), T::DOCS);
    }

    for (mut key, item) in table.iter_mut() {
        let Ok(docs) = T::get_field_docs(key.get()) else {
            debug!(key = key.get(), container = type_name::<T>(), "no docs for key");
            continue;
        };

        let decor = match item {
            Item::None => return Err(ConfigError::UnexpectedTomlItem(key.get().to_string())),
            Item::Value(_) => key.leaf_decor_mut(),
            Item::Table(nested) => nested.decor_mut(),
            Item::ArrayOfTables(array) => match array.iter_mut().next() {
                Some(first) => first.decor_mut(),
                None => continue,
            },
        };
        append_docs_as_toml_comments(decor, docs);
    }

    Ok(())
}
