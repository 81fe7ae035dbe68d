//! The record-type handle.

use std::{any::type_name, fmt, marker::PhantomData, sync::Arc};

use repokit_db::{expr::Col, json_to_value, Database, Expression, SelectQuery};
use tracing::debug;

use crate::{
    builder::Builder,
    error::{RepositoryError, Result},
    payload::Payload,
    record::Record,
    scope::ScopeTable,
};

/// A record type bound to a connection.
///
/// Creates, updates and deletes records of `R` and starts queries on its
/// table. Mass assignment only writes columns listed in [`Record::FILLABLE`].
pub struct Model<R> {
    db: Database,
    connection: String,
    scopes: Arc<ScopeTable>,
    _record: PhantomData<fn() -> R>,
}

impl<R> Clone for Model<R> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            connection: self.connection.clone(),
            scopes: self.scopes.clone(),
            _record: PhantomData,
        }
    }
}

impl<R> fmt::Debug for Model<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("record", &type_name::<R>())
            .field("connection", &self.connection)
            .finish()
    }
}

impl<R: Record> Model<R> {
    pub fn new(db: Database, connection: impl Into<String>, scopes: Arc<ScopeTable>) -> Self {
        Self {
            db,
            connection: connection.into(),
            scopes,
            _record: PhantomData,
        }
    }

    pub fn connection_name(&self) -> &str {
        &self.connection
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn table(&self) -> &'static str {
        R::TABLE
    }

    pub fn key_name(&self) -> &'static str {
        R::PRIMARY_KEY
    }

    pub fn fillable(&self) -> &'static [&'static str] {
        R::FILLABLE
    }

    /// Starts a scoped query on the record table.
    pub fn query(&self) -> Builder<R> {
        Builder::new(self.db.select(R::TABLE), self.scopes.clone())
    }

    /// Starts a raw query on the record table that maps rows into `T`.
    pub fn select<T>(&self) -> SelectQuery<T> {
        self.db.select(R::TABLE)
    }

    fn key_column(&self) -> Col<i64> {
        Col::new(R::PRIMARY_KEY)
    }

    pub fn find_by_key(&self, key: i64) -> Result<Option<R>> {
        Ok(self
            .select::<R>()
            .filter(self.key_column().eq(key))
            .fetch_one()?)
    }

    pub fn all(&self) -> Result<Vec<R>> {
        Ok(self.select::<R>().fetch()?)
    }

    pub fn count(&self) -> Result<u64> {
        Ok(self.select::<R>().count()?)
    }

    /// Inserts a record from the fillable part of `payload` and returns it.
    pub fn create(&self, payload: &Payload) -> Result<R> {
        let mut insert = self.db.insert(R::TABLE);
        for field in R::FILLABLE {
            if let Some(value) = payload.get(*field) {
                insert = insert.value(field, json_to_value(value));
            }
        }

        let rowid = insert.execute()?;
        debug!(table = R::TABLE, rowid, "created record");

        self.select::<R>()
            .filter(Col::<i64>::new("rowid").eq(rowid))
            .fetch_one()?
            .ok_or_else(|| RepositoryError::NotFound {
                table: R::TABLE.to_string(),
                identifier: rowid.to_string(),
            })
    }

    /// Writes the fillable part of `payload` to `record` and returns the
    /// stored result. The primary key is never written.
    pub fn update(&self, record: &R, payload: &Payload) -> Result<R> {
        let key = record.key();
        let mut update = self.db.update(R::TABLE);
        for field in R::FILLABLE.iter().filter(|field| **field != R::PRIMARY_KEY) {
            if let Some(value) = payload.get(*field) {
                update = update.value(field, json_to_value(value));
            }
        }

        if !update.is_empty() {
            let affected = update.filter(self.key_column().eq(key)).execute()?;
            debug!(table = R::TABLE, key, affected, "updated record");
        }

        self.find_by_key(key)?
            .ok_or_else(|| RepositoryError::NotFound {
                table: R::TABLE.to_string(),
                identifier: key.to_string(),
            })
    }

    /// Deletes `record`. Returns whether a row was removed.
    pub fn delete(&self, record: &R) -> Result<bool> {
        let key = record.key();
        let affected = self
            .db
            .delete(R::TABLE)
            .filter(self.key_column().eq(key))
            .execute()?;
        debug!(table = R::TABLE, key, affected, "deleted record");
        Ok(affected > 0)
    }
}
