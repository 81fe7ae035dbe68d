//! Database connection management.
//!
//! A [`Database`] is a cloneable handle over one [`SharedConnection`]. Query
//! builders lock the connection per statement. A transaction claims the
//! connection for its thread until it ends, and statements from other threads
//! wait for it instead of running inside its savepoint.
//!
//! [`DatabaseManager`] keeps the named connections of an application and
//! knows which one is the default.

use std::{
    collections::HashMap,
    fmt,
    path::Path,
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError},
    thread::{self, ThreadId},
    time::Duration,
};

use rusqlite::Connection;
use tracing::{debug, error, trace};

use crate::{
    error::{DbError, Result},
    query::{DeleteQuery, InsertQuery, SelectQuery, UpdateQuery},
};

/// Settings applied when a connection is opened.
#[derive(Clone, Debug)]
pub struct ConnectionOptions {
    pub busy_timeout: Duration,
    pub foreign_keys: bool,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_millis(5000),
            foreign_keys: true,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct TxOwner {
    thread: ThreadId,
    depth: usize,
}

/// One SQLite connection shared between threads.
///
/// Statements take the connection one at a time through [`SharedConnection::lock`].
/// While a thread has a transaction open, statements from any other thread
/// block until that transaction is released or rolled back.
pub struct SharedConnection {
    conn: Mutex<Connection>,
    owner: Mutex<Option<TxOwner>>,
    ended: Condvar,
}

impl SharedConnection {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            owner: Mutex::new(None),
            ended: Condvar::new(),
        }
    }

    /// Locks the connection for one statement.
    pub fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        // The owner guard is held until the connection is ours, so no other
        // thread can open a savepoint in between.
        let owner = self.wait_for_turn();
        let conn = self.conn.lock()?;
        drop(owner);
        Ok(conn)
    }

    /// Whether any thread has a transaction open.
    pub fn in_transaction(&self) -> bool {
        self.owner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn wait_for_turn(&self) -> MutexGuard<'_, Option<TxOwner>> {
        let current = thread::current().id();
        let owner = self.owner.lock().unwrap_or_else(PoisonError::into_inner);
        self.ended
            .wait_while(owner, |owner| {
                matches!(owner, Some(held) if held.thread != current)
            })
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Claims the connection for the current thread and returns the nesting
    /// depth the new savepoint opens at.
    fn enter(&self) -> usize {
        let mut owner = self.wait_for_turn();
        let depth = owner.map_or(0, |held| held.depth);
        *owner = Some(TxOwner {
            thread: thread::current().id(),
            depth: depth + 1,
        });
        depth
    }

    fn leave(&self) {
        let mut owner = self.owner.lock().unwrap_or_else(PoisonError::into_inner);
        match *owner {
            Some(held) if held.depth > 1 => {
                *owner = Some(TxOwner {
                    depth: held.depth - 1,
                    ..held
                })
            }
            _ => {
                *owner = None;
                self.ended.notify_all();
            }
        }
    }
}

/// A shared SQLite connection with savepoint-based transactions.
#[derive(Clone)]
pub struct Database {
    conn: Arc<SharedConnection>,
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("in_transaction", &self.in_transaction())
            .finish_non_exhaustive()
    }
}

impl Database {
    /// Opens (or creates) the database file at `path`.
    ///
    /// File databases are switched to WAL mode for better concurrent access.
    pub fn open<P: AsRef<Path>>(path: P, options: &ConnectionOptions) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .map_err(|err| DbError::ConnectionError(format!("{}: {}", path.display(), err)))?;

        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
        Self::configure(&conn, options)?;

        debug!(path = %path.display(), "opened database");
        Ok(Self::from_connection(conn))
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|err| DbError::ConnectionError(err.to_string()))?;
        Self::configure(&conn, &ConnectionOptions::default())?;
        Ok(Self::from_connection(conn))
    }

    /// Wraps an already configured connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(SharedConnection::new(conn)),
        }
    }

    fn configure(conn: &Connection, options: &ConnectionOptions) -> Result<()> {
        conn.busy_timeout(options.busy_timeout)?;
        conn.pragma_update(None, "foreign_keys", options.foreign_keys)?;
        Ok(())
    }

    /// The raw connection handle the query builders operate on.
    pub fn handle(&self) -> Arc<SharedConnection> {
        Arc::clone(&self.conn)
    }

    /// Runs one or more semicolon separated statements.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        trace!(sql = %sql, "execute batch");
        let conn = self.conn.lock()?;
        conn.execute_batch(sql)?;
        Ok(())
    }

    pub fn select<E>(&self, table: &'static str) -> SelectQuery<E> {
        SelectQuery::from(self.handle(), table)
    }

    pub fn insert(&self, table: &'static str) -> InsertQuery {
        InsertQuery::into(self.handle(), table)
    }

    pub fn update(&self, table: &'static str) -> UpdateQuery {
        UpdateQuery::table(self.handle(), table)
    }

    pub fn delete(&self, table: &'static str) -> DeleteQuery {
        DeleteQuery::from(self.handle(), table)
    }

    /// Whether a transaction opened through [`Database::transaction`] is active
    /// on any thread.
    pub fn in_transaction(&self) -> bool {
        self.conn.in_transaction()
    }

    /// Runs `body` inside a savepoint.
    ///
    /// The savepoint is released when `body` returns `Ok` and rolled back when
    /// it returns `Err` or panics. The body's error is handed back unchanged.
    /// Nested calls open nested savepoints, so an inner failure only undoes the
    /// inner work unless the outer body propagates it.
    ///
    /// Until the outermost savepoint ends, statements issued on other threads
    /// through any clone of this handle wait.
    ///
    /// ```rust
    /// use repokit_db::{connection::Database, DbError};
    ///
    /// let db = Database::open_in_memory().unwrap();
    /// db.execute_batch("CREATE TABLE t (v INTEGER)").unwrap();
    ///
    /// let result: Result<(), DbError> = db.transaction(|| {
    ///     db.execute_batch("INSERT INTO t VALUES (1)")?;
    ///     Err(DbError::QueryError("boom".into()))
    /// });
    /// assert!(result.is_err());
    /// assert_eq!(db.select::<i64>("t").count().unwrap(), 0);
    /// ```
    pub fn transaction<T, E, F>(&self, body: F) -> std::result::Result<T, E>
    where
        F: FnOnce() -> std::result::Result<T, E>,
        E: From<DbError>,
    {
        let mut savepoint = Savepoint::begin(self)?;

        match body() {
            Ok(value) => {
                savepoint.release()?;
                Ok(value)
            }
            Err(err) => {
                savepoint.rollback();
                Err(err)
            }
        }
    }
}

/// An open savepoint. Dropping it without releasing rolls it back.
struct Savepoint<'a> {
    db: &'a Database,
    name: String,
    open: bool,
}

impl<'a> Savepoint<'a> {
    fn begin(db: &'a Database) -> Result<Self> {
        let depth = db.conn.enter();
        let name = format!("repokit_sp_{}", depth);

        if let Err(err) = db.execute_batch(&format!("SAVEPOINT {}", name)) {
            db.conn.leave();
            return Err(DbError::TransactionError(err.to_string()));
        }

        trace!(savepoint = %name, "savepoint opened");
        Ok(Self {
            db,
            name,
            open: true,
        })
    }

    fn release(&mut self) -> Result<()> {
        match self.db.execute_batch(&format!("RELEASE {}", self.name)) {
            Ok(()) => {
                self.open = false;
                self.db.conn.leave();
                trace!(savepoint = %self.name, "savepoint released");
                Ok(())
            }
            Err(err) => {
                self.rollback();
                Err(DbError::TransactionError(err.to_string()))
            }
        }
    }

    fn rollback(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;

        let sql = format!("ROLLBACK TO {name}; RELEASE {name}", name = self.name);
        match self.db.execute_batch(&sql) {
            Ok(()) => debug!(savepoint = %self.name, "transaction rolled back"),
            Err(err) => error!(savepoint = %self.name, "rollback failed: {}", err),
        }
        self.db.conn.leave();
    }
}

impl Drop for Savepoint<'_> {
    fn drop(&mut self) {
        self.rollback();
    }
}

/// Holds the named connections of an application.
///
/// # Example
///
/// ```rust
/// use repokit_db::connection::{Database, DatabaseManager};
///
/// let mut manager = DatabaseManager::new("main");
/// manager.add("main", Database::open_in_memory().unwrap());
///
/// assert!(manager.default().is_ok());
/// assert!(manager.get("reports").is_err());
/// ```
#[derive(Clone, Debug, Default)]
pub struct DatabaseManager {
    default: String,
    connections: HashMap<String, Database>,
}

impl DatabaseManager {
    /// Creates an empty manager whose default connection is `default`.
    pub fn new(default: impl Into<String>) -> Self {
        Self {
            default: default.into(),
            connections: HashMap::new(),
        }
    }

    /// Adds or replaces a named connection.
    pub fn add(&mut self, name: impl Into<String>, db: Database) -> Option<Database> {
        self.connections.insert(name.into(), db)
    }

    /// Looks up a connection by name.
    pub fn get(&self, name: &str) -> Result<&Database> {
        self.connections
            .get(name)
            .ok_or_else(|| DbError::UnknownConnection(name.to_string()))
    }

    pub fn default(&self) -> Result<&Database> {
        self.get(&self.default)
    }

    pub fn default_name(&self) -> &str {
        &self.default
    }

    /// Resolves an optional connection name, falling back to the default.
    pub fn resolve(&self, name: Option<&str>) -> Result<&Database> {
        match name {
            Some(name) => self.get(name),
            None => self.default(),
        }
    }

    /// Returns the names of all registered connections.
    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.connections.keys()
    }
}
