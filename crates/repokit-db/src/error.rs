use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum DbError {
    #[error("Cannot open database: {0}")]
    #[diagnostic(
        code(repokit_db::connection),
        help("Make sure the parent directory exists and the file is writable")
    )]
    ConnectionError(String),

    #[error("SQL error: {0}")]
    #[diagnostic(
        code(repokit_db::query),
        help("Compare the table and column names against the schema")
    )]
    QueryError(String),

    #[error("No row in `{0}` matched")]
    #[diagnostic(code(repokit_db::not_found))]
    NotFound(String),

    #[error("No connection named `{0}`")]
    #[diagnostic(
        code(repokit_db::unknown_connection),
        help("Declare it in the [connections] table of the config file")
    )]
    UnknownConnection(String),

    #[error("Savepoint failed: {0}")]
    #[diagnostic(code(repokit_db::transaction), help("Another writer may hold the database lock"))]
    TransactionError(String),

    #[error("A thread panicked while holding the connection")]
    #[diagnostic(code(repokit_db::poison))]
    PoisonError,
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        use rusqlite::Error as Sqlite;

        match err {
            Sqlite::QueryReturnedNoRows => Self::NotFound("query".into()),
            Sqlite::SqliteFailure(_, Some(message)) => Self::QueryError(message),
            other => Self::QueryError(other.to_string()),
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for DbError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        Self::PoisonError
    }
}

pub type Result<T> = std::result::Result<T, DbError>;
