//! Error types for repokit-core.

use miette::Diagnostic;
use repokit_config::error::ConfigError;
use repokit_db::DbError;
use thiserror::Error;

/// Error type for repository operations.
#[derive(Error, Diagnostic, Debug)]
pub enum RepositoryError {
    #[error("Repository configuration error: {0}")]
    #[diagnostic(
        code(repokit::configuration),
        help("Check the record metadata and the connection the repository is bound to")
    )]
    Configuration(String),

    #[error("Scope `{name}` is registered more than once for {record}")]
    #[diagnostic(
        code(repokit::duplicate_scope),
        help("Rename one of the scopes, or set scope_policy = \"shadow\" to let the later one win")
    )]
    DuplicateScope { record: String, name: String },

    #[error("`{0}` does not follow the scope naming convention")]
    #[diagnostic(
        code(repokit::invalid_scope_name),
        help("Scope functions are named `scope_<name>` or `scope<Name>`")
    )]
    InvalidScopeName(String),

    #[error("Unknown scope `{name}` for {record}")]
    #[diagnostic(
        code(repokit::unknown_scope),
        help("Register the scope in the repository's `register_scopes`")
    )]
    UnknownScope { record: String, name: String },

    #[error("No record in `{table}` matches `{identifier}`")]
    #[diagnostic(
        code(repokit::not_found),
        help("Check the identifier or use a non-failing lookup")
    )]
    NotFound { table: String, identifier: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Database(#[from] DbError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error("{0}")]
    #[diagnostic(code(repokit::custom))]
    Custom(String),
}

impl RepositoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RepositoryError::NotFound { .. } | RepositoryError::Database(DbError::NotFound(_))
        )
    }
}

pub type Result<T> = std::result::Result<T, RepositoryError>;
