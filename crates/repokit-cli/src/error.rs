use std::path::PathBuf;

use miette::Diagnostic;
use repokit_config::ConfigError;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum CliError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error("IO error while {action}: {source}")]
    #[diagnostic(code(repokit::io), help("Check file permissions and available disk space"))]
    Io {
        action: String,
        source: std::io::Error,
    },

    #[error("`{0}` already exists")]
    #[diagnostic(
        code(repokit::file_exists),
        help("Pass --force to overwrite it")
    )]
    FileExists(PathBuf),

    #[error("Invalid name `{0}`")]
    #[diagnostic(
        code(repokit::invalid_name),
        help("Use letters, digits, `_`, `-` or `/`, starting with a letter")
    )]
    InvalidName(String),

    #[error("Failed to serialize output: {0}")]
    #[diagnostic(code(repokit::serialize))]
    Serialize(String),
}

pub trait ErrorContext<T> {
    fn with_context<C>(self, context: C) -> Result<T>
    where
        C: FnOnce() -> String;
}

impl<T> ErrorContext<T> for std::io::Result<T> {
    fn with_context<C>(self, context: C) -> Result<T>
    where
        C: FnOnce() -> String,
    {
        self.map_err(|source| CliError::Io {
            action: context(),
            source,
        })
    }
}

pub type Result<T> = std::result::Result<T, CliError>;
