use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("Could not render config as TOML: {0}")]
    #[diagnostic(
        code(repokit_config::toml_serialize),
        help("A value in the config cannot be represented in TOML")
    )]
    TomlSerError(#[from] toml::ser::Error),

    #[error("Could not read config: {0}")]
    #[diagnostic(
        code(repokit_config::toml_deserialize),
        help("Run `repokit defconfig` to see a valid layout")
    )]
    TomlDeError(#[from] toml::de::Error),

    #[error("A config file is already present")]
    #[diagnostic(
        code(repokit_config::already_exists),
        help("Delete it first, or pass --config with another path")
    )]
    ConfigAlreadyExists,

    #[error("default_connection `{0}` is not declared")]
    #[diagnostic(
        code(repokit_config::missing_default_connection),
        help("Point default_connection at a key of the [connections] table")
    )]
    MissingDefaultConnection(String),

    #[error("Connection `{0}` is not declared")]
    #[diagnostic(
        code(repokit_config::missing_connection),
        help("Add a [connections.<name>] entry for it")
    )]
    MissingConnection(String),

    #[error("Connection `{0}` has an empty path")]
    #[diagnostic(
        code(repokit_config::invalid_connection),
        help("Set `path` to a database file or to \":memory:\"")
    )]
    InvalidConnection(String),

    #[error("Unknown scope policy `{0}`")]
    #[diagnostic(
        code(repokit_config::invalid_scope_policy),
        help("Use `strict` or `shadow`")
    )]
    InvalidScopePolicy(String),

    #[error("Empty path")]
    #[diagnostic(code(repokit_config::empty_path))]
    EmptyPath,

    #[error("Variable is missing its closing brace: {0}")]
    #[diagnostic(
        code(repokit_config::unclosed_variable),
        help("Write variables as ${{NAME}} or $NAME")
    )]
    UnclosedVariable(String),

    #[error("Environment variable `{var}` used in `{input}` is not set")]
    #[diagnostic(code(repokit_config::missing_env_var))]
    MissingEnvVar { input: String, var: String },

    #[error("Filesystem error: {0}")]
    #[diagnostic(code(repokit_config::io))]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML document: {0}")]
    #[diagnostic(code(repokit_config::toml))]
    Toml(#[from] toml_edit::TomlError),

    #[error("Key `{0}` has no value")]
    #[diagnostic(code(repokit_config::unexpected_toml_item))]
    UnexpectedTomlItem(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
