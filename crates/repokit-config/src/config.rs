use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::{LazyLock, PoisonError, RwLock},
};

use documented::{Documented, DocumentedFields};
use serde::{Deserialize, Serialize};
use toml_edit::{DocumentMut, Item};
use tracing::{debug, info};

use crate::{
    annotations::annotate_toml_table,
    error::{ConfigError, Result},
    policy::ScopePolicy,
    utils::{resolve_path, xdg_config_home, MEMORY_PATH},
};

pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_REPOSITORIES_PATH: &str = "src/repositories";
pub const DEFAULT_MODELS_MODULE: &str = "models";

/// repokit configuration
#[derive(Clone, Debug, Deserialize, Serialize, Documented, DocumentedFields)]
pub struct Config {
    /// Name of the connection repositories use unless they pick one themselves.
    pub default_connection: String,

    /// A map of connection names to SQLite database settings.
    pub connections: HashMap<String, ConnectionConfig>,

    /// What to do when two repositories register the same scope name for one
    /// record type: "strict" rejects it, "shadow" lets the later one win.
    /// Default: strict
    pub scope_policy: Option<ScopePolicy>,

    /// Directory that `repokit make repository` writes into.
    /// Default: src/repositories
    pub repositories_path: Option<String>,

    /// Module that generated repositories import their record types from.
    /// Default: models
    pub models_module: Option<String>,
}

/// A named SQLite connection.
#[derive(Clone, Debug, Deserialize, Serialize, Documented, DocumentedFields)]
pub struct ConnectionConfig {
    /// Database file. Supports `~` and `$VAR`; ":memory:" opens a private in-memory database.
    pub path: String,

    /// How long a statement waits on a locked database, in milliseconds.
    /// Default: 5000
    pub busy_timeout_ms: Option<u64>,

    /// Enforce foreign key constraints.
    /// Default: true
    pub foreign_keys: Option<bool>,
}

impl ConnectionConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: Some(DEFAULT_BUSY_TIMEOUT_MS),
            foreign_keys: Some(true),
        }
    }

    pub fn is_memory(&self) -> bool {
        self.path.trim() == MEMORY_PATH
    }

    /// The database file with variables expanded.
    pub fn resolved_path(&self) -> Result<PathBuf> {
        if self.is_memory() {
            return Ok(PathBuf::from(MEMORY_PATH));
        }
        resolve_path(&self.path)
    }

    pub fn busy_timeout_ms(&self) -> u64 {
        self.busy_timeout_ms.unwrap_or(DEFAULT_BUSY_TIMEOUT_MS)
    }

    pub fn foreign_keys(&self) -> bool {
        self.foreign_keys.unwrap_or(true)
    }
}

pub static CONFIG: LazyLock<RwLock<Option<Config>>> = LazyLock::new(|| RwLock::new(None));

pub static CONFIG_PATH: LazyLock<RwLock<PathBuf>> = LazyLock::new(|| {
    RwLock::new(match std::env::var("REPOKIT_CONFIG") {
        Ok(path_str) => PathBuf::from(path_str),
        Err(_) => xdg_config_home().join("repokit").join("config.toml"),
    })
});

/// Loads the configuration file into the process-wide slot.
pub fn init() -> Result<()> {
    let config = Config::new()?;
    let mut global_config = CONFIG.write().unwrap_or_else(PoisonError::into_inner);
    *global_config = Some(config);
    Ok(())
}

/// Returns the loaded configuration, or the default one if [`init`] never ran.
pub fn get_config() -> Config {
    if let Some(config) = CONFIG
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .as_ref()
    {
        return config.clone();
    }

    let mut config_guard = CONFIG.write().unwrap_or_else(PoisonError::into_inner);
    config_guard.get_or_insert_with(Config::default_config).clone()
}

pub fn config_path() -> PathBuf {
    CONFIG_PATH
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .to_path_buf()
}

/// Points subsequent loads and saves at `path`.
pub fn set_config_path(path: impl Into<PathBuf>) {
    let mut config_path = CONFIG_PATH.write().unwrap_or_else(PoisonError::into_inner);
    *config_path = path.into();
}

impl Config {
    pub fn default_config() -> Self {
        let default_connection = "default".to_string();
        let connection =
            ConnectionConfig::new("$XDG_DATA_HOME/repokit/default.db".to_string());

        Self {
            connections: HashMap::from([(default_connection.clone(), connection)]),
            default_connection,
            scope_policy: Some(ScopePolicy::Strict),
            repositories_path: Some(DEFAULT_REPOSITORIES_PATH.to_string()),
            models_module: Some(DEFAULT_MODELS_MODULE.to_string()),
        }
    }

    /// Creates a new configuration by loading it from the configuration file.
    /// If the configuration file is not found, it uses the default configuration.
    pub fn new() -> Result<Self> {
        Self::load_from(config_path())
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut config = match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no config at {}, using defaults", path.display());
                Self::default_config()
            }
            Err(err) => return Err(ConfigError::IoError(err)),
        };

        config.resolve()?;

        Ok(config)
    }

    pub fn resolve(&mut self) -> Result<()> {
        if !self.connections.contains_key(&self.default_connection) {
            return Err(ConfigError::MissingDefaultConnection(
                self.default_connection.clone(),
            ));
        }

        for (name, connection) in &mut self.connections {
            if connection.path.trim().is_empty() {
                return Err(ConfigError::InvalidConnection(name.clone()));
            }
            connection.busy_timeout_ms.get_or_insert(DEFAULT_BUSY_TIMEOUT_MS);
            connection.foreign_keys.get_or_insert(true);
        }

        self.scope_policy.get_or_insert_with(ScopePolicy::default);
        self.repositories_path
            .get_or_insert_with(|| DEFAULT_REPOSITORIES_PATH.to_string());
        self.models_module
            .get_or_insert_with(|| DEFAULT_MODELS_MODULE.to_string());

        Ok(())
    }

    pub fn get_connection(&self, name: &str) -> Result<&ConnectionConfig> {
        self.connections
            .get(name)
            .ok_or_else(|| ConfigError::MissingConnection(name.to_string()))
    }

    pub fn default_connection(&self) -> Result<&ConnectionConfig> {
        self.connections
            .get(&self.default_connection)
            .ok_or_else(|| ConfigError::MissingDefaultConnection(self.default_connection.clone()))
    }

    /// The effective scope policy. `REPOKIT_SCOPE_POLICY` overrides the file.
    pub fn scope_policy(&self) -> Result<ScopePolicy> {
        if let Ok(value) = std::env::var("REPOKIT_SCOPE_POLICY") {
            return value.parse();
        }
        Ok(self.scope_policy.unwrap_or_default())
    }

    pub fn get_repositories_path(&self) -> Result<PathBuf> {
        if let Ok(env_path) = std::env::var("REPOKIT_REPOSITORIES_PATH") {
            return resolve_path(&env_path);
        }
        resolve_path(
            self.repositories_path
                .as_deref()
                .unwrap_or(DEFAULT_REPOSITORIES_PATH),
        )
    }

    pub fn models_module(&self) -> &str {
        self.models_module.as_deref().unwrap_or(DEFAULT_MODELS_MODULE)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = config_path();
        let serialized = toml::to_string_pretty(self)?;
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&config_path, serialized)?;
        info!("Configuration saved to {}", config_path.display());
        Ok(())
    }

    pub fn to_annotated_document(&self) -> Result<DocumentMut> {
        let toml_string = toml::to_string_pretty(self)?;
        let mut doc = toml_string.parse::<DocumentMut>()?;

        annotate_toml_table::<Config>(doc.as_table_mut(), true)?;

        if let Some(connections_table) = doc.get_mut("connections").and_then(Item::as_table_mut) {
            for (_name, connection_item) in connections_table.iter_mut() {
                if let Item::Table(connection_table) = connection_item {
                    annotate_toml_table::<ConnectionConfig>(connection_table, false)?;
                }
            }
        }

        Ok(doc)
    }
}

/// Writes an annotated default configuration to the config path and returns it.
pub fn generate_default_config() -> Result<PathBuf> {
    let config_path = config_path();

    if config_path.exists() {
        return Err(ConfigError::ConfigAlreadyExists);
    }

    let annotated_doc = Config::default_config().to_annotated_document()?;

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(&config_path, annotated_doc.to_string())?;
    info!(
        "Default configuration file generated with documentation at: {}",
        config_path.display()
    );
    Ok(config_path)
}
