//! Process-scoped state shared by repositories.

use std::{fs, sync::Arc, time::Duration};

use repokit_config::{error::ConfigError, Config, ConnectionConfig, ScopePolicy};
use repokit_db::{ConnectionOptions, Database, DatabaseManager};
use tracing::debug;

use crate::{boot::BootRegistry, error::Result, scope::ScopeTable};

/// Owns the connections, the installed scopes and the boot marks.
///
/// Build one at startup and hand an `Arc` of it to every repository.
#[derive(Debug)]
pub struct RepositoryContext {
    databases: DatabaseManager,
    scopes: Arc<ScopeTable>,
    boot: BootRegistry,
    policy: ScopePolicy,
}

impl RepositoryContext {
    pub fn new(databases: DatabaseManager, policy: ScopePolicy) -> Self {
        Self {
            databases,
            scopes: Arc::new(ScopeTable::new()),
            boot: BootRegistry::new(),
            policy,
        }
    }

    /// Opens every connection listed in `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut databases = DatabaseManager::new(config.default_connection.clone());
        for (name, connection) in &config.connections {
            databases.add(name.clone(), open_connection(connection)?);
            debug!(connection = %name, path = %connection.path, "registered connection");
        }
        Ok(Self::new(databases, config.scope_policy()?))
    }

    /// A context with one in-memory connection named `default`.
    pub fn in_memory() -> Result<Self> {
        let mut databases = DatabaseManager::new("default");
        databases.add("default", Database::open_in_memory()?);
        Ok(Self::new(databases, ScopePolicy::default()))
    }

    pub fn databases(&self) -> &DatabaseManager {
        &self.databases
    }

    pub fn databases_mut(&mut self) -> &mut DatabaseManager {
        &mut self.databases
    }

    pub fn scopes(&self) -> &Arc<ScopeTable> {
        &self.scopes
    }

    pub fn boot_registry(&self) -> &BootRegistry {
        &self.boot
    }

    pub fn scope_policy(&self) -> ScopePolicy {
        self.policy
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

fn open_connection(connection: &ConnectionConfig) -> Result<Database> {
    if connection.is_memory() {
        return Ok(Database::open_in_memory()?);
    }

    let path = connection.resolved_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(ConfigError::from)?;
    }

    let options = ConnectionOptions {
        busy_timeout: Duration::from_millis(connection.busy_timeout_ms()),
        foreign_keys: connection.foreign_keys(),
    };
    Ok(Database::open(&path, &options)?)
}
