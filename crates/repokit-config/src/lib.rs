pub mod annotations;
pub mod config;
pub mod error;
pub mod policy;
pub mod utils;

pub use config::{Config, ConnectionConfig};
pub use error::ConfigError;
pub use policy::ScopePolicy;

#[cfg(test)]
pub mod test_utils;
