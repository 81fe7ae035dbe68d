use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// What happens when a scope name is installed twice for the same record type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopePolicy {
    /// Reject the second installation.
    #[default]
    Strict,
    /// Let the later installation replace the earlier one.
    Shadow,
}

impl FromStr for ScopePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "shadow" => Ok(Self::Shadow),
            _ => Err(ConfigError::InvalidScopePolicy(s.to_string())),
        }
    }
}

impl fmt::Display for ScopePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => write!(f, "strict"),
            Self::Shadow => write!(f, "shadow"),
        }
    }
}
