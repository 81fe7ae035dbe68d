//! Path helpers for configuration values.

use std::{env, path::PathBuf};

use crate::error::{ConfigError, Result};

/// Path value that selects a private in-memory database.
pub const MEMORY_PATH: &str = ":memory:";

fn env_dir(var: &str, fallback: impl FnOnce() -> PathBuf) -> PathBuf {
    env::var_os(var)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(fallback)
}

pub fn home_dir() -> PathBuf {
    env_dir("HOME", || PathBuf::from("/"))
}

pub fn xdg_config_home() -> PathBuf {
    env_dir("XDG_CONFIG_HOME", || home_dir().join(".config"))
}

pub fn xdg_data_home() -> PathBuf {
    env_dir("XDG_DATA_HOME", || home_dir().join(".local/share"))
}

/// Expands a leading `~` plus `$VAR` and `${VAR}` in `path`, then anchors
/// relative results at the current directory.
///
/// `HOME` and the XDG base directories always expand, falling back to their
/// usual defaults. Any other variable must be set.
pub fn resolve_path(path: &str) -> Result<PathBuf> {
    let path = path.trim();
    if path.is_empty() {
        return Err(ConfigError::EmptyPath);
    }

    let expanded = PathBuf::from(expand(path)?);
    if expanded.is_absolute() {
        return Ok(expanded);
    }
    Ok(env::current_dir()?.join(expanded))
}

fn expand(input: &str) -> Result<String> {
    let (mut out, mut rest) = match input.strip_prefix('~') {
        Some(tail) => (home_dir().to_string_lossy().into_owned(), tail),
        None => (String::new(), input),
    };

    while let Some(dollar) = rest.find('$') {
        out.push_str(&rest[..dollar]);
        let after = &rest[dollar + 1..];

        let (name, tail) = if let Some(braced) = after.strip_prefix('{') {
            let close = braced
                .find('}')
                .ok_or_else(|| ConfigError::UnclosedVariable(format!("${{{braced}")))?;
            (&braced[..close], &braced[close + 1..])
        } else {
            let len = after
                .find(|c: char| !(c.is_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            after.split_at(len)
        };

        if name.is_empty() && !after.starts_with('{') {
            out.push('$');
        } else {
            out.push_str(&lookup(name, input)?);
        }
        rest = tail;
    }
    out.push_str(rest);
    Ok(out)
}

fn lookup(name: &str, input: &str) -> Result<String> {
    let dir = match name {
        "HOME" => home_dir(),
        "XDG_CONFIG_HOME" => xdg_config_home(),
        "XDG_DATA_HOME" => xdg_data_home(),
        _ => {
            return env::var(name).map_err(|_| ConfigError::MissingEnvVar {
                input: input.to_string(),
                var: name.to_string(),
            })
        }
    };
    Ok(dir.to_string_lossy().into_owned())
}
