//! `make repository`: renders a repository definition from the embedded
//! template.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use regex::Regex;
use tracing::{debug, info};

use crate::error::{CliError, ErrorContext, Result};

const REPOSITORY_TEMPLATE: &str = include_str!("../templates/repository.rs.stub");

const DEFAULT_PAYLOADS: &[&str] = &["id"];

const SUFFIX: &str = "Repository";

static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_\-]*(/[A-Za-z][A-Za-z0-9_\-]*)*$")
        .expect("name pattern is valid")
});

static WORD_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[_\-\s]+").expect("separator pattern is valid"));

static CASE_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z0-9])([A-Z])").expect("boundary pattern is valid"));

/// `user_profile`, `user-profile` and `userProfile` all become `UserProfile`.
pub fn studly_case(name: &str) -> String {
    WORD_SEPARATOR
        .split(name.trim())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect()
}

pub fn snake_case(name: &str) -> String {
    let separated = WORD_SEPARATOR.replace_all(name.trim(), "_");
    CASE_BOUNDARY
        .replace_all(&separated, "${1}_${2}")
        .to_lowercase()
}

/// A repository file about to be generated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryStub {
    pub repository: String,
    pub record: String,
    pub record_path: String,
    pub payloads: Vec<String>,
    /// Module directories below the output directory, for nested names.
    pub modules: Vec<String>,
}

impl RepositoryStub {
    /// Works out names and paths for `make repository <name>`.
    ///
    /// `name` may be nested (`admin/user`). Without `model` the record is
    /// looked up under `models_module`; `model` is a crate-relative path
    /// using `/` or `::`.
    pub fn new(
        name: &str,
        model: Option<&str>,
        payloads: Option<&[String]>,
        models_module: &str,
    ) -> Result<Self> {
        let name = name.trim();
        if !NAME_PATTERN.is_match(name) {
            return Err(CliError::InvalidName(name.to_string()));
        }

        let mut segments: Vec<&str> = name.split('/').collect();
        let base = segments.pop().unwrap_or(name);
        let base = studly_case(base);
        let base = base.strip_suffix(SUFFIX).filter(|b| !b.is_empty()).unwrap_or(&base);
        let modules: Vec<String> = segments.iter().map(|s| snake_case(s)).collect();

        let record_path = match model.map(str::trim).filter(|m| !m.is_empty()) {
            Some(model) => {
                let path = model.replace('/', "::");
                let path = path.trim_start_matches("::");
                if path.starts_with("crate::") {
                    path.to_string()
                } else {
                    format!("crate::{path}")
                }
            }
            None => {
                let mut parts = vec!["crate".to_string(), models_module.to_string()];
                parts.extend(modules.iter().cloned());
                parts.push(base.to_string());
                parts.join("::")
            }
        };

        let record = record_path
            .rsplit("::")
            .next()
            .unwrap_or(base)
            .to_string();

        let payloads = match payloads {
            Some(fields) => fields
                .iter()
                .map(|field| field.trim().to_string())
                .filter(|field| !field.is_empty())
                .collect(),
            None => vec![],
        };
        let payloads = if payloads.is_empty() {
            DEFAULT_PAYLOADS.iter().map(|field| field.to_string()).collect()
        } else {
            payloads
        };

        Ok(Self {
            repository: format!("{base}{SUFFIX}"),
            record,
            record_path,
            payloads,
            modules,
        })
    }

    pub fn file_name(&self) -> String {
        format!("{}.rs", snake_case(&self.repository))
    }

    /// Location of the file relative to the output directory.
    pub fn relative_path(&self) -> PathBuf {
        let mut path: PathBuf = self.modules.iter().collect();
        path.push(self.file_name());
        path
    }

    pub fn render(&self) -> String {
        let payloads = self
            .payloads
            .iter()
            .map(|field| format!("{field:?},"))
            .collect::<Vec<_>>()
            .join(&format!("\n{}", " ".repeat(12)));

        REPOSITORY_TEMPLATE
            .replace("{{record_path}}", &self.record_path)
            .replace("{{repository}}", &self.repository)
            .replace("{{record}}", &self.record)
            .replace("{{payloads}}", &payloads)
    }

    /// Writes the rendered file below `dir` and returns its path.
    pub fn write(&self, dir: &Path, force: bool) -> Result<PathBuf> {
        let path = dir.join(self.relative_path());
        if path.exists() && !force {
            return Err(CliError::FileExists(path));
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }

        debug!("rendering {} for {}", self.repository, self.record_path);
        fs::write(&path, self.render())
            .with_context(|| format!("writing {}", path.display()))?;
        info!("Repository {} created at {}", self.repository, path.display());

        Ok(path)
    }
}
