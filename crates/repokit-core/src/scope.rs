//! Named query scopes.
//!
//! A repository lists its scopes in [`Repository::register_scopes`]; at boot
//! they are collected in a [`ScopeRegistry`] and installed into the
//! context's [`ScopeTable`], keyed by record type and scope name.
//! [`Builder::scope`] looks them up from there.
//!
//! [`Repository::register_scopes`]: crate::repository::Repository::register_scopes

use std::{
    any::{type_name, Any, TypeId},
    collections::HashMap,
    fmt,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, LazyLock, PoisonError, RwLock,
    },
};

use regex::Regex;
use repokit_config::ScopePolicy;
use repokit_db::Value;
use tracing::{debug, warn};

use crate::{
    builder::Builder,
    error::{RepositoryError, Result},
    record::Record,
};

/// A scope behavior.
///
/// It receives the builder it was invoked on plus the call arguments. It may
/// mutate the builder in place and return `None`, or return the builder to
/// continue with.
pub type ScopeFn<R> = Arc<dyn Fn(&mut Builder<R>, &[Value]) -> Option<Builder<R>> + Send + Sync>;

static SCOPE_METHOD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^scope_?([^_].*)$").expect("scope method pattern is valid")
});

/// Derives a scope name from a function name.
///
/// `scope_active` becomes `active` and `scopeByEmail` becomes `byEmail`.
/// Names that don't start with `scope` followed by at least one character
/// yield `None`.
pub fn derive_scope_name(method: &str) -> Option<String> {
    let rest = SCOPE_METHOD.captures(method)?.get(1)?.as_str();
    let mut chars = rest.chars();
    let first = chars.next()?;
    Some(first.to_lowercase().chain(chars).collect())
}

/// The scopes one repository type declares, in declaration order.
pub struct ScopeRegistry<R> {
    scopes: Vec<(String, ScopeFn<R>)>,
    shadowed: Vec<String>,
}

impl<R> Default for ScopeRegistry<R> {
    fn default() -> Self {
        Self {
            scopes: Vec::new(),
            shadowed: Vec::new(),
        }
    }
}

impl<R> ScopeRegistry<R> {
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.scopes.iter().map(|(name, _)| name.as_str())
    }

    /// Names that were registered more than once.
    pub fn shadowed(&self) -> &[String] {
        &self.shadowed
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

impl<R> fmt::Debug for ScopeRegistry<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeRegistry")
            .field("scopes", &self.names().collect::<Vec<_>>())
            .field("shadowed", &self.shadowed)
            .finish()
    }
}

impl<R: Record> ScopeRegistry<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a named behavior.
    ///
    /// A name that is already present is overwritten in place; the previous
    /// behavior is returned and the name is remembered as shadowed.
    pub fn add_scope<F>(&mut self, name: impl Into<String>, behavior: F) -> Option<ScopeFn<R>>
    where
        F: Fn(&mut Builder<R>, &[Value]) -> Option<Builder<R>> + Send + Sync + 'static,
    {
        let name = name.into();
        let behavior: ScopeFn<R> = Arc::new(behavior);

        match self.scopes.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => {
                warn!(scope = %name, record = type_name::<R>(), "scope registered twice");
                self.shadowed.push(name);
                Some(std::mem::replace(slot, behavior))
            }
            None => {
                self.scopes.push((name, behavior));
                None
            }
        }
    }

    /// Stores a behavior under the name derived from `method` by
    /// [`derive_scope_name`].
    pub fn add_convention_scope<F>(&mut self, method: &str, behavior: F) -> Result<Option<ScopeFn<R>>>
    where
        F: Fn(&mut Builder<R>, &[Value]) -> Option<Builder<R>> + Send + Sync + 'static,
    {
        let name = derive_scope_name(method)
            .ok_or_else(|| RepositoryError::InvalidScopeName(method.to_string()))?;
        Ok(self.add_scope(name, behavior))
    }

    /// Installs every stored scope into `table`. Returns how many were installed.
    pub fn apply_scopes(&self, table: &ScopeTable, policy: ScopePolicy) -> Result<usize> {
        table.install::<R>(&self.scopes, policy)
    }
}

/// Registers associated functions as scopes under their convention names.
///
/// Evaluates to `repokit_core::error::Result<()>`.
///
/// ```rust,ignore
/// fn register_scopes(registry: &mut ScopeRegistry<Widget>) -> Result<()> {
///     register_scopes!(registry, WidgetRepository => [scope_active, scope_by_slug])
/// }
/// ```
#[macro_export]
macro_rules! register_scopes {
    ($registry:expr, $repo:ty => [$($method:ident),* $(,)?]) => {{
        let registry: &mut $crate::scope::ScopeRegistry<_> = $registry;
        let mut result: $crate::error::Result<()> = Ok(());
        $(
            if result.is_ok() {
                result = registry
                    .add_convention_scope(stringify!($method), <$repo>::$method)
                    .map(|_| ());
            }
        )*
        result
    }};
}

type ScopeKey = (TypeId, String);

/// Installed scopes for every record type, shared by all repositories of a
/// [`RepositoryContext`](crate::context::RepositoryContext).
///
/// Installation only adds or overwrites; nothing is ever removed.
#[derive(Default)]
pub struct ScopeTable {
    entries: RwLock<HashMap<ScopeKey, Arc<dyn Any + Send + Sync>>>,
    passes: AtomicUsize,
}

impl fmt::Debug for ScopeTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("ScopeTable")
            .field("entries", &entries.len())
            .field("passes", &self.install_passes())
            .finish()
    }
}

impl ScopeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `scopes` for record type `R`.
    ///
    /// Conflicts are checked before anything is written, so a pass rejected
    /// under [`ScopePolicy::Strict`] installs nothing.
    pub fn install<R: Record>(&self, scopes: &[(String, ScopeFn<R>)], policy: ScopePolicy) -> Result<usize> {
        let type_id = TypeId::of::<R>();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        let conflicts: Vec<&str> = scopes
            .iter()
            .filter(|(name, _)| entries.contains_key(&(type_id, name.clone())))
            .map(|(name, _)| name.as_str())
            .collect();

        if let Some(name) = conflicts.first() {
            match policy {
                ScopePolicy::Strict => {
                    return Err(RepositoryError::DuplicateScope {
                        record: type_name::<R>().to_string(),
                        name: name.to_string(),
                    });
                }
                ScopePolicy::Shadow => {
                    warn!(
                        record = type_name::<R>(),
                        scopes = ?conflicts,
                        "shadowing previously installed scopes"
                    );
                }
            }
        }

        for (name, behavior) in scopes {
            entries.insert((type_id, name.clone()), Arc::new(behavior.clone()));
        }
        drop(entries);

        self.passes.fetch_add(1, Ordering::SeqCst);
        debug!(record = type_name::<R>(), count = scopes.len(), "installed scopes");
        Ok(scopes.len())
    }

    /// Looks up the behavior installed as `name` for record type `R`.
    pub fn get<R: Record>(&self, name: &str) -> Option<ScopeFn<R>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(&(TypeId::of::<R>(), name.to_string()))
            .and_then(|entry| entry.downcast_ref::<ScopeFn<R>>())
            .cloned()
    }

    pub fn contains<R: Record>(&self, name: &str) -> bool {
        self.get::<R>(name).is_some()
    }

    /// Sorted names of the scopes installed for record type `R`.
    pub fn names<R: Record>(&self) -> Vec<String> {
        let type_id = TypeId::of::<R>();
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = entries
            .keys()
            .filter(|(id, _)| *id == type_id)
            .map(|(_, name)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// How many installation passes have run, across all record types.
    pub fn install_passes(&self) -> usize {
        self.passes.load(Ordering::SeqCst)
    }
}
